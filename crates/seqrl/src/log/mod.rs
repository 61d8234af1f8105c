//! Metric logging.
//!
//! Provides:
//! - `MetricLogger` trait for composable backends
//! - `ConsoleLogger` for one-line summaries through `tracing`
//! - `JsonlLogger` for one JSON object per logged step
//! - `CompositeLogger` for multi-backend logging

mod console;
mod jsonl;
mod logger;

pub use console::ConsoleLogger;
pub use jsonl::JsonlLogger;
pub use logger::{CompositeLogger, MetricLogger, Metrics, NoOpLogger};
