//! Training system.
//!
//! Provides:
//! - `TrainingConfig` - Serializable run configuration
//! - `Registry` - Named policy and oracle constructors
//! - `CosineAnnealing` - Learning-rate schedule
//! - `Trainer` - Population training loop
//! - `TorchOptimizer` - Adam with gradient clipping - requires `torch` feature

mod config;
#[cfg(feature = "torch")]
mod optimizer;
mod penalty;
mod registry;
mod schedule;
mod trainer;

pub use crate::loss::{BaselineKind, LossMode};
pub use crate::replay::SamplerKind;
pub use config::{LossConfig, LrAnnealingConfig, ReplayConfig, TrainingConfig};
#[cfg(feature = "torch")]
pub use optimizer::TorchOptimizer;
pub use penalty::RepetitionPenalty;
pub use registry::{OracleFactory, PolicyFactory, Registry};
pub use schedule::CosineAnnealing;
pub use trainer::{AgentState, IterationStats, Trainer, TrainingSummary};
