//! Experience replay.
//!
//! A fixed-capacity store of the best unique trajectories seen so far,
//! deduplicated on the exact token sequence, with prioritized or uniform
//! sampling without replacement.

mod buffer;
mod sampler;

pub use buffer::{InsertOutcome, ReplayBuffer, ReplayEntry, ReplaySample};
pub use sampler::{SamplerKind, PRIORITY_EPSILON};
