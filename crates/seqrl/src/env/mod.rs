//! Sequence generation environment.
//!
//! Provides the vectorized `GenerationEnv` that steps B lanes of
//! token-by-token decoding in lockstep, plus the `Trajectory` records it
//! produces and the padded `TrajectoryBatch` consumed by policies.

mod generation;
mod lane;
mod trajectory;

pub use generation::{GenerationEnv, StepReport};
pub use lane::{LaneState, LaneStatus, Termination};
pub use trajectory::{remove_duplicates, Trajectory, TrajectoryBatch};
