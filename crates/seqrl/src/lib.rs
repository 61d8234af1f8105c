//! # seqrl
//!
//! Reinforcement learning for token-sequence generators scored by an
//! external, possibly slow, reward oracle.
//!
//! ## Overview
//!
//! seqrl provides:
//! - A vectorized generation environment (`GenerationEnv`) that turns
//!   token-by-token decoding into a finite-horizon MDP
//! - A deduplicating, priority-ranked replay buffer (`ReplayBuffer`)
//! - Policy-gradient losses with baselines, reward shaping and population
//!   diversity rewards (`PolicyUpdater`)
//! - A training loop (`Trainer`) tying rollout, oracle scoring, replay and
//!   optimization together
//!
//! ## Features
//!
//! - `default` - Core functionality with `ndarray` tensors (no autograd)
//! - `torch` - GRU policy and autograd losses through libtorch
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use seqrl::prelude::*;
//!
//! let vocab = TokenVocabulary::new(["C", "O", "N", "(", ")", "="])?;
//! let mut env = GenerationEnv::new(8, 64, vocab.start_token(), vocab.end_token())?;
//! ```

pub mod env;
pub mod log;
pub mod loss;
pub mod oracle;
pub mod policy;
pub mod replay;
pub mod training;
pub mod utils;
pub mod vocab;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::env::{GenerationEnv, LaneStatus, Termination, Trajectory, TrajectoryBatch};
    pub use crate::log::{CompositeLogger, ConsoleLogger, JsonlLogger, MetricLogger, Metrics, NoOpLogger};
    pub use crate::loss::{Baseline, LossTensor, PolicyUpdater};
    pub use crate::oracle::{Oracle, OracleError, RetryPolicy};
    pub use crate::policy::{Act, Evaluation, Optimizer, Policy, TablePolicy};
    pub use crate::replay::{ReplayBuffer, ReplayEntry, ReplaySample};
    pub use crate::training::{
        AgentState, BaselineKind, LossMode, Registry, SamplerKind, Trainer, TrainingConfig,
    };
    pub use crate::vocab::{TokenVocabulary, Vocabulary};

    #[cfg(feature = "torch")]
    pub use crate::policy::{GruConfig, GruPolicy};
    #[cfg(feature = "torch")]
    pub use crate::training::TorchOptimizer;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Token id in `[0, V)`.
pub type Token = u32;

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum SeqRlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown token at byte {position} in {input:?}")]
    UnknownToken { input: String, position: usize },

    #[error("Replay buffer underflow: requested {requested}, holding {available}")]
    Underflow { requested: usize, available: usize },

    #[error("Oracle failed after {attempts} attempts: {last_error}")]
    OracleExhausted { attempts: usize, last_error: String },

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Oracle returned {actual} scores for {expected} sequences")]
    OracleShape { expected: usize, actual: usize },

    #[error("Rollout error: {0}")]
    Rollout(String),

    #[error("Policy error: {0}")]
    Policy(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "torch")]
    #[error("Tensor error: {0}")]
    Tensor(#[from] tch::TchError),
}

pub type Result<T> = core::result::Result<T, SeqRlError>;
