//! Policy and optimizer capabilities.
//!
//! The training core sees a policy only through [`Policy`]: sample the next
//! token for every lane, and re-evaluate finished trajectories. Parameter
//! updates go through [`Optimizer`]. Provides:
//! - `TablePolicy` - Bigram logits table on `ndarray` (sampling and priors)
//! - `GruPolicy` - Embedding/GRU token model - requires `torch` feature

#[cfg(feature = "torch")]
mod gru;
mod table;

#[cfg(feature = "torch")]
pub use gru::{GruConfig, GruPolicy};
pub use table::TablePolicy;

use crate::env::TrajectoryBatch;
use crate::loss::LossTensor;
use crate::{Result, Token};

/// Output of one vectorized acting step.
#[derive(Clone, Debug)]
pub struct Act<C> {
    /// Chosen token per lane
    pub tokens: Vec<Token>,
    /// Log-probability of each chosen token under the acting policy
    pub log_probs: Vec<f32>,
    /// Recurrent carry to feed into the next step
    pub carry: C,
}

/// Per-position re-evaluation of a trajectory batch, both `[B, T]`.
pub struct Evaluation<T> {
    pub log_probs: T,
    pub entropy: T,
}

/// Trait for token-generating policies
pub trait Policy {
    /// Tensor type carrying log-probabilities (and gradients, if any)
    type Tensor: LossTensor;

    /// Recurrent state, opaque to everything but the policy
    type Carry;

    /// Carry for a fresh batch of `lanes` sequences
    fn initial_carry(&self, lanes: usize) -> Result<Self::Carry>;

    /// Sample the next token for every lane given the previous tokens.
    fn act(&mut self, last_tokens: &[Token], carry: &Self::Carry) -> Result<Act<Self::Carry>>;

    /// Log-probabilities and entropies of the batch's actions under this
    /// policy, shaped `[B, T]`.
    fn evaluate(&self, batch: &TrajectoryBatch) -> Result<Evaluation<Self::Tensor>>;

    /// Same as [`Policy::evaluate`] but without recording anything for
    /// back-propagation. Used for priors and population scoring.
    fn evaluate_detached(&self, batch: &TrajectoryBatch) -> Result<Evaluation<Self::Tensor>> {
        self.evaluate(batch)
    }
}

/// Applies a scalar loss to a policy's parameters in place.
pub trait Optimizer<T> {
    /// Zero gradients, back-propagate `loss` and take one step.
    fn step(&mut self, loss: &T) -> Result<()>;

    /// Change the rate used by later steps. Ignored by default.
    fn set_learning_rate(&mut self, _learning_rate: f64) {}
}
