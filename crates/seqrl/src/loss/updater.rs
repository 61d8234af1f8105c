//! Scalar training loss for a batch of trajectories.

use super::{masked_log_likelihood, shape_rewards, to_array1, Baseline, LossMode, LossTensor};
use crate::env::TrajectoryBatch;
use crate::policy::Evaluation;
use crate::{Result, SeqRlError};
use ndarray::Array1;

/// Everything one loss evaluation consumes.
pub struct LossInputs<'a, T> {
    /// Fresh (and replayed) trajectories, padded
    pub batch: &'a TrajectoryBatch,
    /// Batch re-evaluated under the policy being trained
    pub agent: &'a Evaluation<T>,
    /// Masked log-likelihood of the batch under the frozen prior, `[B]`
    pub prior_log_likelihood: &'a Array1<f32>,
    /// Added to the terminal rewards for this loss only, `[B]`
    pub intrinsic_rewards: Option<&'a Array1<f32>>,
    /// Per-trajectory loss weights (replay importance weights), `[B]`
    pub sample_weights: Option<&'a Array1<f32>>,
}

/// Result of [`PolicyUpdater::compute`]
pub struct LossOutput<T> {
    /// Scalar loss, differentiable if `T` is
    pub loss: T,
    /// Loss value for logging
    pub value: f64,
    /// Agent log-likelihood per trajectory (detached)
    pub agent_log_likelihood: Array1<f32>,
    /// Shaped reward per trajectory after baseline subtraction; in
    /// augmented-likelihood mode, the regression target
    pub shaped_rewards: Array1<f32>,
}

/// Computes the policy-gradient loss and carries baseline state across batches.
pub struct PolicyUpdater {
    mode: LossMode,
    sigma: f32,
    alpha: f32,
    entropy_coef: f32,
    likely_penalty_coef: f32,
    baseline: Baseline,
}

impl PolicyUpdater {
    pub fn new(mode: LossMode, sigma: f32, baseline: Baseline) -> Self {
        Self {
            mode,
            sigma,
            alpha: 1.0,
            entropy_coef: 0.0,
            likely_penalty_coef: 0.0,
            baseline,
        }
    }

    /// Exponent applied to the clamped shaped reward
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_entropy_coef(mut self, coef: f32) -> Self {
        self.entropy_coef = coef;
        self
    }

    /// Enable the `-mean(1 / agent_LL)` regularizer with weight `coef`
    pub fn with_likely_penalty(mut self, coef: f32) -> Self {
        self.likely_penalty_coef = coef;
        self
    }

    pub fn mode(&self) -> LossMode {
        self.mode
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// Compute the mean loss over the batch.
    pub fn compute<T: LossTensor>(&mut self, inputs: LossInputs<'_, T>) -> Result<LossOutput<T>> {
        let batch = inputs.batch;
        let expected = vec![batch.len(), batch.width()];
        for actual in [inputs.agent.log_probs.shape(), inputs.agent.entropy.shape()] {
            if actual != expected {
                return Err(SeqRlError::ShapeMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
        }
        for column in [
            Some(inputs.prior_log_likelihood),
            inputs.intrinsic_rewards,
            inputs.sample_weights,
        ]
        .into_iter()
        .flatten()
        {
            if column.len() != batch.len() {
                return Err(SeqRlError::ShapeMismatch {
                    expected: vec![batch.len()],
                    actual: vec![column.len()],
                });
            }
        }

        let like = &inputs.agent.log_probs;
        let mask = T::from_array(batch.mask.clone().into_dyn(), like)?;
        let agent_ll = masked_log_likelihood(like, &mask);

        let mut rewards = Array1::from(batch.rewards.clone());
        if let Some(intrinsic) = inputs.intrinsic_rewards {
            rewards += intrinsic;
        }
        let prior_ll = inputs.prior_log_likelihood;

        let (per_sample, shaped_rewards) = match self.mode {
            LossMode::AugmentedLikelihood => {
                let target = prior_ll + &(&rewards * self.sigma);
                let target_t = T::from_array(target.clone().into_dyn(), like)?;
                (target_t.minus(&agent_ll).squared(), target)
            }
            LossMode::Reinforce => {
                let mut shaped = shape_rewards(&rewards, prior_ll, self.sigma, self.alpha);
                let baseline = self.baseline.update(&shaped);
                shaped -= &baseline;

                let shaped_t = T::from_array(shaped.clone().into_dyn(), like)?;
                let mut per_sample = agent_ll.times(&shaped_t).scaled(-1.0);
                if self.entropy_coef != 0.0 {
                    let entropy = inputs.agent.entropy.masked(&mask).row_mean();
                    per_sample = per_sample.minus(&entropy.scaled(self.entropy_coef as f64));
                }
                (per_sample, shaped)
            }
        };

        let per_sample = match inputs.sample_weights {
            Some(weights) => per_sample.times(&T::from_array(weights.clone().into_dyn(), like)?),
            None => per_sample,
        };

        let mut loss = per_sample.mean_all();
        if self.likely_penalty_coef != 0.0 {
            let penalty = agent_ll.one_over().mean_all().scaled(-1.0);
            loss = loss.plus(&penalty.scaled(self.likely_penalty_coef as f64));
        }

        let value = loss.scalar()?;
        if !value.is_finite() {
            tracing::warn!(value, mode = %self.mode, "Non-finite loss");
        }

        Ok(LossOutput {
            value,
            agent_log_likelihood: to_array1(&agent_ll.detached())?,
            shaped_rewards,
            loss,
        })
    }
}
