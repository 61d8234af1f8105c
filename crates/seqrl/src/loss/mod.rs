//! Policy-gradient losses.
//!
//! Provides:
//! - `LossTensor` - the handful of tensor operations the losses need,
//!   implemented for `ndarray::ArrayD<f32>` and (with `torch`) `tch::Tensor`
//! - `PolicyUpdater` - augmented-likelihood and REINFORCE losses
//! - `Baseline` - moving-average and leave-one-out baselines
//! - Population diversity rewards

mod baseline;
mod diversity;
mod ndarray_backend;
#[cfg(feature = "torch")]
mod torch_backend;
mod updater;

pub use baseline::{leave_one_out, Baseline};
pub use diversity::{intrinsic_rewards, likelihood_matrix};
pub use updater::{LossInputs, LossOutput, PolicyUpdater};

use crate::{Result, SeqRlError};
use ndarray::{Array1, ArrayD, Ix1};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tensor operations used by the losses.
///
/// Binary operations expect operands of identical shape. Implementations
/// with autograd must propagate gradients through every operation except
/// [`LossTensor::detached`] and values built with [`LossTensor::from_array`].
pub trait LossTensor: Sized {
    /// Constant tensor with `values`, placed alongside `like`
    fn from_array(values: ArrayD<f32>, like: &Self) -> Result<Self>;

    /// Copy the values out (detached)
    fn to_array(&self) -> Result<ArrayD<f32>>;

    fn shape(&self) -> Vec<usize>;

    /// `self` where `mask > 0.5`, exactly zero elsewhere.
    ///
    /// This is a selection, not a product, so `-inf` on masked positions
    /// cannot turn into NaN.
    fn masked(&self, mask: &Self) -> Self;

    /// Sum over axis 1: `[B, T] -> [B]`
    fn row_sum(&self) -> Self;

    /// Mean over axis 1: `[B, T] -> [B]`
    fn row_mean(&self) -> Self;

    fn plus(&self, other: &Self) -> Self;

    fn minus(&self, other: &Self) -> Self;

    fn times(&self, other: &Self) -> Self;

    fn scaled(&self, factor: f64) -> Self;

    fn squared(&self) -> Self;

    /// Element-wise `1 / x`
    fn one_over(&self) -> Self;

    /// Mean of all elements as a 0-d tensor
    fn mean_all(&self) -> Self;

    fn detached(&self) -> Self;

    /// First element as a float, for logging
    fn scalar(&self) -> Result<f64> {
        let values = self.to_array()?;
        values
            .iter()
            .next()
            .map(|&v| v as f64)
            .ok_or_else(|| SeqRlError::ShapeMismatch {
                expected: vec![1],
                actual: values.shape().to_vec(),
            })
    }
}

/// Copy a `[B]` tensor into an `Array1`.
pub fn to_array1<T: LossTensor>(tensor: &T) -> Result<Array1<f32>> {
    let values = tensor.to_array()?;
    let shape = values.shape().to_vec();
    values
        .into_dimensionality::<Ix1>()
        .map_err(|_| SeqRlError::ShapeMismatch {
            expected: vec![shape.iter().product()],
            actual: shape,
        })
}

/// `LL = Σ_t mask[t] · log_probs[t]` per row of a `[B, T]` tensor.
pub fn masked_log_likelihood<T: LossTensor>(log_probs: &T, mask: &T) -> T {
    log_probs.masked(mask).row_sum()
}

/// Clamp-then-exponentiate reward shaping:
/// `clamp(reward + sigma · prior_LL, min = 0) ^ alpha`.
pub fn shape_rewards(
    rewards: &Array1<f32>,
    prior_log_likelihood: &Array1<f32>,
    sigma: f32,
    alpha: f32,
) -> Array1<f32> {
    ndarray::Zip::from(rewards)
        .and(prior_log_likelihood)
        .map_collect(|&r, &p| (r + sigma * p).max(0.0).powf(alpha))
}

/// Which loss the updater computes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossMode {
    /// `(prior_LL + sigma · reward - agent_LL)^2`
    #[serde(alias = "ahc", alias = "reinvent")]
    AugmentedLikelihood,
    /// `-agent_LL · shaped_reward - entropy_coef · entropy`
    #[default]
    Reinforce,
}

impl FromStr for LossMode {
    type Err = SeqRlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "augmented_likelihood" | "ahc" | "reinvent" => Ok(Self::AugmentedLikelihood),
            "reinforce" => Ok(Self::Reinforce),
            other => Err(SeqRlError::Config(format!("unknown loss mode: {}", other))),
        }
    }
}

impl fmt::Display for LossMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AugmentedLikelihood => write!(f, "augmented_likelihood"),
            Self::Reinforce => write!(f, "reinforce"),
        }
    }
}

/// Baseline estimator subtracted from shaped rewards
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineKind {
    #[default]
    None,
    #[serde(alias = "mab")]
    MovingAverage,
    #[serde(alias = "loo")]
    LeaveOneOut,
}

impl FromStr for BaselineKind {
    type Err = SeqRlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "moving_average" | "mab" => Ok(Self::MovingAverage),
            "leave_one_out" | "loo" => Ok(Self::LeaveOneOut),
            other => Err(SeqRlError::Config(format!("unknown baseline: {}", other))),
        }
    }
}

impl fmt::Display for BaselineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::MovingAverage => write!(f, "moving_average"),
            Self::LeaveOneOut => write!(f, "leave_one_out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_masked_log_likelihood() {
        let log_probs = arr2(&[[-0.1f32, -0.2, -5.0, -5.0]]).into_dyn();
        let mask = arr2(&[[1.0f32, 1.0, 0.0, 0.0]]).into_dyn();
        let ll = to_array1(&masked_log_likelihood(&log_probs, &mask)).unwrap();
        assert!((ll[0] + 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_masked_padding_never_nan() {
        let log_probs = arr2(&[[-0.5f32, f32::NEG_INFINITY, f32::NAN]]).into_dyn();
        let mask = arr2(&[[1.0f32, 0.0, 0.0]]).into_dyn();
        let ll = to_array1(&masked_log_likelihood(&log_probs, &mask)).unwrap();
        assert_eq!(ll[0], -0.5);
    }

    #[test]
    fn test_shape_rewards_clamps_before_power() {
        let rewards = arr1(&[1.0f32, -2.0, 0.5]);
        let prior = arr1(&[-1.0f32, 0.0, -1.0]);
        let shaped = shape_rewards(&rewards, &prior, 0.5, 2.0);
        assert_eq!(shaped[0], 0.25);
        // Negative pre-shaping value clamps to zero, not (-2)^2
        assert_eq!(shaped[1], 0.0);
        assert_eq!(shaped[2], 0.0);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("loo".parse::<BaselineKind>().unwrap(), BaselineKind::LeaveOneOut);
        assert_eq!(
            "moving_average".parse::<BaselineKind>().unwrap(),
            BaselineKind::MovingAverage
        );
        assert_eq!("reinforce".parse::<LossMode>().unwrap(), LossMode::Reinforce);
        assert!(matches!(
            "ppo".parse::<LossMode>(),
            Err(SeqRlError::Config(_))
        ));
        assert!("median".parse::<BaselineKind>().is_err());
    }

    #[test]
    fn test_kind_serde() {
        let kind: BaselineKind = serde_json::from_str("\"mab\"").unwrap();
        assert_eq!(kind, BaselineKind::MovingAverage);
        assert_eq!(
            serde_json::to_string(&LossMode::AugmentedLikelihood).unwrap(),
            "\"augmented_likelihood\""
        );
    }
}
