//! Reward baselines.

use super::BaselineKind;
use ndarray::{Array1, Array2};

/// Initial pseudo-count of the moving average, so the first batch dominates
/// without dividing by zero.
const MOVING_AVERAGE_EPSILON: f64 = 1e-3;

/// Baseline estimator with its running state
#[derive(Clone, Debug, PartialEq)]
pub enum Baseline {
    None,
    /// Running mean of all rewards seen so far
    MovingAverage { mean: f64, count: f64 },
    /// Mean of the other rewards in the same batch
    LeaveOneOut,
}

impl Baseline {
    pub fn new(kind: BaselineKind) -> Self {
        match kind {
            BaselineKind::None => Self::None,
            BaselineKind::MovingAverage => Self::MovingAverage {
                mean: 0.0,
                count: MOVING_AVERAGE_EPSILON,
            },
            BaselineKind::LeaveOneOut => Self::LeaveOneOut,
        }
    }

    pub fn kind(&self) -> BaselineKind {
        match self {
            Self::None => BaselineKind::None,
            Self::MovingAverage { .. } => BaselineKind::MovingAverage,
            Self::LeaveOneOut => BaselineKind::LeaveOneOut,
        }
    }

    /// Fold `rewards` into the estimate and return the per-sample baseline.
    ///
    /// The moving average is updated before it is read, so the current
    /// batch contributes to its own baseline.
    pub fn update(&mut self, rewards: &Array1<f32>) -> Array1<f32> {
        match self {
            Self::None => Array1::zeros(rewards.len()),
            Self::MovingAverage { mean, count } => {
                if !rewards.is_empty() {
                    let batch_count = rewards.len() as f64;
                    let batch_mean = rewards.iter().map(|&r| r as f64).sum::<f64>() / batch_count;
                    let total = *count + batch_count;
                    *mean += (batch_mean - *mean) * batch_count / total;
                    *count = total;
                }
                Array1::from_elem(rewards.len(), *mean as f32)
            }
            Self::LeaveOneOut => leave_one_out(rewards),
        }
    }
}

/// `baseline[i] = (Σ_j r_j - r_i) / (K - 1)`.
///
/// Built from the all-ones-minus-identity mask over the batch. A batch of
/// one has nobody to leave in and gets a zero baseline.
pub fn leave_one_out(rewards: &Array1<f32>) -> Array1<f32> {
    let k = rewards.len();
    if k < 2 {
        return Array1::zeros(k);
    }

    let mask = Array2::<f32>::ones((k, k)) - Array2::<f32>::eye(k);
    mask.dot(rewards) / (k - 1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_leave_one_out() {
        let baseline = leave_one_out(&arr1(&[1.0, 2.0, 3.0]));
        assert_eq!(baseline, arr1(&[2.5, 2.0, 1.5]));
    }

    #[test]
    fn test_leave_one_out_single() {
        assert_eq!(leave_one_out(&arr1(&[4.0])), arr1(&[0.0]));
        assert_eq!(leave_one_out(&Array1::zeros(0)).len(), 0);
    }

    #[test]
    fn test_moving_average_weights_batches_by_count() {
        let mut baseline = Baseline::new(BaselineKind::MovingAverage);
        let first = baseline.update(&arr1(&[1.0, 1.0, 1.0, 1.0]));
        // 4 / (4 + 1e-3) of the way from 0 to 1
        assert!((first[0] - 0.99975).abs() < 1e-4);

        let second = baseline.update(&arr1(&[3.0, 3.0, 3.0, 3.0]));
        assert!((second[0] - 2.0).abs() < 1e-3);
        assert_eq!(second.len(), 4);

        match baseline {
            Baseline::MovingAverage { count, .. } => assert!((count - 8.001).abs() < 1e-9),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_none_is_zero() {
        let mut baseline = Baseline::new(BaselineKind::None);
        assert_eq!(baseline.update(&arr1(&[5.0, -1.0])), arr1(&[0.0, 0.0]));
        assert_eq!(baseline.kind(), BaselineKind::None);
    }
}
