//! Population diversity rewards.

use crate::{Result, SeqRlError};
use ndarray::{Array1, Array2, Axis};

/// Stack per-agent log-likelihood columns into a `[batch, K]` matrix.
pub fn likelihood_matrix(columns: &[Array1<f32>]) -> Result<Array2<f32>> {
    let k = columns.len();
    let batch = columns.first().map(|c| c.len()).unwrap_or(0);

    let mut matrix = Array2::zeros((batch, k));
    for (j, column) in columns.iter().enumerate() {
        if column.len() != batch {
            return Err(SeqRlError::ShapeMismatch {
                expected: vec![batch],
                actual: vec![column.len()],
            });
        }
        matrix.column_mut(j).assign(column);
    }
    Ok(matrix)
}

/// Intrinsic reward per trajectory: the sample standard deviation of its
/// log-likelihood across the K agents. With a single agent this is zero.
pub fn intrinsic_rewards(likelihoods: &Array2<f32>) -> Array1<f32> {
    let (batch, k) = likelihoods.dim();
    if k < 2 {
        return Array1::zeros(batch);
    }
    likelihoods.std_axis(Axis(1), 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_single_agent_is_zero() {
        let matrix = likelihood_matrix(&[arr1(&[-3.0, -10.0, -0.5])]).unwrap();
        assert_eq!(intrinsic_rewards(&matrix), arr1(&[0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_disagreement_rewarded() {
        let matrix = likelihood_matrix(&[arr1(&[-2.0, -5.0]), arr1(&[-4.0, -5.0])]).unwrap();
        assert_eq!(matrix.dim(), (2, 2));
        let rewards = intrinsic_rewards(&matrix);
        // Unbiased std of {-2, -4} is sqrt(2)
        assert!((rewards[0] - 2f32.sqrt()).abs() < 1e-6);
        assert_eq!(rewards[1], 0.0);
    }

    #[test]
    fn test_ragged_columns_rejected() {
        assert!(likelihood_matrix(&[arr1(&[-1.0, -2.0]), arr1(&[-1.0])]).is_err());
    }
}
