//! Replay sampling strategies.

use crate::{Result, SeqRlError};
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Added to every clamped priority so zero-priority entries stay reachable.
pub const PRIORITY_EPSILON: f32 = 1e-8;

fn one() -> f32 {
    1.0
}

/// How a replay buffer draws samples. Fixed per buffer instance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SamplerKind {
    /// Probability ∝ `priority^alpha`, importance weights `(1/(N·p))^beta`
    Prioritized {
        #[serde(default = "one")]
        alpha: f32,
        #[serde(default = "one")]
        beta: f32,
    },
    /// Every resident entry equally likely, unit weights
    Uniform,
}

impl Default for SamplerKind {
    fn default() -> Self {
        Self::Prioritized {
            alpha: 1.0,
            beta: 1.0,
        }
    }
}

impl SamplerKind {
    pub fn validate(&self) -> Result<()> {
        if let Self::Prioritized { alpha, beta } = *self {
            if alpha.is_nan() || beta.is_nan() || alpha < 0.0 || beta < 0.0 {
                return Err(SeqRlError::Config(format!(
                    "prioritized sampler needs non-negative alpha and beta, got {} and {}",
                    alpha, beta
                )));
            }
        }
        Ok(())
    }

    /// Draw `n` distinct slot indices out of `priorities.len()`.
    ///
    /// Returns the indices in draw order and their normalized importance
    /// weights (largest attainable weight is 1).
    pub(crate) fn draw(
        &self,
        rng: &mut StdRng,
        priorities: &[f32],
        n: usize,
    ) -> Result<(Vec<usize>, Vec<f32>)> {
        let size = priorities.len();
        match *self {
            Self::Uniform => {
                let indices = index::sample(rng, size, n).into_vec();
                Ok((indices, vec![1.0; n]))
            }
            Self::Prioritized { alpha, beta } => {
                let weights: Vec<f64> = priorities
                    .iter()
                    .map(|&p| ((p.max(0.0) + PRIORITY_EPSILON) as f64).powf(alpha as f64))
                    .collect();
                let total: f64 = weights.iter().sum();

                let indices = index::sample_weighted(rng, size, |i| weights[i], n)
                    .map_err(|e| SeqRlError::Config(format!("invalid replay priorities: {}", e)))?
                    .into_vec();

                // (1/(N·p_i))^beta / (1/(N·p_min))^beta = (p_min / p_i)^beta
                let p_min = weights.iter().copied().fold(f64::INFINITY, f64::min) / total;
                let importance = indices
                    .iter()
                    .map(|&i| (p_min / (weights[i] / total)).powf(beta as f64) as f32)
                    .collect();
                Ok((indices, importance))
            }
        }
    }
}

impl FromStr for SamplerKind {
    type Err = SeqRlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "prioritized" => Ok(Self::default()),
            "uniform" => Ok(Self::Uniform),
            other => Err(SeqRlError::Config(format!("unknown sampler: {}", other))),
        }
    }
}

impl fmt::Display for SamplerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prioritized { alpha, beta } => {
                write!(f, "prioritized(alpha={}, beta={})", alpha, beta)
            }
            Self::Uniform => write!(f, "uniform"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_parse() {
        assert_eq!("uniform".parse::<SamplerKind>().unwrap(), SamplerKind::Uniform);
        assert!(matches!(
            "prioritized".parse::<SamplerKind>().unwrap(),
            SamplerKind::Prioritized { .. }
        ));
        assert!(matches!(
            "reservoir".parse::<SamplerKind>(),
            Err(SeqRlError::Config(_))
        ));
    }

    #[test]
    fn test_serde_defaults() {
        let kind: SamplerKind = serde_json::from_str(r#"{"kind": "prioritized", "alpha": 0.5}"#).unwrap();
        assert_eq!(kind, SamplerKind::Prioritized { alpha: 0.5, beta: 1.0 });
        let kind: SamplerKind = serde_json::from_str(r#"{"kind": "uniform"}"#).unwrap();
        assert_eq!(kind, SamplerKind::Uniform);
    }

    #[test]
    fn test_importance_weights_normalized() {
        let mut rng = StdRng::seed_from_u64(0);
        let sampler = SamplerKind::Prioritized { alpha: 1.0, beta: 1.0 };
        let (indices, weights) = sampler.draw(&mut rng, &[1.0, 2.0, 4.0], 3).unwrap();

        for (&i, &w) in indices.iter().zip(&weights) {
            let expected = [1.0, 0.5, 0.25][i];
            assert!((w - expected).abs() < 1e-5, "slot {} weight {}", i, w);
        }
    }

    #[test]
    fn test_negative_priorities_are_clamped() {
        let mut rng = StdRng::seed_from_u64(1);
        let sampler = SamplerKind::default();
        let (indices, _) = sampler.draw(&mut rng, &[-3.0, 5.0], 1).unwrap();
        assert_eq!(indices, vec![1]);
    }

    fn draw_counts(sampler: SamplerKind, priorities: &[f32], draws: usize) -> Vec<usize> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = vec![0; priorities.len()];
        for _ in 0..draws {
            let (indices, _) = sampler.draw(&mut rng, priorities, 1).unwrap();
            counts[indices[0]] += 1;
        }
        counts
    }

    #[test]
    fn test_zero_alpha_draws_uniformly() {
        let sampler = SamplerKind::Prioritized { alpha: 0.0, beta: 1.0 };
        let counts = draw_counts(sampler, &[0.1, 1.0, 100.0, 1000.0], 4000);
        for count in counts {
            assert!((850..=1150).contains(&count), "count {}", count);
        }
    }

    #[test]
    fn test_draw_frequency_follows_priority() {
        // p = 10 / 11 for the second slot
        let linear = draw_counts(SamplerKind::default(), &[1.0, 10.0], 2000);
        assert!((1690..=1950).contains(&linear[1]), "counts {:?}", linear);

        // p = 100 / 101 once priorities are squared
        let sharp = SamplerKind::Prioritized { alpha: 2.0, beta: 1.0 };
        let squared = draw_counts(sharp, &[1.0, 10.0], 2000);
        assert!(squared[1] > 1940, "counts {:?}", squared);
        assert!(squared[1] > linear[1]);
    }

    #[test]
    fn test_invalid_exponents() {
        assert!(SamplerKind::Prioritized { alpha: -1.0, beta: 1.0 }.validate().is_err());
        assert!(SamplerKind::Uniform.validate().is_ok());
    }
}
