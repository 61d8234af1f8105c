//! Penalty for regenerating old sequences.

use crate::env::Trajectory;
use crate::Token;
use std::collections::HashSet;

/// Multiplies the reward of sequences an agent already produced in an
/// earlier iteration by `factor`.
#[derive(Clone, Debug)]
pub struct RepetitionPenalty {
    factor: f32,
    seen: HashSet<Vec<Token>>,
}

impl RepetitionPenalty {
    pub fn new(factor: f32) -> Self {
        Self {
            factor,
            seen: HashSet::new(),
        }
    }

    /// `false` when the factor is 1.0 and nothing is tracked
    pub fn is_enabled(&self) -> bool {
        self.factor < 1.0
    }

    /// Distinct sequences remembered so far
    pub fn seen(&self) -> usize {
        self.seen.len()
    }

    /// Penalize repeats from earlier batches, then remember this batch.
    ///
    /// Returns the trajectories and the number that were penalized.
    pub fn apply(&mut self, trajectories: Vec<Trajectory>) -> (Vec<Trajectory>, usize) {
        if !self.is_enabled() {
            return (trajectories, 0);
        }

        let mut repeated = 0;
        let out: Vec<Trajectory> = trajectories
            .into_iter()
            .map(|t| {
                if self.seen.contains(t.canonical_key()) {
                    repeated += 1;
                    let reward = t.reward() * self.factor;
                    t.with_reward(reward)
                } else {
                    t
                }
            })
            .collect();

        for t in &out {
            if !self.seen.contains(t.canonical_key()) {
                self.seen.insert(t.canonical_key().to_vec());
            }
        }
        (out, repeated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Termination;

    fn traj(tokens: &[Token], reward: f32) -> Trajectory {
        Trajectory::new(tokens.to_vec(), vec![0.0; tokens.len()], Termination::EndToken)
            .with_reward(reward)
    }

    #[test]
    fn test_only_earlier_batches_penalized() {
        let mut penalty = RepetitionPenalty::new(0.5);
        let (first, repeated) = penalty.apply(vec![traj(&[1, 2], 1.0), traj(&[1, 2], 1.0)]);
        assert_eq!(repeated, 0);
        assert!(first.iter().all(|t| t.reward() == 1.0));

        let (second, repeated) = penalty.apply(vec![traj(&[1, 2], 0.8), traj(&[3], 0.8)]);
        assert_eq!(repeated, 1);
        assert_eq!(second[0].reward(), 0.4);
        assert_eq!(second[1].reward(), 0.8);
        assert_eq!(penalty.seen(), 2);
    }

    #[test]
    fn test_disabled_tracks_nothing() {
        let mut penalty = RepetitionPenalty::new(1.0);
        penalty.apply(vec![traj(&[1], 1.0)]);
        let (out, repeated) = penalty.apply(vec![traj(&[1], 1.0)]);
        assert_eq!(repeated, 0);
        assert_eq!(out[0].reward(), 1.0);
        assert_eq!(penalty.seen(), 0);
    }
}
