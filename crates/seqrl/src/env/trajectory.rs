//! Finished episodes and padded batches of them.

use super::lane::Termination;
use crate::vocab::Vocabulary;
use crate::{Result, SeqRlError, Token};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One lane's complete episode.
///
/// `tokens` excludes the implicit start token and includes the end token
/// when the episode ended naturally. Fields are read-only; the terminal
/// reward is attached by consuming the trajectory with [`Trajectory::with_reward`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    tokens: Vec<Token>,
    log_probs: Vec<f32>,
    reward: f32,
    termination: Termination,
}

impl Trajectory {
    /// Create a trajectory with zero reward
    pub fn new(tokens: Vec<Token>, log_probs: Vec<f32>, termination: Termination) -> Self {
        debug_assert_eq!(tokens.len(), log_probs.len());
        Self {
            tokens,
            log_probs,
            reward: 0.0,
            termination,
        }
    }

    /// Build a naturally terminated trajectory from text, e.g. to seed a
    /// replay buffer with known sequences. Acting log-probs are zero.
    pub fn from_text<V: Vocabulary + ?Sized>(vocabulary: &V, text: &str) -> Result<Self> {
        let mut tokens = vocabulary.encode(text)?;
        tokens.push(vocabulary.end_token());
        let log_probs = vec![0.0; tokens.len()];
        Ok(Self::new(tokens, log_probs, Termination::EndToken))
    }

    /// Attach the terminal reward
    pub fn with_reward(mut self, reward: f32) -> Self {
        self.reward = reward;
        self
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Log-probability of each token at acting time
    pub fn log_probs(&self) -> &[f32] {
        &self.log_probs
    }

    pub fn reward(&self) -> f32 {
        self.reward
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn is_truncated(&self) -> bool {
        self.termination == Termination::Truncated
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Deduplication identity: the exact token sequence without padding.
    pub fn canonical_key(&self) -> &[Token] {
        &self.tokens
    }

    /// Validity mask over `width` positions
    pub fn mask(&self, width: usize) -> Vec<f32> {
        (0..width)
            .map(|t| if t < self.tokens.len() { 1.0 } else { 0.0 })
            .collect()
    }
}

/// Keep the first occurrence of every canonical key, preserving order.
pub fn remove_duplicates(trajectories: Vec<Trajectory>) -> Vec<Trajectory> {
    let mut seen: HashSet<Vec<Token>> = HashSet::with_capacity(trajectories.len());
    trajectories
        .into_iter()
        .filter(|t| seen.insert(t.canonical_key().to_vec()))
        .collect()
}

/// Trajectories padded to a common width `T`, all arrays shaped `[B, T]`.
#[derive(Clone, Debug)]
pub struct TrajectoryBatch {
    /// Token each position conditions on: start token, then the actions shifted right
    pub inputs: Array2<i64>,
    /// Token chosen at each position
    pub actions: Array2<i64>,
    /// 1.0 on valid positions, 0.0 on padding
    pub mask: Array2<f32>,
    /// Acting-time log-probabilities (0.0 on padding)
    pub sample_log_probs: Array2<f32>,
    /// Terminal reward per trajectory
    pub rewards: Vec<f32>,
}

impl TrajectoryBatch {
    /// Pad `trajectories` with `pad_token` to the longest one.
    pub fn from_trajectories<'a, I>(trajectories: I, start_token: Token, pad_token: Token) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Trajectory>,
    {
        let trajectories: Vec<&Trajectory> = trajectories.into_iter().collect();
        if trajectories.is_empty() {
            return Err(SeqRlError::Rollout("cannot batch zero trajectories".to_string()));
        }

        let batch = trajectories.len();
        let width = trajectories.iter().map(|t| t.len()).max().unwrap_or(0).max(1);

        let mut inputs = Array2::from_elem((batch, width), pad_token as i64);
        let mut actions = Array2::from_elem((batch, width), pad_token as i64);
        let mut mask = Array2::zeros((batch, width));
        let mut sample_log_probs = Array2::zeros((batch, width));

        for (b, traj) in trajectories.iter().enumerate() {
            let mut previous = start_token;
            for (t, (&token, &log_prob)) in traj.tokens.iter().zip(&traj.log_probs).enumerate() {
                inputs[[b, t]] = previous as i64;
                actions[[b, t]] = token as i64;
                mask[[b, t]] = 1.0;
                sample_log_probs[[b, t]] = log_prob;
                previous = token;
            }
        }

        Ok(Self {
            inputs,
            actions,
            mask,
            sample_log_probs,
            rewards: trajectories.iter().map(|t| t.reward).collect(),
        })
    }

    /// Number of trajectories
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Padded sequence width
    pub fn width(&self) -> usize {
        self.mask.ncols()
    }

    /// Valid positions per trajectory
    pub fn lengths(&self) -> Vec<usize> {
        self.mask
            .rows()
            .into_iter()
            .map(|row| row.iter().filter(|&&m| m > 0.5).count())
            .collect()
    }
}
