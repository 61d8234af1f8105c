//! Per-lane state machine.

use crate::Token;
use serde::{Deserialize, Serialize};

/// Why a lane stopped generating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The policy emitted the end token
    EndToken,
    /// The sequence hit `max_length` without an end token
    Truncated,
}

/// Lane status. `Done` is terminal until the environment is reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaneStatus {
    Running,
    Done(Termination),
}

/// One generation slot within a vectorized batch.
#[derive(Clone, Debug)]
pub struct LaneState {
    /// Tokens appended so far (the implicit start token is not stored)
    tokens: Vec<Token>,
    /// Log-probability of each appended token at acting time
    log_probs: Vec<f32>,
    /// Number of accepted steps
    step_count: usize,
    status: LaneStatus,
}

impl LaneState {
    /// Create a running lane with room for `max_length` tokens
    pub fn new(max_length: usize) -> Self {
        Self {
            tokens: Vec::with_capacity(max_length),
            log_probs: Vec::with_capacity(max_length),
            step_count: 0,
            status: LaneStatus::Running,
        }
    }

    /// Apply one action.
    ///
    /// Returns `true` only on the step that moves the lane to `Done`. Steps
    /// on a finished lane are ignored and return `false`.
    pub fn step(&mut self, token: Token, log_prob: f32, end_token: Token, max_length: usize) -> bool {
        if self.is_done() {
            return false;
        }

        self.tokens.push(token);
        self.log_probs.push(log_prob);
        self.step_count += 1;

        if token == end_token {
            self.status = LaneStatus::Done(Termination::EndToken);
            true
        } else if self.tokens.len() >= max_length {
            self.status = LaneStatus::Done(Termination::Truncated);
            true
        } else {
            false
        }
    }

    pub fn status(&self) -> LaneStatus {
        self.status
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status, LaneStatus::Done(_))
    }

    /// Termination kind, if the lane is done
    pub fn termination(&self) -> Option<Termination> {
        match self.status {
            LaneStatus::Done(t) => Some(t),
            LaneStatus::Running => None,
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn log_probs(&self) -> &[f32] {
        &self.log_probs
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Last appended token, or `start_token` for an empty lane
    pub fn last_token(&self, start_token: Token) -> Token {
        self.tokens.last().copied().unwrap_or(start_token)
    }

    pub(crate) fn into_parts(self) -> (Vec<Token>, Vec<f32>) {
        (self.tokens, self.log_probs)
    }
}
