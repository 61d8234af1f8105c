//! Vectorized token generation MDP.

use super::lane::{LaneState, Termination};
use super::trajectory::Trajectory;
use crate::policy::{Act, Policy};
use crate::{Result, SeqRlError, Token};
use smallvec::SmallVec;

/// Lanes that finished during one step
#[derive(Clone, Debug, Default)]
pub struct StepReport {
    /// Lanes that reached the end token on this step
    pub ended: SmallVec<[usize; 8]>,
    /// Lanes that hit `max_length` on this step
    pub truncated: SmallVec<[usize; 8]>,
}

impl StepReport {
    /// Number of lanes that became done on this step
    pub fn newly_done(&self) -> usize {
        self.ended.len() + self.truncated.len()
    }
}

/// Batched generation environment over B parallel lanes.
///
/// Lanes start `Running` and move to `Done` when the action is the end token
/// or the sequence reaches `max_length`. The environment never produces a
/// reward; trajectories leave with reward 0 and are scored afterwards.
///
/// The recurrent carry `C` is vectorized over lanes. It is owned here during
/// a rollout and only ever interpreted by the policy.
pub struct GenerationEnv<C = ()> {
    lanes: Vec<LaneState>,
    max_length: usize,
    start_token: Token,
    end_token: Token,
    carry: Option<C>,
    /// Vectorized steps taken since the last reset
    steps: usize,
}

impl<C> GenerationEnv<C> {
    /// Create an environment with `num_lanes` lanes
    pub fn new(
        num_lanes: usize,
        max_length: usize,
        start_token: Token,
        end_token: Token,
    ) -> Result<Self> {
        if num_lanes == 0 {
            return Err(SeqRlError::Config("num_lanes must be positive".to_string()));
        }
        if max_length == 0 {
            return Err(SeqRlError::Config("max_length must be positive".to_string()));
        }

        Ok(Self {
            lanes: (0..num_lanes).map(|_| LaneState::new(max_length)).collect(),
            max_length,
            start_token,
            end_token,
            carry: None,
            steps: 0,
        })
    }

    /// Start a new rollout: every lane back to `Running` and empty.
    pub fn reset(&mut self, carry: C) {
        for lane in &mut self.lanes {
            *lane = LaneState::new(self.max_length);
        }
        self.carry = Some(carry);
        self.steps = 0;
    }

    pub fn num_lanes(&self) -> usize {
        self.lanes.len()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn start_token(&self) -> Token {
        self.start_token
    }

    pub fn end_token(&self) -> Token {
        self.end_token
    }

    pub fn lanes(&self) -> &[LaneState] {
        &self.lanes
    }

    /// Recurrent carry for the next acting step
    pub fn carry(&self) -> Option<&C> {
        self.carry.as_ref()
    }

    /// Token each lane conditions on next (start token for empty lanes)
    pub fn last_tokens(&self) -> Vec<Token> {
        self.lanes
            .iter()
            .map(|lane| lane.last_token(self.start_token))
            .collect()
    }

    /// Rollout stopping condition: all lanes done or horizon reached.
    pub fn is_finished(&self) -> bool {
        self.steps >= self.max_length || self.lanes.iter().all(LaneState::is_done)
    }

    /// Number of lanes still running
    pub fn running(&self) -> usize {
        self.lanes.iter().filter(|l| !l.is_done()).count()
    }

    /// Apply one token per lane. Finished lanes ignore their token.
    pub fn step(&mut self, act: Act<C>) -> Result<StepReport> {
        let n = self.lanes.len();
        if act.tokens.len() != n || act.log_probs.len() != n {
            return Err(SeqRlError::ShapeMismatch {
                expected: vec![n],
                actual: vec![act.tokens.len(), act.log_probs.len()],
            });
        }

        let mut report = StepReport::default();
        for (i, lane) in self.lanes.iter_mut().enumerate() {
            if lane.step(act.tokens[i], act.log_probs[i], self.end_token, self.max_length) {
                match lane.termination() {
                    Some(Termination::EndToken) => report.ended.push(i),
                    Some(Termination::Truncated) => report.truncated.push(i),
                    None => {}
                }
            }
        }

        self.carry = Some(act.carry);
        self.steps += 1;
        Ok(report)
    }

    /// Turn the finished lanes into reward-less trajectories, in lane order.
    ///
    /// The environment is left empty; call `reset` before the next rollout.
    pub fn finish(&mut self) -> Result<Vec<Trajectory>> {
        if !self.is_finished() {
            return Err(SeqRlError::Rollout(format!(
                "{} lanes still running",
                self.running()
            )));
        }

        self.carry = None;
        let fresh = (0..self.lanes.len())
            .map(|_| LaneState::new(self.max_length))
            .collect();
        let lanes = std::mem::replace(&mut self.lanes, fresh);

        lanes
            .into_iter()
            .map(|lane| {
                let termination = lane.termination().ok_or_else(|| {
                    SeqRlError::Rollout("horizon reached with a running lane".to_string())
                })?;
                let (tokens, log_probs) = lane.into_parts();
                Ok(Trajectory::new(tokens, log_probs, termination))
            })
            .collect()
    }
}

impl<C> GenerationEnv<C> {
    /// Run `policy` from a fresh reset until the stopping predicate holds.
    pub fn rollout<P>(&mut self, policy: &mut P) -> Result<Vec<Trajectory>>
    where
        P: Policy<Carry = C>,
    {
        let carry = policy.initial_carry(self.num_lanes())?;
        self.reset(carry);

        while !self.is_finished() {
            let last = self.last_tokens();
            let act = match self.carry.as_ref() {
                Some(carry) => policy.act(&last, carry)?,
                None => return Err(SeqRlError::Rollout("missing recurrent carry".to_string())),
            };
            let report = self.step(act)?;
            if report.newly_done() > 0 {
                tracing::trace!(
                    step = self.steps,
                    ended = report.ended.len(),
                    truncated = report.truncated.len(),
                    "Lanes finished"
                );
            }
        }

        self.finish()
    }
}
