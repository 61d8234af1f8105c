//! Failure injection.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use seqrl::oracle::{Oracle, OracleError};
use seqrl::{Result, SeqRlError};

/// Wraps an oracle and fails a share of calls transiently.
///
/// Failures happen before the inner oracle is consulted, so a retried
/// batch is scored exactly once.
pub struct Flaky<O> {
    inner: O,
    failure_rate: f64,
    /// Calls left that fail unconditionally
    forced_failures: usize,
    calls: usize,
    failures: usize,
    rng: StdRng,
}

impl<O: Oracle> Flaky<O> {
    pub fn new(inner: O, failure_rate: f64, seed: u64) -> Result<Self> {
        if !(0.0..1.0).contains(&failure_rate) {
            return Err(SeqRlError::Config(format!(
                "failure rate must be in [0, 1), got {}",
                failure_rate
            )));
        }
        Ok(Self {
            inner,
            failure_rate,
            forced_failures: 0,
            calls: 0,
            failures: 0,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Fail the next `n` calls regardless of the failure rate
    pub fn with_forced_failures(mut self, n: usize) -> Self {
        self.forced_failures = n;
        self
    }

    /// Calls received, failed ones included
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn into_inner(self) -> O {
        self.inner
    }
}

impl<O: Oracle> Oracle for Flaky<O> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn score(&mut self, sequences: &[String]) -> std::result::Result<Vec<f32>, OracleError> {
        self.calls += 1;
        let forced = self.forced_failures > 0;
        if forced || self.rng.gen_bool(self.failure_rate) {
            self.forced_failures = self.forced_failures.saturating_sub(1);
            self.failures += 1;
            tracing::debug!(call = self.calls, "Injected oracle failure");
            return Err(OracleError::Transient(format!(
                "injected failure on call {}",
                self.calls
            )));
        }
        self.inner.score(sequences)
    }
}
