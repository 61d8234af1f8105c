//! Reward oracle interface and bounded retry.
//!
//! The oracle is the only blocking call in a training iteration. It scores a
//! whole batch of decoded sequences at once and may fail transiently;
//! [`RetryPolicy`] retries those failures a bounded number of times.

use crate::{Result, SeqRlError};
use serde::{Deserialize, Serialize};

/// Failure reported by an oracle
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum OracleError {
    /// Worth retrying (timeouts, busy backends)
    #[error("transient oracle failure: {0}")]
    Transient(String),
    /// Retrying cannot help
    #[error("fatal oracle failure: {0}")]
    Fatal(String),
}

/// External scorer of decoded sequences.
pub trait Oracle {
    /// Short name for logs
    fn name(&self) -> &str {
        "oracle"
    }

    /// One score per input, in input order.
    fn score(&mut self, sequences: &[String]) -> std::result::Result<Vec<f32>, OracleError>;
}

impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn score(&mut self, sequences: &[String]) -> std::result::Result<Vec<f32>, OracleError> {
        (**self).score(sequences)
    }
}

/// Scores returned by [`RetryPolicy::score`]
#[derive(Clone, Debug, PartialEq)]
pub struct OracleScores {
    pub scores: Vec<f32>,
    /// Calls made, including the successful one
    pub attempts: usize,
}

/// Bounded retry on transient oracle failures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize) -> Result<Self> {
        if max_attempts == 0 {
            return Err(SeqRlError::Config(
                "oracle attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self { max_attempts })
    }

    /// Score `sequences` with one oracle call per attempt.
    ///
    /// Transient failures are retried up to `max_attempts` calls in total,
    /// then surface as `OracleExhausted`. Fatal failures and wrong-length
    /// answers are returned immediately.
    pub fn score<O: Oracle + ?Sized>(
        &self,
        oracle: &mut O,
        sequences: &[String],
    ) -> Result<OracleScores> {
        if sequences.is_empty() {
            return Ok(OracleScores {
                scores: Vec::new(),
                attempts: 0,
            });
        }

        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            match oracle.score(sequences) {
                Ok(scores) if scores.len() == sequences.len() => {
                    return Ok(OracleScores {
                        scores,
                        attempts: attempt,
                    });
                }
                Ok(scores) => {
                    return Err(SeqRlError::OracleShape {
                        expected: sequences.len(),
                        actual: scores.len(),
                    });
                }
                Err(OracleError::Transient(message)) => {
                    tracing::warn!(
                        oracle = oracle.name(),
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %message,
                        "Transient oracle failure"
                    );
                    last_error = message;
                }
                Err(OracleError::Fatal(message)) => {
                    return Err(SeqRlError::Oracle(message));
                }
            }
        }

        Err(SeqRlError::OracleExhausted {
            attempts: self.max_attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fails transiently `failures` times, then returns sequence lengths.
    struct Scripted {
        failures: usize,
        calls: usize,
        fatal: bool,
        short: bool,
    }

    impl Scripted {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: 0,
                fatal: false,
                short: false,
            }
        }
    }

    impl Oracle for Scripted {
        fn score(&mut self, sequences: &[String]) -> std::result::Result<Vec<f32>, OracleError> {
            self.calls += 1;
            if self.fatal {
                return Err(OracleError::Fatal("bad input".to_string()));
            }
            if self.calls <= self.failures {
                return Err(OracleError::Transient(format!("busy #{}", self.calls)));
            }
            let mut scores: Vec<f32> = sequences.iter().map(|s| s.len() as f32).collect();
            if self.short {
                scores.pop();
            }
            Ok(scores)
        }
    }

    fn batch() -> Vec<String> {
        vec!["CCO".to_string(), "C".to_string()]
    }

    #[test]
    fn test_success_first_try() {
        let mut oracle = Scripted::new(0);
        let out = RetryPolicy::default().score(&mut oracle, &batch()).unwrap();
        assert_eq!(out.scores, vec![3.0, 1.0]);
        assert_eq!(out.attempts, 1);
        assert_eq!(oracle.calls, 1);
    }

    #[test]
    fn test_transient_retried() {
        let mut oracle = Scripted::new(2);
        let out = RetryPolicy::default().score(&mut oracle, &batch()).unwrap();
        assert_eq!(out.attempts, 3);
        assert_eq!(oracle.calls, 3);
    }

    #[test]
    fn test_exhaustion_reports_last_error() {
        let mut oracle = Scripted::new(10);
        match RetryPolicy::new(3).unwrap().score(&mut oracle, &batch()) {
            Err(SeqRlError::OracleExhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last_error, "busy #3");
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(oracle.calls, 3);
    }

    #[test]
    fn test_fatal_not_retried() {
        let mut oracle = Scripted::new(0);
        oracle.fatal = true;
        let result = RetryPolicy::default().score(&mut oracle, &batch());
        assert!(matches!(result, Err(SeqRlError::Oracle(_))));
        assert_eq!(oracle.calls, 1);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let mut oracle = Scripted::new(0);
        oracle.short = true;
        let result = RetryPolicy::default().score(&mut oracle, &batch());
        assert!(matches!(
            result,
            Err(SeqRlError::OracleShape {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_zero_attempts_is_config_error() {
        assert!(matches!(RetryPolicy::new(0), Err(SeqRlError::Config(_))));
    }

    #[test]
    fn test_boxed_oracle() {
        let mut oracle: Box<dyn Oracle> = Box::new(Scripted::new(0));
        let out = RetryPolicy::default().score(&mut oracle, &batch()).unwrap();
        assert_eq!(out.scores.len(), 2);
    }
}
