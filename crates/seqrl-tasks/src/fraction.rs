//! Character-fraction task.

use seqrl::oracle::{Oracle, OracleError};

/// Share of a sequence's characters drawn from a fixed set. Empty
/// sequences score 0.
pub struct TokenFraction {
    chars: Vec<char>,
}

impl TokenFraction {
    pub fn new(chars: &str) -> Self {
        Self {
            chars: chars.chars().collect(),
        }
    }

    fn reward(&self, sequence: &str) -> f32 {
        let total = sequence.chars().count();
        if total == 0 {
            return 0.0;
        }
        let hits = sequence.chars().filter(|c| self.chars.contains(c)).count();
        hits as f32 / total as f32
    }
}

impl Oracle for TokenFraction {
    fn name(&self) -> &str {
        "fraction"
    }

    fn score(&mut self, sequences: &[String]) -> Result<Vec<f32>, OracleError> {
        Ok(sequences.iter().map(|s| self.reward(s)).collect())
    }
}
