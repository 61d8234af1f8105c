//! Target-length task.

use seqrl::oracle::{Oracle, OracleError};
use seqrl::{Result, SeqRlError};

/// Gaussian bump around a target character count:
/// `exp(-((len - target) / width)^2)`.
pub struct LengthTarget {
    target: usize,
    width: f32,
}

impl LengthTarget {
    pub fn new(target: usize, width: f32) -> Result<Self> {
        if width.is_nan() || width <= 0.0 {
            return Err(SeqRlError::Config(format!(
                "length width must be positive, got {}",
                width
            )));
        }
        Ok(Self { target, width })
    }

    pub fn target(&self) -> usize {
        self.target
    }

    fn reward(&self, sequence: &str) -> f32 {
        let distance = (sequence.chars().count() as f32 - self.target as f32) / self.width;
        (-distance * distance).exp()
    }
}

impl Oracle for LengthTarget {
    fn name(&self) -> &str {
        "length"
    }

    fn score(&mut self, sequences: &[String]) -> std::result::Result<Vec<f32>, OracleError> {
        Ok(sequences.iter().map(|s| self.reward(s)).collect())
    }
}
