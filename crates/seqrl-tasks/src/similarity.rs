//! Character-bigram similarity to a target string.

use seqrl::oracle::{Oracle, OracleError};
use std::collections::HashSet;

/// Tanimoto similarity between the character-bigram sets of each sequence
/// and a fixed target.
///
/// Scores are in `[0, 1]`; the target itself scores 1 and an empty sequence
/// scores 0.
pub struct TargetSimilarity {
    target: String,
    target_bigrams: HashSet<(char, char)>,
}

fn bigrams(text: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

impl TargetSimilarity {
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        let target_bigrams = bigrams(&target);
        Self {
            target,
            target_bigrams,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Similarity of one sequence
    pub fn similarity(&self, sequence: &str) -> f32 {
        let candidate = bigrams(sequence);
        let shared = candidate.intersection(&self.target_bigrams).count();
        let union = candidate.len() + self.target_bigrams.len() - shared;
        if union == 0 {
            return if sequence == self.target { 1.0 } else { 0.0 };
        }
        shared as f32 / union as f32
    }
}

impl Oracle for TargetSimilarity {
    fn name(&self) -> &str {
        "similarity"
    }

    fn score(&mut self, sequences: &[String]) -> Result<Vec<f32>, OracleError> {
        Ok(sequences.iter().map(|s| self.similarity(s)).collect())
    }
}
