//! Bigram table policy on `ndarray`.

use super::{Act, Evaluation, Policy};
use crate::env::TrajectoryBatch;
use crate::{Result, SeqRlError, Token};
use ndarray::{Array1, Array2, ArrayD, Axis};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Next-token distribution conditioned only on the previous token.
///
/// Row `i` of the logits table is the categorical over the token following
/// token `i`. Cheap enough to serve as a frozen prior or as a sampling-only
/// policy on builds without libtorch. It has no trainable parameters.
pub struct TablePolicy {
    log_table: Array2<f32>,
    entropy: Array1<f32>,
    samplers: Vec<WeightedIndex<f32>>,
    rng: StdRng,
}

impl TablePolicy {
    /// Uniform next-token distribution over `vocab_size` tokens
    pub fn uniform(vocab_size: usize, seed: u64) -> Result<Self> {
        Self::from_logits(Array2::zeros((vocab_size, vocab_size)), seed)
    }

    /// Build from a square `[V, V]` logits table
    pub fn from_logits(logits: Array2<f32>, seed: u64) -> Result<Self> {
        let (rows, cols) = logits.dim();
        if rows == 0 || rows != cols {
            return Err(SeqRlError::ShapeMismatch {
                expected: vec![rows.max(1), rows.max(1)],
                actual: vec![rows, cols],
            });
        }

        let mut log_table = Array2::zeros((rows, cols));
        let mut entropy = Array1::zeros(rows);
        let mut samplers = Vec::with_capacity(rows);

        for (i, row) in logits.axis_iter(Axis(0)).enumerate() {
            let max = row.fold(f32::NEG_INFINITY, |m, &x| m.max(x));
            let log_z = max + row.mapv(|x| (x - max).exp()).sum().ln();
            let log_p = row.mapv(|x| x - log_z);
            let probs = log_p.mapv(f32::exp);

            entropy[i] = -probs
                .iter()
                .zip(log_p.iter())
                .filter(|(p, _)| **p > 0.0)
                .map(|(p, lp)| p * lp)
                .sum::<f32>();
            samplers.push(
                WeightedIndex::new(probs.iter().copied())
                    .map_err(|e| SeqRlError::Policy(format!("row {}: {}", i, e)))?,
            );
            log_table.row_mut(i).assign(&log_p);
        }

        Ok(Self {
            log_table,
            entropy,
            samplers,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Estimate bigram statistics from tokenized sequences.
    ///
    /// Each sequence is read as `start_token, tokens...`; `smoothing` is the
    /// pseudo-count added to every transition.
    pub fn from_corpus<S>(
        vocab_size: usize,
        start_token: Token,
        sequences: &[S],
        smoothing: f32,
        seed: u64,
    ) -> Result<Self>
    where
        S: AsRef<[Token]>,
    {
        if smoothing <= 0.0 {
            return Err(SeqRlError::Config("smoothing must be positive".to_string()));
        }

        let mut counts = Array2::from_elem((vocab_size, vocab_size), smoothing);
        for sequence in sequences {
            let mut previous = start_token;
            for &token in sequence.as_ref() {
                let (p, t) = (previous as usize, token as usize);
                if p >= vocab_size || t >= vocab_size {
                    return Err(SeqRlError::Policy(format!(
                        "token {} outside vocabulary of {}",
                        p.max(t),
                        vocab_size
                    )));
                }
                counts[[p, t]] += 1.0;
                previous = token;
            }
        }

        Self::from_logits(counts.mapv(f32::ln), seed)
    }

    pub fn vocab_size(&self) -> usize {
        self.log_table.nrows()
    }

    /// Log-probability table, row = previous token
    pub fn log_table(&self) -> &Array2<f32> {
        &self.log_table
    }

    fn row(&self, token: i64) -> Result<usize> {
        let row = token as usize;
        if token < 0 || row >= self.vocab_size() {
            return Err(SeqRlError::Policy(format!(
                "token {} outside vocabulary of {}",
                token,
                self.vocab_size()
            )));
        }
        Ok(row)
    }
}

impl Policy for TablePolicy {
    type Tensor = ArrayD<f32>;
    type Carry = ();

    fn initial_carry(&self, _lanes: usize) -> Result<()> {
        Ok(())
    }

    fn act(&mut self, last_tokens: &[Token], _carry: &()) -> Result<Act<()>> {
        let mut tokens = Vec::with_capacity(last_tokens.len());
        let mut log_probs = Vec::with_capacity(last_tokens.len());

        for &last in last_tokens {
            let row = self.row(last as i64)?;
            let next = self.samplers[row].sample(&mut self.rng);
            tokens.push(next as Token);
            log_probs.push(self.log_table[[row, next]]);
        }

        Ok(Act {
            tokens,
            log_probs,
            carry: (),
        })
    }

    fn evaluate(&self, batch: &TrajectoryBatch) -> Result<Evaluation<ArrayD<f32>>> {
        let shape = batch.inputs.dim();
        let mut log_probs = Array2::zeros(shape);
        let mut entropy = Array2::zeros(shape);

        for ((b, t), &input) in batch.inputs.indexed_iter() {
            let row = self.row(input)?;
            let action = batch.actions[[b, t]];
            let col = self.row(action)?;
            log_probs[[b, t]] = self.log_table[[row, col]];
            entropy[[b, t]] = self.entropy[row];
        }

        Ok(Evaluation {
            log_probs: log_probs.into_dyn(),
            entropy: entropy.into_dyn(),
        })
    }
}
