//! Embedding/GRU token model.

use super::{Act, Evaluation, Policy};
use crate::env::TrajectoryBatch;
use crate::{Result, SeqRlError, Token};
use serde::{Deserialize, Serialize};
use tch::{nn, nn::Module, nn::RNN, Device, Kind, Tensor};

/// GRU policy dimensions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GruConfig {
    pub vocab_size: i64,
    pub embedding_dim: i64,
    pub hidden_size: i64,
    pub num_layers: i64,
}

impl Default for GruConfig {
    fn default() -> Self {
        Self {
            vocab_size: 0,
            embedding_dim: 128,
            hidden_size: 512,
            num_layers: 3,
        }
    }
}

/// Autoregressive token policy: embedding, stacked GRU, linear head.
///
/// The carry is the GRU hidden state `[num_layers, B, hidden_size]`.
pub struct GruPolicy {
    config: GruConfig,
    vs: nn::VarStore,
    embedding: nn::Embedding,
    gru: nn::GRU,
    head: nn::Linear,
    device: Device,
}

impl GruPolicy {
    /// Create a randomly initialized policy
    pub fn new(config: GruConfig, device: Device) -> Result<Self> {
        if config.vocab_size <= 0
            || config.embedding_dim <= 0
            || config.hidden_size <= 0
            || config.num_layers <= 0
        {
            return Err(SeqRlError::Config(format!(
                "GRU dimensions must be positive: {:?}",
                config
            )));
        }

        let vs = nn::VarStore::new(device);
        let root = vs.root();

        let embedding = nn::embedding(
            &root / "embedding",
            config.vocab_size,
            config.embedding_dim,
            Default::default(),
        );
        let gru = nn::gru(
            &root / "gru",
            config.embedding_dim,
            config.hidden_size,
            nn::RNNConfig {
                num_layers: config.num_layers,
                batch_first: true,
                ..Default::default()
            },
        );
        let head = nn::linear(
            &root / "head",
            config.hidden_size,
            config.vocab_size,
            Default::default(),
        );

        Ok(Self {
            config,
            vs,
            embedding,
            gru,
            head,
            device,
        })
    }

    /// Copy with identical weights and no trainable variables
    pub fn frozen_copy(&self) -> Result<Self> {
        let mut copy = Self::new(self.config.clone(), self.device)?;
        copy.vs.copy(&self.vs)?;
        copy.vs.freeze();
        Ok(copy)
    }

    pub fn config(&self) -> &GruConfig {
        &self.config
    }

    /// Get variable store
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    /// Get mutable variable store
    pub fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }

    /// Get number of parameters
    pub fn num_parameters(&self) -> usize {
        self.vs
            .trainable_variables()
            .iter()
            .map(|t| t.numel())
            .sum()
    }

    fn check_tokens<'a, I: IntoIterator<Item = &'a i64>>(&self, tokens: I) -> Result<()> {
        for &token in tokens {
            if token < 0 || token >= self.config.vocab_size {
                return Err(SeqRlError::Policy(format!(
                    "token {} outside vocabulary of {}",
                    token, self.config.vocab_size
                )));
            }
        }
        Ok(())
    }
}

impl Policy for GruPolicy {
    type Tensor = Tensor;
    type Carry = Tensor;

    fn initial_carry(&self, lanes: usize) -> Result<Tensor> {
        Ok(Tensor::zeros(
            [self.config.num_layers, lanes as i64, self.config.hidden_size],
            (Kind::Float, self.device),
        ))
    }

    fn act(&mut self, last_tokens: &[Token], carry: &Tensor) -> Result<Act<Tensor>> {
        let last: Vec<i64> = last_tokens.iter().map(|&t| t as i64).collect();
        self.check_tokens(&last)?;

        tch::no_grad(|| -> Result<Act<Tensor>> {
            let input = Tensor::from_slice(&last).to_device(self.device);
            let embedded = self.embedding.forward(&input);
            let state = self.gru.step(&embedded, &nn::GRUState(carry.shallow_clone()));
            let hidden = state.0.select(0, -1);

            let log_probs = self.head.forward(&hidden).log_softmax(-1, Kind::Float);
            let actions = log_probs.exp().f_multinomial(1, true)?;
            let chosen = log_probs.gather(1, &actions, false).squeeze_dim(1);

            let tokens = Vec::<i64>::try_from(actions.squeeze_dim(1).to_device(Device::Cpu))?
                .into_iter()
                .map(|t| t as Token)
                .collect();
            let log_probs = Vec::<f32>::try_from(chosen.to_kind(Kind::Float).to_device(Device::Cpu))?;

            Ok(Act {
                tokens,
                log_probs,
                carry: state.0,
            })
        })
    }

    fn evaluate(&self, batch: &TrajectoryBatch) -> Result<Evaluation<Tensor>> {
        self.check_tokens(batch.inputs.iter())?;
        self.check_tokens(batch.actions.iter())?;

        let (b, t) = batch.inputs.dim();
        let shape = [b as i64, t as i64];
        let inputs = Tensor::from_slice(&batch.inputs.iter().copied().collect::<Vec<_>>())
            .reshape(shape)
            .to_device(self.device);
        let actions = Tensor::from_slice(&batch.actions.iter().copied().collect::<Vec<_>>())
            .reshape(shape)
            .to_device(self.device);

        let embedded = self.embedding.forward(&inputs);
        let (output, _) = self.gru.seq(&embedded);
        let log_probs = self.head.forward(&output).log_softmax(-1, Kind::Float);

        let chosen = log_probs
            .gather(2, &actions.unsqueeze(-1), false)
            .squeeze_dim(-1);
        let entropy = -(log_probs.exp() * &log_probs).sum_dim_intlist([-1i64].as_slice(), false, Kind::Float);

        Ok(Evaluation {
            log_probs: chosen,
            entropy,
        })
    }

    fn evaluate_detached(&self, batch: &TrajectoryBatch) -> Result<Evaluation<Tensor>> {
        tch::no_grad(|| self.evaluate(batch))
    }
}
