//! Trainer configuration.

use crate::loss::{Baseline, BaselineKind, LossMode, PolicyUpdater};
use crate::oracle::RetryPolicy;
use super::schedule::CosineAnnealing;
use crate::replay::SamplerKind;
use crate::{Result, SeqRlError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Loss settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LossConfig {
    pub mode: LossMode,
    /// Weight of the prior log-likelihood (REINFORCE) or of the reward
    /// (augmented likelihood)
    pub sigma: f32,
    /// Exponent on the clamped shaped reward
    pub alpha: f32,
    /// Entropy bonus coefficient
    pub entropy_coef: f32,
    pub baseline: BaselineKind,
    /// Weight of the `-mean(1 / agent_LL)` regularizer (0 disables it)
    pub likely_penalty_coef: f32,
}

impl Default for LossConfig {
    fn default() -> Self {
        Self {
            mode: LossMode::Reinforce,
            sigma: 0.0,
            alpha: 1.0,
            entropy_coef: 0.0,
            baseline: BaselineKind::None,
            likely_penalty_coef: 0.0,
        }
    }
}

/// Experience replay settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub enabled: bool,
    /// Maximum number of unique trajectories kept per agent
    pub capacity: usize,
    /// Replayed trajectories appended to every fresh batch
    pub batch_size: usize,
    pub sampler: SamplerKind,
    /// Scale replayed losses by their importance weights
    pub importance_weighting: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 100,
            batch_size: 10,
            sampler: SamplerKind::default(),
            importance_weighting: false,
        }
    }
}

/// Cosine learning-rate annealing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LrAnnealingConfig {
    /// Generated sequences over which the rate decays
    pub horizon: u64,
    /// Rate reached at the end of the horizon
    pub min_learning_rate: f64,
}

impl Default for LrAnnealingConfig {
    fn default() -> Self {
        Self {
            horizon: 5000,
            min_learning_rate: 1e-4,
        }
    }
}

/// Configuration for the training loop
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    // Run
    /// Random seed
    pub seed: u64,
    /// Lanes per rollout
    pub num_lanes: usize,
    /// Maximum tokens per sequence, end token included
    pub max_length: usize,
    /// Stop once this many sequences have been generated
    pub total_sequences: u64,
    /// Independently optimized agents in the population
    pub num_agents: usize,

    // Objective
    pub loss: LossConfig,
    pub replay: ReplayConfig,
    /// Add the population disagreement bonus to each agent's rewards
    pub diversity_reward: bool,

    // Oracle
    /// Oracle calls per batch before giving up
    pub oracle_attempts: usize,
    /// Multiplier applied to raw oracle scores
    pub reward_scale: f32,
    /// Reward multiplier for sequences generated in an earlier iteration
    /// (1.0 disables it)
    pub repetition_penalty: f32,

    // Batch selection
    /// Drop repeated sequences within a fresh batch
    pub remove_duplicates: bool,
    /// Keep only the best `floor(topk · B)` fresh sequences (at least one)
    pub topk: Option<f32>,

    // Optimization
    pub learning_rate: f64,
    /// Global gradient-norm clip
    pub max_grad_norm: Option<f64>,
    /// Anneal each agent's learning rate (off when absent)
    pub lr_annealing: Option<LrAnnealingConfig>,

    // Logging
    /// Iterations between metric logs
    pub log_interval: u64,
    /// Show a progress bar
    pub progress: bool,
    /// Append per-iteration metrics to this JSON-lines file
    pub metrics_path: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_lanes: 128,
            max_length: 100,
            total_sequences: 10_000,
            num_agents: 1,

            loss: LossConfig::default(),
            replay: ReplayConfig::default(),
            diversity_reward: false,

            oracle_attempts: 3,
            reward_scale: 1.0,
            repetition_penalty: 1.0,

            remove_duplicates: true,
            topk: None,

            learning_rate: 1e-4,
            max_grad_norm: None,
            lr_annealing: None,

            log_interval: 1,
            progress: true,
            metrics_path: None,
        }
    }
}

fn invalid(message: impl Into<String>) -> SeqRlError {
    SeqRlError::Config(message.into())
}

impl TrainingConfig {
    /// Set the sequence budget
    pub fn with_sequences(mut self, total: u64) -> Self {
        self.total_sequences = total;
        self
    }

    /// Set lanes per rollout
    pub fn with_lanes(mut self, lanes: usize) -> Self {
        self.num_lanes = lanes;
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set population size
    pub fn with_agents(mut self, agents: usize) -> Self {
        self.num_agents = agents;
        self
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings the training loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.num_lanes == 0 {
            return Err(invalid("num_lanes must be positive"));
        }
        if self.max_length == 0 {
            return Err(invalid("max_length must be positive"));
        }
        if self.num_agents == 0 {
            return Err(invalid("num_agents must be positive"));
        }
        if self.oracle_attempts == 0 {
            return Err(invalid("oracle_attempts must be at least 1"));
        }
        if self.log_interval == 0 {
            return Err(invalid("log_interval must be positive"));
        }

        let loss = &self.loss;
        if !loss.sigma.is_finite() || loss.sigma < 0.0 {
            return Err(invalid(format!("sigma must be non-negative, got {}", loss.sigma)));
        }
        if !loss.alpha.is_finite() || loss.alpha <= 0.0 {
            return Err(invalid(format!("alpha must be positive, got {}", loss.alpha)));
        }
        if !loss.entropy_coef.is_finite() || loss.entropy_coef < 0.0 {
            return Err(invalid("entropy_coef must be non-negative"));
        }
        if !loss.likely_penalty_coef.is_finite() || loss.likely_penalty_coef < 0.0 {
            return Err(invalid("likely_penalty_coef must be non-negative"));
        }

        if self.replay.enabled {
            if self.replay.capacity == 0 {
                return Err(invalid("replay capacity must be positive"));
            }
            if self.replay.batch_size == 0 || self.replay.batch_size > self.replay.capacity {
                return Err(invalid(format!(
                    "replay batch_size must be in 1..={}, got {}",
                    self.replay.capacity, self.replay.batch_size
                )));
            }
            self.replay.sampler.validate()?;
        }

        if !self.reward_scale.is_finite() {
            return Err(invalid("reward_scale must be finite"));
        }
        if !(0.0..=1.0).contains(&self.repetition_penalty) {
            return Err(invalid(format!(
                "repetition_penalty must be in [0, 1], got {}",
                self.repetition_penalty
            )));
        }
        if let Some(topk) = self.topk {
            if topk.is_nan() || topk <= 0.0 || topk > 1.0 {
                return Err(invalid(format!("topk must be in (0, 1], got {}", topk)));
            }
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(invalid("learning_rate must be positive"));
        }
        if let Some(norm) = self.max_grad_norm {
            if norm.is_nan() || norm <= 0.0 {
                return Err(invalid("max_grad_norm must be positive"));
            }
        }
        if let Some(ref annealing) = self.lr_annealing {
            let floor = annealing.min_learning_rate;
            if floor.is_nan() || floor < 0.0 || floor > self.learning_rate {
                return Err(invalid(format!(
                    "min_learning_rate must be in [0, {}], got {}",
                    self.learning_rate, floor
                )));
            }
        }
        Ok(())
    }

    /// Oracle retry policy
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::new(self.oracle_attempts)
    }

    /// Fresh updater with its own baseline state
    pub fn updater(&self) -> PolicyUpdater {
        PolicyUpdater::new(
            self.loss.mode,
            self.loss.sigma,
            Baseline::new(self.loss.baseline),
        )
        .with_alpha(self.loss.alpha)
        .with_entropy_coef(self.loss.entropy_coef)
        .with_likely_penalty(self.loss.likely_penalty_coef)
    }

    /// Fresh learning-rate schedule, if annealing is on.
    ///
    /// The cosine period is the number of iterations that fit in the horizon.
    pub fn lr_schedule(&self) -> Option<CosineAnnealing> {
        self.lr_annealing.as_ref().map(|annealing| {
            let period = annealing.horizon / self.num_lanes.max(1) as u64;
            CosineAnnealing::new(self.learning_rate, annealing.min_learning_rate, period)
        })
    }

    /// Fresh trajectories kept per agent per iteration
    pub fn kept_per_batch(&self, generated: usize) -> usize {
        match self.topk {
            Some(topk) => ((topk as f64 * generated as f64).floor() as usize).clamp(1, generated.max(1)),
            None => generated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_is_valid() {
        TrainingConfig::default().validate().unwrap();
    }

    #[test]
    fn test_builders() {
        let config = TrainingConfig::default()
            .with_sequences(64)
            .with_lanes(8)
            .with_seed(7)
            .with_agents(3);
        assert_eq!(config.total_sequences, 64);
        assert_eq!(config.num_lanes, 8);
        assert_eq!(config.seed, 7);
        assert_eq!(config.num_agents, 3);
    }

    #[test]
    fn test_invalid_settings() {
        let cases: Vec<Box<dyn Fn(&mut TrainingConfig)>> = vec![
            Box::new(|c| c.num_lanes = 0),
            Box::new(|c| c.max_length = 0),
            Box::new(|c| c.oracle_attempts = 0),
            Box::new(|c| c.replay.capacity = 0),
            Box::new(|c| c.replay.batch_size = 1000),
            Box::new(|c| c.topk = Some(0.0)),
            Box::new(|c| c.topk = Some(1.5)),
            Box::new(|c| c.repetition_penalty = 1.2),
            Box::new(|c| c.loss.entropy_coef = -0.1),
            Box::new(|c| c.loss.alpha = 0.0),
            Box::new(|c| c.learning_rate = 0.0),
            Box::new(|c| {
                c.learning_rate = 1e-4;
                c.lr_annealing = Some(LrAnnealingConfig {
                    horizon: 5000,
                    min_learning_rate: 1e-3,
                })
            }),
            Box::new(|c| {
                c.replay.sampler = SamplerKind::Prioritized {
                    alpha: -1.0,
                    beta: 1.0,
                }
            }),
        ];
        for (i, mutate) in cases.iter().enumerate() {
            let mut config = TrainingConfig::default();
            mutate(&mut config);
            assert!(
                matches!(config.validate(), Err(SeqRlError::Config(_))),
                "case {} should be rejected",
                i
            );
        }
    }

    #[test]
    fn test_disabled_replay_skips_replay_checks() {
        let mut config = TrainingConfig::default();
        config.replay.enabled = false;
        config.replay.capacity = 0;
        config.validate().unwrap();
    }

    #[test]
    fn test_json_roundtrip_with_defaults() {
        let json = r#"{
            "num_lanes": 16,
            "loss": {"mode": "augmented_likelihood", "sigma": 120.0, "baseline": "loo"},
            "replay": {"sampler": {"kind": "uniform"}},
            "topk": 0.5
        }"#;
        let mut file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, json.as_bytes()).unwrap();

        let config = TrainingConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.num_lanes, 16);
        assert_eq!(config.loss.mode, LossMode::AugmentedLikelihood);
        assert_eq!(config.loss.baseline, BaselineKind::LeaveOneOut);
        assert_eq!(config.loss.alpha, 1.0);
        assert_eq!(config.replay.sampler, SamplerKind::Uniform);
        assert_eq!(config.max_length, 100);

        let back: TrainingConfig = serde_json::from_str(&config.to_json_string().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_unknown_kind_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, br#"{"loss": {"baseline": "median"}}"#).unwrap();
        assert!(TrainingConfig::from_json_file(file.path()).is_err());
    }

    #[test]
    fn test_lr_schedule_period() {
        let mut config = TrainingConfig::default().with_lanes(100);
        assert!(config.lr_schedule().is_none());

        config.learning_rate = 1e-3;
        config.lr_annealing = Some(LrAnnealingConfig::default());
        config.validate().unwrap();
        let schedule = config.lr_schedule().unwrap();
        assert_eq!(schedule.period(), 50);
        assert_eq!(schedule.learning_rate(), 1e-3);
    }

    #[test]
    fn test_kept_per_batch() {
        let mut config = TrainingConfig::default();
        assert_eq!(config.kept_per_batch(10), 10);
        config.topk = Some(0.25);
        assert_eq!(config.kept_per_batch(10), 2);
        config.topk = Some(0.5);
        assert_eq!(config.kept_per_batch(7), 3);
        config.topk = Some(0.01);
        assert_eq!(config.kept_per_batch(10), 1);
        config.topk = Some(1.0);
        assert_eq!(config.kept_per_batch(10), 10);
    }
}
