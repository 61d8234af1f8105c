//! Population training loop.

use super::config::TrainingConfig;
use super::penalty::RepetitionPenalty;
use super::registry::Registry;
use super::schedule::CosineAnnealing;
use crate::env::{remove_duplicates, GenerationEnv, Trajectory, TrajectoryBatch};
use crate::log::{MetricLogger, Metrics, NoOpLogger};
use crate::loss::{
    intrinsic_rewards, likelihood_matrix, masked_log_likelihood, to_array1, LossInputs,
    LossTensor, PolicyUpdater,
};
use crate::oracle::{Oracle, RetryPolicy};
use crate::policy::{Optimizer, Policy};
use crate::replay::{ReplayBuffer, ReplayEntry};
use crate::utils::{abbreviate, format_duration, summarize};
use crate::vocab::Vocabulary;
use crate::{Result, SeqRlError};
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array1;
use std::time::Instant;

/// One member of the population: a policy with everything it owns.
pub struct AgentState<P, O> {
    pub policy: P,
    pub optimizer: O,
    /// Private replay buffer, if replay is enabled
    pub buffer: Option<ReplayBuffer>,
    pub updater: PolicyUpdater,
    repetition: RepetitionPenalty,
    schedule: Option<CosineAnnealing>,
}

impl<P, O> AgentState<P, O> {
    /// Set up agent `index` of a run configured by `config`
    pub fn new(policy: P, optimizer: O, config: &TrainingConfig, index: usize) -> Result<Self> {
        let buffer = if config.replay.enabled {
            Some(ReplayBuffer::new(
                config.replay.capacity,
                config.replay.sampler,
                config.seed.wrapping_add(index as u64),
            )?)
        } else {
            None
        };

        Ok(Self {
            policy,
            optimizer,
            buffer,
            updater: config.updater(),
            repetition: RepetitionPenalty::new(config.repetition_penalty),
            schedule: config.lr_schedule(),
        })
    }

    /// Learning-rate schedule, if annealing is on
    pub fn schedule(&self) -> Option<&CosineAnnealing> {
        self.schedule.as_ref()
    }
}

/// What one agent did in one iteration
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IterationStats {
    pub agent: usize,
    /// Sequences generated
    pub generated: usize,
    /// Sequences that hit `max_length` without an end token
    pub truncated: usize,
    /// Sequences rewarded less for repeating an earlier one
    pub repeated: usize,
    /// Fresh sequences left after de-duplication and top-k
    pub kept: usize,
    /// Replayed sequences appended to the batch
    pub replayed: usize,
    pub mean_reward: f64,
    pub min_reward: f64,
    pub max_reward: f64,
    pub mean_intrinsic_reward: f64,
    pub mean_length: f64,
    pub loss: f64,
    /// Learning rate the update ran with, when annealing
    pub learning_rate: Option<f64>,
    pub oracle_attempts: usize,
    pub buffer_len: usize,
}

impl IterationStats {
    /// Metrics keyed `agent{i}/name`
    pub fn metrics(&self) -> Metrics {
        let prefix = format!("agent{}", self.agent);
        [
            ("reward", self.mean_reward),
            ("min_reward", self.min_reward),
            ("max_reward", self.max_reward),
            ("intrinsic_reward", self.mean_intrinsic_reward),
            ("episode_length", self.mean_length),
            ("truncated", self.truncated as f64),
            ("repeated", self.repeated as f64),
            ("replayed", self.replayed as f64),
            ("loss", self.loss),
            ("buffer_size", self.buffer_len as f64),
        ]
        .into_iter()
        .chain(self.learning_rate.map(|lr| ("lr", lr)))
        .map(|(name, value)| (format!("{}/{}", prefix, name), value))
        .collect()
    }
}

/// End-of-run summary
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingSummary {
    pub iterations: u64,
    pub completed_sequences: u64,
    pub best_reward: Option<f32>,
    pub elapsed_secs: f64,
}

/// Rollout, scoring, replay and optimization for a population of agents.
///
/// Every iteration runs each agent to completion in index order. The
/// sequence budget is checked only between iterations.
pub struct Trainer<P: Policy, Q, O> {
    config: TrainingConfig,
    agents: Vec<AgentState<P, O>>,
    prior: Q,
    vocabulary: Box<dyn Vocabulary>,
    oracle: Box<dyn Oracle>,
    retry: RetryPolicy,
    env: GenerationEnv<P::Carry>,
    logger: Box<dyn MetricLogger>,
    progress: Option<ProgressBar>,
    iteration: u64,
    completed: u64,
    best_reward: Option<f32>,
    start_time: Instant,
}

impl<P, Q, O> Trainer<P, Q, O>
where
    P: Policy,
    Q: Policy,
    O: Optimizer<P::Tensor>,
{
    /// Create a trainer over an already built population and frozen prior
    pub fn new(
        config: TrainingConfig,
        agents: Vec<AgentState<P, O>>,
        prior: Q,
        vocabulary: Box<dyn Vocabulary>,
        oracle: Box<dyn Oracle>,
    ) -> Result<Self> {
        config.validate()?;
        if agents.len() != config.num_agents {
            return Err(SeqRlError::Config(format!(
                "expected {} agents, got {}",
                config.num_agents,
                agents.len()
            )));
        }

        let env = GenerationEnv::new(
            config.num_lanes,
            config.max_length,
            vocabulary.start_token(),
            vocabulary.end_token(),
        )?;
        let retry = config.retry_policy()?;

        let progress = if config.progress && config.total_sequences > 0 {
            let pb = ProgressBar::new(config.total_sequences);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .map(|s| s.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            pb.set_style(style);
            Some(pb)
        } else {
            None
        };

        tracing::info!(
            agents = agents.len(),
            lanes = config.num_lanes,
            max_length = config.max_length,
            budget = config.total_sequences,
            mode = %config.loss.mode,
            baseline = %config.loss.baseline,
            oracle = oracle.name(),
            "Trainer ready"
        );

        Ok(Self {
            config,
            agents,
            prior,
            vocabulary,
            oracle,
            retry,
            env,
            logger: Box::new(NoOpLogger),
            progress,
            iteration: 0,
            completed: 0,
            best_reward: None,
            start_time: Instant::now(),
        })
    }

    /// Send per-iteration metrics to `logger`
    pub fn with_logger(mut self, logger: Box<dyn MetricLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn agents(&self) -> &[AgentState<P, O>] {
        &self.agents
    }

    pub fn agents_mut(&mut self) -> &mut [AgentState<P, O>] {
        &mut self.agents
    }

    pub fn prior(&self) -> &Q {
        &self.prior
    }

    /// Sequences generated so far across all agents
    pub fn completed_sequences(&self) -> u64 {
        self.completed
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Whether the sequence budget is exhausted
    pub fn is_done(&self) -> bool {
        self.completed >= self.config.total_sequences
    }

    /// Train until the sequence budget is exhausted.
    pub fn train(&mut self) -> Result<TrainingSummary> {
        while !self.is_done() {
            self.step()?;
        }

        if let Some(pb) = self.progress.take() {
            pb.finish_with_message("done");
        }
        self.logger.flush();

        let summary = self.summary();
        tracing::info!(
            iterations = summary.iterations,
            sequences = summary.completed_sequences,
            best_reward = ?summary.best_reward,
            elapsed = %format_duration(summary.elapsed_secs),
            "Training finished"
        );
        Ok(summary)
    }

    pub fn summary(&self) -> TrainingSummary {
        TrainingSummary {
            iterations: self.iteration,
            completed_sequences: self.completed,
            best_reward: self.best_reward,
            elapsed_secs: self.start_time.elapsed().as_secs_f64(),
        }
    }

    /// Run one iteration: every agent rolls out and takes one update.
    pub fn step(&mut self) -> Result<Vec<IterationStats>> {
        let mut stats = Vec::with_capacity(self.agents.len());
        for index in 0..self.agents.len() {
            stats.push(self.train_agent(index)?);
        }
        self.iteration += 1;

        if self.iteration % self.config.log_interval == 0 {
            self.log_iteration(&stats);
        }
        if let Some(ref pb) = self.progress {
            pb.set_position(self.completed.min(self.config.total_sequences));
            let mean = stats.iter().map(|s| s.mean_reward).sum::<f64>() / stats.len().max(1) as f64;
            pb.set_message(format!(
                "Reward: {:.3} Best: {:.3}",
                mean,
                self.best_reward.unwrap_or(f32::NAN)
            ));
        }
        Ok(stats)
    }

    fn train_agent(&mut self, index: usize) -> Result<IterationStats> {
        let mut stats = IterationStats {
            agent: index,
            ..Default::default()
        };

        // Rollout and scoring
        let trajectories = self.env.rollout(&mut self.agents[index].policy)?;
        let decoded: Vec<String> = trajectories
            .iter()
            .map(|t| self.vocabulary.decode_sequence(t.tokens()))
            .collect();
        let scored = self.retry.score(&mut self.oracle, &decoded)?;
        stats.oracle_attempts = scored.attempts;

        let scale = self.config.reward_scale;
        let trajectories: Vec<Trajectory> = trajectories
            .into_iter()
            .zip(scored.scores)
            .map(|(t, score)| t.with_reward(score * scale))
            .collect();
        let (trajectories, repeated) = self.agents[index].repetition.apply(trajectories);

        stats.generated = trajectories.len();
        stats.repeated = repeated;
        stats.truncated = trajectories.iter().filter(|t| t.is_truncated()).count();
        if let Some(summary) = summarize(trajectories.iter().map(|t| t.reward())) {
            stats.mean_reward = summary.mean;
            stats.min_reward = summary.min;
            stats.max_reward = summary.max;
        }
        stats.mean_length = summarize(trajectories.iter().map(|t| t.len() as f32))
            .map(|s| s.mean)
            .unwrap_or(0.0);
        self.completed += trajectories.len() as u64;
        if let Some(max) = trajectories.iter().map(|t| t.reward()).reduce(f32::max) {
            self.best_reward = Some(self.best_reward.map_or(max, |b| b.max(max)));
        }

        // Batch selection
        let mut fresh = if self.config.remove_duplicates {
            remove_duplicates(trajectories)
        } else {
            trajectories
        };
        if self.config.topk.is_some() {
            let keep = self.config.kept_per_batch(fresh.len());
            fresh.sort_by(|a, b| b.reward().total_cmp(&a.reward()));
            fresh.truncate(keep);
        }
        stats.kept = fresh.len();

        let mut batch_trajectories = fresh.clone();
        let mut weights = vec![1.0f32; fresh.len()];
        let replay_batch = self.config.replay.batch_size;
        if let Some(buffer) = self.agents[index].buffer.as_mut() {
            if buffer.len() >= replay_batch {
                let sample = buffer.sample(replay_batch)?;
                stats.replayed = sample.len();
                batch_trajectories.extend(sample.trajectories);
                weights.extend(sample.weights);
            }
        }

        let batch = TrajectoryBatch::from_trajectories(
            &batch_trajectories,
            self.vocabulary.start_token(),
            self.vocabulary.end_token(),
        )?;

        // Loss and update
        let prior_ll = self.log_likelihood_under(&self.prior, &batch)?;
        let intrinsic = if self.config.diversity_reward {
            let columns = self
                .agents
                .iter()
                .map(|agent| self.log_likelihood_under(&agent.policy, &batch))
                .collect::<Result<Vec<_>>>()?;
            Some(intrinsic_rewards(&likelihood_matrix(&columns)?))
        } else {
            None
        };
        if let Some(ref intrinsic) = intrinsic {
            stats.mean_intrinsic_reward = intrinsic.mean().map(f64::from).unwrap_or(0.0);
        }
        let weights = Array1::from(weights);
        let importance = self.config.replay.importance_weighting;

        let agent = &mut self.agents[index];
        let evaluation = agent.policy.evaluate(&batch)?;
        let output = agent.updater.compute(LossInputs {
            batch: &batch,
            agent: &evaluation,
            prior_log_likelihood: &prior_ll,
            intrinsic_rewards: intrinsic.as_ref(),
            sample_weights: importance.then_some(&weights),
        })?;
        agent.optimizer.step(&output.loss)?;
        stats.loss = output.value;

        if let Some(schedule) = agent.schedule.as_mut() {
            stats.learning_rate = Some(schedule.learning_rate());
            let horizon = self.config.lr_annealing.as_ref().map_or(0, |a| a.horizon);
            if self.completed < horizon {
                agent.optimizer.set_learning_rate(schedule.step());
            }
        }

        // Remember the new sequences
        if let Some(buffer) = agent.buffer.as_mut() {
            let candidates = buffer.filter_known(fresh.into_iter().map(ReplayEntry::from_reward).collect());
            let offered = candidates.len();
            let stored = buffer.extend(candidates);
            tracing::debug!(agent = index, offered, stored, size = buffer.len(), "Replay insert");
            stats.buffer_len = buffer.len();
        }

        tracing::debug!(
            agent = index,
            iteration = self.iteration,
            reward = stats.mean_reward,
            loss = stats.loss,
            replayed = stats.replayed,
            "Agent updated"
        );
        Ok(stats)
    }

    /// Detached masked log-likelihood of `batch` under `policy`
    fn log_likelihood_under<R: Policy>(&self, policy: &R, batch: &TrajectoryBatch) -> Result<Array1<f32>> {
        let evaluation = policy.evaluate_detached(batch)?;
        let mask = R::Tensor::from_array(batch.mask.clone().into_dyn(), &evaluation.log_probs)?;
        to_array1(&masked_log_likelihood(&evaluation.log_probs, &mask).detached())
    }

    fn log_iteration(&self, stats: &[IterationStats]) {
        let mut metrics = Metrics::new();
        for s in stats {
            metrics.extend(s.metrics());
        }

        let n = stats.len().max(1) as f64;
        metrics.insert("train/total_sequences".to_string(), self.completed as f64);
        metrics.insert(
            "global/reward".to_string(),
            stats.iter().map(|s| s.mean_reward).sum::<f64>() / n,
        );
        metrics.insert(
            "global/max_reward".to_string(),
            stats.iter().map(|s| s.max_reward).fold(f64::NEG_INFINITY, f64::max),
        );
        metrics.insert(
            "global/intrinsic_reward".to_string(),
            stats.iter().map(|s| s.mean_intrinsic_reward).sum::<f64>() / n,
        );
        metrics.insert(
            "global/loss".to_string(),
            stats.iter().map(|s| s.loss).sum::<f64>() / n,
        );
        self.logger.record(self.completed, &metrics);

        tracing::debug!(
            iteration = self.iteration,
            sequences = %abbreviate(self.completed),
            reward = metrics["global/reward"],
            loss = metrics["global/loss"],
            "Iteration"
        );
    }
}

impl<P, O> Trainer<P, P, O>
where
    P: Policy,
    O: Optimizer<P::Tensor>,
{
    /// Build the prior and every agent from registered constructors.
    ///
    /// The prior and the agents come from the same policy constructor, so it
    /// should return identical initial weights for identical configs.
    pub fn from_registry<F>(
        config: TrainingConfig,
        registry: &Registry<P>,
        policy: &str,
        oracle: &str,
        vocabulary: Box<dyn Vocabulary>,
        mut make_optimizer: F,
    ) -> Result<Self>
    where
        F: FnMut(&mut P, &TrainingConfig) -> Result<O>,
    {
        config.validate()?;
        let prior = registry.build_policy(policy, &config)?;
        let oracle = registry.build_oracle(oracle)?;

        let agents = (0..config.num_agents)
            .map(|index| {
                let mut agent_policy = registry.build_policy(policy, &config)?;
                let optimizer = make_optimizer(&mut agent_policy, &config)?;
                AgentState::new(agent_policy, optimizer, &config, index)
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(config, agents, prior, vocabulary, oracle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use crate::policy::TablePolicy;
    use crate::training::LrAnnealingConfig;
    use crate::vocab::TokenVocabulary;
    use ndarray::ArrayD;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        steps: usize,
        losses: Vec<f64>,
        learning_rates: Vec<f64>,
    }

    /// Records loss values instead of updating anything.
    struct RecordingOptimizer(Rc<RefCell<Recorder>>);

    impl Optimizer<ArrayD<f32>> for RecordingOptimizer {
        fn step(&mut self, loss: &ArrayD<f32>) -> Result<()> {
            let mut recorder = self.0.borrow_mut();
            recorder.steps += 1;
            recorder.losses.push(loss.scalar()?);
            Ok(())
        }

        fn set_learning_rate(&mut self, learning_rate: f64) {
            self.0.borrow_mut().learning_rates.push(learning_rate);
        }
    }

    /// Scores by decoded length and counts calls.
    struct LengthOracle {
        calls: Rc<RefCell<Vec<usize>>>,
    }

    impl Oracle for LengthOracle {
        fn score(&mut self, sequences: &[String]) -> std::result::Result<Vec<f32>, OracleError> {
            self.calls.borrow_mut().push(sequences.len());
            Ok(sequences.iter().map(|s| s.len() as f32).collect())
        }
    }

    fn vocabulary() -> TokenVocabulary {
        TokenVocabulary::new(["a", "b", "c"]).unwrap()
    }

    fn config() -> TrainingConfig {
        let mut config = TrainingConfig::default()
            .with_lanes(8)
            .with_sequences(40)
            .with_seed(3);
        config.max_length = 6;
        config.progress = false;
        config.replay.capacity = 16;
        config.replay.batch_size = 4;
        config
    }

    fn trainer(
        config: TrainingConfig,
    ) -> (
        Trainer<TablePolicy, TablePolicy, RecordingOptimizer>,
        Rc<RefCell<Recorder>>,
        Rc<RefCell<Vec<usize>>>,
    ) {
        let vocab = vocabulary();
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let calls = Rc::new(RefCell::new(Vec::new()));
        let agents = (0..config.num_agents)
            .map(|i| {
                let policy = TablePolicy::uniform(vocab.len(), 10 + i as u64).unwrap();
                AgentState::new(policy, RecordingOptimizer(recorder.clone()), &config, i).unwrap()
            })
            .collect();
        let prior = TablePolicy::uniform(vocab.len(), 0).unwrap();
        let oracle = LengthOracle {
            calls: calls.clone(),
        };
        let trainer = Trainer::new(config, agents, prior, Box::new(vocab), Box::new(oracle)).unwrap();
        (trainer, recorder, calls)
    }

    #[test]
    fn test_budget_checked_between_iterations() {
        let (mut trainer, recorder, calls) = trainer(config());
        let summary = trainer.train().unwrap();

        // 8 sequences per iteration, budget 40
        assert_eq!(summary.iterations, 5);
        assert_eq!(summary.completed_sequences, 40);
        assert_eq!(recorder.borrow().steps, 5);
        assert!(trainer.is_done());
        // one oracle call per batch, never per sequence
        assert_eq!(*calls.borrow(), vec![8; 5]);
    }

    #[test]
    fn test_budget_overshoot_finishes_iteration() {
        let (mut trainer, _, _) = trainer(config().with_sequences(20));
        let summary = trainer.train().unwrap();
        assert_eq!(summary.iterations, 3);
        assert_eq!(summary.completed_sequences, 24);
    }

    #[test]
    fn test_replay_fills_and_is_sampled() {
        let (mut trainer, _, _) = trainer(config());
        let first = trainer.step().unwrap();
        assert_eq!(first[0].replayed, 0);
        let stored = first[0].buffer_len;
        assert!(stored > 0 && stored <= 8);

        let mut replayed = 0;
        for _ in 0..3 {
            replayed += trainer.step().unwrap()[0].replayed;
        }
        if stored >= 4 {
            assert!(replayed > 0);
        }
        let buffer = trainer.agents()[0].buffer.as_ref().unwrap();
        assert!(buffer.len() <= buffer.capacity());
    }

    #[test]
    fn test_replay_disabled() {
        let mut config = config();
        config.replay.enabled = false;
        let (mut trainer, _, _) = trainer(config);
        let stats = trainer.step().unwrap();
        assert_eq!(stats[0].replayed, 0);
        assert_eq!(stats[0].buffer_len, 0);
        assert!(trainer.agents()[0].buffer.is_none());
    }

    #[test]
    fn test_population_steps_every_agent() {
        let mut config = config().with_agents(3);
        config.diversity_reward = true;
        let (mut trainer, recorder, calls) = trainer(config);
        let stats = trainer.step().unwrap();

        assert_eq!(stats.len(), 3);
        assert_eq!(stats.iter().map(|s| s.agent).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(recorder.borrow().steps, 3);
        assert_eq!(calls.borrow().len(), 3);
        assert_eq!(trainer.completed_sequences(), 24);
        assert!(stats.iter().all(|s| s.mean_intrinsic_reward >= 0.0));
        assert!(recorder.borrow().losses.iter().all(|l| l.is_finite()));
    }

    #[test]
    fn test_topk_keeps_best() {
        let mut config = config();
        config.topk = Some(0.25);
        config.remove_duplicates = false;
        let (mut trainer, _, _) = trainer(config);
        let stats = trainer.step().unwrap();
        assert_eq!(stats[0].kept, 2);
        assert_eq!(stats[0].generated, 8);
    }

    #[test]
    fn test_agent_count_must_match() {
        let vocab = vocabulary();
        let config = config().with_agents(2);
        let agent = AgentState::new(
            TablePolicy::uniform(vocab.len(), 1).unwrap(),
            RecordingOptimizer(Rc::new(RefCell::new(Recorder::default()))),
            &config,
            0,
        )
        .unwrap();
        let oracle = LengthOracle {
            calls: Rc::new(RefCell::new(Vec::new())),
        };
        let result = Trainer::new(
            config,
            vec![agent],
            TablePolicy::uniform(vocab.len(), 0).unwrap(),
            Box::new(vocab),
            Box::new(oracle),
        );
        assert!(matches!(result, Err(SeqRlError::Config(_))));
    }

    #[test]
    fn test_from_registry() {
        let vocab = vocabulary();
        let size = vocab.len();
        let mut registry: Registry<TablePolicy> = Registry::new();
        registry
            .register_policy("uniform", move |c| TablePolicy::uniform(size, c.seed))
            .unwrap();
        registry
            .register_oracle("length", || {
                Ok(Box::new(LengthOracle {
                    calls: Rc::new(RefCell::new(Vec::new())),
                }) as Box<dyn Oracle>)
            })
            .unwrap();

        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut trainer = Trainer::from_registry(
            config().with_agents(2),
            &registry,
            "uniform",
            "length",
            Box::new(vocab),
            |_, _| Ok(RecordingOptimizer(recorder.clone())),
        )
        .unwrap();
        trainer.step().unwrap();
        assert_eq!(recorder.borrow().steps, 2);

        let missing = Trainer::from_registry(
            config(),
            &registry,
            "gru",
            "length",
            Box::new(vocabulary()),
            |_, _| Ok(RecordingOptimizer(recorder.clone())),
        );
        assert!(missing.is_err());
    }

    #[test]
    fn test_lr_annealing_follows_schedule() {
        let mut config = config().with_sequences(48);
        config.learning_rate = 1e-3;
        // 4 iterations of 8 lanes fit in the horizon
        config.lr_annealing = Some(LrAnnealingConfig {
            horizon: 32,
            min_learning_rate: 1e-4,
        });
        let (mut trainer, recorder, _) = trainer(config);

        let mut used = Vec::new();
        while !trainer.is_done() {
            let stats = trainer.step().unwrap();
            used.push(stats[0].learning_rate.unwrap());
            assert!(stats[0].metrics().contains_key("agent0/lr"));
        }
        assert_eq!(used.len(), 6);
        assert!((used[0] - 1e-3).abs() < 1e-12);
        assert!((used[2] - 5.5e-4).abs() < 1e-12);

        // Stepped after iterations 1..=3 only; 32 sequences reach the horizon
        let set = recorder.borrow().learning_rates.clone();
        assert_eq!(set.len(), 3);
        assert_eq!(&set[..], &used[1..4]);
        assert_eq!(used[4], used[3]);
        assert_eq!(used[5], used[3]);
        assert_eq!(trainer.agents()[0].schedule().unwrap().steps(), 3);
    }

    #[test]
    fn test_no_lr_metric_without_annealing() {
        let (mut trainer, recorder, _) = trainer(config());
        let stats = trainer.step().unwrap();
        assert_eq!(stats[0].learning_rate, None);
        assert!(!stats[0].metrics().contains_key("agent0/lr"));
        assert!(recorder.borrow().learning_rates.is_empty());
    }

    #[test]
    fn test_iteration_metrics_keys() {
        let stats = IterationStats {
            agent: 2,
            mean_reward: 1.5,
            ..Default::default()
        };
        let metrics = stats.metrics();
        assert_eq!(metrics["agent2/reward"], 1.5);
        assert!(metrics.contains_key("agent2/buffer_size"));
    }
}
