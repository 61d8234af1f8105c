//! seqrl CLI
//!
//! Command-line interface for sampling and training sequence generators.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use seqrl::env::GenerationEnv;
use seqrl::oracle::RetryPolicy;
use seqrl::policy::TablePolicy;
use seqrl::training::TrainingConfig;
use seqrl::vocab::Vocabulary;
use seqrl_tasks::{smiles_vocabulary, task_by_name};

#[derive(Parser)]
#[command(name = "seqrl")]
#[command(version, about = "seqrl - Reinforcement learning for sequence generators", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available tasks
    Tasks,

    /// Print the default configuration as JSON
    Config {
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Check a configuration file
    Validate {
        /// Path to a JSON configuration
        path: PathBuf,
    },

    /// Score sequences from a uniform random policy
    Sample {
        /// Task name
        #[arg(default_value = "similarity")]
        task: String,

        /// Number of sequences
        #[arg(long, default_value = "10")]
        num: usize,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Maximum tokens per sequence
        #[arg(long, default_value = "40")]
        max_length: usize,
    },

    /// Train a GRU policy on a task (requires --features torch)
    Train {
        /// Task name
        #[arg(default_value = "similarity")]
        task: String,

        /// JSON configuration (defaults if omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the sequence budget
        #[arg(long)]
        sequences: Option<u64>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tasks => list_tasks(),
        Commands::Config { output } => write_config(output)?,
        Commands::Validate { path } => validate(&path)?,
        Commands::Sample {
            task,
            num,
            seed,
            max_length,
        } => sample(&task, num, seed, max_length)?,
        Commands::Train {
            task: _task,
            config: _config,
            sequences: _sequences,
        } => {
            #[cfg(feature = "torch")]
            {
                train(&_task, _config, _sequences)?;
            }
            #[cfg(not(feature = "torch"))]
            {
                tracing::error!("Training requires the 'torch' feature. Rebuild with:");
                tracing::error!("  cargo build --features torch");
                tracing::error!("Note: libtorch must be installed. See README.md for details.");
            }
        }
    }

    Ok(())
}

fn list_tasks() {
    println!("Available tasks:");
    println!();
    println!("  similarity  Bigram similarity to aspirin");
    println!("  length      Closeness to 24 characters");
    println!("  carbon      Share of carbon atoms");
    println!("  flaky       Similarity with 20% transient oracle failures");
    println!();
    println!("Training requires --features torch and libtorch installed.");
}

fn write_config(output: Option<PathBuf>) -> Result<()> {
    let json = TrainingConfig::default().to_json_string()?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "Wrote default configuration");
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    let config = TrainingConfig::from_json_file(path)
        .with_context(|| format!("invalid configuration {}", path.display()))?;
    println!(
        "Configuration OK: {} agents, {} lanes, {} sequences",
        config.num_agents, config.num_lanes, config.total_sequences
    );
    Ok(())
}

fn sample(task: &str, num: usize, seed: u64, max_length: usize) -> Result<()> {
    tracing::info!(task, num, seed, "Sampling from a uniform policy");

    let vocab = smiles_vocabulary()?;
    let mut oracle = task_by_name(task)?;
    let mut policy = TablePolicy::uniform(vocab.len(), seed)?;
    let mut env = GenerationEnv::new(num, max_length, vocab.start_token(), vocab.end_token())?;

    let trajectories = env.rollout(&mut policy)?;
    let decoded: Vec<String> = trajectories
        .iter()
        .map(|t| vocab.decode_sequence(t.tokens()))
        .collect();
    let scored = RetryPolicy::default().score(&mut oracle, &decoded)?;

    for (score, sequence) in scored.scores.iter().zip(&decoded) {
        println!("{:.4}\t{}", score, sequence);
    }
    Ok(())
}

#[cfg(feature = "torch")]
fn train(task: &str, config_path: Option<PathBuf>, sequences: Option<u64>) -> Result<()> {
    use seqrl::log::{CompositeLogger, ConsoleLogger, JsonlLogger};
    use seqrl::policy::{GruConfig, GruPolicy};
    use seqrl::training::{Registry, Trainer, TorchOptimizer};
    use seqrl::utils::set_seed;

    let mut config = match config_path {
        Some(path) => TrainingConfig::from_json_file(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TrainingConfig::default(),
    };
    if let Some(total) = sequences {
        config.total_sequences = total;
    }

    let device = if tch::Cuda::is_available() {
        tracing::info!("Using CUDA");
        tch::Device::Cuda(0)
    } else {
        tracing::info!("Using CPU");
        tch::Device::Cpu
    };

    let vocab = smiles_vocabulary()?;
    let vocab_size = vocab.len() as i64;

    let mut registry: Registry<GruPolicy> = Registry::new();
    registry.register_policy("gru", move |config| {
        // Same seed for the prior and every agent
        set_seed(config.seed);
        GruPolicy::new(
            GruConfig {
                vocab_size,
                ..Default::default()
            },
            device,
        )
    })?;
    seqrl_tasks::register_tasks(&mut registry)?;

    let mut logger = CompositeLogger::new().with(Box::new(ConsoleLogger::new()));
    if let Some(ref path) = config.metrics_path {
        logger = logger.with(Box::new(JsonlLogger::create(path)?));
    }

    let mut trainer = Trainer::from_registry(
        config,
        &registry,
        "gru",
        task,
        Box::new(vocab),
        |policy, config| {
            tracing::info!(params = policy.num_parameters(), "Created GRU policy");
            TorchOptimizer::adam(policy.var_store(), config.learning_rate, config.max_grad_norm)
        },
    )?
    .with_logger(Box::new(logger));

    let summary = trainer.train()?;
    println!(
        "Finished {} iterations, {} sequences, best reward {:.4}",
        summary.iterations,
        summary.completed_sequences,
        summary.best_reward.unwrap_or(f32::NAN)
    );
    Ok(())
}
