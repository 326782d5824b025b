//! Molt: GRPO-style generate-and-score rollouts with dynamic prompt rewriting
//!
//! Provides subcommands for working with the rollout trainer:
//!
//! - `run`     -- Run generate-and-score cycles over a dataset
//! - `step`    -- Execute exactly one cycle over a batch file
//! - `inspect` -- Inspect the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use molt::config::MoltConfig;
use molt::dataset::{load_jsonl, sample_records, PromptRecord};
use molt::model::{AnyPolicy, ApiPolicy, MockPolicy};
use molt::reward::WeightedRewards;
use molt::training::{reward_feedback, Accelerator, GrpoTrainer};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Molt: generate-and-score rollouts with dynamic prompt rewriting
#[derive(Parser)]
#[command(name = "molt", version, about)]
struct Cli {
    /// Path to a JSON configuration file (uses defaults if not provided).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use a mock policy instead of connecting to a live model server.
    #[arg(long, global = true, default_value_t = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run generate-and-score cycles over a dataset.
    Run {
        /// Path to a JSONL dataset (uses the built-in sample batch if not provided).
        #[arg(long)]
        data: Option<PathBuf>,

        /// Arm the built-in reward-feedback prompt hook regardless of config.
        #[arg(long, default_value_t = false)]
        dynamic: bool,
    },

    /// Execute exactly one generate-and-score cycle over a batch file.
    Step {
        /// Path to the JSONL batch to run the cycle on.
        #[arg(long, default_value = "data/batch.jsonl")]
        data: PathBuf,
    },

    /// Inspect the effective configuration and reward pipeline.
    Inspect,
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing (reads RUST_LOG env var, defaults to info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Load or create configuration.
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str::<MoltConfig>(&text)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        }
        None => MoltConfig::default(),
    };

    // Fill in the API key from the environment when not set in the config file.
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if config.model.policy_api_key.is_empty() {
            config.model.policy_api_key = key;
        }
    }

    match cli.command {
        Commands::Run { data, dynamic } => cmd_run(&config, cli.mock, data.as_deref(), dynamic).await,
        Commands::Step { data } => cmd_step(&config, cli.mock, &data).await,
        Commands::Inspect => cmd_inspect(&config),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn create_policy(config: &MoltConfig, mock: bool) -> AnyPolicy {
    if mock {
        AnyPolicy::Mock(MockPolicy::new())
    } else {
        AnyPolicy::Api(ApiPolicy::new(
            &config.model.policy_api_base,
            &config.model.policy_api_key,
            &config.model.policy_model_id,
        ))
    }
}

fn create_trainer(config: &MoltConfig, mock: bool, dynamic: bool) -> GrpoTrainer<AnyPolicy> {
    let trainer = GrpoTrainer::new(
        config.trainer.clone(),
        create_policy(config, mock),
        Accelerator::local(),
        WeightedRewards::from_config(&config.reward),
    );

    if dynamic || config.dynamic_prompts.enabled {
        trainer.with_dynamic_prompts(reward_feedback(
            config.dynamic_prompts.source_field.clone(),
            config.dynamic_prompts.reward_threshold,
        ))
    } else {
        trainer
    }
}

fn load_records(data: Option<&std::path::Path>) -> Result<Vec<PromptRecord>> {
    match data {
        Some(path) => load_jsonl(path),
        None => {
            tracing::info!("No dataset given, using the built-in sample batch");
            Ok(sample_records())
        }
    }
}

async fn cmd_run(
    config: &MoltConfig,
    mock: bool,
    data: Option<&std::path::Path>,
    dynamic: bool,
) -> Result<()> {
    let records = load_records(data)?;
    let mut trainer = create_trainer(config, mock, dynamic);

    let summary = trainer.run(&records).await?;

    tracing::info!(
        run_id = %summary.run_id,
        cycles = summary.cycles,
        overall_mean_reward = summary.overall_mean_reward(),
        "Run finished"
    );
    Ok(())
}

async fn cmd_step(config: &MoltConfig, mock: bool, data: &PathBuf) -> Result<()> {
    let batch = load_jsonl(data)?;
    let mut trainer = create_trainer(config, mock, false);

    let outcome = trainer.generate_and_score(&batch).await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn cmd_inspect(config: &MoltConfig) -> Result<()> {
    println!("Configuration:");
    println!("{}", serde_json::to_string_pretty(config)?);

    let rewards = WeightedRewards::from_config(&config.reward);
    println!("\nReward pipeline ({} functions):", rewards.len());
    for name in rewards.names() {
        println!("  - {name}");
    }

    println!(
        "\nDynamic prompts: {}",
        if config.dynamic_prompts.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    Ok(())
}
