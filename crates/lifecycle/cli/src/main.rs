//! Lifecycle CLI
//!
//! Inspect the deliverable and project lifecycles and replay scenario
//! files through the dispatcher:
//!
//! - `lifecycle describe deliverable`
//! - `lifecycle allowed project active --context '{"allDeliverablesDone": true}'`
//! - `lifecycle run demos/payment-gate.yaml`

use anyhow::Context;
use clap::{Parser, Subcommand};
use lifecycle_runtime::RuntimeConfig;
use lifecycle_types::EntityKind;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod scenario;

use commands::OutputFormat;

/// Lifecycle CLI
#[derive(Parser)]
#[command(name = "lifecycle")]
#[command(about = "Inspect guarded lifecycles and replay scenarios", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "LIFECYCLE_CONFIG")]
    config: Option<String>,

    /// Log level (overrides the configured level)
    #[arg(long, env = "LIFECYCLE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "LIFECYCLE_LOG_JSON")]
    json: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the states, events and guards of a lifecycle
    Describe {
        /// Entity kind (deliverable or project)
        kind: EntityKind,
    },

    /// Show which actions are open from a state
    Allowed {
        /// Entity kind (deliverable or project)
        kind: EntityKind,

        /// Current state
        state: String,

        /// Context fields as a JSON object, layered over the defaults
        #[arg(long)]
        context: Option<String>,
    },

    /// Replay a scenario file against in-memory storage
    Run {
        /// Path to the scenario YAML
        scenario: PathBuf,
    },
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.to_string().into());

    // Logs go to stderr so structured output on stdout stays parseable
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = RuntimeConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_tracing(&level, cli.json || config.logging.json);

    match cli.command {
        Commands::Describe { kind } => commands::describe(kind, cli.output),
        Commands::Allowed {
            kind,
            state,
            context,
        } => commands::allowed(kind, &state, context.as_deref(), &config, cli.output),
        Commands::Run { scenario } => commands::run(&scenario, &config, cli.output).await,
    }
}
