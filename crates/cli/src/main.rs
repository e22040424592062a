//! Sidekick CLI — the main entry point.
//!
//! Commands:
//! - `run`      — Work on one task until the evaluator accepts it
//! - `chat`     — Interactive superstep chat
//! - `tools`    — List the tools the worker can call
//! - `doctor`   — Check config, sandbox and provider health
//! - `onboard`  — Write the default config

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "sidekick",
    about = "Sidekick — a worker/evaluator task agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single task to completion
    Run {
        /// What to do
        #[arg(short, long)]
        task: String,

        /// How to tell the task is done
        #[arg(short, long)]
        criteria: Option<String>,
    },

    /// Chat interactively; each message is one superstep
    Chat {
        /// Success criteria applied to every message
        #[arg(short, long)]
        criteria: Option<String>,
    },

    /// List the available tools
    Tools,

    /// Diagnose config, sandbox and provider reachability
    Doctor,

    /// Initialize configuration and sandbox
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { task, criteria } => commands::run::run(task, criteria).await?,
        Commands::Chat { criteria } => commands::chat::run(criteria).await?,
        Commands::Tools => commands::tools::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
