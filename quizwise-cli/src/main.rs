use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "quizwise", about = "Adaptive quiz sessions from a question bank")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the question inventory of a bank
    Bank(commands::bank::BankArgs),
    /// Play a session interactively
    Play(commands::play::PlayArgs),
    /// Run a session with a scripted learner
    Simulate(commands::simulate::SimulateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Bank(args) => commands::bank::run(args).await,
        Commands::Play(args) => {
            let engine_config = config::load(cli.config.as_deref())?;
            commands::play::run(args, engine_config).await
        }
        Commands::Simulate(args) => {
            let engine_config = config::load(cli.config.as_deref())?;
            commands::simulate::run(args, engine_config).await
        }
    }
}
