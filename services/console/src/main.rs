mod config;
mod train;
mod watch;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(
    name = "console",
    about = "Operator console for live detection and remote model training"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the camera and log detection results
    Watch {
        /// Check a single frame instead of arming the recurring timer
        #[arg(long)]
        once: bool,
    },
    /// Show the remaining training-credit balance
    Credits,
    /// Upload a dataset and class config, then follow the training job
    Train {
        /// Labeled dataset archive (max 1 GiB)
        #[arg(long)]
        dataset: std::path::PathBuf,
        /// Class-configuration JSON file
        #[arg(long)]
        config: std::path::PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Watch { once } => watch::run(&cfg, once).await,
        Command::Credits => train::show_credits(&cfg).await,
        Command::Train { dataset, config } => train::run(&cfg, &dataset, &config).await,
    }
}
