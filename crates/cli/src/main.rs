//! Reverie CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: write the default config
//! - `run`: feed observations through the perception cycle
//! - `status`: show the saved session state

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "reverie",
    about = "Reverie: an attention and mood engine for an always-on observer",
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
    /// Initialize configuration
    Onboard,

    /// Run one perception cycle per input line
    Run {
        /// Read observations from a file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Attach the newest image in this directory to each observation
        #[arg(long)]
        image_dir: Option<PathBuf>,
    },

    /// Show the saved session state
    Status,
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
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Run { input, image_dir } => commands::run::run(input, image_dir).await?,
        Commands::Status => commands::status::run().await?,
    }

    Ok(())
}
