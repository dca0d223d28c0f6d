//! Peekaboo CLI: run a tracking stage headless and manage configuration.
//!
//! Usage:
//!   peekaboo run [OPTIONS]        Run a stage with a synthetic or replayed subject
//!   peekaboo config show          Print the effective configuration
//!   peekaboo config init          Write a default config file
//!   peekaboo config validate      Check a config file

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use peekaboo_common::config::{AppConfig, LoggingConfig};
use peekaboo_common::logging::init_logging;

mod commands;
mod sink;

#[derive(Parser)]
#[command(
    name = "peekaboo",
    about = "Pose-driven character tracking and trigger engine",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/peekaboo/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tracking stage until Ctrl+C, `stop` on stdin, or --seconds elapse
    Run(commands::run::RunArgs),

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let config = match &cli.config {
                Some(path) => AppConfig::load_from(path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?,
                None => AppConfig::load(),
            };

            let mut logging = config.logging.clone();
            if cli.verbose {
                logging.level = "debug".to_string();
            }
            init_logging(&logging)?;

            commands::run::run(config, args).await
        }
        Commands::Config { action } => {
            let level = if cli.verbose { "debug" } else { "warn" };
            init_logging(&LoggingConfig {
                level: level.to_string(),
                json: false,
                file: None,
            })?;
            commands::config::run(action, cli.config)
        }
    }
}
