//! Inspect or create the configuration file.

use std::path::PathBuf;

use clap::Subcommand;

use peekaboo_common::config::{config_file_path, AppConfig};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as JSON
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check a configuration file for errors
    Validate,
}

pub fn run(action: ConfigAction, path: Option<PathBuf>) -> anyhow::Result<()> {
    let explicit = path.is_some();
    let path = path.unwrap_or_else(config_file_path);

    match action {
        ConfigAction::Show => {
            let config = if explicit || path.exists() {
                AppConfig::load_from(&path)
                    .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?
            } else {
                AppConfig::default()
            };
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            AppConfig::default().save_to(&path)?;
            println!("Wrote default config to: {}", path.display());
        }
        ConfigAction::Validate => {
            println!("Validating config at: {}", path.display());
            let config = AppConfig::load_from(&path)
                .map_err(|e| anyhow::anyhow!("Invalid config: {e}"))?;
            println!("  Frame rate: {} Hz", config.tracking.frame_rate_hz);
            println!("  Follow: {}", config.tracking.follow_enabled);
            println!(
                "  Calibration: center ({}, {}), sensitivity ({}, {})",
                config.calibration.center_x,
                config.calibration.center_y,
                config.calibration.multiplier_x,
                config.calibration.multiplier_y
            );
            println!("  Timed trigger: {}", config.triggers.interval);
            println!(
                "  Proximity: {} (threshold {})",
                if config.triggers.proximity_enabled {
                    "on"
                } else {
                    "off"
                },
                config.triggers.proximity_threshold
            );
            println!("\nConfig is valid.");
        }
    }

    Ok(())
}
