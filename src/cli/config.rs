//! Configuration subcommand handlers

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::config::{self, ConfigLoader, paths};

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Get configuration value
    Get {
        /// Configuration key (e.g., "endpoint", "layout.rankSep.max")
        key: Option<String>,
    },
    /// Set configuration value
    Set {
        /// Configuration key (e.g., "endpoint", "layout.direction")
        key: String,
        /// Configuration value
        value: String,
    },
    /// List all configuration
    List {
        /// Print the accepted keys instead of values
        #[arg(long)]
        keys: bool,
    },
    /// Show configuration file path
    Path,
    /// Validate configuration
    Validate,
    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Handle configuration subcommands
pub fn handle_config_command(cmd: ConfigSubcommand) -> Result<()> {
    match cmd {
        ConfigSubcommand::Get { key } => {
            let config = ConfigLoader::load().context("Failed to load configuration")?;

            if let Some(key) = key {
                let value = config::get_config_value(&config, &key)?;
                println!("{}", value);
            } else {
                let yaml =
                    serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
                print!("{}", yaml);
            }
        }
        ConfigSubcommand::Set { key, value } => {
            // Start from the file alone so env overrides are not persisted
            let path = paths::root_config_path();
            let mut config = if path.exists() {
                ConfigLoader::load_file(&path)?
            } else {
                ConfigLoader::load_defaults()
            };

            config::set_config_value(&mut config, &key, &value)
                .with_context(|| format!("Failed to set {} = {}", key, value))?;
            ConfigLoader::validate(&config)?;

            ConfigLoader::save_root(&config).context("Failed to save configuration")?;
            println!("Configuration saved");
        }
        ConfigSubcommand::List { keys } => {
            if keys {
                for key in config::CONFIG_KEYS {
                    println!("{}", key);
                }
            } else {
                let config = ConfigLoader::load().context("Failed to load configuration")?;
                let yaml =
                    serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
                print!("{}", yaml);
            }
        }
        ConfigSubcommand::Path => {
            let config_path = paths::root_config_path();
            println!("{}", config_path.display());
        }
        ConfigSubcommand::Validate => {
            let path = paths::root_config_path();
            match ConfigLoader::validate_file(&path) {
                Ok(_) => {
                    println!("Configuration is valid");
                }
                Err(e) => {
                    eprintln!("Configuration validation failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        ConfigSubcommand::Init { force } => {
            let path = paths::root_config_path();
            if path.exists() && !force {
                return Err(anyhow::anyhow!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                ));
            }
            if let Some(parent) = path.parent() {
                paths::ensure_dir(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, config::starter_yaml())
                .with_context(|| format!("Failed to write config file: {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
