//! Configuration loading and validation
//!
//! Precedence order (highest to lowest):
//! 1. Environment variable overrides
//! 2. Root config file
//! 3. Built-in defaults

use super::{defaults, paths, schema::Config};
use crate::graph::NamespaceSelection;
use crate::layout::{LayoutEngine, SpacingRule};
use anyhow::{Context, Result};
use std::path::Path;
use url::Url;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    pub fn load() -> Result<Config> {
        Self::load_from(&paths::root_config_path())
    }

    /// Load `path` if it exists, otherwise defaults, then apply env overrides
    pub fn load_from(path: &Path) -> Result<Config> {
        let config = if path.exists() {
            Self::load_file(path)?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Self::load_defaults()
        };
        Ok(Self::apply_env_overrides(config))
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load default configuration
    pub fn load_defaults() -> Config {
        defaults::default_config()
    }

    /// Check values serde cannot: URL syntax, spacing bounds, footprint
    pub fn validate(config: &Config) -> Result<()> {
        Url::parse(&config.endpoint)
            .with_context(|| format!("endpoint is not a valid URL: {}", config.endpoint))?;

        let settings = &config.layout.settings;
        if !(settings.node_width > 0.0 && settings.node_height > 0.0) {
            return Err(anyhow::anyhow!(
                "layout footprint must be positive, got {}x{}",
                settings.node_width,
                settings.node_height
            ));
        }
        check_spacing("layout.rankSep", &settings.rank_sep)?;
        check_spacing("layout.nodeSep", &settings.node_sep)?;

        Ok(())
    }

    /// Validate the root config file if present
    pub fn validate_file(path: &Path) -> Result<Config> {
        let config = Self::load_from(path).context("Failed to load configuration")?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: Config) -> Config {
        // TOPOMAP_ENDPOINT override
        if let Ok(endpoint) = std::env::var("TOPOMAP_ENDPOINT") {
            config.endpoint = endpoint;
        }

        // TOPOMAP_DEFAULT_NAMESPACE override
        if let Ok(namespace) = std::env::var("TOPOMAP_DEFAULT_NAMESPACE") {
            let Ok(selection) = namespace.parse::<NamespaceSelection>();
            config.default_namespace = selection;
        }

        // TOPOMAP_LAYOUT_ENGINE override
        if let Ok(engine) = std::env::var("TOPOMAP_LAYOUT_ENGINE") {
            match engine.parse::<LayoutEngine>() {
                Ok(engine) => config.layout.engine = engine,
                Err(e) => tracing::warn!("Ignoring TOPOMAP_LAYOUT_ENGINE: {}", e),
            }
        }

        config
    }

    /// Save configuration to a file
    pub fn save(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let yaml =
            serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")?;

        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Save root configuration
    pub fn save_root(config: &Config) -> Result<()> {
        Self::save(config, &paths::root_config_path())
    }
}

fn check_spacing(key: &str, rule: &SpacingRule) -> Result<()> {
    if rule.is_valid() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} needs 0 <= min <= max, got min={} max={}",
            key,
            rule.min,
            rule.max
        ))
    }
}
