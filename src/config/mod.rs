//! Configuration system for topomap
//!
//! A single `config.yaml` layered over built-in defaults, with environment
//! variable overrides on top.

mod defaults;
pub mod loader;
pub mod paths;
pub mod schema;

pub use defaults::{default_config, starter_yaml};
pub use loader::ConfigLoader;
pub use schema::{Config, IngestConfig, LayoutConfig, ReconnectConfig};

use crate::graph::NamespaceSelection;
use crate::layout::{LayoutDirection, LayoutEngine, SpacingRule};
use anyhow::Context;

/// Keys accepted by [`get_config_value`] and [`set_config_value`]
pub const CONFIG_KEYS: &[&str] = &[
    "endpoint",
    "defaultNamespace",
    "layout.engine",
    "layout.direction",
    "layout.nodeWidth",
    "layout.nodeHeight",
    "layout.rankSep.base",
    "layout.rankSep.perNode",
    "layout.rankSep.min",
    "layout.rankSep.max",
    "layout.nodeSep.base",
    "layout.nodeSep.perNode",
    "layout.nodeSep.min",
    "layout.nodeSep.max",
    "layout.maxCrossingSweeps",
    "reconnect.attempts",
    "reconnect.intervalMs",
    "ingest.rejectEmpty",
];

/// Get a configuration value by key (dot notation)
pub fn get_config_value(config: &Config, key: &str) -> anyhow::Result<String> {
    let settings = &config.layout.settings;
    if let Some((rule, field)) = spacing_key(key) {
        let rule = match rule {
            "rankSep" => &settings.rank_sep,
            _ => &settings.node_sep,
        };
        return spacing_field(rule, field).map(|v| v.to_string());
    }

    match key {
        "endpoint" => Ok(config.endpoint.clone()),
        "defaultNamespace" => Ok(config.default_namespace.to_string()),
        "layout.engine" => Ok(config.layout.engine.to_string()),
        "layout.direction" => Ok(config.layout.direction.to_string()),
        "layout.nodeWidth" => Ok(settings.node_width.to_string()),
        "layout.nodeHeight" => Ok(settings.node_height.to_string()),
        "layout.maxCrossingSweeps" => Ok(settings.max_crossing_sweeps.to_string()),
        "reconnect.attempts" => Ok(config.reconnect.attempts.to_string()),
        "reconnect.intervalMs" => Ok(config.reconnect.interval_ms.to_string()),
        "ingest.rejectEmpty" => Ok(config.ingest.reject_empty.to_string()),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}

/// Set a configuration value by key (dot notation)
pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> anyhow::Result<()> {
    let settings = &mut config.layout.settings;
    if let Some((rule, field)) = spacing_key(key) {
        let rule = match rule {
            "rankSep" => &mut settings.rank_sep,
            _ => &mut settings.node_sep,
        };
        let parsed: f64 = value
            .parse()
            .with_context(|| format!("{} must be a number", key))?;
        match field {
            "base" => rule.base = parsed,
            "perNode" => rule.per_node = parsed,
            "min" => rule.min = parsed,
            _ => rule.max = parsed,
        }
        return Ok(());
    }

    match key {
        "endpoint" => {
            url::Url::parse(value).context("endpoint must be a valid URL")?;
            config.endpoint = value.to_string();
        }
        "defaultNamespace" => {
            let Ok(selection) = value.parse::<NamespaceSelection>();
            config.default_namespace = selection;
        }
        "layout.engine" => {
            config.layout.engine = value
                .parse::<LayoutEngine>()
                .map_err(anyhow::Error::msg)?;
        }
        "layout.direction" => {
            config.layout.direction = value
                .parse::<LayoutDirection>()
                .map_err(anyhow::Error::msg)?;
        }
        "layout.nodeWidth" => {
            settings.node_width = value
                .parse()
                .context("layout.nodeWidth must be a number")?;
        }
        "layout.nodeHeight" => {
            settings.node_height = value
                .parse()
                .context("layout.nodeHeight must be a number")?;
        }
        "layout.maxCrossingSweeps" => {
            settings.max_crossing_sweeps = value
                .parse()
                .context("layout.maxCrossingSweeps must be a whole number")?;
        }
        "reconnect.attempts" => {
            config.reconnect.attempts = value
                .parse()
                .context("reconnect.attempts must be a whole number")?;
        }
        "reconnect.intervalMs" => {
            config.reconnect.interval_ms = value
                .parse()
                .context("reconnect.intervalMs must be a whole number")?;
        }
        "ingest.rejectEmpty" => {
            config.ingest.reject_empty = value
                .parse()
                .context("ingest.rejectEmpty must be 'true' or 'false'")?;
        }
        _ => return Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }

    Ok(())
}

/// Split `layout.rankSep.min` style keys into (rule, field)
fn spacing_key(key: &str) -> Option<(&str, &str)> {
    let rest = key.strip_prefix("layout.")?;
    let (rule, field) = rest.split_once('.')?;
    let known_rule = rule == "rankSep" || rule == "nodeSep";
    let known_field = matches!(field, "base" | "perNode" | "min" | "max");
    (known_rule && known_field).then_some((rule, field))
}

fn spacing_field(rule: &SpacingRule, field: &str) -> anyhow::Result<f64> {
    match field {
        "base" => Ok(rule.base),
        "perNode" => Ok(rule.per_node),
        "min" => Ok(rule.min),
        "max" => Ok(rule.max),
        _ => Err(anyhow::anyhow!("Unknown spacing field: {}", field)),
    }
}
