//! Configuration schema definitions
//!
//! Defines the structure of `config.yaml` using serde for serialization.

use crate::connection::ReconnectPolicy;
use crate::constants::{DEFAULT_ENDPOINT, RECONNECT_ATTEMPTS, RECONNECT_INTERVAL_MS};
use crate::graph::NamespaceSelection;
use crate::ingest::IngestPolicy;
use crate::layout::{LayoutDirection, LayoutEngine, LayoutSettings, LayoutStrategy, strategy_for};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Topology feed URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Namespace shown at startup, or `all`
    #[serde(default)]
    pub default_namespace: NamespaceSelection,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub reconnect: ReconnectConfig,

    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Layout configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    #[serde(default)]
    pub engine: LayoutEngine,

    #[serde(default)]
    pub direction: LayoutDirection,

    /// Footprint and spacing knobs
    #[serde(flatten)]
    pub settings: LayoutSettings,
}

/// Reconnect configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectConfig {
    /// Reconnects after an unexpected closure before giving up
    #[serde(default = "default_reconnect_attempts")]
    pub attempts: u32,

    /// Delay before each reconnect
    #[serde(default = "default_reconnect_interval_ms")]
    pub interval_ms: u64,
}

/// Ingestion configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngestConfig {
    /// Reject payloads with zero namespaces instead of clearing the graph
    #[serde(default)]
    pub reject_empty: bool,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_reconnect_attempts() -> u32 {
    RECONNECT_ATTEMPTS
}

fn default_reconnect_interval_ms() -> u64 {
    RECONNECT_INTERVAL_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            default_namespace: NamespaceSelection::All,
            layout: LayoutConfig::default(),
            reconnect: ReconnectConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            attempts: default_reconnect_attempts(),
            interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl LayoutConfig {
    pub fn strategy(&self) -> Box<dyn LayoutStrategy> {
        strategy_for(self.engine, self.settings)
    }
}

impl ReconnectConfig {
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(self.attempts, Duration::from_millis(self.interval_ms))
    }
}

impl IngestConfig {
    pub fn policy(&self) -> IngestPolicy {
        IngestPolicy {
            reject_empty: self.reject_empty,
        }
    }
}
