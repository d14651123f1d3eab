//! Inbound wire shapes
//!
//! Mirrors the JSON the topology feed sends. Two layouts exist in the wild:
//! the namespace-keyed form and a flat `{nodes, edges}` form. Both decode
//! into [`WirePayload`]; normalization into one shape happens in the parent
//! module and nothing outside ingestion sees these types.

use crate::models::{Position, ResourceKind};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WirePayload {
    #[serde(default)]
    pub namespaces: Option<BTreeMap<String, WireNamespace>>,
    #[serde(default)]
    pub nodes: Option<Vec<WireNode>>,
    #[serde(default)]
    pub edges: Option<Vec<WireEdge>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireNamespace {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Option<Vec<WireNode>>,
    #[serde(default)]
    pub edges: Option<Vec<WireEdge>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireNode {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default, deserialize_with = "stringish")]
    pub status: Option<String>,
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default, deserialize_with = "stringish")]
    pub cpu: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub ram: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireEdge {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(alias = "fromId")]
    pub source: String,
    #[serde(alias = "toId")]
    pub target: String,
    #[serde(default, rename = "type", alias = "label")]
    pub kind: Option<String>,
}

/// Accept a string, number or bool and keep it as text
fn stringish<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {}",
            other
        ))),
    }
}
