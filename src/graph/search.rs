//! Text, kind and label narrowing of the visible graph

use super::LayoutGraph;
use crate::models::{ResourceKind, ResourceNode};
use std::collections::BTreeSet;

/// Search criteria layered on top of the namespace filter
///
/// Namespace roots always stay visible so inferred edges keep an anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeQuery {
    /// Case-insensitive substring of the node name or id
    pub text: Option<String>,
    /// Allowed kinds; empty means any
    pub kinds: BTreeSet<ResourceKind>,
    /// Required `key=value` labels
    pub labels: Vec<(String, String)>,
}

impl NodeQuery {
    pub fn is_empty(&self) -> bool {
        self.text.as_deref().is_none_or(|t| t.trim().is_empty())
            && self.kinds.is_empty()
            && self.labels.is_empty()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kinds.insert(kind);
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }

    /// Parse a `key=value` selector
    pub fn parse_label(selector: &str) -> Result<(String, String), String> {
        match selector.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(format!("Invalid label selector '{}', expected key=value", selector)),
        }
    }

    pub fn matches(&self, node: &ResourceNode) -> bool {
        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let needle = text.to_lowercase();
            if !node.name.to_lowercase().contains(&needle)
                && !node.id.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        if !self.kinds.is_empty() && !self.kinds.contains(&node.kind) {
            return false;
        }

        self.labels
            .iter()
            .all(|(key, value)| node.labels.get(key) == Some(value))
    }

    /// Narrow `graph` to matching nodes plus every namespace root
    pub fn apply(&self, graph: LayoutGraph) -> LayoutGraph {
        if self.is_empty() {
            return graph;
        }
        graph.retain_nodes(|node| node.is_namespace_root() || self.matches(node))
    }
}
