//! Namespace filter

use super::LayoutGraph;
use crate::models::TopologySnapshot;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Which part of the snapshot is on screen
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum NamespaceSelection {
    #[default]
    All,
    Namespace(String),
}

impl NamespaceSelection {
    pub fn namespace(id: impl Into<String>) -> Self {
        NamespaceSelection::Namespace(id.into())
    }

    pub fn as_namespace(&self) -> Option<&str> {
        match self {
            NamespaceSelection::All => None,
            NamespaceSelection::Namespace(id) => Some(id),
        }
    }
}

impl fmt::Display for NamespaceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamespaceSelection::All => write!(f, "all"),
            NamespaceSelection::Namespace(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for NamespaceSelection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(NamespaceSelection::All)
        } else {
            Ok(NamespaceSelection::Namespace(s.to_string()))
        }
    }
}

impl Serialize for NamespaceSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NamespaceSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let Ok(selection) = raw.parse::<NamespaceSelection>();
        Ok(selection)
    }
}

/// Reduce a snapshot to the nodes and edges visible under `selection`
///
/// An edge survives only when both of its endpoints do.
pub fn filter(snapshot: &TopologySnapshot, selection: &NamespaceSelection) -> LayoutGraph {
    let graph = LayoutGraph::new(
        snapshot.nodes().cloned().collect(),
        snapshot.edges().cloned().collect(),
    );

    match selection {
        NamespaceSelection::All => graph,
        NamespaceSelection::Namespace(ns) => graph.retain_nodes(|node| &node.namespace == ns),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NamespaceSnapshot, ResourceKind, ResourceNode, StructuralEdge};

    fn two_namespace_snapshot() -> TopologySnapshot {
        let mut snapshot = TopologySnapshot::empty();
        snapshot.namespaces.insert(
            "a".to_string(),
            NamespaceSnapshot {
                id: "a".to_string(),
                name: "a".to_string(),
                nodes: vec![
                    ResourceNode::namespace_root("a", "a"),
                    ResourceNode::new("a-pod", "a-pod", ResourceKind::Pod, "a"),
                ],
                edges: vec![
                    StructuralEdge::new("a->pod", "a", "a-pod"),
                    StructuralEdge::new("cross", "a-pod", "b-pod"),
                ],
            },
        );
        snapshot.namespaces.insert(
            "b".to_string(),
            NamespaceSnapshot {
                id: "b".to_string(),
                name: "b".to_string(),
                nodes: vec![
                    ResourceNode::namespace_root("b", "b"),
                    ResourceNode::new("b-pod", "b-pod", ResourceKind::Pod, "b"),
                ],
                edges: Vec::new(),
            },
        );
        snapshot
    }

    #[test]
    fn test_all_returns_everything() {
        let snapshot = two_namespace_snapshot();
        let graph = filter(&snapshot, &NamespaceSelection::All);
        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn test_cross_namespace_edge_dropped() {
        let snapshot = two_namespace_snapshot();
        let graph = filter(&snapshot, &NamespaceSelection::namespace("a"));
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].id, "a->pod");
    }

    #[test]
    fn test_unknown_namespace_is_empty() {
        let snapshot = two_namespace_snapshot();
        let graph = filter(&snapshot, &NamespaceSelection::namespace("zzz"));
        assert!(graph.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_selection_parsing() {
        assert_eq!("all".parse::<NamespaceSelection>(), Ok(NamespaceSelection::All));
        assert_eq!("ALL".parse::<NamespaceSelection>(), Ok(NamespaceSelection::All));
        assert_eq!("".parse::<NamespaceSelection>(), Ok(NamespaceSelection::All));
        assert_eq!(
            "kube-system".parse::<NamespaceSelection>(),
            Ok(NamespaceSelection::namespace("kube-system"))
        );
        assert_eq!(NamespaceSelection::All.to_string(), "all");
    }
}
