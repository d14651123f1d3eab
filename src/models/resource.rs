//! Topology resource model
//!
//! Typed nodes, structural edges, and the namespace-partitioned snapshot they
//! live in. Nothing here has behavior beyond accessors; ingestion is the only
//! place snapshots are built.

use super::ResourceKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A 2-D coordinate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A cluster resource in the topology graph
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNode {
    /// Unique across the whole snapshot
    pub id: String,
    /// Display name
    pub name: String,
    /// Resource kind
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    /// Owning namespace id (equals `id` for a namespace root)
    pub namespace: String,
    /// Absent until a layout pass assigns one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl ResourceNode {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ResourceKind,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            namespace: namespace.into(),
            position: None,
            status: None,
            labels: BTreeMap::new(),
            cpu: None,
            ram: None,
            role: None,
        }
    }

    /// The node standing in for a namespace container
    pub fn namespace_root(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(id.clone(), name, ResourceKind::Namespace, id)
    }

    pub fn is_namespace_root(&self) -> bool {
        self.kind.is_namespace() && self.id == self.namespace
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }
}

/// A directed ownership/connectivity relation between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Relationship label from the source data (e.g. "selects", "routes-to")
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Synthesized by edge inference rather than supplied by the feed
    pub inferred: bool,
}

impl StructuralEdge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind: None,
            inferred: false,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Id for an edge the feed did not name: `source|target|ordinal`
    pub fn derived_id(source: &str, target: &str, ordinal: usize) -> String {
        format!("{}|{}|{}", source, target, ordinal)
    }
}

/// One namespace worth of nodes and edges
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceSnapshot {
    pub id: String,
    pub name: String,
    /// Root node first, then nodes in source order
    pub nodes: Vec<ResourceNode>,
    pub edges: Vec<StructuralEdge>,
}

impl NamespaceSnapshot {
    pub fn root(&self) -> Option<&ResourceNode> {
        self.nodes.iter().find(|n| n.is_namespace_root())
    }

    /// Nodes excluding the namespace root
    pub fn member_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_namespace_root()).count()
    }

    pub fn count_of(&self, kind: ResourceKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }
}

/// A complete, internally consistent view of the cluster topology
///
/// Snapshots are replaced wholesale; nothing mutates one after ingestion
/// hands it out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologySnapshot {
    /// Keyed by namespace id, ordered so flattening is deterministic
    pub namespaces: BTreeMap<String, NamespaceSnapshot>,
    pub received_at: DateTime<Utc>,
    /// Assigned by the snapshot store; 0 for a snapshot never stored
    pub generation: u64,
}

impl TopologySnapshot {
    pub fn empty() -> Self {
        Self {
            namespaces: BTreeMap::new(),
            received_at: Utc::now(),
            generation: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    pub fn namespace(&self, id: &str) -> Option<&NamespaceSnapshot> {
        self.namespaces.get(id)
    }

    /// Every node, namespace by namespace
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.namespaces.values().flat_map(|ns| ns.nodes.iter())
    }

    /// Every edge, namespace by namespace
    pub fn edges(&self) -> impl Iterator<Item = &StructuralEdge> {
        self.namespaces.values().flat_map(|ns| ns.edges.iter())
    }

    pub fn node(&self, id: &str) -> Option<&ResourceNode> {
        self.nodes().find(|n| n.id == id)
    }

    pub fn node_count(&self) -> usize {
        self.namespaces.values().map(|ns| ns.nodes.len()).sum()
    }

    pub fn edge_count(&self) -> usize {
        self.namespaces.values().map(|ns| ns.edges.len()).sum()
    }
}

impl Default for TopologySnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_root() {
        let root = ResourceNode::namespace_root("default", "Default");
        assert!(root.is_namespace_root());
        assert_eq!(root.namespace, "default");

        let pod = ResourceNode::new("pod-a", "pod-a", ResourceKind::Pod, "default");
        assert!(!pod.is_namespace_root());
    }

    #[test]
    fn test_derived_edge_id() {
        assert_eq!(StructuralEdge::derived_id("svc", "pod", 0), "svc|pod|0");
        assert_eq!(StructuralEdge::derived_id("svc", "pod", 2), "svc|pod|2");
    }

    #[test]
    fn test_node_serialization_skips_absent_fields() {
        let node = ResourceNode::new("pod-a", "pod-a", ResourceKind::Pod, "default")
            .with_status("Running");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "pod");
        assert_eq!(json["status"], "Running");
        assert!(json.get("position").is_none());
        assert!(json.get("labels").is_none());
    }

    #[test]
    fn test_snapshot_flattening_order() {
        let mut snapshot = TopologySnapshot::empty();
        for id in ["b", "a"] {
            snapshot.namespaces.insert(
                id.to_string(),
                NamespaceSnapshot {
                    id: id.to_string(),
                    name: id.to_string(),
                    nodes: vec![ResourceNode::namespace_root(id, id)],
                    edges: Vec::new(),
                },
            );
        }
        let ids: Vec<&str> = snapshot.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(snapshot.node_count(), 2);
        assert!(snapshot.node("b").is_some());
    }
}
