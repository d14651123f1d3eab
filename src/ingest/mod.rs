//! Snapshot ingestion
//!
//! Turns a raw feed message into a [`TopologySnapshot`] and keeps the single
//! canonical "last known snapshot" in a [`SnapshotStore`].
//!
//! Ingestion is where every wire quirk stops:
//! - the flat `{nodes, edges}` shape is folded into the namespace-keyed one
//! - every namespace gets a root node (synthesized when the feed omits it)
//! - every node is stamped with the namespace it was delivered under
//! - edges without an id get `source|target|ordinal`
//! - edges pointing at nodes that are not in the snapshot are dropped
//!
//! Positions are never assigned here; that is the layout engine's job.

mod wire;

use crate::constants::FALLBACK_NAMESPACE;
use crate::models::{NamespaceSnapshot, ResourceKind, ResourceNode, StructuralEdge, TopologySnapshot};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use wire::{WireEdge, WireNamespace, WireNode, WirePayload};

/// Ingestion errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Malformed topology payload: {0}")]
    Malformed(String),

    #[error("Topology payload contains no namespaces")]
    Empty,
}

/// Caller policy applied on top of schema validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestPolicy {
    /// Treat a well-formed payload with zero namespaces as an error
    pub reject_empty: bool,
}

/// Parse a feed message with the default policy
pub fn ingest(raw: &str) -> Result<TopologySnapshot, ParseError> {
    ingest_with_policy(raw, &IngestPolicy::default())
}

/// Parse a feed message into a fresh snapshot
pub fn ingest_with_policy(
    raw: &str,
    policy: &IngestPolicy,
) -> Result<TopologySnapshot, ParseError> {
    let payload: WirePayload =
        serde_json::from_str(raw).map_err(|e| ParseError::Malformed(e.to_string()))?;

    if payload.namespaces.is_none() && payload.nodes.is_none() {
        return Err(ParseError::Malformed(
            "payload has neither `namespaces` nor `nodes`".to_string(),
        ));
    }

    let groups = normalize(payload);
    if groups.is_empty() && policy.reject_empty {
        return Err(ParseError::Empty);
    }

    let snapshot = assemble(groups);
    tracing::debug!(
        "Ingested snapshot: {} namespaces, {} nodes, {} edges",
        snapshot.namespaces.len(),
        snapshot.node_count(),
        snapshot.edge_count()
    );
    Ok(snapshot)
}

/// Fold the flat wire shape into the namespace-keyed one
fn normalize(payload: WirePayload) -> BTreeMap<String, WireNamespace> {
    let mut groups = payload.namespaces.unwrap_or_default();

    for node in payload.nodes.unwrap_or_default() {
        let ns = node
            .namespace
            .clone()
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| FALLBACK_NAMESPACE.to_string());
        groups
            .entry(ns)
            .or_default()
            .nodes
            .get_or_insert_with(Vec::new)
            .push(node);
    }

    let flat_edges = payload.edges.unwrap_or_default();
    if flat_edges.is_empty() {
        return groups;
    }

    // Flat edges travel with their source node's namespace
    let mut owner: HashMap<String, String> = HashMap::new();
    for (ns_id, group) in &groups {
        owner.insert(ns_id.clone(), ns_id.clone());
        for node in group.nodes.iter().flatten() {
            owner.entry(node.id.clone()).or_insert_with(|| ns_id.clone());
        }
    }

    for edge in flat_edges {
        match owner.get(&edge.source) {
            Some(ns_id) => {
                if let Some(group) = groups.get_mut(ns_id) {
                    group.edges.get_or_insert_with(Vec::new).push(edge);
                }
            }
            None => tracing::warn!(
                "Dropping edge {} -> {}: unknown source node",
                edge.source,
                edge.target
            ),
        }
    }

    groups
}

/// Build the snapshot, enforcing id uniqueness and edge validity
fn assemble(groups: BTreeMap<String, WireNamespace>) -> TopologySnapshot {
    let mut seen: HashSet<String> = groups.keys().cloned().collect();
    let mut namespaces = BTreeMap::new();
    let mut pending_edges: Vec<(String, Vec<WireEdge>)> = Vec::new();

    for (ns_id, group) in groups {
        let display_name = group
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| ns_id.clone());

        let mut wire_nodes = group.nodes.unwrap_or_default();
        let provided_root = wire_nodes
            .iter()
            .position(|n| n.id == ns_id)
            .map(|idx| wire_nodes.remove(idx));

        let root = match provided_root {
            Some(node) => {
                let mut root = convert_node(node, &ns_id);
                root.kind = ResourceKind::Namespace;
                root
            }
            None => ResourceNode::namespace_root(ns_id.clone(), display_name.clone()),
        };

        let mut nodes = Vec::with_capacity(wire_nodes.len() + 1);
        nodes.push(root);
        for node in wire_nodes {
            if !seen.insert(node.id.clone()) {
                tracing::warn!(
                    "Dropping node {} in namespace {}: id already used",
                    node.id,
                    ns_id
                );
                continue;
            }
            nodes.push(convert_node(node, &ns_id));
        }

        pending_edges.push((ns_id.clone(), group.edges.unwrap_or_default()));
        namespaces.insert(
            ns_id.clone(),
            NamespaceSnapshot {
                id: ns_id,
                name: display_name,
                nodes,
                edges: Vec::new(),
            },
        );
    }

    let mut ordinals: HashMap<(String, String), usize> = HashMap::new();
    let mut edge_ids: HashSet<String> = HashSet::new();
    // Derived ids must not take an id the feed supplies later on
    let supplied: HashSet<String> = pending_edges
        .iter()
        .flat_map(|(_, edges)| edges.iter().filter_map(|e| e.id.clone()))
        .filter(|id| !id.is_empty())
        .collect();

    for (ns_id, wire_edges) in pending_edges {
        let mut edges = Vec::with_capacity(wire_edges.len());
        for edge in wire_edges {
            if !seen.contains(&edge.source) || !seen.contains(&edge.target) {
                tracing::warn!(
                    "Dropping edge {} -> {} in namespace {}: endpoint not in snapshot",
                    edge.source,
                    edge.target,
                    ns_id
                );
                continue;
            }

            let slot = ordinals
                .entry((edge.source.clone(), edge.target.clone()))
                .or_insert(0);
            let id = match edge.id.filter(|id| !id.is_empty()) {
                Some(id) => {
                    *slot += 1;
                    id
                }
                None => loop {
                    let candidate = StructuralEdge::derived_id(&edge.source, &edge.target, *slot);
                    *slot += 1;
                    if !supplied.contains(&candidate) && !edge_ids.contains(&candidate) {
                        break candidate;
                    }
                },
            };
            if !edge_ids.insert(id.clone()) {
                tracing::warn!("Dropping edge {}: duplicate id", id);
                continue;
            }

            edges.push(StructuralEdge {
                id,
                source: edge.source,
                target: edge.target,
                kind: edge.kind.filter(|k| !k.is_empty()),
                inferred: false,
            });
        }

        if let Some(ns) = namespaces.get_mut(&ns_id) {
            ns.edges = edges;
        }
    }

    TopologySnapshot {
        namespaces,
        received_at: Utc::now(),
        generation: 0,
    }
}

fn convert_node(node: WireNode, ns_id: &str) -> ResourceNode {
    let name = node
        .name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| node.id.clone());
    ResourceNode {
        id: node.id,
        name,
        kind: node.kind,
        namespace: ns_id.to_string(),
        position: node.position,
        status: node.status,
        labels: node.labels.unwrap_or_default(),
        cpu: node.cpu,
        ram: node.ram,
        role: node.role,
    }
}

/// Holder of the canonical snapshot
///
/// A successful ingest swaps in a new `Arc`; a failed one leaves the current
/// snapshot exactly as it was.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    current: Arc<TopologySnapshot>,
    generation: u64,
    policy: IngestPolicy,
}

impl SnapshotStore {
    pub fn new(policy: IngestPolicy) -> Self {
        Self {
            current: Arc::new(TopologySnapshot::empty()),
            generation: 0,
            policy,
        }
    }

    /// The last accepted snapshot
    pub fn current(&self) -> Arc<TopologySnapshot> {
        Arc::clone(&self.current)
    }

    /// Number of snapshots accepted so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ingest(&mut self, raw: &str) -> Result<Arc<TopologySnapshot>, ParseError> {
        let mut snapshot = match ingest_with_policy(raw, &self.policy) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    "Rejected topology payload, keeping generation {}: {}",
                    self.generation,
                    e
                );
                return Err(e);
            }
        };

        self.generation += 1;
        snapshot.generation = self.generation;
        self.current = Arc::new(snapshot);
        Ok(self.current())
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(IngestPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_namespaces_is_valid() {
        let snapshot = ingest(r#"{"namespaces": {}}"#).unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.node_count(), 0);
        assert_eq!(snapshot.edge_count(), 0);
    }

    #[test]
    fn test_empty_rejected_by_policy() {
        let policy = IngestPolicy { reject_empty: true };
        assert_eq!(
            ingest_with_policy(r#"{"namespaces": {}}"#, &policy),
            Err(ParseError::Empty)
        );
    }

    #[test]
    fn test_missing_keys_is_malformed() {
        assert!(matches!(ingest("{}"), Err(ParseError::Malformed(_))));
        assert!(matches!(ingest("[]"), Err(ParseError::Malformed(_))));
        assert!(matches!(ingest("not json"), Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_root_synthesized_and_namespace_overridden() {
        let snapshot = ingest(
            r#"{"namespaces": {"web": {"name": "Web", "nodes": [
                {"id": "p1", "name": "p1", "type": "pod", "namespace": "elsewhere"}
            ], "edges": []}}}"#,
        )
        .unwrap();

        let ns = snapshot.namespace("web").unwrap();
        assert_eq!(ns.nodes.len(), 2);
        let root = ns.root().unwrap();
        assert_eq!(root.id, "web");
        assert_eq!(root.name, "Web");
        assert_eq!(root.kind, ResourceKind::Namespace);
        assert_eq!(ns.nodes[1].namespace, "web");
        assert!(ns.nodes[1].position.is_none());
    }

    #[test]
    fn test_provided_root_is_reused() {
        let snapshot = ingest(
            r#"{"namespaces": {"web": {"name": "Web", "nodes": [
                {"id": "web", "name": "web-ns", "type": "namespace", "status": "Active"}
            ]}}}"#,
        )
        .unwrap();

        let ns = snapshot.namespace("web").unwrap();
        assert_eq!(ns.nodes.len(), 1);
        assert_eq!(ns.nodes[0].status.as_deref(), Some("Active"));
        assert_eq!(ns.nodes[0].name, "web-ns");
    }

    #[test]
    fn test_derived_edge_ids_use_pair_ordinal() {
        let snapshot = ingest(
            r#"{"namespaces": {"web": {"name": "web", "nodes": [
                {"id": "svc", "name": "svc", "type": "service"},
                {"id": "pod", "name": "pod", "type": "pod"}
            ], "edges": [
                {"source": "svc", "target": "pod"},
                {"source": "svc", "target": "pod", "type": "selects"}
            ]}}}"#,
        )
        .unwrap();

        let ids: Vec<&str> = snapshot.edges().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["svc|pod|0", "svc|pod|1"]);
        assert_eq!(snapshot.edges().nth(1).unwrap().kind.as_deref(), Some("selects"));
    }

    #[test]
    fn test_derived_id_skips_supplied_id() {
        let snapshot = ingest(
            r#"{"namespaces": {"web": {"name": "web", "nodes": [
                {"id": "a", "type": "pod"}, {"id": "b", "type": "pod"},
                {"id": "x", "type": "pod"}, {"id": "y", "type": "pod"}
            ], "edges": [
                {"id": "a|b|1", "source": "x", "target": "y"},
                {"source": "a", "target": "b"},
                {"source": "a", "target": "b"},
                {"source": "a", "target": "b"}
            ]}}}"#,
        )
        .unwrap();

        let ids: Vec<&str> = snapshot.edges().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a|b|1", "a|b|0", "a|b|2", "a|b|3"]);
    }

    #[test]
    fn test_dangling_edges_dropped() {
        let snapshot = ingest(
            r#"{"namespaces": {"web": {"name": "web", "nodes": [
                {"id": "svc", "name": "svc", "type": "service"}
            ], "edges": [{"id": "e1", "source": "svc", "target": "ghost"}]}}}"#,
        )
        .unwrap();
        assert_eq!(snapshot.edge_count(), 0);
    }

    #[test]
    fn test_store_swaps_and_retains() {
        let mut store = SnapshotStore::default();
        assert_eq!(store.generation(), 0);

        let first = store
            .ingest(r#"{"namespaces": {"a": {"name": "a", "nodes": [], "edges": []}}}"#)
            .unwrap();
        assert_eq!(first.generation, 1);

        assert!(store.ingest("{\"namespaces\": 42}").is_err());
        assert!(Arc::ptr_eq(&first, &store.current()));
        assert_eq!(store.generation(), 1);
    }
}
