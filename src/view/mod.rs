//! Render model projection
//!
//! Converts positioned nodes and visible edges into the JSON-friendly shape a
//! graph renderer consumes. No geometry and no filtering happen here.

use crate::constants::DEFAULT_EDGE_KIND;
use crate::graph::NamespaceSelection;
use crate::models::{Position, ResourceKind, ResourceNode, StructuralEdge, TopologySnapshot};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Which end of an edge a node is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeDirection {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub edge: String,
    pub peer: String,
    pub direction: EdgeDirection,
}

/// Renderer payload for one node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub label: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub namespace: String,
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
    pub connections: Vec<Connection>,
    pub connection_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub id: String,
    pub position: Position,
    pub data: NodeData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub inferred: bool,
}

/// Entry in the namespace picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSummary {
    pub id: String,
    pub name: String,
    /// Members, not counting the namespace root
    pub node_count: usize,
    pub pod_count: usize,
}

impl NamespaceSummary {
    /// One entry per namespace, ordered by id
    pub fn index(snapshot: &TopologySnapshot) -> Vec<NamespaceSummary> {
        snapshot
            .namespaces
            .values()
            .map(|ns| NamespaceSummary {
                id: ns.id.clone(),
                name: ns.name.clone(),
                node_count: ns.member_count(),
                pod_count: ns.count_of(ResourceKind::Pod),
            })
            .collect()
    }
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderModel {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
    pub selected_namespace: NamespaceSelection,
    pub namespaces: Vec<NamespaceSummary>,
}

impl RenderModel {
    pub fn with_selection(mut self, selection: NamespaceSelection) -> Self {
        self.selected_namespace = selection;
        self
    }

    pub fn with_namespaces(mut self, namespaces: Vec<NamespaceSummary>) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn node(&self, id: &str) -> Option<&RenderNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Project positioned nodes and their edges into a render model
///
/// A node without a position is placed at the origin.
pub fn project(nodes: &[ResourceNode], edges: &[StructuralEdge]) -> RenderModel {
    let mut connections: HashMap<&str, Vec<Connection>> = HashMap::new();
    for edge in edges {
        connections
            .entry(edge.source.as_str())
            .or_default()
            .push(Connection {
                edge: edge.id.clone(),
                peer: edge.target.clone(),
                direction: EdgeDirection::Outgoing,
            });
        if edge.target != edge.source {
            connections
                .entry(edge.target.as_str())
                .or_default()
                .push(Connection {
                    edge: edge.id.clone(),
                    peer: edge.source.clone(),
                    direction: EdgeDirection::Incoming,
                });
        }
    }

    let nodes = nodes
        .iter()
        .map(|node| {
            let connections = connections.remove(node.id.as_str()).unwrap_or_default();
            RenderNode {
                id: node.id.clone(),
                position: node.position.unwrap_or_default(),
                data: NodeData {
                    label: node.name.clone(),
                    name: node.name.clone(),
                    kind: node.kind,
                    namespace: node.namespace.clone(),
                    status: node.status.clone(),
                    labels: node.labels.clone(),
                    cpu: node.cpu.clone(),
                    ram: node.ram.clone(),
                    role: node.role.clone(),
                    connection_count: connections.len(),
                    connections,
                },
            }
        })
        .collect();

    let edges = edges
        .iter()
        .map(|edge| RenderEdge {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            kind: edge
                .kind
                .clone()
                .unwrap_or_else(|| DEFAULT_EDGE_KIND.to_string()),
            inferred: edge.inferred,
        })
        .collect();

    RenderModel {
        nodes,
        edges,
        ..RenderModel::default()
    }
}
