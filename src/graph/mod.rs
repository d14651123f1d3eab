//! Graph data structures for the visible topology
//!
//! A [`LayoutGraph`] is the filtered, inference-complete node/edge set handed
//! to the layout engine. It is derived from a snapshot on every pass and never
//! stored.

mod filter;
mod inference;
mod search;

pub use filter::{NamespaceSelection, filter};
pub use inference::{implicit_edge_id, infer_implicit_edges};
pub use search::NodeQuery;

use crate::models::{ResourceNode, StructuralEdge};
use std::collections::HashSet;

/// Nodes and edges visible in the current view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutGraph {
    pub nodes: Vec<ResourceNode>,
    pub edges: Vec<StructuralEdge>,
}

impl LayoutGraph {
    pub fn new(nodes: Vec<ResourceNode>, edges: Vec<StructuralEdge>) -> Self {
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append the root edges inference synthesizes for unreachable members
    pub fn with_inferred_edges(mut self) -> Self {
        let implicit = infer_implicit_edges(&self.nodes, &self.edges);
        self.edges.extend(implicit);
        self
    }

    /// Keep nodes matching `keep`, then only edges whose endpoints both survive
    pub(crate) fn retain_nodes<F>(self, keep: F) -> Self
    where
        F: Fn(&ResourceNode) -> bool,
    {
        let nodes: Vec<ResourceNode> = self.nodes.into_iter().filter(|n| keep(n)).collect();
        let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let edges = self
            .edges
            .into_iter()
            .filter(|e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str()))
            .collect();
        Self { nodes, edges }
    }
}
