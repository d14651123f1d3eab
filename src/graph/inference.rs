//! Implicit edge inference
//!
//! Nodes nothing points at would float free in a layered layout. Every such
//! node gets an edge from its namespace root. A second pass covers members
//! that have incoming edges but still cannot be reached from their root,
//! such as a cycle among members, so every member ends up reachable.

use crate::constants::INFERRED_EDGE_KIND;
use crate::models::{ResourceNode, StructuralEdge};
use std::collections::{HashMap, HashSet, VecDeque};

/// Deterministic id for the edge from a namespace root to `node_id`
pub fn implicit_edge_id(namespace: &str, node_id: &str) -> String {
    format!("namespace-{}-to-{}", namespace, node_id)
}

fn root_edge(root: &str, child: &str, id: String) -> StructuralEdge {
    StructuralEdge {
        id,
        source: root.to_string(),
        target: child.to_string(),
        kind: Some(INFERRED_EDGE_KIND.to_string()),
        inferred: true,
    }
}

/// Mark everything reachable from `start` that is not yet in `seen`
fn visit<'a>(
    start: &'a str,
    adjacency: &HashMap<&'a str, Vec<&'a str>>,
    seen: &mut HashSet<&'a str>,
) {
    let mut queue = VecDeque::from([start]);
    seen.insert(start);
    while let Some(id) = queue.pop_front() {
        for &next in adjacency.get(id).into_iter().flatten() {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
}

/// Edges to add so every non-root node is reachable from its namespace root
///
/// Returns only the new edges; `edges` is never modified. Running inference
/// again over `edges` plus its own output adds nothing.
pub fn infer_implicit_edges(
    nodes: &[ResourceNode],
    edges: &[StructuralEdge],
) -> Vec<StructuralEdge> {
    let targets: HashSet<&str> = edges.iter().map(|e| e.target.as_str()).collect();
    let existing_ids: HashSet<&str> = edges.iter().map(|e| e.id.as_str()).collect();

    let mut members: HashMap<&str, Vec<&ResourceNode>> = HashMap::new();
    for node in nodes.iter().filter(|n| !n.is_namespace_root()) {
        members.entry(node.namespace.as_str()).or_default().push(node);
    }
    let roots: Vec<&ResourceNode> = nodes.iter().filter(|n| n.is_namespace_root()).collect();

    let mut inferred = Vec::new();
    for root in &roots {
        let Some(children) = members.get(root.id.as_str()) else {
            continue;
        };

        for child in children {
            if targets.contains(child.id.as_str()) {
                continue;
            }
            let id = implicit_edge_id(&root.id, &child.id);
            if existing_ids.contains(id.as_str()) {
                continue;
            }
            inferred.push(root_edge(&root.id, &child.id, id));
        }
    }

    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges.iter().chain(inferred.iter()) {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }

    let mut unreachable = Vec::new();
    for root in &roots {
        let Some(children) = members.get(root.id.as_str()) else {
            continue;
        };

        let mut seen = HashSet::new();
        visit(&root.id, &adjacency, &mut seen);
        for child in children {
            if seen.contains(child.id.as_str()) {
                continue;
            }
            let id = implicit_edge_id(&root.id, &child.id);
            if existing_ids.contains(id.as_str()) {
                continue;
            }
            visit(&child.id, &adjacency, &mut seen);
            unreachable.push(root_edge(&root.id, &child.id, id));
        }
    }
    inferred.extend(unreachable);

    if !inferred.is_empty() {
        tracing::debug!("Inferred {} namespace edges", inferred.len());
    }
    inferred
}
