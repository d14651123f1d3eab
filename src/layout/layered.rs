//! Layered (Sugiyama style) layout
//!
//! Pipeline: index edges, reverse back edges, longest-path ranking, split
//! long edges with virtual nodes, barycenter ordering, then coordinate
//! assignment. Every step iterates in input order so the result is a pure
//! function of the input.

use super::{Layout, LayoutDirection, LayoutError, LayoutSettings, LayoutStrategy, top_left};
use crate::constants::COORDINATE_PASSES;
use crate::models::{ResourceNode, StructuralEdge};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Default)]
pub struct LayeredLayout {
    settings: LayoutSettings,
}

impl LayeredLayout {
    pub fn new(settings: LayoutSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }
}

impl LayoutStrategy for LayeredLayout {
    fn name(&self) -> &'static str {
        "layered"
    }

    fn layout(
        &self,
        nodes: &[ResourceNode],
        edges: &[StructuralEdge],
        direction: LayoutDirection,
    ) -> Layout {
        let settings = &self.settings;
        let (pairs, dropped) = index_edges(nodes, edges);
        let real = nodes.len();
        if real == 0 {
            return Layout::from_nodes(Vec::new(), settings, dropped);
        }

        let acyclic = break_cycles(real, &pairs);
        let ranks = assign_ranks(real, &acyclic);
        let graph = RankGraph::build(ranks, &acyclic, real);
        let layers = order_layers(&graph, settings.max_crossing_sweeps);

        let (order_size, rank_size) = match direction {
            LayoutDirection::TopToBottom => (settings.node_width, settings.node_height),
            LayoutDirection::LeftToRight => (settings.node_height, settings.node_width),
        };
        let node_sep = settings.node_sep.resolve(real);
        let rank_sep = settings.rank_sep.resolve(real);
        let order = assign_order_coordinates(&graph, &layers, order_size, node_sep);

        let mut placed = nodes.to_vec();
        for (v, node) in placed.iter_mut().enumerate() {
            let along = order[v];
            let across = graph.rank[v] as f64 * (rank_size + rank_sep) + rank_size / 2.0;
            let (cx, cy) = match direction {
                LayoutDirection::TopToBottom => (along, across),
                LayoutDirection::LeftToRight => (across, along),
            };
            node.position = Some(top_left(cx, cy, settings));
        }

        tracing::debug!(
            "Layered layout placed {} nodes in {} ranks ({} virtual)",
            real,
            layers.len(),
            graph.rank.len() - real
        );
        Layout::from_nodes(placed, settings, dropped)
    }
}

/// Resolve edge endpoints to node indices
///
/// Self-loops and repeated endpoint pairs carry no layout information and
/// are skipped. Edges naming an unknown node are reported.
fn index_edges(
    nodes: &[ResourceNode],
    edges: &[StructuralEdge],
) -> (Vec<(usize, usize)>, Vec<LayoutError>) {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        index.entry(node.id.as_str()).or_insert(i);
    }

    let mut pairs = Vec::with_capacity(edges.len());
    let mut seen = HashSet::new();
    let mut dropped = Vec::new();
    for edge in edges {
        let source = index.get(edge.source.as_str()).copied();
        let target = index.get(edge.target.as_str()).copied();
        match (source, target) {
            (Some(s), Some(t)) => {
                if s != t && seen.insert((s, t)) {
                    pairs.push((s, t));
                }
            }
            (None, _) => dropped.push(LayoutError::DanglingEdge {
                edge: edge.id.clone(),
                missing: edge.source.clone(),
            }),
            (_, None) => dropped.push(LayoutError::DanglingEdge {
                edge: edge.id.clone(),
                missing: edge.target.clone(),
            }),
        }
    }
    (pairs, dropped)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Reverse every DFS back edge so the edge set becomes acyclic
fn break_cycles(n: usize, pairs: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut succ = vec![Vec::new(); n];
    for &(s, t) in pairs {
        succ[s].push(t);
    }

    let mut state = vec![Visit::New; n];
    let mut back = HashSet::new();
    for start in 0..n {
        if state[start] != Visit::New {
            continue;
        }
        state[start] = Visit::Active;
        let mut stack = vec![(start, 0usize)];
        while let Some(frame) = stack.last_mut() {
            let (v, cursor) = *frame;
            if cursor < succ[v].len() {
                frame.1 += 1;
                let w = succ[v][cursor];
                match state[w] {
                    Visit::New => {
                        state[w] = Visit::Active;
                        stack.push((w, 0));
                    }
                    Visit::Active => {
                        back.insert((v, w));
                    }
                    Visit::Done => {}
                }
            } else {
                state[v] = Visit::Done;
                stack.pop();
            }
        }
    }

    if !back.is_empty() {
        tracing::debug!("Reversed {} edges to break cycles", back.len());
    }

    let mut seen = HashSet::new();
    pairs
        .iter()
        .map(|&(s, t)| if back.contains(&(s, t)) { (t, s) } else { (s, t) })
        .filter(|pair| seen.insert(*pair))
        .collect()
}

/// Longest-path ranking over an acyclic edge set
fn assign_ranks(n: usize, pairs: &[(usize, usize)]) -> Vec<usize> {
    let mut succ = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];
    for &(s, t) in pairs {
        succ[s].push(t);
        in_degree[t] += 1;
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
    let mut rank = vec![0usize; n];
    while let Some(v) = queue.pop_front() {
        for &w in &succ[v] {
            rank[w] = rank[w].max(rank[v] + 1);
            in_degree[w] -= 1;
            if in_degree[w] == 0 {
                queue.push_back(w);
            }
        }
    }
    rank
}

/// Proper layered graph: every edge spans exactly one rank
///
/// Indices below `real` are input nodes; the rest are virtual nodes inserted
/// along long edges.
struct RankGraph {
    real: usize,
    rank: Vec<usize>,
    succ: Vec<Vec<usize>>,
    pred: Vec<Vec<usize>>,
}

impl RankGraph {
    fn build(mut rank: Vec<usize>, pairs: &[(usize, usize)], real: usize) -> Self {
        let mut succ = vec![Vec::new(); real];
        let mut pred = vec![Vec::new(); real];

        for &(s, t) in pairs {
            let span = rank[t] - rank[s];
            let mut prev = s;
            for step in 1..span {
                let virtual_node = rank.len();
                rank.push(rank[s] + step);
                succ.push(Vec::new());
                pred.push(Vec::new());
                succ[prev].push(virtual_node);
                pred[virtual_node].push(prev);
                prev = virtual_node;
            }
            succ[prev].push(t);
            pred[t].push(prev);
        }

        Self {
            real,
            rank,
            succ,
            pred,
        }
    }

    fn len(&self) -> usize {
        self.rank.len()
    }

    fn is_virtual(&self, v: usize) -> bool {
        v >= self.real
    }

    fn rank_count(&self) -> usize {
        self.rank.iter().copied().max().map_or(0, |r| r + 1)
    }
}

fn count_crossings(layers: &[Vec<usize>], pos: &[usize], succ: &[Vec<usize>]) -> usize {
    let mut crossings = 0;
    for layer in layers.iter().take(layers.len().saturating_sub(1)) {
        let segments: Vec<(usize, usize)> = layer
            .iter()
            .flat_map(|&u| succ[u].iter().map(move |&w| (pos[u], pos[w])))
            .collect();
        for i in 0..segments.len() {
            for j in (i + 1)..segments.len() {
                let (a1, b1) = segments[i];
                let (a2, b2) = segments[j];
                if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                    crossings += 1;
                }
            }
        }
    }
    crossings
}

/// Reorder one layer by the mean position of its neighbors
///
/// Nodes without neighbors in the reference layer keep their slot as key.
fn barycenter_sort(layer: &mut [usize], pos: &mut [usize], neighbors: &[Vec<usize>]) {
    let mut keyed: Vec<(f64, usize, usize)> = layer
        .iter()
        .map(|&v| {
            let adjacent = &neighbors[v];
            let key = if adjacent.is_empty() {
                pos[v] as f64
            } else {
                adjacent.iter().map(|&u| pos[u] as f64).sum::<f64>() / adjacent.len() as f64
            };
            (key, pos[v], v)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    for (slot, (_, _, v)) in keyed.into_iter().enumerate() {
        layer[slot] = v;
        pos[v] = slot;
    }
}

/// Alternate down and up sweeps, keeping the ordering with fewest crossings
fn order_layers(graph: &RankGraph, max_sweeps: usize) -> Vec<Vec<usize>> {
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); graph.rank_count()];
    for v in 0..graph.len() {
        layers[graph.rank[v]].push(v);
    }

    let mut pos = vec![0usize; graph.len()];
    for layer in &layers {
        for (slot, &v) in layer.iter().enumerate() {
            pos[v] = slot;
        }
    }

    let mut best_crossings = count_crossings(&layers, &pos, &graph.succ);
    let mut best = layers.clone();

    for sweep in 0..max_sweeps {
        if best_crossings == 0 {
            break;
        }
        if sweep % 2 == 0 {
            for i in 1..layers.len() {
                barycenter_sort(&mut layers[i], &mut pos, &graph.pred);
            }
        } else {
            for i in (0..layers.len().saturating_sub(1)).rev() {
                barycenter_sort(&mut layers[i], &mut pos, &graph.succ);
            }
        }

        let crossings = count_crossings(&layers, &pos, &graph.succ);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = layers.clone();
        }
    }

    tracing::trace!("Crossing minimization settled on {} crossings", best_crossings);
    best
}

/// Center coordinates along the order axis (x for TB, y for LR)
///
/// Adjacent nodes in a layer are kept at least `node_sep` apart; virtual
/// nodes have no extent and use half the gap.
fn assign_order_coordinates(
    graph: &RankGraph,
    layers: &[Vec<usize>],
    order_size: f64,
    node_sep: f64,
) -> Vec<f64> {
    let extent = |v: usize| if graph.is_virtual(v) { 0.0 } else { order_size };
    let gap = |a: usize, b: usize| {
        let sep = if graph.is_virtual(a) || graph.is_virtual(b) {
            node_sep / 2.0
        } else {
            node_sep
        };
        (extent(a) + extent(b)) / 2.0 + sep
    };

    let mut coord = vec![0.0f64; graph.len()];
    for layer in layers {
        let mut cursor = 0.0;
        for (slot, &v) in layer.iter().enumerate() {
            if slot > 0 {
                cursor += gap(layer[slot - 1], v);
            }
            coord[v] = cursor;
        }
        let shift = cursor / 2.0;
        for &v in layer {
            coord[v] -= shift;
        }
    }

    for pass in 0..COORDINATE_PASSES {
        let downward = pass % 2 == 0;
        let sequence: Vec<usize> = if downward {
            (1..layers.len()).collect()
        } else {
            (0..layers.len().saturating_sub(1)).rev().collect()
        };
        let neighbors = if downward { &graph.pred } else { &graph.succ };

        for i in sequence {
            let layer = &layers[i];
            if layer.is_empty() {
                continue;
            }
            let targets: Vec<f64> = layer
                .iter()
                .map(|&v| {
                    let adjacent = &neighbors[v];
                    if adjacent.is_empty() {
                        coord[v]
                    } else {
                        adjacent.iter().map(|&u| coord[u]).sum::<f64>() / adjacent.len() as f64
                    }
                })
                .collect();

            let mut placed = targets.clone();
            for slot in 1..layer.len() {
                let min = placed[slot - 1] + gap(layer[slot - 1], layer[slot]);
                placed[slot] = placed[slot].max(min);
            }

            let drift = (targets.iter().sum::<f64>() - placed.iter().sum::<f64>())
                / layer.len() as f64;
            for (slot, &v) in layer.iter().enumerate() {
                coord[v] = placed[slot] + drift;
            }
        }
    }

    let left = (0..graph.real)
        .map(|v| coord[v] - order_size / 2.0)
        .fold(f64::INFINITY, f64::min);
    if left.is_finite() {
        for c in coord.iter_mut() {
            *c -= left;
        }
    }
    coord
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Position, ResourceKind};

    fn node(id: &str) -> ResourceNode {
        ResourceNode::new(id, id, ResourceKind::Pod, "web")
    }

    fn edge(source: &str, target: &str) -> StructuralEdge {
        StructuralEdge::new(format!("{}->{}", source, target), source, target)
    }

    fn position_of(layout: &Layout, id: &str) -> Position {
        layout
            .nodes
            .iter()
            .find(|n| n.id == id)
            .and_then(|n| n.position)
            .unwrap()
    }

    fn assert_no_overlap(layout: &Layout, settings: &LayoutSettings) {
        let boxes: Vec<Position> = layout.nodes.iter().map(|n| n.position.unwrap()).collect();
        for i in 0..boxes.len() {
            for j in (i + 1)..boxes.len() {
                let (a, b) = (boxes[i], boxes[j]);
                let apart_x = (a.x - b.x).abs() >= settings.node_width - 1e-6;
                let apart_y = (a.y - b.y).abs() >= settings.node_height - 1e-6;
                assert!(
                    apart_x || apart_y,
                    "{} and {} overlap",
                    layout.nodes[i].id,
                    layout.nodes[j].id
                );
            }
        }
    }

    #[test]
    fn test_empty_input() {
        let layout = LayeredLayout::default().layout(&[], &[], LayoutDirection::TopToBottom);
        assert!(layout.nodes.is_empty());
        assert_eq!(layout.width, 0.0);
        assert_eq!(layout.height, 0.0);
    }

    #[test]
    fn test_single_node_at_origin() {
        let layout =
            LayeredLayout::default().layout(&[node("a")], &[], LayoutDirection::TopToBottom);
        assert_eq!(position_of(&layout, "a"), Position::new(0.0, 0.0));
        assert_eq!(layout.width, 170.0);
        assert_eq!(layout.height, 100.0);
    }

    #[test]
    fn test_parent_above_child() {
        let strategy = LayeredLayout::default();
        let rank_sep = strategy.settings().rank_sep.resolve(2);
        let layout = strategy.layout(
            &[node("root"), node("child")],
            &[edge("root", "child")],
            LayoutDirection::TopToBottom,
        );
        let root = position_of(&layout, "root");
        let child = position_of(&layout, "child");
        assert_eq!(root, Position::new(0.0, 0.0));
        assert_eq!(child.x, 0.0);
        assert_eq!(child.y, 100.0 + rank_sep);
    }

    #[test]
    fn test_left_to_right_advances_x() {
        let layout = LayeredLayout::default().layout(
            &[node("a"), node("b"), node("c")],
            &[edge("a", "b"), edge("b", "c")],
            LayoutDirection::LeftToRight,
        );
        let a = position_of(&layout, "a");
        let b = position_of(&layout, "b");
        let c = position_of(&layout, "c");
        assert!(a.x < b.x && b.x < c.x);
        assert_eq!(a.y, b.y);
        assert_eq!(b.y, c.y);
    }

    #[test]
    fn test_ranks_follow_longest_path() {
        let pairs = vec![(0, 1), (1, 2), (0, 2)];
        assert_eq!(assign_ranks(3, &pairs), vec![0, 1, 2]);
    }

    #[test]
    fn test_cycle_is_broken() {
        let pairs = vec![(0, 1), (1, 2), (2, 0)];
        let acyclic = break_cycles(3, &pairs);
        assert_eq!(acyclic, vec![(0, 1), (1, 2), (0, 2)]);
        assert_eq!(assign_ranks(3, &acyclic), vec![0, 1, 2]);
    }

    #[test]
    fn test_two_cycle_collapses() {
        let acyclic = break_cycles(2, &[(0, 1), (1, 0)]);
        assert_eq!(acyclic, vec![(0, 1)]);
    }

    #[test]
    fn test_cyclic_input_places_every_node() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "a")];
        let layout = LayeredLayout::default().layout(&nodes, &edges, LayoutDirection::TopToBottom);
        assert!(layout.nodes.iter().all(|n| n.position.is_some()));
        assert!(layout.dropped.is_empty());
    }

    #[test]
    fn test_long_edge_gets_virtual_nodes() {
        let graph = RankGraph::build(vec![0, 1, 3], &[(0, 1), (0, 2)], 3);
        assert_eq!(graph.len(), 5);
        assert!(graph.is_virtual(3) && graph.is_virtual(4));
        assert_eq!(graph.succ[0], vec![1, 3]);
        assert_eq!(graph.succ[4], vec![2]);
    }

    #[test]
    fn test_crossing_is_removed() {
        // a feeds d, b feeds c: index order crosses once
        let graph = RankGraph::build(vec![0, 0, 1, 1], &[(0, 3), (1, 2)], 4);
        let layers = order_layers(&graph, 8);
        let mut pos = vec![0; 4];
        for layer in &layers {
            for (slot, &v) in layer.iter().enumerate() {
                pos[v] = slot;
            }
        }
        assert_eq!(count_crossings(&layers, &pos, &graph.succ), 0);
    }

    #[test]
    fn test_dangling_edge_reported() {
        let layout = LayeredLayout::default().layout(
            &[node("a")],
            &[edge("a", "ghost"), edge("phantom", "a")],
            LayoutDirection::TopToBottom,
        );
        assert_eq!(
            layout.dropped,
            vec![
                LayoutError::DanglingEdge {
                    edge: "a->ghost".to_string(),
                    missing: "ghost".to_string(),
                },
                LayoutError::DanglingEdge {
                    edge: "phantom->a".to_string(),
                    missing: "phantom".to_string(),
                },
            ]
        );
        assert!(layout.nodes[0].position.is_some());
    }

    #[test]
    fn test_wide_fanout_does_not_overlap() {
        let mut nodes = vec![node("root")];
        let mut edges = Vec::new();
        for i in 0..12 {
            let id = format!("pod-{}", i);
            edges.push(edge("root", &id));
            nodes.push(node(&id));
        }
        // A few deeper chains to force virtual nodes
        nodes.push(node("deep"));
        edges.push(edge("pod-0", "deep"));
        edges.push(edge("root", "deep"));

        let strategy = LayeredLayout::default();
        let layout = strategy.layout(&nodes, &edges, LayoutDirection::TopToBottom);
        assert_no_overlap(&layout, strategy.settings());
        let min_x = layout
            .nodes
            .iter()
            .map(|n| n.position.unwrap().x)
            .fold(f64::INFINITY, f64::min);
        assert!(min_x.abs() < 1e-9);
    }

    #[test]
    fn test_deterministic() {
        let nodes: Vec<ResourceNode> = (0..8).map(|i| node(&format!("n{}", i))).collect();
        let edges = vec![
            edge("n0", "n3"),
            edge("n1", "n2"),
            edge("n2", "n5"),
            edge("n3", "n4"),
            edge("n4", "n0"),
            edge("n6", "n7"),
        ];
        let strategy = LayeredLayout::default();
        let first = strategy.layout(&nodes, &edges, LayoutDirection::TopToBottom);
        let second = strategy.layout(&nodes, &edges, LayoutDirection::TopToBottom);
        assert_eq!(first, second);
    }
}
