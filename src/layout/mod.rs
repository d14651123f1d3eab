//! Layout engine
//!
//! Assigns top-left anchored 2-D positions to the visible nodes. The layered
//! (Sugiyama style) strategy is the default and the radial strategy is the
//! fallback. Both implement [`LayoutStrategy`].

mod layered;
mod radial;

pub use layered::LayeredLayout;
pub use radial::RadialLayout;

use crate::constants::{
    MAX_CROSSING_SWEEPS, NODE_HEIGHT, NODE_SEP_BASE, NODE_SEP_MAX, NODE_SEP_MIN,
    NODE_SEP_PER_NODE, NODE_WIDTH, RANK_SEP_BASE, RANK_SEP_MAX, RANK_SEP_MIN, RANK_SEP_PER_NODE,
};
use crate::models::{Position, ResourceNode, StructuralEdge};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Flow direction of ranks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutDirection {
    /// Ranks are rows
    #[default]
    #[serde(rename = "TB", alias = "tb")]
    TopToBottom,
    /// Ranks are columns
    #[serde(rename = "LR", alias = "lr")]
    LeftToRight,
}

impl fmt::Display for LayoutDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutDirection::TopToBottom => write!(f, "TB"),
            LayoutDirection::LeftToRight => write!(f, "LR"),
        }
    }
}

impl FromStr for LayoutDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tb" | "td" | "top-to-bottom" | "toptobottom" => Ok(LayoutDirection::TopToBottom),
            "lr" | "left-to-right" | "lefttoright" => Ok(LayoutDirection::LeftToRight),
            _ => Err(format!("Unknown layout direction: {} (expected TB or LR)", s)),
        }
    }
}

/// Which layout strategy to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutEngine {
    #[default]
    Layered,
    Radial,
}

impl fmt::Display for LayoutEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutEngine::Layered => write!(f, "layered"),
            LayoutEngine::Radial => write!(f, "radial"),
        }
    }
}

impl FromStr for LayoutEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "layered" | "dagre" | "hierarchical" => Ok(LayoutEngine::Layered),
            "radial" | "circle" => Ok(LayoutEngine::Radial),
            _ => Err(format!("Unknown layout engine: {} (expected layered or radial)", s)),
        }
    }
}

/// Spacing that grows with node count, clamped to `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacingRule {
    pub base: f64,
    pub per_node: f64,
    pub min: f64,
    pub max: f64,
}

impl SpacingRule {
    pub fn resolve(&self, node_count: usize) -> f64 {
        (self.base + self.per_node * node_count as f64)
            .max(self.min)
            .min(self.max)
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.min <= self.max
    }
}

/// Geometry knobs shared by all strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSettings {
    #[serde(default = "default_node_width")]
    pub node_width: f64,
    #[serde(default = "default_node_height")]
    pub node_height: f64,
    #[serde(default = "default_rank_sep")]
    pub rank_sep: SpacingRule,
    #[serde(default = "default_node_sep")]
    pub node_sep: SpacingRule,
    #[serde(default = "default_max_crossing_sweeps")]
    pub max_crossing_sweeps: usize,
}

fn default_node_width() -> f64 {
    NODE_WIDTH
}

fn default_node_height() -> f64 {
    NODE_HEIGHT
}

fn default_rank_sep() -> SpacingRule {
    SpacingRule {
        base: RANK_SEP_BASE,
        per_node: RANK_SEP_PER_NODE,
        min: RANK_SEP_MIN,
        max: RANK_SEP_MAX,
    }
}

fn default_node_sep() -> SpacingRule {
    SpacingRule {
        base: NODE_SEP_BASE,
        per_node: NODE_SEP_PER_NODE,
        min: NODE_SEP_MIN,
        max: NODE_SEP_MAX,
    }
}

fn default_max_crossing_sweeps() -> usize {
    MAX_CROSSING_SWEEPS
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            node_width: default_node_width(),
            node_height: default_node_height(),
            rank_sep: default_rank_sep(),
            node_sep: default_node_sep(),
            max_crossing_sweeps: default_max_crossing_sweeps(),
        }
    }
}

/// Problems found in the layout input; the offending edge is skipped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("Edge {edge} references missing node {missing}")]
    DanglingEdge { edge: String, missing: String },
}

/// Result of a layout pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    /// Input nodes, in input order, each with a position
    pub nodes: Vec<ResourceNode>,
    /// Bounding box of all node boxes, measured from the origin
    pub width: f64,
    pub height: f64,
    /// Edges skipped because they could not be placed
    pub dropped: Vec<LayoutError>,
}

impl Layout {
    fn from_nodes(nodes: Vec<ResourceNode>, settings: &LayoutSettings, dropped: Vec<LayoutError>) -> Self {
        let mut width: f64 = 0.0;
        let mut height: f64 = 0.0;
        for pos in nodes.iter().filter_map(|n| n.position) {
            width = width.max(pos.x + settings.node_width);
            height = height.max(pos.y + settings.node_height);
        }
        for error in &dropped {
            tracing::warn!("Layout skipped edge: {}", error);
        }
        Self {
            nodes,
            width,
            height,
            dropped,
        }
    }
}

/// A replaceable node placement algorithm
///
/// Implementations must be deterministic: identical input, identical output.
pub trait LayoutStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn layout(
        &self,
        nodes: &[ResourceNode],
        edges: &[StructuralEdge],
        direction: LayoutDirection,
    ) -> Layout;
}

/// Build the strategy for `engine`
pub fn strategy_for(engine: LayoutEngine, settings: LayoutSettings) -> Box<dyn LayoutStrategy> {
    match engine {
        LayoutEngine::Layered => Box::new(LayeredLayout::new(settings)),
        LayoutEngine::Radial => Box::new(RadialLayout::new(settings)),
    }
}

/// Lay out with the default layered strategy and settings
pub fn layout(
    nodes: &[ResourceNode],
    edges: &[StructuralEdge],
    direction: LayoutDirection,
) -> Vec<ResourceNode> {
    LayeredLayout::default().layout(nodes, edges, direction).nodes
}

/// Convert a center-anchored coordinate to the top-left of a box
fn top_left(center_x: f64, center_y: f64, settings: &LayoutSettings) -> Position {
    Position::new(
        center_x - settings.node_width / 2.0,
        center_y - settings.node_height / 2.0,
    )
}
