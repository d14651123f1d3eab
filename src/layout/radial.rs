//! Radial fallback layout
//!
//! Each namespace becomes a circle: the root sits at the center and the
//! members are spread evenly around it. Circles run left to right in order
//! of first appearance whatever the flow direction. Nodes that arrive with an
//! explicit position keep it.

use super::{Layout, LayoutDirection, LayoutSettings, LayoutStrategy, top_left};
use crate::constants::RADIAL_MIN_RADIUS;
use crate::models::{ResourceNode, StructuralEdge};
use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, TAU};

#[derive(Debug, Clone, Default)]
pub struct RadialLayout {
    settings: LayoutSettings,
}

impl RadialLayout {
    pub fn new(settings: LayoutSettings) -> Self {
        Self { settings }
    }
}

struct Group<'a> {
    root: Option<usize>,
    ring: Vec<usize>,
    namespace: &'a str,
    radius: f64,
}

impl LayoutStrategy for RadialLayout {
    fn name(&self) -> &'static str {
        "radial"
    }

    fn layout(
        &self,
        nodes: &[ResourceNode],
        _edges: &[StructuralEdge],
        _direction: LayoutDirection,
    ) -> Layout {
        let settings = &self.settings;
        let node_sep = settings.node_sep.resolve(nodes.len());
        // Centers further apart than a box diagonal can never overlap, and the
        // ring radius is never below that, so neither can root and member
        let spacing = settings.node_width.hypot(settings.node_height) + node_sep;

        let mut groups: Vec<Group<'_>> = Vec::new();
        let mut by_namespace: HashMap<&str, usize> = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            let slot = *by_namespace.entry(node.namespace.as_str()).or_insert_with(|| {
                groups.push(Group {
                    root: None,
                    ring: Vec::new(),
                    namespace: node.namespace.as_str(),
                    radius: 0.0,
                });
                groups.len() - 1
            });
            let group = &mut groups[slot];
            if group.root.is_none() && node.is_namespace_root() {
                group.root = Some(i);
            } else {
                group.ring.push(i);
            }
        }

        for group in groups.iter_mut() {
            let members = group.ring.len();
            group.radius = if members == 0 {
                0.0
            } else {
                RADIAL_MIN_RADIUS
                    .max(spacing)
                    .max(members as f64 * spacing / 4.0)
            };
        }

        let half_width = settings.node_width / 2.0;
        let cy = groups.iter().map(|g| g.radius).fold(0.0, f64::max) + settings.node_height / 2.0;

        let mut placed = nodes.to_vec();
        let mut cursor = 0.0;
        for group in &groups {
            let cx = cursor + group.radius + half_width;

            if let Some(root) = group.root {
                place(&mut placed[root], cx, cy, settings);
            }
            let members = group.ring.len();
            for (k, &i) in group.ring.iter().enumerate() {
                let angle = TAU * k as f64 / members as f64 - FRAC_PI_2;
                let x = cx + group.radius * angle.cos();
                let y = cy + group.radius * angle.sin();
                place(&mut placed[i], x, y, settings);
            }

            tracing::trace!(
                "Radial group {} has {} members at radius {}",
                group.namespace,
                members,
                group.radius
            );
            cursor = cx + group.radius + half_width + node_sep;
        }

        Layout::from_nodes(placed, settings, Vec::new())
    }
}

fn place(node: &mut ResourceNode, center_x: f64, center_y: f64, settings: &LayoutSettings) {
    if node.position.is_none() {
        node.position = Some(top_left(center_x, center_y, settings));
    }
}
