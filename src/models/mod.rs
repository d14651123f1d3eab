//! Topology model layer
//!
//! Typed representation of cluster resources and the snapshots that hold them.

mod resource;
mod resource_kind;

pub use resource::{NamespaceSnapshot, Position, ResourceNode, StructuralEdge, TopologySnapshot};
pub use resource_kind::ResourceKind;
