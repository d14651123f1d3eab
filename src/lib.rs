//! topomap library
//!
//! Turns namespace-partitioned Kubernetes topology snapshots into positioned,
//! renderer-ready graphs. The pipeline is ingest, filter, infer, layout,
//! project; [`session::TopologySession`] drives it from connection events.

pub mod cli;
pub mod config;
pub mod connection;
pub mod constants;
pub mod graph;
pub mod ingest;
pub mod layout;
pub mod models;
pub mod session;
pub mod view;

// Re-export commonly used types for convenience
pub use connection::{ConnectionEvent, ConnectionManager, ConnectionState, ReconnectPolicy};
pub use graph::{NamespaceSelection, NodeQuery, filter, infer_implicit_edges};
pub use ingest::{ParseError, SnapshotStore, ingest};
pub use layout::{Layout, LayoutDirection, LayoutStrategy, layout};
pub use models::{ResourceKind, ResourceNode, StructuralEdge, TopologySnapshot};
pub use session::TopologySession;
pub use view::{RenderModel, project};
