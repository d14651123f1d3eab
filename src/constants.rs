//! Shared constants

/// Logical node footprint used for layout spacing
pub const NODE_WIDTH: f64 = 170.0;
pub const NODE_HEIGHT: f64 = 100.0;

/// Rank separation: clamp(base + per_node * N, min, max)
pub const RANK_SEP_BASE: f64 = 60.0;
pub const RANK_SEP_PER_NODE: f64 = 2.0;
pub const RANK_SEP_MIN: f64 = 60.0;
pub const RANK_SEP_MAX: f64 = 200.0;

/// Node separation within a rank: clamp(base + per_node * N, min, max)
pub const NODE_SEP_BASE: f64 = 40.0;
pub const NODE_SEP_PER_NODE: f64 = 1.0;
pub const NODE_SEP_MIN: f64 = 40.0;
pub const NODE_SEP_MAX: f64 = 120.0;

/// Upper bound on barycenter sweeps during crossing minimization
pub const MAX_CROSSING_SWEEPS: usize = 24;

/// Coordinate refinement passes after ordering
pub const COORDINATE_PASSES: usize = 4;

/// Smallest circle radius used by the radial fallback layout
pub const RADIAL_MIN_RADIUS: f64 = 200.0;

/// Reconnect defaults for the streaming connection
pub const RECONNECT_ATTEMPTS: u32 = 5;
pub const RECONNECT_INTERVAL_MS: u64 = 3000;

/// Close code for an intentional shutdown (RFC 6455)
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when a stream ends without a close frame
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Namespace assigned to flat-shape nodes that carry none
pub const FALLBACK_NAMESPACE: &str = "default";

/// Default feed endpoint
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080/ws/topology";

/// Edge kind given to edges synthesized from a namespace root
pub const INFERRED_EDGE_KIND: &str = "namespace";

/// Edge kind reported to the renderer when the feed supplies none
pub const DEFAULT_EDGE_KIND: &str = "structural";
