//! Topology session
//!
//! The single owner of view state. Connection events and selection changes
//! come in; a cached [`RenderModel`] goes out. Nothing in here is fatal: a bad
//! message or a dead connection only changes [`SessionStatus`] and raises a
//! dismissible [`Notice`] while the last good graph stays on screen.

use crate::connection::{ConnectionError, ConnectionEvent, ConnectionState};
use crate::graph::{NamespaceSelection, NodeQuery, filter};
use crate::ingest::{IngestPolicy, ParseError, SnapshotStore};
use crate::layout::{LayeredLayout, LayoutDirection, LayoutStrategy};
use crate::models::TopologySnapshot;
use crate::view::{NamespaceSummary, RenderModel, project};
use std::fmt;
use std::sync::Arc;

/// Coarse status for a status bar
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Idle,
    Connecting,
    Live,
    Reconnecting {
        attempt: u32,
        max: u32,
    },
    /// Reconnects exhausted; terminal until a new connection is made
    Failed(String),
    Closed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Connecting => write!(f, "connecting"),
            SessionStatus::Live => write!(f, "live"),
            SessionStatus::Reconnecting { attempt, max } => {
                write!(f, "reconnecting ({}/{})", attempt, max)
            }
            SessionStatus::Failed(reason) => write!(f, "failed: {}", reason),
            SessionStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Dismissible banner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The latest message was rejected; the previous graph is still shown
    Parse(ParseError),
    Connection(ConnectionError),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Parse(e) => write!(f, "{}", e),
            Notice::Connection(e) => write!(f, "{}", e),
        }
    }
}

/// Inputs the render model depends on
#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewKey {
    generation: u64,
    selection: NamespaceSelection,
    query: NodeQuery,
    direction: LayoutDirection,
    strategy: &'static str,
}

pub struct TopologySession {
    store: SnapshotStore,
    selection: NamespaceSelection,
    query: NodeQuery,
    direction: LayoutDirection,
    strategy: Box<dyn LayoutStrategy>,
    status: SessionStatus,
    notice: Option<Notice>,
    rendered_for: Option<ViewKey>,
    model: RenderModel,
    layout_passes: u64,
}

impl TopologySession {
    pub fn new(strategy: Box<dyn LayoutStrategy>) -> Self {
        Self {
            store: SnapshotStore::default(),
            selection: NamespaceSelection::All,
            query: NodeQuery::default(),
            direction: LayoutDirection::default(),
            strategy,
            status: SessionStatus::Idle,
            notice: None,
            rendered_for: None,
            model: RenderModel::default(),
            layout_passes: 0,
        }
    }

    pub fn with_ingest_policy(mut self, policy: IngestPolicy) -> Self {
        self.store = SnapshotStore::new(policy);
        self
    }

    pub fn with_selection(mut self, selection: NamespaceSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_direction(mut self, direction: LayoutDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn selection(&self) -> &NamespaceSelection {
        &self.selection
    }

    pub fn query(&self) -> &NodeQuery {
        &self.query
    }

    pub fn direction(&self) -> LayoutDirection {
        self.direction
    }

    pub fn snapshot(&self) -> Arc<TopologySnapshot> {
        self.store.current()
    }

    pub fn generation(&self) -> u64 {
        self.store.generation()
    }

    /// How many times the layout has actually run
    pub fn layout_passes(&self) -> u64 {
        self.layout_passes
    }

    /// Feed one connection event; returns true when a new snapshot was accepted
    pub fn apply(&mut self, event: ConnectionEvent) -> bool {
        match event {
            ConnectionEvent::State(ConnectionState::Connecting) => {
                if !matches!(self.status, SessionStatus::Reconnecting { .. }) {
                    self.status = SessionStatus::Connecting;
                }
                false
            }
            ConnectionEvent::State(ConnectionState::Open) => {
                self.status = SessionStatus::Live;
                if matches!(self.notice, Some(Notice::Connection(_))) {
                    self.notice = None;
                }
                false
            }
            ConnectionEvent::State(ConnectionState::Closed) => {
                if !matches!(self.status, SessionStatus::Failed(_)) {
                    self.status = SessionStatus::Closed;
                }
                false
            }
            ConnectionEvent::Reconnecting {
                attempt,
                max_attempts,
            } => {
                self.status = SessionStatus::Reconnecting {
                    attempt,
                    max: max_attempts,
                };
                false
            }
            ConnectionEvent::Error(error) => {
                if let ConnectionError::RetriesExhausted { .. } = error {
                    self.status = SessionStatus::Failed(error.to_string());
                }
                self.notice = Some(Notice::Connection(error));
                false
            }
            ConnectionEvent::Message(text) => self.ingest(&text).is_ok(),
        }
    }

    /// Ingest a raw message; on failure the previous snapshot stays current
    pub fn ingest(&mut self, raw: &str) -> Result<(), ParseError> {
        match self.store.ingest(raw) {
            Ok(snapshot) => {
                if matches!(self.notice, Some(Notice::Parse(_))) {
                    self.notice = None;
                }
                let vanished = self
                    .selection
                    .as_namespace()
                    .is_some_and(|ns| snapshot.namespace(ns).is_none());
                if vanished {
                    tracing::info!("Namespace {} no longer present, showing all", self.selection);
                    self.selection = NamespaceSelection::All;
                }
                tracing::debug!(
                    "Accepted snapshot {} ({} nodes, {} edges)",
                    snapshot.generation,
                    snapshot.node_count(),
                    snapshot.edge_count()
                );
                Ok(())
            }
            Err(e) => {
                self.notice = Some(Notice::Parse(e.clone()));
                Err(e)
            }
        }
    }

    /// Namespace picker callback
    pub fn select(&mut self, selection: NamespaceSelection) {
        if self.selection != selection {
            tracing::debug!("Selected namespace {}", selection);
            self.selection = selection;
        }
    }

    pub fn set_query(&mut self, query: NodeQuery) {
        self.query = query;
    }

    pub fn set_direction(&mut self, direction: LayoutDirection) {
        self.direction = direction;
    }

    /// Swap the layout strategy; always forces a fresh layout, since two
    /// strategies with the same name may carry different settings
    pub fn set_strategy(&mut self, strategy: Box<dyn LayoutStrategy>) {
        self.strategy = strategy;
        self.rendered_for = None;
    }

    /// Current render model, recomputed only when one of its inputs changed
    pub fn render(&mut self) -> &RenderModel {
        let key = ViewKey {
            generation: self.store.generation(),
            selection: self.selection.clone(),
            query: self.query.clone(),
            direction: self.direction,
            strategy: self.strategy.name(),
        };

        if self.rendered_for.as_ref() != Some(&key) {
            self.model = self.build();
            self.rendered_for = Some(key);
        }
        &self.model
    }

    fn build(&mut self) -> RenderModel {
        let snapshot = self.store.current();
        let graph = self
            .query
            .apply(filter(&snapshot, &self.selection))
            .with_inferred_edges();

        let laid_out = self.strategy.layout(&graph.nodes, &graph.edges, self.direction);
        self.layout_passes += 1;
        tracing::debug!(
            "{} layout of {} nodes -> {:.0}x{:.0}",
            self.strategy.name(),
            laid_out.nodes.len(),
            laid_out.width,
            laid_out.height
        );

        project(&laid_out.nodes, &graph.edges)
            .with_selection(self.selection.clone())
            .with_namespaces(NamespaceSummary::index(&snapshot))
    }
}

impl Default for TopologySession {
    fn default() -> Self {
        Self::new(Box::new(LayeredLayout::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_NAMESPACES: &str = r#"{
        "namespaces": {
            "web": {"name": "web", "nodes": [
                {"id": "svc", "name": "svc", "type": "service"},
                {"id": "pod", "name": "pod", "type": "pod"}
            ], "edges": [{"source": "svc", "target": "pod"}]},
            "db": {"name": "db", "nodes": [{"id": "pg", "name": "pg", "type": "pod"}]}
        }
    }"#;

    #[test]
    fn test_render_is_cached() {
        let mut session = TopologySession::default();
        session.ingest(TWO_NAMESPACES).unwrap();

        let first = session.render().clone();
        let second = session.render().clone();
        assert_eq!(first, second);
        assert_eq!(session.layout_passes(), 1);

        session.select(NamespaceSelection::namespace("db"));
        assert_eq!(session.render().nodes.len(), 2);
        assert_eq!(session.layout_passes(), 2);
    }

    #[test]
    fn test_bad_message_keeps_graph() {
        let mut session = TopologySession::default();
        session.ingest(TWO_NAMESPACES).unwrap();
        let before = session.render().clone();

        assert!(!session.apply(ConnectionEvent::Message("{not json".to_string())));
        assert!(matches!(session.notice(), Some(Notice::Parse(_))));
        assert_eq!(session.generation(), 1);
        assert_eq!(session.render(), &before);

        session.dismiss_notice();
        assert!(session.notice().is_none());
    }

    #[test]
    fn test_status_follows_connection() {
        let mut session = TopologySession::default();
        assert_eq!(session.status(), &SessionStatus::Idle);

        session.apply(ConnectionEvent::State(ConnectionState::Connecting));
        assert_eq!(session.status(), &SessionStatus::Connecting);
        session.apply(ConnectionEvent::State(ConnectionState::Open));
        assert_eq!(session.status(), &SessionStatus::Live);

        session.apply(ConnectionEvent::State(ConnectionState::Closed));
        session.apply(ConnectionEvent::Error(ConnectionError::Dropped { code: 1006 }));
        session.apply(ConnectionEvent::Reconnecting {
            attempt: 1,
            max_attempts: 5,
        });
        session.apply(ConnectionEvent::State(ConnectionState::Connecting));
        assert_eq!(
            session.status(),
            &SessionStatus::Reconnecting { attempt: 1, max: 5 }
        );
        assert!(matches!(session.notice(), Some(Notice::Connection(_))));

        session.apply(ConnectionEvent::State(ConnectionState::Open));
        assert_eq!(session.status(), &SessionStatus::Live);
        assert!(session.notice().is_none());
    }

    #[test]
    fn test_exhausted_retries_fail() {
        let mut session = TopologySession::default();
        session.apply(ConnectionEvent::Error(ConnectionError::RetriesExhausted {
            attempts: 5,
        }));
        session.apply(ConnectionEvent::State(ConnectionState::Closed));
        assert!(matches!(session.status(), SessionStatus::Failed(_)));
    }

    #[test]
    fn test_vanished_namespace_falls_back_to_all() {
        let mut session =
            TopologySession::default().with_selection(NamespaceSelection::namespace("db"));
        session.ingest(TWO_NAMESPACES).unwrap();
        assert_eq!(session.selection(), &NamespaceSelection::namespace("db"));

        session
            .ingest(r#"{"namespaces": {"web": {"name": "web"}}}"#)
            .unwrap();
        assert_eq!(session.selection(), &NamespaceSelection::All);
    }
}
