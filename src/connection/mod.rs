//! Streaming connection lifecycle
//!
//! [`ConnectionManager`] owns a single long-lived text stream to the topology
//! feed. It publishes lifecycle changes and raw messages on an unbounded
//! channel, and reconnects after unexpected closures up to a bounded number
//! of attempts. The byte-level protocol lives behind [`Transport`].

mod file;

pub use file::FileTransport;

use crate::constants::{
    ABNORMAL_CLOSURE, NORMAL_CLOSURE, RECONNECT_ATTEMPTS, RECONNECT_INTERVAL_MS,
};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use url::Url;

/// One unit read from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// Peer closed the stream with this close code
    Close(u16),
}

pub type FrameStream = BoxStream<'static, Frame>;

/// Opens a frame stream to an endpoint
///
/// A stream that ends without a [`Frame::Close`] is treated as an abnormal
/// closure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn open(&self, endpoint: &Url) -> Result<FrameStream, ConnectionError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("Failed to connect to {endpoint}: {reason}")]
    Open { endpoint: String, reason: String },
    #[error("Connection closed unexpectedly (code {code})")]
    Dropped { code: u16 },
    #[error("Giving up after {attempts} reconnect attempts")]
    RetriesExhausted { attempts: u32 },
    #[error("I/O error: {0}")]
    Io(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// Event published by the connection manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    State(ConnectionState),
    Message(String),
    /// A reconnect is scheduled after the policy interval
    Reconnecting { attempt: u32, max_attempts: u32 },
    Error(ConnectionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            RECONNECT_ATTEMPTS,
            Duration::from_millis(RECONNECT_INTERVAL_MS),
        )
    }
}

/// Sending half shared between the manager and its driver task
///
/// Each driver gets its own `run`; only the run matching `active` may
/// publish. The check and the send happen under one lock, so nothing from a
/// retired driver can land after the manager has moved on.
#[derive(Clone)]
struct Link {
    events: mpsc::UnboundedSender<ConnectionEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
    active: Arc<Mutex<u64>>,
    run: u64,
}

impl Link {
    fn gate(&self) -> MutexGuard<'_, u64> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ConnectionEvent) {
        let active = self.gate();
        if *active == self.run {
            let _ = self.events.send(event);
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let active = self.gate();
        if *active == self.run {
            self.publish_state(state);
        }
    }

    /// Caller must hold the gate
    fn publish_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
        let _ = self.events.send(ConnectionEvent::State(state));
    }

    /// Link for a fresh driver; any earlier run goes quiet
    fn begin_run(&self) -> Link {
        let mut active = self.gate();
        *active += 1;
        Link {
            run: *active,
            ..self.clone()
        }
    }

    /// Silence the current driver and keep the gate held
    fn retire(&self) -> MutexGuard<'_, u64> {
        let mut active = self.gate();
        *active += 1;
        active
    }
}

/// Single owner of the streaming connection
///
/// Dropping the manager tears the connection down.
pub struct ConnectionManager<T: Transport> {
    transport: Arc<T>,
    endpoint: Url,
    policy: ReconnectPolicy,
    link: Link,
    handle: Option<JoinHandle<()>>,
}

impl<T: Transport> ConnectionManager<T> {
    /// Create a manager; the receiver is the subscription to its events
    pub fn new(
        transport: T,
        endpoint: Url,
        policy: ReconnectPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ConnectionState::Closed);
        (
            Self {
                transport: Arc::new(transport),
                endpoint,
                policy,
                link: Link {
                    events: tx,
                    state: Arc::new(state_tx),
                    active: Arc::new(Mutex::new(0)),
                    run: 0,
                },
                handle: None,
            },
            rx,
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    pub fn state(&self) -> ConnectionState {
        *self.link.state.borrow()
    }

    /// Watch the connection state without consuming events
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.link.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start the connection; does nothing while one is already running
    pub fn connect(&mut self) {
        if self.is_running() {
            tracing::debug!("Connection to {} already running", self.endpoint);
            return;
        }

        let transport = Arc::clone(&self.transport);
        let endpoint = self.endpoint.clone();
        let policy = self.policy;
        let link = self.link.begin_run();
        self.handle = Some(tokio::spawn(drive(transport, endpoint, policy, link)));
    }

    /// Stop the connection and any pending reconnect
    ///
    /// `Closed` is the last state published, even if the driver was mid-poll
    /// on another worker when the abort landed.
    pub fn disconnect(&mut self) {
        let _gate = self.link.retire();
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::info!("Disconnected from {}", self.endpoint);
        }
        if *self.link.state.borrow() != ConnectionState::Closed {
            self.link.publish_state(ConnectionState::Closed);
        }
    }

    /// Resolve once the connection has ended for good
    ///
    /// Events published before the end are still queued on the receiver.
    pub async fn wait(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::error!("Connection task failed: {}", e);
                }
            }
            self.handle = None;
        }
    }
}

impl<T: Transport> Drop for ConnectionManager<T> {
    fn drop(&mut self) {
        let _gate = self.link.retire();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Connection loop: open, pump frames, reconnect on unexpected closure
async fn drive<T: Transport>(
    transport: Arc<T>,
    endpoint: Url,
    policy: ReconnectPolicy,
    link: Link,
) {
    let mut attempts = 0u32;

    loop {
        link.set_state(ConnectionState::Connecting);
        match transport.open(&endpoint).await {
            Ok(mut frames) => {
                attempts = 0;
                link.set_state(ConnectionState::Open);
                tracing::info!("Connected to {}", endpoint);

                let code = loop {
                    match frames.next().await {
                        Some(Frame::Text(text)) => link.emit(ConnectionEvent::Message(text)),
                        Some(Frame::Close(code)) => break code,
                        None => break ABNORMAL_CLOSURE,
                    }
                };
                link.set_state(ConnectionState::Closed);

                if code == NORMAL_CLOSURE {
                    tracing::info!("Connection to {} closed cleanly", endpoint);
                    return;
                }
                tracing::warn!("Connection to {} dropped with code {}", endpoint, code);
                link.emit(ConnectionEvent::Error(ConnectionError::Dropped { code }));
            }
            Err(error) => {
                tracing::warn!("{}", error);
                link.set_state(ConnectionState::Closed);
                link.emit(ConnectionEvent::Error(error));
            }
        }

        if attempts >= policy.max_attempts {
            tracing::error!(
                "Giving up on {} after {} reconnect attempts",
                endpoint,
                attempts
            );
            link.emit(ConnectionEvent::Error(ConnectionError::RetriesExhausted {
                attempts,
            }));
            return;
        }

        attempts += 1;
        tracing::info!(
            "Reconnecting to {} in {:?} (attempt {}/{})",
            endpoint,
            policy.interval,
            attempts,
            policy.max_attempts
        );
        link.emit(ConnectionEvent::Reconnecting {
            attempt: attempts,
            max_attempts: policy.max_attempts,
        });
        tokio::time::sleep(policy.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn endpoint() -> Url {
        Url::parse("ws://localhost:8080/ws/topology").unwrap()
    }

    fn quick(max_attempts: u32) -> ReconnectPolicy {
        ReconnectPolicy::new(max_attempts, Duration::from_millis(2))
    }

    fn frames(items: Vec<Frame>) -> FrameStream {
        stream::iter(items).boxed()
    }

    /// Collect events until `stop` matches, failing after a second
    async fn collect_until<F>(
        rx: &mut mpsc::UnboundedReceiver<ConnectionEvent>,
        stop: F,
    ) -> Vec<ConnectionEvent>
    where
        F: Fn(&ConnectionEvent) -> bool,
    {
        let mut events = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("timed out waiting for connection event")
                .expect("event channel closed");
            let done = stop(&event);
            events.push(event);
            if done {
                return events;
            }
        }
    }

    async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<ConnectionEvent>) {
        let next = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(next.is_err(), "unexpected event: {:?}", next);
    }

    #[tokio::test]
    async fn test_clean_close_does_not_reconnect() {
        let mut transport = MockTransport::new();
        transport.expect_open().times(1).returning(|_| {
            Ok(frames(vec![
                Frame::Text("hello".to_string()),
                Frame::Close(NORMAL_CLOSURE),
            ]))
        });

        let (mut manager, mut rx) = ConnectionManager::new(transport, endpoint(), quick(3));
        manager.connect();

        let events = collect_until(&mut rx, |e| {
            *e == ConnectionEvent::State(ConnectionState::Closed)
        })
        .await;
        assert_eq!(
            events,
            vec![
                ConnectionEvent::State(ConnectionState::Connecting),
                ConnectionEvent::State(ConnectionState::Open),
                ConnectionEvent::Message("hello".to_string()),
                ConnectionEvent::State(ConnectionState::Closed),
            ]
        );
        assert_quiet(&mut rx).await;
        assert_eq!(manager.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_open_failures_are_bounded() {
        let mut transport = MockTransport::new();
        transport.expect_open().times(3).returning(|url| {
            Err(ConnectionError::Open {
                endpoint: url.to_string(),
                reason: "refused".to_string(),
            })
        });

        let (mut manager, mut rx) = ConnectionManager::new(transport, endpoint(), quick(2));
        manager.connect();

        let events = collect_until(&mut rx, |e| {
            matches!(
                e,
                ConnectionEvent::Error(ConnectionError::RetriesExhausted { .. })
            )
        })
        .await;

        let attempts: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                ConnectionEvent::Reconnecting { attempt, .. } => Some(*attempt),
                _ => None,
            })
            .collect();
        assert_eq!(attempts, vec![1, 2]);
        assert_eq!(
            events.last(),
            Some(&ConnectionEvent::Error(ConnectionError::RetriesExhausted {
                attempts: 2
            }))
        );
        assert_quiet(&mut rx).await;
    }

    #[tokio::test]
    async fn test_successful_open_resets_counter() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut transport = MockTransport::new();
        transport.expect_open().returning(move |_| {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            if call < 2 {
                Ok(frames(vec![Frame::Close(ABNORMAL_CLOSURE)]))
            } else {
                Ok(frames(vec![
                    Frame::Text("third".to_string()),
                    Frame::Close(NORMAL_CLOSURE),
                ]))
            }
        });

        // One attempt allowed; two drops in a row only succeed if the counter resets
        let (mut manager, mut rx) = ConnectionManager::new(transport, endpoint(), quick(1));
        manager.connect();

        let events = collect_until(&mut rx, |e| {
            *e == ConnectionEvent::Message("third".to_string())
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(events.iter().all(|e| !matches!(
            e,
            ConnectionEvent::Error(ConnectionError::RetriesExhausted { .. })
        )));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, ConnectionEvent::Reconnecting { attempt: 1, .. }))
                .count(),
            2
        );
        assert!(events.contains(&ConnectionEvent::Error(ConnectionError::Dropped {
            code: ABNORMAL_CLOSURE
        })));
    }

    #[tokio::test]
    async fn test_stream_end_counts_as_abnormal() {
        let mut transport = MockTransport::new();
        transport
            .expect_open()
            .times(1)
            .returning(|_| Ok(frames(Vec::new())));

        let (mut manager, mut rx) = ConnectionManager::new(transport, endpoint(), quick(0));
        manager.connect();

        let events = collect_until(&mut rx, |e| {
            matches!(
                e,
                ConnectionEvent::Error(ConnectionError::RetriesExhausted { .. })
            )
        })
        .await;
        assert!(events.contains(&ConnectionEvent::Error(ConnectionError::Dropped {
            code: ABNORMAL_CLOSURE
        })));
    }

    #[test]
    fn test_retired_driver_cannot_publish() {
        let (mut manager, mut rx) =
            ConnectionManager::new(MockTransport::new(), endpoint(), quick(1));
        let driver = manager.link.begin_run();
        driver.set_state(ConnectionState::Open);

        manager.disconnect();
        driver.set_state(ConnectionState::Connecting);
        driver.emit(ConnectionEvent::Message("late".to_string()));

        assert_eq!(manager.state(), ConnectionState::Closed);
        assert_eq!(
            rx.try_recv(),
            Ok(ConnectionEvent::State(ConnectionState::Open))
        );
        assert_eq!(
            rx.try_recv(),
            Ok(ConnectionEvent::State(ConnectionState::Closed))
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_disconnect_during_reconnects_ends_closed() {
        let mut transport = MockTransport::new();
        transport.expect_open().returning(|url| {
            Err(ConnectionError::Open {
                endpoint: url.to_string(),
                reason: "refused".to_string(),
            })
        });

        let policy = ReconnectPolicy::new(u32::MAX, Duration::from_millis(1));
        let (mut manager, mut rx) = ConnectionManager::new(transport, endpoint(), policy);
        manager.connect();
        collect_until(&mut rx, |e| {
            matches!(e, ConnectionEvent::Reconnecting { attempt: 3, .. })
        })
        .await;

        // Everything the driver sent before it was retired is already queued
        manager.disconnect();
        while rx.try_recv().is_ok() {}

        assert_quiet(&mut rx).await;
        assert_eq!(manager.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_disconnect_stops_everything() {
        let mut transport = MockTransport::new();
        transport
            .expect_open()
            .times(1)
            .returning(|_| Ok(stream::pending::<Frame>().boxed()));

        let (mut manager, mut rx) = ConnectionManager::new(transport, endpoint(), quick(5));
        let mut state = manager.watch_state();
        manager.connect();
        manager.connect();

        collect_until(&mut rx, |e| *e == ConnectionEvent::State(ConnectionState::Open)).await;
        assert_eq!(*state.borrow_and_update(), ConnectionState::Open);

        manager.disconnect();
        assert_eq!(
            rx.recv().await,
            Some(ConnectionEvent::State(ConnectionState::Closed))
        );
        assert_quiet(&mut rx).await;
        assert_eq!(*state.borrow(), ConnectionState::Closed);
        assert!(!manager.is_running());
    }
}
