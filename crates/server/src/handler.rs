//! Event handlers
//!
//! Every decoded frame becomes a [`StructuredEvent`] handed to each handler
//! of the server in insertion order. A handler that fails or panics is
//! logged and counted, and the remaining handlers still run.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use parking_lot::RwLock;
use syslane_protocol::StructuredEvent;
use tokio::sync::mpsc;

use crate::{HandlerError, ServerMetrics};

#[cfg(test)]
#[path = "handler_test.rs"]
mod tests;

/// One connection (stream) or one sender of a datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Unique within the server
    pub id: u64,

    /// Server name
    pub server: Arc<str>,

    /// Remote address, or socket path for Unix peers
    pub peer: String,
}

/// Receives server lifecycle callbacks and decoded events
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &str;

    /// Server started
    async fn initialize(&self, _server: &str) {}

    async fn session_opened(&self, _session: &SessionInfo) {}

    /// One decoded frame
    async fn event(
        &self,
        session: &SessionInfo,
        event: &StructuredEvent,
    ) -> Result<(), HandlerError>;

    async fn session_closed(&self, _session: &SessionInfo) {}

    /// Server stopped
    async fn destroy(&self, _server: &str) {}
}

// =============================================================================
// HandlerSet
// =============================================================================

/// Ordered, shared list of handlers
///
/// Clones share the same list; handlers added while the server runs see
/// the next event.
#[derive(Clone, Default)]
pub struct HandlerSet {
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().push(handler);
    }

    /// Remove every handler called `name`
    pub fn remove(&self, name: &str) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|h| h.name() != name);
        handlers.len() != before
    }

    pub fn clear(&self) {
        self.handlers.write().clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.handlers
            .read()
            .iter()
            .map(|h| h.name().to_string())
            .collect()
    }

    fn snapshot(&self) -> Vec<Arc<dyn EventHandler>> {
        self.handlers.read().clone()
    }

    pub(crate) async fn initialize(&self, server: &str, metrics: &ServerMetrics) {
        for handler in self.snapshot() {
            guard(handler.name(), metrics, handler.initialize(server)).await;
        }
    }

    pub(crate) async fn session_opened(&self, session: &SessionInfo, metrics: &ServerMetrics) {
        for handler in self.snapshot() {
            guard(handler.name(), metrics, handler.session_opened(session)).await;
        }
    }

    /// Deliver one event to every handler, in order
    pub(crate) async fn dispatch(
        &self,
        session: &SessionInfo,
        event: &StructuredEvent,
        metrics: &ServerMetrics,
    ) {
        for handler in self.snapshot() {
            if let Some(Err(e)) = guard(handler.name(), metrics, handler.event(session, event)).await
            {
                metrics.handler_error();
                tracing::warn!(
                    server = %session.server,
                    handler = %handler.name(),
                    peer = %session.peer,
                    error = %e,
                    "event handler failed"
                );
            }
        }
    }

    pub(crate) async fn session_closed(&self, session: &SessionInfo, metrics: &ServerMetrics) {
        for handler in self.snapshot() {
            guard(handler.name(), metrics, handler.session_closed(session)).await;
        }
    }

    pub(crate) async fn destroy(&self, server: &str, metrics: &ServerMetrics) {
        for handler in self.snapshot() {
            guard(handler.name(), metrics, handler.destroy(server)).await;
        }
    }
}

impl fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Run one handler callback, turning a panic into `None`
async fn guard<F, T>(name: &str, metrics: &ServerMetrics, call: F) -> Option<T>
where
    F: Future<Output = T>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(value) => Some(value),
        Err(panic) => {
            metrics.handler_error();
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(handler = %name, panic = %reason, "event handler panicked");
            None
        }
    }
}

// =============================================================================
// Built-in handlers
// =============================================================================

/// Logs every event through `tracing`
#[derive(Debug, Default)]
pub struct TracingEventHandler;

#[async_trait]
impl EventHandler for TracingEventHandler {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn session_opened(&self, session: &SessionInfo) {
        tracing::debug!(server = %session.server, peer = %session.peer, session = session.id, "session opened");
    }

    async fn event(
        &self,
        session: &SessionInfo,
        event: &StructuredEvent,
    ) -> Result<(), HandlerError> {
        tracing::info!(
            server = %session.server,
            peer = %session.peer,
            facility = event.facility.map(|f| f.as_str()),
            severity = event.severity.map(|s| s.as_str()),
            host = event.host.as_deref(),
            app = event.app_name.as_deref(),
            structured = event.structured,
            "{}",
            event.message
        );
        Ok(())
    }

    async fn session_closed(&self, session: &SessionInfo) {
        tracing::debug!(server = %session.server, peer = %session.peer, session = session.id, "session closed");
    }
}

/// An event with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedEvent {
    pub session: SessionInfo,
    pub event: StructuredEvent,
}

/// Forwards events to an mpsc channel
///
/// Sends wait for channel capacity, so a slow consumer slows the sessions
/// feeding it.
#[derive(Debug, Clone)]
pub struct ChannelEventHandler {
    tx: mpsc::Sender<ReceivedEvent>,
}

impl ChannelEventHandler {
    /// Handler plus the receiving end of a channel holding `capacity` events
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ReceivedEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: mpsc::Sender<ReceivedEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventHandler for ChannelEventHandler {
    fn name(&self) -> &str {
        "channel"
    }

    async fn event(
        &self,
        session: &SessionInfo,
        event: &StructuredEvent,
    ) -> Result<(), HandlerError> {
        self.tx
            .send(ReceivedEvent {
                session: session.clone(),
                event: event.clone(),
            })
            .await
            .map_err(|_| HandlerError::new("event channel closed"))
    }
}
