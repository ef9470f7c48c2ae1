//! Sender - one configured protocol instance
//!
//! # Send path
//!
//! ```text
//! message → stamp (timestamp, host, ident) → modifier chain → render + encode
//!         → transport write ──ok──→ up() if previously down
//!              │ fail
//!              ├─ retry up to write_retries, resetting the connection between attempts
//!              └─ exhausted → down() on every handler → log() on every handler
//!                             → error returned iff throw_on_write_failure
//! ```
//!
//! Configuration errors (self-delegation, modifier setup) are always
//! returned. A pool that stays exhausted past `max_wait` is returned to the
//! caller without retry or backlog escalation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::Utc;
use syslane_config::{SenderConfig, validate_sender};
use syslane_protocol::{Severity, SyslogMessage};
use syslane_transform::Chain;
use syslane_transport::{Transport, TransportError, TransportMetricsSnapshot};
use tokio::time::timeout;

use crate::{BacklogChain, ClientError, LogTarget, Result, Route, TargetRegistry};

#[cfg(test)]
#[path = "sender_test.rs"]
mod tests;

// =============================================================================
// Metrics
// =============================================================================

/// Sender counters
#[derive(Debug, Default)]
pub struct SenderMetrics {
    /// Messages written
    pub messages_sent: AtomicU64,

    /// Messages that exhausted every attempt
    pub messages_failed: AtomicU64,

    /// Extra attempts after a failed write
    pub retries: AtomicU64,

    /// Down transitions reported to the backlog chain
    pub down_events: AtomicU64,
}

impl SenderMetrics {
    pub const fn new() -> Self {
        Self {
            messages_sent: AtomicU64::new(0),
            messages_failed: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            down_events: AtomicU64::new(0),
        }
    }

    #[inline]
    fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_failed(&self) {
        self.messages_failed.fetch_add(1, Ordering::Relaxed);
        self.down_events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SenderMetricsSnapshot {
        SenderMetricsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_failed: self.messages_failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            down_events: self.down_events.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SenderMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderMetricsSnapshot {
    pub messages_sent: u64,
    pub messages_failed: u64,
    pub retries: u64,
    pub down_events: u64,
}

// =============================================================================
// Sender
// =============================================================================

/// A named, configured syslog sender
pub struct Sender {
    name: String,
    config: SenderConfig,
    chain: Chain,
    transport: Arc<dyn Transport>,
    backlog: BacklogChain,
    local_name: String,
    closed: AtomicBool,
    metrics: SenderMetrics,
}

impl Sender {
    /// Validate `config`, build its modifier chain and backlog handlers, and
    /// open its transport
    ///
    /// Delegating backlog handlers resolve their targets through `registry`
    /// when they are used.
    pub async fn open(
        name: &str,
        config: SenderConfig,
        registry: &Weak<TargetRegistry>,
    ) -> Result<Self> {
        validate_sender(name, &config)?;
        let transport =
            syslane_transport::open(name, &config.transport, config.pool.as_ref()).await?;
        let backlog = BacklogChain::from_configs(&config.backlog, registry);
        Self::with_transport(name, config, transport, backlog)
    }

    /// Build around an already-open transport
    pub fn with_transport(
        name: &str,
        config: SenderConfig,
        transport: Arc<dyn Transport>,
        backlog: BacklogChain,
    ) -> Result<Self> {
        let chain = Chain::from_configs(&config.modifiers)?;
        let local_name = config.local_name.clone().unwrap_or_else(local_hostname);

        tracing::info!(
            sender = %name,
            kind = %config.transport.kind,
            target = %transport.target(),
            modifiers = chain.len(),
            backlog_handlers = backlog.len(),
            "sender ready"
        );

        Ok(Self {
            name: name.to_string(),
            config,
            chain,
            transport,
            backlog,
            local_name,
            closed: AtomicBool::new(false),
            metrics: SenderMetrics::new(),
        })
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn backlog(&self) -> &BacklogChain {
        &self.backlog
    }

    /// Host name stamped on outgoing messages
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Whether the last send exhausted its attempts
    pub fn is_down(&self) -> bool {
        self.backlog.is_down(&self.name)
    }

    pub fn metrics(&self) -> SenderMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn transport_metrics(&self) -> TransportMetricsSnapshot {
        self.transport.metrics()
    }

    /// New message with this sender's facility and ident
    pub fn message(&self, severity: Severity, text: impl Into<String>) -> SyslogMessage {
        let message = SyslogMessage::new(self.config.facility, severity, text);
        match &self.config.ident {
            Some(ident) => message.with_ident(ident.clone()),
            None => message,
        }
    }

    /// Send `text` at `severity`
    pub async fn log(&self, severity: Severity, text: impl Into<String>) -> Result<()> {
        self.send(self.message(severity, text)).await
    }

    pub async fn emergency(&self, text: impl Into<String>) -> Result<()> {
        self.log(Severity::Emergency, text).await
    }

    pub async fn alert(&self, text: impl Into<String>) -> Result<()> {
        self.log(Severity::Alert, text).await
    }

    pub async fn critical(&self, text: impl Into<String>) -> Result<()> {
        self.log(Severity::Critical, text).await
    }

    pub async fn error(&self, text: impl Into<String>) -> Result<()> {
        self.log(Severity::Error, text).await
    }

    pub async fn warn(&self, text: impl Into<String>) -> Result<()> {
        self.log(Severity::Warning, text).await
    }

    pub async fn notice(&self, text: impl Into<String>) -> Result<()> {
        self.log(Severity::Notice, text).await
    }

    pub async fn info(&self, text: impl Into<String>) -> Result<()> {
        self.log(Severity::Info, text).await
    }

    pub async fn debug(&self, text: impl Into<String>) -> Result<()> {
        self.log(Severity::Debug, text).await
    }

    /// Fill in what the message leaves unset
    fn stamp(&self, mut message: SyslogMessage) -> SyslogMessage {
        if self.config.send_local_timestamp && message.timestamp().is_none() {
            message = message.with_timestamp(Utc::now());
        }
        if self.config.send_local_name && message.host().is_none() {
            message = message.with_host(self.local_name.clone());
        }
        if message.ident().is_none()
            && let Some(ident) = &self.config.ident
        {
            message = message.with_ident(ident.clone());
        }
        message
    }

    /// Write with retries; `Err` carries the last failure and attempt count
    async fn write_with_retry(&self, payload: &[u8]) -> std::result::Result<(), (TransportError, u32)> {
        let attempts = self.config.transport.write_retries.saturating_add(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                self.metrics.record_retry();
                if self.transport.kind().is_connection_oriented() {
                    self.transport.reset().await;
                }
            }

            match self.transport.write(payload).await {
                Ok(()) => return Ok(()),
                Err(e @ (TransportError::PoolExhausted { .. } | TransportError::PoolClosed)) => {
                    return Err((e, attempt));
                }
                Err(e) => {
                    tracing::debug!(
                        sender = %self.name,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "send attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err((last_error.unwrap_or(TransportError::Closed), attempts))
    }

    async fn escalate(
        &self,
        message: &SyslogMessage,
        error: TransportError,
        attempts: u32,
        route: &Route,
    ) -> Result<()> {
        self.metrics.record_failed();
        let cause = error.to_string();

        tracing::warn!(
            sender = %self.name,
            target = %self.transport.target(),
            attempts,
            error = %cause,
            "delivery failed, handing message to backlog"
        );

        self.backlog.down(&self.name, &cause).await;
        self.backlog.log(&self.name, message, &cause, route).await?;

        if self.config.throw_on_write_failure {
            Err(ClientError::delivery(&self.name, attempts, error))
        } else {
            Ok(())
        }
    }

    /// Close the transport, waiting at most `max_shutdown_wait`
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        if timeout(self.config.max_shutdown_wait, self.transport.close())
            .await
            .is_err()
        {
            tracing::warn!(sender = %self.name, "transport close timed out");
        }

        let m = self.metrics.snapshot();
        tracing::info!(
            sender = %self.name,
            sent = m.messages_sent,
            failed = m.messages_failed,
            "sender shut down"
        );
    }
}

#[async_trait]
impl LogTarget for Sender {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_routed(&self, message: SyslogMessage, route: &Route) -> Result<()> {
        if route.contains(&self.name) {
            return Err(syslane_config::ConfigError::self_delegation(&self.name).into());
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::Closed(self.name.clone()));
        }

        let message = self.chain.apply(self.stamp(message))?;
        let payload = self
            .config
            .transport
            .charset
            .encode(&message.render(self.config.format));

        match self.write_with_retry(&payload).await {
            Ok(()) => {
                self.metrics.record_sent();
                self.backlog.up(&self.name).await;
                Ok(())
            }
            Err((e @ (TransportError::PoolExhausted { .. } | TransportError::PoolClosed), _)) => {
                Err(ClientError::Transport(e))
            }
            Err((e, attempts)) => {
                self.escalate(&message, e, attempts, &route.then(&self.name))
                    .await
            }
        }
    }

    async fn shutdown(&self) {
        self.close().await;
    }
}

impl std::fmt::Debug for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("name", &self.name)
            .field("kind", &self.config.transport.kind)
            .field("target", &self.transport.target())
            .finish()
    }
}

/// Host name of this machine, `localhost` if it cannot be read
fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}
