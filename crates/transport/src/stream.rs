//! Stream transports (TCP, TLS, Unix stream)
//!
//! [`StreamTransport`] keeps one persistent connection behind a lock,
//! opening it on demand and dropping it after any failed write so the next
//! write reconnects. [`PooledTransport`] borrows a connection per write from
//! a [`ConnectionPool`] instead.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use syslane_config::{PoolConfig, TransportConfig, TransportKind};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::{
    Connection, ConnectionPool, Dialer, PoolMetricsSnapshot, Result, SyslogCodec, Transport,
    TransportError, TransportMetrics, TransportMetricsSnapshot, clip, is_connection_reset,
};

#[cfg(test)]
#[path = "stream_test.rs"]
mod tests;

fn codec(config: &TransportConfig) -> SyslogCodec {
    SyslogCodec::new(config.delimiter.as_bytes(), config.max_message_length)
}

// =============================================================================
// Single connection
// =============================================================================

/// Stream transport over one persistent connection
pub struct StreamTransport {
    name: String,
    dialer: Dialer,
    codec: SyslogCodec,
    connection: Mutex<Option<Connection>>,
    closed: AtomicBool,
    metrics: TransportMetrics,
}

impl StreamTransport {
    /// Create the transport; nothing is connected yet
    pub fn new(name: impl Into<String>, dialer: Dialer) -> Self {
        let codec = codec(dialer.config());
        Self {
            name: name.into(),
            dialer,
            codec,
            connection: Mutex::new(None),
            closed: AtomicBool::new(false),
            metrics: TransportMetrics::new(),
        }
    }

    /// Open the connection now instead of on first write
    pub async fn connect(&self) -> Result<()> {
        let mut conn = self.connection.lock().await;
        if conn.is_none() {
            *conn = Some(self.dial().await?);
        }
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    async fn dial(&self) -> Result<Connection> {
        let conn = self.dialer.dial().await?;
        self.metrics.record_connect();
        tracing::debug!(
            transport = %self.name,
            target = %self.dialer.target(),
            "connection opened"
        );
        Ok(conn)
    }
}

#[async_trait]
impl Transport for StreamTransport {
    fn kind(&self) -> TransportKind {
        self.dialer.config().kind
    }

    fn target(&self) -> String {
        self.dialer.target()
    }

    async fn write(&self, payload: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        let frame = self.codec.frame(clip(self.dialer.config(), payload));
        let write_timeout = self.dialer.config().write_timeout;

        let mut conn = self.connection.lock().await;
        if conn.is_none() {
            *conn = Some(self.dial().await?);
        }
        let Some(stream) = conn.as_mut() else {
            return Err(TransportError::Closed);
        };

        match timeout(write_timeout, stream.write_frame(&frame)).await {
            Ok(Ok(())) => {
                self.metrics.record_sent(frame.len());
                Ok(())
            }
            Ok(Err(e)) => {
                // Connection error - invalidate connection
                *conn = None;
                self.metrics.record_error();
                if is_connection_reset(&e) {
                    tracing::debug!(transport = %self.name, "connection reset by peer");
                }
                Err(TransportError::WriteFailed(e))
            }
            Err(_) => {
                // Timeout - invalidate connection
                *conn = None;
                self.metrics.record_error();
                Err(TransportError::Timeout(write_timeout))
            }
        }
    }

    async fn reset(&self) {
        let mut conn = self.connection.lock().await;
        if let Some(mut stream) = conn.take() {
            stream.shutdown().await;
            tracing::debug!(transport = %self.name, "connection reset");
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.reset().await;
    }

    fn metrics(&self) -> TransportMetricsSnapshot {
        self.metrics.snapshot()
    }
}

// =============================================================================
// Pooled
// =============================================================================

/// Stream transport borrowing connections from a pool
pub struct PooledTransport {
    name: String,
    codec: SyslogCodec,
    config: TransportConfig,
    pool: ConnectionPool,
    metrics: TransportMetrics,
}

impl PooledTransport {
    pub fn new(name: impl Into<String>, dialer: Dialer, pool: PoolConfig) -> Self {
        let name = name.into();
        let config = dialer.config().clone();
        Self {
            codec: codec(&config),
            pool: ConnectionPool::new(name.clone(), dialer, pool),
            name,
            config,
            metrics: TransportMetrics::new(),
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn pool_metrics(&self) -> PoolMetricsSnapshot {
        self.pool.metrics()
    }
}

#[async_trait]
impl Transport for PooledTransport {
    fn kind(&self) -> TransportKind {
        self.config.kind
    }

    fn target(&self) -> String {
        match self.config.kind {
            TransportKind::Unix => self.config.path.display().to_string(),
            _ => self.config.address(),
        }
    }

    async fn write(&self, payload: &[u8]) -> Result<()> {
        if self.pool.is_closed() {
            return Err(TransportError::Closed);
        }

        let frame = self.codec.frame(clip(&self.config, payload));
        let mut conn = self.pool.acquire().await?;

        match timeout(self.config.write_timeout, conn.write_frame(&frame)).await {
            Ok(Ok(())) => {
                self.metrics.record_sent(frame.len());
                Ok(())
            }
            Ok(Err(e)) => {
                conn.invalidate();
                self.metrics.record_error();
                Err(TransportError::WriteFailed(e))
            }
            Err(_) => {
                conn.invalidate();
                self.metrics.record_error();
                Err(TransportError::Timeout(self.config.write_timeout))
            }
        }
    }

    async fn reset(&self) {
        let cleared = self.pool.clear_idle();
        if cleared > 0 {
            tracing::debug!(transport = %self.name, cleared, "dropped idle pooled connections");
        }
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn metrics(&self) -> TransportMetricsSnapshot {
        TransportMetricsSnapshot {
            connects: self.pool.metrics().created,
            ..self.metrics.snapshot()
        }
    }
}
