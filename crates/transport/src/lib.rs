//! Syslane Transport
//!
//! Byte-level delivery of rendered syslog messages.
//!
//! # Transports
//!
//! | Kind | Type | Behavior |
//! |------|------|----------|
//! | `udp` | [`UdpTransport`] | One datagram per message, oversized messages split with markers |
//! | `tcp` / `tls` | [`StreamTransport`] | One persistent connection, delimiter appended per message |
//! | `tcp` / `tls` + pool | [`PooledTransport`] | Connections borrowed from a [`ConnectionPool`] |
//! | `unix` stream | [`StreamTransport`] | Same framing as TCP over a Unix socket |
//! | `unix` datagram | [`UnixDatagramTransport`] | One datagram per message |
//!
//! Stream connections are opened on first write and reopened after a failed
//! write; nothing is retried here. Retry and failure escalation belong to
//! the sender.
//!
//! The receiving side uses [`SyslogCodec`] to frame streams and
//! [`Reassembler`] to join fragmented datagrams.

mod codec;
mod connection;
mod error;
mod fragment;
mod metrics;
mod pool;
mod stream;
pub mod tls;
mod udp;
#[cfg(unix)]
mod unix;

use std::sync::Arc;

use async_trait::async_trait;
use syslane_config::{PoolConfig, SocketType, TransportConfig, TransportKind};

pub use codec::{Frame, SyslogCodec};
pub use connection::{Connection, Dialer};
pub use error::{TransportError, is_connection_reset};
pub use fragment::{Fragmenter, Reassembler};
pub use metrics::{PoolMetrics, PoolMetricsSnapshot, TransportMetrics, TransportMetricsSnapshot};
pub use pool::{ConnectionPool, EvictionReport, PooledConnection};
pub use stream::{PooledTransport, StreamTransport};
pub use udp::UdpTransport;
#[cfg(unix)]
pub use unix::UnixDatagramTransport;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// A handle that can put one rendered message on the wire
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport kind
    fn kind(&self) -> TransportKind;

    /// Where messages go, for logging
    fn target(&self) -> String;

    /// Write one message; framing and fragmentation are applied here
    async fn write(&self, payload: &[u8]) -> Result<()>;

    /// Drop any open connection so the next write reconnects
    async fn reset(&self) {}

    /// Release sockets; later writes fail with [`TransportError::Closed`]
    async fn close(&self);

    /// Counter snapshot
    fn metrics(&self) -> TransportMetricsSnapshot;
}

/// Open the transport described by `config`
///
/// UDP and Unix datagram sockets are bound here. Stream transports connect
/// lazily on their first write; `pool` selects a [`PooledTransport`] over a
/// single persistent connection.
///
/// # Errors
///
/// Fails when the target cannot be resolved, a socket cannot be bound, or
/// the configuration is unusable (TLS setup, split markers).
pub async fn open(
    name: &str,
    config: &TransportConfig,
    pool: Option<&PoolConfig>,
) -> Result<Arc<dyn Transport>> {
    let transport: Arc<dyn Transport> = match (config.kind, config.socket_type) {
        (TransportKind::Udp, _) => Arc::new(UdpTransport::bind(name, config).await?),
        #[cfg(unix)]
        (TransportKind::Unix, SocketType::Datagram) => {
            Arc::new(UnixDatagramTransport::new(name, config)?)
        }
        #[cfg(not(unix))]
        (TransportKind::Unix, _) => {
            return Err(TransportError::config(
                "unix sockets are not supported on this platform",
            ));
        }
        _ => {
            let dialer = Dialer::new(config.clone())?;
            match pool {
                Some(pool) if config.kind.is_connection_oriented() => {
                    Arc::new(PooledTransport::new(name, dialer, pool.clone()))
                }
                _ => Arc::new(StreamTransport::new(name, dialer)),
            }
        }
    };

    tracing::debug!(
        transport = %name,
        kind = %transport.kind(),
        target = %transport.target(),
        "transport opened"
    );

    Ok(transport)
}

/// Apply the truncate flag to a payload headed for a single frame
pub(crate) fn clip<'a>(config: &TransportConfig, payload: &'a [u8]) -> &'a [u8] {
    if config.truncate_message && payload.len() > config.max_message_length {
        &payload[..config.max_message_length]
    } else {
        payload
    }
}
