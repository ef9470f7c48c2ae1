//! Transport error types

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors from opening, writing to, or pooling transports
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not resolve or connect to the target
    #[error("connection failed to {target}: {source}")]
    ConnectionFailed {
        target: String,
        #[source]
        source: io::Error,
    },

    /// Write to an open connection or socket failed
    #[error("write failed: {0}")]
    WriteFailed(#[from] io::Error),

    /// Connect, handshake or write exceeded its deadline
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// TLS setup or handshake failure
    #[error("tls error: {0}")]
    Tls(String),

    /// No pooled connection became available within `max_wait`
    #[error("connection pool exhausted after waiting {waited:?}")]
    PoolExhausted { waited: Duration },

    /// Pool was closed while acquiring
    #[error("connection pool closed")]
    PoolClosed,

    /// Transport was closed
    #[error("transport closed")]
    Closed,

    /// Configuration cannot be turned into a transport
    #[error("invalid transport configuration: {0}")]
    Config(String),
}

impl TransportError {
    /// Create a connection error
    pub fn connection_failed(target: impl Into<String>, source: io::Error) -> Self {
        Self::ConnectionFailed {
            target: target.into(),
            source,
        }
    }

    /// Create a TLS error
    pub fn tls(msg: impl ToString) -> Self {
        Self::Tls(msg.to_string())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the failure came from the peer or network rather than from
    /// configuration
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::WriteFailed(_) | Self::Timeout(_) | Self::Tls(_)
        )
    }
}

/// Peer went away under us
pub fn is_connection_reset(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe
    )
}
