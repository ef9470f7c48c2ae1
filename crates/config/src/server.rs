//! Server (receiver) configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use syslane_protocol::{Charset, DEFAULT_PORT, LINE_ENDING};

use crate::transport::{DEFAULT_SPLIT_MARKER, DEFAULT_UNIX_PATH, SocketType, TransportKind};

/// What the accept loop does once `max_active_sessions` is reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Close new connections without reading
    #[default]
    Reject,
    /// Hold the accept loop until a session ends, bounded by `block_timeout`
    Block,
}

/// Server certificate for `kind = "tls"`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TlsServerConfig {
    /// PEM certificate chain
    pub cert_file: PathBuf,
    /// PEM private key
    pub key_file: PathBuf,
}

/// One listening server instance
///
/// # Example
///
/// ```toml
/// [servers.tcp]
/// kind = "tcp"
/// port = 1514
/// max_active_sessions = 100
/// overflow = "reject"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen transport
    /// Default: udp
    pub kind: TransportKind,

    /// Bind address
    /// Default: "0.0.0.0"
    pub host: String,

    /// Listen port
    /// Default: 514
    pub port: u16,

    /// Unix-domain socket path
    /// Default: /dev/log
    pub path: PathBuf,

    /// Unix-domain socket type
    /// Default: SOCK_DGRAM
    pub socket_type: SocketType,

    /// Text encoding of inbound frames
    /// Default: UTF-8
    pub charset: Charset,

    /// Stream frame delimiter
    /// Default: platform line terminator
    pub delimiter: String,

    /// Frames longer than this are discarded (bytes)
    /// Default: 8192
    pub max_frame_size: usize,

    /// Marker on fragments that continue a previous datagram
    /// Default: "..."
    pub split_begin: String,

    /// Marker on fragments that are continued by the next datagram
    /// Default: "..."
    pub split_end: String,

    /// Listen queue depth
    /// Default: 50
    pub backlog: u32,

    /// Concurrent sessions allowed (0 = unlimited)
    /// Default: 0
    pub max_active_sessions: usize,

    /// Admission policy once the session limit is reached
    /// Default: reject
    pub overflow: OverflowPolicy,

    /// Longest a blocked accept waits for a free slot
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub block_timeout: Duration,

    /// How long shutdown waits for sessions before force-closing them
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub shutdown_wait: Duration,

    /// Close sessions idle for this long (zero disables)
    /// Default: 0
    #[serde(with = "humantime_serde")]
    pub session_timeout: Duration,

    /// SO_KEEPALIVE on accepted connections
    /// Default: true
    pub keep_alive: bool,

    /// SO_REUSEADDR on the listener
    /// Default: true
    pub reuse_address: bool,

    /// Certificate and key (kind = "tls" only)
    pub tls: Option<TlsServerConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Udp,
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            path: PathBuf::from(DEFAULT_UNIX_PATH),
            socket_type: SocketType::Datagram,
            charset: Charset::Utf8,
            delimiter: LINE_ENDING.into(),
            max_frame_size: 8192,
            split_begin: DEFAULT_SPLIT_MARKER.into(),
            split_end: DEFAULT_SPLIT_MARKER.into(),
            backlog: 50,
            max_active_sessions: 0,
            overflow: OverflowPolicy::Reject,
            block_timeout: Duration::from_secs(10),
            shutdown_wait: Duration::from_secs(5),
            session_timeout: Duration::ZERO,
            keep_alive: true,
            reuse_address: true,
            tls: None,
        }
    }
}

impl ServerConfig {
    /// Server of `kind` listening on `host:port`
    pub fn new(kind: TransportKind, host: impl Into<String>, port: u16) -> Self {
        Self {
            kind,
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Unix-domain server bound at `path`
    pub fn unix(path: impl Into<PathBuf>, socket_type: SocketType) -> Self {
        Self {
            kind: TransportKind::Unix,
            path: path.into(),
            socket_type,
            ..Self::default()
        }
    }

    /// `host:port` to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn with_admission(mut self, max_active_sessions: usize, overflow: OverflowPolicy) -> Self {
        self.max_active_sessions = max_active_sessions;
        self.overflow = overflow;
        self
    }

    #[must_use]
    pub fn with_block_timeout(mut self, timeout: Duration) -> Self {
        self.block_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_shutdown_wait(mut self, wait: Duration) -> Self {
        self.shutdown_wait = wait;
        self
    }

    #[must_use]
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    #[must_use]
    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    #[must_use]
    pub fn with_tls(mut self, tls: TlsServerConfig) -> Self {
        self.tls = Some(tls);
        self
    }
}
