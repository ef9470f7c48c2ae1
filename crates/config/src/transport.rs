//! Transport configuration
//!
//! Shared by senders: where to connect, how to frame, and which socket
//! options to apply when a connection is opened.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use syslane_protocol::{Charset, DEFAULT_PORT, LINE_ENDING};

use crate::ConfigError;

/// Default Unix-domain socket path
pub const DEFAULT_UNIX_PATH: &str = "/dev/log";

/// Default split marker placed around UDP fragments
pub const DEFAULT_SPLIT_MARKER: &str = "...";

/// Default maximum message length before splitting (bytes)
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 1024;

/// Wire transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// One datagram per message (default)
    #[default]
    Udp,
    /// Delimited byte stream
    Tcp,
    /// Delimited byte stream over TLS
    Tls,
    /// Unix-domain socket (stream or datagram)
    Unix,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Tcp => "tcp",
            Self::Tls => "tls",
            Self::Unix => "unix",
        }
    }

    /// Whether writes go over a connection that may need re-establishing
    pub fn is_connection_oriented(&self) -> bool {
        matches!(self, Self::Tcp | Self::Tls)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unix-domain socket type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum SocketType {
    /// `SOCK_DGRAM` (default, what syslogd listens on)
    #[default]
    Datagram,
    /// `SOCK_STREAM`
    Stream,
}

impl SocketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Datagram => "SOCK_DGRAM",
            Self::Stream => "SOCK_STREAM",
        }
    }
}

impl FromStr for SocketType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SOCK_DGRAM" | "DGRAM" | "DATAGRAM" => Ok(Self::Datagram),
            "SOCK_STREAM" | "STREAM" => Ok(Self::Stream),
            _ => Err(ConfigError::InvalidSocketType(s.to_string())),
        }
    }
}

impl TryFrom<String> for SocketType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Unix-domain address family. `AF_UNIX` is the only one accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum SocketFamily {
    #[default]
    Unix,
}

impl FromStr for SocketFamily {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AF_UNIX" | "AF_LOCAL" => Ok(Self::Unix),
            _ => Err(ConfigError::InvalidSocketFamily(s.to_string())),
        }
    }
}

impl TryFrom<String> for SocketFamily {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Client-side TLS options
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TlsClientConfig {
    /// PEM bundle of trusted roots. Default: bundled web PKI roots
    pub ca_file: Option<PathBuf>,

    /// Name to verify the server certificate against. Default: `host`
    pub server_name: Option<String>,
}

/// Transport settings for one sender
///
/// # Example
///
/// ```toml
/// [senders.tcp]
/// kind = "tcp"
/// host = "logs.internal"
/// port = 6514
/// write_retries = 3
/// connect_timeout = "2s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Wire transport
    /// Default: udp
    pub kind: TransportKind,

    /// Remote host
    /// Default: "localhost"
    pub host: String,

    /// Remote port
    /// Default: 514
    pub port: u16,

    /// Unix-domain socket path
    /// Default: /dev/log
    pub path: PathBuf,

    /// Unix-domain socket type
    /// Default: SOCK_DGRAM
    pub socket_type: SocketType,

    /// Unix-domain address family
    /// Default: AF_UNIX
    pub socket_family: SocketFamily,

    /// Text encoding on the wire
    /// Default: UTF-8
    pub charset: Charset,

    /// Connect timeout for stream transports
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Per-write timeout
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,

    /// Extra write attempts after the first failure
    /// Default: 2
    pub write_retries: u32,

    /// Longest message sent in one piece (bytes)
    /// Default: 1024
    pub max_message_length: usize,

    /// Truncate oversized messages instead of splitting (UDP) or sending
    /// them whole (streams)
    /// Default: false
    pub truncate_message: bool,

    /// Marker prepended to continuation fragments
    /// Default: "..."
    pub split_begin: String,

    /// Marker appended to fragments that continue
    /// Default: "..."
    pub split_end: String,

    /// Frame delimiter appended after each stream message
    /// Default: platform line terminator
    pub delimiter: String,

    /// SO_KEEPALIVE on stream connections
    /// Default: true
    pub keep_alive: bool,

    /// Enable SO_LINGER on stream connections
    /// Default: true
    pub so_linger: bool,

    /// SO_LINGER duration when enabled
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub so_linger_time: Duration,

    /// SO_REUSEADDR on the local socket
    /// Default: true
    pub reuse_address: bool,

    /// TCP_NODELAY on stream connections
    /// Default: true
    pub nodelay: bool,

    /// SO_SNDBUF override (bytes)
    pub send_buffer_size: Option<usize>,

    /// TLS options (kind = "tls" only)
    pub tls: TlsClientConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Udp,
            host: "localhost".into(),
            port: DEFAULT_PORT,
            path: PathBuf::from(DEFAULT_UNIX_PATH),
            socket_type: SocketType::Datagram,
            socket_family: SocketFamily::Unix,
            charset: Charset::Utf8,
            connect_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            write_retries: 2,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            truncate_message: false,
            split_begin: DEFAULT_SPLIT_MARKER.into(),
            split_end: DEFAULT_SPLIT_MARKER.into(),
            delimiter: LINE_ENDING.into(),
            keep_alive: true,
            so_linger: true,
            so_linger_time: Duration::from_secs(1),
            reuse_address: true,
            nodelay: true,
            send_buffer_size: None,
            tls: TlsClientConfig::default(),
        }
    }
}

impl TransportConfig {
    /// UDP transport to `host:port`
    pub fn udp(host: impl Into<String>, port: u16) -> Self {
        Self {
            kind: TransportKind::Udp,
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// TCP transport to `host:port`
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self {
            kind: TransportKind::Tcp,
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// TLS transport to `host:port`
    pub fn tls(host: impl Into<String>, port: u16) -> Self {
        Self {
            kind: TransportKind::Tls,
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Unix-domain transport at `path`
    pub fn unix(path: impl Into<PathBuf>, socket_type: SocketType) -> Self {
        Self {
            kind: TransportKind::Unix,
            path: path.into(),
            socket_type,
            ..Self::default()
        }
    }

    /// `host:port` for stream and datagram connects
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn with_write_retries(mut self, retries: u32) -> Self {
        self.write_retries = retries;
        self
    }

    #[must_use]
    pub fn with_max_message_length(mut self, len: usize) -> Self {
        self.max_message_length = len;
        self
    }

    #[must_use]
    pub fn with_split_markers(mut self, begin: impl Into<String>, end: impl Into<String>) -> Self {
        self.split_begin = begin.into();
        self.split_end = end.into();
        self
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    #[must_use]
    pub fn with_tls(mut self, tls: TlsClientConfig) -> Self {
        self.tls = tls;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.kind, TransportKind::Udp);
        assert_eq!(config.port, 514);
        assert_eq!(config.write_retries, 2);
        assert_eq!(config.max_message_length, 1024);
        assert_eq!(config.split_begin, "...");
        assert_eq!(config.split_end, "...");
        assert_eq!(config.delimiter, LINE_ENDING);
        assert!(config.keep_alive);
        assert!(config.so_linger);
        assert!(config.reuse_address);
        assert_eq!(config.path, PathBuf::from("/dev/log"));
    }

    #[test]
    fn test_socket_type_parse() {
        assert_eq!("SOCK_DGRAM".parse::<SocketType>().unwrap(), SocketType::Datagram);
        assert_eq!("sock_stream".parse::<SocketType>().unwrap(), SocketType::Stream);
        assert!(matches!(
            "FOO".parse::<SocketType>(),
            Err(ConfigError::InvalidSocketType(s)) if s == "FOO"
        ));
    }

    #[test]
    fn test_socket_family_parse() {
        assert_eq!("AF_UNIX".parse::<SocketFamily>().unwrap(), SocketFamily::Unix);
        assert!(matches!(
            "AF_INET".parse::<SocketFamily>(),
            Err(ConfigError::InvalidSocketFamily(_))
        ));
    }

    #[test]
    fn test_deserialize_unix() {
        let toml = r#"
kind = "unix"
path = "/tmp/log.sock"
socket_type = "SOCK_STREAM"
socket_family = "AF_UNIX"
"#;
        let config: TransportConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.kind, TransportKind::Unix);
        assert_eq!(config.socket_type, SocketType::Stream);
        assert_eq!(config.path, PathBuf::from("/tmp/log.sock"));
    }

    #[test]
    fn test_deserialize_rejects_bad_socket_type() {
        let toml = r#"
kind = "unix"
socket_type = "SOCK_RAW"
"#;
        assert!(toml::from_str::<TransportConfig>(toml).is_err());
    }

    #[test]
    fn test_deserialize_durations() {
        let toml = r#"
kind = "tcp"
connect_timeout = "250ms"
so_linger_time = "3s"
"#;
        let config: TransportConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.so_linger_time, Duration::from_secs(3));
    }

    #[test]
    fn test_connection_oriented() {
        assert!(TransportKind::Tcp.is_connection_oriented());
        assert!(TransportKind::Tls.is_connection_oriented());
        assert!(!TransportKind::Udp.is_connection_oriented());
        assert!(!TransportKind::Unix.is_connection_oriented());
    }
}
