//! Unix datagram transport
//!
//! `SOCK_DGRAM` senders write one datagram per message to the socket path,
//! the way local syslog daemons listening on `/dev/log` expect. Stream-type
//! Unix sockets go through [`StreamTransport`](crate::StreamTransport).

use std::path::PathBuf;

use async_trait::async_trait;
use syslane_config::{TransportConfig, TransportKind};
use tokio::net::UnixDatagram;
use tokio::time::timeout;

use crate::{Result, Transport, TransportError, TransportMetrics, TransportMetricsSnapshot, clip};

/// Datagram transport over a Unix socket path
pub struct UnixDatagramTransport {
    name: String,
    socket: UnixDatagram,
    path: PathBuf,
    config: TransportConfig,
    metrics: TransportMetrics,
}

impl UnixDatagramTransport {
    /// Create an unbound datagram socket aimed at `config.path`
    pub fn new(name: &str, config: &TransportConfig) -> Result<Self> {
        let socket = UnixDatagram::unbound()
            .map_err(|e| TransportError::connection_failed(config.path.display().to_string(), e))?;

        Ok(Self {
            name: name.to_string(),
            socket,
            path: config.path.clone(),
            config: config.clone(),
            metrics: TransportMetrics::new(),
        })
    }
}

#[async_trait]
impl Transport for UnixDatagramTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Unix
    }

    fn target(&self) -> String {
        self.path.display().to_string()
    }

    async fn write(&self, payload: &[u8]) -> Result<()> {
        let datagram = clip(&self.config, payload);

        let result = match timeout(
            self.config.write_timeout,
            self.socket.send_to(datagram, &self.path),
        )
        .await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(TransportError::WriteFailed(e)),
            Err(_) => Err(TransportError::Timeout(self.config.write_timeout)),
        };

        match result {
            Ok(()) => self.metrics.record_sent(datagram.len()),
            Err(ref e) => {
                self.metrics.record_error();
                tracing::debug!(transport = %self.name, error = %e, "unix datagram send failed");
            }
        }
        result
    }

    async fn close(&self) {}

    fn metrics(&self) -> TransportMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syslane_config::SocketType;

    #[tokio::test]
    async fn test_send_to_bound_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.sock");
        let rx = UnixDatagram::bind(&path).unwrap();

        let config = TransportConfig::unix(&path, SocketType::Datagram);
        let transport = UnixDatagramTransport::new("local", &config).unwrap();
        transport.write(b"<13>local message").await.unwrap();

        let mut buf = [0u8; 64];
        let n = rx.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"<13>local message");
        assert_eq!(transport.target(), path.display().to_string());
    }

    #[tokio::test]
    async fn test_missing_socket_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = TransportConfig::unix(dir.path().join("absent.sock"), SocketType::Datagram);
        let transport = UnixDatagramTransport::new("local", &config).unwrap();

        assert!(matches!(
            transport.write(b"x").await,
            Err(TransportError::WriteFailed(_))
        ));
        assert_eq!(transport.metrics().write_errors, 1);
    }
}
