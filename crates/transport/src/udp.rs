//! UDP transport
//!
//! Binds an ephemeral local socket and sends each message to the target with
//! `send_to`; the socket is never connected. Messages above
//! `max_message_length` are split into marker-wrapped fragments unless
//! `truncate_message` is set, in which case they are cut to the limit.

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
use socket2::SockRef;
use syslane_config::{TransportConfig, TransportKind};
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::{
    Fragmenter, Result, Transport, TransportError, TransportMetrics, TransportMetricsSnapshot,
    clip,
};

/// Datagram transport over UDP
pub struct UdpTransport {
    name: String,
    socket: UdpSocket,
    target: SocketAddr,
    config: TransportConfig,
    fragmenter: Option<Fragmenter>,
    metrics: TransportMetrics,
}

impl UdpTransport {
    /// Resolve the target and bind a local socket
    pub async fn bind(name: &str, config: &TransportConfig) -> Result<Self> {
        let address = config.address();
        let target = tokio::net::lookup_host(&address)
            .await
            .map_err(|e| TransportError::connection_failed(&address, e))?
            .next()
            .ok_or_else(|| {
                TransportError::connection_failed(
                    &address,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses resolved"),
                )
            })?;

        let local = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| TransportError::connection_failed(&address, e))?;

        if let Some(size) = config.send_buffer_size
            && let Err(e) = SockRef::from(&socket).set_send_buffer_size(size)
        {
            tracing::debug!(transport = %name, error = %e, "failed to set send buffer size");
        }

        let fragmenter = if config.truncate_message {
            None
        } else {
            Some(Fragmenter::new(
                config.max_message_length,
                config.split_begin.as_bytes(),
                config.split_end.as_bytes(),
            )?)
        };

        Ok(Self {
            name: name.to_string(),
            socket,
            target,
            config: config.clone(),
            fragmenter,
            metrics: TransportMetrics::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    fn datagrams(&self, payload: &[u8]) -> Vec<Bytes> {
        match &self.fragmenter {
            Some(f) => f.split(payload),
            None => vec![Bytes::copy_from_slice(clip(&self.config, payload))],
        }
    }

    async fn send(&self, datagram: &[u8]) -> Result<()> {
        match timeout(
            self.config.write_timeout,
            self.socket.send_to(datagram, self.target),
        )
        .await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(TransportError::WriteFailed(e)),
            Err(_) => Err(TransportError::Timeout(self.config.write_timeout)),
        }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Udp
    }

    fn target(&self) -> String {
        self.target.to_string()
    }

    async fn write(&self, payload: &[u8]) -> Result<()> {
        let datagrams = self.datagrams(payload);
        if datagrams.len() > 1 {
            tracing::trace!(
                transport = %self.name,
                size = payload.len(),
                fragments = datagrams.len(),
                "splitting oversized message"
            );
            self.metrics.record_fragments(datagrams.len());
        }

        let mut bytes = 0;
        for datagram in &datagrams {
            if let Err(e) = self.send(datagram).await {
                self.metrics.record_error();
                return Err(e);
            }
            bytes += datagram.len();
        }

        self.metrics.record_sent(bytes);
        Ok(())
    }

    async fn close(&self) {}

    fn metrics(&self) -> TransportMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reassembler;

    async fn receiver() -> (UdpSocket, u16) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        (socket, port)
    }

    #[tokio::test]
    async fn test_single_datagram() {
        let (rx, port) = receiver().await;
        let transport = UdpTransport::bind("udp", &TransportConfig::udp("127.0.0.1", port))
            .await
            .unwrap();

        transport.write(b"<13>hello").await.unwrap();

        let mut buf = [0u8; 64];
        let (n, from) = rx.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"<13>hello");
        assert_eq!(from.port(), transport.local_addr().unwrap().port());
        assert_eq!(transport.metrics().messages_sent, 1);
    }

    #[tokio::test]
    async fn test_oversized_message_is_fragmented() {
        let (rx, port) = receiver().await;
        let config = TransportConfig::udp("127.0.0.1", port).with_max_message_length(16);
        let transport = UdpTransport::bind("udp", &config).await.unwrap();

        let payload = b"<13>a long message that spans fragments";
        transport.write(payload).await.unwrap();

        let mut r = Reassembler::new(b"...", b"...", 1024);
        let mut buf = [0u8; 64];
        let mut out = Vec::new();
        while out.is_empty() {
            let (n, from) = rx.recv_from(&mut buf).await.unwrap();
            assert!(n <= 16);
            out.extend(r.push(&from, &buf[..n]));
        }
        assert_eq!(&out[0][..], &payload[..]);
        assert!(transport.metrics().fragments_sent >= 3);
    }

    #[tokio::test]
    async fn test_truncate_instead_of_split() {
        let (rx, port) = receiver().await;
        let mut config = TransportConfig::udp("127.0.0.1", port).with_max_message_length(8);
        config.truncate_message = true;
        let transport = UdpTransport::bind("udp", &config).await.unwrap();

        transport.write(b"0123456789").await.unwrap();

        let mut buf = [0u8; 64];
        let (n, _) = rx.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"01234567");
    }

    #[tokio::test]
    async fn test_bind_rejects_unusable_markers() {
        let config = TransportConfig::udp("127.0.0.1", 514).with_max_message_length(4);
        assert!(matches!(
            UdpTransport::bind("udp", &config).await,
            Err(TransportError::Config(_))
        ));
    }
}
