//! Stream connections
//!
//! [`Dialer`] turns a `TransportConfig` into open connections, applying the
//! configured socket options, and [`Connection`] is the resulting stream,
//! whichever of TCP, TLS or Unix it runs over.

use std::io::{self, ErrorKind};
use std::mem::MaybeUninit;
use std::net::SocketAddr;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use syslane_config::{TransportConfig, TransportKind};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;

#[cfg(unix)]
use tokio::net::UnixStream;

use crate::{Result, TransportError, tls};

/// Keep-alive probe interval once enabled
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// An open stream to a syslog receiver
pub enum Connection {
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Connection {
    /// Write one already-framed message and flush
    pub async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        match self {
            Self::Tcp(s) => write_flush(s, frame).await,
            Self::Tls(s) => write_flush(s.as_mut(), frame).await,
            #[cfg(unix)]
            Self::Unix(s) => write_flush(s, frame).await,
        }
    }

    /// Non-consuming liveness probe
    ///
    /// Peeks at the socket without blocking: nothing to read means the peer
    /// is still there, EOF or a reset means it is gone. Nothing is written
    /// onto the stream.
    pub fn is_alive(&self) -> bool {
        let sock = match self {
            Self::Tcp(s) => SockRef::from(s),
            Self::Tls(s) => SockRef::from(s.get_ref().0),
            #[cfg(unix)]
            Self::Unix(s) => SockRef::from(s),
        };

        let mut buf = [MaybeUninit::<u8>::uninit(); 1];
        match sock.peek(&mut buf) {
            Ok(0) => false,
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::WouldBlock => true,
            Err(e) if e.kind() == ErrorKind::Interrupted => true,
            Err(_) => false,
        }
    }

    /// Graceful close (sends TLS close_notify)
    pub async fn shutdown(&mut self) {
        let result = match self {
            Self::Tcp(s) => s.shutdown().await,
            Self::Tls(s) => s.shutdown().await,
            #[cfg(unix)]
            Self::Unix(s) => s.shutdown().await,
        };
        if let Err(e) = result {
            tracing::trace!(error = %e, "error closing connection");
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Tcp(_) => TransportKind::Tcp,
            Self::Tls(_) => TransportKind::Tls,
            #[cfg(unix)]
            Self::Unix(_) => TransportKind::Unix,
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let peer = match self {
            Self::Tcp(s) => s.peer_addr().ok().map(|a| a.to_string()),
            Self::Tls(s) => s.get_ref().0.peer_addr().ok().map(|a| a.to_string()),
            #[cfg(unix)]
            Self::Unix(s) => s
                .peer_addr()
                .ok()
                .and_then(|a| a.as_pathname().map(|p| p.display().to_string())),
        };
        f.debug_struct("Connection")
            .field("kind", &self.kind())
            .field("peer", &peer)
            .finish()
    }
}

async fn write_flush<W: AsyncWrite + Unpin + ?Sized>(w: &mut W, frame: &[u8]) -> io::Result<()> {
    w.write_all(frame).await?;
    w.flush().await
}

/// Opens stream connections for one transport configuration
#[derive(Clone)]
pub struct Dialer {
    config: TransportConfig,
    tls: Option<(TlsConnector, ServerName<'static>)>,
}

impl Dialer {
    /// Create a dialer
    ///
    /// # Errors
    ///
    /// Returns an error for datagram-only kinds or a bad TLS setup.
    pub fn new(config: TransportConfig) -> Result<Self> {
        let tls = match config.kind {
            TransportKind::Tcp => None,
            TransportKind::Tls => {
                let connector = tls::client_connector(&config.tls)?;
                let name = tls::server_name(&config.host, &config.tls)?;
                Some((connector, name))
            }
            TransportKind::Unix if config.socket_type == syslane_config::SocketType::Stream => None,
            kind => {
                return Err(TransportError::config(format!(
                    "{kind} with {} is not a stream transport",
                    config.socket_type.as_str()
                )));
            }
        };

        Ok(Self { config, tls })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Human-readable target
    pub fn target(&self) -> String {
        match self.config.kind {
            TransportKind::Unix => self.config.path.display().to_string(),
            _ => self.config.address(),
        }
    }

    /// Open a new connection, bounded by `connect_timeout`
    pub async fn dial(&self) -> Result<Connection> {
        match self.config.kind {
            #[cfg(unix)]
            TransportKind::Unix => self.dial_unix().await,
            #[cfg(not(unix))]
            TransportKind::Unix => Err(TransportError::config(
                "unix sockets are not supported on this platform",
            )),
            _ => {
                let stream = self.dial_tcp().await?;
                match &self.tls {
                    Some((connector, name)) => self.handshake(connector, name, stream).await,
                    None => Ok(Connection::Tcp(stream)),
                }
            }
        }
    }

    async fn resolve(&self) -> Result<SocketAddr> {
        let target = self.config.address();
        let mut addrs = tokio::net::lookup_host(&target)
            .await
            .map_err(|e| TransportError::connection_failed(&target, e))?;
        addrs.next().ok_or_else(|| {
            TransportError::connection_failed(
                &target,
                io::Error::new(ErrorKind::NotFound, "no addresses resolved"),
            )
        })
    }

    async fn dial_tcp(&self) -> Result<TcpStream> {
        let target = self.target();
        let addr = self.resolve().await?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(|e| TransportError::connection_failed(&target, e))?;

        // Must precede connect
        if self.config.reuse_address
            && let Err(e) = socket.set_reuseaddr(true)
        {
            tracing::debug!(target = %target, error = %e, "failed to set SO_REUSEADDR");
        }
        if let Some(size) = self.config.send_buffer_size
            && let Err(e) = socket.set_send_buffer_size(size.min(u32::MAX as usize) as u32)
        {
            tracing::debug!(target = %target, error = %e, "failed to set send buffer size");
        }

        let stream = match timeout(self.config.connect_timeout, socket.connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(TransportError::connection_failed(target, e)),
            Err(_) => {
                return Err(TransportError::connection_failed(
                    target,
                    io::Error::new(ErrorKind::TimedOut, "connection timed out"),
                ));
            }
        };

        self.configure_socket(&stream);

        tracing::debug!(target = %target, "connected to target");
        Ok(stream)
    }

    fn configure_socket(&self, stream: &TcpStream) {
        if self.config.nodelay
            && let Err(e) = stream.set_nodelay(true)
        {
            tracing::debug!(
                error = %e,
                "failed to set TCP_NODELAY, continuing with default buffering"
            );
        }

        let sock_ref = SockRef::from(stream);

        if self.config.keep_alive {
            let keepalive = TcpKeepalive::new().with_time(KEEPALIVE_INTERVAL);

            #[cfg(target_os = "linux")]
            let keepalive = keepalive.with_interval(KEEPALIVE_INTERVAL);

            if let Err(e) = sock_ref.set_tcp_keepalive(&keepalive) {
                tracing::debug!(
                    error = %e,
                    "failed to set TCP keep-alive, continuing without keep-alive"
                );
            }
        }

        if self.config.so_linger
            && let Err(e) = sock_ref.set_linger(Some(self.config.so_linger_time))
        {
            tracing::debug!(error = %e, "failed to set SO_LINGER");
        }
    }

    async fn handshake(
        &self,
        connector: &TlsConnector,
        name: &ServerName<'static>,
        stream: TcpStream,
    ) -> Result<Connection> {
        match timeout(
            self.config.connect_timeout,
            connector.connect(name.clone(), stream),
        )
        .await
        {
            Ok(Ok(tls)) => Ok(Connection::Tls(Box::new(tls))),
            Ok(Err(e)) => Err(TransportError::tls(format!(
                "handshake with {} failed: {e}",
                self.target()
            ))),
            Err(_) => Err(TransportError::Timeout(self.config.connect_timeout)),
        }
    }

    #[cfg(unix)]
    async fn dial_unix(&self) -> Result<Connection> {
        let target = self.target();
        match timeout(
            self.config.connect_timeout,
            UnixStream::connect(&self.config.path),
        )
        .await
        {
            Ok(Ok(stream)) => {
                tracing::debug!(target = %target, "connected to unix socket");
                Ok(Connection::Unix(stream))
            }
            Ok(Err(e)) => Err(TransportError::connection_failed(target, e)),
            Err(_) => Err(TransportError::connection_failed(
                target,
                io::Error::new(ErrorKind::TimedOut, "connection timed out"),
            )),
        }
    }
}

impl std::fmt::Debug for Dialer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dialer")
            .field("kind", &self.config.kind)
            .field("target", &self.target())
            .finish()
    }
}
