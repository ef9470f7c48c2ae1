//! Server dispatcher - one listening protocol instance
//!
//! # Lifecycle
//!
//! ```text
//! Stopped ──start()──→ Running ──shutdown()──→ ShuttingDown ──→ Stopped
//! ```
//!
//! `start` binds the socket, runs `initialize` on every handler, and spawns
//! the accept loop (streams) or receive loop (datagrams). Each accepted
//! connection passes admission control and then gets its own session task.
//!
//! `shutdown` stops accepting, signals every session, waits up to
//! `shutdown_wait` for them to finish, aborts the rest, then runs `destroy`
//! on every handler.

use std::fmt;
use std::net::SocketAddr;
#[cfg(unix)]
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use syslane_config::{ServerConfig, SocketType, TransportKind, validate_server};
use syslane_transport::Reassembler;
use tokio::net::{TcpListener, TcpSocket, TcpStream, UdpSocket};
use tokio::task::{JoinHandle, JoinSet};
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;

use crate::admission::{Admission, SessionPermit};
use crate::session::{self, SessionContext};
use crate::{
    EventHandler, HandlerSet, Result, ServerError, ServerMetrics, ServerMetricsSnapshot,
};

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod tests;

/// TLS handshakes taking longer than this are dropped
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after a failed accept (e.g. out of file descriptors)
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Dispatcher lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Running,
    ShuttingDown,
}

impl ServerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::ShuttingDown => "shutting down",
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tasks and resources of a started server
struct Running {
    cancel: CancellationToken,
    listener_task: JoinHandle<()>,
    sessions: Arc<Mutex<JoinSet<()>>>,
    #[cfg(unix)]
    socket_path: Option<PathBuf>,
}

/// A named syslog server
pub struct ServerDispatcher {
    name: String,
    config: ServerConfig,
    handlers: HandlerSet,
    metrics: Arc<ServerMetrics>,
    state: Mutex<ServerState>,
    local_addr: Mutex<Option<SocketAddr>>,
    running: tokio::sync::Mutex<Option<Running>>,
}

impl ServerDispatcher {
    /// Create a stopped server
    pub fn new(name: impl Into<String>, config: ServerConfig) -> Result<Self> {
        let name = name.into();
        validate_server(&name, &config)?;

        Ok(Self {
            name,
            config,
            handlers: HandlerSet::new(),
            metrics: Arc::new(ServerMetrics::new()),
            state: Mutex::new(ServerState::Stopped),
            local_addr: Mutex::new(None),
            running: tokio::sync::Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ServerState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    /// Handlers, in delivery order
    pub fn handlers(&self) -> &HandlerSet {
        &self.handlers
    }

    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.add(handler);
    }

    pub fn metrics(&self) -> ServerMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Bound address of a running UDP, TCP or TLS server
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// Bind and start serving
    ///
    /// # Errors
    ///
    /// [`ServerError::InvalidState`] unless stopped; bind and TLS setup
    /// failures.
    pub async fn start(&self) -> Result<()> {
        let mut running = self.running.lock().await;
        let state = self.state();
        if state != ServerState::Stopped {
            return Err(ServerError::invalid_state(&self.name, state));
        }

        let bound = self.bind().await?;
        let local_addr = bound.local_addr();

        self.handlers.initialize(&self.name, &self.metrics).await;

        let ctx = Arc::new(SessionContext::new(
            &self.name,
            self.handlers.clone(),
            Arc::clone(&self.metrics),
            &self.config,
        ));
        let cancel = CancellationToken::new();
        let sessions = Arc::new(Mutex::new(JoinSet::new()));
        #[cfg(unix)]
        let socket_path = bound.socket_path();

        let listener_task = match bound {
            Bound::Udp(socket) => {
                let reassembler = Reassembler::new(
                    self.config.split_begin.as_bytes(),
                    self.config.split_end.as_bytes(),
                    self.config.max_frame_size,
                );
                tokio::spawn(session::run_udp(ctx, socket, reassembler, cancel.clone()))
            }
            #[cfg(unix)]
            Bound::UnixDatagram(socket, _) => {
                tokio::spawn(session::run_unix_datagram(ctx, socket, cancel.clone()))
            }
            Bound::Tcp(listener, tls) => {
                let accept = self.accept_loop(ctx, tls, &sessions, &cancel);
                tokio::spawn(accept.run(Listener::Tcp(listener)))
            }
            #[cfg(unix)]
            Bound::UnixStream(listener, _) => {
                let accept = self.accept_loop(ctx, None, &sessions, &cancel);
                tokio::spawn(accept.run(Listener::Unix(listener)))
            }
        };

        *self.local_addr.lock() = local_addr;
        *self.state.lock() = ServerState::Running;
        *running = Some(Running {
            cancel,
            listener_task,
            sessions,
            #[cfg(unix)]
            socket_path,
        });

        tracing::info!(
            server = %self.name,
            kind = %self.config.kind,
            address = %self.display_address(),
            max_sessions = self.config.max_active_sessions,
            overflow = ?self.config.overflow,
            "syslog server listening"
        );
        Ok(())
    }

    /// Stop accepting, let sessions finish, then release the socket
    ///
    /// Does nothing when not running. Socket cleanup failures are logged.
    pub async fn shutdown(&self) {
        let mut running = self.running.lock().await;
        let Some(run) = running.take() else {
            return;
        };

        *self.state.lock() = ServerState::ShuttingDown;
        tracing::info!(server = %self.name, "syslog server shutting down");

        run.cancel.cancel();
        if let Err(e) = run.listener_task.await
            && e.is_panic()
        {
            tracing::error!(server = %self.name, "listener task panicked");
        }

        let mut sessions = std::mem::take(&mut *run.sessions.lock());
        let drained = tokio::time::timeout(self.config.shutdown_wait, async {
            while sessions.join_next().await.is_some() {}
        })
        .await
        .is_ok();

        if !drained {
            tracing::warn!(
                server = %self.name,
                stragglers = sessions.len(),
                waited = ?self.config.shutdown_wait,
                "shutdown wait elapsed, closing remaining sessions"
            );
            sessions.shutdown().await;
        }

        #[cfg(unix)]
        if let Some(path) = run.socket_path
            && let Err(e) = std::fs::remove_file(&path)
        {
            tracing::warn!(
                server = %self.name,
                path = %path.display(),
                error = %e,
                "failed to remove socket file"
            );
        }

        self.handlers.destroy(&self.name, &self.metrics).await;
        *self.local_addr.lock() = None;
        *self.state.lock() = ServerState::Stopped;

        let m = self.metrics.snapshot();
        tracing::info!(
            server = %self.name,
            sessions = m.sessions_opened,
            rejected = m.sessions_rejected,
            frames = m.frames_received,
            "syslog server stopped"
        );
    }

    fn accept_loop(
        &self,
        ctx: Arc<SessionContext>,
        tls: Option<TlsAcceptor>,
        sessions: &Arc<Mutex<JoinSet<()>>>,
        cancel: &CancellationToken,
    ) -> AcceptLoop {
        AcceptLoop {
            ctx,
            admission: Admission::new(
                self.config.max_active_sessions,
                self.config.overflow,
                self.config.block_timeout,
            ),
            tls,
            keep_alive: self.config.keep_alive,
            sessions: Arc::clone(sessions),
            cancel: cancel.clone(),
        }
    }

    fn display_address(&self) -> String {
        match self.config.kind {
            TransportKind::Unix => self.config.path.display().to_string(),
            _ => self
                .local_addr()
                .map_or_else(|| self.config.bind_address(), |a| a.to_string()),
        }
    }

    // =========================================================================
    // Binding
    // =========================================================================

    async fn bind(&self) -> Result<Bound> {
        match (self.config.kind, self.config.socket_type) {
            (TransportKind::Udp, _) => Ok(Bound::Udp(self.bind_udp().await?)),
            (TransportKind::Tcp, _) => Ok(Bound::Tcp(self.bind_tcp().await?, None)),
            (TransportKind::Tls, _) => {
                let tls = self.config.tls.as_ref().ok_or_else(|| {
                    syslane_config::ConfigError::missing_field("server", &self.name, "tls")
                })?;
                let acceptor = syslane_transport::tls::server_acceptor(tls)?;
                Ok(Bound::Tcp(self.bind_tcp().await?, Some(acceptor)))
            }
            #[cfg(unix)]
            (TransportKind::Unix, SocketType::Stream) => {
                let path = self.config.path.clone();
                prepare_socket_path(&path)?;
                let listener = tokio::net::UnixListener::bind(&path)
                    .map_err(|e| ServerError::bind(path.display().to_string(), e))?;
                Ok(Bound::UnixStream(listener, path))
            }
            #[cfg(unix)]
            (TransportKind::Unix, SocketType::Datagram) => {
                let path = self.config.path.clone();
                prepare_socket_path(&path)?;
                let socket = tokio::net::UnixDatagram::bind(&path)
                    .map_err(|e| ServerError::bind(path.display().to_string(), e))?;
                Ok(Bound::UnixDatagram(socket, path))
            }
            #[cfg(not(unix))]
            (TransportKind::Unix, _) => Err(syslane_config::ConfigError::invalid_value(
                "server",
                &self.name,
                "kind",
                "unix sockets are not available on this platform",
            )
            .into()),
        }
    }

    async fn resolve(&self) -> Result<SocketAddr> {
        let address = self.config.bind_address();
        tokio::net::lookup_host(&address)
            .await
            .map_err(|e| ServerError::bind(&address, e))?
            .next()
            .ok_or_else(|| {
                ServerError::bind(
                    &address,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no address resolved"),
                )
            })
    }

    async fn bind_tcp(&self) -> Result<TcpListener> {
        let addr = self.resolve().await?;
        let bind_err = |e| ServerError::bind(addr.to_string(), e);

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_err)?;
        socket
            .set_reuseaddr(self.config.reuse_address)
            .map_err(bind_err)?;
        socket.bind(addr).map_err(bind_err)?;
        socket.listen(self.config.backlog).map_err(bind_err)
    }

    async fn bind_udp(&self) -> Result<UdpSocket> {
        let addr = self.resolve().await?;
        let bind_err = |e| ServerError::bind(addr.to_string(), e);

        let socket =
            Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP)).map_err(bind_err)?;
        socket
            .set_reuse_address(self.config.reuse_address)
            .map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;
        socket.bind(&addr.into()).map_err(bind_err)?;

        UdpSocket::from_std(socket.into()).map_err(bind_err)
    }
}

impl Drop for ServerDispatcher {
    fn drop(&mut self) {
        if let Some(run) = self.running.get_mut().take() {
            run.cancel.cancel();
            run.listener_task.abort();
        }
    }
}

impl fmt::Debug for ServerDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerDispatcher")
            .field("name", &self.name)
            .field("kind", &self.config.kind)
            .field("state", &self.state())
            .field("handlers", &self.handlers)
            .finish()
    }
}

/// Remove a stale socket file left by an earlier run
#[cfg(unix)]
fn prepare_socket_path(path: &Path) -> Result<()> {
    use std::os::unix::fs::FileTypeExt;

    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            tracing::debug!(path = %path.display(), "removing stale socket file");
            std::fs::remove_file(path).map_err(|e| ServerError::bind(path.display().to_string(), e))
        }
        Ok(_) => Err(ServerError::bind(
            path.display().to_string(),
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "path exists and is not a socket"),
        )),
        Err(_) => Ok(()),
    }
}

// =============================================================================
// Accept loop
// =============================================================================

enum Bound {
    Udp(UdpSocket),
    Tcp(TcpListener, Option<TlsAcceptor>),
    #[cfg(unix)]
    UnixStream(tokio::net::UnixListener, PathBuf),
    #[cfg(unix)]
    UnixDatagram(tokio::net::UnixDatagram, PathBuf),
}

impl Bound {
    fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Udp(socket) => socket.local_addr().ok(),
            Self::Tcp(listener, _) => listener.local_addr().ok(),
            #[cfg(unix)]
            Self::UnixStream(..) | Self::UnixDatagram(..) => None,
        }
    }

    #[cfg(unix)]
    fn socket_path(&self) -> Option<PathBuf> {
        match self {
            Self::UnixStream(_, path) | Self::UnixDatagram(_, path) => Some(path.clone()),
            _ => None,
        }
    }
}

enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(tokio::net::UnixListener),
}

enum Accepted {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(tokio::net::UnixStream),
}

impl Listener {
    async fn accept(&self) -> std::io::Result<(Accepted, String)> {
        match self {
            Self::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                Ok((Accepted::Tcp(stream), peer.to_string()))
            }
            #[cfg(unix)]
            Self::Unix(listener) => {
                let (stream, peer) = listener.accept().await?;
                Ok((Accepted::Unix(stream), session::unix_peer(&peer)))
            }
        }
    }
}

struct AcceptLoop {
    ctx: Arc<SessionContext>,
    admission: Admission,
    tls: Option<TlsAcceptor>,
    keep_alive: bool,
    sessions: Arc<Mutex<JoinSet<()>>>,
    cancel: CancellationToken,
}

impl AcceptLoop {
    async fn run(self, listener: Listener) {
        loop {
            // Under BLOCK the accept itself waits for a free slot
            let early = if self.admission.waits_before_accept() {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break,
                    permit = self.admission.acquire() => Some(permit),
                }
            } else {
                None
            };

            let accepted = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            let (conn, peer) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    self.ctx.metrics.error();
                    tracing::warn!(server = %self.ctx.server, error = %e, "syslog accept error");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            };

            let permit = match early {
                Some(permit) => permit,
                None => self.admission.acquire().await,
            };

            let Some(permit) = permit else {
                self.ctx.metrics.session_rejected();
                tracing::debug!(
                    server = %self.ctx.server,
                    peer = %peer,
                    policy = ?self.admission.policy(),
                    "session limit reached, connection closed"
                );
                drop(conn);
                continue;
            };

            self.spawn_session(conn, peer, permit);
        }

        tracing::debug!(server = %self.ctx.server, "accept loop stopped");
    }

    fn spawn_session(&self, conn: Accepted, peer: String, permit: SessionPermit) {
        let info = self.ctx.session(peer);
        let ctx = Arc::clone(&self.ctx);
        let cancel = self.cancel.clone();
        let tls = self.tls.clone();

        if let Accepted::Tcp(stream) = &conn
            && self.keep_alive
            && let Err(e) = SockRef::from(stream).set_keepalive(true)
        {
            tracing::debug!(error = %e, "failed to set SO_KEEPALIVE");
        }

        let mut sessions = self.sessions.lock();
        while sessions.try_join_next().is_some() {}

        sessions.spawn(async move {
            let _permit = permit;
            match conn {
                Accepted::Tcp(stream) => match tls {
                    Some(acceptor) => {
                        match tokio::time::timeout(HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await
                        {
                            Ok(Ok(stream)) => session::run_stream(ctx, info, stream, cancel).await,
                            Ok(Err(e)) => {
                                ctx.metrics.error();
                                tracing::debug!(
                                    server = %ctx.server,
                                    peer = %info.peer,
                                    error = %e,
                                    "TLS handshake failed"
                                );
                            }
                            Err(_) => {
                                ctx.metrics.error();
                                tracing::debug!(
                                    server = %ctx.server,
                                    peer = %info.peer,
                                    "TLS handshake timed out"
                                );
                            }
                        }
                    }
                    None => session::run_stream(ctx, info, stream, cancel).await,
                },
                #[cfg(unix)]
                Accepted::Unix(stream) => session::run_stream(ctx, info, stream, cancel).await,
            }
        });
    }
}
