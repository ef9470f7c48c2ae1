//! Session workers
//!
//! A stream session reads delimiter-framed messages until EOF, an idle
//! timeout, or shutdown. On shutdown a session with a partial frame
//! buffered keeps reading until that frame completes, the peer closes, or
//! the drain deadline passes; only then is a leftover fragment delivered. Datagram servers run a single receive loop; each datagram (or
//! each reassembled UDP message) is one frame.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use syslane_protocol::StructuredMessageParser;
use syslane_transport::{Frame, Reassembler, SyslogCodec, is_connection_reset};
use tokio::io::AsyncRead;
use tokio::net::UdpSocket;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::sync::CancellationToken;

use crate::{HandlerSet, ServerMetrics, SessionInfo};

/// Largest datagram accepted
const MAX_DATAGRAM_SIZE: usize = 65_535;

/// Partial UDP messages older than this are passed on unjoined
const REASSEMBLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Share of `shutdown_wait` a session may spend finishing a partial frame.
/// The rest is left for the dispatcher to collect the session before it
/// aborts stragglers.
const DRAIN_SHARE: f64 = 0.8;

/// How often stale reassembly buffers are checked
const REASSEMBLY_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// What every session of one server shares
pub(crate) struct SessionContext {
    pub server: Arc<str>,
    pub handlers: HandlerSet,
    pub metrics: Arc<ServerMetrics>,
    pub parser: StructuredMessageParser,
    pub delimiter: Vec<u8>,
    pub max_frame_size: usize,
    pub idle_timeout: Option<Duration>,
    pub drain_wait: Duration,
    next_id: AtomicU64,
}

impl SessionContext {
    pub fn new(
        server: &str,
        handlers: HandlerSet,
        metrics: Arc<ServerMetrics>,
        config: &syslane_config::ServerConfig,
    ) -> Self {
        Self {
            server: Arc::from(server),
            handlers,
            metrics,
            parser: StructuredMessageParser::new(config.charset),
            delimiter: config.delimiter.as_bytes().to_vec(),
            max_frame_size: config.max_frame_size,
            idle_timeout: (!config.session_timeout.is_zero()).then_some(config.session_timeout),
            drain_wait: config.shutdown_wait.mul_f64(DRAIN_SHARE),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn session(&self, peer: impl Into<String>) -> SessionInfo {
        SessionInfo {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            server: Arc::clone(&self.server),
            peer: peer.into(),
        }
    }

    async fn open(&self, session: &SessionInfo) {
        self.metrics.session_opened();
        self.handlers.session_opened(session, &self.metrics).await;
    }

    async fn close(&self, session: &SessionInfo) {
        self.handlers.session_closed(session, &self.metrics).await;
    }

    async fn handle_frame(&self, session: &SessionInfo, frame: Frame) {
        match frame {
            Frame::Line(line) => self.deliver(session, &line).await,
            Frame::TooLong(size) => {
                self.metrics.frame_oversized();
                tracing::debug!(
                    server = %self.server,
                    peer = %session.peer,
                    size,
                    max = self.max_frame_size,
                    "syslog frame too large, dropped"
                );
            }
        }
    }

    /// Parse one frame and hand it to the handlers
    async fn deliver(&self, session: &SessionInfo, frame: &[u8]) {
        if frame.is_empty() {
            return;
        }
        self.metrics.frame_received(frame.len());
        let event = self.parser.parse(frame);
        self.handlers.dispatch(session, &event, &self.metrics).await;
    }
}

/// Counts the session closed even if its task is aborted
struct ClosedOnDrop<'a>(&'a ServerMetrics);

impl Drop for ClosedOnDrop<'_> {
    fn drop(&mut self) {
        self.0.session_closed();
    }
}

// =============================================================================
// Streams
// =============================================================================

pub(crate) async fn run_stream<S>(
    ctx: Arc<SessionContext>,
    session: SessionInfo,
    io: S,
    cancel: CancellationToken,
) where
    S: AsyncRead + Unpin + Send,
{
    ctx.open(&session).await;
    let _closed = ClosedOnDrop(&ctx.metrics);

    let codec = SyslogCodec::new(&ctx.delimiter, ctx.max_frame_size);
    let mut framed = FramedRead::new(io, codec);

    let cancelled = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            frame = next_frame(&mut framed, ctx.idle_timeout) => Some(frame),
        };

        match next {
            None => break true,
            Some(Ok(Some(frame))) => ctx.handle_frame(&session, frame).await,
            Some(Ok(None)) => break false,
            Some(Err(e)) if e.kind() == io::ErrorKind::TimedOut => {
                tracing::debug!(
                    server = %ctx.server,
                    peer = %session.peer,
                    "syslog session idle timeout"
                );
                break false;
            }
            Some(Err(e)) => {
                if !is_connection_reset(&e) {
                    ctx.metrics.error();
                    tracing::debug!(
                        server = %ctx.server,
                        peer = %session.peer,
                        error = %e,
                        "syslog session read error"
                    );
                }
                break false;
            }
        }
    };

    if cancelled {
        drain(&ctx, &session, &mut framed).await;
    }

    ctx.close(&session).await;
}

/// Finish the frame in flight when shutdown arrives
async fn drain<S>(
    ctx: &SessionContext,
    session: &SessionInfo,
    framed: &mut FramedRead<S, SyslogCodec>,
) where
    S: AsyncRead + Unpin,
{
    let deadline = tokio::time::Instant::now() + ctx.drain_wait;

    // Complete frames come out of the buffer without reading; a partial one
    // pulls more bytes from the peer
    while !framed.read_buffer().is_empty() {
        match tokio::time::timeout_at(deadline, framed.next()).await {
            Ok(Some(Ok(frame))) => ctx.handle_frame(session, frame).await,
            Ok(None) => return,
            Ok(Some(Err(_))) => break,
            Err(_) => {
                tracing::debug!(
                    server = %ctx.server,
                    peer = %session.peer,
                    buffered = framed.read_buffer().len(),
                    "drain deadline passed with a partial frame"
                );
                break;
            }
        }
    }

    let mut buffered = std::mem::take(framed.read_buffer_mut());
    let codec = framed.decoder_mut();
    while let Ok(Some(frame)) = codec.decode_eof(&mut buffered) {
        ctx.handle_frame(session, frame).await;
    }
}

async fn next_frame<S>(
    framed: &mut FramedRead<S, SyslogCodec>,
    idle: Option<Duration>,
) -> io::Result<Option<Frame>>
where
    S: AsyncRead + Unpin,
{
    match idle {
        Some(limit) => match tokio::time::timeout(limit, framed.next()).await {
            Ok(next) => next.transpose(),
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "session idle")),
        },
        None => framed.next().await.transpose(),
    }
}

// =============================================================================
// Datagrams
// =============================================================================

/// Receive loop for a UDP server
pub(crate) async fn run_udp(
    ctx: Arc<SessionContext>,
    socket: UdpSocket,
    mut reassembler: Reassembler<SocketAddr>,
    cancel: CancellationToken,
) {
    let local = socket
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_default();
    let listener = ctx.session(local);
    ctx.open(&listener).await;
    let _closed = ClosedOnDrop(&ctx.metrics);

    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut sweep = interval(REASSEMBLY_SWEEP_INTERVAL);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = sweep.tick() => {
                for (peer, stale) in reassembler.expire(REASSEMBLY_TIMEOUT) {
                    let session = SessionInfo { peer: peer.to_string(), ..listener.clone() };
                    ctx.deliver(&session, trim_trailing_newline(&stale)).await;
                }
            }

            received = socket.recv_from(&mut buf) => match received {
                Ok((len, peer)) => {
                    let session = SessionInfo { peer: peer.to_string(), ..listener.clone() };
                    for message in reassembler.push(&peer, &buf[..len]) {
                        ctx.deliver(&session, trim_trailing_newline(&message)).await;
                    }
                }
                // ICMP port unreachable surfaces as a reset on some platforms
                Err(e) if is_connection_reset(&e) => {}
                Err(e) => {
                    ctx.metrics.error();
                    tracing::debug!(server = %ctx.server, error = %e, "syslog UDP receive error");
                }
            },
        }
    }

    for (peer, pending) in reassembler.drain() {
        let session = SessionInfo { peer: peer.to_string(), ..listener.clone() };
        ctx.deliver(&session, trim_trailing_newline(&pending)).await;
    }
    ctx.close(&listener).await;
}

/// Receive loop for a Unix datagram server
#[cfg(unix)]
pub(crate) async fn run_unix_datagram(
    ctx: Arc<SessionContext>,
    socket: tokio::net::UnixDatagram,
    cancel: CancellationToken,
) {
    let local = socket
        .local_addr()
        .ok()
        .and_then(|a| a.as_pathname().map(|p| p.display().to_string()))
        .unwrap_or_default();
    let listener = ctx.session(local);
    ctx.open(&listener).await;
    let _closed = ClosedOnDrop(&ctx.metrics);

    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            received = socket.recv_from(&mut buf) => match received {
                Ok((len, peer)) => {
                    let session = SessionInfo { peer: unix_peer(&peer), ..listener.clone() };
                    ctx.deliver(&session, trim_trailing_newline(&buf[..len])).await;
                }
                Err(e) => {
                    ctx.metrics.error();
                    tracing::debug!(server = %ctx.server, error = %e, "syslog Unix receive error");
                }
            },
        }
    }

    ctx.close(&listener).await;
}

#[cfg(unix)]
pub(crate) fn unix_peer(addr: &tokio::net::unix::SocketAddr) -> String {
    addr.as_pathname()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "unix".to_string())
}

/// Trim trailing newline (LF or CRLF) and NUL padding
#[inline]
pub fn trim_trailing_newline(data: &[u8]) -> &[u8] {
    let mut end = data.len();

    while end > 0 && data[end - 1] == 0 {
        end -= 1;
    }
    if end > 0 && data[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && data[end - 1] == b'\r' {
            end -= 1;
        }
    }

    &data[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_trailing_newline() {
        assert_eq!(trim_trailing_newline(b"msg\n"), b"msg");
        assert_eq!(trim_trailing_newline(b"msg\r\n"), b"msg");
        assert_eq!(trim_trailing_newline(b"msg\n\0"), b"msg");
        assert_eq!(trim_trailing_newline(b"msg\r"), b"msg\r");
        assert_eq!(trim_trailing_newline(b""), b"");
    }
}
