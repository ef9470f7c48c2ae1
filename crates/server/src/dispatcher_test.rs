use super::*;

use async_trait::async_trait;
use syslane_config::OverflowPolicy;
use syslane_protocol::{Facility, Severity, StructuredEvent};
use syslane_transport::Fragmenter;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::{ChannelEventHandler, HandlerError, ReceivedEvent, SessionInfo};

fn tcp_config() -> ServerConfig {
    ServerConfig {
        delimiter: "\n".into(),
        shutdown_wait: Duration::from_secs(2),
        ..ServerConfig::new(TransportKind::Tcp, "127.0.0.1", 0)
    }
}

async fn started(config: ServerConfig) -> (ServerDispatcher, mpsc::Receiver<ReceivedEvent>) {
    let server = ServerDispatcher::new("test", config).unwrap();
    let (handler, rx) = ChannelEventHandler::new(64);
    server.add_handler(Arc::new(handler));
    server.start().await.unwrap();
    (server, rx)
}

async fn next_message(rx: &mut mpsc::Receiver<ReceivedEvent>) -> String {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event within 2s")
        .expect("channel open")
        .event
        .message
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn test_tcp_lifecycle() {
    let (server, mut rx) = started(tcp_config()).await;
    assert_eq!(server.state(), ServerState::Running);
    assert!(matches!(
        server.start().await,
        Err(ServerError::InvalidState {
            state: ServerState::Running,
            ..
        })
    ));

    let addr = server.local_addr().unwrap();
    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"<13>first\r\n<14>second\n\n")
        .await
        .unwrap();

    assert_eq!(next_message(&mut rx).await, "<13>first");
    assert_eq!(next_message(&mut rx).await, "<14>second");

    server.shutdown().await;
    assert_eq!(server.state(), ServerState::Stopped);
    assert!(server.local_addr().is_none());
    assert_eq!(server.metrics().frames_received, 2);

    // Stopped servers can start again
    server.start().await.unwrap();
    server.shutdown().await;
}

#[tokio::test]
async fn test_structured_event_decoded() {
    let (server, mut rx) = started(tcp_config()).await;
    let mut client = TcpStream::connect(server.local_addr().unwrap())
        .await
        .unwrap();
    client
        .write_all(b"<165>1 2026-10-11T22:14:15.003Z web01 app 42 ID47 [origin ip=\"10.0.0.1\"] started\n")
        .await
        .unwrap();

    let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    let event = received.event;
    assert!(event.structured);
    assert_eq!(event.facility, Some(Facility::Local4));
    assert_eq!(event.severity, Some(Severity::Notice));
    assert_eq!(event.host.as_deref(), Some("web01"));
    assert_eq!(event.sd_param("origin", "ip"), Some("10.0.0.1"));
    assert_eq!(event.message, "started");
    assert_eq!(&*received.session.server, "test");

    server.shutdown().await;
}

#[tokio::test]
async fn test_oversized_frame_dropped() {
    let config = tcp_config().with_max_frame_size(8);
    let (server, mut rx) = started(config).await;
    let mut client = TcpStream::connect(server.local_addr().unwrap())
        .await
        .unwrap();
    client
        .write_all(b"far too long for the limit\nshort\n")
        .await
        .unwrap();

    assert_eq!(next_message(&mut rx).await, "short");
    assert_eq!(server.metrics().frames_oversized, 1);
    server.shutdown().await;
}

#[tokio::test]
async fn test_reject_closes_excess_connections() {
    let config = tcp_config().with_admission(1, OverflowPolicy::Reject);
    let (server, mut rx) = started(config).await;
    let addr = server.local_addr().unwrap();

    let mut first = TcpStream::connect(addr).await.unwrap();
    wait_until(|| server.metrics().sessions_active == 1).await;

    let mut second = TcpStream::connect(addr).await.unwrap();
    wait_until(|| server.metrics().sessions_rejected == 1).await;

    // Closed without being read
    let mut buf = [0u8; 8];
    let read = tokio::time::timeout(Duration::from_secs(2), second.read(&mut buf))
        .await
        .unwrap();
    assert!(matches!(read, Ok(0) | Err(_)));

    first.write_all(b"still served\n").await.unwrap();
    assert_eq!(next_message(&mut rx).await, "still served");

    server.shutdown().await;
}

#[tokio::test]
async fn test_block_waits_for_free_slot() {
    let config = tcp_config()
        .with_admission(1, OverflowPolicy::Block)
        .with_block_timeout(Duration::from_secs(5));
    let (server, mut rx) = started(config).await;
    let addr = server.local_addr().unwrap();

    let mut first = TcpStream::connect(addr).await.unwrap();
    first.write_all(b"one\n").await.unwrap();
    assert_eq!(next_message(&mut rx).await, "one");

    let mut second = TcpStream::connect(addr).await.unwrap();
    second.write_all(b"two\n").await.unwrap();
    assert!(
        tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .is_err()
    );

    drop(first);
    assert_eq!(next_message(&mut rx).await, "two");
    assert_eq!(server.metrics().sessions_rejected, 0);

    server.shutdown().await;
}

#[tokio::test]
async fn test_block_timeout_falls_back_to_reject() {
    let config = tcp_config()
        .with_admission(1, OverflowPolicy::Block)
        .with_block_timeout(Duration::from_millis(50));
    let (server, _rx) = started(config).await;
    let addr = server.local_addr().unwrap();

    let _first = TcpStream::connect(addr).await.unwrap();
    wait_until(|| server.metrics().sessions_active == 1).await;

    let _second = TcpStream::connect(addr).await.unwrap();
    wait_until(|| server.metrics().sessions_rejected >= 1).await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_finishes_frame_in_flight() {
    let (server, mut rx) = started(tcp_config()).await;
    let mut client = TcpStream::connect(server.local_addr().unwrap())
        .await
        .unwrap();

    client.write_all(b"complete\n<13>disk usage at 9").await.unwrap();
    assert_eq!(next_message(&mut rx).await, "complete");
    // Give the session time to buffer the head
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The tail arrives after shutdown has started
    let finish_frame = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.write_all(b"7 percent\n").await.unwrap();
    };
    tokio::join!(server.shutdown(), finish_frame);

    assert_eq!(next_message(&mut rx).await, "<13>disk usage at 97 percent");
    assert_eq!(server.metrics().sessions_active, 0);
}

#[tokio::test]
async fn test_shutdown_flushes_fragment_at_drain_deadline() {
    let config = ServerConfig {
        shutdown_wait: Duration::from_millis(300),
        ..tcp_config()
    };
    let (server, mut rx) = started(config).await;
    let mut client = TcpStream::connect(server.local_addr().unwrap())
        .await
        .unwrap();

    client.write_all(b"unterminated").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The peer never finishes the frame
    server.shutdown().await;
    assert_eq!(next_message(&mut rx).await, "unterminated");
    assert_eq!(server.metrics().sessions_active, 0);
}

struct Stuck;

#[async_trait]
impl EventHandler for Stuck {
    fn name(&self) -> &str {
        "stuck"
    }

    async fn event(
        &self,
        _: &SessionInfo,
        _: &StructuredEvent,
    ) -> std::result::Result<(), HandlerError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

#[tokio::test]
async fn test_shutdown_aborts_stragglers() {
    let config = ServerConfig {
        shutdown_wait: Duration::from_millis(50),
        ..tcp_config()
    };
    let server = ServerDispatcher::new("stuck", config).unwrap();
    server.add_handler(Arc::new(Stuck));
    server.start().await.unwrap();

    let mut client = TcpStream::connect(server.local_addr().unwrap())
        .await
        .unwrap();
    client.write_all(b"hang\n").await.unwrap();
    wait_until(|| server.metrics().frames_received == 1).await;

    let started = std::time::Instant::now();
    server.shutdown().await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(server.state(), ServerState::Stopped);
    assert_eq!(server.metrics().sessions_active, 0);
}

#[tokio::test]
async fn test_udp_reassembles_fragments() {
    let config = ServerConfig::new(TransportKind::Udp, "127.0.0.1", 0);
    let (server, mut rx) = started(config).await;
    let addr = server.local_addr().unwrap();

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(b"<14>single\n", addr).await.unwrap();
    assert_eq!(next_message(&mut rx).await, "<14>single");

    let fragmenter = Fragmenter::new(16, b"...", b"...").unwrap();
    let payload = b"<14>a message that spans several datagrams";
    let fragments = fragmenter.split(payload);
    assert!(fragments.len() > 2);
    for fragment in &fragments {
        client.send_to(fragment, addr).await.unwrap();
    }
    assert_eq!(
        next_message(&mut rx).await,
        "<14>a message that spans several datagrams"
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_unjoined_fragment_keeps_its_peer() {
    let config = ServerConfig::new(TransportKind::Udp, "127.0.0.1", 0);
    let (server, mut rx) = started(config).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(b"<14>never finished...", server.local_addr().unwrap())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Pending fragments are passed on raw at shutdown
    server.shutdown().await;
    let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received.event.message, "<14>never finished...");
    assert_eq!(
        received.session.peer,
        client.local_addr().unwrap().to_string()
    );
}

#[tokio::test]
async fn test_unknown_tls_files_fail_start() {
    let config = ServerConfig::new(TransportKind::Tls, "127.0.0.1", 0).with_tls(
        syslane_config::TlsServerConfig {
            cert_file: "/nonexistent/cert.pem".into(),
            key_file: "/nonexistent/key.pem".into(),
        },
    );
    let server = ServerDispatcher::new("tls", config).unwrap();
    assert!(matches!(
        server.start().await,
        Err(ServerError::Transport(_))
    ));
    assert_eq!(server.state(), ServerState::Stopped);
}

#[cfg(unix)]
#[tokio::test]
async fn test_unix_stream_and_datagram() {
    let dir = tempfile::tempdir().unwrap();

    let stream_path = dir.path().join("stream.sock");
    let config = ServerConfig {
        delimiter: "\n".into(),
        ..ServerConfig::unix(&stream_path, SocketType::Stream)
    };
    let (stream_server, mut stream_rx) = started(config).await;
    let mut client = tokio::net::UnixStream::connect(&stream_path).await.unwrap();
    client.write_all(b"<14>over stream\n").await.unwrap();
    assert_eq!(next_message(&mut stream_rx).await, "<14>over stream");

    let dgram_path = dir.path().join("dgram.sock");
    let (dgram_server, mut dgram_rx) =
        started(ServerConfig::unix(&dgram_path, SocketType::Datagram)).await;
    let client = tokio::net::UnixDatagram::unbound().unwrap();
    client.send_to(b"<14>over datagram", &dgram_path).await.unwrap();
    assert_eq!(next_message(&mut dgram_rx).await, "<14>over datagram");

    stream_server.shutdown().await;
    dgram_server.shutdown().await;
    assert!(!stream_path.exists());
    assert!(!dgram_path.exists());
}
