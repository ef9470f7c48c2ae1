use super::*;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use syslane_config::SocketType;
use tokio::net::TcpListener;
use tokio_util::codec::FramedRead;

use crate::Frame;

async fn listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

fn tcp(port: u16) -> TransportConfig {
    TransportConfig::tcp("127.0.0.1", port).with_delimiter("\n")
}

fn line(s: &str) -> Frame {
    Frame::Line(bytes::Bytes::copy_from_slice(s.as_bytes()))
}

#[tokio::test]
async fn test_writes_are_delimited() {
    let (listener, port) = listener().await;
    let transport = StreamTransport::new("tcp", Dialer::new(tcp(port)).unwrap());

    transport.write(b"<13>one").await.unwrap();
    transport.write(b"<13>two").await.unwrap();

    let (server, _) = listener.accept().await.unwrap();
    let mut frames = FramedRead::new(server, SyslogCodec::new(b"\n", 1024));
    assert_eq!(frames.next().await.unwrap().unwrap(), line("<13>one"));
    assert_eq!(frames.next().await.unwrap().unwrap(), line("<13>two"));

    let m = transport.metrics();
    assert_eq!(m.messages_sent, 2);
    assert_eq!(m.connects, 1);
}

#[tokio::test]
async fn test_reset_forces_reconnect() {
    let (listener, port) = listener().await;
    let transport = StreamTransport::new("tcp", Dialer::new(tcp(port)).unwrap());

    transport.connect().await.unwrap();
    assert!(transport.is_connected().await);

    transport.reset().await;
    assert!(!transport.is_connected().await);

    transport.write(b"<13>again").await.unwrap();
    assert_eq!(transport.metrics().connects, 2);
    drop(listener);
}

#[tokio::test]
async fn test_connect_failure_is_reported() {
    let port = {
        let (l, p) = listener().await;
        drop(l);
        p
    };
    let transport = StreamTransport::new("tcp", Dialer::new(tcp(port)).unwrap());

    let err = transport.write(b"<13>lost").await.unwrap_err();
    assert!(err.is_connection_error());
    assert!(!transport.is_connected().await);
}

#[tokio::test]
async fn test_write_after_close_fails() {
    let (_listener, port) = listener().await;
    let transport = StreamTransport::new("tcp", Dialer::new(tcp(port)).unwrap());

    transport.write(b"<13>x").await.unwrap();
    transport.close().await;
    assert!(matches!(
        transport.write(b"<13>y").await,
        Err(TransportError::Closed)
    ));
}

#[tokio::test]
async fn test_truncate_message() {
    let (listener, port) = listener().await;
    let mut config = tcp(port).with_max_message_length(4);
    config.truncate_message = true;
    let transport = StreamTransport::new("tcp", Dialer::new(config).unwrap());

    transport.write(b"abcdefgh").await.unwrap();

    let (server, _) = listener.accept().await.unwrap();
    let mut frames = FramedRead::new(server, SyslogCodec::new(b"\n", 1024));
    assert_eq!(frames.next().await.unwrap().unwrap(), line("abcd"));
}

#[tokio::test]
async fn test_pooled_transport_writes() {
    let (listener, port) = listener().await;
    let pool = PoolConfig {
        max_active: 2,
        eviction_run_interval: Duration::ZERO,
        ..PoolConfig::default()
    };
    let transport = Arc::new(PooledTransport::new("pooled", Dialer::new(tcp(port)).unwrap(), pool));

    transport.write(b"<13>first").await.unwrap();
    transport.write(b"<13>second").await.unwrap();

    // Sequential writes share one connection
    let (server, _) = listener.accept().await.unwrap();
    let mut frames = FramedRead::new(server, SyslogCodec::new(b"\n", 1024));
    assert_eq!(frames.next().await.unwrap().unwrap(), line("<13>first"));
    assert_eq!(frames.next().await.unwrap().unwrap(), line("<13>second"));

    assert_eq!(transport.pool_metrics().created, 1);
    assert_eq!(transport.metrics().connects, 1);
    assert_eq!(transport.pool().idle_count(), 1);

    transport.close().await;
    assert!(matches!(
        transport.write(b"<13>late").await,
        Err(TransportError::Closed)
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn test_unix_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stream.sock");
    let listener = tokio::net::UnixListener::bind(&path).unwrap();

    let config = TransportConfig::unix(&path, SocketType::Stream).with_delimiter("\n");
    let transport = StreamTransport::new("local", Dialer::new(config).unwrap());
    assert_eq!(transport.kind(), TransportKind::Unix);

    transport.write(b"<13>over unix").await.unwrap();

    let (server, _) = listener.accept().await.unwrap();
    let mut frames = FramedRead::new(server, SyslogCodec::new(b"\n", 1024));
    assert_eq!(frames.next().await.unwrap().unwrap(), line("<13>over unix"));
}
