//! `open` picks the transport matching the configuration

use std::time::Duration;

use syslane_config::{PoolConfig, SocketType, TransportConfig, TransportKind};
use syslane_transport::{TransportError, open};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, UdpSocket};

#[tokio::test]
async fn test_open_udp() {
    let rx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = rx.local_addr().unwrap().port();

    let transport = open("udp", &TransportConfig::udp("127.0.0.1", port), None)
        .await
        .unwrap();
    assert_eq!(transport.kind(), TransportKind::Udp);

    transport.write(b"<14>via open").await.unwrap();
    let mut buf = [0u8; 32];
    let n = rx.recv(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"<14>via open");
}

#[tokio::test]
async fn test_open_tcp_is_lazy() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    // Nothing listening, yet open succeeds
    let transport = open("tcp", &TransportConfig::tcp("127.0.0.1", port), None)
        .await
        .unwrap();
    assert_eq!(transport.kind(), TransportKind::Tcp);
    assert!(transport.write(b"x").await.is_err());
}

#[tokio::test]
async fn test_open_tcp_pooled() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let pool = PoolConfig {
        eviction_run_interval: Duration::from_millis(20),
        ..PoolConfig::default()
    };
    let config = TransportConfig::tcp("127.0.0.1", port).with_delimiter("\n");
    let transport = open("tcp", &config, Some(&pool)).await.unwrap();

    transport.write(b"<13>pooled").await.unwrap();
    let (mut server, _) = listener.accept().await.unwrap();
    let mut buf = [0u8; 11];
    server.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"<13>pooled\n");

    transport.close().await;
}

#[tokio::test]
async fn test_open_rejects_bad_markers() {
    let config = TransportConfig::udp("127.0.0.1", 514)
        .with_max_message_length(8)
        .with_split_markers("[[[[", "]]]]");
    assert!(matches!(
        open("udp", &config, None).await,
        Err(TransportError::Config(_))
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn test_open_unix_datagram() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dev-log");
    let rx = tokio::net::UnixDatagram::bind(&path).unwrap();

    let transport = open("local", &TransportConfig::unix(&path, SocketType::Datagram), None)
        .await
        .unwrap();
    transport.write(b"<13>local").await.unwrap();

    let mut buf = [0u8; 16];
    let n = rx.recv(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"<13>local");
}
