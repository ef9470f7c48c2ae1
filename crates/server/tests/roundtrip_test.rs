//! Messages sent by a configured sender arrive at a configured server

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use syslane_client::{LogTarget, Sender};
use syslane_config::{Config, PoolConfig, SenderConfig, TransportConfig};
use syslane_protocol::{Facility, MessageFormat, Severity, SyslogMessage};
use syslane_server::{
    ChannelEventHandler, EventHandler, ReceivedEvent, ServerState, build_servers, shutdown_all,
    start_all,
};
use tokio::sync::mpsc;

async fn next(rx: &mut mpsc::Receiver<ReceivedEvent>) -> ReceivedEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event within 2s")
        .expect("channel open")
}

#[tokio::test]
async fn test_tcp_and_udp_round_trip() {
    let config = Config::from_str(
        r#"
[servers.tcp]
kind = "tcp"
host = "127.0.0.1"
port = 0
delimiter = "\n"

[servers.udp]
kind = "udp"
host = "127.0.0.1"
port = 0
"#,
    )
    .unwrap();

    let (handler, mut rx) = ChannelEventHandler::new(16);
    let handlers: Vec<Arc<dyn EventHandler>> = vec![Arc::new(handler)];
    let servers = build_servers(&config, &handlers).unwrap();
    start_all(&servers).await.unwrap();

    let tcp_server = servers.lookup("TCP").unwrap();
    let udp_server = servers.lookup("udp").unwrap();
    assert_eq!(tcp_server.state(), ServerState::Running);

    // RFC 5424 over a pooled TCP connection
    let tcp_port = tcp_server.local_addr().unwrap().port();
    let sender_config = SenderConfig::new(
        TransportConfig::tcp("127.0.0.1", tcp_port).with_delimiter("\n"),
    )
    .with_pool(PoolConfig::default())
    .with_format(MessageFormat::Rfc5424)
    .with_local_name("web01")
    .with_ident("billing")
    .with_local_stamps(true, false);
    let tcp = Sender::open("tcp", sender_config, &std::sync::Weak::new())
        .await
        .unwrap();

    let message = SyslogMessage::new(Facility::Local0, Severity::Warning, "card declined")
        .with_sd_element("txn", BTreeMap::from([("id".to_string(), "42".to_string())]));
    tcp.send(message).await.unwrap();

    let received = next(&mut rx).await;
    assert_eq!(&*received.session.server, "tcp");
    let event = received.event;
    assert!(event.structured);
    assert_eq!(event.facility, Some(Facility::Local0));
    assert_eq!(event.severity, Some(Severity::Warning));
    assert_eq!(event.host.as_deref(), Some("web01"));
    assert_eq!(event.app_name.as_deref(), Some("billing"));
    assert_eq!(event.sd_param("txn", "id"), Some("42"));
    assert_eq!(event.message, "card declined");

    // Oversized BSD message split over UDP and joined again
    let udp_port = udp_server.local_addr().unwrap().port();
    let udp = Sender::open(
        "udp",
        SenderConfig::new(
            TransportConfig::udp("127.0.0.1", udp_port).with_max_message_length(32),
        )
        .with_local_stamps(false, false),
        &std::sync::Weak::new(),
    )
    .await
    .unwrap();

    let long = "x".repeat(100);
    udp.info(long.clone()).await.unwrap();
    let received = next(&mut rx).await;
    assert_eq!(&*received.session.server, "udp");
    assert_eq!(received.event.message, format!("<14>{long}"));

    tcp.shutdown().await;
    udp.shutdown().await;
    shutdown_all(&servers).await;
    assert_eq!(tcp_server.state(), ServerState::Stopped);
    assert!(servers.is_empty());
}
