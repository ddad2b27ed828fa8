use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, UdpSocket};

use rider::RelayError;
use rider_core::{SyslogConfig, SyslogTransport};

use crate::*;

fn payload_of(message: &[u8]) -> &[u8] {
    let split = message
        .windows(2)
        .position(|w| w == b": ")
        .expect("syslog header separator");
    &message[split + 2..]
}

#[tokio::test]
async fn test_udp_one_datagram_per_chunk() {
    let collector = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let config = SyslogConfig {
        transport: SyslogTransport::Udp,
        address: collector.local_addr().unwrap().to_string(),
        tag: "redir".into(),
        verbose: false,
    };

    rider::relay_syslog(&config, source(&b"abcdefgh"[..], 4))
        .await
        .expect("relay should succeed");

    let mut buf = [0u8; 1024];
    let n = collector.recv(&mut buf).await.unwrap();
    assert_eq!(payload_of(&buf[..n]), b"abcd\n");
    let n = collector.recv(&mut buf).await.unwrap();
    assert_eq!(payload_of(&buf[..n]), b"efgh\n");
}

#[tokio::test]
async fn test_tcp_stream_of_messages() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = SyslogConfig {
        transport: SyslogTransport::Tcp,
        address: listener.local_addr().unwrap().to_string(),
        tag: "redir".into(),
        verbose: true,
    };

    let accept = tokio::spawn(async move {
        let (mut conn, _) = listener.accept().await.unwrap();
        let mut out = Vec::new();
        conn.read_to_end(&mut out).await.unwrap();
        out
    });

    rider::relay_syslog(&config, source(&b"hello\n"[..], 1024))
        .await
        .expect("relay should succeed");

    let out = accept.await.unwrap();
    assert!(out.starts_with(b"<6>"));
    assert_eq!(payload_of(&out), b"hello\n");
}

#[tokio::test]
async fn test_empty_input_sends_nothing() {
    let collector = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let config = SyslogConfig {
        address: collector.local_addr().unwrap().to_string(),
        ..SyslogConfig::default()
    };

    rider::relay_syslog(&config, source(&b""[..], 1024))
        .await
        .expect("empty input is not an error");

    let mut buf = [0u8; 64];
    let got = tokio::time::timeout(
        std::time::Duration::from_millis(100),
        collector.recv(&mut buf),
    )
    .await;
    assert!(got.is_err(), "no datagram expected");
}

#[tokio::test]
async fn test_unreachable_tcp_collector_is_sink_error() {
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let config = SyslogConfig {
        transport: SyslogTransport::Tcp,
        address: format!("127.0.0.1:{port}"),
        ..SyslogConfig::default()
    };

    let err = rider::relay_syslog(&config, source(&b"x"[..], 16))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Sink { .. }), "{err}");
    assert_eq!(err.stage(), "sink");
}
