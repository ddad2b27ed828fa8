use std::time::Duration;

use tokio::io::AsyncWriteExt;

use rider::error::{DialFailure, StreamOpenFailure};
use rider::RelayError;

use crate::*;

#[tokio::test]
async fn test_single_line_arrives_verbatim() {
    let collector = Collector::start("rider-protocol").expect("collector");
    let config = quic_config(collector.addr);

    rider::relay_quic(&config, source(&b"hello\n"[..], 1024))
        .await
        .expect("relay should succeed");

    let received = collector.received().await.expect("collector result");
    assert_eq!(received.protocol.as_deref(), Some(&b"rider-protocol"[..]));
    assert_eq!(received.bytes, b"hello\n");
}

#[tokio::test]
async fn test_small_chunks_preserve_order() {
    let collector = Collector::start("rider-protocol").expect("collector");
    let config = quic_config(collector.addr);

    rider::relay_quic(&config, source(&b"abcdefgh"[..], 4))
        .await
        .expect("relay should succeed");

    assert_eq!(collector.received().await.unwrap().bytes, b"abcdefgh");
}

#[tokio::test]
async fn test_large_input_round_trips() {
    let collector = Collector::start("rider-protocol").expect("collector");
    let config = quic_config(collector.addr);

    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 97) as u8 + b'0').collect();
    rider::relay_quic(&config, source(&data[..], 4096))
        .await
        .expect("relay should succeed");

    let (payload, _) = strip_heartbeats(&collector.received().await.unwrap().bytes);
    assert_eq!(payload, data);
}

#[tokio::test]
async fn test_empty_input_closes_cleanly() {
    let collector = Collector::start("rider-protocol").expect("collector");
    let config = quic_config(collector.addr);

    rider::relay_quic(&config, source(&b""[..], 4096))
        .await
        .expect("empty input is not an error");

    assert!(collector.received().await.unwrap().bytes.is_empty());
}

#[tokio::test]
async fn test_heartbeat_interleaves_with_slow_input() {
    let collector = Collector::start("rider-protocol").expect("collector");
    let config = rider_core::QuicConfig {
        heartbeat_interval_secs: 1,
        ..quic_config(collector.addr)
    };

    let (reader, mut writer) = tokio::io::duplex(64);
    let feeder = tokio::spawn(async move {
        for _ in 0..6 {
            writer.write_all(b"data.").await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    });

    rider::relay_quic(&config, source(reader, 64))
        .await
        .expect("relay should succeed");
    feeder.await.unwrap();

    let received = collector.received().await.unwrap();
    let (payload, beats) = strip_heartbeats(&received.bytes);
    assert_eq!(payload, b"data.".repeat(6));
    assert!(beats >= 1, "expected a heartbeat in ~3s of input at 1s interval");
    // Markers sit between chunks, never inside one.
    assert!(!received.bytes.starts_with(HEARTBEAT_MARKER));
}

#[tokio::test]
async fn test_silent_destination_is_dial_error() {
    let silent = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let config = rider_core::QuicConfig {
        handshake_timeout_ms: 300,
        ..quic_config(silent.local_addr().unwrap())
    };

    let err = rider::relay_quic(&config, source(&b"never sent"[..], 1024))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            RelayError::Dial {
                source: DialFailure::Timeout(_),
                ..
            }
        ),
        "{err}"
    );
}

#[tokio::test]
async fn test_alpn_mismatch_is_dial_error() {
    let collector = Collector::start("some-other-protocol").expect("collector");
    let config = quic_config(collector.addr);

    let err = rider::relay_quic(&config, source(&b"x"[..], 16))
        .await
        .unwrap_err();
    assert_eq!(err.stage(), "dial", "{err}");
}

#[tokio::test]
async fn test_unparsable_address_is_resolve_error() {
    let config = rider_core::QuicConfig {
        address: "missing-port".into(),
        ..rider_core::QuicConfig::default()
    };
    let err = rider::relay_quic(&config, source(&b"x"[..], 16))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Resolve { .. }), "{err}");
}

#[tokio::test]
async fn test_session_negotiates_before_first_write() {
    let collector = Collector::start("rider-protocol").expect("collector");
    let config = quic_config(collector.addr);

    let session = rider::session::establish(&config).await.expect("session");
    assert_eq!(session.protocol(), "rider-protocol");
    assert_eq!(session.peer(), collector.addr);

    let settings = rider::RelaySettings::from(&config);
    let session = rider::relay(source(&b"after handshake"[..], 64), session, settings)
        .await
        .expect("relay should succeed")
        .expect("forwarder acknowledged shutdown");
    session.close(settings.shutdown_timeout).await;

    assert_eq!(collector.received().await.unwrap().bytes, b"after handshake");
}

#[tokio::test]
async fn test_no_stream_credit_is_stream_open_error() {
    let collector = Collector::start_with("rider-protocol", Behavior::NoStreams).expect("collector");
    let config = rider_core::QuicConfig {
        handshake_timeout_ms: 500,
        ..quic_config(collector.addr)
    };

    let err = rider::relay_quic(&config, source(&b"x"[..], 16))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            RelayError::StreamOpen {
                source: StreamOpenFailure::Timeout(_),
                ..
            }
        ),
        "{err}"
    );
    assert_eq!(err.stage(), "stream-open");
}

#[tokio::test]
async fn test_collector_stopping_stream_is_write_error() {
    let collector =
        Collector::start_with("rider-protocol", Behavior::StopAfter(4096)).expect("collector");
    let config = quic_config(collector.addr);

    // Far more than one stream window, so the writer is still blocked when
    // the stop arrives.
    let data = vec![b'z'; 8 << 20];
    let err = tokio::time::timeout(
        Duration::from_secs(30),
        rider::relay_quic(&config, source(&data[..], 4096)),
    )
    .await
    .expect("relay must end after the collector stops the stream")
    .unwrap_err();
    assert!(matches!(err, RelayError::Write(_)), "{err}");

    let received = collector.received().await.unwrap();
    assert_eq!(received.bytes, vec![b'z'; 4096]);
}
