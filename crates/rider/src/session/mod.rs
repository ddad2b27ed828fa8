//! QUIC session establishment.
//!
//! Resolve the destination, complete the TLS handshake and open exactly one
//! bidirectional stream, all inside a single handshake deadline. Nothing is
//! retried: any failure here ends the process.

mod tls;

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use quinn::{Connection, Endpoint, RecvStream, SendStream, VarInt};
use tokio::io::AsyncWrite;
use tokio::time::{timeout, timeout_at, Instant};

use rider_core::QuicConfig;

use crate::error::{DialFailure, RelayError, StreamOpenFailure};

/// An established connection plus its single open stream.
///
/// Writing to a `Session` writes to the stream. Only the forwarder ever
/// holds one.
pub struct Session {
    endpoint: Endpoint,
    connection: Connection,
    send: SendStream,
    // Kept open so the peer does not see the receive side reset.
    _recv: RecvStream,
    peer: SocketAddr,
    protocol: String,
}

impl Session {
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Application protocol the server selected.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Wait up to `linger` for the peer to acknowledge the finished stream,
    /// then close the connection.
    pub async fn close(self, linger: Duration) {
        match timeout(linger, self.send.stopped()).await {
            Ok(Ok(None)) => tracing::debug!(peer = %self.peer, "stream data acknowledged"),
            Ok(Ok(Some(code))) => tracing::debug!(peer = %self.peer, %code, "peer stopped stream"),
            Ok(Err(e)) => tracing::debug!(peer = %self.peer, error = %e, "stream already gone"),
            Err(_) => tracing::warn!(peer = %self.peer, ?linger, "peer did not acknowledge stream"),
        }

        self.connection.close(VarInt::from_u32(0), b"end of input");
        if timeout(linger, self.endpoint.wait_idle()).await.is_err() {
            tracing::debug!(peer = %self.peer, "endpoint did not go idle");
        }
    }
}

impl AsyncWrite for Session {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        AsyncWrite::poll_write(Pin::new(&mut this.send), cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        AsyncWrite::poll_flush(Pin::new(&mut this.send), cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        AsyncWrite::poll_shutdown(Pin::new(&mut this.send), cx)
    }
}

// ── Establishment ─────────────────────────────────────────────────────────────

pub async fn establish(config: &QuicConfig) -> Result<Session, RelayError> {
    let peer = resolve(&config.address).await?;
    let server_name = host_of(&config.address);
    let handshake_timeout = config.handshake_timeout();
    let deadline = Instant::now() + handshake_timeout;

    let dial = |source: DialFailure| RelayError::Dial { peer, source };

    let client_config = tls::client_config(&config.alpn).map_err(dial)?;
    let bind: SocketAddr = if peer.is_ipv6() {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    };
    let mut endpoint = Endpoint::client(bind).map_err(|e| dial(e.into()))?;
    endpoint.set_default_client_config(client_config);

    tracing::debug!(%peer, server_name, alpn = %config.alpn, "dialing");
    let connecting = endpoint
        .connect(peer, server_name)
        .map_err(|e| dial(e.into()))?;

    let connection = match timeout_at(deadline, connecting).await {
        Ok(Ok(connection)) => connection,
        Ok(Err(e)) => return Err(dial(e.into())),
        Err(_) => return Err(dial(DialFailure::Timeout(handshake_timeout))),
    };

    let protocol = negotiated_protocol(&connection).ok_or_else(|| dial(DialFailure::NoProtocol))?;

    let (send, recv) = match timeout_at(deadline, connection.open_bi()).await {
        Ok(Ok(streams)) => streams,
        Ok(Err(e)) => {
            return Err(RelayError::StreamOpen {
                peer,
                source: e.into(),
            })
        }
        Err(_) => {
            return Err(RelayError::StreamOpen {
                peer,
                source: StreamOpenFailure::Timeout(handshake_timeout),
            })
        }
    };

    tracing::info!(%peer, protocol = %protocol, stream = %send.id(), "session established");

    Ok(Session {
        endpoint,
        connection,
        send,
        _recv: recv,
        peer,
        protocol,
    })
}

async fn resolve(addr: &str) -> Result<SocketAddr, RelayError> {
    let resolve_err = |reason: String| RelayError::Resolve {
        addr: addr.to_string(),
        reason,
    };

    let mut addrs = tokio::net::lookup_host(addr)
        .await
        .map_err(|e| resolve_err(e.to_string()))?;
    addrs
        .next()
        .ok_or_else(|| resolve_err("no addresses found".into()))
}

/// Host part of `host:port`, without IPv6 brackets. Used as the TLS server name.
fn host_of(addr: &str) -> &str {
    let host = match addr.rsplit_once(':') {
        Some((host, _port)) => host,
        None => addr,
    };
    host.trim_start_matches('[').trim_end_matches(']')
}

fn negotiated_protocol(connection: &Connection) -> Option<String> {
    let data = connection
        .handshake_data()?
        .downcast::<quinn::crypto::rustls::HandshakeData>()
        .ok()?;
    data.protocol
        .map(|p| String::from_utf8_lossy(&p).into_owned())
}
