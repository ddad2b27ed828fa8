//! Error taxonomy for the relay.
//!
//! Every variant is fatal at the point it occurs. End-of-input is not an
//! error and never shows up here.

use std::net::SocketAddr;
use std::time::Duration;

use rider_core::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("failed to read input: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to resolve {addr}: {reason}")]
    Resolve { addr: String, reason: String },

    #[error("failed to dial {peer}: {source}")]
    Dial {
        peer: SocketAddr,
        #[source]
        source: DialFailure,
    },

    #[error("failed to open stream to {peer}: {source}")]
    StreamOpen {
        peer: SocketAddr,
        #[source]
        source: StreamOpenFailure,
    },

    #[error("stream write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("syslog {op} failed: {source}")]
    Sink {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("forwarder task failed: {0}")]
    Forwarder(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RelayError {
    /// Pipeline stage that produced the error, for log output.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Read(_) => "read",
            Self::Resolve { .. } => "resolve",
            Self::Dial { .. } => "dial",
            Self::StreamOpen { .. } => "stream-open",
            Self::Write(_) => "write",
            Self::Sink { .. } => "sink",
            Self::Forwarder(_) => "forward",
            Self::Config(_) => "config",
        }
    }
}

/// Why the secure handshake did not produce a connection.
#[derive(Debug, thiserror::Error)]
pub enum DialFailure {
    #[error("endpoint setup: {0}")]
    Endpoint(#[from] std::io::Error),
    #[error("tls config: {0}")]
    Tls(#[from] rustls::Error),
    #[error("quic config: {0}")]
    Crypto(#[from] quinn::crypto::rustls::NoInitialCipherSuite),
    #[error(transparent)]
    Connect(#[from] quinn::ConnectError),
    #[error(transparent)]
    Connection(#[from] quinn::ConnectionError),
    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),
    #[error("no application protocol negotiated")]
    NoProtocol,
}

#[derive(Debug, thiserror::Error)]
pub enum StreamOpenFailure {
    #[error(transparent)]
    Connection(#[from] quinn::ConnectionError),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}
