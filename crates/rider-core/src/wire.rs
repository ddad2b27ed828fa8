//! Wire constants for the relay.
//!
//! The QUIC path has no framing of its own: chunk bytes and keepalive
//! markers are written back to back on a single bidirectional stream.
//! The receiver cannot tell a marker from payload that happens to contain
//! the same six bytes. Changing any value here changes what collectors see.

/// Keepalive payload written on the stream every heartbeat interval.
pub const HEARTBEAT_MARKER: &[u8] = b"|beat|";

/// Application protocol offered during the TLS handshake.
pub const ALPN_PROTOCOL: &str = "rider-protocol";

/// Upper bound on the QUIC handshake plus stream open.
pub const HANDSHAKE_TIMEOUT_SECS: u64 = 3;

/// Period between keepalive markers.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 10;

/// How long the driving loop waits for the forwarder to acknowledge shutdown.
pub const SHUTDOWN_TIMEOUT_MS: u64 = 5_000;

/// Default read size for the plain syslog path. One read = one log message.
pub const SYSLOG_CHUNK_SIZE: usize = 1024;

/// Default read size for the QUIC path.
pub const QUIC_CHUNK_SIZE: usize = 4096;

/// Default collector address for both transports.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:514";

/// Default syslog tag.
pub const DEFAULT_TAG: &str = "redir";
