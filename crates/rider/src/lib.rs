//! rider — relay raw input bytes to a remote log collector.
//!
//! Two transports: plain syslog (one message per chunk) and an experimental
//! QUIC stream where a single forwarder task multiplexes data chunks with a
//! periodic keepalive marker.

pub mod error;
pub mod forward;
pub mod session;
pub mod source;
pub mod syslog;

use std::num::NonZeroUsize;

use tokio::io::AsyncRead;

use rider_core::{ConfigError, QuicConfig, RiderConfig, SyslogConfig};

pub use error::RelayError;
pub use forward::{relay, RelaySettings};
pub use session::Session;
pub use source::ChunkSource;

/// Run the configured transport over stdin until end-of-input.
pub async fn run(config: &RiderConfig) -> Result<(), RelayError> {
    config.validate()?;
    let chunk_size = NonZeroUsize::new(config.effective_chunk_size())
        .ok_or_else(|| ConfigError::Invalid("chunk size must be positive".into()))?;
    let source = ChunkSource::new(tokio::io::stdin(), chunk_size);

    if config.experimental {
        relay_quic(&config.quic, source).await
    } else {
        relay_syslog(&config.syslog, source).await
    }
}

/// Establish a session and stream `source` over it.
pub async fn relay_quic<R>(config: &QuicConfig, source: ChunkSource<R>) -> Result<(), RelayError>
where
    R: AsyncRead + Unpin,
{
    let settings = RelaySettings::from(config);
    let session = session::establish(config).await?;
    let peer = session.peer();

    match relay(source, session, settings).await? {
        Some(session) => session.close(settings.shutdown_timeout).await,
        None => tracing::warn!(%peer, "session abandoned without close"),
    }
    Ok(())
}

/// Write every chunk of `source` as one syslog message.
pub async fn relay_syslog<R>(
    config: &SyslogConfig,
    mut source: ChunkSource<R>,
) -> Result<(), RelayError>
where
    R: AsyncRead + Unpin,
{
    let mut sink = syslog::SyslogSink::connect(config).await?;
    syslog::forward(&mut source, &mut sink).await?;
    Ok(())
}
