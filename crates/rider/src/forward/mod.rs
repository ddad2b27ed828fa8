//! Streaming relay — the driving loop plus the forwarder it feeds.
//!
//! Two units run for the life of a session: the driving loop (chunk
//! source, then shutdown coordinator) and the forwarder task. They share
//! nothing but the rendezvous handoff and the shutdown request.

pub mod forwarder;
pub mod handoff;
pub mod heartbeat;
pub mod shutdown;

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use rider_core::QuicConfig;

pub use forwarder::{ForwardStats, Forwarder, ForwarderHandle, ForwarderState};

use crate::error::RelayError;
use crate::source::ChunkSource;

#[derive(Debug, Clone, Copy)]
pub struct RelaySettings {
    pub heartbeat_interval: Duration,
    pub shutdown_timeout: Duration,
}

impl From<&QuicConfig> for RelaySettings {
    fn from(config: &QuicConfig) -> Self {
        Self {
            heartbeat_interval: config.heartbeat_interval(),
            shutdown_timeout: config.shutdown_timeout(),
        }
    }
}

/// Pump `source` into `stream` until end-of-input, then shut down.
///
/// Returns the stream when the forwarder finished cleanly, `None` when it
/// had to be abandoned after the shutdown timeout.
pub async fn relay<R, W>(
    mut source: ChunkSource<R>,
    stream: W,
    settings: RelaySettings,
) -> Result<Option<W>, RelayError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (data, chunks) = handoff::channel();
    let (heartbeat, ticks) = heartbeat::start(settings.heartbeat_interval);
    let mut forwarder = Forwarder::spawn(stream, chunks, ticks);

    let mut sent = 0u64;
    loop {
        // The forwarder can die on a heartbeat write while input is idle,
        // so it is watched alongside both the read and the handoff.
        let next = tokio::select! {
            next = source.next_chunk() => next,
            done = forwarder.finished() => {
                heartbeat.cancel();
                return Err(forwarder_died(done));
            }
        };

        match next {
            Ok(Some(chunk)) => {
                let handed = tokio::select! {
                    handed = data.send(chunk) => handed,
                    done = forwarder.finished() => {
                        heartbeat.cancel();
                        return Err(forwarder_died(done));
                    }
                };
                if handed.is_err() {
                    heartbeat.cancel();
                    return Err(forwarder_died(forwarder.join().await));
                }
                sent += 1;
            }
            Ok(None) => break,
            Err(e) => {
                heartbeat.cancel();
                forwarder.abort();
                return Err(e);
            }
        }
    }

    tracing::debug!(chunks = sent, "end of input");
    shutdown::drain(heartbeat, forwarder, settings.shutdown_timeout).await
}

/// Error for a forwarder that stopped before it was asked to.
fn forwarder_died<W>(result: Result<W, RelayError>) -> RelayError {
    match result {
        Err(e) => e,
        Ok(_) => RelayError::Write(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "forwarder stopped taking chunks",
        )),
    }
}
