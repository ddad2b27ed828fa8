//! Shutdown coordinator — runs once the chunk source is exhausted.
//!
//! Order matters: the heartbeat is cancelled first, then the forwarder is
//! asked to stop and given `timeout` to acknowledge.

use std::time::Duration;

use tokio::sync::oneshot;

use super::forwarder::{ForwarderHandle, ShutdownRequest};
use super::heartbeat::Heartbeat;
use crate::error::RelayError;

/// Returns the stream once the forwarder has finished with it, or `None`
/// if it did not acknowledge in time.
pub async fn drain<W>(
    heartbeat: Heartbeat,
    forwarder: ForwarderHandle<W>,
    timeout: Duration,
) -> Result<Option<W>, RelayError> {
    heartbeat.cancel();

    let ForwarderHandle { task, shutdown, .. } = forwarder;

    let (ack, acked) = oneshot::channel();
    if shutdown.send(ShutdownRequest { ack }).is_err() {
        // Forwarder already exited, most likely on a write error.
        return task.await?.map(Some);
    }

    match tokio::time::timeout(timeout, acked).await {
        Ok(_) => task.await?.map(Some),
        Err(_) => {
            tracing::warn!(?timeout, "forwarder did not acknowledge shutdown, abandoning it");
            task.abort();
            Ok(None)
        }
    }
}
