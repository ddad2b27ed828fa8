//! Rendezvous handoff between the driving loop and the forwarder.
//!
//! `send` returns only once the forwarder has taken the chunk, so the
//! producer is never more than one chunk ahead of the stream.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

struct Handoff {
    chunk: Bytes,
    taken: oneshot::Sender<()>,
}

/// The forwarder went away before taking the chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("forwarder is gone")]
pub struct Closed;

pub struct ChunkSender {
    tx: mpsc::Sender<Handoff>,
}

pub struct ChunkReceiver {
    rx: mpsc::Receiver<Handoff>,
}

pub fn channel() -> (ChunkSender, ChunkReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (ChunkSender { tx }, ChunkReceiver { rx })
}

impl ChunkSender {
    pub async fn send(&self, chunk: Bytes) -> Result<(), Closed> {
        let (taken, accepted) = oneshot::channel();
        self.tx
            .send(Handoff { chunk, taken })
            .await
            .map_err(|_| Closed)?;
        accepted.await.map_err(|_| Closed)
    }
}

impl ChunkReceiver {
    /// Cancel safe: nothing is taken unless this resolves.
    pub async fn recv(&mut self) -> Option<Bytes> {
        let Handoff { chunk, taken } = self.rx.recv().await?;
        let _ = taken.send(());
        Some(chunk)
    }
}
