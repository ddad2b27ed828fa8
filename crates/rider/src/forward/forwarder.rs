//! Forwarder — the only writer on the outbound stream.
//!
//! One task owns the stream and services heartbeat ticks, data chunks and
//! the shutdown request as they become ready. Each event is written with a
//! single `write_all` that completes before the next event is looked at,
//! so markers and chunks never interleave mid-write. There is no priority
//! between a ready tick and a ready chunk.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use rider_core::wire::HEARTBEAT_MARKER;

use super::handoff::ChunkReceiver;
use super::heartbeat::Ticks;
use crate::error::RelayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwarderState {
    Streaming,
    /// Input is exhausted. Entered when the tick stream ends or the
    /// shutdown request arrives, whichever is first.
    Draining,
    Closed,
}

/// Sent once by the shutdown coordinator. The forwarder answers on `ack`
/// after it has left its loop and finished the stream.
pub struct ShutdownRequest {
    pub ack: oneshot::Sender<()>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ForwardStats {
    pub chunks: u64,
    pub bytes: u64,
    pub beats: u64,
}

pub struct Forwarder<W> {
    stream: W,
    data: ChunkReceiver,
    ticks: Ticks,
    shutdown: oneshot::Receiver<ShutdownRequest>,
    state: watch::Sender<ForwarderState>,
    stats: ForwardStats,
}

pub struct ForwarderHandle<W> {
    pub(crate) task: JoinHandle<Result<W, RelayError>>,
    pub(crate) shutdown: oneshot::Sender<ShutdownRequest>,
    state: watch::Receiver<ForwarderState>,
}

impl<W> Forwarder<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Start the forwarder on its own task.
    pub fn spawn(stream: W, data: ChunkReceiver, ticks: Ticks) -> ForwarderHandle<W> {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (state_tx, state_rx) = watch::channel(ForwarderState::Streaming);

        let forwarder = Self {
            stream,
            data,
            ticks,
            shutdown: shutdown_rx,
            state: state_tx,
            stats: ForwardStats::default(),
        };

        ForwarderHandle {
            task: tokio::spawn(forwarder.run()),
            shutdown: shutdown_tx,
            state: state_rx,
        }
    }

    async fn run(mut self) -> Result<W, RelayError> {
        let mut ticks_open = true;
        let mut data_open = true;

        let request = loop {
            tokio::select! {
                tick = self.ticks.recv(), if ticks_open => match tick {
                    Some(()) => self.write_heartbeat().await?,
                    None => {
                        ticks_open = false;
                        self.set_state(ForwarderState::Draining);
                    }
                },

                chunk = self.data.recv(), if data_open => match chunk {
                    Some(chunk) => self.write_chunk(&chunk).await?,
                    None => {
                        tracing::debug!("chunk sender dropped");
                        data_open = false;
                    }
                },

                req = &mut self.shutdown => break req.ok(),
            }
        };

        // The request itself means end-of-input, even if the tick stream
        // has not closed yet.
        self.set_state(ForwarderState::Draining);
        self.stream.shutdown().await.map_err(RelayError::Write)?;
        self.set_state(ForwarderState::Closed);

        let ForwardStats { chunks, bytes, beats } = self.stats;
        tracing::info!(chunks, bytes, beats, "forwarder finished");

        if let Some(req) = request {
            let _ = req.ack.send(());
        }
        Ok(self.stream)
    }

    async fn write_heartbeat(&mut self) -> Result<(), RelayError> {
        self.stream
            .write_all(HEARTBEAT_MARKER)
            .await
            .map_err(RelayError::Write)?;
        self.stats.beats += 1;
        tracing::trace!(beats = self.stats.beats, "heartbeat written");
        Ok(())
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), RelayError> {
        self.stream
            .write_all(chunk)
            .await
            .map_err(RelayError::Write)?;
        self.stats.chunks += 1;
        self.stats.bytes += chunk.len() as u64;
        tracing::trace!(len = chunk.len(), "chunk written");
        Ok(())
    }

    fn set_state(&self, next: ForwarderState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            tracing::debug!(?prev, ?next, "forwarder state");
        }
    }
}

impl<W> ForwarderHandle<W> {
    pub fn state(&self) -> ForwarderState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ForwarderState> {
        self.state.clone()
    }

    /// Wait for the task and surface its result.
    pub async fn join(self) -> Result<W, RelayError> {
        self.task.await?
    }

    /// Resolves when the task ends on its own. Must not be polled again
    /// after it has resolved.
    pub async fn finished(&mut self) -> Result<W, RelayError> {
        (&mut self.task).await?
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}
