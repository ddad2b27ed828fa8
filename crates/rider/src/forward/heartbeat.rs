//! Heartbeat timer — a cancellable periodic tick source.
//!
//! Ticks fire every `period` regardless of data activity. The first tick
//! comes one full period after `start`. Cancellation is best effort: a
//! tick already queued when `cancel` returns is still delivered, after
//! which the tick stream ends.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub struct Heartbeat {
    cancel: oneshot::Sender<()>,
}

pub struct Ticks {
    rx: mpsc::Receiver<()>,
}

pub fn start(period: Duration) -> (Heartbeat, Ticks) {
    let (cancel, mut cancelled) = oneshot::channel();
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut cancelled => break,
                _ = interval.tick() => {}
            }
            // Cancel stays live while a slow consumer holds the send open.
            tokio::select! {
                biased;
                _ = &mut cancelled => break,
                sent = tx.send(()) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("heartbeat timer stopped");
    });

    (Heartbeat { cancel }, Ticks { rx })
}

impl Heartbeat {
    /// Stop the timer. Consumes the handle, so it can only happen once.
    pub fn cancel(self) {
        let _ = self.cancel.send(());
    }
}

impl Ticks {
    /// Next tick, or `None` once the timer has stopped.
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}
