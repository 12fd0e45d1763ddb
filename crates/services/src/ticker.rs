use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Countdown tick period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Marker event emitted once per tick period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick;

/// Handle to the repeating countdown task.
///
/// The session engine must stop the ticker whenever the session leaves
/// `InProgress`; a tick that outlives the state machine is a leaked
/// callback. Dropping the handle aborts the task as a backstop.
pub struct Ticker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawn the tick task and return its handle plus the event receiver.
    #[must_use]
    pub fn spawn(period: Duration) -> (Self, mpsc::Receiver<Tick>) {
        let (tx, rx) = mpsc::channel(1);
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut tick = interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = tick.tick() => {
                        if tx.send(Tick).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        (Self { shutdown, handle }, rx)
    }

    /// Stop the recurring schedule. Safe to call once the session reaches a
    /// terminal phase; pending ticks are discarded.
    pub fn stop(self) {
        let _ = self.shutdown.send(true);
        // Drop aborts the task, so a receiver stuck on a full channel
        // cannot keep the loop alive.
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
