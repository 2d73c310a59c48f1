//! Interval-driven polling loop

use parking_lot::Mutex;
use std::sync::Weak;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Something the polling loop advances
pub trait PollTarget: Send + Sync + 'static {
    /// Advance all in-flight work by one tick
    fn poll_tick(&self);

    /// Called once when the loop's token is cancelled
    fn on_cancel(&self);
}

/// Tokio task that calls [`PollTarget::poll_tick`] on a fixed interval
///
/// The loop holds only a weak reference to its target and exits when the
/// target is dropped or the token is cancelled. Dropping the `PollingLoop`
/// cancels it.
pub struct PollingLoop {
    cancel: CancellationToken,
    ticks: Arc<AtomicU64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollingLoop {
    /// Spawn the loop on the current Tokio runtime
    pub fn spawn<T: PollTarget>(target: Weak<T>, interval: Duration, cancel: CancellationToken) -> Self {
        let ticks = Arc::new(AtomicU64::new(0));
        let task = tokio::spawn(run(target, interval, cancel.clone(), Arc::clone(&ticks)));

        Self {
            cancel,
            ticks,
            task: Mutex::new(Some(task)),
        }
    }

    /// Stop the loop
    ///
    /// The target's [`on_cancel`](PollTarget::on_cancel) runs on the loop task.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the loop has been told to stop
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Number of ticks run so far
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Stop the loop and wait for the task to exit
    pub async fn join(&self) {
        self.stop();
        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
            && e.is_panic()
        {
            tracing::error!("polling loop panicked");
        }
    }
}

impl Drop for PollingLoop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for PollingLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingLoop")
            .field("stopped", &self.is_stopped())
            .field("ticks", &self.tick_count())
            .finish()
    }
}

async fn run<T: PollTarget>(
    target: Weak<T>,
    period: Duration,
    cancel: CancellationToken,
    ticks: Arc<AtomicU64>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::debug!(?period, "polling loop started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                if let Some(target) = target.upgrade() {
                    target.on_cancel();
                }
                break;
            }
            _ = interval.tick() => {
                let Some(target) = target.upgrade() else {
                    break;
                };
                target.poll_tick();
                ticks.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    tracing::debug!(ticks = ticks.load(Ordering::Relaxed), "polling loop stopped");
}
