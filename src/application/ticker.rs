use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Handle to a running interval task. Cancelling (or dropping) the handle
/// aborts the task; the engine's `running` flag covers the window where a
/// tick was already queued when the caller paused.
pub struct TickerHandle {
    task: JoinHandle<()>,
}

impl TickerHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawns a periodic callback on the ambient tokio runtime. The first
/// invocation happens one full `period` after the call, not immediately.
/// Missed ticks are skipped rather than bursted.
pub fn spawn_interval<F>(period: Duration, mut callback: F) -> TickerHandle
where
    F: FnMut() + Send + 'static,
{
    let task = tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer.tick().await;
        loop {
            timer.tick().await;
            callback();
        }
    });
    TickerHandle { task }
}
