//! Cancellable polling tasks.
//!
//! DESIGN
//! ======
//! A poll task runs its tick immediately and then on a fixed interval. A
//! failed tick doubles the wait before the next attempt, capped at the
//! configured maximum; the first success resets it to the base interval.
//!
//! The owner holds a `PollHandle`. Calling `stop()` or dropping the handle
//! ends the task, including a tick that is still in flight, so a poller never
//! outlives whatever started it (an SSE stream, the server).

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_backoff: Duration,
}

impl PollConfig {
    #[must_use]
    pub fn new(interval: Duration, max_backoff: Duration) -> Self {
        Self { interval, max_backoff }
    }
}

/// Wait before the next tick after `failures` consecutive failed ticks.
#[must_use]
pub fn next_delay(config: PollConfig, failures: u32) -> Duration {
    if failures == 0 {
        return config.interval;
    }
    let cap = config.max_backoff.max(config.interval);
    let factor = 2_u32.checked_pow(failures.min(16)).unwrap_or(u32::MAX);
    config.interval.checked_mul(factor).map_or(cap, |d| d.min(cap))
}

/// Owner side of a running poll task.
pub struct PollHandle {
    name: &'static str,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Signal the task to end. Idempotent.
    pub fn stop(&self) {
        if !*self.stop.borrow() {
            debug!(poller = self.name, "poller stop requested");
        }
        self.stop.send_replace(true);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop.send_replace(true);
    }
}

/// Spawn a poll task running `tick` until the returned handle is stopped or
/// dropped.
pub fn spawn_poll<F, Fut, E>(name: &'static str, config: PollConfig, mut tick: F) -> PollHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let (stop, mut stopped) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut failures = 0_u32;
        loop {
            tokio::select! {
                _ = stopped.changed() => break,
                result = tick() => match result {
                    Ok(()) => failures = 0,
                    Err(e) => {
                        failures = failures.saturating_add(1);
                        warn!(poller = name, error = %e, failures, "poll tick failed");
                    }
                },
            }

            let delay = next_delay(config, failures);
            tokio::select! {
                _ = stopped.changed() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }
        debug!(poller = name, "poller stopped");
    });
    PollHandle { name, stop, task }
}

#[cfg(test)]
#[path = "poller_test.rs"]
mod tests;
