//! Cancellable trailing-edge debouncer.
//!
//! Coalesces a burst of restart triggers (editor save + format + auto-save)
//! into a single deferred action. Every [`Debouncer::schedule`] call disarms
//! whatever was pending and restarts the quiet period, so only the most
//! recently registered action can ever fire.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Default quiet period before a scheduled action fires.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Owns at most one armed timer.
///
/// The timer is a tokio task, so `schedule` must be called from inside a
/// runtime. Dropping the debouncer disarms the pending action.
#[derive(Debug)]
pub struct Debouncer {
    /// The currently armed timer, if any.
    pending: Option<JoinHandle<()>>,
    /// How long the trigger stream must stay quiet before firing.
    duration: Duration,
}

impl Debouncer {
    /// Create a new debouncer with the given duration in milliseconds.
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            pending: None,
            duration: Duration::from_millis(debounce_ms),
        }
    }

    /// Arm `action` to run once the quiet period elapses.
    ///
    /// Cancels any previously armed action.
    pub fn schedule<F>(&mut self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        let duration = self.duration;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            action();
        }));
    }

    /// Disarm the pending action. Returns `true` if one was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                let was_waiting = !handle.is_finished();
                handle.abort();
                was_waiting
            }
            None => false,
        }
    }

    /// Check if an action is armed and has not fired yet.
    pub fn has_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// The configured quiet period.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
