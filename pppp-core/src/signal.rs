//! Single-use readiness notification.
//!
//! Fired by the dispatch task when the device reports P2P-ready and
//! awaited by `Session::connect`. Firing never blocks, and a second
//! fire is reported back to the caller instead of being queued.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct ReadySignal {
    fired: AtomicBool,
    notify: Notify,
}

impl ReadySignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Returns `false` if it had already fired.
    pub fn fire(&self) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.notify.notify_waiters();
        true
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Wait until the signal fires; returns immediately if it already has.
    pub async fn wait(&self) {
        loop {
            // Register before checking the flag so a concurrent `fire`
            // cannot slip in between.
            let notified = self.notify.notified();
            if self.is_fired() {
                return;
            }
            notified.await;
        }
    }
}
