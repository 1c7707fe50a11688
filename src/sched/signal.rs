//! One-shot synchronization signal.
//!
//! A `Signal` fires exactly once; `fire` is idempotent and `wait` is
//! cancel-safe and re-awaitable, so it can sit inside a `select!` loop.
//! Transactions use one per lifecycle boundary (start, end).

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Default)]
pub(crate) struct Signal {
    fired: AtomicBool,
    notify: Notify,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Subsequent calls are no-ops.
    pub(crate) fn fire(&self) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub(crate) fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Wait until the signal has fired. Returns immediately if it already
    /// has.
    pub(crate) async fn wait(&self) {
        while !self.is_fired() {
            // Register before the re-check so a fire() between the check and
            // the await still wakes us.
            let notified = self.notify.notified();
            if self.is_fired() {
                return;
            }
            notified.await;
        }
    }
}
