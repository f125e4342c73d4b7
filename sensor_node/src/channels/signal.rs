// channels/signal.rs
//
// Binary wake gate for one sampling task. A raise while already raised
// coalesces into the single pending wake; there is exactly one waiter.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct Signal {
    raised: AtomicBool,
    notify: Notify,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake the owning task. Idempotent until consumed.
    pub fn raise(&self) {
        if !self.raised.swap(true, Ordering::AcqRel) {
            self.notify.notify_one();
        }
    }

    /// Block until raised, then clear.
    ///
    /// `Notify` keeps at most one permit, so a raise that lands between the
    /// flag check and the await is not lost. A stale permit only costs one
    /// extra trip round the loop.
    pub async fn wait_and_consume(&self) {
        loop {
            if self.raised.swap(false, Ordering::AcqRel) {
                return;
            }
            self.notify.notified().await;
        }
    }

    /// Drop a pending raise without waiting. Returns whether one was pending.
    pub fn clear(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}
