//! One-shot classifier readiness signal
//!
//! An atomic flag for the hot path plus a `watch` channel carrying the
//! single not-ready -> ready transition for anyone who wants the event.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

#[derive(Debug)]
pub struct Readiness {
    ready: AtomicBool,
    tx: watch::Sender<bool>,
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

impl Readiness {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            ready: AtomicBool::new(false),
            tx,
        }
    }

    /// Non-blocking check used on every pass.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Flip to ready. Returns `true` only for the call that performed the
    /// transition; later calls are no-ops.
    pub fn mark_ready(&self) -> bool {
        if self.ready.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.tx.send_replace(true);
        true
    }

    /// Receiver that observes the transition event.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
