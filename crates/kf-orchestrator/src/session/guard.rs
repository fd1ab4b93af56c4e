//! Exactly-once shutdown guard

use std::sync::atomic::{AtomicBool, Ordering};

/// Lets exactly one caller perform a shutdown.
///
/// Each session owns its own guard; closing one session never affects
/// another.
#[derive(Debug, Default)]
pub struct ShutdownGuard {
    closed: AtomicBool,
}

impl ShutdownGuard {
    /// Create an unclaimed guard
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the shutdown
    ///
    /// Safe to call from any number of threads at once.
    ///
    /// # Returns
    /// `true` for exactly one caller, the one that should perform the
    /// shutdown; `false` for everybody else.
    pub fn try_close(&self) -> bool {
        self.closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether some caller has claimed the shutdown
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
