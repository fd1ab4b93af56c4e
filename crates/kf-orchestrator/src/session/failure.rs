//! Post-launch tunnel failures

use std::sync::Arc;

use tokio::sync::watch;

use kf_core::RuntimeError;

/// A tunnel that failed after it was launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelFailure {
    /// Position of the tunnel in the request list
    pub index: usize,
    pub error: RuntimeError,
}

/// Sending half of the failure channel, shared by all relay tasks of a session
#[derive(Clone)]
pub struct FailureReporter {
    tx: Arc<watch::Sender<Option<TunnelFailure>>>,
}

impl FailureReporter {
    /// Record a failure; only the first one of a session is kept
    pub fn report(&self, failure: TunnelFailure) {
        self.tx.send_if_modified(|slot| {
            if slot.is_none() {
                *slot = Some(failure);
                true
            } else {
                false
            }
        });
    }
}

/// Create a failure channel for one session
pub fn failure_channel() -> (FailureReporter, watch::Receiver<Option<TunnelFailure>>) {
    let (tx, rx) = watch::channel(None);
    (FailureReporter { tx: Arc::new(tx) }, rx)
}
