//! Fire-once stop and ready signals shared between a session and a tunnel

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Tells a tunnel to stop relaying.
///
/// Cloning shares the same underlying signal. Every call to [`fire`] is
/// counted so callers can verify how often a stop was delivered.
///
/// [`fire`]: StopSignal::fire
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
    deliveries: Arc<AtomicUsize>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver the stop request
    pub fn fire(&self) {
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        self.token.cancel();
    }

    /// Whether the stop request has been delivered
    pub fn is_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve once the stop request has been delivered
    pub async fn fired(&self) {
        self.token.cancelled().await
    }

    /// Number of times [`fire`](StopSignal::fire) was called
    pub fn deliveries(&self) -> usize {
        self.deliveries.load(Ordering::SeqCst)
    }
}

/// Raised by a tunnel once it accepts traffic
#[derive(Debug, Clone, Default)]
pub struct ReadySignal {
    token: CancellationToken,
}

impl ReadySignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the tunnel ready; later calls have no effect
    pub fn notify(&self) {
        self.token.cancel();
    }

    /// Whether the tunnel has signaled readiness
    pub fn is_ready(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve once the tunnel is ready
    pub async fn wait(&self) {
        self.token.cancelled().await
    }
}

/// Signal pair handed to the transport for one tunnel
#[derive(Debug, Clone, Default)]
pub struct TunnelSignals {
    pub stop: StopSignal,
    pub ready: ReadySignal,
}

impl TunnelSignals {
    pub fn new() -> Self {
        Self::default()
    }
}
