//! Per-tunnel handle owned by a session

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

use kf_core::{ForwardedPort, ResolvedTarget, RuntimeError, Tunnel, TunnelSignals, TunnelState};

use super::failure::{FailureReporter, TunnelFailure};

/// Handle to one tunnel of a session
pub struct TunnelHandle {
    target: ResolvedTarget,
    signals: TunnelSignals,
    state: AtomicU8,
    tunnel: OnceLock<Arc<dyn Tunnel>>,
    failure: OnceLock<RuntimeError>,
    /// Fired when the relay task exits
    finished: CancellationToken,
}

impl TunnelHandle {
    /// Create a handle in the `Created` state with fresh signals
    pub fn new(target: ResolvedTarget) -> Self {
        Self {
            target,
            signals: TunnelSignals::new(),
            state: AtomicU8::new(TunnelState::Created as u8),
            tunnel: OnceLock::new(),
            failure: OnceLock::new(),
            finished: CancellationToken::new(),
        }
    }

    /// Target this tunnel forwards to
    pub fn target(&self) -> &ResolvedTarget {
        &self.target
    }

    /// Stop and ready signals shared with the transport
    pub fn signals(&self) -> &TunnelSignals {
        &self.signals
    }

    /// Current lifecycle state
    pub fn state(&self) -> TunnelState {
        TunnelState::from(self.state.load(Ordering::Acquire))
    }

    /// Move to `next` if the state machine allows it
    ///
    /// # Arguments
    /// * `next` - Desired state
    ///
    /// # Returns
    /// `true` if this call performed the transition, `false` if the current
    /// state does not allow it (for example, the tunnel is already terminal).
    pub fn transition(&self, next: TunnelState) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if !TunnelState::from(current).can_transition_to(next) {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Deliver the stop signal to the tunnel.
    ///
    /// Callers must go through the session's shutdown guard so the signal is
    /// delivered once.
    pub fn request_stop(&self) {
        self.transition(TunnelState::Closing);
        self.signals.stop.fire();
    }

    /// Wait until the tunnel is ready.
    ///
    /// Returns an error instead of waiting forever when the relay exits
    /// without ever becoming ready.
    pub async fn wait_ready(&self) -> Result<(), RuntimeError> {
        tokio::select! {
            biased;
            _ = self.signals.ready.wait() => Ok(()),
            _ = self.finished.cancelled() => {
                if self.signals.ready.is_ready() {
                    Ok(())
                } else {
                    Err(self.failure.get().cloned().unwrap_or_else(|| {
                        RuntimeError::EndedBeforeReady {
                            target: self.target.describe(),
                        }
                    }))
                }
            }
        }
    }

    /// Ports assigned to the tunnel
    pub fn ports(&self) -> Result<ForwardedPort, RuntimeError> {
        match self.tunnel.get() {
            Some(tunnel) => tunnel.ports(),
            None => Err(RuntimeError::PortsUnavailable {
                target: self.target.describe(),
            }),
        }
    }

    /// Whether the relay task has exited
    pub fn is_finished(&self) -> bool {
        self.finished.is_cancelled()
    }

    /// Attach the established tunnel and run its relay in the background
    ///
    /// The relay task moves the handle to `Ready` when the tunnel signals
    /// readiness, and to `Closed` or `Failed` when it exits. Failures not
    /// caused by a stop request are sent to `failures`.
    ///
    /// # Arguments
    /// * `tunnel` - Tunnel returned by the transport provider
    /// * `failures` - Session-wide reporter for runtime failures
    pub fn spawn_relay(self: &Arc<Self>, tunnel: Arc<dyn Tunnel>, failures: FailureReporter) {
        if self.tunnel.set(Arc::clone(&tunnel)).is_err() {
            tracing::warn!("Tunnel to {} already has a relay", self.target.describe());
            return;
        }

        let handle = Arc::clone(self);
        tokio::spawn(async move {
            handle.supervise(tunnel, failures).await;
        });
    }

    async fn supervise(&self, tunnel: Arc<dyn Tunnel>, failures: FailureReporter) {
        let target = self.target.describe();
        let relay = tunnel.forward();
        tokio::pin!(relay);

        let result = tokio::select! {
            biased;
            result = &mut relay => result,
            _ = self.signals.ready.wait() => {
                if self.transition(TunnelState::Ready) {
                    tracing::info!("Tunnel to {} is ready", target);
                }
                relay.await
            }
        };

        match result {
            Ok(()) => {
                self.transition(TunnelState::Closed);
                tracing::info!("Tunnel to {} closed", target);
            }
            Err(e) if self.signals.stop.is_fired() => {
                self.transition(TunnelState::Closed);
                tracing::debug!("Tunnel to {} ended with error after stop: {}", target, e);
            }
            Err(e) => {
                self.transition(TunnelState::Failed);
                tracing::error!("Tunnel to {} ({}) failed: {}", target, self.target.origin, e);
                let _ = self.failure.set(e.clone());
                failures.report(TunnelFailure {
                    index: self.target.index,
                    error: e,
                });
            }
        }

        self.finished.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    use crate::session::failure::failure_channel;

    fn target() -> ResolvedTarget {
        ResolvedTarget {
            index: 0,
            instance: "web-1".into(),
            namespace: "default".into(),
            origin: "pod default/web-1".into(),
            local_port: 0,
            remote_port: 80,
        }
    }

    /// Relay that fails immediately, before ever being ready
    struct Broken;

    #[async_trait]
    impl Tunnel for Broken {
        async fn forward(&self) -> Result<(), RuntimeError> {
            Err(RuntimeError::Relay {
                target: "default/web-1".into(),
                reason: "connection reset".into(),
            })
        }

        fn ports(&self) -> Result<ForwardedPort, RuntimeError> {
            Err(RuntimeError::PortsUnavailable {
                target: "default/web-1".into(),
            })
        }
    }

    #[test]
    fn test_state_machine() {
        let handle = TunnelHandle::new(target());
        assert_eq!(handle.state(), TunnelState::Created);
        assert!(!handle.transition(TunnelState::Ready));
        assert!(handle.transition(TunnelState::Launching));
        assert!(handle.transition(TunnelState::Ready));
        handle.request_stop();
        assert_eq!(handle.state(), TunnelState::Closing);
        assert!(handle.signals().stop.is_fired());
    }

    #[test]
    fn test_ports_before_launch() {
        let handle = TunnelHandle::new(target());
        assert!(matches!(
            handle.ports(),
            Err(RuntimeError::PortsUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_failure_before_ready_unblocks_wait_ready() {
        let handle = Arc::new(TunnelHandle::new(target()));
        handle.transition(TunnelState::Launching);
        let (reporter, rx) = failure_channel();

        handle.spawn_relay(Arc::new(Broken), reporter);

        let err = tokio::time::timeout(Duration::from_secs(1), handle.wait_ready())
            .await
            .expect("wait_ready should not hang")
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Relay { .. }));
        assert_eq!(handle.state(), TunnelState::Failed);
        assert_eq!(rx.borrow().as_ref().map(|f| f.index), Some(0));
    }
}
