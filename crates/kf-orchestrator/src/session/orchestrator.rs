//! The session returned to callers
//!
//! A `Session` owns every tunnel created by one setup call. It reports
//! readiness and assigned ports, and closes all tunnels exactly once no
//! matter how many callers (or the cancellation watcher) ask for it.
//!
//! # Close semantics
//!
//! Closing goes through a [`ShutdownGuard`] owned by the session. The first
//! caller fires every tunnel's stop signal; any later or concurrent call is a
//! no-op. Firing the cancellation token given at setup time is equivalent to
//! calling [`Session::close`]. Dropping the session closes it as well.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use kf_core::{ForwardedPort, ResolvedTarget, RuntimeError, TunnelState};

use super::failure::TunnelFailure;
use super::guard::ShutdownGuard;
use super::handle::TunnelHandle;
use crate::interrupt::{InterruptSource, OsSignals};

/// A set of running tunnels sharing one shutdown guard
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    tunnels: Vec<Arc<TunnelHandle>>,
    guard: ShutdownGuard,
    /// Fired once the guard has been claimed and every stop signal sent
    closed: CancellationToken,
    failures: watch::Receiver<Option<TunnelFailure>>,
}

impl SessionInner {
    fn close(&self) -> bool {
        if !self.guard.try_close() {
            tracing::debug!("Session already closed");
            return false;
        }

        tracing::info!("Closing {} tunnel(s)", self.tunnels.len());
        for tunnel in &self.tunnels {
            tunnel.request_stop();
        }
        self.closed.cancel();
        true
    }
}

impl Session {
    /// Wrap launched tunnels and start watching `cancel`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        tunnels: Vec<Arc<TunnelHandle>>,
        cancel: CancellationToken,
        failures: watch::Receiver<Option<TunnelFailure>>,
    ) -> Self {
        let inner = Arc::new(SessionInner {
            tunnels,
            guard: ShutdownGuard::new(),
            closed: CancellationToken::new(),
            failures,
        });

        let watcher = Arc::clone(&inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Cancellation requested, closing session");
                    watcher.close();
                }
                _ = watcher.closed.cancelled() => {}
            }
        });

        Self { inner }
    }

    /// Stop every tunnel.
    ///
    /// Returns true if this call performed the shutdown, false if the session
    /// was already closed.
    pub fn close(&self) -> bool {
        self.inner.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.guard.is_closed()
    }

    /// Resolve once the session has been closed by anyone
    pub async fn closed(&self) {
        self.inner.closed.cancelled().await
    }

    /// Wait for every tunnel to become ready, then report their ports.
    ///
    /// Tunnels are awaited one by one in request order. There is no timeout:
    /// a tunnel that never becomes ready blocks this call until it exits.
    pub async fn ready(&self) -> Result<Vec<ForwardedPort>, RuntimeError> {
        for tunnel in &self.inner.tunnels {
            tunnel.wait_ready().await?;
        }

        self.inner
            .tunnels
            .iter()
            .map(|tunnel| tunnel.ports())
            .collect()
    }

    /// Block until the process is asked to terminate, then close.
    ///
    /// Also returns when the session is closed by another caller, and with
    /// the error when a tunnel fails after launch.
    pub async fn wait(&self) -> Result<(), RuntimeError> {
        self.wait_for(&OsSignals).await
    }

    /// Like [`Session::wait`], with a custom interrupt source
    pub async fn wait_for<S>(&self, source: &S) -> Result<(), RuntimeError>
    where
        S: InterruptSource + ?Sized,
    {
        tokio::select! {
            _ = source.interrupted() => {
                tracing::info!("Bye...");
                self.close();
                Ok(())
            }
            _ = self.closed() => Ok(()),
            failure = self.failed() => {
                self.close();
                Err(failure.error)
            }
        }
    }

    /// First tunnel failure after launch, if any
    pub fn failure(&self) -> Option<TunnelFailure> {
        self.inner.failures.borrow().clone()
    }

    /// Resolve with the first tunnel failure after launch
    pub async fn failed(&self) -> TunnelFailure {
        let mut rx = self.inner.failures.clone();
        let failure = match rx.wait_for(Option::is_some).await {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };

        match failure {
            Some(failure) => failure,
            // Every relay exited cleanly; nothing can fail any more
            None => std::future::pending().await,
        }
    }

    /// Current state of every tunnel, in request order
    pub fn states(&self) -> Vec<TunnelState> {
        self.inner.tunnels.iter().map(|t| t.state()).collect()
    }

    /// Resolved target of every tunnel, in request order
    pub fn targets(&self) -> Vec<ResolvedTarget> {
        self.inner
            .tunnels
            .iter()
            .map(|t| t.target().clone())
            .collect()
    }

    /// Number of tunnels
    pub fn len(&self) -> usize {
        self.inner.tunnels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.tunnels.is_empty()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.inner.close();
    }
}
