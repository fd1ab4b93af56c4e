//! Tunnel launching
//!
//! Opens one tunnel per resolved target through the transport provider.
//! Each launch runs in its own task; relays keep running in the background
//! after the launch returns.

use std::sync::Arc;

use kf_core::{LaunchError, ResolvedTarget, TransportProvider, TunnelState};

use crate::fanout::fan_out;
use crate::session::{FailureReporter, TunnelHandle};

/// Launch a tunnel for every target, preserving target order.
///
/// When any launch fails, the tunnels that did open are stopped and the
/// first launch error is returned.
pub async fn launch_all(
    transport: Arc<dyn TransportProvider>,
    targets: Vec<ResolvedTarget>,
    failures: FailureReporter,
) -> Result<Vec<Arc<TunnelHandle>>, LaunchError> {
    let jobs = targets.into_iter().map(|target| {
        let transport = Arc::clone(&transport);
        let failures = failures.clone();
        async move { launch_one(transport.as_ref(), target, failures).await }
    });

    let gathered = fan_out(jobs).await;
    if gathered.first_error.is_some() {
        for handle in gathered.slots.iter().flatten() {
            handle.request_stop();
        }
    }
    gathered.into_result()
}

/// Launch a single tunnel
///
/// # Arguments
/// * `transport` - Provider used to establish the tunnel
/// * `target` - Resolved target to forward to
/// * `failures` - Where runtime failures of the relay are reported
///
/// # Returns
/// The handle of the running tunnel. On error the handle is discarded in
/// the `Failed` state and nothing keeps running.
pub async fn launch_one(
    transport: &dyn TransportProvider,
    target: ResolvedTarget,
    failures: FailureReporter,
) -> Result<Arc<TunnelHandle>, LaunchError> {
    let handle = Arc::new(TunnelHandle::new(target));
    handle.transition(TunnelState::Launching);
    tracing::debug!("Launching tunnel {}", handle.target());

    match transport
        .establish(handle.target(), handle.signals().clone())
        .await
    {
        Ok(tunnel) => {
            handle.spawn_relay(tunnel, failures);
            Ok(handle)
        }
        Err(e) => {
            handle.transition(TunnelState::Failed);
            tracing::warn!("Failed to launch tunnel {}: {}", handle.target(), e);
            Err(e)
        }
    }
}
