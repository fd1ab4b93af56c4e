//! Transport traits

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{LaunchError, RuntimeError};
use crate::signal::TunnelSignals;
use crate::types::{ForwardedPort, ResolvedTarget};

/// Opens tunnels from a local port to a port on a pod
#[async_trait]
pub trait TransportProvider: Send + Sync {
    /// Open a tunnel to `target`.
    ///
    /// Dial, authentication and negotiation failures are reported here. The
    /// returned tunnel does not relay anything until [`Tunnel::forward`] is
    /// driven.
    async fn establish(
        &self,
        target: &ResolvedTarget,
        signals: TunnelSignals,
    ) -> Result<Arc<dyn Tunnel>, LaunchError>;
}

/// An established tunnel
#[async_trait]
pub trait Tunnel: Send + Sync {
    /// Relay traffic until the stop signal fires or the stream ends.
    ///
    /// Must raise the ready signal once the local side accepts traffic.
    async fn forward(&self) -> Result<(), RuntimeError>;

    /// Assigned ports; only meaningful once the ready signal fired
    fn ports(&self) -> Result<ForwardedPort, RuntimeError>;
}
