//! Setup entry points
//!
//! Resolution of every request completes before any tunnel is launched.
//! Configuration, resolution and launch errors abort the setup and are
//! returned directly; nothing is retried.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use kf_core::config::{self, ClusterConfig};
use kf_core::{ClusterDirectory, ForwardError, ForwardRequest, TransportProvider};

use crate::backend::{StaticDirectory, TcpRelay};
use crate::launcher::launch_all;
use crate::resolver::resolve_all;
use crate::session::{failure_channel, Session};

/// Opens sessions of tunnels against one cluster
#[derive(Clone)]
pub struct Forwarder {
    directory: Arc<dyn ClusterDirectory>,
    transport: Arc<dyn TransportProvider>,
}

impl Forwarder {
    /// Create a forwarder over arbitrary collaborators
    pub fn new(
        directory: Arc<dyn ClusterDirectory>,
        transport: Arc<dyn TransportProvider>,
    ) -> Self {
        Self {
            directory,
            transport,
        }
    }

    /// Create a forwarder over the built-in inventory directory and TCP relay
    pub fn from_config(config: &ClusterConfig) -> Self {
        Self::new(
            Arc::new(StaticDirectory::new(config)),
            Arc::new(TcpRelay::new(config)),
        )
    }

    /// Resolve and launch every request, returning the running session.
    ///
    /// Firing `cancel` later closes the session.
    pub async fn forward(
        &self,
        cancel: CancellationToken,
        requests: Vec<ForwardRequest>,
    ) -> Result<Session, ForwardError> {
        tracing::debug!("Resolving {} forward request(s)", requests.len());
        let targets = resolve_all(Arc::clone(&self.directory), &requests).await?;

        let (reporter, failures) = failure_channel();
        let tunnels = launch_all(Arc::clone(&self.transport), targets, reporter).await?;
        tracing::info!("Launched {} tunnel(s)", tunnels.len());

        Ok(Session::new(tunnels, cancel, failures))
    }
}

/// Forward ports using the cluster configuration at `config_path`.
///
/// Without a path, the default location is used.
pub async fn with_forwarders(
    cancel: CancellationToken,
    requests: Vec<ForwardRequest>,
    config_path: Option<&Path>,
) -> Result<Session, ForwardError> {
    let config = config::load_cluster_config(config_path)?;
    Forwarder::from_config(&config).forward(cancel, requests).await
}

/// Forward ports using a cluster configuration embedded in the host program
pub async fn with_forwarders_embedded(
    cancel: CancellationToken,
    requests: Vec<ForwardRequest>,
    config_bytes: &[u8],
) -> Result<Session, ForwardError> {
    let config = config::cluster_config_from_bytes(config_bytes)?;
    Forwarder::from_config(&config).forward(cancel, requests).await
}
