//! TCP relay transport
//!
//! Forwards connections from a local port straight to `address:port` of a
//! pod declared in the inventory. The local listener is bound when the
//! tunnel is established, so port conflicts surface as launch errors.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use kf_core::config::ClusterConfig;
use kf_core::types::namespace_or_default;
use kf_core::{
    ForwardedPort, LaunchError, ResolvedTarget, RuntimeError, StopSignal, TransportProvider,
    Tunnel, TunnelSignals,
};

/// Pause after a failed accept before trying again
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Transport relaying local connections to pod addresses over plain TCP
pub struct TcpRelay {
    bind_address: String,
    /// (namespace, pod) -> host to dial
    addresses: HashMap<(String, String), String>,
}

impl TcpRelay {
    /// Create a relay for the pods of `config` that declare an `address`.
    ///
    /// Pods without an address can still be resolved, but establishing a
    /// tunnel to them fails with [`LaunchError::Dial`].
    pub fn new(config: &ClusterConfig) -> Self {
        let addresses = config
            .pods
            .iter()
            .filter_map(|pod| {
                let address = pod.address.clone()?;
                let key = (
                    namespace_or_default(&pod.namespace).to_string(),
                    pod.name.clone(),
                );
                Some((key, address))
            })
            .collect();

        Self {
            bind_address: config.bind_address.clone(),
            addresses,
        }
    }
}

fn bind_error(target: &ResolvedTarget, addr: String, source: io::Error) -> LaunchError {
    match source.kind() {
        io::ErrorKind::AddrInUse => {
            tracing::warn!("Port already in use: {} ({})", addr, target.origin);
        }
        io::ErrorKind::PermissionDenied => {
            tracing::warn!("Permission denied binding to {} ({})", addr, target.origin);
        }
        _ => {}
    }
    LaunchError::Bind {
        target: target.describe(),
        addr,
        source,
    }
}

/// Whether an accept error means the listener itself is unusable.
///
/// Everything else (descriptor exhaustion, aborted handshakes, resets) only
/// affects one pending connection and is retried.
fn is_fatal_accept_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::InvalidInput | io::ErrorKind::NotConnected | io::ErrorKind::Unsupported
    )
}

#[async_trait]
impl TransportProvider for TcpRelay {
    async fn establish(
        &self,
        target: &ResolvedTarget,
        signals: TunnelSignals,
    ) -> Result<Arc<dyn Tunnel>, LaunchError> {
        let key = (target.namespace.clone(), target.instance.clone());
        let host = self
            .addresses
            .get(&key)
            .ok_or_else(|| LaunchError::Dial {
                target: target.describe(),
                reason: "pod has no address".to_string(),
            })?;

        let local_addr = format!("{}:{}", self.bind_address, target.local_port);
        let listener = TcpListener::bind(local_addr.as_str())
            .await
            .map_err(|e| bind_error(target, local_addr.clone(), e))?;
        let bound_addr = listener
            .local_addr()
            .map_err(|e| bind_error(target, local_addr.clone(), e))?;

        tracing::info!(
            "Started port forward: {} -> {} ({}:{}) for {}",
            bound_addr,
            target.describe(),
            host,
            target.remote_port,
            target.origin
        );

        Ok(Arc::new(RelayTunnel {
            target: target.describe(),
            listener: Mutex::new(Some(listener)),
            bound_addr,
            remote_addr: format!("{}:{}", host, target.remote_port),
            remote_port: target.remote_port,
            signals,
            connection_count: AtomicU64::new(0),
        }))
    }
}

/// A bound local listener relaying to one pod
pub struct RelayTunnel {
    target: String,
    listener: Mutex<Option<TcpListener>>,
    bound_addr: SocketAddr,
    remote_addr: String,
    remote_port: u16,
    signals: TunnelSignals,
    connection_count: AtomicU64,
}

impl RelayTunnel {
    /// Handle a failed accept: fatal errors end the tunnel, anything else is
    /// logged and retried after a short pause (or until stopped)
    async fn accept_failed(&self, err: io::Error) -> Result<(), RuntimeError> {
        if is_fatal_accept_error(&err) {
            return Err(RuntimeError::Relay {
                target: self.target.clone(),
                reason: format!("accept failed: {}", err),
            });
        }

        tracing::warn!("Accept error on {} for {}: {}", self.bound_addr, self.target, err);
        tokio::select! {
            _ = self.signals.stop.fired() => {}
            _ = tokio::time::sleep(ACCEPT_RETRY_DELAY) => {}
        }
        Ok(())
    }
}

#[async_trait]
impl Tunnel for RelayTunnel {
    async fn forward(&self) -> Result<(), RuntimeError> {
        let listener = self
            .listener
            .lock()
            .await
            .take()
            .ok_or_else(|| RuntimeError::Relay {
                target: self.target.clone(),
                reason: "tunnel is already forwarding".to_string(),
            })?;

        self.signals.ready.notify();

        let stop = &self.signals.stop;
        loop {
            tokio::select! {
                biased;
                _ = stop.fired() => {
                    tracing::info!(
                        "Port forward {} stopped after {} connection(s)",
                        self.bound_addr,
                        self.connection_count.load(Ordering::Relaxed)
                    );
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        self.connection_count.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!("Accepted connection from {} for {}", peer, self.target);

                        tokio::spawn(relay_connection(
                            stream,
                            self.remote_addr.clone(),
                            stop.clone(),
                        ));
                    }
                    Err(e) => self.accept_failed(e).await?,
                }
            }
        }
    }

    fn ports(&self) -> Result<ForwardedPort, RuntimeError> {
        if !self.signals.ready.is_ready() {
            return Err(RuntimeError::PortsUnavailable {
                target: self.target.clone(),
            });
        }
        Ok(ForwardedPort {
            local: self.bound_addr.port(),
            remote: self.remote_port,
        })
    }
}

/// Bridge one accepted connection to the pod until either side closes or
/// the tunnel stops
async fn relay_connection(mut local: TcpStream, remote_addr: String, stop: StopSignal) {
    let bridge = async {
        if let Err(e) = local.set_nodelay(true) {
            tracing::warn!("Failed to set TCP_NODELAY: {}", e);
        }
        let mut upstream = TcpStream::connect(remote_addr.as_str()).await?;
        if let Err(e) = upstream.set_nodelay(true) {
            tracing::warn!("Failed to set TCP_NODELAY: {}", e);
        }
        tokio::io::copy_bidirectional(&mut local, &mut upstream).await
    };

    tokio::select! {
        _ = stop.fired() => {
            tracing::debug!("Dropping connection to {}: tunnel stopped", remote_addr);
        }
        result = bridge => match result {
            Ok((sent, received)) => {
                tracing::debug!(
                    "Connection to {} closed ({} bytes sent, {} received)",
                    remote_addr,
                    sent,
                    received
                );
            }
            Err(e) => tracing::warn!("Forward connection to {} failed: {}", remote_addr, e),
        },
    }
}
