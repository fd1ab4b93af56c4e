//! Interrupt sources for blocking waits

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Something that eventually asks the process to stop
#[async_trait]
pub trait InterruptSource: Send + Sync {
    /// Resolve when an interrupt arrives
    async fn interrupted(&self);
}

/// Ctrl+C, and SIGTERM on unix
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSignals;

#[async_trait]
impl InterruptSource for OsSignals {
    async fn interrupted(&self) {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }
    }
}

#[async_trait]
impl InterruptSource for CancellationToken {
    async fn interrupted(&self) {
        self.cancelled().await
    }
}
