//! kf-core: Core abstractions and configuration for kforward
//!
//! This crate provides the request and target types, the error taxonomy,
//! the collaborator traits (cluster directory and transport) and the
//! cluster configuration shared by the orchestrator and the CLI.

pub mod config;
pub mod error;
pub mod locator;
pub mod signal;
pub mod traits;
pub mod types;

pub use error::{ConfigError, ForwardError, LaunchError, ResolutionError, RuntimeError};
pub use signal::{ReadySignal, StopSignal, TunnelSignals};
pub use traits::{ClusterDirectory, TransportProvider, Tunnel};
pub use types::{ForwardRequest, ForwardedPort, ObjectRef, ResolvedTarget, TargetRef, TunnelState};
