//! Core error types for kforward

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type returned by the forwarding entry points
#[derive(Error, Debug)]
pub enum ForwardError {
    /// Cluster configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A request could not be mapped to a concrete instance
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// A tunnel could not be opened
    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    /// A tunnel failed after it was launched
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Config file exists but could not be read
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors raised while mapping a request to an addressable instance
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// Request names neither a pod nor a service
    #[error("Request #{index} names neither a pod nor a service")]
    NoTargetSpecified { index: usize },

    /// Named pod does not exist
    #[error("Pod not found: {namespace}/{name}")]
    TargetNotFound { name: String, namespace: String },

    /// Named service does not exist
    #[error("Service not found: {namespace}/{name}")]
    ServiceNotFound { name: String, namespace: String },

    /// Service selector matched no pods
    #[error("No pods match service {namespace}/{service} (selector: {selector:?})")]
    NoMatchingInstances {
        service: String,
        namespace: String,
        selector: String,
    },

    /// Locator string could not be parsed
    #[error("Invalid target locator: {0}")]
    InvalidLocator(String),

    /// No remote port was given and none could be inferred
    #[error("No remote port given and none declared for {namespace}/{name}")]
    RemotePortUnknown { name: String, namespace: String },

    /// Directory lookup itself failed
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The lookup task was cancelled before finishing
    #[error(transparent)]
    Cancelled(#[from] JobCancelled),
}

/// Failure of the cluster directory backend
#[derive(Error, Debug, Clone)]
#[error("Directory lookup failed: {0}")]
pub struct DirectoryError(pub String);

/// A concurrent setup job that was cancelled before it finished, which
/// only happens while the runtime is shutting down
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Setup job #{index} was cancelled before finishing")]
pub struct JobCancelled {
    pub index: usize,
}

/// Errors raised while opening a tunnel
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Local listener could not be bound
    #[error("Failed to bind {addr} for {target}: {source}")]
    Bind {
        target: String,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Remote end could not be reached
    #[error("Failed to reach {target}: {reason}")]
    Dial { target: String, reason: String },

    /// Remote end refused the tunnel (auth or negotiation)
    #[error("Tunnel to {target} rejected: {reason}")]
    Rejected { target: String, reason: String },

    /// The launch task was cancelled before finishing
    #[error(transparent)]
    Cancelled(#[from] JobCancelled),
}

/// Errors raised by a tunnel after a successful launch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Relay loop failed
    #[error("Tunnel to {target} failed: {reason}")]
    Relay { target: String, reason: String },

    /// Relay exited before ever signaling readiness
    #[error("Tunnel to {target} exited before becoming ready")]
    EndedBeforeReady { target: String },

    /// Ports were queried before the tunnel was ready
    #[error("Ports of tunnel to {target} are not available")]
    PortsUnavailable { target: String },
}

impl RuntimeError {
    /// Target description carried by this error
    pub fn target(&self) -> &str {
        match self {
            RuntimeError::Relay { target, .. }
            | RuntimeError::EndedBeforeReady { target }
            | RuntimeError::PortsUnavailable { target } => target,
        }
    }
}
