//! Core domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Namespace used whenever a reference leaves it empty
pub const DEFAULT_NAMESPACE: &str = "default";

/// Return `namespace`, or the default namespace when it is empty
pub fn namespace_or_default(namespace: &str) -> &str {
    if namespace.is_empty() {
        DEFAULT_NAMESPACE
    } else {
        namespace
    }
}

/// Name and namespace of a cluster object
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

impl ObjectRef {
    /// Reference an object in the default namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
        }
    }

    /// Reference an object in an explicit namespace
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Namespace with the default applied
    pub fn namespace(&self) -> &str {
        namespace_or_default(&self.namespace)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace(), self.name)
    }
}

/// What a forward request points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetRef {
    /// A specific pod
    Pod(ObjectRef),
    /// A service; one of its pods is picked
    Service(ObjectRef),
    /// A `[namespace/]kind/name` string, parsed at resolution time
    Locator(String),
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Pod(r) => write!(f, "pod {}", r),
            TargetRef::Service(r) => write!(f, "service {}", r),
            TargetRef::Locator(s) => write!(f, "{}", s),
        }
    }
}

/// One requested tunnel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardRequest {
    /// Local port to listen on (0 picks a free port)
    #[serde(default)]
    pub local_port: u16,
    /// Port on the pod; inferred from the pod or service when absent
    #[serde(default)]
    pub remote_port: Option<u16>,
    /// Target of the tunnel
    #[serde(default)]
    pub target: Option<TargetRef>,
}

impl ForwardRequest {
    /// Forward to a named pod
    pub fn pod(name: impl Into<String>, remote_port: u16) -> Self {
        Self {
            local_port: 0,
            remote_port: Some(remote_port),
            target: Some(TargetRef::Pod(ObjectRef::new(name))),
        }
    }

    /// Forward to one pod behind a named service
    pub fn service(name: impl Into<String>, remote_port: u16) -> Self {
        Self {
            local_port: 0,
            remote_port: Some(remote_port),
            target: Some(TargetRef::Service(ObjectRef::new(name))),
        }
    }

    /// Forward to a `[namespace/]kind/name` locator, remote port inferred
    pub fn locator(locator: impl Into<String>) -> Self {
        Self {
            local_port: 0,
            remote_port: None,
            target: Some(TargetRef::Locator(locator.into())),
        }
    }

    /// Set the namespace of the target.
    ///
    /// A locator that already names a namespace (`ns/kind/name`) keeps it;
    /// otherwise the namespace is prefixed, and a bare pod name becomes
    /// `ns/pod/name`.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        match self.target.as_mut() {
            Some(TargetRef::Pod(r) | TargetRef::Service(r)) => r.namespace = namespace,
            Some(TargetRef::Locator(locator)) if !namespace.is_empty() => {
                match locator.matches('/').count() {
                    0 => *locator = format!("{}/pod/{}", namespace, locator),
                    1 => *locator = format!("{}/{}", namespace, locator),
                    _ => {}
                }
            }
            Some(TargetRef::Locator(_)) | None => {}
        }
        self
    }

    /// Set the local port
    pub fn with_local_port(mut self, port: u16) -> Self {
        self.local_port = port;
        self
    }

    /// Set the remote port
    pub fn with_remote_port(mut self, port: u16) -> Self {
        self.remote_port = Some(port);
        self
    }
}

/// A pod as seen by the cluster directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Declared container ports, in declaration order
    #[serde(default)]
    pub ports: Vec<u16>,
}

/// One port exposed by a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePort {
    pub port: u16,
    /// Port on the selected pod; same as `port` when absent
    #[serde(default)]
    pub target_port: Option<u16>,
}

impl ServicePort {
    /// Pod-side port for this service port
    pub fn target(&self) -> u16 {
        self.target_port.unwrap_or(self.port)
    }
}

/// A service as seen by the cluster directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
}

impl Service {
    /// Label selector string: `key=value` pairs joined with commas
    pub fn label_selector(&self) -> String {
        self.selector
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A request resolved to a concrete pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Position of the originating request
    pub index: usize,
    pub instance: String,
    pub namespace: String,
    /// What the request asked for, e.g. `service default/web-svc`
    pub origin: String,
    pub local_port: u16,
    pub remote_port: u16,
}

impl ResolvedTarget {
    /// `namespace/instance`, used in logs and errors
    pub fn describe(&self) -> String {
        format!("{}/{}", self.namespace, self.instance)
    }
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} {}:{}",
            self.namespace, self.instance, self.local_port, self.remote_port
        )
    }
}

/// Local/remote port pair of a ready tunnel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForwardedPort {
    pub local: u16,
    pub remote: u16,
}

impl fmt::Display for ForwardedPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.local, self.remote)
    }
}

/// Lifecycle state of a tunnel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TunnelState {
    Created = 0,
    Launching = 1,
    Ready = 2,
    Failed = 3,
    Closing = 4,
    Closed = 5,
}

impl TunnelState {
    /// Whether no further transitions are possible
    pub fn is_terminal(self) -> bool {
        matches!(self, TunnelState::Failed | TunnelState::Closed)
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(self, next: TunnelState) -> bool {
        use TunnelState::*;
        matches!(
            (self, next),
            (Created, Launching)
                | (Launching, Ready)
                | (Launching, Failed)
                | (Launching, Closing)
                | (Launching, Closed)
                | (Ready, Failed)
                | (Ready, Closing)
                | (Ready, Closed)
                | (Closing, Closed)
        )
    }
}

impl From<u8> for TunnelState {
    fn from(value: u8) -> Self {
        match value {
            0 => TunnelState::Created,
            1 => TunnelState::Launching,
            2 => TunnelState::Ready,
            3 => TunnelState::Failed,
            4 => TunnelState::Closing,
            _ => TunnelState::Closed,
        }
    }
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelState::Created => write!(f, "created"),
            TunnelState::Launching => write!(f, "launching"),
            TunnelState::Ready => write!(f, "ready"),
            TunnelState::Failed => write!(f, "failed"),
            TunnelState::Closing => write!(f, "closing"),
            TunnelState::Closed => write!(f, "closed"),
        }
    }
}
