//! Cluster access configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::types::{namespace_or_default, Instance, Service};

/// Cluster configuration consumed by the built-in directory and relay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Address local listeners bind to
    pub bind_address: String,

    /// Pods known to the cluster
    pub pods: Vec<PodSpec>,

    /// Services known to the cluster
    pub services: Vec<Service>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            pods: Vec::new(),
            services: Vec::new(),
        }
    }
}

impl ClusterConfig {
    /// Check the inventory for mistakes that would only surface at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::Invalid("bind_address is empty".into()));
        }

        let mut seen = std::collections::HashSet::new();
        for pod in &self.pods {
            if pod.name.is_empty() {
                return Err(ConfigError::Invalid("pod with empty name".into()));
            }
            if !seen.insert((namespace_or_default(&pod.namespace), pod.name.as_str())) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate pod {}/{}",
                    namespace_or_default(&pod.namespace),
                    pod.name
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for svc in &self.services {
            if svc.name.is_empty() {
                return Err(ConfigError::Invalid("service with empty name".into()));
            }
            if !seen.insert((namespace_or_default(&svc.namespace), svc.name.as_str())) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate service {}/{}",
                    namespace_or_default(&svc.namespace),
                    svc.name
                )));
            }
        }

        Ok(())
    }
}

/// A pod entry of the inventory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodSpec {
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Host the relay dials to reach this pod
    #[serde(default)]
    pub address: Option<String>,

    /// Declared container ports
    #[serde(default)]
    pub ports: Vec<u16>,
}

impl PodSpec {
    /// Create a pod entry in the default namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Directory view of this pod
    pub fn instance(&self) -> Instance {
        Instance {
            name: self.name.clone(),
            namespace: namespace_or_default(&self.namespace).to_string(),
            labels: self.labels.clone(),
            ports: self.ports.clone(),
        }
    }

    /// Check if the pod carries `key=value`
    pub fn has_label(&self, key: &str, value: &str) -> bool {
        self.labels.get(key).is_some_and(|v| v == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inventory() {
        let config: ClusterConfig = toml::from_str(
            r#"
            [[pods]]
            name = "web-1"
            address = "10.0.0.5"
            labels = { app = "web" }
            ports = [80]

            [[services]]
            name = "web-svc"
            namespace = "prod"
            selector = { app = "web" }
            ports = [{ port = 80, target_port = 8080 }]
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.pods.len(), 1);
        assert!(config.pods[0].has_label("app", "web"));
        assert_eq!(config.pods[0].instance().namespace, "default");
        assert_eq!(config.services[0].ports[0].target(), 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let config = ClusterConfig {
            pods: vec![
                PodSpec::new("web-1"),
                PodSpec {
                    namespace: "default".into(),
                    ..PodSpec::new("web-1")
                },
            ],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
