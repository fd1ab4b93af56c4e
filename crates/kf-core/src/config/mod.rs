//! Configuration management for kforward

mod cluster;

pub use cluster::{ClusterConfig, PodSpec};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// File name of the cluster configuration
pub const CLUSTER_CONFIG_FILE: &str = "cluster.toml";

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kforward")
}

/// Get the default cluster configuration path.
///
/// `./cluster.toml` wins when it exists, otherwise the file in the
/// per-user configuration directory is used.
pub fn default_cluster_path() -> PathBuf {
    let local = PathBuf::from(CLUSTER_CONFIG_FILE);
    if local.exists() {
        local
    } else {
        default_config_dir().join(CLUSTER_CONFIG_FILE)
    }
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config(&content)
}

/// Parse configuration from TOML text
pub fn parse_config<T: serde::de::DeserializeOwned>(content: &str) -> Result<T, ConfigError> {
    let config: T = toml::from_str(content)?;
    Ok(config)
}

/// Load and validate the cluster configuration, falling back to the default path
pub fn load_cluster_config(path: Option<&Path>) -> Result<ClusterConfig, ConfigError> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_cluster_path);
    tracing::debug!("Loading cluster config from {:?}", path);

    let config: ClusterConfig = load_config(&path)?;
    config.validate()?;
    Ok(config)
}

/// Parse and validate a cluster configuration embedded in the host program
pub fn cluster_config_from_bytes(bytes: &[u8]) -> Result<ClusterConfig, ConfigError> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| ConfigError::Invalid(format!("config is not UTF-8: {}", e)))?;

    let config: ClusterConfig = parse_config(content)?;
    config.validate()?;
    Ok(config)
}
