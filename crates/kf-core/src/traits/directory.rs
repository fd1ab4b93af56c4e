//! Cluster directory trait

use async_trait::async_trait;

use crate::error::DirectoryError;
use crate::types::{Instance, Service};

/// Read-only view of the pods and services of a cluster
#[async_trait]
pub trait ClusterDirectory: Send + Sync {
    /// Look up a pod by namespace and name
    async fn get_instance(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Instance>, DirectoryError>;

    /// Look up a service by namespace and name
    async fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Service>, DirectoryError>;

    /// List pods matching a `key=value,...` label selector.
    ///
    /// At most `limit` pods are returned. The order of the result is up to
    /// the implementation.
    async fn list_instances(
        &self,
        namespace: &str,
        selector: &str,
        limit: usize,
    ) -> Result<Vec<Instance>, DirectoryError>;
}
