//! Cluster directory backed by the static inventory of a cluster config

use async_trait::async_trait;

use kf_core::config::{ClusterConfig, PodSpec};
use kf_core::error::DirectoryError;
use kf_core::types::{namespace_or_default, Instance, Service};
use kf_core::ClusterDirectory;

/// Directory over the pods and services declared in configuration.
///
/// Selector queries return pods in declaration order.
pub struct StaticDirectory {
    pods: Vec<PodSpec>,
    services: Vec<Service>,
}

impl StaticDirectory {
    /// Snapshot the pods and services declared in `config`
    pub fn new(config: &ClusterConfig) -> Self {
        Self {
            pods: config.pods.clone(),
            services: config.services.clone(),
        }
    }

    fn pods_in<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a PodSpec> + 'a {
        self.pods
            .iter()
            .filter(move |p| namespace_or_default(&p.namespace) == namespace)
    }
}

/// Parse `key=value,key2==value2` into equality requirements
fn parse_selector(selector: &str) -> Result<Vec<(&str, &str)>, DirectoryError> {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(parse_term)
        .collect()
}

fn parse_term(term: &str) -> Result<(&str, &str), DirectoryError> {
    let (key, value) = term
        .split_once("==")
        .or_else(|| term.split_once('='))
        .ok_or_else(|| DirectoryError(format!("unsupported selector term {:?}", term)))?;
    Ok((key.trim(), value.trim()))
}

#[async_trait]
impl ClusterDirectory for StaticDirectory {
    async fn get_instance(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Instance>, DirectoryError> {
        Ok(self
            .pods_in(namespace)
            .find(|p| p.name == name)
            .map(PodSpec::instance))
    }

    async fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Service>, DirectoryError> {
        Ok(self
            .services
            .iter()
            .find(|s| s.name == name && namespace_or_default(&s.namespace) == namespace)
            .cloned())
    }

    async fn list_instances(
        &self,
        namespace: &str,
        selector: &str,
        limit: usize,
    ) -> Result<Vec<Instance>, DirectoryError> {
        let requirements = parse_selector(selector)?;
        let limit = if limit == 0 { usize::MAX } else { limit };

        Ok(self
            .pods_in(namespace)
            .filter(|p| requirements.iter().all(|(k, v)| p.has_label(k, v)))
            .take(limit)
            .map(PodSpec::instance)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod(name: &str, namespace: &str, app: &str) -> PodSpec {
        PodSpec {
            namespace: namespace.into(),
            labels: [("app".to_string(), app.to_string())].into_iter().collect(),
            ..PodSpec::new(name)
        }
    }

    fn directory() -> StaticDirectory {
        StaticDirectory::new(&ClusterConfig {
            pods: vec![
                pod("web-1", "", "web"),
                pod("web-2", "default", "web"),
                pod("web-3", "prod", "web"),
                pod("db-0", "", "db"),
            ],
            services: vec![Service {
                name: "web-svc".into(),
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    #[test]
    fn test_parse_selector() {
        assert_eq!(
            parse_selector("app=web, tier==front").unwrap(),
            vec![("app", "web"), ("tier", "front")]
        );
        assert!(parse_selector("").unwrap().is_empty());
        assert!(parse_selector("app").is_err());
    }

    #[tokio::test]
    async fn test_get_instance_by_namespace() {
        let dir = directory();
        let pod = dir.get_instance("default", "web-1").await.unwrap().unwrap();
        assert_eq!(pod.namespace, "default");
        assert!(dir.get_instance("prod", "web-1").await.unwrap().is_none());
        assert!(dir.get_instance("prod", "web-3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_service() {
        let dir = directory();
        assert!(dir.get_service("default", "web-svc").await.unwrap().is_some());
        assert!(dir.get_service("prod", "web-svc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_honors_selector_and_limit() {
        let dir = directory();
        let all = dir.list_instances("default", "app=web", 0).await.unwrap();
        let names: Vec<_> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["web-1", "web-2"]);

        let one = dir.list_instances("default", "app=web", 1).await.unwrap();
        assert_eq!(one.len(), 1);

        let everything = dir.list_instances("default", "", 0).await.unwrap();
        assert_eq!(everything.len(), 3);

        assert!(dir.list_instances("default", "app=cache", 1).await.unwrap().is_empty());
    }
}
