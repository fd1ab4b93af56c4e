//! Target resolution
//!
//! Maps each forward request to one concrete pod. A pod reference is looked
//! up directly; a service reference is turned into a label selector and the
//! first pod the directory returns for it is used.

use std::fmt;
use std::sync::Arc;

use kf_core::error::ResolutionError;
use kf_core::locator::parse_locator;
use kf_core::types::{namespace_or_default, ForwardRequest, ObjectRef, ResolvedTarget, TargetRef};
use kf_core::ClusterDirectory;

use crate::fanout::fan_out;

/// Resolve every request concurrently, preserving request order.
///
/// All lookups run to completion even when one fails; the error of the
/// first failing lookup is returned.
pub async fn resolve_all(
    directory: Arc<dyn ClusterDirectory>,
    requests: &[ForwardRequest],
) -> Result<Vec<ResolvedTarget>, ResolutionError> {
    let jobs = requests.iter().cloned().enumerate().map(|(index, request)| {
        let directory = Arc::clone(&directory);
        async move { resolve_one(directory.as_ref(), index, &request).await }
    });

    fan_out(jobs).await.into_result()
}

/// Resolve a single request
pub async fn resolve_one(
    directory: &dyn ClusterDirectory,
    index: usize,
    request: &ForwardRequest,
) -> Result<ResolvedTarget, ResolutionError> {
    let lookup = lookup_of(index, request)?;
    let origin = lookup.to_string();
    let (instance, namespace, declared_port) = match &lookup {
        Lookup::Pod(pod) => resolve_pod(directory, pod).await?,
        Lookup::Service(svc) => resolve_service(directory, svc).await?,
    };

    let remote_port = request.remote_port.or(declared_port).ok_or_else(|| {
        ResolutionError::RemotePortUnknown {
            name: instance.clone(),
            namespace: namespace.clone(),
        }
    })?;

    Ok(ResolvedTarget {
        index,
        instance,
        namespace,
        origin,
        local_port: request.local_port,
        remote_port,
    })
}

enum Lookup {
    Pod(ObjectRef),
    Service(ObjectRef),
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Pod(pod) => write!(f, "pod {}", pod),
            Lookup::Service(svc) => write!(f, "service {}", svc),
        }
    }
}

fn lookup_of(index: usize, request: &ForwardRequest) -> Result<Lookup, ResolutionError> {
    let target = match &request.target {
        None => return Err(ResolutionError::NoTargetSpecified { index }),
        Some(TargetRef::Locator(locator)) => parse_locator(locator)?,
        Some(target) => target.clone(),
    };

    match target {
        TargetRef::Pod(pod) if !pod.name.is_empty() => Ok(Lookup::Pod(pod)),
        TargetRef::Service(svc) if !svc.name.is_empty() => Ok(Lookup::Service(svc)),
        _ => Err(ResolutionError::NoTargetSpecified { index }),
    }
}

/// Returns (pod name, namespace, first declared pod port)
async fn resolve_pod(
    directory: &dyn ClusterDirectory,
    pod: &ObjectRef,
) -> Result<(String, String, Option<u16>), ResolutionError> {
    let namespace = pod.namespace().to_string();

    let instance = directory
        .get_instance(&namespace, &pod.name)
        .await?
        .ok_or_else(|| ResolutionError::TargetNotFound {
            name: pod.name.clone(),
            namespace: namespace.clone(),
        })?;

    tracing::debug!("Resolved pod {}/{}", namespace, instance.name);
    Ok((instance.name, namespace, instance.ports.first().copied()))
}

/// Returns (pod name, namespace, target port of the first service port)
async fn resolve_service(
    directory: &dyn ClusterDirectory,
    svc: &ObjectRef,
) -> Result<(String, String, Option<u16>), ResolutionError> {
    let namespace = svc.namespace().to_string();

    let service = directory
        .get_service(&namespace, &svc.name)
        .await?
        .ok_or_else(|| ResolutionError::ServiceNotFound {
            name: svc.name.clone(),
            namespace: namespace.clone(),
        })?;

    let selector = service.label_selector();
    let instance = directory
        .list_instances(&namespace, &selector, 1)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ResolutionError::NoMatchingInstances {
            service: svc.name.clone(),
            namespace: namespace.clone(),
            selector: selector.clone(),
        })?;

    tracing::info!("Forwarding service {} to pod {}", svc.name, instance.name);

    let pod_namespace = namespace_or_default(&instance.namespace).to_string();
    let declared_port = service.ports.first().map(|p| p.target());
    Ok((instance.name, pod_namespace, declared_port))
}
