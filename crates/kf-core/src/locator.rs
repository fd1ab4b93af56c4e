//! Parsing of `[namespace/]kind/name` target locators

use crate::error::ResolutionError;
use crate::types::{ObjectRef, TargetRef};

/// Parse a locator string into a pod or service reference.
///
/// Accepted forms:
/// - `name` (a pod in the default namespace)
/// - `po/name`, `pod/name`, `pods/name`
/// - `svc/name`, `service/name`, `services/name`
/// - any of the above prefixed with `namespace/`
pub fn parse_locator(locator: &str) -> Result<TargetRef, ResolutionError> {
    let invalid = || ResolutionError::InvalidLocator(locator.to_string());

    let parts: Vec<&str> = locator.trim().split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(invalid());
    }

    let (namespace, kind, name) = match parts.as_slice() {
        [name] => ("", "pod", *name),
        [kind, name] => ("", *kind, *name),
        [namespace, kind, name] => (*namespace, *kind, *name),
        _ => return Err(invalid()),
    };

    let object = ObjectRef::namespaced(namespace, name);
    match kind.to_ascii_lowercase().as_str() {
        "po" | "pod" | "pods" => Ok(TargetRef::Pod(object)),
        "svc" | "service" | "services" => Ok(TargetRef::Service(object)),
        _ => Err(invalid()),
    }
}
