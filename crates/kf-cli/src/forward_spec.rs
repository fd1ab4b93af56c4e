//! Parsing of `-f LOCATOR[=[LOCAL:]REMOTE]` arguments

use kf_core::locator::parse_locator;
use kf_core::{ForwardRequest, ResolutionError};

/// A `--forward` argument that could not be parsed
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error(transparent)]
    Locator(#[from] ResolutionError),

    #[error("Invalid port {value:?} in {spec:?}")]
    Port { spec: String, value: String },

    #[error("Empty port mapping in {0:?}")]
    EmptyMapping(String),
}

/// Parse one forward argument into a request.
///
/// Forms:
/// - `svc/web` forwards a free local port to the inferred remote port
/// - `svc/web=80` forwards a free local port to port 80
/// - `svc/web=8080:80` forwards local port 8080 to port 80
pub fn parse_forward_spec(spec: &str) -> Result<ForwardRequest, SpecError> {
    let (locator, mapping) = match spec.split_once('=') {
        Some((locator, mapping)) => (locator, Some(mapping)),
        None => (spec, None),
    };

    let mut request = ForwardRequest {
        target: Some(parse_locator(locator)?),
        ..Default::default()
    };

    let Some(mapping) = mapping else {
        return Ok(request);
    };
    if mapping.trim().is_empty() {
        return Err(SpecError::EmptyMapping(spec.to_string()));
    }

    let port = |value: &str| {
        value.trim().parse::<u16>().map_err(|_| SpecError::Port {
            spec: spec.to_string(),
            value: value.to_string(),
        })
    };

    match mapping.split_once(':') {
        Some((local, remote)) => {
            request.local_port = port(local)?;
            request.remote_port = Some(port(remote)?);
        }
        None => request.remote_port = Some(port(mapping)?),
    }

    if request.remote_port == Some(0) {
        return Err(SpecError::Port {
            spec: spec.to_string(),
            value: "0".to_string(),
        });
    }

    Ok(request)
}
