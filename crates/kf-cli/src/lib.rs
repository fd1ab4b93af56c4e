//! kforward: Command-line front end for kf-orchestrator
//!
//! Provides the `kforward` binary, which opens a set of port forwards,
//! reports the assigned local ports and keeps them running until
//! interrupted.

pub mod forward_spec;
pub mod output;
