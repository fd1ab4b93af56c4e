//! Built-in collaborators driven by a cluster configuration

mod inventory;
mod relay;

pub use inventory::StaticDirectory;
pub use relay::{RelayTunnel, TcpRelay};
