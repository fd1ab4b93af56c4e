//! Collaborator trait definitions

mod directory;
mod transport;

pub use directory::ClusterDirectory;
pub use transport::{TransportProvider, Tunnel};
