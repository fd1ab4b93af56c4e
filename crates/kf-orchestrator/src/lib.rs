//! kf-orchestrator: Concurrent multi-tunnel lifecycle orchestration
//!
//! Resolves forward requests to concrete pods, launches one tunnel per
//! request in parallel, and hands back a [`Session`] that reports readiness
//! and assigned ports and closes every tunnel exactly once.

pub mod backend;
pub mod fanout;
pub mod forwarder;
pub mod interrupt;
pub mod launcher;
pub mod resolver;
pub mod session;

pub use forwarder::{with_forwarders, with_forwarders_embedded, Forwarder};
pub use interrupt::{InterruptSource, OsSignals};
pub use session::{Session, TunnelFailure};
