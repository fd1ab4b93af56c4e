//! Session orchestration

mod failure;
mod guard;
mod handle;
mod orchestrator;

pub use failure::{failure_channel, FailureReporter, TunnelFailure};
pub use guard::ShutdownGuard;
pub use handle::TunnelHandle;
pub use orchestrator::Session;
