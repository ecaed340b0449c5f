//! Ports - boundaries to the outside world.
//!
//! Each trait hides an external collaborator:
//! - `BuildHub`: the remote build-service session
//! - `LogSink`: the caller's per-run log

pub mod build_hub;
pub mod log_sink;

pub use self::build_hub::{BuildHub, HubCall};
pub use self::log_sink::{LogSink, TracingSink};
