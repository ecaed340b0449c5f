//! Impls - in-process implementations of the ports.
//!
//! - **InMemoryHub**: scripted `BuildHub` for tests and `--simulate` runs
//! - **RecordingSink**: `LogSink` that keeps every line
//!
//! The XML-RPC hub session lives outside this crate.

pub mod inmem_hub;
pub mod recording_sink;

pub use self::inmem_hub::InMemoryHub;
pub use self::recording_sink::RecordingSink;
