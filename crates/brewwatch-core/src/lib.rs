//! brewwatch-core
//!
//! Watching remote build tasks on a Koji/Brew hub until they finish, plus the
//! batched build-farm queries built around it.
//!
//! # Modules
//! - **domain**: ids, remote task states, status snapshots, outcomes, records, errors
//! - **ports**: `BuildHub` (the hub session) and `LogSink` (progress lines)
//! - **app**: retry shim, watchers, tag-change cache, batch helpers, embargo detection
//! - **impls**: in-process `BuildHub` and `LogSink` implementations
//! - **config**: serde-loadable timings, retry policy and hub URL

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use crate::config::{BrewwatchConfig, WatchConfig};
