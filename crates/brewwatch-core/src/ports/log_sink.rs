//! LogSink port - where caller-facing progress lines go.
//!
//! The runtime that drives a watch usually owns a per-image log; the watcher
//! only produces lines and hands them over.

/// LogSink takes one line at a time.
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, line: &str) {
        self(line)
    }
}

/// Forwards lines to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, line: &str) {
        tracing::info!(target: "brewwatch::watch", "{line}");
    }
}
