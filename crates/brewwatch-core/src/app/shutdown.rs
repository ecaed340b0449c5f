//! Cooperative termination signal for watch loops.
//!
//! Backed by a `watch::channel(false)`: the trigger flips it to `true` once,
//! every watcher holding a signal notices at its next poll boundary.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Sender side. Dropping it without triggering means "never stop early".
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Request termination. Idempotent.
    pub fn trigger(&self) {
        // ignore send error: every signal may already be dropped
        let _ = self.tx.send(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Receiver side, cloned into each watcher.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

impl ShutdownSignal {
    /// A signal that can never fire.
    pub fn never() -> Self {
        let (_, signal) = shutdown_channel();
        signal
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait up to `timeout` for termination. Returns `true` if it was requested,
    /// including before the call.
    pub async fn wait_timeout(&mut self, timeout: Duration) -> bool {
        let until = Instant::now() + timeout;
        let signaled = match tokio::time::timeout_at(until, self.rx.wait_for(|stop| *stop)).await {
            Ok(Ok(_)) => Some(true),
            // Trigger dropped: nobody can signal anymore.
            Ok(Err(_)) => None,
            Err(_) => Some(false),
        };
        match signaled {
            Some(signaled) => signaled,
            None => {
                tokio::time::sleep_until(until).await;
                false
            }
        }
    }
}
