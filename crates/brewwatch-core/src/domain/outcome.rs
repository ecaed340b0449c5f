//! Outcome model: how a watch over one task ended.
//!
//! A task gets exactly one outcome. Once a watcher has produced it the task
//! leaves the polling set and the outcome is never revised.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Detail used when the shutdown signal stops a watch.
pub const INTERRUPTED_DETAIL: &str = "Interrupted";

/// Detail used when the watch deadline passes.
pub const TIMEOUT_DETAIL: &str = "Timeout watching task";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    Success,
    Failure,
    Timeout,
    Interrupted,
}

/// Terminal result of watching a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchOutcome {
    Success,

    /// The hub reported failure, or polling gave up. Carries the hub's own
    /// failure description or the last local error.
    Failure(String),

    Timeout(String),

    Interrupted(String),
}

impl WatchOutcome {
    pub fn failure(detail: impl Into<String>) -> Self {
        WatchOutcome::Failure(detail.into())
    }

    pub fn timeout() -> Self {
        WatchOutcome::Timeout(TIMEOUT_DETAIL.to_string())
    }

    pub fn interrupted() -> Self {
        WatchOutcome::Interrupted(INTERRUPTED_DETAIL.to_string())
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            WatchOutcome::Success => OutcomeKind::Success,
            WatchOutcome::Failure(_) => OutcomeKind::Failure,
            WatchOutcome::Timeout(_) => OutcomeKind::Timeout,
            WatchOutcome::Interrupted(_) => OutcomeKind::Interrupted,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WatchOutcome::Success)
    }

    /// `None` on success, the human-readable reason otherwise.
    pub fn detail(&self) -> Option<&str> {
        match self {
            WatchOutcome::Success => None,
            WatchOutcome::Failure(d) | WatchOutcome::Timeout(d) | WatchOutcome::Interrupted(d) => {
                Some(d)
            }
        }
    }

    pub fn into_detail(self) -> Option<String> {
        match self {
            WatchOutcome::Success => None,
            WatchOutcome::Failure(d) | WatchOutcome::Timeout(d) | WatchOutcome::Interrupted(d) => {
                Some(d)
            }
        }
    }
}

impl fmt::Display for WatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail() {
            None => f.write_str("success"),
            Some(detail) => f.write_str(detail),
        }
    }
}
