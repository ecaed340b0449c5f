//! Remote task states as reported by the build hub.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Task state code.
///
/// State transitions (driven by the hub, we only observe them):
/// - FREE -> ASSIGNED -> OPEN -> CLOSED
/// - any non-terminal -> CANCELED
/// - OPEN -> FAILED
///
/// Codes we don't know are kept as `Unknown` and treated as still running, so a
/// hub upgrade can't make a watcher give up early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum RemoteTaskState {
    Free,
    Open,
    Closed,
    Canceled,
    Assigned,
    Failed,
    Unknown(i64),
}

impl RemoteTaskState {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => RemoteTaskState::Free,
            1 => RemoteTaskState::Open,
            2 => RemoteTaskState::Closed,
            3 => RemoteTaskState::Canceled,
            4 => RemoteTaskState::Assigned,
            5 => RemoteTaskState::Failed,
            other => RemoteTaskState::Unknown(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            RemoteTaskState::Free => 0,
            RemoteTaskState::Open => 1,
            RemoteTaskState::Closed => 2,
            RemoteTaskState::Canceled => 3,
            RemoteTaskState::Assigned => 4,
            RemoteTaskState::Failed => 5,
            RemoteTaskState::Unknown(code) => code,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RemoteTaskState::Free => "FREE",
            RemoteTaskState::Open => "OPEN",
            RemoteTaskState::Closed => "CLOSED",
            RemoteTaskState::Canceled => "CANCELED",
            RemoteTaskState::Assigned => "ASSIGNED",
            RemoteTaskState::Failed => "FAILED",
            RemoteTaskState::Unknown(_) => "UNKNOWN",
        }
    }

    /// Has the hub finished with this task (one way or another)?
    pub fn is_done(self) -> bool {
        matches!(
            self,
            RemoteTaskState::Closed | RemoteTaskState::Canceled | RemoteTaskState::Failed
        )
    }

    /// Only CLOSED counts as success.
    pub fn is_success(self) -> bool {
        self == RemoteTaskState::Closed
    }
}

impl From<i64> for RemoteTaskState {
    fn from(code: i64) -> Self {
        Self::from_code(code)
    }
}

impl From<RemoteTaskState> for i64 {
    fn from(state: RemoteTaskState) -> Self {
        state.code()
    }
}

impl fmt::Display for RemoteTaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteTaskState::Unknown(code) => write!(f, "UNKNOWN({code})"),
            known => f.write_str(known.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::free(0, RemoteTaskState::Free, false)]
    #[case::open(1, RemoteTaskState::Open, false)]
    #[case::closed(2, RemoteTaskState::Closed, true)]
    #[case::canceled(3, RemoteTaskState::Canceled, true)]
    #[case::assigned(4, RemoteTaskState::Assigned, false)]
    #[case::failed(5, RemoteTaskState::Failed, true)]
    #[case::unknown(42, RemoteTaskState::Unknown(42), false)]
    fn codes_map_to_states(#[case] code: i64, #[case] state: RemoteTaskState, #[case] done: bool) {
        assert_eq!(RemoteTaskState::from_code(code), state);
        assert_eq!(state.code(), code);
        assert_eq!(state.is_done(), done);
    }

    #[test]
    fn only_closed_is_success() {
        assert!(RemoteTaskState::Closed.is_success());
        assert!(!RemoteTaskState::Failed.is_success());
        assert!(!RemoteTaskState::Canceled.is_success());
    }

    #[test]
    fn serializes_as_code() {
        assert_eq!(serde_json::to_string(&RemoteTaskState::Failed).unwrap(), "5");
        let back: RemoteTaskState = serde_json::from_str("2").unwrap();
        assert_eq!(back, RemoteTaskState::Closed);
        assert_eq!(RemoteTaskState::Unknown(9).to_string(), "UNKNOWN(9)");
    }
}
