//! Configuration: watch timings, retry policy and hub location.
//!
//! Every field has a default, so an empty JSON object is a valid config.
//! Durations are written as (possibly fractional) seconds.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::retry::RetryPolicy;
use crate::domain::ConfigError;

/// Hub used when none is configured.
pub const DEFAULT_HUB_URL: &str = "https://brewhub.engineering.redhat.com/brewhub";

/// Timings shared by the single- and multi-task watchers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// How long to wait for the shutdown signal between polls.
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,

    /// Wall-clock ceiling for a whole watch, measured from its start.
    #[serde(with = "duration_secs")]
    pub deadline: Duration,

    /// Consecutive failed status queries before a task is given up on.
    pub max_consecutive_failures: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3 * 60),
            deadline: Duration::from_secs(4 * 60 * 60),
            max_consecutive_failures: 10,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrewwatchConfig {
    pub hub_url: String,
    pub watch: WatchConfig,
    pub retry: RetryPolicy,
}

impl Default for BrewwatchConfig {
    fn default() -> Self {
        Self {
            hub_url: DEFAULT_HUB_URL.to_string(),
            watch: WatchConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl BrewwatchConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// `#[serde(with = "duration_secs")]`: a `Duration` as seconds.
pub mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config: BrewwatchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, BrewwatchConfig::default());
        assert_eq!(config.watch.poll_interval, Duration::from_secs(180));
        assert_eq!(config.watch.deadline, Duration::from_secs(14_400));
        assert_eq!(config.watch.max_consecutive_failures, 10);
        assert_eq!(config.retry.max_attempts, 4);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: BrewwatchConfig = serde_json::from_str(
            r#"{"watch": {"poll_interval": 0.5}, "retry": {"delay": 1}}"#,
        )
        .unwrap();
        assert_eq!(config.watch.poll_interval, Duration::from_millis(500));
        assert_eq!(config.watch.deadline, Duration::from_secs(14_400));
        assert_eq!(config.retry.delay, Duration::from_secs(1));
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.hub_url, DEFAULT_HUB_URL);
    }

    #[test]
    fn negative_durations_are_rejected() {
        let err = serde_json::from_str::<WatchConfig>(r#"{"deadline": -1}"#);
        assert!(err.is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BrewwatchConfig::from_json_file("/nonexistent/brewwatch.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
