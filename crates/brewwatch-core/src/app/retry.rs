//! Retry policy and the transparent retry shim for hub calls.
//!
//! The hub occasionally resets connections ("Connection reset by peer") on
//! calls that would succeed a moment later. `retry_call` retries those, and
//! `RetryingHub` applies it to every `BuildHub` method so callers never see a
//! transient error unless the whole budget is spent.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::duration_secs;
use crate::domain::{HubError, TagChange, TagRef, TaskId, TaskInfo};
use crate::ports::{BuildHub, HubCall};

/// Retry policy for transient hub failures.
///
/// Fixed delay, no backoff: the failures we retry are momentary resets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts in total, including the first one.
    pub max_attempts: u32,

    /// Wait between attempts.
    #[serde(with = "duration_secs")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Delay before attempt `attempt + 1`, or `None` once `attempt` was the last.
    ///
    /// # Arguments
    /// * `attempt` - Number of attempts already made (1-indexed).
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_attempts.max(1)).then_some(self.delay)
    }
}

/// Run `op`, retrying errors for which `is_retryable` holds.
///
/// Non-retryable errors are returned immediately. When the attempts run out
/// the last error is returned unchanged.
pub async fn retry_call<T, E, F, Fut, P>(policy: &RetryPolicy, is_retryable: P, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retryable(&err) => {
                let Some(delay) = policy.next_delay(attempt) else {
                    tracing::warn!(attempt, error = %err, "hub call failed, retries exhausted");
                    return Err(err);
                };
                tracing::warn!(
                    attempt,
                    delay_secs = delay.as_secs_f64(),
                    error = %err,
                    "transient hub error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// `BuildHub` decorator that retries transient errors on every call.
pub struct RetryingHub<H> {
    inner: H,
    policy: RetryPolicy,
}

impl<H: BuildHub> RetryingHub<H> {
    pub fn new(inner: H, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<H: BuildHub> BuildHub for RetryingHub<H> {
    async fn get_task_info(&self, task_id: TaskId) -> Result<TaskInfo, HubError> {
        retry_call(&self.policy, HubError::is_transient, || {
            self.inner.get_task_info(task_id)
        })
        .await
    }

    async fn get_task_result(&self, task_id: TaskId) -> Result<serde_json::Value, HubError> {
        retry_call(&self.policy, HubError::is_transient, || {
            self.inner.get_task_result(task_id)
        })
        .await
    }

    async fn cancel_task(&self, task_id: TaskId, recurse: bool) -> Result<bool, HubError> {
        retry_call(&self.policy, HubError::is_transient, || {
            self.inner.cancel_task(task_id, recurse)
        })
        .await
    }

    async fn tag_history(&self, tag: &TagRef, limit: usize) -> Result<Vec<TagChange>, HubError> {
        retry_call(&self.policy, HubError::is_transient, || {
            self.inner.tag_history(tag, limit)
        })
        .await
    }

    async fn multicall(&self, calls: Vec<HubCall>) -> Result<Vec<serde_json::Value>, HubError> {
        retry_call(&self.policy, HubError::is_transient, || {
            self.inner.multicall(calls.clone())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::domain::RemoteTaskState;
    use crate::impls::InMemoryHub;

    fn reset() -> HubError {
        HubError::Connection("Connection reset by peer".to_string())
    }

    #[test]
    fn default_policy_matches_hub_behaviour() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.delay, Duration::from_secs(5));
        assert_eq!(policy.next_delay(3), Some(Duration::from_secs(5)));
        assert_eq!(policy.next_delay(4), None);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_fourth_attempt() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let start = tokio::time::Instant::now();

        let result: Result<&str, HubError> =
            retry_call(&RetryPolicy::default(), HubError::is_transient, move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 4 { Err(reset()) } else { Ok("done") }
            })
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn propagates_last_error_after_four_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), HubError> =
            retry_call(&RetryPolicy::default(), HubError::is_transient, move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Err(HubError::Connection(format!("reset on attempt {n}")))
            })
            .await;

        assert_eq!(
            result,
            Err(HubError::Connection("reset on attempt 4".to_string()))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), HubError> =
            retry_call(&RetryPolicy::default(), HubError::is_transient, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(HubError::Auth("ticket expired".to_string()))
            })
            .await;

        assert!(matches!(result, Err(HubError::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retrying_hub_absorbs_resets() {
        let hub = Arc::new(InMemoryHub::new());
        let task = TaskId::new(1);
        hub.script_task(
            task,
            vec![
                Err(reset()),
                Err(reset()),
                Ok(RemoteTaskState::Open),
            ],
        );

        let retrying = RetryingHub::new(Arc::clone(&hub), RetryPolicy::default());
        let info = retrying.get_task_info(task).await.unwrap();

        assert_eq!(info.state, RemoteTaskState::Open);
        assert_eq!(hub.status_queries(task), 3);
    }
}
