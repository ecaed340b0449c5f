//! TaskWatcher - polls remote build tasks until they finish.
//!
//! # Flow (one task)
//! 1. Query the task status
//! 2. Store the snapshot, resolve the outcome if the hub says it is done
//! 3. Wait up to `poll_interval` for the shutdown signal
//! 4. Check the deadline, go back to 1
//!
//! Status query errors are counted per task by a `FailureBudget`; the watch
//! gives up when it runs out. Every outcome other than success ends with a
//! remote cancel of the task. Watch results are returned as `WatchOutcome`,
//! never as an error.
//!
//! `watch_tasks` (in `multi_watcher`) runs the same steps for many tasks in a
//! single loop.

use std::sync::Arc;

use tokio::time::Instant;

use super::budget::{BudgetState, FailureBudget};
use super::shutdown::ShutdownSignal;
use super::snapshot::TaskSnapshotStore;
use crate::config::WatchConfig;
use crate::domain::{HubError, RemoteTaskState, TaskId, TaskStatus, WatchOutcome};
use crate::ports::{BuildHub, LogSink};

/// What one successful status query told us.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Observation {
    pub state: RemoteTaskState,

    /// Set once the hub reports the task done.
    pub outcome: Option<WatchOutcome>,
}

pub struct TaskWatcher<H> {
    pub(crate) hub: H,
    pub(crate) snapshots: Arc<TaskSnapshotStore>,
    pub(crate) config: WatchConfig,
    pub(crate) log: Arc<dyn LogSink>,
}

impl<H: BuildHub> TaskWatcher<H> {
    pub fn new(
        hub: H,
        snapshots: Arc<TaskSnapshotStore>,
        config: WatchConfig,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            hub,
            snapshots,
            config,
            log,
        }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn snapshots(&self) -> &Arc<TaskSnapshotStore> {
        &self.snapshots
    }

    /// Watch one task until it finishes, fails, times out or is interrupted.
    pub async fn watch_task(&self, task_id: TaskId, shutdown: &mut ShutdownSignal) -> WatchOutcome {
        let deadline = Instant::now() + self.config.deadline;
        let mut budget = FailureBudget::new(self.config.max_consecutive_failures);

        let outcome = loop {
            match self.poll(task_id).await {
                Ok(observation) => {
                    budget.record_success();
                    if let Some(outcome) = observation.outcome {
                        break outcome;
                    }
                    self.log.log(&format!("Task state: {}", observation.state));
                }
                Err(err) => {
                    if let Some(outcome) = self.note_poll_failure(task_id, &mut budget, &err) {
                        break outcome;
                    }
                }
            }

            if shutdown.wait_timeout(self.config.poll_interval).await {
                break WatchOutcome::interrupted();
            }
            if Instant::now() > deadline {
                break WatchOutcome::timeout();
            }
        };

        match outcome.detail() {
            None => tracing::info!(%task_id, "task completed successfully"),
            Some(detail) => {
                tracing::warn!(%task_id, outcome = ?outcome.kind(), detail, "task did not succeed");
                self.log.log(&format!("{detail}, canceling task {task_id}"));
                self.cancel(task_id).await;
            }
        }
        outcome
    }

    /// `watch_task` reduced to `None` on success or the failure detail.
    pub async fn watch_task_detail(
        &self,
        task_id: TaskId,
        shutdown: &mut ShutdownSignal,
    ) -> Option<String> {
        self.watch_task(task_id, shutdown).await.into_detail()
    }

    /// One status query. Records the snapshot and resolves finished tasks.
    pub(crate) async fn poll(&self, task_id: TaskId) -> Result<Observation, HubError> {
        let info = self.hub.get_task_info(task_id).await?;
        self.snapshots.record(TaskStatus::observed(&info));

        let outcome = if !info.state.is_done() {
            None
        } else if info.state.is_success() {
            Some(WatchOutcome::Success)
        } else {
            Some(WatchOutcome::Failure(
                self.failure_description(task_id, info.state).await?,
            ))
        };
        Ok(Observation {
            state: info.state,
            outcome,
        })
    }

    /// The hub's own explanation of why a finished task did not succeed.
    ///
    /// Only a hub fault carries that explanation. Any other error means the
    /// lookup itself failed and is returned, so it counts as a failed poll.
    async fn failure_description(
        &self,
        task_id: TaskId,
        state: RemoteTaskState,
    ) -> Result<String, HubError> {
        match self.hub.get_task_result(task_id).await {
            Err(HubError::Fault { message, .. }) => Ok(message),
            Err(err) => Err(err),
            Ok(_) => Ok(format!("task {task_id} {state}")),
        }
    }

    /// Count a failed status query. Returns the outcome once the budget is spent.
    pub(crate) fn note_poll_failure(
        &self,
        task_id: TaskId,
        budget: &mut FailureBudget,
        err: &HubError,
    ) -> Option<WatchOutcome> {
        match budget.record_failure() {
            BudgetState::Continue { consecutive } => {
                tracing::warn!(%task_id, consecutive, error = %err, "status query failed");
                self.log.log(&format!(
                    "Status query for task {task_id} failed. Trying again in {}s.\n{err}",
                    self.config.poll_interval.as_secs()
                ));
                None
            }
            BudgetState::Exhausted { consecutive } => {
                tracing::error!(%task_id, consecutive, error = %err, "giving up on task");
                self.log.log(&format!(
                    "Status query for task {task_id} failed {consecutive} times. Giving up."
                ));
                Some(WatchOutcome::failure(format!(
                    "status query failed {consecutive} consecutive times: {err}"
                )))
            }
        }
    }

    /// Best-effort remote cancel (recursing into subtasks). Never fails.
    pub(crate) async fn cancel(&self, task_id: TaskId) -> bool {
        match self.hub.cancel_task(task_id, true).await {
            Ok(true) => {
                self.log.log(&format!("Task {task_id} was canceled."));
                true
            }
            Ok(false) => {
                self.log.log(&format!("Task {task_id} was NOT canceled."));
                false
            }
            Err(err) => {
                tracing::warn!(%task_id, error = %err, "cancel request failed");
                self.log
                    .log(&format!("Task {task_id} was NOT canceled: {err}"));
                false
            }
        }
    }
}
