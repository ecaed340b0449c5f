//! Watching many tasks from one loop.
//!
//! One pass queries every task still being polled, then the whole batch waits
//! once for the shutdown signal and checks one shared deadline. This keeps
//! the hub load at one status query per task per interval regardless of how
//! many tasks are in flight.

use std::collections::{BTreeMap, HashMap};

use tokio::time::Instant;

use super::budget::FailureBudget;
use super::shutdown::ShutdownSignal;
use super::task_watcher::TaskWatcher;
use crate::domain::{TaskId, WatchOutcome};
use crate::ports::BuildHub;

impl<H: BuildHub> TaskWatcher<H> {
    /// Watch every task in `task_ids` until each has an outcome.
    ///
    /// Duplicates are watched once; tasks are polled in first-seen order.
    /// Every task that did not succeed is canceled (with subtasks) before
    /// returning. The result has one entry per distinct submitted task.
    pub async fn watch_tasks(
        &self,
        task_ids: &[TaskId],
        shutdown: &mut ShutdownSignal,
    ) -> BTreeMap<TaskId, WatchOutcome> {
        let mut outcomes = BTreeMap::new();
        if task_ids.is_empty() {
            return outcomes;
        }

        let deadline = Instant::now() + self.config.deadline;
        let mut polling: Vec<TaskId> = Vec::with_capacity(task_ids.len());
        let mut budgets: HashMap<TaskId, FailureBudget> = HashMap::new();
        for &task_id in task_ids {
            if !budgets.contains_key(&task_id) {
                budgets.insert(task_id, FailureBudget::new(self.config.max_consecutive_failures));
                polling.push(task_id);
            }
        }

        loop {
            for &task_id in &polling {
                let Some(budget) = budgets.get_mut(&task_id) else {
                    continue;
                };
                match self.poll(task_id).await {
                    Ok(observation) => {
                        budget.record_success();
                        self.log
                            .log(&format!("Task {task_id} state: {}", observation.state));
                        if let Some(outcome) = observation.outcome {
                            outcomes.insert(task_id, outcome);
                        }
                    }
                    Err(err) => {
                        if let Some(outcome) = self.note_poll_failure(task_id, budget, &err) {
                            outcomes.insert(task_id, outcome);
                        }
                    }
                }
            }
            polling.retain(|task_id| !outcomes.contains_key(task_id));

            if polling.is_empty() {
                break;
            }
            if shutdown.wait_timeout(self.config.poll_interval).await {
                for &task_id in &polling {
                    outcomes.insert(task_id, WatchOutcome::interrupted());
                }
                break;
            }
            if Instant::now() > deadline {
                for &task_id in &polling {
                    outcomes.insert(task_id, WatchOutcome::timeout());
                }
                break;
            }
        }

        self.cancel_unsuccessful(&outcomes).await;
        outcomes
    }

    /// `watch_tasks` reduced to `None` on success or the failure detail.
    pub async fn watch_tasks_details(
        &self,
        task_ids: &[TaskId],
        shutdown: &mut ShutdownSignal,
    ) -> BTreeMap<TaskId, Option<String>> {
        self.watch_tasks(task_ids, shutdown)
            .await
            .into_iter()
            .map(|(task_id, outcome)| (task_id, outcome.into_detail()))
            .collect()
    }

    async fn cancel_unsuccessful(&self, outcomes: &BTreeMap<TaskId, WatchOutcome>) {
        let failed: Vec<(TaskId, &str)> = outcomes
            .iter()
            .filter_map(|(task_id, outcome)| outcome.detail().map(|detail| (*task_id, detail)))
            .collect();
        if failed.is_empty() {
            tracing::info!(tasks = outcomes.len(), "all watched tasks succeeded");
            return;
        }

        tracing::warn!(
            failed = failed.len(),
            tasks = outcomes.len(),
            "canceling unsuccessful tasks"
        );
        for (task_id, detail) in failed {
            self.log.log(&format!(
                "Error waiting for task {task_id}: {detail}. Canceling..."
            ));
            self.cancel(task_id).await;
        }
    }
}
