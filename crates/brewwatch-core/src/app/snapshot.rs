//! TaskSnapshotStore - last observed status of every watched task.
//!
//! Watchers write here after each successful poll; reporting and metrics code
//! read copies. One lock guards the whole map, writes happen at most once per
//! poll interval per task so contention is not a concern.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::{RemoteTaskState, TaskId, TaskStatus};

#[derive(Debug, Default)]
pub struct TaskSnapshotStore {
    entries: Mutex<HashMap<TaskId, TaskStatus>>,
}

impl TaskSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Every write is a single insert, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, TaskStatus>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the snapshot for `status.task_id`.
    pub fn record(&self, status: TaskStatus) {
        self.lock().insert(status.task_id, status);
    }

    pub fn get(&self, task_id: TaskId) -> Option<TaskStatus> {
        self.lock().get(&task_id).cloned()
    }

    pub fn remove(&self, task_id: TaskId) -> Option<TaskStatus> {
        self.lock().remove(&task_id)
    }

    /// Owned copy of every snapshot.
    pub fn snapshot(&self) -> HashMap<TaskId, TaskStatus> {
        self.lock().clone()
    }

    /// Number of tasks per last observed state.
    pub fn counts_by_state(&self) -> HashMap<RemoteTaskState, usize> {
        let mut counts = HashMap::new();
        for status in self.lock().values() {
            *counts.entry(status.state).or_insert(0) += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskInfo;
    use std::sync::Arc;

    fn status(id: i64, state: RemoteTaskState) -> TaskStatus {
        TaskStatus::observed(&TaskInfo::new(TaskId::new(id), state))
    }

    #[test]
    fn record_overwrites_whole_entry() {
        let store = TaskSnapshotStore::new();
        let first = TaskStatus::observed(
            &TaskInfo::new(TaskId::new(1), RemoteTaskState::Open)
                .with_field("host", serde_json::json!("builder-01")),
        );
        store.record(first);
        store.record(status(1, RemoteTaskState::Closed));

        let current = store.get(TaskId::new(1)).unwrap();
        assert_eq!(current.state, RemoteTaskState::Closed);
        assert!(current.info.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn snapshot_is_detached_copy() {
        let store = TaskSnapshotStore::new();
        store.record(status(1, RemoteTaskState::Open));

        let copy = store.snapshot();
        store.record(status(2, RemoteTaskState::Open));

        assert_eq!(copy.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn counts_group_by_state() {
        let store = TaskSnapshotStore::new();
        store.record(status(1, RemoteTaskState::Open));
        store.record(status(2, RemoteTaskState::Open));
        store.record(status(3, RemoteTaskState::Failed));

        let counts = store.counts_by_state();
        assert_eq!(counts[&RemoteTaskState::Open], 2);
        assert_eq!(counts[&RemoteTaskState::Failed], 1);
        assert!(store.remove(TaskId::new(3)).is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn concurrent_writers_do_not_lose_entries() {
        let store = Arc::new(TaskSnapshotStore::new());
        let handles: Vec<_> = (1..=8)
            .map(|id| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.record(status(id, RemoteTaskState::Open));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 8);
    }
}
