//! Task status as queried from the hub, and the snapshot we keep of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::TaskId;
use super::state::RemoteTaskState;

/// The answer to one status query (`getTaskInfo`).
///
/// The hub answers with one flat map. `id` and `state` are typed, every
/// other field (`method`, `owner`, `host_id`, ...) lands in `info` unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: TaskId,
    pub state: RemoteTaskState,

    #[serde(flatten)]
    pub info: serde_json::Map<String, serde_json::Value>,
}

impl TaskInfo {
    pub fn new(id: TaskId, state: RemoteTaskState) -> Self {
        Self {
            id,
            state,
            info: serde_json::Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.info.insert(key.into(), value);
        self
    }
}

/// Last observed status of a watched task.
///
/// Replace-on-write: every successful poll produces a whole new `TaskStatus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_id: TaskId,
    pub state: RemoteTaskState,
    pub info: serde_json::Map<String, serde_json::Value>,
    pub observed_at: DateTime<Utc>,
}

impl TaskStatus {
    pub fn observed(info: &TaskInfo) -> Self {
        Self {
            task_id: info.id,
            state: info.state,
            info: info.info.clone(),
            observed_at: Utc::now(),
        }
    }
}
