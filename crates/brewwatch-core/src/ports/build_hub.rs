//! BuildHub port - the remote build service session (Koji/Brew hub).
//!
//! Connection setup, authentication and the wire protocol live behind this
//! trait. brewwatch only issues the calls listed here.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    ArchiveId, BuildId, BuildRef, EventId, HubError, TagChange, TagRef, TaskId, TaskInfo,
};

/// One request inside a grouped call (multicall).
#[derive(Debug, Clone, PartialEq)]
pub enum HubCall {
    /// `getBuild(build)`
    GetBuild(BuildRef),

    /// `getLatestBuilds(tag, event=, package=, type=)`
    GetLatestBuilds {
        tag: TagRef,
        package: Option<String>,
        event: Option<EventId>,
        build_type: Option<String>,
    },

    /// `listTagged(tag, event=, type=)`
    ListTagged {
        tag: TagRef,
        event: Option<EventId>,
        build_type: Option<String>,
    },

    /// `listArchives(buildID=, type=)`
    ListArchives {
        build_id: BuildId,
        archive_type: Option<String>,
    },

    /// `listRPMs(imageID=)`
    ListImageRpms(ArchiveId),

    /// `listBuildRPMs(build)`
    ListBuildRpms(BuildId),

    /// `listTags(build=)`
    ListTags(BuildRef),
}

impl HubCall {
    /// Hub method name, for logs.
    pub fn method(&self) -> &'static str {
        match self {
            HubCall::GetBuild(_) => "getBuild",
            HubCall::GetLatestBuilds { .. } => "getLatestBuilds",
            HubCall::ListTagged { .. } => "listTagged",
            HubCall::ListArchives { .. } => "listArchives",
            HubCall::ListImageRpms(_) => "listRPMs",
            HubCall::ListBuildRpms(_) => "listBuildRPMs",
            HubCall::ListTags(_) => "listTags",
        }
    }
}

/// The hub session.
///
/// Every method is one round trip, except `multicall`, which sends all `calls`
/// in a single round trip and answers positionally (`result[i]` is the
/// answer to `calls[i]`). Multicalls are strict: one fault fails the group.
#[async_trait]
pub trait BuildHub: Send + Sync {
    /// `getTaskInfo(task_id)`
    async fn get_task_info(&self, task_id: TaskId) -> Result<TaskInfo, HubError>;

    /// `getTaskResult(task_id)`. For a failed task the hub answers with a fault
    /// whose message describes the failure.
    async fn get_task_result(&self, task_id: TaskId) -> Result<serde_json::Value, HubError>;

    /// `cancelTask(task_id, recurse=)`. `Ok(false)` means the hub refused.
    async fn cancel_task(&self, task_id: TaskId, recurse: bool) -> Result<bool, HubError>;

    /// `tagHistory(tag=, queryOpts={'limit': limit})`, newest first.
    async fn tag_history(&self, tag: &TagRef, limit: usize) -> Result<Vec<TagChange>, HubError>;

    async fn multicall(&self, calls: Vec<HubCall>) -> Result<Vec<serde_json::Value>, HubError>;
}

#[async_trait]
impl<H: BuildHub + ?Sized> BuildHub for Arc<H> {
    async fn get_task_info(&self, task_id: TaskId) -> Result<TaskInfo, HubError> {
        (**self).get_task_info(task_id).await
    }

    async fn get_task_result(&self, task_id: TaskId) -> Result<serde_json::Value, HubError> {
        (**self).get_task_result(task_id).await
    }

    async fn cancel_task(&self, task_id: TaskId, recurse: bool) -> Result<bool, HubError> {
        (**self).cancel_task(task_id, recurse).await
    }

    async fn tag_history(&self, tag: &TagRef, limit: usize) -> Result<Vec<TagChange>, HubError> {
        (**self).tag_history(tag, limit).await
    }

    async fn multicall(&self, calls: Vec<HubCall>) -> Result<Vec<serde_json::Value>, HubError> {
        (**self).multicall(calls).await
    }
}
