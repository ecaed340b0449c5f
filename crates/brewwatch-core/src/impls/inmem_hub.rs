//! InMemoryHub - scripted `BuildHub` for tests and offline runs.
//!
//! Task states are played back from a per-task script (the last entry repeats
//! forever), build-farm records are whatever the test registered, and every
//! call is counted so tests can assert on hub load.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::domain::{
    ArchiveId, ArchiveInfo, BuildId, BuildInfo, BuildRef, HubError, RemoteTaskState, RpmInfo,
    TagChange, TagInfo, TagRef, TaskId, TaskInfo,
};
use crate::ports::{BuildHub, HubCall};

/// Fault code the hub uses for `GenericError`.
const GENERIC_FAULT: i32 = 1000;

#[derive(Default)]
struct HubState {
    scripts: HashMap<TaskId, VecDeque<Result<RemoteTaskState, HubError>>>,
    task_results: HashMap<TaskId, HubError>,
    status_queries: HashMap<TaskId, usize>,

    cancellations: Vec<(TaskId, bool)>,
    cancel_failures: HashMap<TaskId, HubError>,
    refused_cancels: Vec<TaskId>,

    tag_history: HashMap<TagRef, Vec<TagChange>>,
    tag_history_failures: HashMap<TagRef, HubError>,
    tag_history_queries: HashMap<TagRef, usize>,

    builds: Vec<BuildInfo>,
    tagged: HashMap<TagRef, Vec<BuildInfo>>,
    archives: HashMap<BuildId, Vec<ArchiveInfo>>,
    image_rpms: HashMap<ArchiveId, Vec<RpmInfo>>,
    build_rpms: HashMap<BuildId, Vec<RpmInfo>>,
    build_tags: HashMap<BuildId, Vec<TagInfo>>,

    multicalls: Vec<usize>,
    multicall_failure: Option<HubError>,
}

impl HubState {
    fn find_build(&self, build: &BuildRef) -> Option<&BuildInfo> {
        self.builds.iter().find(|b| match build {
            BuildRef::Id(id) => b.id == *id,
            BuildRef::Nvr(nvr) => b.nvr == *nvr,
        })
    }

    fn build_id(&self, build: &BuildRef) -> Result<BuildId, HubError> {
        match build {
            BuildRef::Id(id) => Ok(*id),
            BuildRef::Nvr(_) => self
                .find_build(build)
                .map(|b| b.id)
                .ok_or_else(|| HubError::fault(GENERIC_FAULT, format!("No such build: {build}"))),
        }
    }

    fn answer(&self, call: &HubCall) -> Result<Value, HubError> {
        match call {
            HubCall::GetBuild(build) => to_value(self.find_build(build)),
            HubCall::GetLatestBuilds { tag, package, .. } => {
                let mut latest: Vec<&BuildInfo> = Vec::new();
                for build in self.tagged.get(tag).into_iter().flatten() {
                    let name = package_name(&build.nvr);
                    if package.as_deref().is_some_and(|p| p != name) {
                        continue;
                    }
                    match latest.iter_mut().find(|b| package_name(&b.nvr) == name) {
                        Some(slot) => *slot = build,
                        None => latest.push(build),
                    }
                }
                to_value(latest)
            }
            HubCall::ListTagged { tag, .. } => {
                to_value(self.tagged.get(tag).cloned().unwrap_or_default())
            }
            HubCall::ListArchives { build_id, .. } => {
                to_value(self.archives.get(build_id).cloned().unwrap_or_default())
            }
            HubCall::ListImageRpms(archive_id) => {
                to_value(self.image_rpms.get(archive_id).cloned().unwrap_or_default())
            }
            HubCall::ListBuildRpms(build_id) => {
                to_value(self.build_rpms.get(build_id).cloned().unwrap_or_default())
            }
            HubCall::ListTags(build) => {
                let build_id = self.build_id(build)?;
                to_value(self.build_tags.get(&build_id).cloned().unwrap_or_default())
            }
        }
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, HubError> {
    Ok(serde_json::to_value(value)?)
}

/// `name` of a `name-version-release` string.
fn package_name(nvr: &str) -> &str {
    nvr.rsplitn(3, '-').nth(2).unwrap_or(nvr)
}

/// In-process `BuildHub`.
///
/// ```ignore
/// let hub = InMemoryHub::new();
/// hub.script_task(task, vec![Ok(RemoteTaskState::Open), Ok(RemoteTaskState::Closed)]);
/// ```
#[derive(Default)]
pub struct InMemoryHub {
    state: Mutex<HubState>,
}

impl InMemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    // Each method mutates the state in one step, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- tasks ----

    /// Answers for successive `get_task_info` calls. The last one repeats.
    pub fn script_task(&self, task_id: TaskId, script: Vec<Result<RemoteTaskState, HubError>>) {
        self.lock().scripts.insert(task_id, script.into());
    }

    /// Make `get_task_result` fail with `message`, as the hub does for failed tasks.
    pub fn set_task_failure(&self, task_id: TaskId, message: impl Into<String>) {
        self.fail_task_result(task_id, HubError::fault(1, message));
    }

    /// Make `get_task_result` fail with `err` itself.
    pub fn fail_task_result(&self, task_id: TaskId, err: HubError) {
        self.lock().task_results.insert(task_id, err);
    }

    pub fn status_queries(&self, task_id: TaskId) -> usize {
        self.lock().status_queries.get(&task_id).copied().unwrap_or(0)
    }

    pub fn total_status_queries(&self) -> usize {
        self.lock().status_queries.values().sum()
    }

    /// Every `cancel_task` call in order, including refused and failed ones.
    pub fn cancellations(&self) -> Vec<(TaskId, bool)> {
        self.lock().cancellations.clone()
    }

    pub fn fail_cancel(&self, task_id: TaskId, err: HubError) {
        self.lock().cancel_failures.insert(task_id, err);
    }

    /// Make `cancel_task` answer `Ok(false)`.
    pub fn refuse_cancel(&self, task_id: TaskId) {
        self.lock().refused_cancels.push(task_id);
    }

    // ---- tag history ----

    /// Record a tag event. Later additions are newer.
    pub fn add_tag_change(&self, tag: TagRef, change: TagChange) {
        self.lock().tag_history.entry(tag).or_default().insert(0, change);
    }

    pub fn tag_history_queries(&self, tag: &TagRef) -> usize {
        self.lock().tag_history_queries.get(tag).copied().unwrap_or(0)
    }

    pub fn fail_tag_history(&self, tag: TagRef, err: HubError) {
        self.lock().tag_history_failures.insert(tag, err);
    }

    pub fn clear_tag_history_failure(&self, tag: &TagRef) {
        self.lock().tag_history_failures.remove(tag);
    }

    // ---- build-farm records ----

    pub fn add_build(&self, build: BuildInfo) {
        self.lock().builds.push(build);
    }

    /// Tag `build` into `tag`. Later tagging is newer.
    pub fn tag_build(&self, tag: &TagRef, build: BuildInfo) {
        self.lock().tagged.entry(tag.clone()).or_default().push(build);
    }

    pub fn add_archive(&self, archive: ArchiveInfo) {
        self.lock()
            .archives
            .entry(archive.build_id)
            .or_default()
            .push(archive);
    }

    pub fn set_image_rpms(&self, archive_id: ArchiveId, rpms: Vec<RpmInfo>) {
        self.lock().image_rpms.insert(archive_id, rpms);
    }

    pub fn set_build_rpms(&self, build_id: BuildId, rpms: Vec<RpmInfo>) {
        self.lock().build_rpms.insert(build_id, rpms);
    }

    pub fn set_build_tags(&self, build_id: BuildId, tags: Vec<TagInfo>) {
        self.lock().build_tags.insert(build_id, tags);
    }

    /// Size of every multicall sent so far.
    pub fn multicalls(&self) -> Vec<usize> {
        self.lock().multicalls.clone()
    }

    /// Fail every following multicall as a whole.
    pub fn fail_multicalls(&self, err: HubError) {
        self.lock().multicall_failure = Some(err);
    }
}

#[async_trait]
impl BuildHub for InMemoryHub {
    async fn get_task_info(&self, task_id: TaskId) -> Result<TaskInfo, HubError> {
        let mut state = self.lock();
        *state.status_queries.entry(task_id).or_insert(0) += 1;

        let script = state
            .scripts
            .get_mut(&task_id)
            .ok_or_else(|| HubError::fault(GENERIC_FAULT, format!("No such task: {task_id}")))?;
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        match next {
            Some(answer) => answer.map(|remote| TaskInfo::new(task_id, remote)),
            None => Err(HubError::fault(GENERIC_FAULT, format!("No such task: {task_id}"))),
        }
    }

    async fn get_task_result(&self, task_id: TaskId) -> Result<Value, HubError> {
        match self.lock().task_results.get(&task_id) {
            Some(err) => Err(err.clone()),
            None => Ok(Value::Null),
        }
    }

    async fn cancel_task(&self, task_id: TaskId, recurse: bool) -> Result<bool, HubError> {
        let mut state = self.lock();
        state.cancellations.push((task_id, recurse));
        if let Some(err) = state.cancel_failures.get(&task_id) {
            return Err(err.clone());
        }
        Ok(!state.refused_cancels.contains(&task_id))
    }

    async fn tag_history(&self, tag: &TagRef, limit: usize) -> Result<Vec<TagChange>, HubError> {
        let mut state = self.lock();
        *state.tag_history_queries.entry(tag.clone()).or_insert(0) += 1;
        if let Some(err) = state.tag_history_failures.get(tag) {
            return Err(err.clone());
        }
        Ok(state
            .tag_history
            .get(tag)
            .map(|history| history.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn multicall(&self, calls: Vec<HubCall>) -> Result<Vec<Value>, HubError> {
        let mut state = self.lock();
        state.multicalls.push(calls.len());
        if let Some(err) = &state.multicall_failure {
            return Err(err.clone());
        }
        calls.iter().map(|call| state.answer(call)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventId;

    #[tokio::test]
    async fn script_replays_then_repeats_last() {
        let hub = InMemoryHub::new();
        let task = TaskId::new(1);
        hub.script_task(task, vec![Ok(RemoteTaskState::Free), Ok(RemoteTaskState::Open)]);

        for expected in [RemoteTaskState::Free, RemoteTaskState::Open, RemoteTaskState::Open] {
            assert_eq!(hub.get_task_info(task).await.unwrap().state, expected);
        }
        assert_eq!(hub.status_queries(task), 3);
    }

    #[tokio::test]
    async fn unknown_task_is_a_fault() {
        let hub = InMemoryHub::new();
        let err = hub.get_task_info(TaskId::new(9)).await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(hub.total_status_queries(), 1);
    }

    #[tokio::test]
    async fn tag_history_is_newest_first() {
        let hub = InMemoryHub::new();
        let tag = TagRef::from("rhaos-4.6-rhel-8-build");
        hub.add_tag_change(tag.clone(), TagChange::new(EventId::new(1)));
        hub.add_tag_change(tag.clone(), TagChange::new(EventId::new(2)));

        let history = hub.tag_history(&tag, 1).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].create_event, EventId::new(2));
    }

    #[test]
    fn package_name_strips_version_and_release() {
        assert_eq!(package_name("ose-cli-container-v4.6.0-202010061132.p0"), "ose-cli-container");
        assert_eq!(package_name("nodash"), "nodash");
    }
}
