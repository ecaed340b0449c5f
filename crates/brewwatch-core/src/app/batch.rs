//! Batched hub queries.
//!
//! Each helper turns a list of independent lookups into one grouped hub call
//! (multicall) and fans the answers back out by position:
//! `output.len() == input.len()` and `output[i]` answers `input[i]`. Blank
//! inputs (id 0, empty name) get `None` without a request being sent.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::domain::{
    ArchiveId, ArchiveInfo, BuildId, BuildInfo, BuildRef, EventId, HubError, RpmInfo, TagInfo,
    TagRef,
};
use crate::ports::{BuildHub, HubCall};

/// Deferred result of one call queued in a `Multicall`.
#[derive(Debug)]
pub struct CallHandle<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

/// Builder for a grouped call.
///
/// ```ignore
/// let mut group = Multicall::new();
/// let build = group.push::<Option<BuildInfo>>(HubCall::GetBuild(nvr.into()));
/// let mut results = group.execute(&hub).await?;
/// let build = results.take(build)?;
/// ```
#[derive(Debug, Default)]
pub struct Multicall {
    calls: Vec<HubCall>,
}

impl Multicall {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `call`; its answer will decode as `T`.
    pub fn push<T: DeserializeOwned>(&mut self, call: HubCall) -> CallHandle<T> {
        let index = self.calls.len();
        self.calls.push(call);
        CallHandle {
            index,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Send every queued call in one round trip. An empty group is not sent.
    pub async fn execute<H>(self, hub: &H) -> Result<MulticallResults, HubError>
    where
        H: BuildHub + ?Sized,
    {
        if self.calls.is_empty() {
            return Ok(MulticallResults { values: Vec::new() });
        }

        let expected = self.calls.len();
        tracing::debug!(calls = expected, first = self.calls[0].method(), "sending multicall");
        let values = hub.multicall(self.calls).await?;
        if values.len() != expected {
            return Err(HubError::Decode(format!(
                "multicall returned {} results for {expected} calls",
                values.len()
            )));
        }
        Ok(MulticallResults {
            values: values.into_iter().map(Some).collect(),
        })
    }
}

/// Answers of an executed `Multicall`, claimed through their handles.
#[derive(Debug)]
pub struct MulticallResults {
    values: Vec<Option<serde_json::Value>>,
}

impl MulticallResults {
    pub fn take<T: DeserializeOwned>(&mut self, handle: CallHandle<T>) -> Result<T, HubError> {
        let value = self
            .values
            .get_mut(handle.index)
            .and_then(Option::take)
            .ok_or_else(|| HubError::Decode(format!("no result for call #{}", handle.index)))?;
        Ok(serde_json::from_value(value)?)
    }
}

/// One multicall over `inputs`, skipping inputs for which `to_call` is `None`.
async fn batched<I, T, H, F>(hub: &H, inputs: &[I], to_call: F) -> Result<Vec<Option<T>>, HubError>
where
    T: DeserializeOwned,
    H: BuildHub + ?Sized,
    F: Fn(&I) -> Option<HubCall>,
{
    let mut group = Multicall::new();
    let handles: Vec<Option<CallHandle<T>>> = inputs
        .iter()
        .map(|input| to_call(input).map(|call| group.push(call)))
        .collect();

    let mut results = group.execute(hub).await?;
    handles
        .into_iter()
        .map(|handle| handle.map(|h| results.take(h)).transpose())
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// `getBuild` for each build. `None` for blank refs and unknown builds.
pub async fn get_build_objects<H>(hub: &H, builds: &[BuildRef]) -> Result<Vec<Option<BuildInfo>>, HubError>
where
    H: BuildHub + ?Sized,
{
    let found: Vec<Option<Option<BuildInfo>>> = batched(hub, builds, |build| {
        (!build.is_blank()).then(|| HubCall::GetBuild(build.clone()))
    })
    .await?;
    Ok(found.into_iter().map(Option::flatten).collect())
}

/// Latest builds of `(tag, package)` pairs as of `event` (now if `None`).
pub async fn get_latest_builds<H>(
    hub: &H,
    tag_packages: &[(TagRef, String)],
    build_type: Option<&str>,
    event: Option<EventId>,
) -> Result<Vec<Option<Vec<BuildInfo>>>, HubError>
where
    H: BuildHub + ?Sized,
{
    batched(hub, tag_packages, |(tag, package)| {
        (!tag.is_blank()).then(|| HubCall::GetLatestBuilds {
            tag: tag.clone(),
            package: non_blank(Some(package.as_str())),
            event,
            build_type: non_blank(build_type),
        })
    })
    .await
}

/// Builds tagged into each tag as of `event` (now if `None`).
pub async fn get_tagged_builds<H>(
    hub: &H,
    tags: &[TagRef],
    build_type: Option<&str>,
    event: Option<EventId>,
) -> Result<Vec<Option<Vec<BuildInfo>>>, HubError>
where
    H: BuildHub + ?Sized,
{
    batched(hub, tags, |tag| {
        (!tag.is_blank()).then(|| HubCall::ListTagged {
            tag: tag.clone(),
            event,
            build_type: non_blank(build_type),
        })
    })
    .await
}

/// Archives of each build, each archive carrying the RPMs it contains.
///
/// Two grouped calls: archives per build, then RPMs per archive.
pub async fn list_archives_by_builds<H>(
    hub: &H,
    build_ids: &[BuildId],
    archive_type: &str,
) -> Result<Vec<Option<Vec<ArchiveInfo>>>, HubError>
where
    H: BuildHub + ?Sized,
{
    let mut archive_lists: Vec<Option<Vec<ArchiveInfo>>> = batched(hub, build_ids, |build_id| {
        (!build_id.is_blank()).then(|| HubCall::ListArchives {
            build_id: *build_id,
            archive_type: non_blank(Some(archive_type)),
        })
    })
    .await?;

    let archive_ids: Vec<ArchiveId> = archive_lists
        .iter()
        .flatten()
        .flatten()
        .map(|archive| archive.id)
        .collect();
    let mut rpm_lists = list_image_rpms(hub, &archive_ids).await?.into_iter();

    for archive in archive_lists.iter_mut().flatten().flatten() {
        archive.rpms = rpm_lists.next().flatten();
    }
    Ok(archive_lists)
}

/// `listRPMs(imageID=)` for each image archive.
pub async fn list_image_rpms<H>(hub: &H, image_ids: &[ArchiveId]) -> Result<Vec<Option<Vec<RpmInfo>>>, HubError>
where
    H: BuildHub + ?Sized,
{
    batched(hub, image_ids, |image_id| {
        (!image_id.is_blank()).then_some(HubCall::ListImageRpms(*image_id))
    })
    .await
}

/// `listBuildRPMs` for each (non-image) build.
pub async fn list_build_rpms<H>(hub: &H, build_ids: &[BuildId]) -> Result<Vec<Option<Vec<RpmInfo>>>, HubError>
where
    H: BuildHub + ?Sized,
{
    batched(hub, build_ids, |build_id| {
        (!build_id.is_blank()).then_some(HubCall::ListBuildRpms(*build_id))
    })
    .await
}

/// Tags of each build.
pub async fn get_builds_tags<H>(hub: &H, builds: &[BuildRef]) -> Result<Vec<Option<Vec<TagInfo>>>, HubError>
where
    H: BuildHub + ?Sized,
{
    batched(hub, builds, |build| {
        (!build.is_blank()).then(|| HubCall::ListTags(build.clone()))
    })
    .await
}
