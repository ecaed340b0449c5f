//! EmbargoDetector - find builds that carry embargoed fixes.
//!
//! A build is shipped once any of its tags ends with `-released`. An unshipped
//! build is embargoed if its release contains `.p1`, or if it is an image that
//! contains an unshipped `.p1` RPM.
//!
//! Shipping statuses and archive lists are cached per build for the lifetime of
//! the detector; neither changes for a given build once known.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::batch::{get_builds_tags, list_archives_by_builds, list_image_rpms};
use crate::domain::{ArchiveInfo, BuildId, BuildInfo, BuildRef, HubError};
use crate::ports::BuildHub;

const RELEASED_TAG_SUFFIX: &str = "-released";
const EMBARGO_MARKER: &str = ".p1";

pub struct EmbargoDetector<H> {
    hub: H,
    shipping_statuses: HashMap<BuildId, bool>,
    archive_lists: HashMap<BuildId, Vec<ArchiveInfo>>,
}

impl<H: BuildHub> EmbargoDetector<H> {
    pub fn new(hub: H) -> Self {
        Self {
            hub,
            shipping_statuses: HashMap::new(),
            archive_lists: HashMap::new(),
        }
    }

    /// The subset of `build_ids` that has shipped.
    pub async fn find_shipped_builds(&mut self, build_ids: &[BuildId]) -> Result<HashSet<BuildId>, HubError> {
        let mut uncached: Vec<BuildId> = Vec::new();
        for &build_id in build_ids {
            if !self.shipping_statuses.contains_key(&build_id) && !uncached.contains(&build_id) {
                uncached.push(build_id);
            }
        }

        if !uncached.is_empty() {
            tracing::info!(builds = uncached.len(), "getting tags for builds");
            let refs: Vec<BuildRef> = uncached.iter().copied().map(BuildRef::from).collect();
            let tag_lists = get_builds_tags(&self.hub, &refs).await?;
            for (build_id, tags) in uncached.into_iter().zip(tag_lists) {
                let shipped = tags
                    .unwrap_or_default()
                    .iter()
                    .any(|tag| tag.name.ends_with(RELEASED_TAG_SUFFIX));
                self.shipping_statuses.insert(build_id, shipped);
            }
        }

        Ok(build_ids
            .iter()
            .copied()
            .filter(|build_id| self.shipping_statuses.get(build_id).copied().unwrap_or(false))
            .collect())
    }

    /// Ids of the `builds` that carry embargoed fixes.
    pub async fn find_embargoed_builds(&mut self, builds: &[BuildInfo]) -> Result<BTreeSet<BuildId>, HubError> {
        tracing::info!(builds = builds.len(), "filtering out shipped builds");
        let build_ids: Vec<BuildId> = builds.iter().map(|b| b.id).collect();
        let shipped = self.find_shipped_builds(&build_ids).await?;
        let suspects: Vec<&BuildInfo> = builds.iter().filter(|b| !shipped.contains(&b.id)).collect();

        let mut embargoed: BTreeSet<BuildId> = suspects
            .iter()
            .filter(|b| b.release.contains(EMBARGO_MARKER))
            .map(|b| b.id)
            .collect();

        // Images built from unshipped .p1 RPMs are embargoed too.
        let mut suspect_ids: Vec<BuildId> = Vec::new();
        for build in &suspects {
            if !embargoed.contains(&build.id) && !suspect_ids.contains(&build.id) {
                suspect_ids.push(build.id);
            }
        }
        let suspect_archives = self.image_archives(&suspect_ids).await?;

        let suspect_rpm_builds: Vec<BuildId> = suspect_archives
            .iter()
            .flat_map(|archive| archive.rpms.iter().flatten())
            .filter(|rpm| rpm.release.contains(EMBARGO_MARKER))
            .map(|rpm| rpm.build_id)
            .collect();
        let shipped_rpm_builds = self.find_shipped_builds(&suspect_rpm_builds).await?;

        for archive in &suspect_archives {
            let carries_embargo = archive.rpms.iter().flatten().any(|rpm| {
                rpm.release.contains(EMBARGO_MARKER) && !shipped_rpm_builds.contains(&rpm.build_id)
            });
            if carries_embargo {
                embargoed.insert(archive.build_id);
            }
        }
        Ok(embargoed)
    }

    /// Image archives of `build_ids`, each with its RPM list filled in.
    async fn image_archives(&mut self, build_ids: &[BuildId]) -> Result<Vec<ArchiveInfo>, HubError> {
        let uncached: Vec<BuildId> = build_ids
            .iter()
            .copied()
            .filter(|build_id| !self.archive_lists.contains_key(build_id))
            .collect();
        if !uncached.is_empty() {
            tracing::info!(builds = uncached.len(), "fetching image archives");
            // Non-image builds come back with an empty list.
            let lists = list_archives_by_builds(&self.hub, &uncached, "image").await?;
            for (build_id, archives) in uncached.into_iter().zip(lists) {
                self.archive_lists.insert(build_id, archives.unwrap_or_default());
            }
        }

        let mut archives: Vec<ArchiveInfo> = build_ids
            .iter()
            .filter_map(|build_id| self.archive_lists.get(build_id))
            .flatten()
            .cloned()
            .collect();

        let missing: Vec<usize> = archives
            .iter()
            .enumerate()
            .filter(|(_, archive)| archive.rpms.is_none())
            .map(|(index, _)| index)
            .collect();
        if !missing.is_empty() {
            tracing::info!(images = missing.len(), "fetching rpms in images");
            let ids: Vec<_> = missing.iter().map(|&index| archives[index].id).collect();
            let rpm_lists = list_image_rpms(&self.hub, &ids).await?;
            for (index, rpms) in missing.into_iter().zip(rpm_lists) {
                archives[index].rpms = Some(rpms.unwrap_or_default());
            }
        }
        Ok(archives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArchiveId, RpmInfo, TagInfo};
    use crate::impls::InMemoryHub;
    use std::sync::Arc;

    fn build(id: i64, release: &str) -> BuildInfo {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "nvr": format!("foo-1.0-{release}"),
            "release": release,
            "creation_event_id": 1,
        }))
        .unwrap()
    }

    fn tags(names: &[&str]) -> Vec<TagInfo> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| serde_json::from_value(serde_json::json!({"id": i + 1, "name": name})).unwrap())
            .collect()
    }

    fn rpm(build_id: i64, release: &str) -> RpmInfo {
        serde_json::from_value(serde_json::json!({"id": build_id * 10, "build_id": build_id, "release": release}))
            .unwrap()
    }

    fn archive(id: i64, build_id: i64) -> ArchiveInfo {
        serde_json::from_value(serde_json::json!({"id": id, "build_id": build_id})).unwrap()
    }

    fn ids(raw: &[i64]) -> Vec<BuildId> {
        raw.iter().copied().map(BuildId::new).collect()
    }

    #[tokio::test]
    async fn shipped_means_a_released_tag() {
        let hub = Arc::new(InMemoryHub::new());
        hub.set_build_tags(BuildId::new(1), tags(&["foo-candidate"]));
        hub.set_build_tags(BuildId::new(2), tags(&["bar-candidate", "bar-released"]));
        let mut detector = EmbargoDetector::new(Arc::clone(&hub));

        let shipped = detector.find_shipped_builds(&ids(&[1, 2, 3])).await.unwrap();

        assert_eq!(shipped, HashSet::from([BuildId::new(2)]));
    }

    #[tokio::test]
    async fn shipping_status_is_cached() {
        let hub = Arc::new(InMemoryHub::new());
        hub.set_build_tags(BuildId::new(1), tags(&["RHBA-2020:2713-released"]));
        let mut detector = EmbargoDetector::new(Arc::clone(&hub));

        detector.find_shipped_builds(&ids(&[1, 1])).await.unwrap();
        let again = detector.find_shipped_builds(&ids(&[1])).await.unwrap();

        assert!(again.contains(&BuildId::new(1)));
        assert_eq!(hub.multicalls(), vec![1]);
    }

    #[tokio::test]
    async fn finds_p1_builds_and_images_with_unshipped_p1_rpms() {
        let hub = Arc::new(InMemoryHub::new());
        for (id, tag) in [(1, "foo-candidate"), (2, "foo-candidate"), (3, "foo-released"), (4, "foo-candidate"), (5, "foo-released"), (101, "bar-released")] {
            hub.set_build_tags(BuildId::new(id), tags(&[tag]));
        }
        for id in 1..=5 {
            hub.add_archive(archive(id * 10 + 1, id));
        }
        hub.set_image_rpms(ArchiveId::new(11), vec![rpm(101, "101.p1")]);
        hub.set_image_rpms(ArchiveId::new(21), vec![rpm(201, "201.p1"), rpm(202, "202.p0")]);
        let builds = vec![
            build(1, "1.p0"),
            build(2, "2.p0"),
            build(3, "3.p0"),
            build(4, "4.p1"),
            build(5, "5.p1"),
        ];
        let mut detector = EmbargoDetector::new(Arc::clone(&hub));

        let embargoed = detector.find_embargoed_builds(&builds).await.unwrap();

        assert_eq!(embargoed, BTreeSet::from([BuildId::new(2), BuildId::new(4)]));
        // build tags, image archives, their rpms, rpm build tags
        assert_eq!(hub.multicalls(), vec![5, 2, 2, 2]);

        let again = detector.find_embargoed_builds(&builds).await.unwrap();
        assert_eq!(again, embargoed);
        assert_eq!(hub.multicalls().len(), 4);
    }

    #[tokio::test]
    async fn non_image_builds_have_no_archives() {
        let hub = Arc::new(InMemoryHub::new());
        let mut detector = EmbargoDetector::new(Arc::clone(&hub));

        let embargoed = detector
            .find_embargoed_builds(&[build(7, "1.el8")])
            .await
            .unwrap();

        assert!(embargoed.is_empty());
    }
}
