//! Build-farm records returned by hub queries.
//!
//! The hub returns loosely shaped maps. We type the fields we read and keep
//! everything else in `extra`, so records survive a round trip untouched.

use serde::{Deserialize, Serialize};

use super::ids::{ArchiveId, BuildId, EventId, TagId};

type Extra = serde_json::Map<String, serde_json::Value>;

/// A build (`getBuild`, `getLatestBuilds`, `listTagged`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub id: BuildId,
    pub nvr: String,

    #[serde(default)]
    pub release: String,

    /// Event at which the build was created (completed).
    pub creation_event_id: EventId,

    #[serde(flatten)]
    pub extra: Extra,
}

/// One archive of a build (`listArchives`), e.g. one image per arch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveInfo {
    pub id: ArchiveId,
    pub build_id: BuildId,

    /// Filled in by `list_archives_by_builds` with the RPMs inside the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpms: Option<Vec<RpmInfo>>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// An RPM (`listRPMs`, `listBuildRPMs`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpmInfo {
    pub id: i64,
    pub build_id: BuildId,

    #[serde(default)]
    pub release: String,

    #[serde(flatten)]
    pub extra: Extra,
}

/// A tag (`listTags`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagInfo {
    pub id: TagId,
    pub name: String,

    #[serde(flatten)]
    pub extra: Extra,
}

/// A tag-history event (`tagHistory`): a build entered or left a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagChange {
    pub create_event: EventId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<TagId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<BuildId>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl TagChange {
    pub fn new(create_event: EventId) -> Self {
        Self {
            create_event,
            tag_id: None,
            tag_name: None,
            build_id: None,
            extra: Extra::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_keeps_unknown_fields() {
        let raw = serde_json::json!({
            "id": 1234,
            "nvr": "ose-cli-container-v4.6.0-1",
            "release": "1",
            "creation_event_id": 555,
            "owner_name": "ocp-build"
        });
        let build: BuildInfo = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(build.id, BuildId::new(1234));
        assert_eq!(build.creation_event_id, EventId::new(555));
        assert_eq!(build.extra["owner_name"], "ocp-build");
        assert_eq!(serde_json::to_value(&build).unwrap(), raw);
    }

    #[test]
    fn archive_rpms_are_optional() {
        let raw = serde_json::json!({"id": 11, "build_id": 1, "arch": "x86_64"});
        let archive: ArchiveInfo = serde_json::from_value(raw).unwrap();
        assert!(archive.rpms.is_none());
        assert_eq!(archive.extra["arch"], "x86_64");
    }

    #[test]
    fn tag_change_reads_event_ordinal() {
        let raw = serde_json::json!({
            "create_event": 900,
            "revoke_event": null,
            "tag_name": "rhaos-4.6-rhel-8-build",
            "tag_id": 3
        });
        let change: TagChange = serde_json::from_value(raw).unwrap();
        assert_eq!(change.create_event, EventId::new(900));
        assert_eq!(change.tag_id, Some(TagId::new(3)));
        assert!(change.extra.contains_key("revoke_event"));
    }
}
