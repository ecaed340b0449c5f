//! Domain identifiers (strongly-typed IDs).
//!
//! The build hub hands out plain integers for tasks, builds, archives, tags and
//! events. They all share one generic `Id<T>` so that a `TaskId` can never be
//! passed where a `BuildId` is expected, while `T` only exists at compile time
//! (`PhantomData`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Marker trait for each ID kind.
///
/// Provides the prefix used by `Display` ("task-", "build-", ...).
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic hub identifier.
///
/// Serializes as the bare integer, which is what the hub speaks on the wire.
#[repr(transparent)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: i64,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub const fn new(value: i64) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    pub fn get(&self) -> i64 {
        self.value
    }

    /// The hub never issues id 0, callers use it as "no id".
    pub fn is_blank(&self) -> bool {
        self.value == 0
    }
}

// Manual impls: derives would put bounds on `T`, which is an uninhabited marker.
impl<T: IdMarker> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: IdMarker> Copy for Id<T> {}

impl<T: IdMarker> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: IdMarker> Eq for Id<T> {}

impl<T: IdMarker> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T: IdMarker> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: IdMarker> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T: IdMarker> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T: IdMarker> From<i64> for Id<T> {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

// ========================================
// Marker types
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Build {}

impl IdMarker for Build {
    fn prefix() -> &'static str {
        "build-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Archive {}

impl IdMarker for Archive {
    fn prefix() -> &'static str {
        "archive-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {}

impl IdMarker for Tag {
    fn prefix() -> &'static str {
        "tag-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Event {}

impl IdMarker for Event {
    fn prefix() -> &'static str {
        "event-"
    }
}

// ========================================
// Type aliases
// ========================================

/// Identifier of a remote build task.
pub type TaskId = Id<Task>;

/// Identifier of a build.
pub type BuildId = Id<Build>;

/// Identifier of an archive (one image/arch artifact of a build).
pub type ArchiveId = Id<Archive>;

/// Identifier of a tag.
pub type TagId = Id<Tag>;

/// Ordinal of a hub event. Later events compare greater.
pub type EventId = Id<Event>;

/// A build addressed either by id or by NVR (name-version-release).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildRef {
    Id(BuildId),
    Nvr(String),
}

impl BuildRef {
    pub fn is_blank(&self) -> bool {
        match self {
            BuildRef::Id(id) => id.is_blank(),
            BuildRef::Nvr(nvr) => nvr.is_empty(),
        }
    }
}

impl From<BuildId> for BuildRef {
    fn from(id: BuildId) -> Self {
        BuildRef::Id(id)
    }
}

impl From<&str> for BuildRef {
    fn from(nvr: &str) -> Self {
        BuildRef::Nvr(nvr.to_string())
    }
}

impl fmt::Display for BuildRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildRef::Id(id) => id.fmt(f),
            BuildRef::Nvr(nvr) => nvr.fmt(f),
        }
    }
}

/// A tag addressed either by id or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagRef {
    Id(TagId),
    Name(String),
}

impl TagRef {
    pub fn is_blank(&self) -> bool {
        match self {
            TagRef::Id(id) => id.is_blank(),
            TagRef::Name(name) => name.is_empty(),
        }
    }
}

impl From<TagId> for TagRef {
    fn from(id: TagId) -> Self {
        TagRef::Id(id)
    }
}

impl From<&str> for TagRef {
    fn from(name: &str) -> Self {
        TagRef::Name(name.to_string())
    }
}

impl fmt::Display for TagRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagRef::Id(id) => id.fmt(f),
            TagRef::Name(name) => name.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_integers() {
        let task = TaskId::new(4242);
        assert_eq!(serde_json::to_string(&task).unwrap(), "4242");

        let back: TaskId = serde_json::from_str("4242").unwrap();
        assert_eq!(back, task);
        assert_eq!(back.get(), 4242);
    }

    #[test]
    fn debug_carries_kind_prefix() {
        assert_eq!(format!("{:?}", TaskId::new(7)), "task-7");
        assert_eq!(format!("{:?}", BuildId::new(7)), "build-7");
        assert_eq!(TaskId::new(7).to_string(), "7");
    }

    #[test]
    fn event_ids_order_by_value() {
        assert!(EventId::new(10) < EventId::new(11));
    }

    #[test]
    fn refs_report_blank_inputs() {
        assert!(BuildRef::Id(BuildId::new(0)).is_blank());
        assert!(BuildRef::Nvr(String::new()).is_blank());
        assert!(!BuildRef::from("foo-1.0-1").is_blank());
        assert!(TagRef::Name(String::new()).is_blank());
        assert!(!TagRef::from(TagId::new(3)).is_blank());
    }

    #[test]
    fn refs_deserialize_untagged() {
        let by_id: BuildRef = serde_json::from_str("12").unwrap();
        assert_eq!(by_id, BuildRef::Id(BuildId::new(12)));

        let by_name: TagRef = serde_json::from_str("\"rhaos-4.6-rhel-8-build\"").unwrap();
        assert_eq!(by_name, TagRef::from("rhaos-4.6-rhel-8-build"));
    }
}
