//! TagChangeCache - most recent tag-history event per tag.
//!
//! Used to answer "did any of these buildroot tags change after this build
//! was made?". Tag history is append-only, so the first answer for a tag is
//! kept for the life of the process: entries are never refreshed or evicted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;

use crate::domain::{BuildInfo, HubError, TagChange, TagRef};
use crate::ports::BuildHub;

type Entry = Arc<OnceCell<Option<TagChange>>>;

/// Memoized `tagHistory(tag, limit=1)` lookups.
///
/// Each tag is fetched at most once, even when several tasks ask for it at the
/// same moment: late callers wait on the first fetch. A failed fetch leaves
/// the entry empty so the next caller tries again.
#[derive(Debug, Default)]
pub struct TagChangeCache {
    entries: Mutex<HashMap<TagRef, Entry>>,
}

impl TagChangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TagRef, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry(&self, tag: &TagRef) -> Entry {
        Arc::clone(self.lock().entry(tag.clone()).or_default())
    }

    /// Latest change event for `tag`, `None` if the tag has no history.
    pub async fn latest_change<H>(&self, hub: &H, tag: &TagRef) -> Result<Option<TagChange>, HubError>
    where
        H: BuildHub + ?Sized,
    {
        let entry = self.entry(tag);
        let change = entry
            .get_or_try_init(|| async {
                // The hub returns history newest first.
                let history = hub.tag_history(tag, 1).await?;
                tracing::debug!(%tag, events = history.len(), "fetched latest tag change");
                Ok::<_, HubError>(history.into_iter().next())
            })
            .await?;
        Ok(change.clone())
    }

    /// Cached value without touching the hub. Outer `None` means "not fetched".
    pub fn peek(&self, tag: &TagRef) -> Option<Option<TagChange>> {
        self.lock().get(tag).and_then(|entry| entry.get().cloned())
    }

    /// Number of tags fetched so far.
    pub fn len(&self) -> usize {
        self.lock().values().filter(|entry| entry.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Latest change events of `tags` that happened after `build` was created.
    ///
    /// A tag qualifies when its latest event ordinal is strictly greater than
    /// the build's creation event. Tags without history never qualify.
    /// Results keep the order of `tags`.
    pub async fn tags_changed_since_build<H>(
        &self,
        hub: &H,
        build: &BuildInfo,
        tags: &[TagRef],
    ) -> Result<Vec<TagChange>, HubError>
    where
        H: BuildHub + ?Sized,
    {
        let mut changed = Vec::new();
        for tag in tags {
            if let Some(change) = self.latest_change(hub, tag).await?
                && change.create_event > build.creation_event_id
            {
                changed.push(change);
            }
        }
        tracing::debug!(
            nvr = %build.nvr,
            event = %build.creation_event_id,
            changed = changed.len(),
            "checked buildroot tags for changes since build"
        );
        Ok(changed)
    }
}
