use crate::storage::FeedItemStore;
use crate::types::{FeedItem, RawItem, Result, Source};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of persisting one batch of adapter output.
#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// Candidates the adapter produced.
    pub found: usize,
    /// Candidates that were actually new and got stored.
    pub new_items: Vec<FeedItem>,
    /// Candidates dropped because they carried neither a local id nor a link.
    pub unidentifiable: usize,
}

/// Decides whether adapter output is new relative to everything already
/// stored for a source.
///
/// Sources re-emit the same item across polls (GUID reuse, pagination
/// overlap), so every candidate is checked against a dual key: the
/// `(local_id, source_name)` pair when the adapter provides a local id, then
/// the exact link URL within the same source. The existence checks are an
/// optimization; the storage layer's uniqueness constraints are what actually
/// win races between concurrent fetch runs.
pub struct Deduplicator {
    feed_items: Arc<dyn FeedItemStore>,
}

impl Deduplicator {
    pub fn new(feed_items: Arc<dyn FeedItemStore>) -> Self {
        Self { feed_items }
    }

    /// Whether a candidate is new for its source. Unidentifiable candidates
    /// are never new.
    pub async fn is_new(&self, candidate: &RawItem) -> Result<bool> {
        if let Some(local_id) = candidate.local_id.as_deref() {
            if self
                .feed_items
                .find_by_local_id(&candidate.source_name, local_id)
                .await?
                .is_some()
            {
                return Ok(false);
            }
        }

        if let Some(link) = candidate.link.as_deref() {
            if self
                .feed_items
                .find_by_link(&candidate.source_name, link)
                .await?
                .is_some()
            {
                return Ok(false);
            }
        }

        Ok(candidate.is_identifiable())
    }

    /// Persist a candidate if it is new. Returns `None` for known or
    /// unidentifiable candidates. An insert conflict (a concurrent run beat
    /// us) is treated as "not new"; the existing record wins.
    pub async fn persist(&self, source: &Source, candidate: &RawItem) -> Result<Option<FeedItem>> {
        if !candidate.is_identifiable() {
            warn!(
                "Dropping unidentifiable item '{}' from {}: no local id or link",
                candidate.title, candidate.source_name
            );
            return Ok(None);
        }

        if !self.is_new(candidate).await? {
            debug!("Skipping known item '{}' from {}", candidate.title, candidate.source_name);
            return Ok(None);
        }

        match self.feed_items.insert(source, candidate).await? {
            Some(item) => Ok(Some(item)),
            None => {
                debug!(
                    "Insert conflict for '{}' from {}; keeping existing record",
                    candidate.title, candidate.source_name
                );
                Ok(None)
            }
        }
    }

    /// Run a whole adapter batch through dedup, collecting run statistics.
    pub async fn persist_batch(
        &self,
        source: &Source,
        candidates: Vec<RawItem>,
    ) -> Result<DedupOutcome> {
        let mut outcome = DedupOutcome {
            found: candidates.len(),
            ..Default::default()
        };

        for candidate in &candidates {
            if !candidate.is_identifiable() {
                outcome.unidentifiable += 1;
                warn!(
                    "Dropping unidentifiable item '{}' from {}: no local id or link",
                    candidate.title, candidate.source_name
                );
                continue;
            }
            if let Some(item) = self.persist(source, candidate).await? {
                outcome.new_items.push(item);
            }
        }

        Ok(outcome)
    }
}
