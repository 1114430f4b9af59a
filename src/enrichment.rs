use crate::types::{FeedItem, ProcessedContent, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Consumed contract of the summarization/analysis subsystem. Batch sizing is
/// the enricher's own concern; callers hand over whole batches.
///
/// Output is optional annotation only. Implementations return one
/// `ProcessedContent` per input item, in order; a neutral (all-`None`) entry
/// means "nothing to add" and is always acceptable.
#[async_trait]
pub trait ContentEnricher: Send + Sync {
    fn name(&self) -> &str;

    async fn process_items(&self, items: &[FeedItem]) -> Result<Vec<ProcessedContent>>;
}

/// Run the enricher with a timeout and degrade to pass-through on any
/// failure. Feed generation never blocks on enrichment: an error or timeout
/// produces neutral annotations and a warning, nothing more.
pub async fn enrich_or_passthrough(
    enricher: &dyn ContentEnricher,
    items: &[FeedItem],
    timeout: Duration,
) -> Vec<ProcessedContent> {
    if items.is_empty() {
        return Vec::new();
    }

    let neutral = || vec![ProcessedContent::default(); items.len()];

    match tokio::time::timeout(timeout, enricher.process_items(items)).await {
        Ok(Ok(processed)) if processed.len() == items.len() => processed,
        Ok(Ok(processed)) => {
            warn!(
                "Enricher {} returned {} results for {} items; ignoring output",
                enricher.name(),
                processed.len(),
                items.len()
            );
            neutral()
        }
        Ok(Err(e)) => {
            warn!("Enricher {} failed, continuing un-enriched: {}", enricher.name(), e);
            neutral()
        }
        Err(_) => {
            warn!(
                "Enricher {} timed out after {:?}, continuing un-enriched",
                enricher.name(),
                timeout
            );
            neutral()
        }
    }
}

/// Extractive fallback enricher: first sentences as the summary, capitalized
/// words as topics. Used when no LLM-backed enricher is wired in.
pub struct HeuristicEnricher {
    max_summary_len: usize,
}

impl HeuristicEnricher {
    pub fn new() -> Self {
        Self { max_summary_len: 280 }
    }

    fn summarize(&self, item: &FeedItem) -> Option<String> {
        let text = item.description.as_deref().or(item.summary.as_deref())?;
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if text.len() <= self.max_summary_len {
            return Some(text.to_string());
        }

        let cut = text
            .char_indices()
            .take_while(|(i, _)| *i < self.max_summary_len)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(text.len());
        let excerpt = &text[..cut];
        match excerpt.rfind('.') {
            Some(pos) if pos > 0 => Some(excerpt[..=pos].to_string()),
            _ => Some(format!("{}...", excerpt.trim_end())),
        }
    }

    fn topics(&self, item: &FeedItem) -> Vec<String> {
        let mut topics: Vec<String> = item
            .title
            .split_whitespace()
            .filter(|word| word.len() > 2)
            .filter(|word| word.chars().next().is_some_and(|c| c.is_uppercase()))
            .map(|word| {
                word.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|word| word.len() > 2)
            .collect();
        topics.sort();
        topics.dedup();
        topics.truncate(10);
        topics
    }
}

impl Default for HeuristicEnricher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentEnricher for HeuristicEnricher {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn process_items(&self, items: &[FeedItem]) -> Result<Vec<ProcessedContent>> {
        Ok(items
            .iter()
            .map(|item| ProcessedContent {
                summary: self.summarize(item),
                topics: self.topics(item),
                quality_score: None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeedJamError;
    use chrono::Utc;
    use uuid::Uuid;

    struct FailingEnricher;

    #[async_trait]
    impl ContentEnricher for FailingEnricher {
        fn name(&self) -> &str {
            "failing"
        }

        async fn process_items(&self, _items: &[FeedItem]) -> Result<Vec<ProcessedContent>> {
            Err(FeedJamError::Enrichment("provider unavailable".to_string()))
        }
    }

    fn item(title: &str, description: Option<&str>) -> FeedItem {
        FeedItem {
            id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            source_name: "test".to_string(),
            local_id: None,
            link: Some("https://example.com/a".to_string()),
            title: title.to_string(),
            description: description.map(String::from),
            summary: None,
            article_url: None,
            comments_url: None,
            points: None,
            views: None,
            num_comments: None,
            published: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn failure_degrades_to_neutral_annotations() {
        let items = vec![item("One", Some("text")), item("Two", None)];
        let processed =
            enrich_or_passthrough(&FailingEnricher, &items, Duration::from_secs(1)).await;

        assert_eq!(processed.len(), 2);
        assert!(processed.iter().all(|p| p.summary.is_none()));
    }

    #[tokio::test]
    async fn heuristic_extracts_summary_and_topics() {
        let items = vec![item(
            "Rust Memory Safety Explained",
            Some("A short description. With more detail after."),
        )];
        let processed = HeuristicEnricher::new().process_items(&items).await.unwrap();

        assert_eq!(processed.len(), 1);
        assert!(processed[0].summary.as_deref().unwrap().starts_with("A short description."));
        assert!(processed[0].topics.contains(&"rust".to_string()));
    }
}
