//! Source adapters. Each subscribable origin type implements
//! [`SourceAdapter`]; dispatch from a source's type tag to its adapter is a
//! closed lookup in [`AdapterRegistry`]. Adding a source type means adding a
//! variant to [`SourceType`] and an adapter here, not changing the dispatcher.

pub mod github;
pub mod hackernews;
mod html;
pub mod reddit;
pub mod rss;
pub mod telegram;
pub mod youtube;

use crate::fetcher::Fetcher;
use crate::types::{RawItem, Result, Source, SourceType};
use async_trait::async_trait;

pub use github::GithubAdapter;
pub use hackernews::HackerNewsAdapter;
pub use reddit::RedditAdapter;
pub use rss::RssAdapter;
pub use telegram::TelegramAdapter;
pub use youtube::YoutubeAdapter;

/// Capability interface every pollable source type implements.
///
/// `parse` must not fail on partial/malformed feed content: it returns the
/// items it could extract and logs the rest. A hard failure (network error,
/// completely unparseable payload) is surfaced to the pipeline, which records
/// it on the subscription's run.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source_type(&self) -> SourceType;

    /// Capability check used when auto-detecting the type of a bare URL.
    fn can_handle(&self, url: &str) -> bool;

    /// Derive a stable, human-readable source name from the URL.
    fn source_name(&self, url: &str) -> String;

    async fn parse(&self, source: &Source, fetcher: &Fetcher) -> Result<Vec<RawItem>>;
}

/// Adapter lookup and URL auto-detection. Specific source types are checked
/// before the generic RSS fallback, which accepts anything.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn SourceAdapter>>,
    fallback: RssAdapter,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: vec![
                Box::new(HackerNewsAdapter::new()),
                Box::new(TelegramAdapter::new()),
                Box::new(RedditAdapter::new()),
                Box::new(YoutubeAdapter::new()),
                Box::new(GithubAdapter::new()),
            ],
            fallback: RssAdapter::new(),
        }
    }

    /// Adapter for a source type tag. `None` for types that are not polled
    /// (email sources are push-ingested, never fetched).
    pub fn for_type(&self, source_type: SourceType) -> Option<&dyn SourceAdapter> {
        match source_type {
            SourceType::Email => None,
            SourceType::Rss => Some(&self.fallback),
            other => self
                .adapters
                .iter()
                .find(|a| a.source_type() == other)
                .map(|a| a.as_ref()),
        }
    }

    /// Detect the source type of a bare URL. Specific adapters win; RSS is
    /// the unconditional fallback.
    pub fn detect(&self, url: &str) -> &dyn SourceAdapter {
        for adapter in &self.adapters {
            if adapter.can_handle(url) {
                return adapter.as_ref();
            }
        }
        &self.fallback
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
