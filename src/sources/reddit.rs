use crate::fetcher::Fetcher;
use crate::sources::{rss, SourceAdapter};
use crate::types::{RawItem, Result, Source, SourceType};
use async_trait::async_trait;
use tracing::info;

/// Adapter for subreddit feeds via Reddit's `.rss` endpoints. The Atom feed
/// carries no vote counts, so popularity stays unset for these items.
pub struct RedditAdapter;

impl RedditAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Append `.rss` to subreddit URLs that point at the HTML listing.
    fn feed_url(url: &str) -> String {
        let trimmed = url.trim_end_matches('/');
        if trimmed.ends_with(".rss") {
            trimmed.to_string()
        } else {
            format!("{trimmed}.rss")
        }
    }
}

impl Default for RedditAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Reddit
    }

    fn can_handle(&self, url: &str) -> bool {
        url.to_lowercase().contains("reddit.com")
    }

    fn source_name(&self, url: &str) -> String {
        if let Some(pos) = url.find("/r/") {
            let sub = url[pos + 3..]
                .split(['/', '.', '?'])
                .next()
                .unwrap_or("unknown");
            format!("reddit-r-{sub}")
        } else {
            "reddit".to_string()
        }
    }

    async fn parse(&self, source: &Source, fetcher: &Fetcher) -> Result<Vec<RawItem>> {
        let feed_url = Self::feed_url(&source.resource_url);
        let content = fetcher.fetch_text(&feed_url).await?;
        let items = rss::parse_feed_content(&content, &source.name)?;
        info!("Parsed {} items from subreddit {}", items.len(), source.name);
        Ok(items)
    }
}
