use crate::fetcher::Fetcher;
use crate::sources::{rss, SourceAdapter};
use crate::types::{RawItem, Result, Source, SourceType};
use async_trait::async_trait;
use tracing::info;

/// Adapter for YouTube channel uploads via the public Atom feed at
/// `youtube.com/feeds/videos.xml`.
pub struct YoutubeAdapter;

impl YoutubeAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Map a channel URL to its Atom feed. URLs that already point at the
    /// feed pass through unchanged.
    fn feed_url(url: &str) -> String {
        if url.contains("/feeds/videos.xml") {
            return url.to_string();
        }
        if let Some(pos) = url.find("/channel/") {
            let channel_id = url[pos + 9..].split(['/', '?']).next().unwrap_or("");
            if !channel_id.is_empty() {
                return format!("https://www.youtube.com/feeds/videos.xml?channel_id={channel_id}");
            }
        }
        url.to_string()
    }
}

impl Default for YoutubeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for YoutubeAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Youtube
    }

    fn can_handle(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        lower.contains("youtube.com") || lower.contains("youtu.be")
    }

    fn source_name(&self, url: &str) -> String {
        if let Some(pos) = url.find("channel_id=") {
            let id = url[pos + 11..].split('&').next().unwrap_or("channel");
            return format!("youtube-{id}");
        }
        if let Some(pos) = url.find("/channel/") {
            let id = url[pos + 9..].split(['/', '?']).next().unwrap_or("channel");
            return format!("youtube-{id}");
        }
        if let Some(pos) = url.find("/@") {
            let handle = url[pos + 2..].split(['/', '?']).next().unwrap_or("channel");
            return format!("youtube-{handle}");
        }
        "youtube".to_string()
    }

    async fn parse(&self, source: &Source, fetcher: &Fetcher) -> Result<Vec<RawItem>> {
        let feed_url = Self::feed_url(&source.resource_url);
        let content = fetcher.fetch_text(&feed_url).await?;
        let items = rss::parse_feed_content(&content, &source.name)?;
        info!("Parsed {} items from channel {}", items.len(), source.name);
        Ok(items)
    }
}
