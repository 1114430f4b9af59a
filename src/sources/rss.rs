use crate::fetcher::Fetcher;
use crate::sources::SourceAdapter;
use crate::types::{FeedJamError, RawItem, Result, Source, SourceType};
use async_trait::async_trait;
use chrono::Utc;
use feed_rs::parser;
use tracing::{debug, info, warn};
use url::Url;

/// Generic RSS/Atom adapter. This is the fallback for any URL no specific
/// adapter claims, so `can_handle` accepts everything.
pub struct RssAdapter;

impl RssAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RssAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Rss
    }

    fn can_handle(&self, _url: &str) -> bool {
        true
    }

    fn source_name(&self, url: &str) -> String {
        match Url::parse(url) {
            Ok(parsed) => {
                let domain = parsed
                    .domain()
                    .unwrap_or("feed")
                    .trim_start_matches("www.")
                    .to_string();
                let path = parsed.path().trim_matches('/').replace('/', "-");
                if path.is_empty() || matches!(path.as_str(), "rss" | "feed" | "atom" | "index.xml") {
                    domain
                } else {
                    format!("{domain}-{path}")
                }
            }
            Err(_) => "feed".to_string(),
        }
    }

    async fn parse(&self, source: &Source, fetcher: &Fetcher) -> Result<Vec<RawItem>> {
        let content = fetcher.fetch_text(&source.resource_url).await?;
        let items = parse_feed_content(&content, &source.name)?;
        info!("Parsed {} items from feed {}", items.len(), source.name);
        Ok(items)
    }
}

/// Parse RSS/Atom content into raw items. Entries missing both an id and a
/// link are unidentifiable and get skipped with a warning; everything else is
/// returned even when the feed is otherwise malformed.
pub fn parse_feed_content(content: &str, source_name: &str) -> Result<Vec<RawItem>> {
    let feed = parser::parse(content.as_bytes())
        .map_err(|e| FeedJamError::Parse(format!("Failed to parse feed: {e}")))?;

    let mut items = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        let title = entry
            .title
            .map(|t| t.content)
            .unwrap_or_else(|| "Untitled".to_string());

        let link = entry.links.first().map(|l| l.href.clone());
        let local_id = if entry.id.is_empty() {
            link.clone()
        } else {
            Some(entry.id.clone())
        };

        if local_id.is_none() && link.is_none() {
            warn!("Skipping unidentifiable entry '{}' in {}", title, source_name);
            continue;
        }

        let description = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body));

        let published = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc));

        debug!("Parsed entry '{}' from {}", title, source_name);

        items.push(RawItem {
            title,
            article_url: link.clone(),
            link,
            source_name: source_name.to_string(),
            local_id,
            description,
            summary: None,
            comments_url: None,
            points: None,
            views: None,
            num_comments: None,
            published,
        });
    }

    Ok(items)
}
