use crate::fetcher::Fetcher;
use crate::sources::html::{between, strip_tags};
use crate::sources::SourceAdapter;
use crate::types::{FeedJamError, RawItem, Result, Source, SourceType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Adapter for public Telegram channels. There is no feed endpoint, so this
/// scrapes the `t.me/s/<channel>` preview page, which is the embed-oriented
/// variant of the channel page and the most stable markup Telegram exposes.
pub struct TelegramAdapter;

impl TelegramAdapter {
    pub fn new() -> Self {
        Self
    }

    fn channel_slug(url: &str) -> String {
        let after_host = url
            .split("t.me/")
            .nth(1)
            .or_else(|| url.split("telegram.me/").nth(1))
            .unwrap_or("");
        after_host
            .trim_start_matches("s/")
            .split(['/', '?'])
            .next()
            .unwrap_or("")
            .to_string()
    }

    fn preview_url(url: &str) -> String {
        let channel = Self::channel_slug(url);
        format!("https://t.me/s/{channel}")
    }

    /// Parse view counts like `1.5K` or `2.3M`.
    fn parse_view_count(views: &str) -> Option<i64> {
        let views = views.trim().to_uppercase();
        if views.is_empty() {
            return None;
        }
        if let Some(stripped) = views.strip_suffix('K') {
            return stripped.parse::<f64>().ok().map(|v| (v * 1_000.0) as i64);
        }
        if let Some(stripped) = views.strip_suffix('M') {
            return stripped.parse::<f64>().ok().map(|v| (v * 1_000_000.0) as i64);
        }
        views.replace([',', ' '], "").parse::<i64>().ok()
    }

    /// Extract messages from the preview page. Each message wrap carries a
    /// `data-post="channel/123"` id; text, views and timestamp live in
    /// well-known class names within the block.
    fn parse_page(html: &str, source_name: &str) -> Vec<RawItem> {
        let mut items = Vec::new();
        let marker = "data-post=\"";

        let mut offsets: Vec<usize> = Vec::new();
        let mut search_from = 0;
        while let Some(pos) = html[search_from..].find(marker) {
            offsets.push(search_from + pos);
            search_from += pos + marker.len();
        }

        for (idx, &offset) in offsets.iter().enumerate() {
            let block_end = offsets.get(idx + 1).copied().unwrap_or(html.len());
            let block = &html[offset..block_end];

            let Some(post_id) = between(block, 0, marker, "\"") else {
                continue;
            };

            let text = between(block, 0, "tgme_widget_message_text", "</div>")
                .and_then(|span| span.split_once('>').map(|(_, body)| strip_tags(body)))
                .unwrap_or_default();
            if text.is_empty() {
                continue;
            }

            let views = between(block, 0, "tgme_widget_message_views\">", "<")
                .and_then(Self::parse_view_count);

            let published = between(block, 0, "datetime=\"", "\"")
                .and_then(|dt| DateTime::parse_from_rfc3339(dt).ok())
                .map(|dt| dt.with_timezone(&Utc));

            let title: String = text.lines().next().unwrap_or("").chars().take(120).collect();
            let link = format!("https://t.me/{post_id}");

            items.push(RawItem {
                title,
                link: Some(link.clone()),
                source_name: source_name.to_string(),
                local_id: Some(post_id.to_string()),
                description: Some(text),
                summary: None,
                article_url: Some(link),
                comments_url: None,
                points: None,
                views,
                num_comments: None,
                published,
            });
        }

        items
    }
}

impl Default for TelegramAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for TelegramAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Telegram
    }

    fn can_handle(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        lower.contains("t.me/") || lower.contains("telegram.me/")
    }

    fn source_name(&self, url: &str) -> String {
        let channel = Self::channel_slug(url);
        if channel.is_empty() {
            "telegram".to_string()
        } else {
            format!("telegram-{channel}")
        }
    }

    async fn parse(&self, source: &Source, fetcher: &Fetcher) -> Result<Vec<RawItem>> {
        let url = Self::preview_url(&source.resource_url);
        let html = fetcher.fetch_text(&url).await?;

        if !html.contains("tgme_widget_message") {
            warn!("No messages found on preview page for {}", source.name);
            if html.contains("tgme_page") {
                // Channel exists but is private or empty.
                return Ok(Vec::new());
            }
            return Err(FeedJamError::Parse(format!(
                "Unrecognized Telegram page for {url}"
            )));
        }

        let items = Self::parse_page(&html, &source.name);
        info!("Parsed {} messages from channel {}", items.len(), source.name);
        Ok(items)
    }
}
