use crate::fetcher::Fetcher;
use crate::sources::html::strip_tags;
use crate::sources::{rss, SourceAdapter};
use crate::types::{RawItem, Result, Source, SourceType};
use async_trait::async_trait;
use tracing::info;

/// Adapter for Hacker News feeds. hnrss.org feeds embed points, comment
/// counts and the article URL in the entry summary HTML; this adapter lifts
/// them into structured fields so the scoring engine can use them.
pub struct HackerNewsAdapter;

impl HackerNewsAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Pull structured metadata out of an hnrss.org summary.
    ///
    /// The summary looks like:
    /// `<p>Article URL: ...</p><p>Comments URL: ...</p><p>Points: 123</p><p># Comments: 45</p>`
    ///
    /// Returns (points, num_comments, article_url, comments_url, description).
    fn parse_summary(
        summary: &str,
    ) -> (Option<i64>, Option<i64>, Option<String>, Option<String>, String) {
        let text = strip_tags(summary);
        let mut points = None;
        let mut num_comments = None;
        let mut article_url = None;
        let mut comments_url = None;
        let mut description_parts: Vec<&str> = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix("Article URL:") {
                article_url = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("Comments URL:") {
                comments_url = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("Points:") {
                points = rest.trim().parse::<i64>().ok();
            } else if let Some(rest) = line.strip_prefix("# Comments:") {
                num_comments = rest.trim().parse::<i64>().ok();
            } else {
                description_parts.push(line);
            }
        }

        (
            points,
            num_comments,
            article_url,
            comments_url,
            description_parts.join(" "),
        )
    }
}

impl Default for HackerNewsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for HackerNewsAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::HackerNews
    }

    fn can_handle(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        lower.contains("hnrss.org") || lower.contains("news.ycombinator.com")
    }

    fn source_name(&self, url: &str) -> String {
        // Feed flavor is the last path segment: frontpage, newest, best, ...
        let path = url
            .split('/')
            .next_back()
            .unwrap_or("")
            .split('?')
            .next()
            .unwrap_or("");
        let flavor = match path {
            "" | "rss" => "frontpage",
            other => other.trim_end_matches(".atom").trim_end_matches(".rss"),
        };
        format!("hackernews-{flavor}")
    }

    async fn parse(&self, source: &Source, fetcher: &Fetcher) -> Result<Vec<RawItem>> {
        let content = fetcher.fetch_text(&source.resource_url).await?;
        let mut items = rss::parse_feed_content(&content, &source.name)?;

        for item in &mut items {
            let Some(summary_html) = item.description.take() else {
                continue;
            };
            let (points, num_comments, article_url, comments_url, description) =
                Self::parse_summary(&summary_html);

            item.points = points;
            item.num_comments = num_comments;
            item.article_url = article_url.or_else(|| item.link.clone());
            item.comments_url = comments_url.or_else(|| item.link.clone());
            item.description = if description.is_empty() {
                None
            } else {
                Some(description)
            };
        }

        info!("Parsed {} items from HN feed {}", items.len(), source.name);
        Ok(items)
    }
}
