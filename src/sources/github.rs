use crate::fetcher::Fetcher;
use crate::sources::{rss, SourceAdapter};
use crate::types::{RawItem, Result, Source, SourceType};
use async_trait::async_trait;
use tracing::info;

/// Adapter for GitHub repository activity via the public Atom feeds
/// (`releases.atom`, `commits.atom`, `tags.atom`). A bare repository URL is
/// pointed at its releases feed.
pub struct GithubAdapter;

impl GithubAdapter {
    pub fn new() -> Self {
        Self
    }

    fn feed_url(url: &str) -> String {
        let trimmed = url.trim_end_matches('/');
        if trimmed.ends_with(".atom") {
            trimmed.to_string()
        } else {
            format!("{trimmed}/releases.atom")
        }
    }

    /// Owner and repository from a github.com URL.
    fn owner_repo(url: &str) -> Option<(String, String)> {
        let pos = url.find("github.com/")?;
        let mut segments = url[pos + 11..].split('/').filter(|s| !s.is_empty());
        let owner = segments.next()?.to_string();
        let repo = segments
            .next()?
            .trim_end_matches(".atom")
            .trim_end_matches(".git")
            .to_string();
        Some((owner, repo))
    }
}

impl Default for GithubAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for GithubAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Github
    }

    fn can_handle(&self, url: &str) -> bool {
        url.to_lowercase().contains("github.com")
    }

    fn source_name(&self, url: &str) -> String {
        match Self::owner_repo(url) {
            Some((owner, repo)) => format!("github-{owner}-{repo}"),
            None => "github".to_string(),
        }
    }

    async fn parse(&self, source: &Source, fetcher: &Fetcher) -> Result<Vec<RawItem>> {
        let feed_url = Self::feed_url(&source.resource_url);
        let content = fetcher.fetch_text(&feed_url).await?;
        let items = rss::parse_feed_content(&content, &source.name)?;
        info!("Parsed {} items from repository {}", items.len(), source.name);
        Ok(items)
    }
}
