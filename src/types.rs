use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Tag identifying what kind of origin a source is. Dispatch to the matching
/// adapter is a closed match over this enum; adding a source type means adding
/// a variant and an adapter, not touching the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Rss,
    HackerNews,
    Telegram,
    Reddit,
    Youtube,
    Github,
    Email,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Rss => "rss",
            SourceType::HackerNews => "hackernews",
            SourceType::Telegram => "telegram",
            SourceType::Reddit => "reddit",
            SourceType::Youtube => "youtube",
            SourceType::Github => "github",
            SourceType::Email => "email",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = FeedJamError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rss" => Ok(SourceType::Rss),
            "hackernews" => Ok(SourceType::HackerNews),
            "telegram" => Ok(SourceType::Telegram),
            "reddit" => Ok(SourceType::Reddit),
            "youtube" => Ok(SourceType::Youtube),
            "github" => Ok(SourceType::Github),
            "email" => Ok(SourceType::Email),
            other => Err(FeedJamError::UnknownSourceType(other.to_string())),
        }
    }
}

/// A subscribable content origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub name: String,
    pub source_type: SourceType,
    pub resource_url: String,
    pub is_active: bool,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ownership relation between a user and a source. One per (user, source).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source_id: Uuid,
    pub is_active: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A candidate item as produced by a source adapter, before deduplication.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawItem {
    pub title: String,
    pub link: Option<String>,
    pub source_name: String,
    pub local_id: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub article_url: Option<String>,
    pub comments_url: Option<String>,
    pub points: Option<i64>,
    pub views: Option<i64>,
    pub num_comments: Option<i64>,
    pub published: Option<DateTime<Utc>>,
}

impl RawItem {
    /// An item with neither a local id nor a link cannot be deduplicated and
    /// must be dropped by the pipeline.
    pub fn is_identifiable(&self) -> bool {
        self.local_id.is_some() || self.link.is_some()
    }
}

/// Canonical, source-scoped content record. Deduplicated once per source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: Uuid,
    pub source_id: Uuid,
    pub source_name: String,
    pub local_id: Option<String>,
    pub link: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub article_url: Option<String>,
    pub comments_url: Option<String>,
    pub points: Option<i64>,
    pub views: Option<i64>,
    pub num_comments: Option<i64>,
    pub published: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Per-item interaction flags. Carried forward across feed regenerations for
/// items that stay in the active snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemState {
    pub read: bool,
    pub star: bool,
    pub like: bool,
    pub hide: bool,
}

/// Per-user projection of a FeedItem into an active feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFeedItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub feed_item_id: Uuid,
    pub title: String,
    pub source_name: String,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub article_url: Option<String>,
    pub comments_url: Option<String>,
    pub points: Option<i64>,
    pub views: Option<i64>,
    pub rank_score: f64,
    pub state: ItemState,
    pub published: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One user's ordered feed snapshot. Exactly one is active per user; older
/// snapshots are superseded, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFeed {
    pub id: Uuid,
    pub user_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub items: Vec<UserFeedItem>,
}

/// (user, topic, weight) triple driving interest scoring. Weight in [0.0, 2.0].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInterest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub topic: String,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
}

/// Running like/hide counters for a (user, source) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAffinity {
    pub user_id: Uuid,
    pub source_name: String,
    pub like_count: i64,
    pub hide_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        }
    }
}

impl FromStr for RunStatus {
    type Err = FeedJamError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(RunStatus::Pending),
            "running" => Ok(RunStatus::Running),
            "success" => Ok(RunStatus::Success),
            "failed" => Ok(RunStatus::Failed),
            other => Err(FeedJamError::General(format!("unknown run status: {other}"))),
        }
    }
}

/// Audit record for one fetch or regeneration attempt. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub job_type: String,
    pub status: RunStatus,
    pub subscription_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub items_found: i64,
    pub items_new: i64,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Optional annotations returned by the enrichment subsystem. Every field may
/// be absent; scoring never depends on them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessedContent {
    pub summary: Option<String>,
    pub topics: Vec<String>,
    pub quality_score: Option<f64>,
}

/// HTTP fetch settings shared by all adapters.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub follow_redirects: bool,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "FeedJam/0.1".to_string(),
            timeout_seconds: 30,
            max_feed_size_mb: 10,
            follow_redirects: true,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeedJamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Source not found: {id}")]
    SourceNotFound { id: Uuid },

    #[error("Subscription not found: {id}")]
    SubscriptionNotFound { id: Uuid },

    #[error("Feed item not found: {id}")]
    ItemNotFound { id: Uuid },

    #[error("User not found: {id}")]
    UserNotFound { id: Uuid },

    #[error("Unknown source type: {0}")]
    UnknownSourceType(String),

    #[error("No adapter can poll source type {0}")]
    AdapterNotFound(SourceType),

    #[error("Scoring failed: {0}")]
    Scoring(String),

    #[error("Enrichment failed: {0}")]
    Enrichment(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, FeedJamError>;
