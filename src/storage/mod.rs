//! Storage boundary. Services depend on these traits and the plain data
//! transfer types in [`crate::types`]; the Postgres implementations live in
//! [`postgres`] and never leak row types past this module.

pub mod postgres;

use crate::types::{
    FeedItem, ItemState, RawItem, Result, Run, RunStatus, Source, SourceType, Subscription, User,
    UserFeed, UserFeedItem, UserInterest,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub use postgres::{
    PgAffinityStore, PgFeedItemStore, PgInterestStore, PgRunStore, PgSourceStore,
    PgSubscriptionStore, PgUserFeedStore, PgUserStore,
};

/// Fields needed to create a source. The caller resolves naming and type
/// detection before this reaches storage.
#[derive(Debug, Clone)]
pub struct NewSource {
    pub name: String,
    pub source_type: SourceType,
    pub resource_url: String,
}

/// A user feed item about to be persisted as part of a new snapshot.
#[derive(Debug, Clone)]
pub struct NewUserFeedItem {
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
}

/// Filters for searching a user's feed item history. `None` means "don't
/// filter on this field".
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub read: Option<bool>,
    pub star: Option<bool>,
    pub like: Option<bool>,
    pub hide: Option<bool>,
    pub text: Option<String>,
    pub source_name: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Source>>;
    async fn get_by_url(&self, resource_url: &str) -> Result<Option<Source>>;
    /// Get-or-create keyed on `resource_url`.
    async fn create(&self, source: NewSource) -> Result<Source>;
    /// Record the outcome of a fetch attempt: success clears `last_error` and
    /// stamps `last_fetched_at`; failure stores the error text.
    async fn record_fetch_outcome(&self, id: Uuid, error: Option<&str>) -> Result<()>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Create the (user, source) relation. A duplicate subscribe is a no-op
    /// returning the existing subscription.
    async fn subscribe(&self, user_id: Uuid, source_id: Uuid) -> Result<Subscription>;
    async fn get(&self, id: Uuid) -> Result<Option<Subscription>>;
    async fn list_active(&self) -> Result<Vec<Subscription>>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Subscription>>;
    async fn set_last_run(&self, id: Uuid, when: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
pub trait FeedItemStore: Send + Sync {
    async fn find_by_local_id(&self, source_name: &str, local_id: &str) -> Result<Option<Uuid>>;
    async fn find_by_link(&self, source_name: &str, link: &str) -> Result<Option<Uuid>>;
    /// Insert a candidate as a new feed item. Returns `None` when a
    /// uniqueness constraint fires, meaning a concurrent run got there first;
    /// the existing record wins.
    async fn insert(&self, source: &Source, item: &RawItem) -> Result<Option<FeedItem>>;
    /// Items from all of the user's active subscriptions, ordered
    /// `published DESC NULLS LAST, created_at DESC`.
    async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<FeedItem>>;
    /// Same, restricted to items created after `since`.
    async fn recent_for_user_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<FeedItem>>;
    async fn update_summary(&self, item_id: Uuid, summary: &str) -> Result<()>;
}

#[async_trait]
pub trait UserFeedStore: Send + Sync {
    /// The user's active snapshot with items ordered
    /// `published DESC NULLS LAST, created_at DESC`.
    async fn active_feed(&self, user_id: Uuid) -> Result<Option<UserFeed>>;
    /// Every feed item id that has ever appeared in one of this user's
    /// snapshots, active or superseded.
    async fn seen_item_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>>;
    /// Persist a new active snapshot and retire the previous one in a single
    /// transaction. On failure the previous snapshot stays active.
    async fn replace_active_feed(
        &self,
        user_id: Uuid,
        items: Vec<NewUserFeedItem>,
    ) -> Result<UserFeed>;
    async fn get_item(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<UserFeedItem>>;
    async fn set_item_state(&self, item_id: Uuid, state: ItemState) -> Result<()>;
    /// Mark every unread, unhidden item in the active feed as read.
    /// Returns the number of items affected.
    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64>;
    /// Hide every read, unhidden item in the active feed.
    /// Returns the number of items affected.
    async fn hide_read(&self, user_id: Uuid) -> Result<u64>;
    /// Search the user's full item history (all snapshots).
    async fn search(&self, user_id: Uuid, filter: &SearchFilter) -> Result<Vec<UserFeedItem>>;
}

#[async_trait]
pub trait InterestStore: Send + Sync {
    async fn list(&self, user_id: Uuid) -> Result<Vec<UserInterest>>;
    /// Topic (lowercased) -> weight map used by the scoring engine.
    async fn map_for_user(&self, user_id: Uuid) -> Result<HashMap<String, f64>>;
    async fn upsert(&self, user_id: Uuid, topic: &str, weight: f64) -> Result<UserInterest>;
    async fn delete(&self, user_id: Uuid, topic: &str) -> Result<bool>;
}

#[async_trait]
pub trait AffinityStore: Send + Sync {
    async fn increment_like(&self, user_id: Uuid, source_name: &str) -> Result<()>;
    async fn decrement_like(&self, user_id: Uuid, source_name: &str) -> Result<()>;
    async fn increment_hide(&self, user_id: Uuid, source_name: &str) -> Result<()>;
    async fn decrement_hide(&self, user_id: Uuid, source_name: &str) -> Result<()>;
    /// (like_count, hide_count) for one pair; (0, 0) when no history.
    async fn counts(&self, user_id: Uuid, source_name: &str) -> Result<(i64, i64)>;
    /// source_name -> (like_count, hide_count) for every source the user has
    /// interacted with.
    async fn counts_map(&self, user_id: Uuid) -> Result<HashMap<String, (i64, i64)>>;
}

#[async_trait]
pub trait RunStore: Send + Sync {
    async fn create(
        &self,
        job_type: &str,
        subscription_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<Run>;
    async fn mark_running(&self, id: Uuid) -> Result<()>;
    async fn complete(
        &self,
        id: Uuid,
        status: RunStatus,
        items_found: i64,
        items_new: i64,
        error: Option<&str>,
    ) -> Result<()>;
    async fn recent(&self, limit: i64) -> Result<Vec<Run>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, username: &str) -> Result<User>;
    async fn get(&self, id: Uuid) -> Result<Option<User>>;
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn list_active(&self) -> Result<Vec<User>>;
}
