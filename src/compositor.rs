use crate::affinity::AffinityTracker;
use crate::enrichment::{enrich_or_passthrough, ContentEnricher};
use crate::scoring::{ScoringEngine, UserProfile};
use crate::storage::{
    FeedItemStore, InterestStore, NewUserFeedItem, SearchFilter, UserFeedStore,
};
use crate::types::{
    FeedItem, FeedJamError, ItemState, Result, UserFeed, UserFeedItem,
};
use chrono::{Duration as ChronoDuration, Utc};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Tunables for feed generation.
#[derive(Debug, Clone)]
pub struct CompositorConfig {
    /// How many candidate items to pull from the user's sources per
    /// regeneration.
    pub new_item_limit: i64,
    /// Upper bound on one enrichment call before degrading to pass-through.
    pub enrich_timeout: Duration,
    /// Window for the daily digest.
    pub digest_window_hours: i64,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            new_item_limit: 100,
            enrich_timeout: Duration::from_secs(30),
            digest_window_hours: 24,
        }
    }
}

/// A scored item returned by the digest.
#[derive(Debug, Clone)]
pub struct DigestEntry {
    pub item: FeedItem,
    pub rank_score: f64,
}

/// Merges previous feed state, newly scored items and interaction history
/// into fresh feed snapshots, and owns the consumer-facing interaction
/// operations on the active snapshot.
pub struct FeedCompositor {
    user_feeds: Arc<dyn UserFeedStore>,
    feed_items: Arc<dyn FeedItemStore>,
    interests: Arc<dyn InterestStore>,
    affinity: AffinityTracker,
    enricher: Arc<dyn ContentEnricher>,
    scoring: ScoringEngine,
    config: CompositorConfig,
}

impl FeedCompositor {
    pub fn new(
        user_feeds: Arc<dyn UserFeedStore>,
        feed_items: Arc<dyn FeedItemStore>,
        interests: Arc<dyn InterestStore>,
        affinity: AffinityTracker,
        enricher: Arc<dyn ContentEnricher>,
        scoring: ScoringEngine,
    ) -> Self {
        Self {
            user_feeds,
            feed_items,
            interests,
            affinity,
            enricher,
            scoring,
            config: CompositorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CompositorConfig) -> Self {
        self.config = config;
        self
    }

    /// Generate a new active feed snapshot for a user.
    ///
    /// Unread, un-hidden items from the previous snapshot carry over with
    /// their state and rank score untouched; read or hidden items drop out of
    /// the new snapshot but stay queryable through the superseded one. New
    /// items are enriched best-effort, scored under one shared batch context
    /// and enter with a clean state. The active-feed swap is atomic: on
    /// failure the previous snapshot stays active.
    pub async fn regenerate(&self, user_id: Uuid) -> Result<UserFeed> {
        let previous = self.user_feeds.active_feed(user_id).await?;
        let kept = carry_forward(previous.as_ref());

        let seen = self.user_feeds.seen_item_ids(user_id).await?;
        let candidates = self
            .feed_items
            .recent_for_user(user_id, self.config.new_item_limit)
            .await?;
        let mut new_items: Vec<FeedItem> = candidates
            .into_iter()
            .filter(|item| !seen.contains(&item.id))
            .collect();

        let annotations = enrich_or_passthrough(
            self.enricher.as_ref(),
            &new_items,
            self.config.enrich_timeout,
        )
        .await;
        for (item, annotation) in new_items.iter_mut().zip(&annotations) {
            if let Some(summary) = &annotation.summary {
                item.summary = Some(summary.clone());
                if let Err(e) = self.feed_items.update_summary(item.id, summary).await {
                    warn!("Failed to persist summary for item {}: {}", item.id, e);
                }
            }
        }

        // Profile or scoring problems are fatal for this user's regeneration;
        // a silently unranked feed is worse than a failed run.
        let profile = self.load_profile(user_id).await?;
        let scores = self.scoring.score_batch(&new_items, &profile);

        let fresh: Vec<NewUserFeedItem> = new_items
            .into_iter()
            .zip(scores)
            .map(|(item, score)| draft_from_item(&item, score))
            .collect();

        let kept_count = kept.len();
        let fresh_count = fresh.len();
        let snapshot = compose_snapshot(kept, fresh);

        let feed = self.user_feeds.replace_active_feed(user_id, snapshot).await?;
        info!(
            "Regenerated feed for user {}: {} carried over, {} new",
            user_id, kept_count, fresh_count
        );
        Ok(feed)
    }

    /// Toggle like on an item in the user's feed, updating the source
    /// affinity counters. Returns the new like state.
    pub async fn toggle_like(&self, user_id: Uuid, item_id: Uuid) -> Result<bool> {
        let item = self.require_item(user_id, item_id).await?;
        let mut state = item.state;
        state.like = !state.like;
        self.user_feeds.set_item_state(item.id, state).await?;

        if state.like {
            self.affinity.record_like(user_id, &item.source_name).await?;
        } else {
            self.affinity.retract_like(user_id, &item.source_name).await?;
        }
        Ok(state.like)
    }

    /// Toggle hide on an item, updating the source affinity counters.
    /// Returns the new hide state.
    pub async fn toggle_hide(&self, user_id: Uuid, item_id: Uuid) -> Result<bool> {
        let item = self.require_item(user_id, item_id).await?;
        let mut state = item.state;
        state.hide = !state.hide;
        self.user_feeds.set_item_state(item.id, state).await?;

        if state.hide {
            self.affinity.record_hide(user_id, &item.source_name).await?;
        } else {
            self.affinity.retract_hide(user_id, &item.source_name).await?;
        }
        Ok(state.hide)
    }

    /// Toggle star (save for later). No affinity side effects.
    pub async fn toggle_star(&self, user_id: Uuid, item_id: Uuid) -> Result<bool> {
        let item = self.require_item(user_id, item_id).await?;
        let mut state = item.state;
        state.star = !state.star;
        self.user_feeds.set_item_state(item.id, state).await?;
        Ok(state.star)
    }

    pub async fn mark_read(&self, user_id: Uuid, item_id: Uuid) -> Result<()> {
        let item = self.require_item(user_id, item_id).await?;
        let mut state = item.state;
        state.read = true;
        self.user_feeds.set_item_state(item.id, state).await
    }

    /// Mark every unread, unhidden item in the active feed as read.
    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        self.user_feeds.mark_all_read(user_id).await
    }

    /// Hide every read, unhidden item in the active feed.
    pub async fn hide_read_items(&self, user_id: Uuid) -> Result<u64> {
        self.user_feeds.hide_read(user_id).await
    }

    /// Search the user's item history across all snapshots.
    pub async fn search(&self, user_id: Uuid, filter: &SearchFilter) -> Result<Vec<UserFeedItem>> {
        self.user_feeds.search(user_id, filter).await
    }

    /// Top items from the user's sources over the digest window, ranked with
    /// the same scoring engine as regeneration.
    pub async fn daily_digest(&self, user_id: Uuid, top_n: usize) -> Result<Vec<DigestEntry>> {
        let since = Utc::now() - ChronoDuration::hours(self.config.digest_window_hours);
        let items = self
            .feed_items
            .recent_for_user_since(user_id, since, self.config.new_item_limit)
            .await?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let profile = self.load_profile(user_id).await?;
        let scores = self.scoring.score_batch(&items, &profile);

        let mut entries: Vec<DigestEntry> = items
            .into_iter()
            .zip(scores)
            .map(|(item, rank_score)| DigestEntry { item, rank_score })
            .collect();
        entries.sort_by(|a, b| {
            b.rank_score
                .partial_cmp(&a.rank_score)
                .unwrap_or(Ordering::Equal)
        });
        entries.truncate(top_n);
        Ok(entries)
    }

    /// Ad hoc scoring for callers outside a full regeneration (search,
    /// digest rendering).
    pub async fn score_batch(&self, user_id: Uuid, items: &[FeedItem]) -> Result<Vec<f64>> {
        let profile = self.load_profile(user_id).await?;
        Ok(self.scoring.score_batch(items, &profile))
    }

    async fn load_profile(&self, user_id: Uuid) -> Result<UserProfile> {
        let profile = UserProfile {
            interests: self.interests.map_for_user(user_id).await?,
            affinities: self.affinity.affinity_map(user_id).await?,
        };
        profile.validate()?;
        Ok(profile)
    }

    async fn require_item(&self, user_id: Uuid, item_id: Uuid) -> Result<UserFeedItem> {
        self.user_feeds
            .get_item(user_id, item_id)
            .await?
            .ok_or(FeedJamError::ItemNotFound { id: item_id })
    }
}

/// Items from the previous snapshot that survive into the next one: unread
/// and not hidden. State and rank score are preserved as-is.
fn carry_forward(previous: Option<&UserFeed>) -> Vec<NewUserFeedItem> {
    let Some(feed) = previous else {
        return Vec::new();
    };

    feed.items
        .iter()
        .filter(|item| !item.state.read && !item.state.hide)
        .map(|item| NewUserFeedItem {
            feed_item_id: item.feed_item_id,
            title: item.title.clone(),
            source_name: item.source_name.clone(),
            description: item.description.clone(),
            summary: item.summary.clone(),
            article_url: item.article_url.clone(),
            comments_url: item.comments_url.clone(),
            points: item.points,
            views: item.views,
            rank_score: item.rank_score,
            state: item.state,
            published: item.published,
        })
        .collect()
}

/// A freshly scored item entering the feed for the first time.
fn draft_from_item(item: &FeedItem, rank_score: f64) -> NewUserFeedItem {
    NewUserFeedItem {
        feed_item_id: item.id,
        title: item.title.clone(),
        source_name: item.source_name.clone(),
        description: item.description.clone(),
        summary: item.summary.clone(),
        article_url: item.article_url.clone(),
        comments_url: item.comments_url.clone(),
        points: item.points,
        views: item.views,
        rank_score,
        state: ItemState::default(),
        published: item.published,
    }
}

/// Union of carried-over and new items in presentation order:
/// `published DESC NULLS LAST`; the sort is stable so same-timestamp items
/// keep their relative order. Rank score stays an independent field for
/// consumers that sort by it at query time.
fn compose_snapshot(
    kept: Vec<NewUserFeedItem>,
    fresh: Vec<NewUserFeedItem>,
) -> Vec<NewUserFeedItem> {
    let mut items = kept;
    items.extend(fresh);
    items.sort_by(|a, b| match (a.published, b.published) {
        (Some(ap), Some(bp)) => bp.cmp(&ap),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    items
}
