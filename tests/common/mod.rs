//! In-memory store fakes shared by the integration tests. They mirror the
//! Postgres implementations' behavior closely enough to exercise the dedup,
//! scoring and composition logic without a database: uniqueness constraints,
//! floor-at-zero counters, and the active-feed swap all behave the same.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedjam::storage::{
    AffinityStore, FeedItemStore, InterestStore, NewUserFeedItem, SearchFilter, UserFeedStore,
};
use feedjam::{
    ContentEnricher, FeedItem, FeedJamError, ItemState, ProcessedContent, RawItem, Source,
    SourceType, UserFeed, UserFeedItem,
};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

pub fn test_source(name: &str) -> Source {
    Source {
        id: Uuid::new_v4(),
        name: name.to_string(),
        source_type: SourceType::Rss,
        resource_url: format!("https://example.com/{name}/feed.xml"),
        is_active: true,
        last_fetched_at: None,
        last_error: None,
        created_at: Utc::now(),
    }
}

pub fn raw_item(title: &str, source_name: &str, link: Option<&str>, local_id: Option<&str>) -> RawItem {
    RawItem {
        title: title.to_string(),
        link: link.map(String::from),
        source_name: source_name.to_string(),
        local_id: local_id.map(String::from),
        ..Default::default()
    }
}

fn order_items(items: &mut [UserFeedItem]) {
    items.sort_by(|a, b| match (a.published, b.published) {
        (Some(ap), Some(bp)) => bp.cmp(&ap),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.created_at.cmp(&a.created_at),
    });
}

/// Feed item store backed by a Vec, with the same dual-key uniqueness rule
/// the database enforces.
#[derive(Default)]
pub struct MemFeedItemStore {
    items: Mutex<Vec<FeedItem>>,
    subscriptions: Mutex<HashMap<Uuid, HashSet<Uuid>>>,
}

impl MemFeedItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a (user, source) relation so `recent_for_user` can join.
    pub fn subscribe_user(&self, user_id: Uuid, source_id: Uuid) {
        self.subscriptions
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .insert(source_id);
    }

    pub fn all(&self) -> Vec<FeedItem> {
        self.items.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

#[async_trait]
impl FeedItemStore for MemFeedItemStore {
    async fn find_by_local_id(
        &self,
        source_name: &str,
        local_id: &str,
    ) -> feedjam::Result<Option<Uuid>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.source_name == source_name && i.local_id.as_deref() == Some(local_id))
            .map(|i| i.id))
    }

    async fn find_by_link(&self, source_name: &str, link: &str) -> feedjam::Result<Option<Uuid>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.source_name == source_name && i.link.as_deref() == Some(link))
            .map(|i| i.id))
    }

    async fn insert(&self, source: &Source, item: &RawItem) -> feedjam::Result<Option<FeedItem>> {
        let mut items = self.items.lock().unwrap();

        let conflict = items.iter().any(|existing| {
            existing.source_name == source.name
                && ((item.local_id.is_some() && existing.local_id == item.local_id)
                    || (item.link.is_some() && existing.link == item.link))
        });
        if conflict {
            return Ok(None);
        }

        let stored = FeedItem {
            id: Uuid::new_v4(),
            source_id: source.id,
            source_name: source.name.clone(),
            local_id: item.local_id.clone(),
            link: item.link.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            summary: item.summary.clone(),
            article_url: item.article_url.clone(),
            comments_url: item.comments_url.clone(),
            points: item.points,
            views: item.views,
            num_comments: item.num_comments,
            published: item.published,
            created_at: Utc::now(),
        };
        items.push(stored.clone());
        Ok(Some(stored))
    }

    async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> feedjam::Result<Vec<FeedItem>> {
        let sources = self
            .subscriptions
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default();
        let mut items: Vec<FeedItem> = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| sources.contains(&i.source_id))
            .cloned()
            .collect();
        items.sort_by(|a, b| match (a.published, b.published) {
            (Some(ap), Some(bp)) => bp.cmp(&ap),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => b.created_at.cmp(&a.created_at),
        });
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn recent_for_user_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> feedjam::Result<Vec<FeedItem>> {
        let items = self.recent_for_user(user_id, limit).await?;
        Ok(items.into_iter().filter(|i| i.created_at >= since).collect())
    }

    async fn update_summary(&self, item_id: Uuid, summary: &str) -> feedjam::Result<()> {
        if let Some(item) = self.items.lock().unwrap().iter_mut().find(|i| i.id == item_id) {
            item.summary = Some(summary.to_string());
        }
        Ok(())
    }
}

/// User feed store keeping every snapshot, like the real table does.
#[derive(Default)]
pub struct MemUserFeedStore {
    feeds: Mutex<Vec<UserFeed>>,
}

impl MemUserFeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_count(&self, user_id: Uuid) -> usize {
        self.feeds
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl UserFeedStore for MemUserFeedStore {
    async fn active_feed(&self, user_id: Uuid) -> feedjam::Result<Option<UserFeed>> {
        let feeds = self.feeds.lock().unwrap();
        let mut feed = feeds
            .iter()
            .find(|f| f.user_id == user_id && f.is_active)
            .cloned();
        if let Some(feed) = feed.as_mut() {
            order_items(&mut feed.items);
        }
        Ok(feed)
    }

    async fn seen_item_ids(&self, user_id: Uuid) -> feedjam::Result<HashSet<Uuid>> {
        Ok(self
            .feeds
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.user_id == user_id)
            .flat_map(|f| f.items.iter().map(|i| i.feed_item_id))
            .collect())
    }

    async fn replace_active_feed(
        &self,
        user_id: Uuid,
        items: Vec<NewUserFeedItem>,
    ) -> feedjam::Result<UserFeed> {
        let mut feeds = self.feeds.lock().unwrap();
        for feed in feeds.iter_mut().filter(|f| f.user_id == user_id) {
            feed.is_active = false;
        }

        let created_at = Utc::now();
        let stored: Vec<UserFeedItem> = items
            .into_iter()
            .map(|item| UserFeedItem {
                id: Uuid::new_v4(),
                user_id,
                feed_item_id: item.feed_item_id,
                title: item.title,
                source_name: item.source_name,
                description: item.description,
                summary: item.summary,
                article_url: item.article_url,
                comments_url: item.comments_url,
                points: item.points,
                views: item.views,
                rank_score: item.rank_score,
                state: item.state,
                published: item.published,
                created_at,
            })
            .collect();

        let feed = UserFeed {
            id: Uuid::new_v4(),
            user_id,
            is_active: true,
            created_at,
            items: stored,
        };
        feeds.push(feed.clone());
        Ok(feed)
    }

    async fn get_item(&self, user_id: Uuid, item_id: Uuid) -> feedjam::Result<Option<UserFeedItem>> {
        Ok(self
            .feeds
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.user_id == user_id)
            .flat_map(|f| f.items.iter())
            .find(|i| i.id == item_id)
            .cloned())
    }

    async fn set_item_state(&self, item_id: Uuid, state: ItemState) -> feedjam::Result<()> {
        let mut feeds = self.feeds.lock().unwrap();
        for feed in feeds.iter_mut() {
            if let Some(item) = feed.items.iter_mut().find(|i| i.id == item_id) {
                item.state = state;
                return Ok(());
            }
        }
        Err(FeedJamError::ItemNotFound { id: item_id })
    }

    async fn mark_all_read(&self, user_id: Uuid) -> feedjam::Result<u64> {
        let mut feeds = self.feeds.lock().unwrap();
        let mut count = 0;
        for feed in feeds.iter_mut().filter(|f| f.user_id == user_id && f.is_active) {
            for item in feed.items.iter_mut().filter(|i| !i.state.read && !i.state.hide) {
                item.state.read = true;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn hide_read(&self, user_id: Uuid) -> feedjam::Result<u64> {
        let mut feeds = self.feeds.lock().unwrap();
        let mut count = 0;
        for feed in feeds.iter_mut().filter(|f| f.user_id == user_id && f.is_active) {
            for item in feed.items.iter_mut().filter(|i| i.state.read && !i.state.hide) {
                item.state.hide = true;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn search(
        &self,
        user_id: Uuid,
        filter: &SearchFilter,
    ) -> feedjam::Result<Vec<UserFeedItem>> {
        let feeds = self.feeds.lock().unwrap();
        let text = filter.text.as_ref().map(|t| t.to_lowercase());
        let mut results: Vec<UserFeedItem> = feeds
            .iter()
            .filter(|f| f.user_id == user_id)
            .flat_map(|f| f.items.iter())
            .filter(|i| filter.read.map_or(true, |v| i.state.read == v))
            .filter(|i| filter.star.map_or(true, |v| i.state.star == v))
            .filter(|i| filter.like.map_or(true, |v| i.state.like == v))
            .filter(|i| filter.hide.map_or(true, |v| i.state.hide == v))
            .filter(|i| {
                filter
                    .source_name
                    .as_ref()
                    .map_or(true, |s| &i.source_name == s)
            })
            .filter(|i| {
                text.as_ref().map_or(true, |t| {
                    i.title.to_lowercase().contains(t)
                        || i.description
                            .as_ref()
                            .is_some_and(|d| d.to_lowercase().contains(t))
                        || i.summary
                            .as_ref()
                            .is_some_and(|s| s.to_lowercase().contains(t))
                })
            })
            .cloned()
            .collect();

        let limit = if filter.limit > 0 { filter.limit } else { 100 } as usize;
        let offset = filter.offset as usize;
        results = results.into_iter().skip(offset).take(limit).collect();
        Ok(results)
    }
}

#[derive(Default)]
pub struct MemInterestStore {
    interests: Mutex<HashMap<Uuid, HashMap<String, f64>>>,
}

impl MemInterestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, user_id: Uuid, topic: &str, weight: f64) {
        self.interests
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .insert(topic.to_lowercase(), weight);
    }
}

#[async_trait]
impl InterestStore for MemInterestStore {
    async fn list(&self, user_id: Uuid) -> feedjam::Result<Vec<feedjam::UserInterest>> {
        let map = self.map_for_user(user_id).await?;
        Ok(map
            .into_iter()
            .map(|(topic, weight)| feedjam::UserInterest {
                id: Uuid::new_v4(),
                user_id,
                topic,
                weight,
                created_at: Utc::now(),
            })
            .collect())
    }

    async fn map_for_user(&self, user_id: Uuid) -> feedjam::Result<HashMap<String, f64>> {
        Ok(self
            .interests
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        topic: &str,
        weight: f64,
    ) -> feedjam::Result<feedjam::UserInterest> {
        self.set(user_id, topic, weight);
        Ok(feedjam::UserInterest {
            id: Uuid::new_v4(),
            user_id,
            topic: topic.to_lowercase(),
            weight,
            created_at: Utc::now(),
        })
    }

    async fn delete(&self, user_id: Uuid, topic: &str) -> feedjam::Result<bool> {
        Ok(self
            .interests
            .lock()
            .unwrap()
            .get_mut(&user_id)
            .is_some_and(|m| m.remove(&topic.to_lowercase()).is_some()))
    }
}

/// Affinity counters with the same floor-at-zero semantics as the SQL
/// implementation.
#[derive(Default)]
pub struct MemAffinityStore {
    counts: Mutex<HashMap<(Uuid, String), (i64, i64)>>,
}

impl MemAffinityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self, user_id: Uuid, source_name: &str, like_delta: i64, hide_delta: i64) {
        let mut counts = self.counts.lock().unwrap();
        let entry = counts
            .entry((user_id, source_name.to_string()))
            .or_insert((0, 0));
        entry.0 = (entry.0 + like_delta).max(0);
        entry.1 = (entry.1 + hide_delta).max(0);
    }
}

#[async_trait]
impl AffinityStore for MemAffinityStore {
    async fn increment_like(&self, user_id: Uuid, source_name: &str) -> feedjam::Result<()> {
        self.bump(user_id, source_name, 1, 0);
        Ok(())
    }

    async fn decrement_like(&self, user_id: Uuid, source_name: &str) -> feedjam::Result<()> {
        self.bump(user_id, source_name, -1, 0);
        Ok(())
    }

    async fn increment_hide(&self, user_id: Uuid, source_name: &str) -> feedjam::Result<()> {
        self.bump(user_id, source_name, 0, 1);
        Ok(())
    }

    async fn decrement_hide(&self, user_id: Uuid, source_name: &str) -> feedjam::Result<()> {
        self.bump(user_id, source_name, 0, -1);
        Ok(())
    }

    async fn counts(&self, user_id: Uuid, source_name: &str) -> feedjam::Result<(i64, i64)> {
        Ok(self
            .counts
            .lock()
            .unwrap()
            .get(&(user_id, source_name.to_string()))
            .copied()
            .unwrap_or((0, 0)))
    }

    async fn counts_map(&self, user_id: Uuid) -> feedjam::Result<HashMap<String, (i64, i64)>> {
        Ok(self
            .counts
            .lock()
            .unwrap()
            .iter()
            .filter(|((uid, _), _)| *uid == user_id)
            .map(|((_, source), counts)| (source.clone(), *counts))
            .collect())
    }
}

/// Enricher that always fails, for degradation tests.
pub struct FailingEnricher;

#[async_trait]
impl ContentEnricher for FailingEnricher {
    fn name(&self) -> &str {
        "failing"
    }

    async fn process_items(&self, _items: &[FeedItem]) -> feedjam::Result<Vec<ProcessedContent>> {
        Err(FeedJamError::Enrichment("provider down".to_string()))
    }
}

/// Enricher that stamps a recognizable summary on every item.
pub struct StampEnricher;

#[async_trait]
impl ContentEnricher for StampEnricher {
    fn name(&self) -> &str {
        "stamp"
    }

    async fn process_items(&self, items: &[FeedItem]) -> feedjam::Result<Vec<ProcessedContent>> {
        Ok(items
            .iter()
            .map(|item| ProcessedContent {
                summary: Some(format!("summary of {}", item.title)),
                topics: Vec::new(),
                quality_score: Some(0.5),
            })
            .collect())
    }
}
