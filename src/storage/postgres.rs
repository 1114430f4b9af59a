//! Postgres implementations of the storage traits. All row decoding happens
//! here; nothing outside this module sees a `sqlx` row.

use crate::storage::{
    AffinityStore, FeedItemStore, InterestStore, NewSource, NewUserFeedItem, RunStore, SearchFilter,
    SourceStore, SubscriptionStore, UserFeedStore, UserStore,
};
use crate::types::{
    FeedItem, ItemState, RawItem, Result, Run, RunStatus, Source, SourceType, Subscription, User,
    UserFeed, UserFeedItem, UserInterest,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

/// Remove NUL characters that Postgres rejects in text fields.
fn sanitize(value: &str) -> String {
    if value.contains('\0') {
        value.replace('\0', "")
    } else {
        value.to_string()
    }
}

fn sanitize_opt(value: Option<&str>) -> Option<String> {
    value.map(sanitize)
}

fn map_source(row: PgRow) -> Result<Source> {
    let type_tag: String = row.try_get("source_type")?;
    Ok(Source {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        source_type: SourceType::from_str(&type_tag)?,
        resource_url: row.try_get("resource_url")?,
        is_active: row.try_get("is_active")?,
        last_fetched_at: row.try_get("last_fetched_at")?,
        last_error: row.try_get("last_error")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_subscription(row: PgRow) -> Result<Subscription> {
    Ok(Subscription {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        source_id: row.try_get("source_id")?,
        is_active: row.try_get("is_active")?,
        last_run: row.try_get("last_run")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_feed_item(row: PgRow) -> Result<FeedItem> {
    Ok(FeedItem {
        id: row.try_get("id")?,
        source_id: row.try_get("source_id")?,
        source_name: row.try_get("source_name")?,
        local_id: row.try_get("local_id")?,
        link: row.try_get("link")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        summary: row.try_get("summary")?,
        article_url: row.try_get("article_url")?,
        comments_url: row.try_get("comments_url")?,
        points: row.try_get("points")?,
        views: row.try_get("views")?,
        num_comments: row.try_get("num_comments")?,
        published: row.try_get("published")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_user_feed_item(row: PgRow) -> Result<UserFeedItem> {
    Ok(UserFeedItem {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        feed_item_id: row.try_get("feed_item_id")?,
        title: row.try_get("title")?,
        source_name: row.try_get("source_name")?,
        description: row.try_get("description")?,
        summary: row.try_get("summary")?,
        article_url: row.try_get("article_url")?,
        comments_url: row.try_get("comments_url")?,
        points: row.try_get("points")?,
        views: row.try_get("views")?,
        rank_score: row.try_get("rank_score")?,
        state: ItemState {
            read: row.try_get("read")?,
            star: row.try_get("star")?,
            like: row.try_get("like_flag")?,
            hide: row.try_get("hide")?,
        },
        published: row.try_get("published")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_run(row: PgRow) -> Result<Run> {
    let status: String = row.try_get("status")?;
    Ok(Run {
        id: row.try_get("id")?,
        job_type: row.try_get("job_type")?,
        status: RunStatus::from_str(&status)?,
        subscription_id: row.try_get("subscription_id")?,
        user_id: row.try_get("user_id")?,
        items_found: row.try_get("items_found")?,
        items_new: row.try_get("items_new")?,
        error: row.try_get("error")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_user(row: PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_interest(row: PgRow) -> Result<UserInterest> {
    Ok(UserInterest {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        topic: row.try_get("topic")?,
        weight: row.try_get("weight")?,
        created_at: row.try_get("created_at")?,
    })
}

#[derive(Clone)]
pub struct PgSourceStore {
    pool: PgPool,
}

impl PgSourceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceStore for PgSourceStore {
    async fn get(&self, id: Uuid) -> Result<Option<Source>> {
        let row = sqlx::query("SELECT * FROM sources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(map_source).transpose()
    }

    async fn get_by_url(&self, resource_url: &str) -> Result<Option<Source>> {
        let row = sqlx::query("SELECT * FROM sources WHERE resource_url = $1")
            .bind(resource_url)
            .fetch_optional(&self.pool)
            .await?;
        row.map(map_source).transpose()
    }

    async fn create(&self, source: NewSource) -> Result<Source> {
        if let Some(existing) = self.get_by_url(&source.resource_url).await? {
            debug!(url = %source.resource_url, "source already exists");
            return Ok(existing);
        }

        let row = sqlx::query(
            r#"
            INSERT INTO sources (id, name, source_type, resource_url, is_active, created_at)
            VALUES ($1, $2, $3, $4, TRUE, $5)
            ON CONFLICT (resource_url) DO UPDATE SET is_active = TRUE
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&source.name)
        .bind(source.source_type.as_str())
        .bind(&source.resource_url)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        map_source(row)
    }

    async fn record_fetch_outcome(&self, id: Uuid, error: Option<&str>) -> Result<()> {
        match error {
            None => {
                sqlx::query(
                    "UPDATE sources SET last_fetched_at = $1, last_error = NULL WHERE id = $2",
                )
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;
            }
            Some(err) => {
                sqlx::query("UPDATE sources SET last_error = $1 WHERE id = $2")
                    .bind(sanitize(err))
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn subscribe(&self, user_id: Uuid, source_id: Uuid) -> Result<Subscription> {
        // ON CONFLICT DO NOTHING + re-select keeps duplicate subscribes as a
        // no-op even under concurrent requests.
        sqlx::query(
            r#"
            INSERT INTO subscriptions (id, user_id, source_id, is_active, created_at)
            VALUES ($1, $2, $3, TRUE, $4)
            ON CONFLICT (user_id, source_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(source_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT * FROM subscriptions WHERE user_id = $1 AND source_id = $2")
            .bind(user_id)
            .bind(source_id)
            .fetch_one(&self.pool)
            .await?;
        map_subscription(row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Subscription>> {
        let row = sqlx::query("SELECT * FROM subscriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(map_subscription).transpose()
    }

    async fn list_active(&self) -> Result<Vec<Subscription>> {
        let rows = sqlx::query("SELECT * FROM subscriptions WHERE is_active = TRUE ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(map_subscription).collect()
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Subscription>> {
        let rows = sqlx::query(
            "SELECT * FROM subscriptions WHERE user_id = $1 AND is_active = TRUE ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(map_subscription).collect()
    }

    async fn set_last_run(&self, id: Uuid, when: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE subscriptions SET last_run = $1 WHERE id = $2")
            .bind(when)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgFeedItemStore {
    pool: PgPool,
}

impl PgFeedItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedItemStore for PgFeedItemStore {
    async fn find_by_local_id(&self, source_name: &str, local_id: &str) -> Result<Option<Uuid>> {
        let row = sqlx::query(
            "SELECT id FROM feed_items WHERE source_name = $1 AND local_id = $2",
        )
        .bind(source_name)
        .bind(local_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.try_get("id")).transpose()?)
    }

    async fn find_by_link(&self, source_name: &str, link: &str) -> Result<Option<Uuid>> {
        // Link equality is exact string match; no trailing-slash or query
        // parameter normalization.
        let row = sqlx::query("SELECT id FROM feed_items WHERE source_name = $1 AND link = $2")
            .bind(source_name)
            .bind(link)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.try_get("id")).transpose()?)
    }

    async fn insert(&self, source: &Source, item: &RawItem) -> Result<Option<FeedItem>> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        // The partial unique indexes on (source_name, local_id) and
        // (source_name, link) are the authoritative guard against concurrent
        // fetch runs; zero rows affected means another run inserted first.
        let result = sqlx::query(
            r#"
            INSERT INTO feed_items
                (id, source_id, source_name, local_id, link, title, description, summary,
                 article_url, comments_url, points, views, num_comments, published, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(source.id)
        .bind(&source.name)
        .bind(sanitize_opt(item.local_id.as_deref()))
        .bind(sanitize_opt(item.link.as_deref()))
        .bind(sanitize(&item.title))
        .bind(sanitize_opt(item.description.as_deref()))
        .bind(sanitize_opt(item.summary.as_deref()))
        .bind(sanitize_opt(item.article_url.as_deref()))
        .bind(sanitize_opt(item.comments_url.as_deref()))
        .bind(item.points)
        .bind(item.views)
        .bind(item.num_comments)
        .bind(item.published)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(FeedItem {
            id,
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
            created_at,
        }))
    }

    async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<FeedItem>> {
        let rows = sqlx::query(
            r#"
            SELECT fi.* FROM feed_items fi
            JOIN subscriptions s ON s.source_id = fi.source_id
            WHERE s.user_id = $1 AND s.is_active = TRUE
            ORDER BY fi.published DESC NULLS LAST, fi.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(map_feed_item).collect()
    }

    async fn recent_for_user_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<FeedItem>> {
        let rows = sqlx::query(
            r#"
            SELECT fi.* FROM feed_items fi
            JOIN subscriptions s ON s.source_id = fi.source_id
            WHERE s.user_id = $1 AND s.is_active = TRUE AND fi.created_at >= $2
            ORDER BY fi.published DESC NULLS LAST, fi.created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(map_feed_item).collect()
    }

    async fn update_summary(&self, item_id: Uuid, summary: &str) -> Result<()> {
        sqlx::query("UPDATE feed_items SET summary = $1 WHERE id = $2")
            .bind(sanitize(summary))
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgUserFeedStore {
    pool: PgPool,
}

impl PgUserFeedStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserFeedStore for PgUserFeedStore {
    async fn active_feed(&self, user_id: Uuid) -> Result<Option<UserFeed>> {
        let feed_row = sqlx::query(
            "SELECT id, user_id, is_active, created_at FROM user_feeds WHERE user_id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let feed_row = match feed_row {
            Some(row) => row,
            None => return Ok(None),
        };
        let feed_id: Uuid = feed_row.try_get("id")?;

        let item_rows = sqlx::query(
            r#"
            SELECT * FROM user_feed_items
            WHERE user_feed_id = $1
            ORDER BY published DESC NULLS LAST, created_at DESC
            "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;

        let items = item_rows
            .into_iter()
            .map(map_user_feed_item)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(UserFeed {
            id: feed_id,
            user_id: feed_row.try_get("user_id")?,
            is_active: feed_row.try_get("is_active")?,
            created_at: feed_row.try_get("created_at")?,
            items,
        }))
    }

    async fn seen_item_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        let rows = sqlx::query("SELECT DISTINCT feed_item_id FROM user_feed_items WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        let mut ids = HashSet::with_capacity(rows.len());
        for row in rows {
            ids.insert(row.try_get("feed_item_id")?);
        }
        Ok(ids)
    }

    async fn replace_active_feed(
        &self,
        user_id: Uuid,
        items: Vec<NewUserFeedItem>,
    ) -> Result<UserFeed> {
        let feed_id = Uuid::new_v4();
        let created_at = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE user_feeds SET is_active = FALSE WHERE user_id = $1 AND is_active = TRUE")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO user_feeds (id, user_id, is_active, created_at) VALUES ($1, $2, TRUE, $3)",
        )
        .bind(feed_id)
        .bind(user_id)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        let mut stored = Vec::with_capacity(items.len());
        for item in items {
            let item_id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO user_feed_items
                    (id, user_feed_id, user_id, feed_item_id, title, source_name, description,
                     summary, article_url, comments_url, points, views, rank_score,
                     read, star, like_flag, hide, published, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                        $14, $15, $16, $17, $18, $19)
                "#,
            )
            .bind(item_id)
            .bind(feed_id)
            .bind(user_id)
            .bind(item.feed_item_id)
            .bind(sanitize(&item.title))
            .bind(&item.source_name)
            .bind(sanitize_opt(item.description.as_deref()))
            .bind(sanitize_opt(item.summary.as_deref()))
            .bind(item.article_url.as_deref())
            .bind(item.comments_url.as_deref())
            .bind(item.points)
            .bind(item.views)
            .bind(item.rank_score)
            .bind(item.state.read)
            .bind(item.state.star)
            .bind(item.state.like)
            .bind(item.state.hide)
            .bind(item.published)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

            stored.push(UserFeedItem {
                id: item_id,
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
            });
        }

        tx.commit().await?;

        Ok(UserFeed {
            id: feed_id,
            user_id,
            is_active: true,
            created_at,
            items: stored,
        })
    }

    async fn get_item(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<UserFeedItem>> {
        let row = sqlx::query("SELECT * FROM user_feed_items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(map_user_feed_item).transpose()
    }

    async fn set_item_state(&self, item_id: Uuid, state: ItemState) -> Result<()> {
        sqlx::query(
            "UPDATE user_feed_items SET read = $1, star = $2, like_flag = $3, hide = $4 WHERE id = $5",
        )
        .bind(state.read)
        .bind(state.star)
        .bind(state.like)
        .bind(state.hide)
        .bind(item_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE user_feed_items ufi SET read = TRUE
            FROM user_feeds uf
            WHERE ufi.user_feed_id = uf.id
              AND uf.user_id = $1 AND uf.is_active = TRUE
              AND ufi.read = FALSE AND ufi.hide = FALSE
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn hide_read(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE user_feed_items ufi SET hide = TRUE
            FROM user_feeds uf
            WHERE ufi.user_feed_id = uf.id
              AND uf.user_id = $1 AND uf.is_active = TRUE
              AND ufi.read = TRUE AND ufi.hide = FALSE
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn search(&self, user_id: Uuid, filter: &SearchFilter) -> Result<Vec<UserFeedItem>> {
        let limit = if filter.limit > 0 { filter.limit } else { 100 };
        let rows = sqlx::query(
            r#"
            SELECT * FROM user_feed_items
            WHERE user_id = $1
              AND ($2::BOOL IS NULL OR read = $2)
              AND ($3::BOOL IS NULL OR star = $3)
              AND ($4::BOOL IS NULL OR like_flag = $4)
              AND ($5::BOOL IS NULL OR hide = $5)
              AND ($6::TEXT IS NULL OR title ILIKE '%' || $6 || '%'
                   OR description ILIKE '%' || $6 || '%'
                   OR summary ILIKE '%' || $6 || '%')
              AND ($7::TEXT IS NULL OR source_name = $7)
            ORDER BY created_at DESC
            LIMIT $8 OFFSET $9
            "#,
        )
        .bind(user_id)
        .bind(filter.read)
        .bind(filter.star)
        .bind(filter.like)
        .bind(filter.hide)
        .bind(filter.text.as_deref())
        .bind(filter.source_name.as_deref())
        .bind(limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(map_user_feed_item).collect()
    }
}

#[derive(Clone)]
pub struct PgInterestStore {
    pool: PgPool,
}

impl PgInterestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InterestStore for PgInterestStore {
    async fn list(&self, user_id: Uuid) -> Result<Vec<UserInterest>> {
        let rows = sqlx::query("SELECT * FROM user_interests WHERE user_id = $1 ORDER BY topic")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(map_interest).collect()
    }

    async fn map_for_user(&self, user_id: Uuid) -> Result<HashMap<String, f64>> {
        let interests = self.list(user_id).await?;
        Ok(interests
            .into_iter()
            .map(|i| (i.topic.to_lowercase(), i.weight))
            .collect())
    }

    async fn upsert(&self, user_id: Uuid, topic: &str, weight: f64) -> Result<UserInterest> {
        let row = sqlx::query(
            r#"
            INSERT INTO user_interests (id, user_id, topic, weight, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, topic) DO UPDATE SET weight = EXCLUDED.weight
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(topic)
        .bind(weight)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        map_interest(row)
    }

    async fn delete(&self, user_id: Uuid, topic: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_interests WHERE user_id = $1 AND topic = $2")
            .bind(user_id)
            .bind(topic)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct PgAffinityStore {
    pool: PgPool,
}

impl PgAffinityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn bump(&self, user_id: Uuid, source_name: &str, like_delta: i64, hide_delta: i64) -> Result<()> {
        // Counter updates happen in SQL so concurrent toggles from the same
        // user cannot lose increments; decrements floor at zero.
        sqlx::query(
            r#"
            INSERT INTO user_like_history
                (id, user_id, source_name, like_count, hide_count, created_at, updated_at)
            VALUES ($1, $2, $3, GREATEST($4, 0), GREATEST($5, 0), $6, $6)
            ON CONFLICT (user_id, source_name) DO UPDATE SET
                like_count = GREATEST(user_like_history.like_count + $4, 0),
                hide_count = GREATEST(user_like_history.hide_count + $5, 0),
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(source_name)
        .bind(like_delta)
        .bind(hide_delta)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AffinityStore for PgAffinityStore {
    async fn increment_like(&self, user_id: Uuid, source_name: &str) -> Result<()> {
        self.bump(user_id, source_name, 1, 0).await
    }

    async fn decrement_like(&self, user_id: Uuid, source_name: &str) -> Result<()> {
        self.bump(user_id, source_name, -1, 0).await
    }

    async fn increment_hide(&self, user_id: Uuid, source_name: &str) -> Result<()> {
        self.bump(user_id, source_name, 0, 1).await
    }

    async fn decrement_hide(&self, user_id: Uuid, source_name: &str) -> Result<()> {
        self.bump(user_id, source_name, 0, -1).await
    }

    async fn counts(&self, user_id: Uuid, source_name: &str) -> Result<(i64, i64)> {
        let row = sqlx::query(
            "SELECT like_count, hide_count FROM user_like_history WHERE user_id = $1 AND source_name = $2",
        )
        .bind(user_id)
        .bind(source_name)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok((row.try_get("like_count")?, row.try_get("hide_count")?)),
            None => Ok((0, 0)),
        }
    }

    async fn counts_map(&self, user_id: Uuid) -> Result<HashMap<String, (i64, i64)>> {
        let rows = sqlx::query(
            "SELECT source_name, like_count, hide_count FROM user_like_history WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("source_name")?;
            map.insert(name, (row.try_get("like_count")?, row.try_get("hide_count")?));
        }
        Ok(map)
    }
}

#[derive(Clone)]
pub struct PgRunStore {
    pool: PgPool,
}

impl PgRunStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunStore for PgRunStore {
    async fn create(
        &self,
        job_type: &str,
        subscription_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<Run> {
        let row = sqlx::query(
            r#"
            INSERT INTO runs (id, job_type, status, subscription_id, user_id, created_at)
            VALUES ($1, $2, 'pending', $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job_type)
        .bind(subscription_id)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        map_run(row)
    }

    async fn mark_running(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE runs SET status = 'running', started_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn complete(
        &self,
        id: Uuid,
        status: RunStatus,
        items_found: i64,
        items_new: i64,
        error: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE runs
            SET status = $1, items_found = $2, items_new = $3, error = $4, finished_at = $5
            WHERE id = $6
            "#,
        )
        .bind(status.as_str())
        .bind(items_found)
        .bind(items_new)
        .bind(error.map(sanitize))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Run>> {
        let rows = sqlx::query("SELECT * FROM runs ORDER BY created_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(map_run).collect()
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, username: &str) -> Result<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, username, is_active, created_at)
            VALUES ($1, $2, TRUE, $3)
            ON CONFLICT (username) DO UPDATE SET is_active = TRUE
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        map_user(row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(map_user).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.map(map_user).transpose()
    }

    async fn list_active(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users WHERE is_active = TRUE ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(map_user).collect()
    }
}
