use crate::affinity::AffinityTracker;
use crate::compositor::FeedCompositor;
use crate::dedup::Deduplicator;
use crate::enrichment::{ContentEnricher, HeuristicEnricher};
use crate::fetcher::Fetcher;
use crate::pipeline::FetchPipeline;
use crate::scoring::{ScoringEngine, ScoringWeights};
use crate::sources::AdapterRegistry;
use crate::storage::{
    PgAffinityStore, PgFeedItemStore, PgInterestStore, PgRunStore, PgSourceStore,
    PgSubscriptionStore, PgUserFeedStore, PgUserStore, RunStore, UserStore,
};
use crate::subscription::{SubscribeRequest, SubscriptionService};
use crate::types::{
    FeedJamError, FetchConfig, Result, Run, Source, Subscription, User,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Top-level assembly of the aggregator: wires the Postgres stores into the
/// pipeline, compositor and subscription service. The API layer and the
/// scheduler both talk to this.
pub struct FeedJam {
    pub pipeline: Arc<FetchPipeline>,
    pub compositor: Arc<FeedCompositor>,
    pub subscriptions: SubscriptionService,
    users: Arc<dyn UserStore>,
    runs: Arc<dyn RunStore>,
}

impl FeedJam {
    /// Connect to Postgres, apply migrations, and assemble the service with
    /// the default enricher and scoring weights.
    pub async fn connect(database_url: &str, fetch_config: FetchConfig) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| FeedJamError::General(format!("migration failed: {e}")))?;
        info!("Connected to database, schema up to date");

        Ok(Self::assemble(
            pool,
            fetch_config,
            Arc::new(HeuristicEnricher::new()),
            ScoringWeights::default(),
        ))
    }

    /// Assemble from an existing pool, with caller-chosen enricher and
    /// scoring weights.
    pub fn assemble(
        pool: PgPool,
        fetch_config: FetchConfig,
        enricher: Arc<dyn ContentEnricher>,
        weights: ScoringWeights,
    ) -> Self {
        let sources = Arc::new(PgSourceStore::new(pool.clone()));
        let subscriptions = Arc::new(PgSubscriptionStore::new(pool.clone()));
        let feed_items = Arc::new(PgFeedItemStore::new(pool.clone()));
        let user_feeds = Arc::new(PgUserFeedStore::new(pool.clone()));
        let interests = Arc::new(PgInterestStore::new(pool.clone()));
        let affinity_store = Arc::new(PgAffinityStore::new(pool.clone()));
        let runs: Arc<dyn RunStore> = Arc::new(PgRunStore::new(pool.clone()));
        let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool));

        let registry = Arc::new(AdapterRegistry::new());
        let fetcher = Arc::new(Fetcher::new(fetch_config));
        let affinity = AffinityTracker::new(affinity_store);
        let scoring = ScoringEngine::new(weights);

        let compositor = Arc::new(FeedCompositor::new(
            user_feeds,
            feed_items.clone(),
            interests,
            affinity,
            enricher,
            scoring,
        ));

        let pipeline = Arc::new(FetchPipeline::new(
            sources.clone(),
            subscriptions.clone(),
            users.clone(),
            runs.clone(),
            registry.clone(),
            fetcher,
            Deduplicator::new(feed_items),
            compositor.clone(),
        ));

        let subscriptions = SubscriptionService::new(sources, subscriptions, registry);

        Self {
            pipeline,
            compositor,
            subscriptions,
            users,
            runs,
        }
    }

    pub async fn add_user(&self, username: &str) -> Result<User> {
        self.users.create(username).await
    }

    pub async fn subscribe(
        &self,
        user_id: Uuid,
        request: SubscribeRequest,
    ) -> Result<(Subscription, Source)> {
        self.subscriptions.subscribe(user_id, request).await
    }

    pub async fn recent_runs(&self, limit: i64) -> Result<Vec<Run>> {
        self.runs.recent(limit).await
    }
}
