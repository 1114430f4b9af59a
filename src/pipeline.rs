use crate::compositor::FeedCompositor;
use crate::dedup::Deduplicator;
use crate::fetcher::Fetcher;
use crate::sources::AdapterRegistry;
use crate::storage::{RunStore, SourceStore, SubscriptionStore, UserStore};
use crate::types::{
    FeedJamError, Result, RunStatus, SourceType, Subscription,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const JOB_FETCH_SUBSCRIPTION: &str = "single_subscription";
pub const JOB_GENERATE_FEED: &str = "single_user_view";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on one source's fetch-and-parse. A timed-out source fails
    /// its own run only; there are no in-process retries.
    pub source_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(60),
        }
    }
}

/// Result of fetching one subscription.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchReport {
    pub items_found: usize,
    pub items_new: usize,
    /// True for source types the poller does not fetch (email).
    pub skipped: bool,
}

/// Aggregate result of a fetch-all or regenerate-all sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub items_new: usize,
}

/// Drives fetch-and-regenerate cycles. Each subscription fetch and each user
/// regeneration is a discrete unit of work with its own run record; failures
/// are isolated to their unit and surface on the audit trail, not as
/// exceptions to the scheduler.
pub struct FetchPipeline {
    sources: Arc<dyn SourceStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    users: Arc<dyn UserStore>,
    runs: Arc<dyn RunStore>,
    registry: Arc<AdapterRegistry>,
    fetcher: Arc<Fetcher>,
    dedup: Deduplicator,
    compositor: Arc<FeedCompositor>,
    config: PipelineConfig,
}

impl FetchPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sources: Arc<dyn SourceStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        users: Arc<dyn UserStore>,
        runs: Arc<dyn RunStore>,
        registry: Arc<AdapterRegistry>,
        fetcher: Arc<Fetcher>,
        dedup: Deduplicator,
        compositor: Arc<FeedCompositor>,
    ) -> Self {
        Self {
            sources,
            subscriptions,
            users,
            runs,
            registry,
            fetcher,
            dedup,
            compositor,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Fetch one subscription: parse the source, dedup the output, store new
    /// items, and record the outcome on the run and the source.
    pub async fn fetch_subscription(&self, subscription_id: Uuid) -> Result<FetchReport> {
        let run = self
            .runs
            .create(JOB_FETCH_SUBSCRIPTION, Some(subscription_id), None)
            .await?;
        self.runs.mark_running(run.id).await?;

        match self.fetch_inner(subscription_id).await {
            Ok(report) => {
                self.runs
                    .complete(
                        run.id,
                        RunStatus::Success,
                        report.items_found as i64,
                        report.items_new as i64,
                        None,
                    )
                    .await?;
                Ok(report)
            }
            Err(e) => {
                let message = e.to_string();
                self.runs
                    .complete(run.id, RunStatus::Failed, 0, 0, Some(&message))
                    .await?;
                Err(e)
            }
        }
    }

    async fn fetch_inner(&self, subscription_id: Uuid) -> Result<FetchReport> {
        let subscription = self
            .subscriptions
            .get(subscription_id)
            .await?
            .ok_or(FeedJamError::SubscriptionNotFound { id: subscription_id })?;
        let source = self
            .sources
            .get(subscription.source_id)
            .await?
            .ok_or(FeedJamError::SourceNotFound {
                id: subscription.source_id,
            })?;

        if source.source_type == SourceType::Email {
            debug!("Skipping email source {}: push-ingested, not polled", source.name);
            return Ok(FetchReport {
                skipped: true,
                ..Default::default()
            });
        }

        let adapter = self
            .registry
            .for_type(source.source_type)
            .ok_or(FeedJamError::AdapterNotFound(source.source_type))?;

        let parsed = tokio::time::timeout(
            self.config.source_timeout,
            adapter.parse(&source, &self.fetcher),
        )
        .await;

        let items = match parsed {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                self.sources
                    .record_fetch_outcome(source.id, Some(&e.to_string()))
                    .await?;
                return Err(e);
            }
            Err(_) => {
                let e = FeedJamError::Timeout(format!(
                    "fetch of {} exceeded {:?}",
                    source.name, self.config.source_timeout
                ));
                self.sources
                    .record_fetch_outcome(source.id, Some(&e.to_string()))
                    .await?;
                return Err(e);
            }
        };

        let outcome = self.dedup.persist_batch(&source, items).await?;
        self.sources.record_fetch_outcome(source.id, None).await?;
        self.subscriptions
            .set_last_run(subscription.id, Utc::now())
            .await?;

        info!(
            "Fetched {}: {} found, {} new, {} unidentifiable",
            source.name,
            outcome.found,
            outcome.new_items.len(),
            outcome.unidentifiable
        );
        Ok(FetchReport {
            items_found: outcome.found,
            items_new: outcome.new_items.len(),
            skipped: false,
        })
    }

    /// Fetch every active subscription. A failing source is logged and
    /// recorded on its own run; it never aborts the sweep.
    pub async fn fetch_all(&self) -> Result<SweepSummary> {
        let subscriptions = self.subscriptions.list_active().await?;
        info!("Fetching {} active subscriptions", subscriptions.len());

        let mut summary = SweepSummary::default();
        for Subscription { id, .. } in subscriptions {
            match self.fetch_subscription(id).await {
                Ok(report) => {
                    summary.succeeded += 1;
                    summary.items_new += report.items_new;
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!("Fetch failed for subscription {}: {}", id, e);
                }
            }
        }
        Ok(summary)
    }

    /// Regenerate one user's feed as a unit of work with its own run record.
    /// Scoring and persistence failures propagate after being recorded.
    pub async fn regenerate_user(&self, user_id: Uuid) -> Result<()> {
        let run = self.runs.create(JOB_GENERATE_FEED, None, Some(user_id)).await?;
        self.runs.mark_running(run.id).await?;

        match self.compositor.regenerate(user_id).await {
            Ok(feed) => {
                self.runs
                    .complete(run.id, RunStatus::Success, feed.items.len() as i64, 0, None)
                    .await?;
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.runs
                    .complete(run.id, RunStatus::Failed, 0, 0, Some(&message))
                    .await?;
                Err(e)
            }
        }
    }

    /// Regenerate feeds for every active user, isolating per-user failures.
    pub async fn regenerate_all(&self) -> Result<SweepSummary> {
        let users = self.users.list_active().await?;
        info!("Regenerating feeds for {} users", users.len());

        let mut summary = SweepSummary::default();
        for user in users {
            match self.regenerate_user(user.id).await {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    summary.failed += 1;
                    error!("Feed regeneration failed for user {}: {}", user.id, e);
                }
            }
        }
        Ok(summary)
    }

    /// Periodic driver: fetch everything, then regenerate everyone, forever.
    /// The core logic has no dependency on this trigger; manual invocation of
    /// the sweeps above is equivalent.
    pub async fn run_scheduler(&self, interval: Duration) -> Result<()> {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;

            match self.fetch_all().await {
                Ok(summary) => info!(
                    "Fetch sweep done: {} ok, {} failed, {} new items",
                    summary.succeeded, summary.failed, summary.items_new
                ),
                Err(e) => error!("Fetch sweep failed: {}", e),
            }

            match self.regenerate_all().await {
                Ok(summary) => info!(
                    "Regeneration sweep done: {} ok, {} failed",
                    summary.succeeded, summary.failed
                ),
                Err(e) => error!("Regeneration sweep failed: {}", e),
            }
        }
    }
}
