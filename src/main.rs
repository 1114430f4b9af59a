use anyhow::Context;
use clap::{Parser, Subcommand};
use feedjam::{FeedJam, FetchConfig, SubscribeRequest};
use std::env;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "feedjam", about = "Personalized feed aggregator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the periodic fetch-and-regenerate loop.
    Serve {
        /// Seconds between sweeps.
        #[arg(long, default_value_t = 1800)]
        interval_secs: u64,
    },
    /// Fetch all active subscriptions once.
    Fetch,
    /// Regenerate feeds: one user, or everyone.
    Regenerate {
        #[arg(long)]
        user: Option<Uuid>,
    },
    /// Create a user.
    AddUser { username: String },
    /// Subscribe a user to a URL; the source type is auto-detected.
    Subscribe {
        user: Uuid,
        url: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Show recent fetch/regeneration runs.
    Runs {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let database_url = env::var("DATABASE_URL")
        .context("DATABASE_URL must be set (e.g. postgresql://localhost/feedjam)")?;
    let app = FeedJam::connect(&database_url, FetchConfig::default()).await?;

    match cli.command {
        Command::Serve { interval_secs } => {
            info!("Starting scheduler, sweeping every {}s", interval_secs);
            app.pipeline
                .run_scheduler(Duration::from_secs(interval_secs))
                .await?;
        }
        Command::Fetch => {
            let summary = app.pipeline.fetch_all().await?;
            info!(
                "Fetched: {} ok, {} failed, {} new items",
                summary.succeeded, summary.failed, summary.items_new
            );
        }
        Command::Regenerate { user } => match user {
            Some(user_id) => {
                app.pipeline.regenerate_user(user_id).await?;
                info!("Regenerated feed for user {}", user_id);
            }
            None => {
                let summary = app.pipeline.regenerate_all().await?;
                info!(
                    "Regenerated: {} ok, {} failed",
                    summary.succeeded, summary.failed
                );
            }
        },
        Command::AddUser { username } => {
            let user = app.add_user(&username).await?;
            info!("Created user {} ({})", user.username, user.id);
        }
        Command::Subscribe { user, url, name } => {
            let (subscription, source) = app
                .subscribe(
                    user,
                    SubscribeRequest {
                        url,
                        source_type: None,
                        name,
                    },
                )
                .await?;
            info!(
                "Subscribed {} to {} ({}), subscription {}",
                user, source.name, source.source_type, subscription.id
            );
        }
        Command::Runs { limit } => {
            for run in app.recent_runs(limit).await? {
                info!(
                    "{} {} {} found={} new={} error={:?}",
                    run.created_at,
                    run.job_type,
                    run.status.as_str(),
                    run.items_found,
                    run.items_new,
                    run.error
                );
            }
        }
    }

    Ok(())
}
