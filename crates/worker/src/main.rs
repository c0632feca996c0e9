//! The scheduled-generation worker process.
//!
//! Wires the Postgres-backed collaborators to the pipeline engine and
//! runs the scheduler on a minute ticker until shutdown. Multiple
//! workers may run side by side: the durable locks and conditional
//! queue claims keep them from stepping on each other.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use draftpress_db::repositories::JobRecordRepo;
use draftpress_openai::{ClientConfig, OpenAiClient};
use draftpress_pipeline::content::{
    PgContentStore, PgCostLedger, PgMediaStore, PgQueueUpdater, PgSeoFieldWriter,
    PgSettingsProvider,
};
use draftpress_pipeline::store::PgJobStore;
use draftpress_pipeline::PipelineEngine;
use draftpress_scheduler::{Scheduler, SchedulerConfig};

/// How often the scheduler checks for due or missed triggers.
const TICK_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "draftpress_worker=info,draftpress_scheduler=info,draftpress_pipeline=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    sqlx::migrate!("../../db/migrations").run(&pool).await?;
    draftpress_db::health_check(&pool).await?;

    let client = Arc::new(OpenAiClient::new(ClientConfig::from_env()?)?);

    let settings = Arc::new(PgSettingsProvider::new(pool.clone()));
    let ledger = Arc::new(PgCostLedger::new(pool.clone()));
    let engine = Arc::new(PipelineEngine::new(
        Arc::new(PgJobStore::new(pool.clone())),
        client.clone(),
        client.clone(),
        Arc::new(PgContentStore::new(pool.clone())),
        Arc::new(PgSeoFieldWriter::new(pool.clone())),
        Arc::new(PgMediaStore::new(pool.clone())),
        ledger.clone(),
        Arc::new(PgQueueUpdater::new(pool.clone())),
    ));
    let scheduler = Scheduler::new(
        pool.clone(),
        engine,
        settings,
        ledger,
        client,
        SchedulerConfig::default(),
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                cancel.cancel();
            }
        });
    }

    tracing::info!(
        tick_secs = TICK_INTERVAL.as_secs(),
        "Worker started, scheduler ticking",
    );

    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Worker shutting down");
                break;
            }
            _ = ticker.tick() => {
                match scheduler.tick(Utc::now()).await {
                    Ok(Some(outcome)) => tracing::info!(?outcome, "Scheduler tick ran"),
                    Ok(None) => tracing::debug!("Scheduler tick idle"),
                    Err(error) => tracing::error!(error = %error, "Scheduler tick failed"),
                }

                // Opportunistic sweep of expired job state.
                match JobRecordRepo::purge_expired(&pool).await {
                    Ok(0) => {}
                    Ok(purged) => tracing::debug!(purged, "Purged expired job state"),
                    Err(error) => tracing::warn!(error = %error, "Job-state purge failed"),
                }
            }
        }
    }

    Ok(())
}
