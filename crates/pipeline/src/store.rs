//! Job-state storage.
//!
//! A key-value abstraction with TTL semantics: the engine persists the
//! whole [`GenerationJob`] snapshot after every mutation, so a job can
//! resume in a different process, and abandoned state ages out instead
//! of accumulating.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use draftpress_core::constants::job_ttl;
use draftpress_db::repositories::JobRecordRepo;

use crate::error::PipelineError;
use crate::job::GenerationJob;

/// TTL key-value storage for job state.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fetch a live (non-expired) job.
    async fn get(&self, token: Uuid) -> Result<Option<GenerationJob>, PipelineError>;

    /// Persist a job snapshot, refreshing its TTL.
    async fn put(&self, job: &GenerationJob) -> Result<(), PipelineError>;

    /// Drop a job's state.
    async fn delete(&self, token: Uuid) -> Result<(), PipelineError>;
}

// ---------------------------------------------------------------------------
// Postgres implementation
// ---------------------------------------------------------------------------

/// Job store over the `generation_jobs` JSONB table.
pub struct PgJobStore {
    pool: PgPool,
    ttl: Duration,
}

impl PgJobStore {
    /// Create a store with the default TTL.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            ttl: job_ttl(),
        }
    }

    /// Override the TTL (shorter in tests).
    pub fn with_ttl(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn get(&self, token: Uuid) -> Result<Option<GenerationJob>, PipelineError> {
        let record = JobRecordRepo::get(&self.pool, token).await?;
        match record {
            Some(record) => Ok(Some(serde_json::from_value(record.payload)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, job: &GenerationJob) -> Result<(), PipelineError> {
        let payload = serde_json::to_value(job)?;
        JobRecordRepo::put(&self.pool, job.token, &payload, self.ttl).await?;
        Ok(())
    }

    async fn delete(&self, token: Uuid) -> Result<(), PipelineError> {
        JobRecordRepo::delete(&self.pool, token).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// In-memory job store with real TTL behavior. The test double of
/// choice, also usable for single-process deployments without durable
/// job resume.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: std::sync::Mutex<std::collections::HashMap<Uuid, (GenerationJob, DateTime<Utc>)>>,
    ttl: Option<Duration>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose entries expire after `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            jobs: std::sync::Mutex::new(std::collections::HashMap::new()),
            ttl: Some(ttl),
        }
    }

    fn expiry(&self) -> DateTime<Utc> {
        Utc::now() + self.ttl.unwrap_or_else(job_ttl)
    }

    fn lock(
        &self,
    ) -> Result<
        std::sync::MutexGuard<'_, std::collections::HashMap<Uuid, (GenerationJob, DateTime<Utc>)>>,
        PipelineError,
    > {
        self.jobs
            .lock()
            .map_err(|_| PipelineError::Store("job store mutex poisoned".into()))
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn get(&self, token: Uuid) -> Result<Option<GenerationJob>, PipelineError> {
        let jobs = self.lock()?;
        Ok(jobs
            .get(&token)
            .filter(|(_, expires_at)| *expires_at > Utc::now())
            .map(|(job, _)| job.clone()))
    }

    async fn put(&self, job: &GenerationJob) -> Result<(), PipelineError> {
        let expires_at = self.expiry();
        self.lock()?.insert(job.token, (job.clone(), expires_at));
        Ok(())
    }

    async fn delete(&self, token: Uuid) -> Result<(), PipelineError> {
        self.lock()?.remove(&token);
        Ok(())
    }
}
