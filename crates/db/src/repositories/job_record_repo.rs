//! Repository for the `generation_jobs` table.
//!
//! A JSONB key-value store with a TTL. Job state is ephemeral by
//! contract — an abandoned job simply ages out — so reads exclude
//! expired rows and a periodic sweep deletes them.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::job_record::JobRecord;

/// Column list for `generation_jobs` queries.
const COLUMNS: &str = "token, payload, expires_at, created_at, updated_at";

/// Provides TTL key-value operations for job state.
pub struct JobRecordRepo;

impl JobRecordRepo {
    /// Insert or replace the state under `token`, refreshing the TTL.
    pub async fn put(
        pool: &PgPool,
        token: Uuid,
        payload: &serde_json::Value,
        ttl: Duration,
    ) -> Result<(), sqlx::Error> {
        let expires_at = Utc::now() + ttl;
        sqlx::query(
            "INSERT INTO generation_jobs (token, payload, expires_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (token) DO UPDATE \
                 SET payload = $2, expires_at = $3, updated_at = NOW()",
        )
        .bind(token)
        .bind(payload)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Fetch the state under `token`, unless it has expired.
    pub async fn get(pool: &PgPool, token: Uuid) -> Result<Option<JobRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_jobs \
             WHERE token = $1 AND expires_at > NOW()"
        );
        sqlx::query_as::<_, JobRecord>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// Remove the state under `token`.
    pub async fn delete(pool: &PgPool, token: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM generation_jobs WHERE token = $1")
            .bind(token)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Sweep expired rows. Returns how many were removed.
    pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM generation_jobs WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
