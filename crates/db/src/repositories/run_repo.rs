//! Repository for the `scheduled_runs` table.
//!
//! One row per armed trigger instant. The conditional `mark_fired`
//! is what makes the missed-trigger catch-up idempotent: two
//! near-simultaneous checks both see the unfired row, but only one
//! flips `fired_at`.

use sqlx::PgPool;

use draftpress_core::types::Timestamp;

use crate::models::run::ScheduledRun;

/// Column list for `scheduled_runs` queries.
const COLUMNS: &str = "scheduled_for, armed_at, fired_at";

/// Provides arm / fire bookkeeping for scheduled triggers.
pub struct RunRepo;

impl RunRepo {
    /// Record an armed trigger. Arming the same instant twice is a
    /// no-op.
    pub async fn arm(pool: &PgPool, scheduled_for: Timestamp) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO scheduled_runs (scheduled_for) VALUES ($1) \
             ON CONFLICT (scheduled_for) DO NOTHING",
        )
        .bind(scheduled_for)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// The most recent armed-but-unfired trigger at or before `now`.
    pub async fn latest_unfired(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Option<ScheduledRun>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scheduled_runs \
             WHERE fired_at IS NULL AND scheduled_for <= $1 \
             ORDER BY scheduled_for DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, ScheduledRun>(&query)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// Conditionally mark a trigger as fired. Returns `true` only for
    /// the single caller that wins; everyone else sees `false`.
    pub async fn mark_fired(
        pool: &PgPool,
        scheduled_for: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE scheduled_runs SET fired_at = NOW() \
             WHERE scheduled_for = $1 AND fired_at IS NULL",
        )
        .bind(scheduled_for)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
