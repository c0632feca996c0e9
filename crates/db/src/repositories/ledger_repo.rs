//! Repository for the append-only `cost_ledger` table.

use sqlx::PgPool;

use draftpress_core::types::Timestamp;

use crate::models::ledger::{CreateLedgerEntry, LedgerEntry, LedgerStats};
use crate::models::status::LedgerOutcome;

/// Column list for `cost_ledger` queries.
const COLUMNS: &str = "\
    id, job_token, topic, model, prompt_tokens, completion_tokens, \
    text_cost_usd, image_cost_usd, outcome_id, content_ref, created_at";

/// Append and aggregate operations for the cost ledger. There is no
/// update or delete: entries are immutable once written.
pub struct LedgerRepo;

impl LedgerRepo {
    /// Append one entry for a finished job.
    pub async fn append(
        pool: &PgPool,
        input: &CreateLedgerEntry,
    ) -> Result<LedgerEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO cost_ledger \
                 (job_token, topic, model, prompt_tokens, completion_tokens, \
                  text_cost_usd, image_cost_usd, outcome_id, content_ref) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(input.job_token)
            .bind(&input.topic)
            .bind(&input.model)
            .bind(input.prompt_tokens)
            .bind(input.completion_tokens)
            .bind(input.text_cost_usd)
            .bind(input.image_cost_usd)
            .bind(input.outcome_id)
            .bind(input.content_ref)
            .fetch_one(pool)
            .await
    }

    /// Total spend (text + image) on entries at or after `since`.
    ///
    /// The caller picks the boundary — the scheduler passes the start
    /// of the current calendar month in the site timezone.
    pub async fn cost_since(pool: &PgPool, since: Timestamp) -> Result<f64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COALESCE(SUM(text_cost_usd + image_cost_usd), 0)::DOUBLE PRECISION \
             FROM cost_ledger WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_one(pool)
        .await
    }

    /// Number of completed jobs at or after `since` (the daily-cap
    /// counter when `since` is the start of the site-local day).
    pub async fn completed_count_since(
        pool: &PgPool,
        since: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM cost_ledger WHERE outcome_id = $1 AND created_at >= $2",
        )
        .bind(LedgerOutcome::Completed.id())
        .bind(since)
        .fetch_one(pool)
        .await
    }

    /// Lifetime aggregates.
    pub async fn stats(pool: &PgPool) -> Result<LedgerStats, sqlx::Error> {
        sqlx::query_as::<_, LedgerStats>(
            "SELECT COUNT(*) AS total_entries, \
                    COUNT(*) FILTER (WHERE outcome_id = $1) AS completed, \
                    COUNT(*) FILTER (WHERE outcome_id = $2) AS failed, \
                    COALESCE(SUM(text_cost_usd + image_cost_usd), 0)::DOUBLE PRECISION AS total_cost_usd, \
                    COALESCE(SUM(prompt_tokens), 0)::BIGINT AS total_prompt_tokens, \
                    COALESCE(SUM(completion_tokens), 0)::BIGINT AS total_completion_tokens \
             FROM cost_ledger",
        )
        .bind(LedgerOutcome::Completed.id())
        .bind(LedgerOutcome::Failed.id())
        .fetch_one(pool)
        .await
    }
}
