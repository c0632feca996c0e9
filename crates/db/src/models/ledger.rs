//! Cost ledger entity and DTOs.
//!
//! The ledger is append-only: exactly one row per finished job,
//! completed or failed. Aggregates over it drive the daily-cap and
//! monthly-budget gates.

use draftpress_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// An immutable row from the `cost_ledger` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerEntry {
    pub id: DbId,
    pub job_token: uuid::Uuid,
    pub topic: String,
    pub model: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub text_cost_usd: f64,
    pub image_cost_usd: f64,
    pub outcome_id: StatusId,
    pub content_ref: Option<DbId>,
    pub created_at: Timestamp,
}

/// Input for appending a ledger entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLedgerEntry {
    pub job_token: uuid::Uuid,
    pub topic: String,
    pub model: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub text_cost_usd: f64,
    pub image_cost_usd: f64,
    pub outcome_id: StatusId,
    pub content_ref: Option<DbId>,
}

/// Lifetime aggregates over the ledger.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerStats {
    pub total_entries: i64,
    pub completed: i64,
    pub failed: i64,
    pub total_cost_usd: f64,
    pub total_prompt_tokens: i64,
    pub total_completion_tokens: i64,
}
