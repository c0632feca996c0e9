//! Ephemeral job-state record.

use draftpress_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `generation_jobs` table: opaque job state stored as
/// JSONB under a token, with a TTL. Rows past `expires_at` are treated
/// as absent and swept opportunistically.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobRecord {
    pub token: uuid::Uuid,
    pub payload: serde_json::Value,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
