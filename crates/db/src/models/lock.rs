//! Durable scheduler lock entity.

use draftpress_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `scheduler_locks` table.
///
/// A lock is held while its `expires_at` lies in the future; expired
/// rows are dead and may be taken over by any caller.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SchedulerLock {
    pub name: String,
    pub holder: uuid::Uuid,
    pub acquired_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Name of the process-wide generation mutex.
pub const GENERATION_LOCK: &str = "generation";

/// Name of the short-lived lock serializing next-trigger computation.
pub const NEXT_RUN_LOCK: &str = "next_run";
