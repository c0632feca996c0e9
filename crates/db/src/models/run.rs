//! Armed-trigger bookkeeping entity.

use draftpress_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `scheduled_runs` table: one armed trigger instant.
///
/// `fired_at` is set exactly once, by whichever invocation wins the
/// conditional mark — that is what keeps a near-simultaneous catch-up
/// check from double-firing a missed trigger.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScheduledRun {
    pub scheduled_for: Timestamp,
    pub armed_at: Timestamp,
    pub fired_at: Option<Timestamp>,
}
