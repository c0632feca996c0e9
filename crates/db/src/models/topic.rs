//! Queue topic entity and DTOs.

use draftpress_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `queue_topics` table: one unit of prospective work.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueueTopic {
    pub id: DbId,
    pub topic: String,
    pub keywords: Vec<String>,
    pub category_ref: Option<DbId>,
    pub source_id: StatusId,
    pub status_id: StatusId,
    pub priority: i32,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub content_ref: Option<DbId>,
    pub created_at: Timestamp,
    pub processed_at: Option<Timestamp>,
    pub locked_at: Option<Timestamp>,
}

/// Input for enqueuing a new topic.
#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueTopic {
    pub topic: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub category_ref: Option<DbId>,
    pub priority: Option<i32>,
}

/// How a claimed topic finished.
#[derive(Debug, Clone)]
pub enum TopicOutcome {
    /// The pipeline produced content; store its reference.
    Success { content_ref: DbId },
    /// The pipeline failed; record why.
    Failure { error: String },
}
