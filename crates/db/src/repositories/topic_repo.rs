//! Repository for the `queue_topics` table.
//!
//! Claiming is a two-phase conditional update rather than an in-memory
//! lock: competing invocations may run in separate processes, so the
//! row's own `pending -> processing` transition is the only mutual
//! exclusion there is. A claimer that loses the race gets `None` and
//! simply does nothing this cycle.

use chrono::{Duration, Utc};
use sqlx::PgPool;

use draftpress_core::constants::MAX_TOPIC_ATTEMPTS;
use draftpress_core::types::DbId;

use crate::models::status::{TopicSource, TopicStatus};
use crate::models::topic::{EnqueueTopic, QueueTopic, TopicOutcome};

/// Column list for `queue_topics` queries.
const COLUMNS: &str = "\
    id, topic, keywords, category_ref, source_id, status_id, priority, \
    attempts, last_error, content_ref, created_at, processed_at, locked_at";

/// Provides queue operations for topics.
pub struct TopicRepo;

impl TopicRepo {
    /// Enqueue a new pending topic.
    pub async fn enqueue(
        pool: &PgPool,
        source: TopicSource,
        input: &EnqueueTopic,
    ) -> Result<QueueTopic, sqlx::Error> {
        let query = format!(
            "INSERT INTO queue_topics (topic, keywords, category_ref, source_id, status_id, priority) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueueTopic>(&query)
            .bind(&input.topic)
            .bind(&input.keywords)
            .bind(input.category_ref)
            .bind(source.id())
            .bind(TopicStatus::Pending.id())
            .bind(input.priority.unwrap_or(0))
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the next workable topic, if any.
    ///
    /// First reclaims `processing` rows whose lock is older than
    /// `staleness` (crash recovery), then picks the highest-priority,
    /// oldest pending row that still has attempts left and tries the
    /// `pending -> processing` compare-and-swap on it. Returns `None`
    /// when the queue is empty or another caller won the race.
    pub async fn claim_next(
        pool: &PgPool,
        staleness: Duration,
    ) -> Result<Option<QueueTopic>, sqlx::Error> {
        let stale_cutoff = Utc::now() - staleness;
        let reclaimed = sqlx::query(
            "UPDATE queue_topics \
             SET status_id = $1, locked_at = NULL \
             WHERE status_id = $2 AND locked_at < $3",
        )
        .bind(TopicStatus::Pending.id())
        .bind(TopicStatus::Processing.id())
        .bind(stale_cutoff)
        .execute(pool)
        .await?;

        if reclaimed.rows_affected() > 0 {
            tracing::warn!(
                count = reclaimed.rows_affected(),
                "Reclaimed stale processing topics",
            );
        }

        let candidate: Option<(DbId,)> = sqlx::query_as(
            "SELECT id FROM queue_topics \
             WHERE status_id = $1 AND attempts < $2 \
             ORDER BY priority DESC, created_at ASC \
             LIMIT 1",
        )
        .bind(TopicStatus::Pending.id())
        .bind(MAX_TOPIC_ATTEMPTS)
        .fetch_optional(pool)
        .await?;

        let Some((id,)) = candidate else {
            return Ok(None);
        };

        // The CAS: scoped by id *and* still-pending status. A
        // concurrent claimer that got here first flipped the status,
        // so this update matches zero rows and we yield.
        let query = format!(
            "UPDATE queue_topics \
             SET status_id = $2, locked_at = NOW() \
             WHERE id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueueTopic>(&query)
            .bind(id)
            .bind(TopicStatus::Processing.id())
            .bind(TopicStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Release a claimed topic with its outcome.
    ///
    /// Success marks the row completed with its content reference.
    /// Failure increments `attempts`; at [`MAX_TOPIC_ATTEMPTS`] the row
    /// is failed permanently, otherwise it returns to pending for a
    /// later run. Both paths clear the lock.
    pub async fn release(
        pool: &PgPool,
        id: DbId,
        outcome: &TopicOutcome,
    ) -> Result<(), sqlx::Error> {
        match outcome {
            TopicOutcome::Success { content_ref } => {
                sqlx::query(
                    "UPDATE queue_topics \
                     SET status_id = $2, content_ref = $3, processed_at = NOW(), \
                         locked_at = NULL, last_error = NULL \
                     WHERE id = $1",
                )
                .bind(id)
                .bind(TopicStatus::Completed.id())
                .bind(content_ref)
                .execute(pool)
                .await?;
            }
            TopicOutcome::Failure { error } => {
                sqlx::query(
                    "UPDATE queue_topics \
                     SET attempts = attempts + 1, \
                         status_id = CASE WHEN attempts + 1 >= $2 THEN $3 ELSE $4 END, \
                         processed_at = CASE WHEN attempts + 1 >= $2 THEN NOW() ELSE processed_at END, \
                         last_error = $5, \
                         locked_at = NULL \
                     WHERE id = $1",
                )
                .bind(id)
                .bind(MAX_TOPIC_ATTEMPTS)
                .bind(TopicStatus::Failed.id())
                .bind(TopicStatus::Pending.id())
                .bind(error)
                .execute(pool)
                .await?;
            }
        }
        Ok(())
    }

    /// Mark a completed outcome on a topic without going through a
    /// claim (used when a manual job was started from a queue topic).
    pub async fn mark_completed(
        pool: &PgPool,
        id: DbId,
        content_ref: DbId,
    ) -> Result<(), sqlx::Error> {
        Self::release(pool, id, &TopicOutcome::Success { content_ref }).await
    }

    /// Find a topic by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<QueueTopic>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM queue_topics WHERE id = $1");
        sqlx::query_as::<_, QueueTopic>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Number of workable pending topics.
    pub async fn pending_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM queue_topics WHERE status_id = $1 AND attempts < $2",
        )
        .bind(TopicStatus::Pending.id())
        .bind(MAX_TOPIC_ATTEMPTS)
        .fetch_one(pool)
        .await
    }
}
