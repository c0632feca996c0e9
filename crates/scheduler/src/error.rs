//! Scheduler error type.

use draftpress_pipeline::PipelineError;

/// Infrastructure failures inside the scheduler. On the scheduled path
/// these are logged, never surfaced to a human; generation failures
/// themselves are not errors here — they land in the queue topic's
/// `last_error` with a bounded retry budget.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
