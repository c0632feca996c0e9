//! Pipeline error taxonomy.

use draftpress_core::step::GenerationStep;
use draftpress_openai::ProviderError;
use uuid::Uuid;

/// Errors from the pipeline engine.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The provider call for a step failed (already retried inside the
    /// client where that made sense).
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The generator returned output judged unusable — empty or far too
    /// short. Distinct from a transport failure: the call worked, the
    /// content didn't.
    #[error("Step '{step}' produced unusable output ({chars} chars)")]
    EmptyOutput { step: GenerationStep, chars: usize },

    /// A step was requested out of order.
    #[error("Job is at step '{current}', refusing to run '{requested}'")]
    StepMismatch {
        current: GenerationStep,
        requested: GenerationStep,
    },

    /// A step's prerequisite data is missing from the job.
    #[error("Step '{step}' requires output from '{missing}' which is absent")]
    MissingPrerequisite {
        step: GenerationStep,
        missing: GenerationStep,
    },

    /// No live job under this token (never created, or expired).
    #[error("No job found for token {0} — it may have expired")]
    JobNotFound(Uuid),

    /// The job is in a terminal state and cannot advance.
    #[error("Job {token} is {status} and cannot advance")]
    Terminal { token: Uuid, status: &'static str },

    /// Job-state store failure.
    #[error("Job store error: {0}")]
    Store(String),

    /// Content-store write failure. Aborts the job — nothing partially
    /// created is left published.
    #[error("Content store error: {0}")]
    ContentStore(String),

    /// Any other collaborator failure (SEO writer, media store,
    /// ledger, settings).
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Job state failed to (de)serialize.
    #[error("Job state serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for PipelineError {
    fn from(error: sqlx::Error) -> Self {
        Self::Store(error.to_string())
    }
}
