//! Job state: the serialized snapshot that survives between
//! invocations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use draftpress_core::pricing::ImageQuality;
use draftpress_core::step::{GenerationStep, StepPlan};
use draftpress_core::types::DbId;

/// Lifecycle status of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, no step run yet.
    Pending,
    /// A step is executing right now.
    Processing,
    /// Between steps, more to go.
    InProgress,
    /// Terminal success.
    Completed,
    /// Terminal failure; `last_error` says why.
    Error,
}

impl JobStatus {
    /// Stable label for logs and storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Whether the job can still advance.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// Options fixed at job creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOptions {
    /// Text model id.
    pub model: String,
    /// Target article length in words.
    pub word_count: u32,
    /// Keyword hints woven into prompts and tags.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Publish immediately instead of drafting.
    pub publish: bool,
    /// Generate a featured image after finalize.
    pub with_image: bool,
    /// Generate SEO fields.
    pub seo: bool,
    /// Humanization intensity 0-10; below the threshold the humanize
    /// step is skipped.
    pub humanize_intensity: u8,
    /// Where the job came from: `manual`, `scheduled`, ...
    pub origin: String,
    /// Queue topic this job was spawned from, if any.
    pub source_topic_id: Option<DbId>,
    /// Target category for the created content.
    pub category_ref: Option<DbId>,
    /// Author attributed on the created content.
    pub author: Option<String>,
    /// Image model / size / quality / style, resolved from settings at
    /// creation so a mid-flight settings change cannot reroute the job.
    pub image_model: String,
    pub image_size: String,
    pub image_quality: ImageQualityOption,
    pub image_style: Option<String>,
}

/// Serializable mirror of [`ImageQuality`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageQualityOption {
    Standard,
    Hd,
}

impl From<ImageQualityOption> for ImageQuality {
    fn from(value: ImageQualityOption) -> Self {
        match value {
            ImageQualityOption::Standard => Self::Standard,
            ImageQualityOption::Hd => Self::Hd,
        }
    }
}

/// Accumulated token and cost accounting across every step.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
    pub image_cost_usd: f64,
}

impl TokenUsage {
    /// Fold one text generation's accounting into the running total.
    pub fn add_text(&mut self, prompt: u32, completion: u32, total: u32, cost_usd: f64) {
        self.prompt_tokens += prompt as u64;
        self.completion_tokens += completion as u64;
        self.total_tokens += total as u64;
        self.cost_usd = draftpress_core::pricing::round6(self.cost_usd + cost_usd);
    }

    /// Fold an image generation's cost into the running total.
    pub fn add_image(&mut self, cost_usd: f64) {
        self.image_cost_usd = draftpress_core::pricing::round6(self.image_cost_usd + cost_usd);
    }

    /// Combined text + image spend.
    pub fn total_cost_usd(&self) -> f64 {
        draftpress_core::pricing::round6(self.cost_usd + self.image_cost_usd)
    }
}

/// SEO fields generated for a piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoFields {
    pub seo_title: String,
    pub meta_description: String,
    pub focus_keyword: String,
}

/// One resumable attempt to turn a topic into published content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub token: Uuid,
    pub topic: String,
    pub options: JobOptions,
    pub status: JobStatus,
    pub current_step: GenerationStep,
    /// Optional-step decisions frozen at creation.
    pub plan: StepPlan,
    /// Finished step names, in execution order.
    pub steps_completed: Vec<GenerationStep>,
    /// Step outputs keyed by step name.
    pub data: BTreeMap<String, String>,
    pub token_usage: TokenUsage,
    /// Parsed SEO fields, once the seo step has run.
    pub seo_fields: Option<SeoFields>,
    /// Created content entity, once finalize has run.
    pub content_ref: Option<DbId>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GenerationJob {
    /// Stored output of a step, if it has run.
    pub fn step_output(&self, step: GenerationStep) -> Option<&str> {
        self.data.get(step.as_str()).map(String::as_str)
    }

    /// The text that finalize should publish: humanized when that step
    /// ran, otherwise the raw content.
    pub fn publishable_text(&self) -> Option<&str> {
        self.step_output(GenerationStep::Humanize)
            .or_else(|| self.step_output(GenerationStep::Content))
    }
}
