//! Collaborator interfaces consumed by the engine.
//!
//! Everything the pipeline touches beyond the provider — the content
//! sink, SEO plugin, media store, cost ledger, settings, and queue —
//! sits behind one of these traits so the engine can be exercised
//! end-to-end with in-memory doubles (see [`crate::testing`]).

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use draftpress_core::schedule::{Frequency, TimeOfDay};
use draftpress_core::types::{DbId, Timestamp};
use draftpress_db::models::ledger::CreateLedgerEntry;

use crate::error::PipelineError;
use crate::job::{ImageQualityOption, SeoFields};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// The typed settings snapshot every component receives. Stored as one
/// JSONB document; unknown fields from older versions fall back to
/// defaults on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Text model id.
    pub model: String,
    /// Article length bounds; the engine targets the midpoint.
    pub word_count_min: u32,
    pub word_count_max: u32,
    /// Humanization intensity 0-10.
    pub humanize_intensity: u8,
    pub seo_enabled: bool,
    pub image_enabled: bool,
    pub image_model: String,
    pub image_size: String,
    pub image_quality: ImageQualityOption,
    pub image_style: Option<String>,
    /// Publish immediately instead of drafting.
    pub publish: bool,
    pub default_author: Option<String>,
    pub default_category: Option<DbId>,
    /// Master switch for scheduled generation.
    pub scheduling_enabled: bool,
    pub frequency: Frequency,
    pub time_of_day: TimeOfDay,
    /// Site timezone as minutes east of UTC.
    pub utc_offset_minutes: i32,
    /// Scheduled posts per day; zero or negative means uncapped.
    pub daily_cap: i64,
    /// Monthly spend ceiling in USD; zero or negative means unlimited.
    pub monthly_budget: f64,
    /// When the settings document last changed. Filled in by the
    /// provider on load, never stored inside the document itself.
    #[serde(skip)]
    pub changed_at: Option<DateTime<Utc>>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            word_count_min: 800,
            word_count_max: 1_200,
            humanize_intensity: 5,
            seo_enabled: true,
            image_enabled: false,
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1024".to_string(),
            image_quality: ImageQualityOption::Standard,
            image_style: None,
            publish: false,
            default_author: None,
            default_category: None,
            scheduling_enabled: false,
            frequency: Frequency::Daily,
            time_of_day: TimeOfDay(chrono::NaiveTime::MIN),
            utc_offset_minutes: 0,
            daily_cap: 0,
            monthly_budget: 0.0,
            changed_at: None,
        }
    }
}

impl GenerationSettings {
    /// Word-count target the prompts ask for.
    pub fn word_count_target(&self) -> u32 {
        (self.word_count_min + self.word_count_max) / 2
    }

    /// Site timezone as a fixed offset. Out-of-range values are
    /// clamped to the legal ±14h band.
    pub fn utc_offset(&self) -> FixedOffset {
        let clamped = self.utc_offset_minutes.clamp(-14 * 60, 14 * 60);
        FixedOffset::east_opt(clamped * 60).expect("clamped offset is within range")
    }

    /// Resolve job options from this settings snapshot. Everything a
    /// job needs is captured here so later settings edits cannot
    /// reroute it mid-flight.
    pub fn job_options(
        &self,
        origin: &str,
        keywords: Vec<String>,
        source_topic_id: Option<DbId>,
        category_ref: Option<DbId>,
    ) -> crate::job::JobOptions {
        crate::job::JobOptions {
            model: self.model.clone(),
            word_count: self.word_count_target(),
            keywords,
            publish: self.publish,
            with_image: self.image_enabled,
            seo: self.seo_enabled,
            humanize_intensity: self.humanize_intensity,
            origin: origin.to_string(),
            source_topic_id,
            category_ref: category_ref.or(self.default_category),
            author: self.default_author.clone(),
            image_model: self.image_model.clone(),
            image_size: self.image_size.clone(),
            image_quality: self.image_quality,
            image_style: self.image_style.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Content sink
// ---------------------------------------------------------------------------

/// A fully-assembled piece of content ready for the store.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub title: String,
    /// Block-structured markup.
    pub body: String,
    pub publish: bool,
    pub author: Option<String>,
    pub category_ref: Option<DbId>,
    pub tags: Vec<String>,
    /// Bookkeeping metadata (model, job token, origin, usage).
    pub metadata: serde_json::Value,
}

/// Where finished content goes. Called exactly once per job, at
/// finalize.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn create(&self, content: &NewContent) -> Result<DbId, PipelineError>;
}

/// Applies generated SEO fields to created content. Polymorphic over
/// whichever SEO integration is active; the null implementation simply
/// drops them.
#[async_trait]
pub trait SeoFieldWriter: Send + Sync {
    async fn apply(&self, content_ref: DbId, fields: &SeoFields) -> Result<(), PipelineError>;
}

/// Fetches a generated asset and attaches it to content. Only called
/// when the image step runs.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn fetch_and_attach(
        &self,
        url: &str,
        filename: &str,
        content_ref: DbId,
    ) -> Result<DbId, PipelineError>;
}

// ---------------------------------------------------------------------------
// Bookkeeping
// ---------------------------------------------------------------------------

/// Append-only spend ledger plus the aggregates the scheduler gates
/// read.
#[async_trait]
pub trait CostLedger: Send + Sync {
    async fn append(&self, entry: &CreateLedgerEntry) -> Result<(), PipelineError>;
    async fn cost_since(&self, since: Timestamp) -> Result<f64, PipelineError>;
    async fn completed_count_since(&self, since: Timestamp) -> Result<i64, PipelineError>;
}

/// Typed settings access.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn load(&self) -> Result<GenerationSettings, PipelineError>;
    async fn save(&self, settings: &GenerationSettings) -> Result<(), PipelineError>;
}

/// Marks a queue topic completed when a job that originated from it
/// finishes through the image path.
#[async_trait]
pub trait QueueUpdater: Send + Sync {
    async fn mark_completed(&self, topic_id: DbId, content_ref: DbId)
        -> Result<(), PipelineError>;
}

// ---------------------------------------------------------------------------
// Provider seams
// ---------------------------------------------------------------------------

/// Text generation seam; implemented by the OpenAI client and by the
/// test doubles.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(
        &self,
        request: &draftpress_openai::TextRequest,
    ) -> Result<draftpress_openai::TextGeneration, draftpress_openai::ProviderError>;

    /// Cheap authenticated probe used by the scheduler's credential
    /// gate.
    async fn verify_credentials(&self) -> Result<(), draftpress_openai::ProviderError>;
}

/// Image generation seam.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(
        &self,
        request: &draftpress_openai::ImageRequest,
    ) -> Result<draftpress_openai::ImageGeneration, draftpress_openai::ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_round_trips_through_json() {
        let settings = GenerationSettings::default();
        let json = serde_json::to_value(&settings).unwrap();
        let back: GenerationSettings = serde_json::from_value(json).unwrap();
        assert_eq!(back.model, settings.model);
        assert_eq!(back.word_count_target(), settings.word_count_target());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let partial = serde_json::json!({"model": "gpt-4o", "daily_cap": 3});
        let settings: GenerationSettings = serde_json::from_value(partial).unwrap();
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.daily_cap, 3);
        assert_eq!(settings.word_count_min, 800);
    }

    #[test]
    fn offset_is_clamped_to_legal_band() {
        let settings = GenerationSettings {
            utc_offset_minutes: 10_000,
            ..Default::default()
        };
        assert_eq!(settings.utc_offset().local_minus_utc(), 14 * 3600);
    }
}
