//! In-memory test doubles for every collaborator seam.
//!
//! Shared by this crate's engine tests and the scheduler's integration
//! tests, so it is a regular (non-`cfg(test)`) module. Nothing here is
//! wired into production binaries.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use draftpress_core::step::{first_step, StepPlan};
use draftpress_core::types::{DbId, Timestamp};
use draftpress_db::models::ledger::CreateLedgerEntry;
use draftpress_db::models::status::LedgerOutcome;
use draftpress_openai::{
    ImageGeneration, ImageRequest, ProviderError, TextGeneration, TextRequest,
};

use crate::error::PipelineError;
use crate::job::{GenerationJob, ImageQualityOption, JobOptions, JobStatus, SeoFields, TokenUsage};
use crate::traits::{
    ContentStore, CostLedger, GenerationSettings, ImageGenerator, MediaStore, NewContent,
    QueueUpdater, SeoFieldWriter, SettingsProvider, TextGenerator,
};

/// A minimal in-flight job for unit tests.
pub fn sample_job(topic: &str) -> GenerationJob {
    GenerationJob {
        token: Uuid::new_v4(),
        topic: topic.to_string(),
        options: JobOptions {
            model: "gpt-4o-mini".to_string(),
            word_count: 1_000,
            keywords: Vec::new(),
            publish: false,
            with_image: false,
            seo: false,
            humanize_intensity: 5,
            origin: "manual".to_string(),
            source_topic_id: None,
            category_ref: None,
            author: None,
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1024".to_string(),
            image_quality: ImageQualityOption::Standard,
            image_style: None,
        },
        status: JobStatus::InProgress,
        current_step: first_step(),
        plan: StepPlan::new(5, false, false),
        steps_completed: Vec::new(),
        data: Default::default(),
        token_usage: TokenUsage::default(),
        seo_fields: None,
        content_ref: None,
        last_error: None,
        created_at: Utc::now(),
    }
}

/// A canned successful text generation.
pub fn canned_text(content: &str, cost_usd: f64) -> TextGeneration {
    TextGeneration {
        content: content.to_string(),
        prompt_tokens: 100,
        completion_tokens: 200,
        total_tokens: 300,
        cost_usd,
        finish_reason: Some("stop".to_string()),
    }
}

// ---------------------------------------------------------------------------
// Provider doubles
// ---------------------------------------------------------------------------

/// Scripted text generator: pops one response per call, in order.
pub struct FakeTextGenerator {
    responses: Mutex<VecDeque<Result<TextGeneration, ProviderError>>>,
    /// What `verify_credentials` returns.
    pub credentials_ok: bool,
    requests: Mutex<Vec<TextRequest>>,
}

impl FakeTextGenerator {
    pub fn scripted(responses: Vec<Result<TextGeneration, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            credentials_ok: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request the engine issued, for assertions.
    pub fn seen_requests(&self) -> Vec<TextRequest> {
        self.requests.lock().expect("requests mutex").clone()
    }
}

#[async_trait]
impl TextGenerator for FakeTextGenerator {
    async fn generate_text(&self, request: &TextRequest) -> Result<TextGeneration, ProviderError> {
        self.requests
            .lock()
            .expect("requests mutex")
            .push(request.clone());
        self.responses
            .lock()
            .expect("responses mutex")
            .pop_front()
            .unwrap_or_else(|| {
                Err(ProviderError::InvalidResponse(
                    "fake generator script exhausted".to_string(),
                ))
            })
    }

    async fn verify_credentials(&self) -> Result<(), ProviderError> {
        if self.credentials_ok {
            Ok(())
        } else {
            Err(ProviderError::AuthFailed)
        }
    }
}

/// Scripted image generator.
pub struct FakeImageGenerator {
    responses: Mutex<VecDeque<Result<ImageGeneration, ProviderError>>>,
}

impl FakeImageGenerator {
    pub fn scripted(responses: Vec<Result<ImageGeneration, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }

    /// A generator for jobs whose plan never reaches the image step.
    pub fn unused() -> Self {
        Self::scripted(Vec::new())
    }
}

#[async_trait]
impl ImageGenerator for FakeImageGenerator {
    async fn generate_image(
        &self,
        _request: &ImageRequest,
    ) -> Result<ImageGeneration, ProviderError> {
        self.responses
            .lock()
            .expect("responses mutex")
            .pop_front()
            .unwrap_or_else(|| {
                Err(ProviderError::InvalidResponse(
                    "fake image script exhausted".to_string(),
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Collaborator doubles
// ---------------------------------------------------------------------------

/// Content store that records creations and hands out sequential ids.
#[derive(Default)]
pub struct MemoryContentStore {
    pub created: Mutex<Vec<NewContent>>,
    next_id: AtomicI64,
    /// When set, `create` fails — simulates a content-store outage.
    pub fail: bool,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn create(&self, content: &NewContent) -> Result<DbId, PipelineError> {
        if self.fail {
            return Err(PipelineError::ContentStore("store unavailable".to_string()));
        }
        self.created
            .lock()
            .expect("created mutex")
            .push(content.clone());
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Records applied SEO fields.
#[derive(Default)]
pub struct MemorySeoWriter {
    pub applied: Mutex<Vec<(DbId, SeoFields)>>,
}

#[async_trait]
impl SeoFieldWriter for MemorySeoWriter {
    async fn apply(&self, content_ref: DbId, fields: &SeoFields) -> Result<(), PipelineError> {
        self.applied
            .lock()
            .expect("applied mutex")
            .push((content_ref, fields.clone()));
        Ok(())
    }
}

/// Records attached media.
#[derive(Default)]
pub struct MemoryMediaStore {
    pub attached: Mutex<Vec<(String, String, DbId)>>,
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn fetch_and_attach(
        &self,
        url: &str,
        filename: &str,
        content_ref: DbId,
    ) -> Result<DbId, PipelineError> {
        let mut attached = self.attached.lock().expect("attached mutex");
        attached.push((url.to_string(), filename.to_string(), content_ref));
        Ok(attached.len() as DbId)
    }
}

/// In-memory append-only ledger with the same aggregate semantics as
/// the Postgres one.
#[derive(Default)]
pub struct MemoryCostLedger {
    pub entries: Mutex<Vec<(CreateLedgerEntry, Timestamp)>>,
}

#[async_trait]
impl CostLedger for MemoryCostLedger {
    async fn append(&self, entry: &CreateLedgerEntry) -> Result<(), PipelineError> {
        self.entries
            .lock()
            .expect("entries mutex")
            .push((entry.clone(), Utc::now()));
        Ok(())
    }

    async fn cost_since(&self, since: Timestamp) -> Result<f64, PipelineError> {
        Ok(self
            .entries
            .lock()
            .expect("entries mutex")
            .iter()
            .filter(|(_, at)| *at >= since)
            .map(|(e, _)| e.text_cost_usd + e.image_cost_usd)
            .sum())
    }

    async fn completed_count_since(&self, since: Timestamp) -> Result<i64, PipelineError> {
        Ok(self
            .entries
            .lock()
            .expect("entries mutex")
            .iter()
            .filter(|(e, at)| *at >= since && e.outcome_id == LedgerOutcome::Completed.id())
            .count() as i64)
    }
}

/// Fixed settings snapshot.
pub struct MemorySettings {
    pub settings: Mutex<GenerationSettings>,
}

impl MemorySettings {
    pub fn new(settings: GenerationSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

#[async_trait]
impl SettingsProvider for MemorySettings {
    async fn load(&self) -> Result<GenerationSettings, PipelineError> {
        Ok(self.settings.lock().expect("settings mutex").clone())
    }

    async fn save(&self, settings: &GenerationSettings) -> Result<(), PipelineError> {
        let mut current = self.settings.lock().expect("settings mutex");
        *current = settings.clone();
        current.changed_at = Some(Utc::now());
        Ok(())
    }
}

/// Records topic completions.
#[derive(Default)]
pub struct MemoryQueueUpdater {
    pub completed: Mutex<Vec<(DbId, DbId)>>,
}

#[async_trait]
impl QueueUpdater for MemoryQueueUpdater {
    async fn mark_completed(
        &self,
        topic_id: DbId,
        content_ref: DbId,
    ) -> Result<(), PipelineError> {
        self.completed
            .lock()
            .expect("completed mutex")
            .push((topic_id, content_ref));
        Ok(())
    }
}
