//! Postgres-backed collaborator implementations.
//!
//! Thin adapters from the trait seams in [`crate::traits`] onto the
//! repositories in `draftpress-db`. Each holds a pool clone and
//! nothing else.

use async_trait::async_trait;
use sqlx::PgPool;

use draftpress_core::types::{DbId, Timestamp};
use draftpress_db::models::ledger::CreateLedgerEntry;
use draftpress_db::repositories::{AssetRepo, ContentRepo, LedgerRepo, SettingsRepo, TopicRepo};

use crate::error::PipelineError;
use crate::job::SeoFields;
use crate::traits::{
    ContentStore, CostLedger, GenerationSettings, MediaStore, NewContent, QueueUpdater,
    SeoFieldWriter, SettingsProvider,
};

/// Settings-document key for the generation settings group.
const SETTINGS_KEY: &str = "generation";

// ---------------------------------------------------------------------------
// Content store
// ---------------------------------------------------------------------------

/// Content sink writing to the `content_entries` table.
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn create(&self, content: &NewContent) -> Result<DbId, PipelineError> {
        let status = if content.publish { "publish" } else { "draft" };
        let input = draftpress_db::models::content::CreateContentEntry {
            title: content.title.clone(),
            body: content.body.clone(),
            status: status.to_string(),
            author: content.author.clone(),
            category_ref: content.category_ref,
            tags: content.tags.clone(),
            metadata: content.metadata.clone(),
        };
        let entry = ContentRepo::create(&self.pool, &input)
            .await
            .map_err(|e| PipelineError::ContentStore(e.to_string()))?;
        Ok(entry.id)
    }
}

// ---------------------------------------------------------------------------
// SEO writers
// ---------------------------------------------------------------------------

/// SEO writer that stores fields into the entry's metadata document,
/// where the active SEO integration picks them up.
pub struct PgSeoFieldWriter {
    pool: PgPool,
}

impl PgSeoFieldWriter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SeoFieldWriter for PgSeoFieldWriter {
    async fn apply(&self, content_ref: DbId, fields: &SeoFields) -> Result<(), PipelineError> {
        let patch = serde_json::json!({
            "seo_title": fields.seo_title,
            "meta_description": fields.meta_description,
            "focus_keyword": fields.focus_keyword,
        });
        ContentRepo::merge_metadata(&self.pool, content_ref, &patch)
            .await
            .map_err(|e| PipelineError::Collaborator(e.to_string()))
    }
}

/// SEO writer for deployments with no SEO integration: logs and drops.
pub struct NullSeoFieldWriter;

#[async_trait]
impl SeoFieldWriter for NullSeoFieldWriter {
    async fn apply(&self, content_ref: DbId, _fields: &SeoFields) -> Result<(), PipelineError> {
        tracing::debug!(content_ref, "No SEO integration active, dropping fields");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Media store
// ---------------------------------------------------------------------------

/// Media store recording the generated asset against the entry. Byte
/// mirroring off the provider's short-lived URL is the delivery
/// layer's job; the pipeline only needs the attachment recorded.
pub struct PgMediaStore {
    pool: PgPool,
}

impl PgMediaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaStore for PgMediaStore {
    async fn fetch_and_attach(
        &self,
        url: &str,
        filename: &str,
        content_ref: DbId,
    ) -> Result<DbId, PipelineError> {
        let asset = AssetRepo::attach(&self.pool, content_ref, url, filename)
            .await
            .map_err(|e| PipelineError::Collaborator(e.to_string()))?;
        Ok(asset.id)
    }
}

// ---------------------------------------------------------------------------
// Cost ledger
// ---------------------------------------------------------------------------

/// Cost ledger over the `cost_ledger` table.
pub struct PgCostLedger {
    pool: PgPool,
}

impl PgCostLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CostLedger for PgCostLedger {
    async fn append(&self, entry: &CreateLedgerEntry) -> Result<(), PipelineError> {
        LedgerRepo::append(&self.pool, entry)
            .await
            .map_err(|e| PipelineError::Collaborator(e.to_string()))?;
        Ok(())
    }

    async fn cost_since(&self, since: Timestamp) -> Result<f64, PipelineError> {
        LedgerRepo::cost_since(&self.pool, since)
            .await
            .map_err(|e| PipelineError::Collaborator(e.to_string()))
    }

    async fn completed_count_since(&self, since: Timestamp) -> Result<i64, PipelineError> {
        LedgerRepo::completed_count_since(&self.pool, since)
            .await
            .map_err(|e| PipelineError::Collaborator(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Settings provider over the `settings` JSONB table. Absent document
/// means defaults.
pub struct PgSettingsProvider {
    pool: PgPool,
}

impl PgSettingsProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsProvider for PgSettingsProvider {
    async fn load(&self) -> Result<GenerationSettings, PipelineError> {
        let row = SettingsRepo::get(&self.pool, SETTINGS_KEY)
            .await
            .map_err(|e| PipelineError::Collaborator(e.to_string()))?;
        match row {
            Some((value, updated_at)) => {
                let mut settings: GenerationSettings = serde_json::from_value(value)?;
                settings.changed_at = Some(updated_at);
                Ok(settings)
            }
            None => Ok(GenerationSettings::default()),
        }
    }

    async fn save(&self, settings: &GenerationSettings) -> Result<(), PipelineError> {
        let value = serde_json::to_value(settings)?;
        SettingsRepo::set(&self.pool, SETTINGS_KEY, &value)
            .await
            .map_err(|e| PipelineError::Collaborator(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Queue updater
// ---------------------------------------------------------------------------

/// Queue updater over the `queue_topics` table.
pub struct PgQueueUpdater {
    pool: PgPool,
}

impl PgQueueUpdater {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueUpdater for PgQueueUpdater {
    async fn mark_completed(
        &self,
        topic_id: DbId,
        content_ref: DbId,
    ) -> Result<(), PipelineError> {
        TopicRepo::mark_completed(&self.pool, topic_id, content_ref)
            .await
            .map_err(|e| PipelineError::Collaborator(e.to_string()))
    }
}
