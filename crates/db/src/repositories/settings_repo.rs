//! Repository for the `settings` table.
//!
//! One JSONB document per settings group, fetched and replaced whole.
//! The typed view over the document lives in the pipeline crate.

use sqlx::PgPool;

use draftpress_core::types::Timestamp;

/// Get/set for settings documents.
pub struct SettingsRepo;

impl SettingsRepo {
    /// Fetch a settings document and when it last changed.
    pub async fn get(
        pool: &PgPool,
        key: &str,
    ) -> Result<Option<(serde_json::Value, Timestamp)>, sqlx::Error> {
        sqlx::query_as("SELECT value, updated_at FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace a settings document, bumping `updated_at`.
    pub async fn set(
        pool: &PgPool,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }
}
