//! Repositories for the content sink tables.

use sqlx::PgPool;

use draftpress_core::types::DbId;

use crate::models::content::{ContentAsset, ContentEntry, CreateContentEntry};

/// Column list for `content_entries` queries.
const CONTENT_COLUMNS: &str = "\
    id, title, body, status, author, category_ref, tags, metadata, created_at";

/// Column list for `content_assets` queries.
const ASSET_COLUMNS: &str = "id, content_ref, source_url, filename, created_at";

/// CRUD for content entries.
pub struct ContentRepo;

impl ContentRepo {
    /// Create a content entry, returning the stored row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateContentEntry,
    ) -> Result<ContentEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO content_entries (title, body, status, author, category_ref, tags, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {CONTENT_COLUMNS}"
        );
        sqlx::query_as::<_, ContentEntry>(&query)
            .bind(&input.title)
            .bind(&input.body)
            .bind(&input.status)
            .bind(&input.author)
            .bind(input.category_ref)
            .bind(&input.tags)
            .bind(&input.metadata)
            .fetch_one(pool)
            .await
    }

    /// Merge keys into an entry's metadata document.
    pub async fn merge_metadata(
        pool: &PgPool,
        id: DbId,
        patch: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE content_entries SET metadata = metadata || $2 WHERE id = $1")
            .bind(id)
            .bind(patch)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Find an entry by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ContentEntry>, sqlx::Error> {
        let query = format!("SELECT {CONTENT_COLUMNS} FROM content_entries WHERE id = $1");
        sqlx::query_as::<_, ContentEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

/// Insert/list operations for content assets.
pub struct AssetRepo;

impl AssetRepo {
    /// Record an asset attached to a content entry.
    pub async fn attach(
        pool: &PgPool,
        content_ref: DbId,
        source_url: &str,
        filename: &str,
    ) -> Result<ContentAsset, sqlx::Error> {
        let query = format!(
            "INSERT INTO content_assets (content_ref, source_url, filename) \
             VALUES ($1, $2, $3) \
             RETURNING {ASSET_COLUMNS}"
        );
        sqlx::query_as::<_, ContentAsset>(&query)
            .bind(content_ref)
            .bind(source_url)
            .bind(filename)
            .fetch_one(pool)
            .await
    }
}
