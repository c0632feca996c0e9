//! Content sink entities.

use draftpress_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `content_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContentEntry {
    pub id: DbId,
    pub title: String,
    pub body: String,
    pub status: String,
    pub author: Option<String>,
    pub category_ref: Option<DbId>,
    pub tags: Vec<String>,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

/// Input for creating a content entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateContentEntry {
    pub title: String,
    pub body: String,
    /// `draft` or `publish`.
    pub status: String,
    pub author: Option<String>,
    pub category_ref: Option<DbId>,
    pub tags: Vec<String>,
    pub metadata: serde_json::Value,
}

/// A row from the `content_assets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContentAsset {
    pub id: DbId,
    pub content_ref: DbId,
    pub source_url: String,
    pub filename: String,
    pub created_at: Timestamp,
}
