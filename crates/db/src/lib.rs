//! Database layer: models and repositories over PostgreSQL.
//!
//! Repositories are zero-sized structs whose async methods take a
//! `&PgPool` as their first argument. All contended updates are
//! conditional writes — the database row is the only lock there is,
//! because competing invocations may live in separate processes.

pub mod models;
pub mod repositories;

use sqlx::PgPool;

/// Cheap connectivity probe for startup and health endpoints.
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
