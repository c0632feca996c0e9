//! Repository for the `scheduler_locks` table.
//!
//! A durable mutex: acquisition is a single conditional upsert, so two
//! processes racing for the same name cannot both win. Expiry (rather
//! than an owner heartbeat) guarantees a crashed holder cannot wedge
//! the system — the TTL just has to exceed the worst case the lock
//! protects.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Provides acquire/release for named durable locks.
pub struct LockRepo;

impl LockRepo {
    /// Try to acquire `name` for `ttl`, identifying ourselves as
    /// `holder`. Returns `true` on success.
    ///
    /// The upsert takes the row when it does not exist, when it has
    /// expired, or when we already hold it (re-entry refreshes the
    /// expiry). A live lock held by someone else matches nothing and
    /// the call returns `false`.
    pub async fn acquire(
        pool: &PgPool,
        name: &str,
        holder: Uuid,
        ttl: Duration,
    ) -> Result<bool, sqlx::Error> {
        let expires_at = Utc::now() + ttl;
        let acquired: Option<(String,)> = sqlx::query_as(
            "INSERT INTO scheduler_locks (name, holder, acquired_at, expires_at) \
             VALUES ($1, $2, NOW(), $3) \
             ON CONFLICT (name) DO UPDATE \
                 SET holder = $2, acquired_at = NOW(), expires_at = $3 \
                 WHERE scheduler_locks.expires_at <= NOW() \
                    OR scheduler_locks.holder = $2 \
             RETURNING name",
        )
        .bind(name)
        .bind(holder)
        .bind(expires_at)
        .fetch_optional(pool)
        .await?;

        Ok(acquired.is_some())
    }

    /// Release `name`, but only if `holder` still owns it. Releasing a
    /// lock that expired and was taken over by someone else is a no-op.
    pub async fn release(pool: &PgPool, name: &str, holder: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM scheduler_locks WHERE name = $1 AND holder = $2")
            .bind(name)
            .bind(holder)
            .execute(pool)
            .await?;
        Ok(())
    }
}
