//! Integration tests for durable scheduler state: locks, armed-run
//! bookkeeping, the cost ledger, and the job-state TTL store.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use draftpress_db::models::ledger::CreateLedgerEntry;
use draftpress_db::models::lock::GENERATION_LOCK;
use draftpress_db::models::status::LedgerOutcome;
use draftpress_db::repositories::{JobRecordRepo, LedgerRepo, LockRepo, RunRepo};

// ---------------------------------------------------------------------------
// Locks
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn lock_is_exclusive_while_live(pool: PgPool) {
    let us = Uuid::new_v4();
    let them = Uuid::new_v4();

    assert!(LockRepo::acquire(&pool, GENERATION_LOCK, us, Duration::minutes(30))
        .await
        .unwrap());
    assert!(!LockRepo::acquire(&pool, GENERATION_LOCK, them, Duration::minutes(30))
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn lock_reacquire_by_holder_refreshes(pool: PgPool) {
    let us = Uuid::new_v4();
    assert!(LockRepo::acquire(&pool, GENERATION_LOCK, us, Duration::minutes(30))
        .await
        .unwrap());
    assert!(LockRepo::acquire(&pool, GENERATION_LOCK, us, Duration::minutes(30))
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn expired_lock_can_be_taken_over(pool: PgPool) {
    let crashed = Uuid::new_v4();
    let us = Uuid::new_v4();

    // A holder whose TTL already lapsed (negative TTL backdates expiry).
    assert!(LockRepo::acquire(&pool, GENERATION_LOCK, crashed, Duration::seconds(-1))
        .await
        .unwrap());
    assert!(LockRepo::acquire(&pool, GENERATION_LOCK, us, Duration::minutes(30))
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn release_frees_the_lock_for_others(pool: PgPool) {
    let us = Uuid::new_v4();
    let them = Uuid::new_v4();

    LockRepo::acquire(&pool, GENERATION_LOCK, us, Duration::minutes(30))
        .await
        .unwrap();
    LockRepo::release(&pool, GENERATION_LOCK, us).await.unwrap();
    assert!(LockRepo::acquire(&pool, GENERATION_LOCK, them, Duration::minutes(30))
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stale_holder_cannot_release_a_taken_over_lock(pool: PgPool) {
    let crashed = Uuid::new_v4();
    let us = Uuid::new_v4();

    LockRepo::acquire(&pool, GENERATION_LOCK, crashed, Duration::seconds(-1))
        .await
        .unwrap();
    LockRepo::acquire(&pool, GENERATION_LOCK, us, Duration::minutes(30))
        .await
        .unwrap();

    // The crashed holder coming back must not free our lock.
    LockRepo::release(&pool, GENERATION_LOCK, crashed).await.unwrap();
    let them = Uuid::new_v4();
    assert!(!LockRepo::acquire(&pool, GENERATION_LOCK, them, Duration::minutes(30))
        .await
        .unwrap());
}

// ---------------------------------------------------------------------------
// Armed runs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn mark_fired_wins_exactly_once(pool: PgPool) {
    let trigger = Utc::now() - Duration::minutes(2);
    RunRepo::arm(&pool, trigger).await.unwrap();

    let (a, b) = tokio::join!(
        RunRepo::mark_fired(&pool, trigger),
        RunRepo::mark_fired(&pool, trigger),
    );
    assert!(a.unwrap() != b.unwrap(), "exactly one marker must win");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn latest_unfired_skips_fired_and_future_triggers(pool: PgPool) {
    let now = Utc::now();
    let past_fired = now - Duration::minutes(10);
    let past_unfired = now - Duration::minutes(3);
    let future = now + Duration::minutes(30);

    for t in [past_fired, past_unfired, future] {
        RunRepo::arm(&pool, t).await.unwrap();
    }
    assert!(RunRepo::mark_fired(&pool, past_fired).await.unwrap());

    let found = RunRepo::latest_unfired(&pool, now).await.unwrap().unwrap();
    // timestamptz carries microseconds; compare within that precision.
    assert!((found.scheduled_for - past_unfired).abs() < Duration::milliseconds(1));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn arming_twice_is_a_noop(pool: PgPool) {
    let trigger = Utc::now() + Duration::hours(1);
    RunRepo::arm(&pool, trigger).await.unwrap();
    RunRepo::arm(&pool, trigger).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scheduled_runs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

// ---------------------------------------------------------------------------
// Cost ledger
// ---------------------------------------------------------------------------

fn entry(topic: &str, outcome: LedgerOutcome, cost: f64) -> CreateLedgerEntry {
    CreateLedgerEntry {
        job_token: Uuid::new_v4(),
        topic: topic.to_string(),
        model: "gpt-4o-mini".to_string(),
        prompt_tokens: 1_200,
        completion_tokens: 900,
        text_cost_usd: cost,
        image_cost_usd: 0.0,
        outcome_id: outcome.id(),
        content_ref: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ledger_aggregates_cost_and_counts(pool: PgPool) {
    LedgerRepo::append(&pool, &entry("one", LedgerOutcome::Completed, 0.02))
        .await
        .unwrap();
    LedgerRepo::append(&pool, &entry("two", LedgerOutcome::Completed, 0.03))
        .await
        .unwrap();
    LedgerRepo::append(&pool, &entry("three", LedgerOutcome::Failed, 0.01))
        .await
        .unwrap();

    let month_start = Utc::now() - Duration::hours(1);
    let cost = LedgerRepo::cost_since(&pool, month_start).await.unwrap();
    assert!((cost - 0.06).abs() < 1e-9);

    let completed = LedgerRepo::completed_count_since(&pool, month_start)
        .await
        .unwrap();
    assert_eq!(completed, 2);

    let stats = LedgerRepo::stats(&pool).await.unwrap();
    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.total_prompt_tokens, 3_600);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cost_since_excludes_older_entries(pool: PgPool) {
    LedgerRepo::append(&pool, &entry("old", LedgerOutcome::Completed, 5.0))
        .await
        .unwrap();
    sqlx::query("UPDATE cost_ledger SET created_at = NOW() - INTERVAL '40 days'")
        .execute(&pool)
        .await
        .unwrap();
    LedgerRepo::append(&pool, &entry("new", LedgerOutcome::Completed, 0.25))
        .await
        .unwrap();

    let month_start = Utc::now() - Duration::days(30);
    let cost = LedgerRepo::cost_since(&pool, month_start).await.unwrap();
    assert!((cost - 0.25).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Job-state TTL store
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn job_state_round_trips_and_refreshes(pool: PgPool) {
    let token = Uuid::new_v4();
    let payload = serde_json::json!({"status": "pending", "topic": "bees"});

    JobRecordRepo::put(&pool, token, &payload, Duration::hours(1))
        .await
        .unwrap();
    let record = JobRecordRepo::get(&pool, token).await.unwrap().unwrap();
    assert_eq!(record.payload, payload);

    let updated = serde_json::json!({"status": "processing", "topic": "bees"});
    JobRecordRepo::put(&pool, token, &updated, Duration::hours(1))
        .await
        .unwrap();
    let record = JobRecordRepo::get(&pool, token).await.unwrap().unwrap();
    assert_eq!(record.payload, updated);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn expired_job_state_reads_as_absent(pool: PgPool) {
    let token = Uuid::new_v4();
    JobRecordRepo::put(&pool, token, &serde_json::json!({}), Duration::seconds(-1))
        .await
        .unwrap();
    assert!(JobRecordRepo::get(&pool, token).await.unwrap().is_none());

    let purged = JobRecordRepo::purge_expired(&pool).await.unwrap();
    assert_eq!(purged, 1);
}
