//! Authoritative values for every operational tunable.
//!
//! Each constant here is the single source of truth; the config structs
//! in the client and scheduler crates default to these and may override
//! them per deployment. Nothing elsewhere in the workspace repeats one
//! of these values as a literal.

use chrono::Duration;

/// Maximum provider-call attempts per pipeline step (first try included).
pub const PROVIDER_MAX_ATTEMPTS: u32 = 3;

/// Upper bound on a single retry backoff sleep.
pub const BACKOFF_CAP_SECS: u64 = 60;

/// Maximum times a queue topic may be attempted before it is failed
/// permanently.
pub const MAX_TOPIC_ATTEMPTS: i32 = 3;

/// Age past which a `processing` queue row is presumed abandoned and
/// reclaimed by the next claimer.
pub fn claim_staleness() -> Duration {
    Duration::minutes(30)
}

/// Quiet period after a settings change during which scheduled runs are
/// skipped (overridden when the configured schedule time is imminent).
pub fn settings_cooldown() -> Duration {
    Duration::minutes(5)
}

/// Half-width of the window around the configured time-of-day inside
/// which a scheduled run is considered on time.
pub fn schedule_tolerance() -> Duration {
    Duration::minutes(10)
}

/// How far past a missed trigger the catch-up check will still fire it.
pub fn catchup_grace() -> Duration {
    Duration::minutes(5)
}

/// Expiry on the process-wide generation lock. Must exceed the
/// worst-case pipeline duration so a crash cannot wedge scheduling.
pub fn generation_lock_ttl() -> Duration {
    Duration::minutes(30)
}

/// Expiry on the short-lived lock serializing next-trigger computation.
pub fn next_run_lock_ttl() -> Duration {
    Duration::seconds(60)
}

/// Time-to-live on stored job state. An abandoned job disappears after
/// this much inactivity.
pub fn job_ttl() -> Duration {
    Duration::hours(1)
}
