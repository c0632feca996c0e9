//! Scheduler tunables.

use chrono::Duration;

use draftpress_core::constants;

/// Operational windows and lock TTLs. Defaults come from the
/// authoritative constants; deployments override per instance.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Age past which a claimed queue row is presumed abandoned.
    pub claim_staleness: Duration,
    /// Quiet period after a settings change.
    pub settings_cooldown: Duration,
    /// Half-width of the schedule-time tolerance window.
    pub schedule_tolerance: Duration,
    /// How far past a missed trigger catch-up will still fire it.
    pub catchup_grace: Duration,
    /// Expiry on the process-wide generation lock. Must exceed the
    /// worst-case pipeline duration.
    pub generation_lock_ttl: Duration,
    /// Expiry on the next-trigger computation lock.
    pub next_run_lock_ttl: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            claim_staleness: constants::claim_staleness(),
            settings_cooldown: constants::settings_cooldown(),
            schedule_tolerance: constants::schedule_tolerance(),
            catchup_grace: constants::catchup_grace(),
            generation_lock_ttl: constants::generation_lock_ttl(),
            next_run_lock_ttl: constants::next_run_lock_ttl(),
        }
    }
}
