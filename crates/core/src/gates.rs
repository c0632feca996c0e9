//! Eligibility gates for scheduled generation.
//!
//! The scheduler snapshots everything the gates need into a
//! [`GateContext`] and evaluates it here, purely. Gates run in a fixed
//! order and short-circuit on the first refusal; the scheduler logs the
//! refusal reason and stops — nothing is surfaced to a human.

use chrono::{DateTime, Duration, FixedOffset, Utc};

use crate::schedule::{within_schedule_window, Frequency, TimeOfDay};

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything the gate chain consumes, captured at one instant.
#[derive(Debug, Clone)]
pub struct GateContext {
    pub now: DateTime<Utc>,
    /// Master switch for scheduled generation.
    pub enabled: bool,
    /// When settings last changed, if ever.
    pub settings_changed_at: Option<DateTime<Utc>>,
    /// Quiet period after a settings change.
    pub cooldown: Duration,
    /// Provider credentials have been verified this run.
    pub credentials_ok: bool,
    /// Posts published so far today (site-local day).
    pub posts_today: i64,
    /// Daily post cap; zero or negative means uncapped.
    pub daily_cap: i64,
    /// Spend so far this calendar month, USD.
    pub monthly_cost: f64,
    /// Monthly budget, USD; zero or negative means unlimited.
    pub monthly_budget: f64,
    pub frequency: Frequency,
    pub time_of_day: TimeOfDay,
    pub utc_offset: FixedOffset,
    /// Half-width of the schedule-time tolerance window.
    pub tolerance: Duration,
}

/// Why a scheduled run was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    CoolingDown,
    CredentialsUnverified,
    DailyCapReached,
    BudgetExceeded,
    OutsideWindow,
}

impl SkipReason {
    /// Stable label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::CoolingDown => "cooling_down",
            Self::CredentialsUnverified => "credentials_unverified",
            Self::DailyCapReached => "daily_cap_reached",
            Self::BudgetExceeded => "budget_exceeded",
            Self::OutsideWindow => "outside_window",
        }
    }
}

// ---------------------------------------------------------------------------
// Individual gates
// ---------------------------------------------------------------------------

/// Budget gate: `false` iff a positive limit has been met or exceeded.
pub fn within_budget(monthly_cost: f64, monthly_budget: f64) -> bool {
    if monthly_budget <= 0.0 {
        return true;
    }
    monthly_cost < monthly_budget
}

/// Daily-cap gate: `false` iff a positive cap has been reached.
pub fn under_daily_cap(posts_today: i64, daily_cap: i64) -> bool {
    if daily_cap <= 0 {
        return true;
    }
    posts_today < daily_cap
}

/// Whether the post-settings-change cooldown is still active.
fn cooling_down(ctx: &GateContext) -> bool {
    match ctx.settings_changed_at {
        Some(changed_at) => ctx.now - changed_at < ctx.cooldown,
        None => false,
    }
}

// ---------------------------------------------------------------------------
// The chain
// ---------------------------------------------------------------------------

/// Evaluate the full gate chain in order. Returns the first refusal, or
/// `None` when the run may proceed.
///
/// The cooldown gate is overridden when the current time is within the
/// schedule-time tolerance window: a settings tweak minutes before the
/// configured run time should not silently eat that run.
pub fn evaluate(ctx: &GateContext) -> Option<SkipReason> {
    let in_window = within_schedule_window(
        ctx.frequency,
        ctx.time_of_day,
        ctx.now,
        ctx.utc_offset,
        ctx.tolerance,
    );

    if !ctx.enabled {
        return Some(SkipReason::Disabled);
    }
    if cooling_down(ctx) && !in_window {
        return Some(SkipReason::CoolingDown);
    }
    if !ctx.credentials_ok {
        return Some(SkipReason::CredentialsUnverified);
    }
    if !under_daily_cap(ctx.posts_today, ctx.daily_cap) {
        return Some(SkipReason::DailyCapReached);
    }
    if !within_budget(ctx.monthly_cost, ctx.monthly_budget) {
        return Some(SkipReason::BudgetExceeded);
    }
    if !in_window {
        return Some(SkipReason::OutsideWindow);
    }
    None
}
