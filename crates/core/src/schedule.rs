//! Schedule math: trigger frequencies and next-run computation.
//!
//! Everything here is a pure function of (frequency, configured
//! time-of-day, current instant, site UTC offset). Wall-clock
//! arithmetic happens in the site offset; results come back as UTC.
//! A fixed offset is deliberate — the schedule needs wall-clock
//! arithmetic, not a tz database, and DST shifts move a trigger by at
//! most an hour once per transition.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDateTime, NaiveTime, Timelike, Utc,
};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Frequency
// ---------------------------------------------------------------------------

/// How often scheduled generation fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Hourly,
    Daily,
    TwiceDaily,
    Weekly,
}

impl Frequency {
    /// Stable storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::TwiceDaily => "twicedaily",
            Self::Weekly => "weekly",
        }
    }

    /// Parse a stored frequency name.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "twicedaily" => Ok(Self::TwiceDaily),
            "weekly" => Ok(Self::Weekly),
            other => Err(CoreError::Validation(format!(
                "Unknown schedule frequency '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Time of day
// ---------------------------------------------------------------------------

/// A configured wall-clock time, e.g. "09:00".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay(pub NaiveTime);

impl TimeOfDay {
    /// Parse an `HH:MM` string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        NaiveTime::parse_from_str(s, "%H:%M")
            .map(Self)
            .map_err(|_| CoreError::Validation(format!("Invalid time of day '{s}' (want HH:MM)")))
    }

    /// Minutes since local midnight.
    pub fn minutes(self) -> i64 {
        self.0.hour() as i64 * 60 + self.0.minute() as i64
    }
}

// ---------------------------------------------------------------------------
// Next-run computation
// ---------------------------------------------------------------------------

/// Compute the next trigger instant strictly after `now`.
pub fn next_run(
    frequency: Frequency,
    time_of_day: TimeOfDay,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> DateTime<Utc> {
    let local = now.with_timezone(&offset).naive_local();

    let next_local = match frequency {
        Frequency::Hourly => {
            let bumped = local + Duration::hours(1);
            bumped.date().and_time(NaiveTime::MIN) + Duration::hours(bumped.hour() as i64)
        }
        Frequency::Daily => {
            let today = local.date().and_time(time_of_day.0);
            if today > local {
                today
            } else {
                today + Duration::days(1)
            }
        }
        Frequency::TwiceDaily => {
            let first = local.date().and_time(time_of_day.0);
            let second = first + Duration::hours(12);
            if first > local {
                first
            } else if second > local {
                second
            } else {
                first + Duration::days(1)
            }
        }
        Frequency::Weekly => {
            // Triggers fire on Mondays at the configured time.
            let days_since_monday = local.weekday().num_days_from_monday() as i64;
            let monday = local.date() - Duration::days(days_since_monday);
            let this_week = monday.and_time(time_of_day.0);
            if this_week > local {
                this_week
            } else {
                this_week + Duration::weeks(1)
            }
        }
    };

    to_utc(next_local, offset)
}

/// Convert a site-local naive instant back to UTC.
fn to_utc(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(
        local - Duration::seconds(offset.local_minus_utc() as i64),
        Utc,
    )
}

// ---------------------------------------------------------------------------
// Tolerance windows
// ---------------------------------------------------------------------------

/// Circular distance in minutes between `now` (site-local) and the
/// configured time-of-day.
pub fn minutes_from_schedule(
    time_of_day: TimeOfDay,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> i64 {
    let local = now.with_timezone(&offset);
    let now_minutes = local.hour() as i64 * 60 + local.minute() as i64;
    let diff = (now_minutes - time_of_day.minutes()).abs();
    diff.min(24 * 60 - diff)
}

/// Whether `now` falls inside the tolerance window of the configured
/// schedule. Hourly schedules have no fixed time-of-day and always
/// pass; twice-daily checks both the configured time and its +12h
/// counterpart; weekly additionally requires a Monday.
pub fn within_schedule_window(
    frequency: Frequency,
    time_of_day: TimeOfDay,
    now: DateTime<Utc>,
    offset: FixedOffset,
    tolerance: Duration,
) -> bool {
    let tolerance_minutes = tolerance.num_minutes();
    match frequency {
        Frequency::Hourly => true,
        Frequency::Daily => minutes_from_schedule(time_of_day, now, offset) <= tolerance_minutes,
        Frequency::TwiceDaily => {
            let half_day = TimeOfDay(time_of_day.0 + Duration::hours(12));
            minutes_from_schedule(time_of_day, now, offset) <= tolerance_minutes
                || minutes_from_schedule(half_day, now, offset) <= tolerance_minutes
        }
        Frequency::Weekly => {
            now.with_timezone(&offset).weekday() == chrono::Weekday::Mon
                && minutes_from_schedule(time_of_day, now, offset) <= tolerance_minutes
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
            .unwrap()
            .and_utc()
    }

    fn no_offset() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn tod(s: &str) -> TimeOfDay {
        TimeOfDay::parse(s).unwrap()
    }

    // -----------------------------------------------------------------------
    // Daily
    // -----------------------------------------------------------------------

    #[test]
    fn daily_before_configured_time_fires_today() {
        let next = next_run(Frequency::Daily, tod("09:00"), utc("2026-03-04 08:00"), no_offset());
        assert_eq!(next, utc("2026-03-04 09:00"));
    }

    #[test]
    fn daily_after_configured_time_fires_tomorrow() {
        let next = next_run(Frequency::Daily, tod("09:00"), utc("2026-03-04 10:00"), no_offset());
        assert_eq!(next, utc("2026-03-05 09:00"));
    }

    #[test]
    fn daily_exactly_at_configured_time_rolls_over() {
        let next = next_run(Frequency::Daily, tod("09:00"), utc("2026-03-04 09:00"), no_offset());
        assert_eq!(next, utc("2026-03-05 09:00"));
    }

    // -----------------------------------------------------------------------
    // Twice daily
    // -----------------------------------------------------------------------

    #[test]
    fn twicedaily_between_slots_fires_second_slot() {
        let next =
            next_run(Frequency::TwiceDaily, tod("08:00"), utc("2026-03-04 09:00"), no_offset());
        assert_eq!(next, utc("2026-03-04 20:00"));
    }

    #[test]
    fn twicedaily_after_both_slots_fires_tomorrow_morning() {
        let next =
            next_run(Frequency::TwiceDaily, tod("08:00"), utc("2026-03-04 21:00"), no_offset());
        assert_eq!(next, utc("2026-03-05 08:00"));
    }

    #[test]
    fn twicedaily_before_first_slot_fires_first_slot() {
        let next =
            next_run(Frequency::TwiceDaily, tod("08:00"), utc("2026-03-04 06:30"), no_offset());
        assert_eq!(next, utc("2026-03-04 08:00"));
    }

    // -----------------------------------------------------------------------
    // Hourly
    // -----------------------------------------------------------------------

    #[test]
    fn hourly_rounds_down_to_top_of_next_hour() {
        let next = next_run(Frequency::Hourly, tod("00:00"), utc("2026-03-04 09:42"), no_offset());
        assert_eq!(next, utc("2026-03-04 10:00"));
    }

    #[test]
    fn hourly_crosses_midnight() {
        let next = next_run(Frequency::Hourly, tod("00:00"), utc("2026-03-04 23:10"), no_offset());
        assert_eq!(next, utc("2026-03-05 00:00"));
    }

    // -----------------------------------------------------------------------
    // Weekly
    // -----------------------------------------------------------------------

    #[test]
    fn weekly_fires_next_monday() {
        // 2026-03-04 is a Wednesday; next Monday is 2026-03-09.
        let next = next_run(Frequency::Weekly, tod("09:00"), utc("2026-03-04 12:00"), no_offset());
        assert_eq!(next, utc("2026-03-09 09:00"));
    }

    #[test]
    fn weekly_on_monday_before_time_fires_same_day() {
        // 2026-03-09 is a Monday.
        let next = next_run(Frequency::Weekly, tod("09:00"), utc("2026-03-09 07:00"), no_offset());
        assert_eq!(next, utc("2026-03-09 09:00"));
    }

    #[test]
    fn weekly_on_monday_after_time_rolls_a_week() {
        let next = next_run(Frequency::Weekly, tod("09:00"), utc("2026-03-09 09:30"), no_offset());
        assert_eq!(next, utc("2026-03-16 09:00"));
    }

    // -----------------------------------------------------------------------
    // Timezone offset
    // -----------------------------------------------------------------------

    #[test]
    fn daily_respects_site_offset() {
        // Site at UTC-5: 13:00 UTC is 08:00 local, so today's 09:00
        // local (14:00 UTC) is still ahead.
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let next = next_run(Frequency::Daily, tod("09:00"), utc("2026-03-04 13:00"), offset);
        assert_eq!(next, utc("2026-03-04 14:00"));
    }

    // -----------------------------------------------------------------------
    // Tolerance windows
    // -----------------------------------------------------------------------

    #[test]
    fn window_contains_configured_time() {
        assert!(within_schedule_window(
            Frequency::Daily,
            tod("09:00"),
            utc("2026-03-04 09:08"),
            no_offset(),
            Duration::minutes(10),
        ));
    }

    #[test]
    fn window_excludes_far_times() {
        assert!(!within_schedule_window(
            Frequency::Daily,
            tod("09:00"),
            utc("2026-03-04 11:00"),
            no_offset(),
            Duration::minutes(10),
        ));
    }

    #[test]
    fn window_wraps_around_midnight() {
        assert_eq!(
            minutes_from_schedule(tod("00:05"), utc("2026-03-04 23:55"), no_offset()),
            10
        );
    }

    #[test]
    fn twicedaily_window_covers_both_slots() {
        assert!(within_schedule_window(
            Frequency::TwiceDaily,
            tod("08:00"),
            utc("2026-03-04 20:05"),
            no_offset(),
            Duration::minutes(10),
        ));
    }

    #[test]
    fn hourly_always_within_window() {
        assert!(within_schedule_window(
            Frequency::Hourly,
            tod("00:00"),
            utc("2026-03-04 03:33"),
            no_offset(),
            Duration::minutes(10),
        ));
    }

    #[test]
    fn weekly_window_requires_monday() {
        // Wednesday at the right time is still outside the window.
        assert!(!within_schedule_window(
            Frequency::Weekly,
            tod("09:00"),
            utc("2026-03-04 09:00"),
            no_offset(),
            Duration::minutes(10),
        ));
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn frequency_names_round_trip() {
        for f in [
            Frequency::Hourly,
            Frequency::Daily,
            Frequency::TwiceDaily,
            Frequency::Weekly,
        ] {
            assert_eq!(Frequency::parse(f.as_str()).unwrap(), f);
        }
    }

    #[test]
    fn bad_time_of_day_rejected() {
        assert!(TimeOfDay::parse("25:99").is_err());
        assert!(TimeOfDay::parse("9am").is_err());
    }
}
