//! Exponential backoff between retry attempts.
//!
//! Sleeps grow as `2^attempt` seconds, capped, and a provider-supplied
//! `Retry-After` hint overrides the computed delay (still capped — a
//! hostile or confused hint must not stall the pipeline for an hour).

use std::time::Duration;

use draftpress_core::constants::BACKOFF_CAP_SECS;

/// Delay to sleep after failed attempt number `attempt` (1-based).
pub fn retry_delay(attempt: u32, retry_after: Option<u64>) -> Duration {
    if let Some(hint) = retry_after {
        return Duration::from_secs(hint.min(BACKOFF_CAP_SECS));
    }
    let exp = 2u64.saturating_pow(attempt);
    Duration::from_secs(exp.min(BACKOFF_CAP_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_per_attempt() {
        assert_eq!(retry_delay(1, None), Duration::from_secs(2));
        assert_eq!(retry_delay(2, None), Duration::from_secs(4));
        assert_eq!(retry_delay(3, None), Duration::from_secs(8));
    }

    #[test]
    fn delay_clamps_at_cap() {
        assert_eq!(retry_delay(6, None), Duration::from_secs(BACKOFF_CAP_SECS));
        assert_eq!(retry_delay(30, None), Duration::from_secs(BACKOFF_CAP_SECS));
    }

    #[test]
    fn retry_after_hint_overrides_backoff() {
        assert_eq!(retry_delay(1, Some(17)), Duration::from_secs(17));
    }

    #[test]
    fn retry_after_hint_is_also_capped() {
        assert_eq!(
            retry_delay(1, Some(3_600)),
            Duration::from_secs(BACKOFF_CAP_SECS)
        );
    }
}
