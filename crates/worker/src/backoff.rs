//! Exponential backoff schedule for retries.

use std::time::Duration;

/// Delay before the retry following the given (post-increment) attempt count:
/// `base_ms * 2^attempt`, with negative attempts clamped to zero.
///
/// With `base_ms = 500` the schedule of successive retries is 1s, 2s, 4s, 8s.
pub fn backoff_delay(attempt: i32, base_ms: u64) -> Duration {
    let exp = attempt.max(0) as u32;
    let multiplier = 1u64.checked_shl(exp).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_per_attempt_for_every_base() {
        for base_ms in [100u64, 500, 1000] {
            for attempt in 0..=8 {
                assert_eq!(
                    backoff_delay(attempt, base_ms),
                    Duration::from_millis(base_ms * (1 << attempt as u32)),
                    "attempt {attempt}, base {base_ms}"
                );
            }
        }
    }

    #[test]
    fn negative_attempts_clamp_to_base() {
        assert_eq!(backoff_delay(-1, 500), Duration::from_millis(500));
        assert_eq!(backoff_delay(-100, 100), Duration::from_millis(100));
    }

    #[test]
    fn post_increment_schedule_starts_at_twice_base() {
        // The first retry follows attempt 1 (the failure already counted).
        assert_eq!(backoff_delay(1, 500), Duration::from_millis(1000));
        assert_eq!(backoff_delay(2, 500), Duration::from_millis(2000));
        assert_eq!(backoff_delay(3, 500), Duration::from_millis(4000));
    }

    #[test]
    fn huge_attempt_counts_saturate_instead_of_overflowing() {
        let d = backoff_delay(i32::MAX, 1000);
        assert!(d >= backoff_delay(62, 1000));
    }
}
