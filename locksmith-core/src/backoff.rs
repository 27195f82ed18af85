//! Capped exponential backoff.

use std::time::Duration;

/// Delay before the first retry of a fresh coordination attempt.
pub const INITIAL_INTERVAL: Duration = Duration::from_secs(5);

/// Ceiling for any retry delay.
pub const MAX_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Doubling retry policy with a ceiling and no jitter.
///
/// The policy itself is stateless: every retry loop keeps its own running
/// interval, starting from [`Backoff::initial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
}

impl Backoff {
    pub const fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    pub fn initial(&self) -> Duration {
        self.initial
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// `min(interval * 2, max)`.
    pub fn next(&self, interval: Duration) -> Duration {
        interval.saturating_mul(2).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_INTERVAL, MAX_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_ceiling() {
        let backoff = Backoff::default();
        let mut interval = backoff.initial();
        let mut seen = Vec::new();
        for _ in 0..8 {
            interval = backoff.next(interval);
            seen.push(interval.as_secs());
        }
        assert_eq!(seen, vec![10, 20, 40, 80, 160, 300, 300, 300]);
    }

    #[test]
    fn ceiling_is_idempotent() {
        let backoff = Backoff::default();
        assert_eq!(backoff.next(MAX_INTERVAL), MAX_INTERVAL);
        assert_eq!(backoff.next(MAX_INTERVAL * 3), MAX_INTERVAL);
    }

    #[test]
    fn below_ceiling_is_exact_double() {
        let backoff = Backoff::new(Duration::from_millis(1), Duration::from_secs(1));
        for ms in [1u64, 7, 250, 499, 500] {
            assert_eq!(
                backoff.next(Duration::from_millis(ms)),
                Duration::from_millis(ms * 2)
            );
        }
        assert_eq!(backoff.next(Duration::from_millis(501)), Duration::from_secs(1));
    }

    #[test]
    fn huge_interval_does_not_overflow() {
        let backoff = Backoff::default();
        assert_eq!(backoff.next(Duration::MAX), MAX_INTERVAL);
    }
}
