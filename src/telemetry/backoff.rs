//! Per-source retry backoff for repeated network failures.

use std::time::Duration;
use tokio::time::Instant;

/// Largest doubling exponent applied to the base interval.
const MAX_EXPONENT: u32 = 16;

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
    next_attempt: Option<Instant>,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            failures: 0,
            next_attempt: None,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Whether a fetch may be dispatched at `now`.
    pub fn ready(&self, now: Instant) -> bool {
        self.next_attempt.is_none_or(|at| now >= at)
    }

    /// Record a failed fetch that was dispatched at `dispatched_at`.
    ///
    /// The first failure leaves the schedule alone; from the second on, the
    /// wait doubles per failure, capped at `max`.
    pub fn record_failure(&mut self, dispatched_at: Instant) {
        self.failures = self.failures.saturating_add(1);
        if self.failures < 2 {
            self.next_attempt = None;
            return;
        }
        let exponent = (self.failures - 1).min(MAX_EXPONENT);
        let delay = self
            .base
            .checked_mul(1 << exponent)
            .unwrap_or(self.max)
            .min(self.max);
        // Unrepresentable deadlines fall back to the next tick.
        self.next_attempt = dispatched_at.checked_add(delay);
    }

    pub fn reset(&mut self) {
        self.failures = 0;
        self.next_attempt = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_failure_keeps_next_tick() {
        let start = Instant::now();
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(30));
        backoff.record_failure(start);
        assert!(backoff.ready(start + Duration::from_secs(1)));
    }

    #[test]
    fn repeated_failures_double_until_cap() {
        let start = Instant::now();
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(5));
        backoff.record_failure(start);
        backoff.record_failure(start);
        assert!(!backoff.ready(start + Duration::from_secs(1)));
        assert!(backoff.ready(start + Duration::from_secs(2)));

        backoff.record_failure(start);
        assert!(!backoff.ready(start + Duration::from_secs(3)));
        assert!(backoff.ready(start + Duration::from_secs(4)));

        for _ in 0..40 {
            backoff.record_failure(start);
        }
        assert!(backoff.ready(start + Duration::from_secs(5)));
        assert_eq!(backoff.failures(), 43);
    }

    #[test]
    fn huge_delays_do_not_overflow() {
        let start = Instant::now();
        let mut backoff = Backoff::new(Duration::MAX, Duration::MAX);
        backoff.record_failure(start);
        backoff.record_failure(start);
        backoff.record_failure(start);
        assert_eq!(backoff.failures(), 3);
        assert!(backoff.ready(start + Duration::from_secs(1)));
    }

    #[test]
    fn reset_clears_schedule() {
        let start = Instant::now();
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(30));
        backoff.record_failure(start);
        backoff.record_failure(start);
        backoff.reset();
        assert!(backoff.ready(start));
        assert_eq!(backoff.failures(), 0);
    }
}
