//! Sliding-window rate limiter for aggregate redraws (spec §4.6).
//!
//! No direct teacher analogue; grounded directly in spec.md's two named
//! strategies. The aggregator (§4.8) uses [`Throttler::try_pass`] with
//! defaults `limit=3, window=60ms` to suppress runaway redraws.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// A sliding window over a queue of pass timestamps.
#[derive(Debug, Clone)]
pub struct Throttler {
    limit: usize,
    window: Duration,
    timestamps: VecDeque<Instant>,
}

impl Throttler {
    /// A throttler allowing at most `limit` passes in any `window`-sized
    /// sliding interval.
    pub fn new(limit: usize, window: Duration) -> Self {
        Self { limit, window, timestamps: VecDeque::new() }
    }

    /// The aggregator's default: `limit=3, window=60ms`.
    pub fn default_aggregate() -> Self {
        Self::new(3, Duration::from_millis(60))
    }

    fn expire(&mut self, now: Instant) {
        while let Some(&front) = self.timestamps.front() {
            if now.saturating_duration_since(front) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Try-or-drop: expire stale entries, then allow iff fewer than
    /// `limit` remain in the window, pushing `now` on success.
    pub fn try_pass(&mut self, now: Instant) -> bool {
        self.expire(now);
        if self.timestamps.len() < self.limit {
            self.timestamps.push_back(now);
            true
        } else {
            false
        }
    }

    /// Wait-patient: the `Duration` a caller would need to sleep before a
    /// pass is guaranteed to succeed, or `None` if one would succeed right
    /// now. Callers drive the actual sleep themselves (this type performs
    /// no I/O) and then call [`try_pass`](Self::try_pass).
    pub fn wait_until(&mut self, now: Instant) -> Option<Duration> {
        self.expire(now);
        if self.timestamps.len() < self.limit {
            return None;
        }
        let oldest = *self.timestamps.front().expect("len >= limit > 0 implies non-empty");
        let exits_at = oldest + self.window;
        Some(exits_at.saturating_duration_since(now))
    }

    /// Number of passes currently counted within the window.
    pub fn count(&self) -> usize {
        self.timestamps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttler_scenario_from_spec() {
        let start = Instant::now();
        let mut t = Throttler::new(2, Duration::from_millis(100));
        let at = |ms: u64| start + Duration::from_millis(ms);
        assert!(t.try_pass(at(0)));
        assert!(t.try_pass(at(10)));
        assert!(!t.try_pass(at(20)));
        assert!(!t.try_pass(at(90)));
        assert!(t.try_pass(at(110))); // first entry (t=0) has expired by t=110
    }

    #[test]
    fn never_exceeds_limit_within_any_window() {
        let start = Instant::now();
        let mut t = Throttler::new(3, Duration::from_millis(50));
        let mut passes_in_any_50ms: Vec<Instant> = Vec::new();
        for ms in (0..500).step_by(5) {
            let now = start + Duration::from_millis(ms);
            if t.try_pass(now) {
                passes_in_any_50ms.push(now);
            }
            // Check invariant: no 50ms window holds more than `limit` passes.
            let window_start = now.saturating_duration_since(start).as_millis().saturating_sub(50);
            let in_window = passes_in_any_50ms
                .iter()
                .filter(|p| p.saturating_duration_since(start).as_millis() >= window_start)
                .count();
            assert!(in_window <= 3);
        }
    }

    #[test]
    fn wait_until_returns_none_when_under_limit() {
        let start = Instant::now();
        let mut t = Throttler::new(2, Duration::from_millis(100));
        assert_eq!(t.wait_until(start), None);
    }

    #[test]
    fn wait_until_returns_remaining_time_when_at_limit() {
        let start = Instant::now();
        let mut t = Throttler::new(1, Duration::from_millis(100));
        assert!(t.try_pass(start));
        let wait = t.wait_until(start + Duration::from_millis(30));
        assert_eq!(wait, Some(Duration::from_millis(70)));
    }
}
