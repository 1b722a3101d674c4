//! A looping sequence of frames advanced by wall-clock time (spec §3
//! "Animation").

use std::time::{Duration, Instant};

use crate::drawtypes::label::Label;

/// An ordered list of frames plus the interval between advances.
#[derive(Debug, Clone)]
pub struct Animation {
    frames: Vec<Label>,
    interval: Duration,
    current: usize,
    last: Instant,
}

impl Animation {
    /// Build an animation starting at frame 0, with `now` as the initial
    /// "last advanced" timestamp.
    pub fn new(frames: Vec<Label>, interval: Duration, now: Instant) -> Self {
        Self { frames, interval, current: 0, last: now }
    }

    /// Advance `current` by however many whole `interval`s have elapsed
    /// since the last call, wrapping modulo the frame count, and return the
    /// resulting frame.
    pub fn get(&mut self, now: Instant) -> Option<&Label> {
        if self.frames.is_empty() {
            return None;
        }
        if self.interval.is_zero() {
            return self.frames.get(self.current);
        }
        let elapsed = now.saturating_duration_since(self.last);
        let steps = (elapsed.as_nanos() / self.interval.as_nanos().max(1)) as usize;
        if steps > 0 {
            self.current = (self.current + steps) % self.frames.len();
            self.last = now;
        }
        self.frames.get(self.current)
    }

    /// Current frame index without advancing.
    pub fn current_index(&self) -> usize {
        self.current
    }
}
