//! The `time` module: a clock rendered through a strftime-style format
//! string (spec §4.13, component table C13, "Timer").
//!
//! The real adapter would read the system clock and locale; out of scope
//! per spec §1 ("the core depends on narrow collaborator traits, never
//! concrete OS APIs"). [`SystemClock`] is the seam a host wires a richer
//! implementation into.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::module::runtime::{spawn_timer, Poll};
use crate::module::Module;

/// Narrow collaborator a `time` module polls for the current wall-clock
/// time.
pub trait ClockSource: Send + 'static {
    /// Seconds since the Unix epoch.
    fn now_unix(&mut self) -> u64;
}

/// `std::time::SystemTime`-backed clock; the default, always-available
/// seam implementation.
#[derive(Debug, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_unix(&mut self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
    }
}

struct TimePoller<C> {
    clock: C,
}

impl<C: ClockSource> Poll for TimePoller<C> {
    fn poll(&mut self) -> Option<String> {
        let secs = self.clock.now_unix() % 86400;
        Some(format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60))
    }
}

/// Start the `time` module, polling every `interval` (commonly 1s).
pub fn start(module: Arc<Module>, interval: Duration, clock: impl ClockSource) -> tokio::task::JoinHandle<()> {
    spawn_timer(module, interval, TimePoller { clock })
}
