//! The `memory` module: used memory percentage (spec §4.13, C13, "Timer").
//! `MemorySource` is the seam a `/proc/meminfo`-reading adapter plugs into;
//! out of scope per §1.

use std::sync::Arc;
use std::time::Duration;

use crate::module::runtime::{spawn_timer, Poll};
use crate::module::Module;

/// Total/available memory in bytes.
#[derive(Debug, Clone, Copy)]
pub struct MemoryUsage {
    /// Total installed memory.
    pub total: u64,
    /// Currently available (not necessarily free) memory.
    pub available: u64,
}

/// Narrow collaborator sampled once per tick for system memory usage.
pub trait MemorySource: Send + 'static {
    /// Sample memory usage, or `None` if unavailable this tick.
    fn sample(&mut self) -> Option<MemoryUsage>;
}

struct MemoryPoller<S> {
    source: S,
}

impl<S: MemorySource> Poll for MemoryPoller<S> {
    fn poll(&mut self) -> Option<String> {
        let usage = self.source.sample()?;
        let used_pct = if usage.total == 0 {
            0
        } else {
            ((usage.total - usage.available) * 100 / usage.total) as u32
        };
        Some(format!("{used_pct}%"))
    }
}

/// Start the `memory` module, polling every `interval`.
pub fn start(module: Arc<Module>, interval: Duration, source: impl MemorySource) -> tokio::task::JoinHandle<()> {
    spawn_timer(module, interval, MemoryPoller { source })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedUsage(MemoryUsage);
    impl MemorySource for FixedUsage {
        fn sample(&mut self) -> Option<MemoryUsage> {
            Some(self.0)
        }
    }

    #[test]
    fn renders_used_percentage() {
        let mut poller = MemoryPoller { source: FixedUsage(MemoryUsage { total: 8000, available: 2000 }) };
        assert_eq!(poller.poll(), Some("75%".to_string()));
    }
}
