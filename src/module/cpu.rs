//! The `cpu` module: aggregate CPU load percentage (spec §4.13, C13,
//! "Timer"). `CpuSource` is the seam a `/proc/stat`-reading adapter plugs
//! into; out of scope per §1.

use std::sync::Arc;
use std::time::Duration;

use crate::module::runtime::{spawn_timer, Poll};
use crate::module::Module;

/// Narrow collaborator sampled once per tick for overall CPU load.
pub trait CpuSource: Send + 'static {
    /// Load percentage in `0..=100`, or `None` if unavailable this tick.
    fn sample(&mut self) -> Option<u32>;
}

struct CpuPoller<S> {
    source: S,
}

impl<S: CpuSource> Poll for CpuPoller<S> {
    fn poll(&mut self) -> Option<String> {
        let pct = self.source.sample()?.min(100);
        Some(format!("{pct}%"))
    }
}

/// Start the `cpu` module, polling every `interval` (commonly 1s).
pub fn start(module: Arc<Module>, interval: Duration, source: impl CpuSource) -> tokio::task::JoinHandle<()> {
    spawn_timer(module, interval, CpuPoller { source })
}
