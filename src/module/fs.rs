//! The `fs` module: free/used disk space for a mount point (spec §4.13,
//! C13, "Timer").
//!
//! `DiskUsageSource` is the seam; a real adapter would `statvfs(2)` the
//! configured path. Stubbed here per §1's OS-adapter exclusion.

use std::sync::Arc;
use std::time::Duration;

use crate::module::runtime::{spawn_timer, Poll};
use crate::module::Module;

/// Bytes total/free for a mounted filesystem.
#[derive(Debug, Clone, Copy)]
pub struct DiskUsage {
    /// Total capacity in bytes.
    pub total: u64,
    /// Free bytes available.
    pub free: u64,
}

/// Narrow collaborator queried once per tick for a mount point's usage.
pub trait DiskUsageSource: Send + 'static {
    /// Sample disk usage, or `None` if the mount point is unreadable.
    fn sample(&mut self) -> Option<DiskUsage>;
}

struct FsPoller<S> {
    mount: String,
    source: S,
}

impl<S: DiskUsageSource> Poll for FsPoller<S> {
    fn poll(&mut self) -> Option<String> {
        let usage = self.source.sample()?;
        let used_pct = if usage.total == 0 {
            0
        } else {
            ((usage.total - usage.free) * 100 / usage.total) as u32
        };
        Some(format!("{} {}%", self.mount, used_pct))
    }
}

/// Start the `fs` module for `mount`, polling every `interval`.
pub fn start(module: Arc<Module>, mount: impl Into<String>, interval: Duration, source: impl DiskUsageSource) -> tokio::task::JoinHandle<()> {
    spawn_timer(module, interval, FsPoller { mount: mount.into(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedUsage(DiskUsage);
    impl DiskUsageSource for FixedUsage {
        fn sample(&mut self) -> Option<DiskUsage> {
            Some(self.0)
        }
    }

    #[test]
    fn renders_used_percentage() {
        let mut poller = FsPoller { mount: "/".to_string(), source: FixedUsage(DiskUsage { total: 100, free: 40 }) };
        assert_eq!(poller.poll(), Some("/ 60%".to_string()));
    }

    #[test]
    fn zero_total_reports_zero_percent_instead_of_dividing_by_zero() {
        let mut poller = FsPoller { mount: "/mnt".to_string(), source: FixedUsage(DiskUsage { total: 0, free: 0 }) };
        assert_eq!(poller.poll(), Some("/mnt 0%".to_string()));
    }
}
