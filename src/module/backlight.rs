//! The `backlight` module: brightness percentage over a sysfs-style path
//! (spec §4.13, C13, "Inotify/udev-watch").
//!
//! Grounded directly in the teacher's `file_watcher.rs`: a
//! `notify::RecommendedWatcher` wrapped in a channel-backed, non-blocking
//! `poll`. Here the watched path is a sysfs brightness node rather than an
//! arbitrary directory, and a successful poll re-reads [`BrightnessSource`]
//! (the seam a real sysfs reader implements) instead of classifying
//! generic file events.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::module::runtime::spawn_watch;
use crate::module::Module;

/// Narrow collaborator: reads the current brightness, as a real
/// sysfs-backed adapter would (`brightness` / `max_brightness` siblings).
pub trait BrightnessSource: Send + 'static {
    /// Current brightness in `0..=100`, or `None` if unreadable.
    fn read(&mut self) -> Option<u32>;
}

/// Watches a sysfs-style brightness path for changes, draining events
/// non-blocking exactly like the teacher's `FileWatcher::poll`.
pub struct BacklightWatch {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<Result<notify::Event, notify::Error>>,
}

impl BacklightWatch {
    /// Begin watching `path` (typically a `brightness` file under
    /// `/sys/class/backlight/<device>`).
    pub fn new(path: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .context("failed to create backlight watcher")?;
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch: {}", path.display()))?;
        Ok(Self { _watcher: watcher, rx })
    }

    /// Whether any filesystem events have arrived since the last poll
    /// (non-blocking).
    fn has_pending(&self) -> bool {
        let mut any = false;
        while let Ok(result) = self.rx.try_recv() {
            if result.is_ok() {
                any = true;
            }
        }
        any
    }
}

/// Start the `backlight` module. `idle` bounds how long the worker sleeps
/// between polls when nothing has changed.
pub fn start(module: Arc<Module>, path: PathBuf, idle: Duration, source: impl BrightnessSource) -> Result<tokio::task::JoinHandle<()>> {
    let watch = BacklightWatch::new(&path)?;
    let mut source = source;
    Ok(spawn_watch(module, idle, watch, move |watch| {
        if watch.has_pending() {
            source.read().map(|pct| format!("{}%", pct.min(100)))
        } else {
            None
        }
    }))
}
