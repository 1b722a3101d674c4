//! The five worker shapes spec.md §4.7 assigns to modules: `Static`,
//! `Timer`, `Event`, an inotify/udev-watch variant, and a subprocess-tail
//! variant with backoff.
//!
//! Grounded in the teacher's `hub/workers.rs` `PollingWorker` (a dedicated
//! worker, a shutdown signal, a channel back to the owner) generalized from
//! one hardcoded poll loop into five shapes, and `file_watcher.rs`'s
//! `FileWatcher`/`FileEventKind` for the watch variant. The teacher signals
//! shutdown with `Arc<AtomicBool>` polled by a `std::thread`; here each
//! worker is a `tokio::spawn`ed task and shutdown is a `CancellationToken`
//! (spec §5's "interruptible sleep" maps onto `tokio::select!` against it).

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::module::Module;

/// A future boxed for storage in a trait object, since event sources need
/// object safety but `async fn` in a trait is not object-safe on its own.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// A narrow collaborator a `Timer` module polls on each tick to produce its
/// next contents, or `None` to leave the cache unchanged (spec §1: "the
/// core depends on narrow collaborator traits, never concrete OS APIs").
pub trait Poll: Send + 'static {
    /// Compute the module's contents for this tick.
    fn poll(&mut self) -> Option<String>;
}

/// A narrow collaborator an `Event` module awaits: blocks (conceptually)
/// until the underlying source has something new, or the bounded wait
/// elapses.
pub trait EventSource: Send + 'static {
    /// Wait up to `timeout` for a state change, returning the new contents
    /// if one occurred.
    fn wait(&mut self, timeout: Duration) -> BoxFuture<'_, Option<String>>;
}

/// Run a `Static` module: compute contents once, publish, and exit (spec
/// §4.7 "Static: runs once").
pub fn spawn_static(module: Arc<Module>, compute: impl FnOnce() -> String + Send + 'static) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        module.mark_running().await;
        let contents = compute();
        module.set_contents(contents).await;
    })
}

/// Run a `Timer` module: poll every `interval`, publishing whenever
/// `poller` yields `Some`, until canceled (spec §4.7 "Timer: fixed-interval
/// poll").
pub fn spawn_timer(module: Arc<Module>, interval: Duration, mut poller: impl Poll) -> tokio::task::JoinHandle<()> {
    let cancel = module.cancellation();
    tokio::spawn(async move {
        module.mark_running().await;
        loop {
            if let Some(contents) = poller.poll() {
                module.set_contents(contents).await;
            }
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }
    })
}

/// Run an `Event` module: repeatedly await `source.wait(timeout)`, publishing
/// whenever it yields `Some`, until canceled (spec §4.7 "Event: blocks on an
/// external notification channel, with a bounded poll fallback").
pub fn spawn_event(module: Arc<Module>, poll_timeout: Duration, mut source: impl EventSource) -> tokio::task::JoinHandle<()> {
    let cancel = module.cancellation();
    tokio::spawn(async move {
        module.mark_running().await;
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                contents = source.wait(poll_timeout) => {
                    if let Some(contents) = contents {
                        module.set_contents(contents).await;
                    }
                }
            }
        }
    })
}

/// Run an inotify/udev-watch module: `notify`-driven, falling back to a
/// bounded idle sleep between non-blocking polls, matching the teacher's
/// `FileWatcher::poll` pump (spec §4.7 "Inotify/udev-watch").
pub fn spawn_watch<W>(module: Arc<Module>, idle: Duration, mut watcher: W, mut on_event: impl FnMut(&mut W) -> Option<String> + Send + 'static) -> tokio::task::JoinHandle<()>
where
    W: Send + 'static,
{
    let cancel = module.cancellation();
    tokio::spawn(async move {
        module.mark_running().await;
        loop {
            if let Some(contents) = on_event(&mut watcher) {
                module.set_contents(contents).await;
            }
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(idle) => {}
            }
        }
    })
}

/// Backoff schedule for a respawning subprocess-tail worker (spec §4.7
/// "Subprocess-tail: restarts the child with exponential backoff, capped").
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
}

impl Backoff {
    /// A backoff starting at `initial`, doubling on each consecutive
    /// failure, capped at `max`.
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    /// The delay before the `attempt`th respawn (0-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.initial.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX)).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30))
    }
}

/// Run a `Subprocess-tail` module: spawn `argv`, publish each stdout line,
/// and respawn with `backoff` on exit, until canceled.
pub fn spawn_subprocess_tail(
    module: Arc<Module>,
    argv: Vec<String>,
    backoff: Backoff,
) -> tokio::task::JoinHandle<()> {
    let cancel = module.cancellation();
    tokio::spawn(async move {
        module.mark_running().await;
        let mut attempt: u32 = 0;
        'outer: loop {
            if argv.is_empty() {
                module.mark_error("empty command line").await;
                return;
            }
            let mut cmd = Command::new(&argv[0]);
            cmd.args(&argv[1..]).stdout(std::process::Stdio::piped()).kill_on_drop(true);
            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(err) => {
                    log::warn!("module '{}' failed to spawn '{}': {err}", module.name, argv[0]);
                    attempt += 1;
                    tokio::select! {
                        () = cancel.cancelled() => break 'outer,
                        () = tokio::time::sleep(backoff.delay(attempt)) => continue 'outer,
                    }
                }
            };
            attempt = 0;
            let stdout = child.stdout.take();
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => {
                            let _ = child.start_kill();
                            break 'outer;
                        }
                        line = lines.next_line() => {
                            match line {
                                Ok(Some(line)) => module.set_contents(line).await,
                                Ok(None) => break,
                                Err(err) => {
                                    log::warn!("module '{}' stdout read error: {err}", module.name);
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            let _ = child.wait().await;
            attempt += 1;
            tokio::select! {
                () = cancel.cancelled() => break 'outer,
                () = tokio::time::sleep(backoff.delay(attempt)) => {}
            }
        }
    })
}

/// A path watched by an inotify/udev-watch module, used to construct the
/// concrete `notify` recommended watcher at module-start time.
#[derive(Debug, Clone)]
pub struct WatchTarget {
    /// Filesystem path to watch (a sysfs node for backlight, a device
    /// path for udev-backed modules).
    pub path: PathBuf,
}
