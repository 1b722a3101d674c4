//! The module base contract and its runtime skeletons (spec §4.7), plus the
//! fourteen concrete modules that specialize them (spec §4.13, component
//! table C13).
//!
//! Grounded in the teacher's `hub/workers.rs` (`PollingWorker`: channel +
//! `Arc<AtomicBool>` shutdown + dedicated task) generalized from one
//! hardcoded worker shape to the five runtime shapes spec.md names, and
//! `file_watcher.rs` for the inotify-watch skeleton specifically.

pub mod runtime;

pub mod audio;
pub mod backlight;
pub mod cpu;
pub mod fs;
pub mod ipc_hook;
pub mod memory;
pub mod menu;
pub mod music;
pub mod network;
pub mod script;
pub mod text;
pub mod time;
pub mod xkeyboard;
pub mod xworkspaces;

use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use crate::action::router::{ActionHandler, ActionRouter, RouterError};

/// A module's lifecycle state (spec §3 "Module").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleState {
    /// Not yet started, or cleanly stopped.
    Stopped,
    /// Worker running normally.
    Running,
    /// Worker hit an unrecoverable error; excluded from further composites
    /// (spec §4.7 "Error policy").
    Error(String),
}

/// Decoupled update/stop signaling between a module's worker and the
/// aggregator (spec §9: "cut cyclic references... modules never call back
/// into the aggregator except through that callback").
#[derive(Clone)]
pub struct UpdateSink {
    name: String,
    tx: tokio::sync::mpsc::UnboundedSender<String>,
}

impl UpdateSink {
    /// Wrap a channel sender with the module name that will be attached to
    /// every signal sent through it.
    pub fn new(name: impl Into<String>, tx: tokio::sync::mpsc::UnboundedSender<String>) -> Self {
        Self { name: name.into(), tx }
    }

    /// Notify the aggregator this module's contents changed.
    pub fn broadcast(&self) {
        let _ = self.tx.send(self.name.clone());
    }
}

/// A running (or stopped) module owned by the aggregator (spec §3
/// "Module", §4.7).
pub struct Module {
    /// Identifier used by action addressing (`#<name>.<action>[.<data>]`).
    pub name: String,
    state: AsyncMutex<ModuleState>,
    /// The cached composite string the aggregator reads every compose
    /// pass. Protected by the aggregator's compose mutex per spec §5; this
    /// inner `Mutex` *is* that protection for this module's slice of state.
    cache: AsyncMutex<String>,
    /// Per-module action handlers (spec §4.4). Registered once during
    /// construction, then read on every `input` call.
    router: std::sync::Mutex<ActionRouter>,
    cancel: CancellationToken,
    handle: AsyncMutex<Option<tokio::task::JoinHandle<()>>>,
    /// Wired by the aggregator before `start()`; `set_contents` broadcasts
    /// through it so the aggregator recomposes on change rather than
    /// blind-polling (spec §4.7 "on_update... injected by the aggregator").
    update_sink: std::sync::Mutex<Option<UpdateSink>>,
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Module {
    /// Construct a stopped module with an empty cache and no registered
    /// actions yet (callers register actions on `router` before `start`).
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            state: AsyncMutex::new(ModuleState::Stopped),
            cache: AsyncMutex::new(String::new()),
            router: std::sync::Mutex::new(ActionRouter::new()),
            cancel: CancellationToken::new(),
            handle: AsyncMutex::new(None),
            update_sink: std::sync::Mutex::new(None),
        })
    }

    /// Wire the channel the aggregator listens on for `on_update` signals.
    /// Call before `start()`; a module started without one simply never
    /// broadcasts (callers relying on periodic recompose still see it next
    /// poll).
    pub fn set_update_sink(&self, sink: UpdateSink) {
        *self.update_sink.lock().expect("update_sink mutex poisoned") = Some(sink);
    }

    /// The cached composite string, read by the aggregator on every
    /// compose pass.
    pub async fn contents(&self) -> String {
        self.cache.lock().await.clone()
    }

    /// Replace the cached contents (called from a module's worker task) and
    /// broadcast the change, if an [`UpdateSink`] has been wired.
    pub async fn set_contents(&self, value: String) {
        *self.cache.lock().await = value;
        let sink = self.update_sink.lock().expect("update_sink mutex poisoned").clone();
        if let Some(sink) = sink {
            sink.broadcast();
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ModuleState {
        self.state.lock().await.clone()
    }

    /// Transition to `Running`.
    pub async fn mark_running(&self) {
        *self.state.lock().await = ModuleState::Running;
    }

    /// Transition to `Error` and stop signaling broadcasts (spec §4.7:
    /// "the aggregator excludes the module from further composites").
    pub async fn mark_error(&self, msg: impl Into<String>) {
        let msg = msg.into();
        log::error!("module '{}' entered error state: {}", self.name, msg);
        *self.state.lock().await = ModuleState::Error(msg);
    }

    /// Whether the aggregator should include this module's contents in the
    /// current composite.
    pub async fn is_active(&self) -> bool {
        matches!(*self.state.lock().await, ModuleState::Running)
    }

    /// A token whose cancellation a worker observes at every
    /// suspend/resume boundary (spec §5).
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Store the worker's task handle so `stop` can await or abort it.
    pub async fn set_handle(&self, handle: tokio::task::JoinHandle<()>) {
        *self.handle.lock().await = Some(handle);
    }

    /// Signal the worker to stop, then wait up to 3s before force-aborting
    /// it (spec §5: "Workers must observe the flag... and exit within 3s;
    /// the aggregator's destructor force-terminates if the deadline
    /// elapses").
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            match tokio::time::timeout(std::time::Duration::from_secs(3), handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => log::warn!("module '{}' worker task panicked: {err}", self.name),
                Err(_) => {
                    log::warn!("module '{}' worker did not exit within 3s; abandoning", self.name);
                }
            }
        }
        *self.state.lock().await = ModuleState::Stopped;
    }

    /// Register an action handler. Intended for use while building the
    /// module, before its worker is spawned.
    pub fn register_action(&self, name: impl Into<String>, handler: ActionHandler) -> Result<(), RouterError> {
        self.router.lock().expect("router mutex poisoned").register(name, handler)
    }

    /// Invoke the action named `action` with `data`, as routed by the
    /// aggregator from a click or IPC message (spec §4.7 `input`).
    pub fn input(&self, action: &str, data: &str) -> Result<(), RouterError> {
        self.router.lock().expect("router mutex poisoned").invoke(action, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_module_starts_stopped_with_empty_cache() {
        let module = Module::new("time");
        assert_eq!(module.state().await, ModuleState::Stopped);
        assert_eq!(module.contents().await, "");
        assert!(!module.is_active().await);
    }

    #[tokio::test]
    async fn mark_running_then_mark_error_excludes_from_composite() {
        let module = Module::new("net");
        module.mark_running().await;
        assert!(module.is_active().await);
        module.mark_error("adapter gone").await;
        assert!(!module.is_active().await);
        assert_eq!(module.state().await, ModuleState::Error("adapter gone".to_string()));
    }

    #[tokio::test]
    async fn set_contents_is_read_back_by_contents() {
        let module = Module::new("text");
        module.set_contents("hello".to_string()).await;
        assert_eq!(module.contents().await, "hello");
    }

    #[tokio::test]
    async fn stop_without_a_handle_just_transitions_state() {
        let module = Module::new("static");
        module.mark_running().await;
        module.stop().await;
        assert_eq!(module.state().await, ModuleState::Stopped);
        assert!(module.cancellation().is_cancelled());
    }
}
