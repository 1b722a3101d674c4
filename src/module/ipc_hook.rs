//! The `ipc-hook` module: content driven entirely by `hook:` messages
//! routed in from the IPC dispatcher (spec §4.13, C13, "Event, driven by
//! the IPC dispatcher routing a `hook:` message to it").
//!
//! The dispatcher (`ipc::dispatcher::dispatch_legacy_line`) and the
//! socket-side `Action` request both resolve a `hook:` message to the same
//! `#module.hook.<data>` action addressing every other module uses, so this
//! module plugs into that existing path by registering `hook` as its one
//! action rather than exposing a side channel the dispatcher would need to
//! know about specially.

use std::sync::Arc;
use std::time::Duration;

use crate::action::router::ActionHandler;
use crate::module::runtime::{spawn_event, BoxFuture, EventSource};
use crate::module::Module;

struct HookSource {
    rx: tokio::sync::mpsc::Receiver<String>,
}

impl EventSource for HookSource {
    fn wait(&mut self, timeout: Duration) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move {
            match tokio::time::timeout(timeout, self.rx.recv()).await {
                Ok(Some(payload)) => Some(payload),
                Ok(None) | Err(_) => None,
            }
        })
    }
}

/// Register the `hook` action and start the `ipc-hook` module. Every
/// `hook:` message addressed to this module's name arrives here as an
/// ordinary `input("hook", data)` call, same as a click-routed action.
pub fn start(module: Arc<Module>, poll_timeout: Duration) -> tokio::task::JoinHandle<()> {
    let (tx, rx) = tokio::sync::mpsc::channel(16);
    module
        .register_action(
            "hook",
            ActionHandler::WithData(Box::new(move |data| {
                let _ = tx.try_send(data.to_string());
            })),
        )
        .expect("ipc-hook action registered exactly once");
    spawn_event(module, poll_timeout, HookSource { rx })
}
