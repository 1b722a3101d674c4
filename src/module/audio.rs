//! The `audio` module: volume/mute state driven by a control-change
//! notification channel (spec §4.13, C13, "Event, simulated control-change
//! channel"). A real adapter would be an ALSA mixer element watch; out of
//! scope per §1.

use std::sync::Arc;
use std::time::Duration;

use crate::module::runtime::{spawn_event, BoxFuture, EventSource};
use crate::module::Module;

/// Volume/mute snapshot delivered on a control change.
#[derive(Debug, Clone, Copy)]
pub struct VolumeState {
    /// Volume in `0..=100`.
    pub percent: u32,
    /// Whether the sink/source is muted.
    pub muted: bool,
}

/// Narrow collaborator: an async channel of volume changes, as a real
/// mixer-watch adapter would deliver them.
pub struct AudioSource {
    rx: tokio::sync::mpsc::Receiver<VolumeState>,
}

impl AudioSource {
    /// Build a source reading from `rx`; the sender half is held by
    /// whatever drives simulated or real control-change events.
    pub fn new(rx: tokio::sync::mpsc::Receiver<VolumeState>) -> Self {
        Self { rx }
    }
}

impl EventSource for AudioSource {
    fn wait(&mut self, timeout: Duration) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move {
            match tokio::time::timeout(timeout, self.rx.recv()).await {
                Ok(Some(state)) => Some(render(state)),
                Ok(None) | Err(_) => None,
            }
        })
    }
}

fn render(state: VolumeState) -> String {
    if state.muted {
        "muted".to_string()
    } else {
        format!("{}%", state.percent.min(100))
    }
}

/// Start the `audio` module. `poll_timeout` bounds how long a single
/// `wait` call blocks before yielding control back to the cancellation
/// check.
pub fn start(module: Arc<Module>, poll_timeout: Duration, source: AudioSource) -> tokio::task::JoinHandle<()> {
    spawn_event(module, poll_timeout, source)
}
