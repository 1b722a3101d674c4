//! The `xkeyboard` module: current keyboard layout and indicator state
//! (spec §4.13, C13, "Event, layout-change"). A real adapter would watch
//! XKB layout-change events; out of scope per §1.

use std::sync::Arc;
use std::time::Duration;

use crate::module::runtime::{spawn_event, BoxFuture, EventSource};
use crate::module::Module;

/// A keyboard layout name plus which of its indicators are lit.
#[derive(Debug, Clone)]
pub struct LayoutState {
    /// Short layout name, e.g. `"us"`, `"de"`.
    pub layout: String,
    /// Lock indicators currently on (e.g. `["Caps Lock"]`).
    pub indicators: Vec<String>,
}

/// Narrow collaborator: blocks until the layout or indicator state
/// changes, up to a bounded timeout.
pub trait KeyboardLayoutSource: Send + 'static {
    /// Wait up to `timeout` for a layout/indicator change.
    fn wait(&mut self, timeout: Duration) -> BoxFuture<'_, Option<LayoutState>>;
}

struct KeyboardAdapter<S> {
    source: S,
}

impl<S: KeyboardLayoutSource> EventSource for KeyboardAdapter<S> {
    fn wait(&mut self, timeout: Duration) -> BoxFuture<'_, Option<String>> {
        let fut = self.source.wait(timeout);
        Box::pin(async move { fut.await.map(|state| render(&state)) })
    }
}

fn render(state: &LayoutState) -> String {
    if state.indicators.is_empty() {
        state.layout.clone()
    } else {
        format!("{} {}", state.layout, state.indicators.join(" "))
    }
}

/// Start the `xkeyboard` module.
pub fn start(module: Arc<Module>, poll_timeout: Duration, source: impl KeyboardLayoutSource) -> tokio::task::JoinHandle<()> {
    spawn_event(module, poll_timeout, KeyboardAdapter { source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_alone_has_no_trailing_space() {
        let state = LayoutState { layout: "us".to_string(), indicators: Vec::new() };
        assert_eq!(render(&state), "us");
    }

    #[test]
    fn indicators_are_appended() {
        let state = LayoutState { layout: "de".to_string(), indicators: vec!["Caps Lock".to_string()] };
        assert_eq!(render(&state), "de Caps Lock");
    }
}
