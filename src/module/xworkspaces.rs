//! The `xworkspaces` module: a generic workspace/tag list with one marked
//! active (spec §4.13, C13, "Event, generic 'workspace' watch"). The
//! X11/bspwm/i3/sway specifics stay out of scope per §1; [`WorkspaceSource`]
//! is the seam a window-manager-specific adapter implements.

use std::sync::Arc;
use std::time::Duration;

use crate::module::runtime::{spawn_event, BoxFuture, EventSource};
use crate::module::Module;

/// Narrow collaborator: blocks until the workspace list or active index
/// changes, up to a bounded timeout.
pub trait WorkspaceSource: Send + 'static {
    /// Wait up to `timeout` for a change, returning the full workspace
    /// name list and the index of the active one.
    fn wait(&mut self, timeout: Duration) -> BoxFuture<'_, Option<(Vec<String>, usize)>>;
}

struct WorkspaceAdapter<S> {
    source: S,
}

impl<S: WorkspaceSource> EventSource for WorkspaceAdapter<S> {
    fn wait(&mut self, timeout: Duration) -> BoxFuture<'_, Option<String>> {
        let fut = self.source.wait(timeout);
        Box::pin(async move { fut.await.map(|(names, active)| render(&names, active)) })
    }
}

fn render(names: &[String], active: usize) -> String {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| if i == active { format!("[{name}]") } else { name.clone() })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Start the `xworkspaces` module.
pub fn start(module: Arc<Module>, poll_timeout: Duration, source: impl WorkspaceSource) -> tokio::task::JoinHandle<()> {
    spawn_event(module, poll_timeout, WorkspaceAdapter { source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_workspace_is_bracketed() {
        let names = vec!["1".to_string(), "2".to_string(), "3".to_string()];
        assert_eq!(render(&names, 1), "1 [2] 3");
    }

    #[test]
    fn single_workspace_is_just_bracketed() {
        assert_eq!(render(&["www".to_string()], 0), "[www]");
    }
}
