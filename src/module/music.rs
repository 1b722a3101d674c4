//! The `music` module: now-playing state from an MPD-like server (spec
//! §4.13, C13, "Event"). A real adapter would speak MPD's `idle` protocol;
//! out of scope per §1. [`MusicSource`] is the seam.

use std::sync::Arc;
use std::time::Duration;

use crate::module::runtime::{spawn_event, BoxFuture, EventSource};
use crate::module::Module;

/// Playback state reported by the music source.
#[derive(Debug, Clone)]
pub enum PlaybackState {
    /// Nothing is playing.
    Stopped,
    /// `artist - title` is playing, paused if `paused`.
    Playing { artist: String, title: String, paused: bool },
}

/// Narrow collaborator: blocks (as MPD's `idle` command does) until
/// playback state changes, up to a bounded timeout.
pub trait MusicSource: Send + 'static {
    /// Wait up to `timeout` for a playback state change.
    fn wait(&mut self, timeout: Duration) -> BoxFuture<'_, Option<PlaybackState>>;
}

struct MusicAdapter<S> {
    source: S,
}

impl<S: MusicSource> EventSource for MusicAdapter<S> {
    fn wait(&mut self, timeout: Duration) -> BoxFuture<'_, Option<String>> {
        let fut = self.source.wait(timeout);
        Box::pin(async move { fut.await.map(|state| render(&state)) })
    }
}

fn render(state: &PlaybackState) -> String {
    match state {
        PlaybackState::Stopped => String::new(),
        PlaybackState::Playing { artist, title, paused: false } => format!("{artist} - {title}"),
        PlaybackState::Playing { artist, title, paused: true } => format!("{artist} - {title} (paused)"),
    }
}

/// Start the `music` module.
pub fn start(module: Arc<Module>, poll_timeout: Duration, source: impl MusicSource) -> tokio::task::JoinHandle<()> {
    spawn_event(module, poll_timeout, MusicAdapter { source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_renders_empty() {
        assert_eq!(render(&PlaybackState::Stopped), "");
    }

    #[test]
    fn playing_renders_artist_and_title() {
        let state = PlaybackState::Playing { artist: "Boards".to_string(), title: "Roygbiv".to_string(), paused: false };
        assert_eq!(render(&state), "Boards - Roygbiv");
    }

    #[test]
    fn paused_is_annotated() {
        let state = PlaybackState::Playing { artist: "Boards".to_string(), title: "Roygbiv".to_string(), paused: true };
        assert_eq!(render(&state), "Boards - Roygbiv (paused)");
    }
}
