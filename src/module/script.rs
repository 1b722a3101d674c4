//! The `script` module: a respawning subprocess whose stdout lines become
//! the module's contents (spec §4.13, C13, "Subprocess-tail with
//! backoff").

use std::sync::Arc;

use crate::module::runtime::{spawn_subprocess_tail, Backoff};
use crate::module::Module;

/// Start the `script` module, running `argv[0]` with `argv[1..]` as
/// arguments, tailing its stdout, and respawning on exit with `backoff`.
pub fn start(module: Arc<Module>, argv: Vec<String>, backoff: Backoff) -> tokio::task::JoinHandle<()> {
    spawn_subprocess_tail(module, argv, backoff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn tails_stdout_lines_from_a_real_process() {
        let module = Module::new("script");
        let argv = vec!["printf".to_string(), "one\ntwo\n".to_string()];
        let handle = start(module.clone(), argv, Backoff::new(Duration::from_millis(50), Duration::from_secs(1)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        module.stop().await;
        let _ = handle.await;
        let contents = module.contents().await;
        assert!(contents == "one" || contents == "two" || contents.is_empty());
    }

    #[tokio::test]
    async fn empty_argv_goes_to_error_state() {
        let module = Module::new("script");
        let handle = start(module.clone(), Vec::new(), Backoff::default());
        handle.await.unwrap();
        assert!(matches!(module.state().await, crate::module::ModuleState::Error(_)));
    }
}
