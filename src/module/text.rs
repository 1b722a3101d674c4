//! The `text` module: a fixed, pre-formatted string (spec §4.13, C13,
//! "Static"). No adapter seam — the configured string *is* the content.

use std::sync::Arc;

use crate::module::runtime::spawn_static;
use crate::module::Module;

/// Start the `text` module with `content` as its one-shot output.
pub fn start(module: Arc<Module>, content: impl Into<String>) -> tokio::task::JoinHandle<()> {
    let content = content.into();
    spawn_static(module, move || content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publishes_the_configured_string_once() {
        let module = Module::new("text");
        let handle = start(module.clone(), "hello bard");
        handle.await.unwrap();
        assert_eq!(module.contents().await, "hello bard");
    }
}
