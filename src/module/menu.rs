//! The `menu` module: a static tree of clickable levels (spec §4.13, C13,
//! "Static — a static action-tree module from original_source's
//! `modules/menu.hpp`").
//!
//! Grounded in `examples/original_source/include/modules/menu.hpp`:
//! `current_level` of `-1` means closed, `levels` is a list of item lists,
//! each item carries an `exec` command and a label. `menu_open-<n>` and
//! `menu_close` are preserved as the action names (`TAG_LABEL_TOGGLE`'s
//! open/close labels become the registered `toggle` action here).

use std::sync::{Arc, Mutex};

use crate::action::router::ActionHandler;
use crate::module::runtime::spawn_static;
use crate::module::Module;

/// One clickable entry in a menu level: the command run when clicked, and
/// the label shown for it.
#[derive(Debug, Clone)]
pub struct MenuItem {
    /// Shell command executed on click (consumed by the registered `exec`
    /// action; running it is the host's responsibility).
    pub exec: String,
    /// Text shown for this entry.
    pub label: String,
}

struct MenuState {
    current_level: i32,
    levels: Vec<Vec<MenuItem>>,
}

impl MenuState {
    fn render(&self, label_open: &str, label_close: &str) -> String {
        if self.current_level < 0 {
            return label_open.to_string();
        }
        let level = self.levels.get(self.current_level as usize);
        let mut out = String::new();
        if let Some(items) = level {
            for item in items {
                out.push_str(&item.label);
                out.push(' ');
            }
        }
        out.push_str(label_close);
        out
    }
}

/// Start the `menu` module with `levels` of items and the open/close
/// toggle labels. Registers `toggle` (cycles closed -> level 0 -> closed),
/// `open` (takes a level index as `data`), and `close`.
pub fn start(module: Arc<Module>, levels: Vec<Vec<MenuItem>>, label_open: impl Into<String>, label_close: impl Into<String>) -> tokio::task::JoinHandle<()> {
    let label_open = label_open.into();
    let label_close = label_close.into();
    let state = Arc::new(Mutex::new(MenuState { current_level: -1, levels }));

    let refresh = {
        let state = state.clone();
        let module = module.clone();
        let label_open = label_open.clone();
        let label_close = label_close.clone();
        move || {
            let text = state.lock().expect("menu state mutex poisoned").render(&label_open, &label_close);
            let module = module.clone();
            tokio::spawn(async move {
                module.set_contents(text).await;
            });
        }
    };

    {
        let state = state.clone();
        let refresh = refresh.clone();
        module
            .register_action("toggle", ActionHandler::WithoutData(Box::new(move || {
                let mut s = state.lock().expect("menu state mutex poisoned");
                s.current_level = if s.current_level < 0 { 0 } else { -1 };
                drop(s);
                refresh();
            })))
            .expect("menu actions registered exactly once");
    }
    {
        let state = state.clone();
        let refresh = refresh.clone();
        module
            .register_action("open", ActionHandler::WithData(Box::new(move |data| {
                if let Ok(level) = data.parse::<i32>() {
                    state.lock().expect("menu state mutex poisoned").current_level = level;
                    refresh();
                }
            })))
            .expect("menu actions registered exactly once");
    }
    {
        let state = state.clone();
        let refresh = refresh.clone();
        module
            .register_action("close", ActionHandler::WithoutData(Box::new(move || {
                state.lock().expect("menu state mutex poisoned").current_level = -1;
                refresh();
            })))
            .expect("menu actions registered exactly once");
    }

    spawn_static(module, move || state.lock().expect("menu state mutex poisoned").render(&label_open, &label_close))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(labels: &[&str]) -> Vec<MenuItem> {
        labels.iter().map(|l| MenuItem { exec: format!("run-{l}"), label: (*l).to_string() }).collect()
    }

    #[tokio::test]
    async fn starts_closed_showing_open_label() {
        let module = Module::new("menu");
        let handle = start(module.clone(), vec![items(&["a", "b"])], "open-me", "close-me");
        handle.await.unwrap();
        assert_eq!(module.contents().await, "open-me");
    }

    #[tokio::test]
    async fn toggle_opens_level_zero_then_closes() {
        let module = Module::new("menu");
        start(module.clone(), vec![items(&["a", "b"])], "open-me", "close-me").await.unwrap();
        module.input("toggle", "").unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(module.contents().await, "a b close-me");
        module.input("toggle", "").unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(module.contents().await, "open-me");
    }

    #[tokio::test]
    async fn open_with_explicit_level_and_close() {
        let module = Module::new("menu");
        start(module.clone(), vec![items(&["a"]), items(&["b", "c"])], "open-me", "close-me").await.unwrap();
        module.input("open", "1").unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(module.contents().await, "b c close-me");
        module.input("close", "").unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(module.contents().await, "open-me");
    }
}
