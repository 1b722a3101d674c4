//! Per-module action routing (spec §4.4).
//!
//! A name-keyed map rather than a closed enum like the teacher's
//! `hub/actions/mod.rs` `HubAction`, since modules register their action
//! names dynamically at construction instead of the set being fixed at
//! compile time.

use std::collections::HashMap;

use thiserror::Error;

/// A registered action handler: either takes no payload or a string one.
pub enum ActionHandler {
    /// Handler ignoring any `data` payload.
    WithoutData(Box<dyn Fn() + Send + Sync>),
    /// Handler that consumes the `data` payload.
    WithData(Box<dyn Fn(&str) + Send + Sync>),
}

impl std::fmt::Debug for ActionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionHandler::WithoutData(_) => f.write_str("ActionHandler::WithoutData(..)"),
            ActionHandler::WithData(_) => f.write_str("ActionHandler::WithData(..)"),
        }
    }
}

/// Errors from router registration/invocation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    /// `register` was called twice for the same action name.
    #[error("action '{0}' is already registered")]
    DuplicateAction(String),
    /// `invoke` named an action that was never registered.
    #[error("no such action '{0}'")]
    UnknownAction(String),
}

/// Per-module table mapping action name to handler.
#[derive(Debug, Default)]
pub struct ActionRouter {
    handlers: HashMap<String, ActionHandler>,
}

impl ActionRouter {
    /// An empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name -> handler`. Refuses a second registration of the
    /// same name (§4.4: "register refuses duplicates").
    pub fn register(&mut self, name: impl Into<String>, handler: ActionHandler) -> Result<(), RouterError> {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(RouterError::DuplicateAction(name));
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    /// Whether `name` is registered.
    pub fn has(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Invoke the handler for `name` with `data`. Asserts the action
    /// exists per §4.4 ("invoke asserts the action exists"); callers that
    /// aren't sure should check [`has`](Self::has) first.
    pub fn invoke(&self, name: &str, data: &str) -> Result<(), RouterError> {
        match self.handlers.get(name) {
            Some(ActionHandler::WithoutData(f)) => {
                f();
                Ok(())
            }
            Some(ActionHandler::WithData(f)) => {
                f(data);
                Ok(())
            }
            None => Err(RouterError::UnknownAction(name.to_string())),
        }
    }
}

/// Split a canonical action reference `#module.action[.data]` into its
/// three parts (spec §4.4/§6). Empty module or action names are rejected.
pub fn parse_action_ref(reference: &str) -> Option<(&str, &str, Option<&str>)> {
    let rest = reference.strip_prefix('#')?;
    let mut parts = rest.splitn(3, '.');
    let module = parts.next()?;
    let action = parts.next()?;
    if module.is_empty() || action.is_empty() {
        return None;
    }
    let data = parts.next();
    Some((module, action, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn register_and_invoke_without_data() {
        let mut router = ActionRouter::new();
        let called = Arc::new(AtomicBool::new(false));
        let c = called.clone();
        router.register("toggle", ActionHandler::WithoutData(Box::new(move || c.store(true, Ordering::SeqCst)))).unwrap();
        assert!(router.has("toggle"));
        router.invoke("toggle", "").unwrap();
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn register_and_invoke_with_data() {
        let mut router = ActionRouter::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        router
            .register("set-volume", ActionHandler::WithData(Box::new(move |data| {
                s.store(data.parse().unwrap_or(0), Ordering::SeqCst);
            })))
            .unwrap();
        router.invoke("set-volume", "42").unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut router = ActionRouter::new();
        router.register("a", ActionHandler::WithoutData(Box::new(|| {}))).unwrap();
        assert_eq!(router.register("a", ActionHandler::WithoutData(Box::new(|| {}))), Err(RouterError::DuplicateAction("a".to_string())));
    }

    #[test]
    fn invoke_unknown_action_is_an_error() {
        let router = ActionRouter::new();
        assert_eq!(router.invoke("nope", ""), Err(RouterError::UnknownAction("nope".to_string())));
    }

    #[test]
    fn parses_action_reference() {
        assert_eq!(parse_action_ref("#vol.volup"), Some(("vol", "volup", None)));
        assert_eq!(parse_action_ref("#vol.set.42"), Some(("vol", "set", Some("42"))));
        assert_eq!(parse_action_ref("#vol.set.42.extra"), Some(("vol", "set", Some("42.extra"))));
        assert_eq!(parse_action_ref("nothash"), None);
        assert_eq!(parse_action_ref("#.act"), None);
        assert_eq!(parse_action_ref("#mod."), None);
    }
}
