//! The composing controller (spec §4.8, C10): owns every module grouped by
//! alignment, throttles and serializes recompose passes, and routes both
//! pointer clicks and IPC commands into the right module.
//!
//! Grounded in the teacher's `hub/daemon.rs` fan-in (many producers feeding
//! one owner that periodically recomputes derived state) generalized from a
//! fixed worker set to an arbitrary per-alignment module roster, and the
//! teacher's `hub/workers.rs` shutdown-by-cancellation-token convention.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::action::context::ActionContext;
use crate::color::{Alignment, MouseButton};
use crate::format::parser::Parser;
use crate::ipc::dispatcher::IpcRequest;
use crate::module::Module;
use crate::throttle::Throttler;

/// Per-alignment section separators and padding (spec §4.8 item 3: "Leading
/// padding before the leftmost module and trailing padding after the
/// rightmost module are drawn from bar config").
#[derive(Debug, Clone, Default)]
pub struct ComposeSettings {
    /// Inserted between two modules in the same alignment section.
    pub separator: String,
    /// Drawn before the first module of each alignment section.
    pub padding_start: String,
    /// Drawn after the last module of each alignment section.
    pub padding_end: String,
}

/// An outstanding single click, held until the double-click debounce window
/// elapses or a second click on the same region arrives (spec §4.8: "a
/// preceding single-click... is held and forwarded only if no second click
/// arrives in time").
struct PendingClick {
    region_id: u64,
    deadline: Instant,
}

/// Outcome of dispatching one IPC/click command, for logging and for the
/// IPC dispatcher's response encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarCommand {
    Quit,
    Restart,
    Hide,
    Show,
    Toggle,
}

impl BarCommand {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "quit" => Some(Self::Quit),
            "restart" => Some(Self::Restart),
            "hide" => Some(Self::Hide),
            "show" => Some(Self::Show),
            "toggle" => Some(Self::Toggle),
            _ => None,
        }
    }
}

/// Owns the module roster and drives compose passes (spec §4.8).
pub struct Aggregator {
    modules: HashMap<Alignment, Vec<Arc<Module>>>,
    settings: ComposeSettings,
    compose_lock: AsyncMutex<()>,
    throttler: AsyncMutex<Throttler>,
    actions: AsyncMutex<ActionContext>,
    pending_click: AsyncMutex<Option<PendingClick>>,
    double_click_debounce: Duration,
    last_command: AsyncMutex<Option<BarCommand>>,
}

impl Aggregator {
    /// Build an aggregator over a fixed `{Left, Center, Right}` roster
    /// (spec §4.8: "Owns `map<Alignment, [Module]>` in a fixed order").
    /// `throttler` is config-driven (spec §4.6); callers that just want the
    /// aggregator's documented default can pass [`Throttler::default_aggregate`].
    pub fn new(
        modules: HashMap<Alignment, Vec<Arc<Module>>>,
        settings: ComposeSettings,
        throttler: Throttler,
        double_click_debounce: Duration,
    ) -> Self {
        Self {
            modules,
            settings,
            compose_lock: AsyncMutex::new(()),
            throttler: AsyncMutex::new(throttler),
            actions: AsyncMutex::new(ActionContext::new()),
            pending_click: AsyncMutex::new(None),
            double_click_debounce,
            last_command: AsyncMutex::new(None),
        }
    }

    /// Run one compose pass (spec §4.8 items 1-4): try-lock with a 50ms
    /// budget, consult the throttler, concatenate each alignment section
    /// with separators/padding, wrap with `%{l}`/`%{c}`/`%{r}`, and collapse
    /// adjacent redundant attribute tags. Returns `None` if the try-lock or
    /// throttle denied this pass (the caller should simply skip the frame;
    /// the next `on_update` will try again).
    pub async fn compose(&self) -> Option<String> {
        let _guard = match tokio::time::timeout(Duration::from_millis(50), self.compose_lock.lock()).await {
            Ok(guard) => guard,
            Err(_) => return None,
        };
        if !self.throttler.lock().await.try_pass(Instant::now()) {
            return None;
        }
        Some(self.compose_now().await)
    }

    async fn compose_now(&self) -> String {
        let mut sections = Vec::with_capacity(3);
        for (alignment, tag) in [(Alignment::Left, "l"), (Alignment::Center, "c"), (Alignment::Right, "r")] {
            let body = self.compose_section(alignment).await;
            sections.push(format!("%{{{tag}}}{body}"));
        }
        collapse_adjacent_tags(&sections.concat())
    }

    async fn compose_section(&self, alignment: Alignment) -> String {
        let Some(modules) = self.modules.get(&alignment) else { return String::new() };
        let mut pieces = Vec::new();
        for module in modules {
            if !module.is_active().await {
                continue;
            }
            let contents = module.contents().await;
            if !contents.is_empty() {
                pieces.push(contents);
            }
        }
        if pieces.is_empty() {
            return String::new();
        }
        format!("{}{}{}", self.settings.padding_start, pieces.join(&self.settings.separator), self.settings.padding_end)
    }

    /// Parse a freshly composed string into elements and replay it through
    /// `dispatcher`, storing the resulting action context for the next
    /// input event to query against (spec §5: "the action context for
    /// frame N is fully built before any click on frame N is matched").
    pub async fn replay<R: crate::renderer::Renderer>(
        &self,
        renderer: &mut R,
        ctx: &mut R::Ctx,
        composite: &str,
    ) -> Result<(), crate::format::dispatcher::DispatchError> {
        let elements: Vec<_> = Parser::new(composite)
            .parse_all()
            .into_iter()
            .filter_map(|r| match r {
                Ok(element) => Some(element),
                Err(err) => {
                    log::warn!("format parse error, element dropped: {err}");
                    None
                }
            })
            .collect();
        let mut dispatcher = crate::format::dispatcher::Dispatcher::new();
        for element in &elements {
            dispatcher.dispatch(renderer, ctx, element);
        }
        let (new_actions, result) = dispatcher.finish();
        *self.actions.lock().await = new_actions;
        result
    }

    /// Handle a pointer click at bar-relative pixel offset `px` on
    /// `alignment` (spec §4.8: "looks up a region in the action context...
    /// invokes `module.input(action, data)`"). Double-click regions are
    /// debounced per [`Self::double_click_debounce`]; a bare single click on
    /// a region that also has a registered double-click is held until the
    /// debounce window lapses with no second click.
    pub async fn handle_click(&self, px: i32, button: MouseButton, alignment: Alignment) {
        let has_double_click = self.actions.lock().await.has_double_click();
        if has_double_click && !button.is_double_click() {
            if let Some(double) = self.actions.lock().await.find(double_click_variant(button), px, alignment) {
                let mut pending = self.pending_click.lock().await;
                if let Some(existing) = pending.take() {
                    if existing.region_id == double && Instant::now() <= existing.deadline {
                        drop(pending);
                        self.dispatch_region(double).await;
                        return;
                    }
                }
                *pending = Some(PendingClick { region_id: double, deadline: Instant::now() + self.double_click_debounce });
                return;
            }
        }
        let Some(id) = self.actions.lock().await.find(button, px, alignment) else { return };
        self.dispatch_region(id).await;
    }

    /// Flush a held single-click once its debounce window has elapsed
    /// without a matching second click arriving (caller schedules this via
    /// a timer keyed off [`PendingClick::deadline`]).
    pub async fn flush_expired_pending_click(&self) {
        let mut pending = self.pending_click.lock().await;
        if let Some(existing) = pending.as_ref() {
            if Instant::now() >= existing.deadline {
                let id = existing.region_id;
                *pending = None;
                drop(pending);
                self.dispatch_region(id).await;
            }
        }
    }

    async fn dispatch_region(&self, id: u64) {
        let command = { self.actions.lock().await.command(id).map(str::to_string) };
        let Some(command) = command else { return };
        if let Some((module, action, data)) = crate::action::router::parse_action_ref(&command) {
            self.dispatch_action(module, action, data.unwrap_or("")).await;
        } else {
            // Legacy inline `A`-tag command, not a `#module.action` reference
            // (spec §4.8: "executes it as a shell command through a
            // subprocess helper").
            self.run_shell_command(&command).await;
        }
    }

    async fn dispatch_action(&self, module_name: &str, action: &str, data: &str) {
        let Some(module) = self.find_module(module_name) else {
            log::warn!("action addressed unknown module '{module_name}'");
            return;
        };
        if let Err(err) = module.input(action, data) {
            log::warn!("module '{module_name}' rejected action '{action}': {err}");
        }
    }

    fn find_module(&self, name: &str) -> Option<&Arc<Module>> {
        self.modules.values().flatten().find(|m| m.name == name)
    }

    async fn run_shell_command(&self, command: &str) {
        match tokio::process::Command::new("/bin/sh").arg("-c").arg(command).spawn() {
            Ok(mut child) => {
                tokio::spawn(async move {
                    let _ = child.wait().await;
                });
            }
            Err(err) => log::warn!("failed to spawn legacy click command {command:?}: {err}"),
        }
    }

    /// Handle one decoded IPC request (spec §4.9: `CMD` payloads become
    /// global bar commands, `ACTION` payloads route the same as click
    /// actions). Returns the response string/error the IPC dispatcher
    /// encodes back to the client.
    pub async fn handle_ipc(&self, request: IpcRequest) -> Result<String, String> {
        match request {
            IpcRequest::Cmd(raw) => {
                let Some(command) = BarCommand::parse(raw.trim()) else {
                    return Err(format!("unknown command {raw:?}"));
                };
                *self.last_command.lock().await = Some(command.clone());
                Ok(format!("{command:?}"))
            }
            IpcRequest::Action { module, action, data } => {
                if self.find_module(&module).is_none() {
                    return Err(format!("unknown module '{module}'"));
                }
                self.dispatch_action(&module, &action, data.as_deref().unwrap_or("")).await;
                Ok(String::new())
            }
        }
    }

    /// The most recently received global bar command, if any (polled by
    /// the daemon's main loop to decide whether to exit/restart/hide/show).
    pub async fn last_command(&self) -> Option<BarCommand> {
        self.last_command.lock().await.clone()
    }

    /// Stop every module across every alignment, bounded by each module's
    /// own 3s shutdown timeout (spec §5).
    pub async fn shutdown(&self) {
        for module in self.modules.values().flatten() {
            module.stop().await;
        }
    }
}

/// The double-click variant of a single-click button (inverse of
/// [`MouseButton::single_click_equivalent`]), used to check whether a bare
/// click landed on a region that was instead registered for its
/// double-click counterpart.
fn double_click_variant(button: MouseButton) -> MouseButton {
    match button {
        MouseButton::Left => MouseButton::DoubleLeft,
        MouseButton::Middle => MouseButton::DoubleMiddle,
        MouseButton::Right => MouseButton::DoubleRight,
        other => other,
    }
}

/// Subscribe to every module's broadcast channel, forwarding a unit signal
/// on `tx` whenever any of them fires (spec §4.8: "On any module's
/// `on_update`..."). Pairs with [`crate::module::UpdateSink`]: callers build
/// one `UpdateSink` per module from the returned sender before starting
/// each module's worker.
pub fn update_channel() -> (mpsc::UnboundedSender<String>, mpsc::UnboundedReceiver<String>) {
    mpsc::unbounded_channel()
}

/// Peephole-collapse adjacent, redundant attribute-reset/set tag pairs
/// produced by concatenating independently-built module sections (spec
/// §4.8 item 4): `B-}%{B#` -> `B#`, `F-}%{F#` -> `F#`, `T-}%{T` -> `T`, and
/// a bare `}%{` between otherwise-compatible tag groups collapses to a
/// single space.
pub fn collapse_adjacent_tags(input: &str) -> String {
    let mut out = input.to_string();
    for (reset, prefix) in [("B-", "B"), ("F-", "F"), ("T-", "T")] {
        let needle = format!("%{{{reset}}}%{{{prefix}");
        let replacement = format!("%{{{prefix}");
        while let Some(pos) = out.find(&needle) {
            out.replace_range(pos..pos + needle.len(), &replacement);
        }
    }
    out.replace("}%{", " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::router::ActionHandler;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn modules_with(left: Vec<Arc<Module>>) -> HashMap<Alignment, Vec<Arc<Module>>> {
        let mut map = HashMap::new();
        map.insert(Alignment::Left, left);
        map.insert(Alignment::Center, Vec::new());
        map.insert(Alignment::Right, Vec::new());
        map
    }

    #[tokio::test]
    async fn compose_concatenates_active_modules_with_separator() {
        let a = Module::new("a");
        a.mark_running().await;
        a.set_contents("AAA".to_string()).await;
        let b = Module::new("b");
        b.mark_running().await;
        b.set_contents("BBB".to_string()).await;

        let settings = ComposeSettings { separator: " | ".to_string(), ..ComposeSettings::default() };
        let agg = Aggregator::new(modules_with(vec![a, b]), settings, Throttler::default_aggregate(), Duration::from_millis(250));
        let composite = agg.compose().await.unwrap();
        assert!(composite.contains("AAA | BBB"));
        assert!(composite.starts_with("%{l}"));
        assert!(composite.contains("%{c}"));
        assert!(composite.contains("%{r}"));
    }

    #[tokio::test]
    async fn errored_module_excluded_from_composite() {
        let a = Module::new("a");
        a.mark_running().await;
        a.set_contents("AAA".to_string()).await;
        a.mark_error("boom").await;

        let agg = Aggregator::new(modules_with(vec![a]), ComposeSettings::default(), Throttler::default_aggregate(), Duration::from_millis(250));
        let composite = agg.compose().await.unwrap();
        assert!(!composite.contains("AAA"));
    }

    #[tokio::test]
    async fn throttle_denies_compose_once_limit_reached() {
        let agg = Aggregator::new(modules_with(Vec::new()), ComposeSettings::default(), Throttler::default_aggregate(), Duration::from_millis(250));
        for _ in 0..3 {
            assert!(agg.compose().await.is_some());
        }
        assert!(agg.compose().await.is_none());
    }

    #[tokio::test]
    async fn configured_throttle_limit_is_honored_not_the_default() {
        let agg = Aggregator::new(modules_with(Vec::new()), ComposeSettings::default(), Throttler::new(1, Duration::from_millis(250)), Duration::from_millis(250));
        assert!(agg.compose().await.is_some());
        assert!(agg.compose().await.is_none());
    }

    #[test]
    fn collapses_redundant_bg_reset_pair() {
        assert_eq!(collapse_adjacent_tags("%{B-}%{B#ff0000}"), "%{B#ff0000}");
        assert_eq!(collapse_adjacent_tags("%{F-}%{F#ff0000}"), "%{F#ff0000}");
    }

    #[test]
    fn collapses_bare_brace_gap_to_space() {
        assert_eq!(collapse_adjacent_tags("a}%{b"), "a b");
    }

    #[tokio::test]
    async fn action_click_routes_to_module_input() {
        let module = Module::new("vol");
        let called = Arc::new(AtomicBool::new(false));
        let c = called.clone();
        module.register_action("up", ActionHandler::WithoutData(Box::new(move || c.store(true, Ordering::SeqCst)))).unwrap();
        module.mark_running().await;

        let agg = Aggregator::new(modules_with(vec![module]), ComposeSettings::default(), Throttler::default_aggregate(), Duration::from_millis(250));
        {
            let mut actions = agg.actions.lock().await;
            let id = actions.open(MouseButton::Left, Alignment::Left, "#vol.up".to_string());
            actions.set_start(id, 0);
            actions.close(Some(MouseButton::Left), Alignment::Left).unwrap();
            actions.set_end(id, 10);
        }
        agg.handle_click(5, MouseButton::Left, Alignment::Left).await;
        assert!(called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn ipc_cmd_quit_is_recorded() {
        let agg = Aggregator::new(modules_with(Vec::new()), ComposeSettings::default(), Throttler::default_aggregate(), Duration::from_millis(250));
        let response = agg.handle_ipc(IpcRequest::Cmd("quit".to_string())).await;
        assert!(response.is_ok());
        assert_eq!(agg.last_command().await, Some(BarCommand::Quit));
    }

    #[tokio::test]
    async fn ipc_cmd_unknown_is_an_error() {
        let agg = Aggregator::new(modules_with(Vec::new()), ComposeSettings::default(), Throttler::default_aggregate(), Duration::from_millis(250));
        assert!(agg.handle_ipc(IpcRequest::Cmd("nonsense".to_string())).await.is_err());
    }

    #[tokio::test]
    async fn ipc_action_unknown_module_is_an_error() {
        let agg = Aggregator::new(modules_with(Vec::new()), ComposeSettings::default(), Throttler::default_aggregate(), Duration::from_millis(250));
        let request = IpcRequest::Action { module: "ghost".to_string(), action: "x".to_string(), data: None };
        assert!(agg.handle_ipc(request).await.is_err());
    }

    #[tokio::test]
    async fn single_click_on_double_click_region_is_held_then_flushed() {
        let module = Module::new("vol");
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let c = calls.clone();
        module.register_action("dbl", ActionHandler::WithoutData(Box::new(move || { c.fetch_add(1, Ordering::SeqCst); }))).unwrap();
        module.mark_running().await;

        let agg = Aggregator::new(modules_with(vec![module]), ComposeSettings::default(), Throttler::default_aggregate(), Duration::from_millis(20));
        {
            let mut actions = agg.actions.lock().await;
            let id = actions.open(MouseButton::DoubleLeft, Alignment::Left, "#vol.dbl".to_string());
            actions.set_start(id, 0);
            actions.close(Some(MouseButton::DoubleLeft), Alignment::Left).unwrap();
            actions.set_end(id, 10);
        }
        agg.handle_click(5, MouseButton::Left, Alignment::Left).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(30)).await;
        agg.flush_expired_pending_click().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
