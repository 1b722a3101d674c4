//! Stateful replay of an [`Element`] stream into a [`Renderer`] (spec §4.2).
//!
//! One dispatcher handles exactly one frame: construct it, feed it every
//! element the parser produced for that frame's composite string, then take
//! its [`ActionContext`]. Modeled on the way the teacher's
//! `SocketClientConn` (`socket/client_conn.rs`) splits "read" from
//! "dispatch": one object owns current state, replays one unit at a time,
//! and delegates drawing to an injected capability.

use thiserror::Error;

use crate::action::context::ActionContext;
use crate::color::{Activation, Alignment, Attribute, Color, ControlTag};
use crate::element::{Element, TagData};
use crate::renderer::Renderer;

/// Errors surfaced at end-of-stream dispatch. Per §4.2/§7 these describe a
/// malformed element stream, not a renderer failure; the dispatcher still
/// produced whatever render calls it could.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// One or more `ActionOpen`s never saw a matching close.
    #[error("{0} action region(s) left open at end of stream")]
    UnclosedActions(usize),
}

/// Color/attribute/font state the dispatcher restores on a `Control(ResetAll)`.
#[derive(Debug, Clone, Copy, Default)]
struct StackState {
    fg: Color,
    bg: Color,
    ul: Color,
    ol: Color,
    font: u32,
    attrs: Attribute,
}

/// Replays one frame's worth of [`Element`]s into a [`Renderer`].
#[derive(Debug)]
pub struct Dispatcher {
    state: StackState,
    initial: StackState,
    alignment: Alignment,
    actions: ActionContext,
    /// Ids of currently-open action regions, innermost last, so an
    /// unmatched-at-end-of-stream check is a simple non-empty test.
    open_action_ids: Vec<u64>,
}

impl Dispatcher {
    /// A fresh dispatcher for one frame, starting in the `Left` alignment
    /// section with every stack at its default (reset) value.
    pub fn new() -> Self {
        Self {
            state: StackState::default(),
            initial: StackState::default(),
            alignment: Alignment::Left,
            actions: ActionContext::new(),
            open_action_ids: Vec::new(),
        }
    }

    /// Replay one element against `renderer`/`ctx`.
    pub fn dispatch<R: Renderer>(&mut self, renderer: &mut R, ctx: &mut R::Ctx, element: &Element) {
        match element {
            Element::Text(text) => renderer.render_text(ctx, text),
            Element::Tag(tag) => self.dispatch_tag(renderer, ctx, tag),
        }
    }

    fn dispatch_tag<R: Renderer>(&mut self, renderer: &mut R, ctx: &mut R::Ctx, tag: &TagData) {
        match tag {
            TagData::SetBg(c) => self.state.bg = *c,
            TagData::SetFg(c) => self.state.fg = *c,
            TagData::SetUl(c) => self.state.ul = *c,
            TagData::SetOl(c) => self.state.ol = *c,
            TagData::SetFont(f) => self.state.font = *f,
            TagData::Offset(extent) => {
                // DPI is a renderer concern; the default 96 matches common
                // X11/Wayland reporting when the renderer doesn't override
                // it. Real hosts convert through their own DPI before
                // calling render_offset in a fuller pipeline; here the
                // dispatcher only needs *a* pixel value to advance x.
                renderer.render_offset(ctx, extent.to_pixels(96.0));
            }
            TagData::Reverse => std::mem::swap(&mut self.state.fg, &mut self.state.bg),
            TagData::Alignment(a) => {
                self.alignment = *a;
                renderer.change_alignment(ctx, *a);
            }
            TagData::Attr(activation, attr) => {
                match activation {
                    Activation::On => self.state.attrs.insert(*attr),
                    Activation::Off => self.state.attrs.remove(*attr),
                    Activation::Toggle => self.state.attrs.toggle(*attr),
                }
            }
            TagData::Control(ControlTag::ResetAll) => self.state = self.initial,
            TagData::ActionOpen { button, command } => {
                let id = self.actions.open(*button, self.alignment, command.clone());
                self.actions.set_start(id, renderer.get_x(ctx).round() as i32);
                self.open_action_ids.push(id);
            }
            TagData::ActionClose { button } => {
                match self.actions.close(*button, self.alignment) {
                    Ok((id, _matched_button)) => {
                        self.actions.set_end(id, renderer.get_x(ctx).round() as i32);
                        self.open_action_ids.retain(|&x| x != id);
                    }
                    Err(err) => {
                        // §4.2: "logs but does not abort on an unmatched close".
                        log::warn!("unmatched action close: {err}");
                    }
                }
            }
        }
    }

    /// Finish the frame. Any still-open actions are dropped per §4.2
    /// ("discarded"); returns the built [`ActionContext`] either way, and an
    /// error describing how many regions were discarded.
    pub fn finish(mut self) -> (ActionContext, Result<(), DispatchError>) {
        let unclosed = self.open_action_ids.len();
        self.actions.discard_unclosed();
        let result = if unclosed > 0 {
            Err(DispatchError::UnclosedActions(unclosed))
        } else {
            Ok(())
        };
        (self.actions, result)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::MouseButton;
    use std::cell::RefCell;

    #[derive(Debug)]
    struct FakeCtx;
    impl crate::renderer::RenderContext for FakeCtx {}

    #[derive(Debug, Default)]
    struct FakeRenderer {
        x: RefCell<f64>,
        calls: RefCell<Vec<String>>,
    }

    impl Renderer for FakeRenderer {
        type Ctx = FakeCtx;

        fn render_text(&mut self, _ctx: &mut FakeCtx, text: &str) {
            *self.x.borrow_mut() += (text.chars().count() as f64) * 5.0;
            self.calls.borrow_mut().push(format!("text:{text}"));
        }

        fn render_offset(&mut self, _ctx: &mut FakeCtx, pixels: i32) {
            *self.x.borrow_mut() += f64::from(pixels);
            self.calls.borrow_mut().push(format!("offset:{pixels}"));
        }

        fn change_alignment(&mut self, _ctx: &mut FakeCtx, alignment: Alignment) {
            self.calls.borrow_mut().push(format!("align:{alignment:?}"));
        }

        fn get_x(&self, _ctx: &FakeCtx) -> f64 {
            *self.x.borrow()
        }

        fn get_alignment_start(&self, _alignment: Alignment) -> f64 {
            0.0
        }
    }

    fn run(elements: &[Element]) -> (FakeRenderer, ActionContext, Result<(), DispatchError>) {
        let mut renderer = FakeRenderer::default();
        let mut ctx = FakeCtx;
        let mut dispatcher = Dispatcher::new();
        for e in elements {
            dispatcher.dispatch(&mut renderer, &mut ctx, e);
        }
        let (actions, result) = dispatcher.finish();
        (renderer, actions, result)
    }

    #[test]
    fn parse_and_dispatch_scenario_from_spec() {
        let elements = vec![
            Element::Tag(TagData::SetFg(Color::parse("#f00").unwrap())),
            Element::Tag(TagData::ActionOpen { button: MouseButton::Left, command: "#mod.act.1".to_string() }),
            Element::Text("hello".to_string()),
            Element::Tag(TagData::ActionClose { button: None }),
            Element::Tag(TagData::SetFg(Color::Reset)),
        ];
        let (_renderer, actions, result) = run(&elements);
        assert!(result.is_ok());
        assert_eq!(actions.count(), 1);
    }

    #[test]
    fn unclosed_action_is_reported_and_discarded() {
        let elements = vec![
            Element::Tag(TagData::ActionOpen { button: MouseButton::Left, command: "x".to_string() }),
            Element::Text("a".to_string()),
        ];
        let (_renderer, actions, result) = run(&elements);
        assert_eq!(result, Err(DispatchError::UnclosedActions(1)));
        assert_eq!(actions.count(), 0);
    }

    #[test]
    fn empty_stream_produces_no_render_calls() {
        let (renderer, actions, result) = run(&[]);
        assert!(renderer.calls.borrow().is_empty());
        assert_eq!(actions.count(), 0);
        assert!(result.is_ok());
    }

    #[test]
    fn control_reset_all_restores_initial_state() {
        let mut renderer = FakeRenderer::default();
        let mut ctx = FakeCtx;
        let mut dispatcher = Dispatcher::new();
        dispatcher.dispatch(&mut renderer, &mut ctx, &Element::Tag(TagData::SetFg(Color::parse("#f00").unwrap())));
        assert_eq!(dispatcher.state.fg, Color::parse("#f00").unwrap());
        dispatcher.dispatch(&mut renderer, &mut ctx, &Element::Tag(TagData::Control(ControlTag::ResetAll)));
        assert_eq!(dispatcher.state.fg, Color::Reset);
    }

    #[test]
    fn reverse_swaps_fg_and_bg() {
        let mut renderer = FakeRenderer::default();
        let mut ctx = FakeCtx;
        let mut dispatcher = Dispatcher::new();
        let fg = Color::parse("#f00").unwrap();
        let bg = Color::parse("#00f").unwrap();
        dispatcher.dispatch(&mut renderer, &mut ctx, &Element::Tag(TagData::SetFg(fg)));
        dispatcher.dispatch(&mut renderer, &mut ctx, &Element::Tag(TagData::SetBg(bg)));
        dispatcher.dispatch(&mut renderer, &mut ctx, &Element::Tag(TagData::Reverse));
        assert_eq!(dispatcher.state.fg, bg);
        assert_eq!(dispatcher.state.bg, fg);
    }

    #[test]
    fn nested_actions_scenario_from_spec() {
        let elements = vec![
            Element::Tag(TagData::ActionOpen { button: MouseButton::Left, command: "a".to_string() }),
            Element::Tag(TagData::ActionOpen { button: MouseButton::Middle, command: "b".to_string() }),
            Element::Text("x".to_string()),
            Element::Tag(TagData::ActionClose { button: Some(MouseButton::Middle) }),
            Element::Tag(TagData::ActionClose { button: Some(MouseButton::Left) }),
        ];
        let (_renderer, actions, result) = run(&elements);
        assert!(result.is_ok());
        assert_eq!(actions.count(), 2);
        let at_x = 0; // "x" is drawn right after both opens, at x=0
        assert!(actions.find(MouseButton::Middle, at_x, Alignment::Left).is_some());
        assert!(actions.find(MouseButton::Left, at_x, Alignment::Left).is_some());
    }
}
