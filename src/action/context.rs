//! Per-frame table of action regions (spec §4.3).
//!
//! Rebuilt by the dispatcher for every render pass and handed to input
//! handling as a read-only snapshot once compose finishes (§5: "compose and
//! read do not overlap because compose replaces the context atomically at
//! end of frame"). Modeled as a small hand-rolled indexed structure with
//! explicit invariants in its doc comments, the same shape as the teacher's
//! `broker/ring_buffer.rs`.

use crate::color::{Alignment, MouseButton};

/// A rectangular, clickable span of the bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRegion {
    /// Monotonically allocated within one frame.
    pub id: u64,
    /// Button this region answers to.
    pub button: MouseButton,
    /// Alignment section the region was opened in.
    pub alignment: Alignment,
    /// Raw command text (`#module.action[.data]` or a legacy shell command).
    pub command: String,
    /// Inclusive start pixel offset.
    pub start_px: i32,
    /// Exclusive end pixel offset; `None` until the region is closed.
    pub end_px: Option<i32>,
}

impl ActionRegion {
    fn is_closed(&self) -> bool {
        self.end_px.is_some()
    }
}

/// Error returned by an [`ActionContext`] invariant violation. Per spec §7
/// these are "logged; the operation is a no-op" at the call site, but the
/// type lets callers distinguish and log precisely.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ActionContextError {
    /// `close` was called with no matching open region.
    #[error("no open action region to close (button hint {0:?})")]
    NoMatchingOpen(Option<MouseButton>),
}

/// The per-frame action-region table.
#[derive(Debug, Default)]
pub struct ActionContext {
    regions: Vec<ActionRegion>,
    next_id: u64,
    has_double_click: bool,
}

impl ActionContext {
    /// An empty context, as built at the start of every render pass.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new region for `button` in `alignment`. Returns its id.
    /// `start_px`/`end_px` both begin at 0 until [`set_start`](Self::set_start)
    /// and [`set_end`](Self::set_end)/[`close`](Self::close) run.
    pub fn open(&mut self, button: MouseButton, alignment: Alignment, command: String) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        if button.is_double_click() {
            self.has_double_click = true;
        }
        self.regions.push(ActionRegion { id, button, alignment, command, start_px: 0, end_px: None });
        id
    }

    /// Record the pixel offset a region was opened at.
    pub fn set_start(&mut self, id: u64, px: i32) {
        if let Some(r) = self.regions.iter_mut().find(|r| r.id == id) {
            r.start_px = px;
        }
    }

    /// Record the pixel offset a region closes at (does not itself mark it
    /// closed; see [`close`](Self::close)).
    pub fn set_end(&mut self, id: u64, px: i32) {
        if let Some(r) = self.regions.iter_mut().find(|r| r.id == id) {
            r.end_px = Some(px);
        }
    }

    /// Close the innermost still-open region matching `alignment` and, if
    /// `button_hint` is `Some`, also matching that exact button. With no
    /// hint, the innermost open region regardless of button is chosen
    /// (spec §4.1/§4.3). Returns the id and button of the closed region.
    pub fn close(&mut self, button_hint: Option<MouseButton>, alignment: Alignment) -> Result<(u64, MouseButton), ActionContextError> {
        let idx = self
            .regions
            .iter()
            .enumerate()
            .rev()
            .find(|(_, r)| {
                !r.is_closed()
                    && r.alignment == alignment
                    && button_hint.map_or(true, |b| r.button == b)
            })
            .map(|(i, _)| i)
            .ok_or(ActionContextError::NoMatchingOpen(button_hint))?;
        // Mark closed with a sentinel end; callers still call set_end with
        // the real pixel offset once known.
        self.regions[idx].end_px = Some(self.regions[idx].end_px.unwrap_or(self.regions[idx].start_px));
        Ok((self.regions[idx].id, self.regions[idx].button))
    }

    /// The innermost closed region containing `px` on `alignment` for
    /// `button`. For a double-click button, returns `None` when no
    /// double-click region overlaps (§4.3) so callers can fall back to
    /// single-click-after-delay handling.
    pub fn find(&self, button: MouseButton, px: i32, alignment: Alignment) -> Option<u64> {
        self.regions
            .iter()
            .filter(|r| {
                r.is_closed()
                    && r.alignment == alignment
                    && r.button == button
                    && r.start_px <= px
                    && px < r.end_px.unwrap_or(r.start_px)
            })
            .min_by_key(|r| r.end_px.unwrap_or(r.start_px) - r.start_px)
            .map(|r| r.id)
    }

    /// Look up a region's command string by id.
    pub fn command(&self, id: u64) -> Option<&str> {
        self.regions.iter().find(|r| r.id == id).map(|r| r.command.as_str())
    }

    /// Number of regions recorded this frame.
    pub fn count(&self) -> usize {
        self.regions.len()
    }

    /// Whether any region uses a double-click button.
    pub fn has_double_click(&self) -> bool {
        self.has_double_click
    }

    /// Ids of any regions still unclosed at end of stream (a malformed
    /// input per §4.2: "any unclosed actions are reported as an error and
    /// their regions discarded").
    pub fn unclosed_ids(&self) -> Vec<u64> {
        self.regions.iter().filter(|r| !r.is_closed()).map(|r| r.id).collect()
    }

    /// Drop any still-open regions (called once parsing finishes, per
    /// §4.2's "discarded").
    pub fn discard_unclosed(&mut self) {
        self.regions.retain(|r| r.is_closed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_then_find_inside_range() {
        let mut ctx = ActionContext::new();
        let id = ctx.open(MouseButton::Left, Alignment::Left, "#vol.volup".to_string());
        ctx.set_start(id, 10);
        ctx.close(Some(MouseButton::Left), Alignment::Left).unwrap();
        ctx.set_end(id, 30);
        assert_eq!(ctx.find(MouseButton::Left, 20, Alignment::Left), Some(id));
        assert_eq!(ctx.find(MouseButton::Left, 30, Alignment::Left), None);
        assert_eq!(ctx.find(MouseButton::Left, 9, Alignment::Left), None);
    }

    #[test]
    fn nested_stack_innermost_wins() {
        let mut ctx = ActionContext::new();
        let outer = ctx.open(MouseButton::Left, Alignment::Left, "outer".to_string());
        ctx.set_start(outer, 0);
        let inner = ctx.open(MouseButton::Left, Alignment::Left, "inner".to_string());
        ctx.set_start(inner, 5);
        // close inner first (innermost-first close order)
        let (closed_id, _) = ctx.close(Some(MouseButton::Left), Alignment::Left).unwrap();
        assert_eq!(closed_id, inner);
        ctx.set_end(inner, 15);
        let (closed_id, _) = ctx.close(Some(MouseButton::Left), Alignment::Left).unwrap();
        assert_eq!(closed_id, outer);
        ctx.set_end(outer, 20);

        assert_eq!(ctx.find(MouseButton::Left, 7, Alignment::Left), Some(inner));
        assert_eq!(ctx.find(MouseButton::Left, 17, Alignment::Left), Some(outer));
    }

    #[test]
    fn close_without_button_hint_matches_innermost_regardless_of_button() {
        let mut ctx = ActionContext::new();
        let a = ctx.open(MouseButton::Left, Alignment::Left, "a".to_string());
        let b = ctx.open(MouseButton::Middle, Alignment::Left, "b".to_string());
        let (closed, button) = ctx.close(None, Alignment::Left).unwrap();
        assert_eq!(closed, b);
        assert_eq!(button, MouseButton::Middle);
        let (closed, _) = ctx.close(None, Alignment::Left).unwrap();
        assert_eq!(closed, a);
    }

    #[test]
    fn close_with_explicit_button_skips_mismatched_innermost() {
        let mut ctx = ActionContext::new();
        let a = ctx.open(MouseButton::Left, Alignment::Left, "a".to_string());
        let _b = ctx.open(MouseButton::Middle, Alignment::Left, "b".to_string());
        let (closed, button) = ctx.close(Some(MouseButton::Left), Alignment::Left).unwrap();
        assert_eq!(closed, a);
        assert_eq!(button, MouseButton::Left);
    }

    #[test]
    fn close_with_no_open_region_is_an_error() {
        let mut ctx = ActionContext::new();
        assert_eq!(ctx.close(None, Alignment::Left), Err(ActionContextError::NoMatchingOpen(None)));
    }

    #[test]
    fn double_click_bit_set_only_for_double_variants() {
        let mut ctx = ActionContext::new();
        assert!(!ctx.has_double_click());
        ctx.open(MouseButton::DoubleLeft, Alignment::Left, "x".to_string());
        assert!(ctx.has_double_click());
    }

    #[test]
    fn find_returns_none_for_unmatched_double_click() {
        let mut ctx = ActionContext::new();
        let id = ctx.open(MouseButton::Left, Alignment::Left, "x".to_string());
        ctx.close(Some(MouseButton::Left), Alignment::Left).unwrap();
        ctx.set_end(id, 10);
        assert_eq!(ctx.find(MouseButton::DoubleLeft, 5, Alignment::Left), None);
    }

    #[test]
    fn unclosed_regions_are_discardable() {
        let mut ctx = ActionContext::new();
        let id = ctx.open(MouseButton::Left, Alignment::Left, "x".to_string());
        assert_eq!(ctx.unclosed_ids(), vec![id]);
        ctx.discard_unclosed();
        assert_eq!(ctx.count(), 0);
    }
}
