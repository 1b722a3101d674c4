//! The `Renderer` capability the format dispatcher draws through (spec §6,
//! §9 "virtual dispatch across the renderer interface").
//!
//! The core never owns a display connection or draws a glyph itself; it
//! only needs five operations from whatever host is actually drawing
//! (native window, stdout). Concrete implementations live outside this
//! crate — this trait is the seam.

/// Opaque per-frame render context. A concrete renderer's implementation
/// carries whatever drawable/cursor state it needs; the core only ever
/// passes this back to the same renderer it came from.
pub trait RenderContext: std::fmt::Debug {}

/// The rendering capability the dispatcher consumes.
///
/// `Ctx` is the renderer's own per-frame context type, threaded through
/// every call so a renderer never needs interior mutability or a global.
pub trait Renderer {
    /// Per-frame context type, opaque to the dispatcher.
    type Ctx: RenderContext;

    /// Draw `text` at the current cursor position, advancing it.
    fn render_text(&mut self, ctx: &mut Self::Ctx, text: &str);

    /// Move the cursor by `pixels` (signed) without drawing anything.
    fn render_offset(&mut self, ctx: &mut Self::Ctx, pixels: i32);

    /// Switch the active alignment section the cursor writes into.
    fn change_alignment(&mut self, ctx: &mut Self::Ctx, alignment: crate::color::Alignment);

    /// Current cursor position, in pixels, within the active alignment
    /// section.
    fn get_x(&self, ctx: &Self::Ctx) -> f64;

    /// The pixel origin of `alignment`'s section.
    fn get_alignment_start(&self, alignment: crate::color::Alignment) -> f64;
}
