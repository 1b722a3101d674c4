//! The typed element stream the format parser produces and the dispatcher
//! replays. One enum, one variant per format primitive, exhaustively
//! matched downstream — mirrors the shape of [`crate::ipc::framing::Frame`].

use crate::color::{Activation, Alignment, Attribute, Color, ControlTag, Extent, MouseButton};

/// A single parsed unit of a format string: either a run of literal text or
/// one tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Literal text to be drawn as-is.
    Text(String),
    /// A parsed escape tag.
    Tag(TagData),
}

/// The payload of one `%{...}` tag. Each variant carries only what that tag
/// needs; the dispatcher matches exhaustively so a new tag type is a
/// compile error everywhere it isn't handled.
#[derive(Debug, Clone, PartialEq)]
pub enum TagData {
    /// `B<color>` — background color.
    SetBg(Color),
    /// `F<color>` — foreground color.
    SetFg(Color),
    /// `u<color>` — underline color.
    SetUl(Color),
    /// `o<color>` — overline color.
    SetOl(Color),
    /// `T<index>` — font selection, `0` meaning "reset to default".
    SetFont(u32),
    /// `O<signed>[unit]` — cursor offset.
    Offset(Extent),
    /// `R` — swap foreground and background.
    Reverse,
    /// `l`/`c`/`r` — switch the active alignment section.
    Alignment(Alignment),
    /// `+c`/`-c`/`!c` — change one attribute's activation state.
    Attr(Activation, Attribute),
    /// `P<c>` — a control verb.
    Control(ControlTag),
    /// `A[n]:cmd:` — open an action region for a button.
    ActionOpen {
        /// Button this region responds to.
        button: MouseButton,
        /// Raw command string associated with the region (an escaped-colon
        /// literal, or a `#module.action[.data]` reference).
        command: String,
    },
    /// `A[n]` (no command) — close the innermost matching open region.
    ActionClose {
        /// `Some` when the close names an explicit button; `None` matches
        /// the innermost open region regardless of button.
        button: Option<MouseButton>,
    },
}
