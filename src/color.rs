//! Color, extent, attribute, alignment and button primitives shared by the
//! format parser, dispatcher and drawtypes.

use thiserror::Error;

/// A parsed color value.
///
/// Internally stored as premultiplied ARGB (`0xAARRGGBB`) exactly as the
/// source computes it, so blending downstream never has to special-case
/// alpha separately from the RGB channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    /// Explicit "go back to whatever the surrounding context had".
    #[default]
    Reset,
    /// Premultiplied ARGB.
    Rgba(u32),
}

/// Error returned when a color escape cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    /// Saw a `#` with no hex digits, or digits that aren't valid hex.
    #[error("invalid color literal: {0:?}")]
    InvalidHex(String),
    /// Hex literal had a length other than 3, 4, 6 or 8 digits.
    #[error("unsupported color digit count ({0}) in {1:?}")]
    BadDigitCount(usize, String),
}

impl Color {
    /// Parse a color token as it appears inside a format tag: `#RGB`,
    /// `#RGBA`, `#RRGGBB`, `#AARRGGBB`, `-`, or empty (both mean reset).
    pub fn parse(raw: &str) -> Result<Self, ColorError> {
        if raw.is_empty() || raw == "-" {
            return Ok(Color::Reset);
        }
        let hex = raw.strip_prefix('#').ok_or_else(|| ColorError::InvalidHex(raw.to_string()))?;
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::InvalidHex(raw.to_string()));
        }
        let argb = match hex.len() {
            3 => {
                let r = expand_nibble(hex, 0)?;
                let g = expand_nibble(hex, 1)?;
                let b = expand_nibble(hex, 2)?;
                0xFF00_0000 | (r << 16) | (g << 8) | b
            }
            4 => {
                let a = expand_nibble(hex, 0)?;
                let r = expand_nibble(hex, 1)?;
                let g = expand_nibble(hex, 2)?;
                let b = expand_nibble(hex, 3)?;
                (a << 24) | (r << 16) | (g << 8) | b
            }
            6 => {
                let rgb = u32::from_str_radix(hex, 16)
                    .map_err(|_| ColorError::InvalidHex(raw.to_string()))?;
                0xFF00_0000 | rgb
            }
            8 => u32::from_str_radix(hex, 16).map_err(|_| ColorError::InvalidHex(raw.to_string()))?,
            n => return Err(ColorError::BadDigitCount(n, raw.to_string())),
        };
        Ok(Color::Rgba(premultiply(argb)))
    }

    /// Alpha channel, `0xFF` for opaque (3- and 6-digit literals always
    /// produce this).
    pub fn alpha(self) -> u8 {
        match self {
            Color::Reset => 0,
            Color::Rgba(v) => (v >> 24) as u8,
        }
    }
}

/// Expand a single hex nibble at `index` in `hex` to a full byte (`f` → `ff`).
fn expand_nibble(hex: &str, index: usize) -> Result<u32, ColorError> {
    let c = hex.as_bytes()[index] as char;
    let v = c.to_digit(16).ok_or_else(|| ColorError::InvalidHex(hex.to_string()))?;
    Ok(v * 17) // 0xf * 17 == 0xff
}

/// Premultiply RGB channels by alpha, matching the source's internal
/// representation (`include/utils/color.hpp`).
fn premultiply(argb: u32) -> u32 {
    let a = (argb >> 24) & 0xFF;
    if a == 0xFF {
        return argb;
    }
    let r = (argb >> 16) & 0xFF;
    let g = (argb >> 8) & 0xFF;
    let b = argb & 0xFF;
    let mul = |c: u32| (c * a) / 255;
    (a << 24) | (mul(r) << 16) | (mul(g) << 8) | mul(b)
}

/// A physical unit for an [`Offset`](crate::element::TagData::Offset) or a
/// drawtype dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Device pixels.
    Pixel,
    /// Typographic points, converted to pixels at render time.
    Point,
}

/// A dimension paired with its unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    /// Magnitude, in `unit`.
    pub value: f32,
    /// Unit `value` is expressed in.
    pub unit: Unit,
}

impl Extent {
    /// Convert to device pixels given a DPI, rounding to the nearest pixel.
    ///
    /// `px = pt * dpi / 72`, per spec.
    pub fn to_pixels(self, dpi: f32) -> i32 {
        match self.unit {
            Unit::Pixel => self.value.round() as i32,
            Unit::Point => (self.value * dpi / 72.0).round() as i32,
        }
    }
}

bitflags::bitflags! {
    /// Text decoration bits. Combinable (underline + overline together).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Attribute: u8 {
        /// Underline.
        const UNDERLINE = 0b01;
        /// Overline.
        const OVERLINE = 0b10;
    }
}

/// How an [`Attribute`] bit should be changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Turn the attribute on.
    On,
    /// Turn the attribute off.
    Off,
    /// Flip the attribute's current state.
    Toggle,
}

/// One of the three logical layout slots a bar composites modules into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Alignment {
    /// Left-anchored slot.
    Left,
    /// Center slot.
    Center,
    /// Right-anchored slot.
    Right,
}

/// All alignments, in the fixed left/center/right rendering order (§4.8).
pub const ALIGNMENTS: [Alignment; 3] = [Alignment::Left, Alignment::Center, Alignment::Right];

/// A pointer button or scroll direction, encoded 0..8 as in the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// No button (used as a "no hint" sentinel for action closes).
    None = 0,
    /// Primary button.
    Left = 1,
    /// Middle/wheel-click button.
    Middle = 2,
    /// Secondary button.
    Right = 3,
    /// Scroll wheel up.
    ScrollUp = 4,
    /// Scroll wheel down.
    ScrollDown = 5,
    /// Double left click.
    DoubleLeft = 6,
    /// Double middle click.
    DoubleMiddle = 7,
    /// Double right click.
    DoubleRight = 8,
}

impl MouseButton {
    /// Parse a 1-based button id as it appears in an `A<n>:` tag (1..8,
    /// with the bare `A` form defaulting to `Left`).
    pub fn from_tag_index(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Left),
            2 => Some(Self::Middle),
            3 => Some(Self::Right),
            4 => Some(Self::ScrollUp),
            5 => Some(Self::ScrollDown),
            6 => Some(Self::DoubleLeft),
            7 => Some(Self::DoubleMiddle),
            8 => Some(Self::DoubleRight),
            _ => None,
        }
    }

    /// True for the three double-click variants.
    pub fn is_double_click(self) -> bool {
        matches!(self, Self::DoubleLeft | Self::DoubleMiddle | Self::DoubleRight)
    }

    /// The single-click variant this double-click button "falls back to"
    /// when debounce decides a second click never arrived.
    pub fn single_click_equivalent(self) -> Self {
        match self {
            Self::DoubleLeft => Self::Left,
            Self::DoubleMiddle => Self::Middle,
            Self::DoubleRight => Self::Right,
            other => other,
        }
    }
}

/// A control-tag verb (`P<c>` escapes). Only `ResetAll` is defined today;
/// the type exists so future verbs are a non-breaking addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlTag {
    /// Reset every stack (color/attribute/font) to its initial state.
    ResetAll,
}
