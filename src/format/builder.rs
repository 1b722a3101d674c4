//! Inverse of the parser (spec §4.5): modules append typed nodes and get a
//! format-escaped string back out. No direct teacher analogue — the
//! closest shape in the teacher is `Frame::encode` (`socket/framing.rs`),
//! "typed value in, wire string out".

use std::fmt::Write as _;

use crate::color::{Alignment, Color, MouseButton};
use crate::drawtypes::label::Label;
use crate::drawtypes::progressbar::Progressbar;
use crate::drawtypes::ramp::Ramp;

/// Accumulates format-escape text for one module's render pass.
///
/// Tracks which color/font tags are currently "open" so repeated
/// `node()` calls that share a color don't each emit a redundant
/// `%{F#...}` / `%{F-}` pair (§4.5: "lazy-closing state... to minimize
/// redundant escapes").
#[derive(Debug, Default)]
pub struct Builder {
    buf: String,
    open_fg: Option<Color>,
    open_bg: Option<Color>,
}

impl Builder {
    /// A builder with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append literal text, escaping nothing (format text has no mandatory
    /// escaping outside of the `%{` sentinel, which plain module output
    /// is not expected to contain literally).
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.buf.push_str(text);
        self
    }

    /// Emit a `B<color>` tag if it differs from the last one this builder
    /// wrote (and isn't already open).
    pub fn bg(&mut self, color: Color) -> &mut Self {
        if self.open_bg != Some(color) {
            write_color_tag(&mut self.buf, 'B', color);
            self.open_bg = Some(color);
        }
        self
    }

    /// Emit an `F<color>` tag, same lazy-close discipline as [`bg`](Self::bg).
    pub fn fg(&mut self, color: Color) -> &mut Self {
        if self.open_fg != Some(color) {
            write_color_tag(&mut self.buf, 'F', color);
            self.open_fg = Some(color);
        }
        self
    }

    /// Force-close any open color tags back to reset, regardless of what
    /// was last written. Called at the end of a module's render pass.
    pub fn close_colors(&mut self) -> &mut Self {
        if self.open_fg.is_some() {
            write_color_tag(&mut self.buf, 'F', Color::Reset);
            self.open_fg = None;
        }
        if self.open_bg.is_some() {
            write_color_tag(&mut self.buf, 'B', Color::Reset);
            self.open_bg = None;
        }
        self
    }

    /// Append `±N[px|pt]` offset tag.
    pub fn offset(&mut self, pixels: i32) -> &mut Self {
        let _ = write!(self.buf, "%{{O{pixels}}}");
        self
    }

    /// Expand a [`Label`] to its attributed text, wrapping in color/font
    /// tags as the label's own fields dictate, with margin/padding applied.
    pub fn node(&mut self, label: &Label, values: &std::collections::HashMap<String, String>) -> &mut Self {
        let text = label.render(values);
        let _ = write!(self.buf, "{}", " ".repeat(label.margin.0 as usize));
        if label.bg != Color::Reset {
            write_color_tag(&mut self.buf, 'B', label.bg);
        }
        if label.fg != Color::Reset {
            write_color_tag(&mut self.buf, 'F', label.fg);
        }
        if label.ul != Color::Reset {
            write_color_tag(&mut self.buf, 'u', label.ul);
        }
        if label.ol != Color::Reset {
            write_color_tag(&mut self.buf, 'o', label.ol);
        }
        if label.font != 0 {
            let _ = write!(self.buf, "%{{T{}}}", label.font);
        }
        let _ = write!(self.buf, "{}", " ".repeat(label.padding.0 as usize));
        self.buf.push_str(&text);
        let _ = write!(self.buf, "{}", " ".repeat(label.padding.1 as usize));
        if label.font != 0 {
            self.buf.push_str("%{T-}");
        }
        if label.ol != Color::Reset {
            write_color_tag(&mut self.buf, 'o', Color::Reset);
        }
        if label.ul != Color::Reset {
            write_color_tag(&mut self.buf, 'u', Color::Reset);
        }
        if label.fg != Color::Reset {
            write_color_tag(&mut self.buf, 'F', Color::Reset);
        }
        if label.bg != Color::Reset {
            write_color_tag(&mut self.buf, 'B', Color::Reset);
        }
        let _ = write!(self.buf, "{}", " ".repeat(label.margin.1 as usize));
        self
    }

    /// Expand a [`Ramp`] at percentage `p` and append its selected frame.
    pub fn ramp(&mut self, ramp: &Ramp, p: u32, values: &std::collections::HashMap<String, String>) -> &mut Self {
        if let Some(label) = ramp.get(p) {
            self.node(label, values);
        }
        self
    }

    /// Expand a [`Progressbar`] at percentage `p` and append it.
    pub fn bar(&mut self, bar: &Progressbar, p: u32) -> &mut Self {
        self.buf.push_str(&bar.output(p));
        self
    }

    /// Open an action region: `%{A<n>:#module.action[.data]:}`.
    pub fn action(&mut self, button: MouseButton, module: &str, action: &str, data: Option<&str>) -> &mut Self {
        let n = button_tag_index(button);
        match data {
            Some(d) => {
                let _ = write!(self.buf, "%{{A{n}:#{module}.{action}.{d}:}}");
            }
            None => {
                let _ = write!(self.buf, "%{{A{n}:#{module}.{action}:}}");
            }
        }
        self
    }

    /// Close the innermost open action region: `%{A}`.
    pub fn action_close(&mut self) -> &mut Self {
        self.buf.push_str("%{A}");
        self
    }

    /// Switch the active alignment section.
    pub fn align(&mut self, alignment: Alignment) -> &mut Self {
        let tag = match alignment {
            Alignment::Left => 'l',
            Alignment::Center => 'c',
            Alignment::Right => 'r',
        };
        let _ = write!(self.buf, "%{{{tag}}}");
        self
    }

    /// Take the accumulated string, resetting the builder to empty
    /// (§4.5: "`flush()` returns and clears the buffer").
    pub fn flush(&mut self) -> String {
        self.close_colors();
        std::mem::take(&mut self.buf)
    }
}

fn write_color_tag(buf: &mut String, letter: char, color: Color) {
    match color {
        Color::Reset => {
            let _ = write!(buf, "%{{{letter}-}}");
        }
        Color::Rgba(v) => {
            let _ = write!(buf, "%{{{letter}#{v:08x}}}");
        }
    }
}

fn button_tag_index(button: MouseButton) -> u8 {
    match button {
        MouseButton::None => 1,
        MouseButton::Left => 1,
        MouseButton::Middle => 2,
        MouseButton::Right => 3,
        MouseButton::ScrollUp => 4,
        MouseButton::ScrollDown => 5,
        MouseButton::DoubleLeft => 6,
        MouseButton::DoubleMiddle => 7,
        MouseButton::DoubleRight => 8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::parser::Parser;

    #[test]
    fn text_and_color_round_trip_through_parser() {
        let mut b = Builder::new();
        b.fg(Color::parse("#ff0000").unwrap()).text("hi");
        let rendered = b.flush();
        assert!(rendered.contains("%{F#ffff0000}"));
        assert!(rendered.contains("hi"));
        assert!(rendered.ends_with("%{F-}"));
        let elements = Parser::new(&rendered).parse_all();
        assert!(elements.iter().all(Result::is_ok));
    }

    #[test]
    fn repeated_same_color_does_not_duplicate_tag() {
        let mut b = Builder::new();
        let red = Color::parse("#f00").unwrap();
        b.fg(red).text("a").fg(red).text("b");
        let out = b.flush();
        assert_eq!(out.matches("%{F#").count(), 1);
    }

    #[test]
    fn action_open_close_round_trip() {
        let mut b = Builder::new();
        b.action(MouseButton::Left, "vol", "volup", None).text("+").action_close();
        let out = b.flush();
        assert_eq!(out, "%{A1:#vol.volup:}+%{A}");
    }

    #[test]
    fn action_with_data() {
        let mut b = Builder::new();
        b.action(MouseButton::Left, "vol", "set", Some("42")).action_close();
        let out = b.flush();
        assert_eq!(out, "%{A1:#vol.set.42:}%{A}");
    }
}
