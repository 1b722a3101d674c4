//! A presentation fragment with token substitution, padding and truncation
//! (spec §3 "Label").

use std::collections::HashMap;

use crate::color::{Alignment, Color};

/// One `%name%`-style placeholder inside a label's text, with an optional
/// width policy (spec §3 "Token").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The literal placeholder, including its surrounding `%`s (e.g. `"%title%"`).
    pub name: String,
    /// Left-pad the replacement to this many characters if shorter. `0`
    /// means no minimum.
    pub min: usize,
    /// Truncate the replacement (and append `suffix`) if longer than this
    /// many characters. `0` means no maximum.
    pub max: usize,
    /// Appended after truncating to `max`.
    pub suffix: String,
}

/// A padded, colored, token-interpolated text fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    /// Raw text, containing zero or more token placeholders.
    pub text: String,
    /// Foreground color (`Reset` = inherit).
    pub fg: Color,
    /// Background color.
    pub bg: Color,
    /// Underline color.
    pub ul: Color,
    /// Overline color.
    pub ol: Color,
    /// Font index, `0` = default.
    pub font: u32,
    /// `(left, right)` padding, drawn inside any color tags.
    pub padding: (u16, u16),
    /// `(left, right)` margin, drawn outside any color tags.
    pub margin: (u16, u16),
    /// Left-pad (per `alignment`) the rendered text to this many
    /// characters. `0` disables.
    pub min_len: usize,
    /// Truncate the rendered text to this many characters. `0` disables.
    pub max_len: usize,
    /// Whether truncation appends an ellipsis within the `max_len` budget.
    pub ellipsis: bool,
    /// How extra space from `min_len` padding is distributed.
    pub alignment: Alignment,
    /// Token placeholders recognized in `text`.
    pub tokens: Vec<Token>,
}

impl Default for Label {
    fn default() -> Self {
        Self {
            text: String::new(),
            fg: Color::Reset,
            bg: Color::Reset,
            ul: Color::Reset,
            ol: Color::Reset,
            font: 0,
            padding: (0, 0),
            margin: (0, 0),
            min_len: 0,
            max_len: 0,
            ellipsis: true,
            alignment: Alignment::Left,
            tokens: Vec::new(),
        }
    }
}

impl Label {
    /// A label with only `text` set, everything else defaulted.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    /// Pure token substitution + min/max padding, no side effects (spec §3:
    /// "performs token substitution without side effects, then applies
    /// min/max padding"). Calling this twice with the same `values` (that
    /// never re-introduce a token's own placeholder text) is idempotent.
    pub fn render(&self, values: &HashMap<String, String>) -> String {
        let mut out = self.text.clone();
        for token in &self.tokens {
            let Some(raw) = values.get(&token.name) else { continue };
            let mut replacement = raw.clone();
            if token.max != 0 && replacement.chars().count() > token.max {
                replacement = truncate_chars(&replacement, token.max);
                replacement.push_str(&token.suffix);
            } else if token.min != 0 && replacement.chars().count() < token.min {
                let pad = token.min - replacement.chars().count();
                replacement = " ".repeat(pad) + &replacement;
            }
            out = out.replace(&token.name, &replacement);
        }
        out = self.apply_max_len(&out);
        out = self.apply_min_len(&out);
        out
    }

    fn apply_max_len(&self, text: &str) -> String {
        if self.max_len == 0 {
            return text.to_string();
        }
        let len = text.chars().count();
        if len <= self.max_len {
            return text.to_string();
        }
        if self.ellipsis && self.max_len >= 3 {
            let keep = self.max_len - 3;
            truncate_chars(text, keep).trim_end().to_string() + "..."
        } else {
            truncate_chars(text, self.max_len)
        }
    }

    fn apply_min_len(&self, text: &str) -> String {
        let len = text.chars().count();
        if len >= self.min_len {
            return text.to_string();
        }
        let total_pad = self.min_len - len;
        match self.alignment {
            Alignment::Left => text.to_string() + &" ".repeat(total_pad),
            Alignment::Right => " ".repeat(total_pad) + text,
            Alignment::Center => {
                let left = total_pad / 2;
                let right = total_pad - left;
                " ".repeat(left) + text + &" ".repeat(right)
            }
        }
    }

    /// True if the label would render to nothing at all (no text, no
    /// tokens that could produce any).
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

fn truncate_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}
