//! Recursive-descent parser turning a raw format string into an [`Element`]
//! stream (spec §4.1).
//!
//! Mirrors `tags::parser` from the source: an incremental `has_next`/`next`
//! iterator backed by a small pending-element buffer, so a malformed tag
//! only poisons the one `next()` call that produced it.

use std::collections::HashSet;

use thiserror::Error;

use crate::color::{Activation, Alignment, Attribute, Color, ColorError, MouseButton, Unit};
use crate::element::{Element, TagData};

/// Errors the parser can report. Each is scoped to a single tag; the parser
/// remains usable after returning one (matches spec §4.1/§7: "recoverable
/// at element granularity").
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    /// The single-letter tag prefix isn't one this grammar defines.
    #[error("unrecognized tag '{tag}' (context: {context:?})")]
    UnrecognizedTag {
        /// The offending letter.
        tag: char,
        /// A short window of surrounding input.
        context: String,
    },
    /// `+c`/`-c`/`!c` named an attribute letter other than `u`/`o`.
    #[error("unrecognized attribute '{attr}' (context: {context:?})")]
    UnrecognizedAttribute {
        /// The offending letter.
        attr: char,
        /// A short window of surrounding input.
        context: String,
    },
    /// A `B`/`F`/`u`/`o`/`U` color value failed to parse.
    #[error("invalid color in tag (context: {context:?}): {source}")]
    InvalidColor {
        /// Underlying color-literal error.
        #[source]
        source: ColorError,
        /// A short window of surrounding input.
        context: String,
    },
    /// `T<index>` had a non-numeric index.
    #[error("invalid font index {value:?} (context: {context:?})")]
    InvalidFontIndex {
        /// The raw text that failed to parse as a font index.
        value: String,
        /// A short window of surrounding input.
        context: String,
    },
    /// `P<c>` named a verb other than the ones this grammar defines.
    #[error("invalid control verb '{verb}' (context: {context:?})")]
    InvalidControlVerb {
        /// The offending letter.
        verb: char,
        /// A short window of surrounding input.
        context: String,
    },
    /// `O<signed>[unit]` had an unparseable number or unit suffix.
    #[error("invalid offset {value:?} (context: {context:?})")]
    InvalidOffset {
        /// The raw text that failed to parse as an offset.
        value: String,
        /// A short window of surrounding input.
        context: String,
    },
    /// The numeric button id in an `A<n>` tag was outside `1..=8`.
    #[error("invalid button id {value:?} (context: {context:?})")]
    InvalidButtonId {
        /// The raw text that failed to parse as a button id.
        value: String,
        /// A short window of surrounding input.
        context: String,
    },
    /// Reached end of input while still inside a `%{...}` block.
    #[error("missing '}}' terminator (context: {context:?})")]
    MissingBraceTerminator {
        /// A short window of surrounding input.
        context: String,
    },
    /// An `A<n>:cmd` tag never found its closing `:`.
    #[error("missing ':' terminator in action tag (context: {context:?})")]
    MissingActionColon {
        /// A short window of surrounding input.
        context: String,
    },
    /// Two `A<n>:cmd:` opens for the same explicit button id appeared in
    /// the same `%{...}` block without an intervening close.
    #[error("button {button:?} already has an open action in this block (context: {context:?})")]
    DuplicateButtonAssignment {
        /// The button id assigned twice.
        button: u8,
        /// A short window of surrounding input.
        context: String,
    },
}

/// Incremental parser over a single format string.
#[derive(Debug)]
pub struct Parser<'a> {
    input: &'a str,
    pos: usize,
    pending: std::collections::VecDeque<Element>,
    in_block: bool,
    open_buttons_in_block: HashSet<u8>,
}

impl<'a> Parser<'a> {
    /// Build a parser over `input`. Parsing is lazy; nothing is scanned
    /// until [`next`](Self::next) is called.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            pending: std::collections::VecDeque::new(),
            in_block: false,
            open_buttons_in_block: HashSet::new(),
        }
    }

    /// Whether a call to [`next`](Self::next) would produce anything.
    pub fn has_next(&self) -> bool {
        !self.pending.is_empty() || self.pos < self.input.len()
    }

    /// Parse and return the next element (or error). Panics only if called
    /// after [`has_next`](Self::has_next) returned `false`.
    pub fn next(&mut self) -> Result<Element, ParseError> {
        if let Some(e) = self.pending.pop_front() {
            return Ok(e);
        }
        assert!(self.pos < self.input.len(), "Parser::next called with nothing left to parse");

        if self.in_block {
            return self.step_in_block();
        }
        self.step_text_or_enter_block()
    }

    /// Parse the whole remaining input, collecting errors rather than
    /// propagating the first one (useful for tests and for callers that
    /// want the full stream at once).
    pub fn parse_all(mut self) -> Vec<Result<Element, ParseError>> {
        let mut out = Vec::new();
        while self.has_next() {
            out.push(self.next());
        }
        out
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn context(&self, window: usize) -> String {
        self.context_at(self.pos, window)
    }

    /// Outside a block: accumulate text until `%{` or end of input.
    fn step_text_or_enter_block(&mut self) -> Result<Element, ParseError> {
        if self.rest().starts_with("%{") {
            self.pos += 2;
            self.in_block = true;
            self.open_buttons_in_block.clear();
            self.skip_spaces();
            return self.step_in_block();
        }

        let mut text = String::new();
        while self.pos < self.input.len() {
            if self.rest().starts_with("%{") {
                break;
            }
            let ch = self.rest().chars().next().unwrap();
            // Drop embedded control characters per §4.2 ("text elements are
            // trimmed of embedded control characters").
            if !is_stripped_control_char(ch) {
                text.push(ch);
            }
            self.pos += ch.len_utf8();
        }
        Ok(Element::Text(text))
    }

    /// Inside a `%{...}` block: skip whitespace, then either close the
    /// block or parse exactly one tag.
    fn step_in_block(&mut self) -> Result<Element, ParseError> {
        loop {
            self.skip_spaces();
            if self.pos >= self.input.len() {
                return Err(ParseError::MissingBraceTerminator { context: self.context(12) });
            }
            if self.rest().starts_with('}') {
                self.pos += 1;
                self.in_block = false;
                // Recurse into normal text scanning to produce the next
                // element (may itself be another `%{` block).
                if self.pos >= self.input.len() {
                    // Nothing left; caller's has_next() will now be false.
                    // We must still return *something* for this call, so
                    // loop back to parse whatever follows — but there is
                    // nothing, which is only reachable if has_next() lied.
                    unreachable!("has_next() guarantees more input remains");
                }
                return self.step_text_or_enter_block();
            }

            let elements = self.parse_one_tag()?;
            let mut iter = elements.into_iter();
            let first = iter.next().expect("a successfully parsed tag yields at least one element");
            for rest in iter {
                self.pending.push_back(rest);
            }
            return Ok(first);
        }
    }

    fn skip_spaces(&mut self) {
        while self.rest().starts_with(' ') {
            self.pos += 1;
        }
    }

    /// Parse exactly one tag token (up to the next space or `}`, except for
    /// `A` tags whose command body is colon-delimited and may itself
    /// contain spaces).
    fn parse_one_tag(&mut self) -> Result<Vec<Element>, ParseError> {
        let start = self.pos;
        let tag_char = self.rest().chars().next().unwrap();

        if tag_char == 'A' {
            return self.parse_action_tag();
        }

        // Every other tag is a single token delimited by space or `}`.
        let token_end = self.rest().find([' ', '}']).map(|i| start + i).unwrap_or(self.input.len());
        let token = &self.input[start..token_end];
        self.pos = token_end;
        self.interpret_simple_tag(tag_char, &token[1..], start)
    }

    fn interpret_simple_tag(&mut self, tag: char, value: &str, start: usize) -> Result<Vec<Element>, ParseError> {
        let ctx = || self.context_at(start, 12);
        match tag {
            'B' => Ok(vec![Element::Tag(TagData::SetBg(self.parse_color(value, start)?))]),
            'F' => Ok(vec![Element::Tag(TagData::SetFg(self.parse_color(value, start)?))]),
            'u' => Ok(vec![Element::Tag(TagData::SetUl(self.parse_color(value, start)?))]),
            'o' => Ok(vec![Element::Tag(TagData::SetOl(self.parse_color(value, start)?))]),
            'U' => {
                let color = self.parse_color(value, start)?;
                Ok(vec![Element::Tag(TagData::SetUl(color)), Element::Tag(TagData::SetOl(color))])
            }
            'T' => Ok(vec![Element::Tag(TagData::SetFont(self.parse_font(value, start)?))]),
            'O' => Ok(vec![Element::Tag(TagData::Offset(self.parse_offset(value, start)?))]),
            'R' => Ok(vec![Element::Tag(TagData::Reverse)]),
            'l' => Ok(vec![Element::Tag(TagData::Alignment(Alignment::Left))]),
            'c' => Ok(vec![Element::Tag(TagData::Alignment(Alignment::Center))]),
            'r' => Ok(vec![Element::Tag(TagData::Alignment(Alignment::Right))]),
            '+' | '-' | '!' if value.len() == 1 => {
                let activation = match tag {
                    '+' => Activation::On,
                    '-' => Activation::Off,
                    _ => Activation::Toggle,
                };
                let attr = match value.chars().next().unwrap() {
                    'u' => Attribute::UNDERLINE,
                    'o' => Attribute::OVERLINE,
                    other => {
                        return Err(ParseError::UnrecognizedAttribute { attr: other, context: ctx() });
                    }
                };
                Ok(vec![Element::Tag(TagData::Attr(activation, attr))])
            }
            'P' => {
                if value == "R" {
                    Ok(vec![Element::Tag(TagData::Control(crate::color::ControlTag::ResetAll))])
                } else {
                    let verb = value.chars().next().unwrap_or('\0');
                    Err(ParseError::InvalidControlVerb { verb, context: ctx() })
                }
            }
            other => Err(ParseError::UnrecognizedTag { tag: other, context: ctx() }),
        }
    }

    /// A short, char-boundary-safe window of input around `start`, for
    /// error messages. Never panics regardless of `start`/`window`.
    fn context_at(&self, start: usize, window: usize) -> String {
        let start = start.min(self.input.len());
        let lo = nearest_char_boundary_back(self.input, start.saturating_sub(window));
        let hi = nearest_char_boundary_fwd(self.input, (self.pos + window).min(self.input.len()));
        self.input[lo..hi].to_string()
    }

    fn parse_color(&self, value: &str, start: usize) -> Result<Color, ParseError> {
        Color::parse(value).map_err(|source| ParseError::InvalidColor { source, context: self.context_at(start, 12) })
    }

    fn parse_font(&self, value: &str, start: usize) -> Result<u32, ParseError> {
        if value.is_empty() || value == "-" || value.starts_with("-") {
            return Ok(0);
        }
        value.parse::<u32>().map_err(|_| ParseError::InvalidFontIndex { value: value.to_string(), context: self.context_at(start, 12) })
    }

    fn parse_offset(&self, value: &str, start: usize) -> Result<crate::color::Extent, ParseError> {
        let (number_part, unit) = if let Some(stripped) = value.strip_suffix("px") {
            (stripped, Unit::Pixel)
        } else if let Some(stripped) = value.strip_suffix("pt") {
            (stripped, Unit::Point)
        } else {
            (value, Unit::Pixel)
        };
        let magnitude: f32 = number_part
            .parse()
            .map_err(|_| ParseError::InvalidOffset { value: value.to_string(), context: self.context_at(start, 12) })?;
        Ok(crate::color::Extent { value: magnitude, unit })
    }

    /// `A[n]:cmd:` (open, cmd may contain `\:`) or `A[n]` (close).
    fn parse_action_tag(&mut self) -> Result<Vec<Element>, ParseError> {
        let start = self.pos;
        self.pos += 1; // consume 'A'

        let digit_start = self.pos;
        while self.rest().chars().next().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits = &self.input[digit_start..self.pos];
        let button_num: u8 = if digits.is_empty() {
            1
        } else {
            match digits.parse::<u8>() {
                Ok(n) => n,
                Err(_) => {
                    return Err(ParseError::InvalidButtonId { value: digits.to_string(), context: self.context_at(start, 12) });
                }
            }
        };
        let button = MouseButton::from_tag_index(button_num)
            .ok_or_else(|| ParseError::InvalidButtonId { value: button_num.to_string(), context: self.context_at(start, 12) })?;

        if self.rest().starts_with(':') {
            self.pos += 1; // consume opening ':'
            let cmd_start = self.pos;
            let mut cmd = String::new();
            let mut closed = false;
            let bytes = self.input.as_bytes();
            while self.pos < bytes.len() {
                let ch = self.rest().chars().next().unwrap();
                if ch == '\\' && self.input[self.pos..].get(1..2) == Some(":") {
                    cmd.push(':');
                    self.pos += 2;
                    continue;
                }
                if ch == ':' {
                    self.pos += 1;
                    closed = true;
                    break;
                }
                cmd.push(ch);
                self.pos += ch.len_utf8();
            }
            if !closed {
                self.pos = cmd_start; // don't consume past the offending tag
                return Err(ParseError::MissingActionColon { context: self.context_at(start, 12) });
            }
            if !self.open_buttons_in_block.insert(button_num) {
                return Err(ParseError::DuplicateButtonAssignment { button: button_num, context: self.context_at(start, 12) });
            }
            Ok(vec![Element::Tag(TagData::ActionOpen { button, command: cmd })])
        } else {
            // Close form: either bare `A` (no hint) or `A<n>` (explicit button).
            let hint = if digits.is_empty() { None } else { Some(button) };
            if let Some(b) = hint {
                self.open_buttons_in_block.remove(&button_num);
                let _ = b;
            }
            Ok(vec![Element::Tag(TagData::ActionClose { button: hint })])
        }
    }
}

fn nearest_char_boundary_back(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn nearest_char_boundary_fwd(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Soft hyphens and bidi control marks stripped from literal text per §4.2.
fn is_stripped_control_char(c: char) -> bool {
    matches!(c, '\u{00AD}' | '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}')
}
