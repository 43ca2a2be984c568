//! Byte-level scanner for CIF 1.1 terminals.
//!
//! The scanner never builds tokens ahead of the grammar: each terminal is
//! recognized on demand at the current offset, and a failed match leaves the
//! cursor where it was. Multi-line text fields and comments are located with
//! `memchr` (SIMD on supported platforms).
//!
//! # Performance
//!
//! - Zero-copy: every terminal borrows directly from the input
//! - No backtracking beyond a single terminal

use crate::error::ParseError;
use memchr::{memchr, memchr_iter};

// ============================================================================
// Character classes
// ============================================================================

/// Characters that may appear in a numeric-looking token.
///
/// Printable ASCII except `' " # $ _ ; [ ]`, space and tab.
#[inline(always)]
pub const fn is_ordinary(b: u8) -> bool {
    matches!(b, b'!' | b'%'..=b'&' | b'('..=b':' | b'<'..=b'Z' | b'\\' | b'^' | b'`'..=b'~')
}

/// Printable ASCII except space and tab.
#[inline(always)]
pub const fn is_nonblank(b: u8) -> bool {
    matches!(b, b'!'..=b'~')
}

/// Printable ASCII plus tab.
#[inline(always)]
pub const fn is_any_print(b: u8) -> bool {
    matches!(b, b' '..=b'~' | b'\t')
}

/// Space, tab, line feed or carriage return.
#[inline(always)]
pub const fn is_wschar(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

// ============================================================================
// Reserved words
// ============================================================================

/// Keywords that cannot begin an unquoted value. Matched case-insensitively
/// as prefixes, so `DATA_x` and `loop_foo` are both reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reserved {
    Data,
    Loop,
    Global,
    Save,
    Stop,
}

impl Reserved {
    const ALL: [Reserved; 5] = [
        Reserved::Data,
        Reserved::Loop,
        Reserved::Global,
        Reserved::Save,
        Reserved::Stop,
    ];

    /// The keyword in lower case, including its trailing underscore.
    #[inline]
    pub const fn keyword(self) -> &'static str {
        match self {
            Reserved::Data => "data_",
            Reserved::Loop => "loop_",
            Reserved::Global => "global_",
            Reserved::Save => "save_",
            Reserved::Stop => "stop_",
        }
    }

    /// The reserved word `bytes` starts with, if any.
    #[inline]
    pub fn prefix_of(bytes: &[u8]) -> Option<Reserved> {
        Self::ALL.into_iter().find(|word| {
            let kw = word.keyword().as_bytes();
            bytes.len() >= kw.len() && bytes[..kw.len()].eq_ignore_ascii_case(kw)
        })
    }
}

// ============================================================================
// Values
// ============================================================================

/// How a value was written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A run of ordinary characters followed by whitespace.
    Numeric,
    /// Any other bare token.
    Unquoted,
    SingleQuoted,
    DoubleQuoted,
    /// A `;`-delimited multi-line field.
    TextField,
}

/// A matched value with its delimiters removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Value<'a> {
    pub text: &'a str,
    pub kind: ValueKind,
}

// ============================================================================
// Cursor
// ============================================================================

/// Position-tracking cursor over CIF source text.
pub struct Cursor<'a> {
    input: &'a str,
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            offset: 0,
        }
    }

    #[inline(always)]
    pub fn input(&self) -> &'a str {
        self.input
    }

    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Move back to an earlier offset.
    #[inline(always)]
    pub fn reset(&mut self, offset: usize) {
        self.offset = offset;
    }

    #[inline(always)]
    pub fn is_eof(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    #[inline(always)]
    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.offset).copied()
    }

    /// Whether the cursor is at the beginning of a line.
    #[inline(always)]
    pub fn at_bol(&self) -> bool {
        self.offset == 0 || self.bytes.get(self.offset - 1) == Some(&b'\n')
    }

    /// The reserved word at the cursor, if any.
    #[inline]
    pub fn reserved(&self) -> Option<Reserved> {
        Reserved::prefix_of(self.rest())
    }

    /// Consume `word` if it is the reserved word at the cursor.
    #[inline]
    pub fn eat_reserved(&mut self, word: Reserved) -> bool {
        if self.reserved() == Some(word) {
            self.offset += word.keyword().len();
            true
        } else {
            false
        }
    }

    /// Skip whitespace and `#` comments. Returns `true` if anything was skipped.
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.offset;
        while let Some(b) = self.peek() {
            if is_wschar(b) {
                self.offset += 1;
            } else if b == b'#' {
                self.offset = match memchr(b'\n', &self.bytes[self.offset..]) {
                    Some(pos) => self.offset + pos + 1,
                    None => self.bytes.len(),
                };
            } else {
                break;
            }
        }
        self.offset > start
    }

    /// Skip whitespace, or accept end of input in its place.
    #[inline]
    pub fn ws_or_eof(&mut self) -> bool {
        self.skip_whitespace() || self.is_eof()
    }

    /// Match `_` followed by one or more non-blank characters.
    pub fn tag(&mut self) -> Option<&'a str> {
        if self.peek() != Some(b'_') {
            return None;
        }
        let start = self.offset;
        let end = self.scan(start + 1, is_nonblank);
        if end == start + 1 {
            return None;
        }
        self.offset = end;
        Some(&self.input[start..end])
    }

    /// Match the name following `data_` or `save_`.
    pub fn block_code(&mut self) -> Option<&'a str> {
        let start = self.offset;
        let end = self.scan(start, is_nonblank);
        if end == start {
            return None;
        }
        self.offset = end;
        Some(&self.input[start..end])
    }

    /// Match a value: numeric, text field, quoted or unquoted, in that order.
    ///
    /// Returns `Ok(None)` if no value starts here. An opening quote or a
    /// text-field `;` commits to that form, so an unterminated one is an error.
    pub fn value(&mut self) -> Result<Option<Value<'a>>, ParseError> {
        if let Some(value) = self.numeric() {
            return Ok(Some(value));
        }
        if let Some(value) = self.text_field()? {
            return Ok(Some(value));
        }
        match self.peek() {
            Some(quote @ (b'\'' | b'"')) => self.quoted(quote).map(Some),
            _ => Ok(self.unquoted()),
        }
    }

    fn numeric(&mut self) -> Option<Value<'a>> {
        let start = self.offset;
        let end = self.scan(start, is_ordinary);
        if end == start || !self.bytes.get(end).is_some_and(|&b| is_wschar(b)) {
            return None;
        }
        self.offset = end;
        Some(self.token(start, end, ValueKind::Numeric))
    }

    /// A text field runs from `;` at the start of a line up to the first line
    /// ending of the run that precedes the closing `;` at the start of a line.
    fn text_field(&mut self) -> Result<Option<Value<'a>>, ParseError> {
        if self.peek() != Some(b';') || !self.at_bol() {
            return Ok(None);
        }
        let start = self.offset;
        let content = start + 1;
        let bytes = self.bytes;

        for nl in memchr_iter(b'\n', &bytes[content..]).map(|p| content + p) {
            if bytes.get(nl + 1) != Some(&b';') {
                continue;
            }
            // walk back over the run of line endings before the closing `;`
            let mut end = nl;
            while end > content && matches!(bytes[end - 1], b'\n' | b'\r') {
                end -= 1;
            }
            self.offset = nl + 2;
            return Ok(Some(self.token(content, end, ValueKind::TextField)));
        }

        Err(ParseError::syntax("Unterminated text field: expected ';' at the start of a line.")
            .at(self.input, bytes.len()))
    }

    /// A quoted string ends at the matching quote followed by whitespace,
    /// `#` or end of input. Any other embedded quote is part of the value.
    fn quoted(&mut self, quote: u8) -> Result<Value<'a>, ParseError> {
        let start = self.offset;
        let content = start + 1;
        let bytes = self.bytes;
        let mut i = content;
        loop {
            match bytes.get(i) {
                Some(&b) if b == quote => {
                    let closes = match bytes.get(i + 1) {
                        None => true,
                        Some(&next) => matches!(next, b' ' | b'\n' | b'\r' | b'\t' | b'#'),
                    };
                    if closes {
                        self.offset = i + 1;
                        let kind = if quote == b'\'' {
                            ValueKind::SingleQuoted
                        } else {
                            ValueKind::DoubleQuoted
                        };
                        return Ok(self.token(content, i, kind));
                    }
                    i += 1;
                }
                Some(&b) if is_any_print(b) => i += 1,
                _ => {
                    return Err(ParseError::syntax(format!(
                        "Unterminated quoted string: expected closing {}.",
                        quote as char
                    ))
                    .at(self.input, i));
                }
            }
        }
    }

    fn unquoted(&mut self) -> Option<Value<'a>> {
        if matches!(self.peek(), Some(b'_' | b'$' | b'#')) || self.reserved().is_some() {
            return None;
        }
        let start = self.offset;
        let end = self.scan(start, is_nonblank);
        if end == start {
            return None;
        }
        self.offset = end;
        Some(self.token(start, end, ValueKind::Unquoted))
    }

    #[inline(always)]
    fn rest(&self) -> &'a [u8] {
        self.bytes.get(self.offset..).unwrap_or_default()
    }

    /// End of the run of bytes from `from` that satisfy `class`.
    #[inline(always)]
    fn scan(&self, from: usize, class: fn(u8) -> bool) -> usize {
        let run = self
            .bytes
            .get(from..)
            .unwrap_or_default()
            .iter()
            .take_while(|&&b| class(b))
            .count();
        from + run
    }

    #[inline(always)]
    fn token(&self, from: usize, to: usize, kind: ValueKind) -> Value<'a> {
        Value {
            text: &self.input[from..to],
            kind,
        }
    }
}
