//! CIF serialization.
//!
//! Output re-parses to the same blocks, tags, values and loop groupings.
//! Values are written bare when the grammar allows it, otherwise single- or
//! double-quoted, and as `;` text fields when they span lines or contain
//! characters a quoted string cannot hold.

use std::borrow::Cow;
use std::fmt;

use crate::block::{Block, Item, Loop, Pair};
use crate::document::Document;
use crate::lexer::{is_any_print, is_nonblank, Reserved};

/// Serialization settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// Align scalar values and loop columns, and indent loop bodies.
    pub pretty: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl FormatOptions {
    pub const COMPACT: FormatOptions = FormatOptions { pretty: false };
}

/// A value ready to be written.
enum Token<'v> {
    /// Fits on the current line.
    Inline(Cow<'v, str>),
    /// Must be written as a `;` text field.
    TextField(&'v str),
}

impl Token<'_> {
    fn width(&self) -> usize {
        match self {
            Token::Inline(text) => text.len(),
            Token::TextField(_) => 0,
        }
    }
}

fn can_be_bare(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| is_nonblank(b))
        && !matches!(
            bytes.first(),
            None | Some(b'_' | b'#' | b'$' | b'\'' | b'"' | b';' | b'[' | b']')
        )
        && Reserved::prefix_of(bytes).is_none()
}

/// A quoted string ends at a quote followed by whitespace or `#`, so the
/// value must not contain that sequence.
fn can_quote(bytes: &[u8], quote: u8) -> bool {
    bytes
        .windows(2)
        .all(|w| !(w[0] == quote && matches!(w[1], b' ' | b'\t' | b'#')))
}

fn tokenize(value: &str) -> Token<'_> {
    let bytes = value.as_bytes();
    if bytes.is_empty() {
        return Token::Inline(Cow::Borrowed("''"));
    }
    if !bytes.iter().all(|&b| is_any_print(b)) {
        return Token::TextField(value);
    }
    if can_be_bare(bytes) {
        return Token::Inline(Cow::Borrowed(value));
    }
    for quote in ['\'', '"'] {
        if can_quote(bytes, quote as u8) {
            return Token::Inline(Cow::Owned(format!("{quote}{value}{quote}")));
        }
    }
    Token::TextField(value)
}

/// The CIF spelling of a single value.
///
/// # Example
///
/// ```rust
/// use cifdoc_core::format::format_value;
///
/// assert_eq!(format_value("1.23(4)"), "1.23(4)");
/// assert_eq!(format_value("P 21/c"), "'P 21/c'");
/// assert_eq!(format_value("two\nlines"), "\n;two\nlines\n;");
/// ```
pub fn format_value(value: &str) -> Cow<'_, str> {
    match tokenize(value) {
        Token::Inline(text) => text,
        Token::TextField(text) => Cow::Owned(format!("\n;{}\n;", text)),
    }
}

fn push_token(out: &mut String, token: &Token<'_>) {
    match token {
        Token::Inline(text) => out.push_str(text),
        Token::TextField(text) => {
            out.push_str("\n;");
            out.push_str(text);
            out.push_str("\n;");
        }
    }
}

fn pad(out: &mut String, n: usize) {
    out.extend(std::iter::repeat(' ').take(n));
}

fn write_pair(out: &mut String, pair: &Pair<'_>, tag_width: usize, options: &FormatOptions) {
    let value = match pair.value.len() {
        0 => Token::Inline(Cow::Borrowed("?")),
        _ => tokenize(pair.value.first().unwrap_or_default()),
    };
    out.push_str(pair.tag);
    if let Token::Inline(_) = value {
        if options.pretty {
            pad(out, tag_width.saturating_sub(pair.tag.len()));
        }
        out.push(' ');
    }
    push_token(out, &value);
    out.push('\n');
}

fn write_columns<'v>(
    out: &mut String,
    tags: &[&str],
    columns: &[Vec<Token<'v>>],
    options: &FormatOptions,
) {
    let indent = if options.pretty { " " } else { "" };
    out.push_str("loop_\n");
    for tag in tags {
        out.push_str(indent);
        out.push_str(tag);
        out.push('\n');
    }

    let rows = columns.first().map_or(0, Vec::len);
    if rows == 0 {
        out.push_str("stop_\n");
        return;
    }

    let widths: Vec<usize> = columns
        .iter()
        .map(|cells| cells.iter().map(Token::width).max().unwrap_or(0))
        .collect();
    let last = columns.len() - 1;
    for row in 0..rows {
        out.push_str(indent);
        for (j, cells) in columns.iter().enumerate() {
            let Some(cell) = cells.get(row) else {
                continue;
            };
            if j > 0 {
                out.push(' ');
            }
            push_token(out, cell);
            if options.pretty && j < last {
                pad(out, widths[j].saturating_sub(cell.width()));
            }
        }
        out.push('\n');
    }
}

fn write_loop(out: &mut String, lp: &Loop<'_>, options: &FormatOptions) {
    let tags: Vec<&str> = lp.tags().collect();
    let rows = lp.row_count();
    let columns: Vec<Vec<Token<'_>>> = lp
        .columns()
        .map(|(_, value)| {
            (0..rows)
                .map(|row| tokenize(value.get(row).unwrap_or("?")))
                .collect()
        })
        .collect();
    write_columns(out, &tags, &columns, options);
}

/// Append `block` to `out` as a `data_` section.
pub fn write_block(out: &mut String, block: &Block, options: &FormatOptions) {
    out.push_str("data_");
    out.push_str(block.name());
    out.push('\n');

    let tag_width = block
        .items()
        .filter_map(|item| match item {
            Item::Pair(pair) if pair.value.len() <= 1 => Some(pair.tag.len()),
            _ => None,
        })
        .max()
        .unwrap_or(0);

    let mut previous_was_loop = false;
    for item in block.items() {
        match item {
            Item::Pair(pair) if pair.value.len() > 1 => {
                // several values under one scalar tag only fit in a loop
                if options.pretty {
                    out.push('\n');
                }
                let column: Vec<Token<'_>> = pair.value.iter().map(|s| tokenize(s)).collect();
                write_columns(out, &[pair.tag], &[column], options);
                previous_was_loop = true;
            }
            Item::Pair(pair) => {
                if options.pretty && previous_was_loop {
                    out.push('\n');
                }
                write_pair(out, &pair, tag_width, options);
                previous_was_loop = false;
            }
            Item::Loop(lp) => {
                if options.pretty {
                    out.push('\n');
                }
                write_loop(out, &lp, options);
                previous_was_loop = true;
            }
        }
    }
}

/// Append every block of `document` to `out`, separated by blank lines.
pub fn write_document(out: &mut String, document: &Document, options: &FormatOptions) {
    for (i, block) in document.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write_block(out, block, options);
    }
}

impl Block {
    pub fn to_cif_string(&self, options: &FormatOptions) -> String {
        let mut out = String::new();
        write_block(&mut out, self, options);
        out
    }
}

impl Document {
    pub fn to_cif_string(&self, options: &FormatOptions) -> String {
        let mut out = String::new();
        write_document(&mut out, self, options);
        out
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cif_string(&FormatOptions::default()))
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cif_string(&FormatOptions::default()))
    }
}
