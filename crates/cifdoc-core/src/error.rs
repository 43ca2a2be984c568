use crate::span::{line_at, Position, Span};
use std::fmt;

/// Error kinds for categorizing parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input does not match the grammar (malformed or missing value,
    /// unterminated quote or text field, stray content).
    Syntax,
    /// A loop's value count is not a multiple of its tag count.
    LoopCardinality,
    /// A construct the parser recognizes but does not handle (save frames).
    Unsupported,
    /// A tag appears more than once within a block.
    DuplicateTag,
    /// Two data blocks share a name.
    DuplicateBlock,
}

/// A parse error with location information.
///
/// Parse errors are always fatal for the input being parsed: no partial
/// document is returned alongside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Human-readable error message
    pub message: String,
    /// Error categorization
    pub kind: ParseErrorKind,
    /// Source location where the error occurred
    pub span: Option<Span>,
    /// 1-based line/column of `span.start`
    pub position: Option<Position>,
    /// The offending source line, without its line ending
    pub line: Option<String>,
}

impl ParseError {
    /// Create a parse error without location.
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            span: None,
            position: None,
            line: None,
        }
    }

    /// Create a syntax error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Syntax, message)
    }

    /// Create an error for a loop whose values do not fill whole rows.
    ///
    /// `remainder` is `total_values % columns`.
    pub fn loop_cardinality(columns: usize, remainder: usize) -> Self {
        Self::new(
            ParseErrorKind::LoopCardinality,
            format!(
                "{} too few, or {} too many values in loop.",
                columns - remainder,
                remainder
            ),
        )
    }

    /// Create an error for save frames.
    pub fn save_frame(name: &str) -> Self {
        Self::new(
            ParseErrorKind::Unsupported,
            format!("Save frames are not supported by this parser (save_{}).", name),
        )
    }

    /// Create the aggregated duplicate-tag error.
    ///
    /// Each entry is a block name and the tags repeated within it.
    pub fn duplicate_tags(duplicates: &[(String, Vec<String>)]) -> Self {
        let mut message = String::from("Duplicate tags encountered: ");
        for (block, tags) in duplicates {
            message.push_str(block);
            message.push_str(": ");
            for tag in tags {
                message.push_str(tag);
                message.push(' ');
            }
            message.push('\n');
        }
        Self::new(ParseErrorKind::DuplicateTag, message)
    }

    /// Create an error for a repeated data block name.
    pub fn duplicate_block(name: &str) -> Self {
        Self::new(
            ParseErrorKind::DuplicateBlock,
            format!("data block {} appears more than once", name),
        )
    }

    /// Attach the location `offset` in `input`, copying the offending line.
    pub fn at(mut self, input: &str, offset: usize) -> Self {
        self.span = Some(Span::point(offset as u32));
        self.position = Some(Position::locate(input, offset));
        self.line = Some(line_at(input, offset).to_string());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(pos) = self.position {
            write!(f, " at line {}, column {}", pos.line, pos.column)?;
            if let Some(line) = &self.line {
                write!(f, "\n{}\n{:>width$}", line, '^', width = pos.column as usize)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Errors raised by lookups and mutations on a parsed document.
///
/// A failing operation leaves the document unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("{0} does not exist")]
    NoSuchTag(String),
    #[error("block {0} does not exist")]
    NoSuchBlock(String),
    #[error("{0} does not exist in a loop")]
    NotInLoop(String),
    #[error("{0:?} is not a legal tag: tags start with '_' followed by at least one character")]
    IllegalTag(String),
    #[error("{0:?} is not a legal block name")]
    IllegalBlockName(String),
    #[error("{0} already exists and overwriting is disabled")]
    TagExists(String),
    #[error("block {0} already exists and overwriting is disabled")]
    BlockExists(String),
    #[error("loop length mismatch: {0}")]
    LoopLengthMismatch(String),
    #[error("{tags} tags and {values} values")]
    TagValueMismatch { tags: usize, values: usize },
    #[error("{0} is listed more than once")]
    DuplicateTag(String),
    #[error("a loop needs at least one tag")]
    EmptyLoop,
    #[error("{0} does not exist in a loop with {1}")]
    DifferentLoops(String, String),
    #[error("{value:?} is not a value of {tag}")]
    ValueNotFound { tag: String, value: String },
    #[error("values are not numeric (first value {0:?})")]
    NotNumeric(String),
}

/// Errors from reading and parsing a file.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
}
