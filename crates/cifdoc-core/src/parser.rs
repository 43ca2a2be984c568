//! Recursive-descent CIF parser.
//!
//! The grammar does not build a parse tree. As each production matches it
//! fires a hook on an [`Actions`] implementation; [`DocumentBuilder`] is the
//! one that assembles a [`Document`]. Any failure aborts the parse.
//!
//! ```text
//! file       = [ws] [datablock [ws]]+ EOF        (empty input is allowed)
//! datablock  = DATA code ws_or_eof (pair | loop | saveframe)*
//! pair       = tag ws value ws_or_eof
//! loop       = LOOP ws (tag ws)+ ((value ws_or_eof)+ | &(reserved | EOF)) [STOP ws_or_eof]
//! saveframe  = SAVE code ws (pair | loop)* SAVE ws_or_eof
//! ```

use crate::builder::DocumentBuilder;
use crate::document::Document;
use crate::error::ParseError;
use crate::lexer::{Cursor, Reserved, Value};
use crate::logging::{Logger, Verbosity};

/// Hooks fired by the grammar as productions match.
///
/// Fallible hooks return an error without location; the grammar attaches the
/// position of the production that fired them.
pub trait Actions<'a> {
    /// A `data_` heading was matched.
    fn block_code(&mut self, name: &'a str) -> Result<(), ParseError>;

    /// A `save_` heading was matched. Save frames are rejected unless overridden.
    fn save_frame_heading(&mut self, name: &'a str) -> Result<(), ParseError> {
        Err(ParseError::save_frame(name))
    }

    /// The tag of a scalar pair.
    fn item_tag(&mut self, tag: &'a str);

    /// The value of the most recent scalar pair.
    fn item_value(&mut self, value: Value<'a>);

    /// `loop_` was matched.
    fn loop_start(&mut self);

    fn loop_tag(&mut self, tag: &'a str);

    fn loop_value(&mut self, value: Value<'a>);

    /// The loop, including any `stop_`, has been fully matched.
    fn loop_end(&mut self) -> Result<(), ParseError>;
}

/// CIF parser with builder-style configuration.
///
/// # Example
///
/// ```rust
/// use cifdoc_core::Parser;
///
/// let doc = Parser::new().parse("data_x\n_a 1\n_b 2\n").unwrap();
/// let block = doc.get("x").unwrap();
/// assert_eq!(block.get("_a").unwrap().strings(), ["1"]);
/// ```
#[derive(Debug, Clone)]
pub struct Parser {
    logger: Logger,
    overwrite: bool,
    source: Option<String>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    #[inline]
    pub fn new() -> Self {
        Self {
            logger: Logger::silent(),
            overwrite: true,
            source: None,
        }
    }

    /// Report parse progress through `logger`.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Whether blocks of the parsed document allow overwriting existing tags.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Name recorded as the document's source, usually a file path.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Parse `input` into a document.
    ///
    /// Fails on the first syntax, loop-cardinality or save-frame error, and
    /// after a successful match if any block repeats a tag.
    pub fn parse(&self, input: &str) -> Result<Document, ParseError> {
        let source = self.source.as_deref().unwrap_or("<input>");
        self.logger.log(
            Verbosity::Some,
            &format!("parsing {} ({} bytes)", source, input.len()),
        );

        let mut builder = DocumentBuilder::new(self.logger, self.overwrite);
        self.parse_with(input, &mut builder)?;
        let mut document = builder.finish()?;
        if let Some(source) = &self.source {
            document.set_source(source.clone());
        }

        self.logger.log(
            Verbosity::Some,
            &format!("parsed {} ({} blocks)", source, document.len()),
        );
        Ok(document)
    }

    /// Run the grammar over `input`, firing `actions` as productions match.
    pub fn parse_with<'a, A: Actions<'a>>(
        &self,
        input: &'a str,
        actions: &mut A,
    ) -> Result<(), ParseError> {
        Grammar {
            cursor: Cursor::new(input),
            actions,
        }
        .file()
    }
}

struct Grammar<'a, 'b, A> {
    cursor: Cursor<'a>,
    actions: &'b mut A,
}

impl<'a, 'b, A: Actions<'a>> Grammar<'a, 'b, A> {
    fn file(&mut self) -> Result<(), ParseError> {
        self.cursor.skip_whitespace();
        if self.cursor.is_eof() {
            return Ok(());
        }

        let mut blocks = 0usize;
        while self.datablock()? {
            blocks += 1;
            self.cursor.skip_whitespace();
        }

        if self.cursor.is_eof() {
            Ok(())
        } else if blocks == 0 {
            Err(self.error("Expected a data block heading (data_<name>)."))
        } else {
            Err(self.error("Unexpected input: expected a tag, loop_, data_<name> or end of file."))
        }
    }

    fn datablock(&mut self) -> Result<bool, ParseError> {
        let start = self.cursor.offset();
        if !self.cursor.eat_reserved(Reserved::Data) {
            return Ok(false);
        }
        let Some(name) = self.cursor.block_code() else {
            self.cursor.reset(start);
            return Ok(false);
        };
        let input = self.cursor.input();
        self.actions
            .block_code(name)
            .map_err(|e| e.at(input, start))?;
        if !self.cursor.ws_or_eof() {
            return Err(self.error("Expected whitespace after data block heading."));
        }

        loop {
            if self.pair()? || self.loop_()? || self.save_frame()? {
                continue;
            }
            break;
        }
        Ok(true)
    }

    fn pair(&mut self) -> Result<bool, ParseError> {
        let Some(tag) = self.cursor.tag() else {
            return Ok(false);
        };
        self.actions.item_tag(tag);
        if !self.cursor.skip_whitespace() {
            return Err(self.error("Expected whitespace after tag."));
        }
        match self.cursor.value()? {
            Some(value) => self.actions.item_value(value),
            None => return Err(self.error("Malformed or missing value.")),
        }
        if !self.cursor.ws_or_eof() {
            return Err(self.error("Expected whitespace after value."));
        }
        Ok(true)
    }

    fn loop_(&mut self) -> Result<bool, ParseError> {
        let start = self.cursor.offset();
        if !self.cursor.eat_reserved(Reserved::Loop) {
            return Ok(false);
        }
        if !self.cursor.skip_whitespace() {
            self.cursor.reset(start);
            return Ok(false);
        }
        self.actions.loop_start();

        let mut tags = 0usize;
        while let Some(tag) = self.cursor.tag() {
            self.actions.loop_tag(tag);
            tags += 1;
            if !self.cursor.skip_whitespace() {
                return Err(self.error("Expected whitespace after loop tag."));
            }
        }
        if tags == 0 {
            return Err(self.error("Expected at least one tag after loop_."));
        }

        let mut values = 0usize;
        while let Some(value) = self.cursor.value()? {
            self.actions.loop_value(value);
            values += 1;
            if !self.cursor.ws_or_eof() {
                return Err(self.error("Expected whitespace after loop value."));
            }
        }
        // an empty loop is tolerated only before a reserved word or end of file
        if values == 0 && !self.cursor.is_eof() && self.cursor.reserved().is_none() {
            return Err(self.error("Malformed or missing loop value."));
        }

        let before_stop = self.cursor.offset();
        if self.cursor.eat_reserved(Reserved::Stop) && !self.cursor.ws_or_eof() {
            self.cursor.reset(before_stop);
        }

        let input = self.cursor.input();
        self.actions.loop_end().map_err(|e| e.at(input, start))?;
        Ok(true)
    }

    fn save_frame(&mut self) -> Result<bool, ParseError> {
        let start = self.cursor.offset();
        if !self.cursor.eat_reserved(Reserved::Save) {
            return Ok(false);
        }
        let Some(name) = self.cursor.block_code() else {
            self.cursor.reset(start);
            return Ok(false);
        };
        let input = self.cursor.input();
        self.actions
            .save_frame_heading(name)
            .map_err(|e| e.at(input, start))?;

        if !self.cursor.skip_whitespace() {
            return Err(self.error("Expected whitespace after save frame heading."));
        }
        while self.pair()? || self.loop_()? {}
        if !self.cursor.eat_reserved(Reserved::Save) {
            return Err(self.error("Expected save_ to close the save frame."));
        }
        if !self.cursor.ws_or_eof() {
            return Err(self.error("Expected whitespace after save_."));
        }
        Ok(true)
    }

    #[inline]
    fn error(&self, message: &str) -> ParseError {
        ParseError::syntax(message).at(self.cursor.input(), self.cursor.offset())
    }
}
