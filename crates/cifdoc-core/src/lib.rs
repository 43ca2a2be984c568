//! # cifdoc Core
//!
//! A parser and order-preserving document model for the Crystallographic
//! Information File (CIF 1.1) format.
//!
//! Parsing produces a [`Document`] of data [`Block`]s. Each block maps
//! case-insensitive tags to their values, groups looped tags into tables and
//! remembers the order items were written in, so a document serializes back
//! to equivalent CIF.
//!
//! ## Quick Start
//!
//! ```rust
//! use cifdoc_core::parse;
//!
//! let input = "data_nacl\n_cell_length_a 5.6402(1)\nloop_\n_atom_site_label\n_atom_site_occupancy\nNa 1\nCl 1\n";
//! let doc = parse(input).unwrap();
//! let block = doc.get("NaCl").unwrap();
//!
//! let a = block.get("_Cell_Length_A").unwrap();
//! assert_eq!(a.number(0), Some((5.6402, 0.0001)));
//! assert_eq!(block.loop_tags("_atom_site_label").unwrap().len(), 2);
//! ```
//!
//! ## Errors
//!
//! Parsing stops at the first problem and reports it with its line and column:
//!
//! ```rust
//! use cifdoc_core::{parse, ParseErrorKind};
//!
//! let err = parse("data_x\nloop_\n_a\n_b\n1 2 3\n").unwrap_err();
//! assert_eq!(err.kind, ParseErrorKind::LoopCardinality);
//! assert_eq!(err.position.unwrap().line, 2);
//! ```
//!
//! ## Logging
//!
//! Progress is reported through `tracing` under the `cifdoc` target when a
//! [`Logger`] is passed to [`Parser::with_logger`].

pub mod block;
pub mod builder;
pub mod document;
pub mod error;
pub mod format;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod span;
pub mod value;

use std::path::Path;

pub use block::{Block, Item, ItemIndex, ItemPosition, Loop, LoopId, Pair};
pub use document::Document;
pub use error::{DocumentError, ParseError, ParseErrorKind, ReadError};
pub use format::FormatOptions;
pub use logging::{Logger, Verbosity};
pub use parser::{Actions, Parser};
pub use value::Datavalue;

/// Parse CIF text with default settings.
#[inline]
pub fn parse(input: &str) -> Result<Document, ParseError> {
    Parser::new().parse(input)
}

/// Read and parse a CIF file, recording its path as the document source.
///
/// Bytes that are not valid UTF-8 are replaced before parsing; outside text
/// fields they are rejected by the grammar.
pub fn read_file(path: impl AsRef<Path>) -> Result<Document, ReadError> {
    read_file_with(&Parser::new(), path)
}

/// Read and parse a CIF file with a configured parser.
pub fn read_file_with(parser: &Parser, path: impl AsRef<Path>) -> Result<Document, ReadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ReadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let parser = parser.clone().with_source(path.display().to_string());
    Ok(parser.parse(&text)?)
}
