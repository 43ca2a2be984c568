//! Python bindings for the cifdoc CIF parser.

use std::collections::HashMap;

use cifdoc_core::{
    error::{DocumentError, ParseError as CoreParseError, ParseErrorKind as CoreParseErrorKind},
    span::Span as CoreSpan,
    Block, Datavalue, Document, FormatOptions, Item, Logger, Parser as CoreParser, ReadError,
};
use pyo3::exceptions::{PyKeyError, PyOSError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyList;

fn value_error(e: impl ToString) -> PyErr {
    PyValueError::new_err(e.to_string())
}

// ============================================================================
// Span
// ============================================================================

/// Source location in the input text (byte offsets).
#[pyclass(frozen, get_all, name = "Span")]
#[derive(Clone)]
pub struct PySpan {
    pub start: u32,
    pub end: u32,
}

#[pymethods]
impl PySpan {
    fn __repr__(&self) -> String {
        format!("Span({}, {})", self.start, self.end)
    }

    #[getter]
    fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }
}

impl From<CoreSpan> for PySpan {
    fn from(s: CoreSpan) -> Self {
        PySpan {
            start: s.start,
            end: s.end,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Parse error category.
#[pyclass(frozen, eq, eq_int, name = "ParseErrorKind")]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PyParseErrorKind {
    Syntax,
    LoopCardinality,
    Unsupported,
    DuplicateTag,
    DuplicateBlock,
}

impl From<CoreParseErrorKind> for PyParseErrorKind {
    fn from(k: CoreParseErrorKind) -> Self {
        match k {
            CoreParseErrorKind::Syntax => PyParseErrorKind::Syntax,
            CoreParseErrorKind::LoopCardinality => PyParseErrorKind::LoopCardinality,
            CoreParseErrorKind::Unsupported => PyParseErrorKind::Unsupported,
            CoreParseErrorKind::DuplicateTag => PyParseErrorKind::DuplicateTag,
            CoreParseErrorKind::DuplicateBlock => PyParseErrorKind::DuplicateBlock,
        }
    }
}

/// A parse error, as returned by `validate`.
#[pyclass(frozen, name = "ParseError")]
#[derive(Clone)]
pub struct PyParseError {
    #[pyo3(get)]
    pub message: String,
    #[pyo3(get)]
    pub kind: PyParseErrorKind,
    #[pyo3(get)]
    pub span: Option<PySpan>,
    /// 1-based line of the error
    #[pyo3(get)]
    pub line: Option<u32>,
    /// 1-based column of the error
    #[pyo3(get)]
    pub column: Option<u32>,
    /// The offending source line
    #[pyo3(get)]
    pub text: Option<String>,
    display: String,
}

#[pymethods]
impl PyParseError {
    fn __repr__(&self) -> String {
        format!("ParseError({:?}, {:?})", self.message, self.kind)
    }

    fn __str__(&self) -> String {
        self.display.clone()
    }
}

impl From<CoreParseError> for PyParseError {
    fn from(e: CoreParseError) -> Self {
        PyParseError {
            display: e.to_string(),
            kind: e.kind.into(),
            span: e.span.map(PySpan::from),
            line: e.position.map(|p| p.line),
            column: e.position.map(|p| p.column),
            text: e.line,
            message: e.message,
        }
    }
}

// ============================================================================
// Items
// ============================================================================

/// A tag with its value(s) outside any loop.
#[pyclass(frozen, get_all, name = "Pair")]
pub struct PyPair {
    pub tag: String,
    pub values: Vec<String>,
}

#[pymethods]
impl PyPair {
    fn __repr__(&self) -> String {
        format!("Pair({:?}, {:?})", self.tag, self.values)
    }
}

/// A loop: tags plus row-major values.
#[pyclass(frozen, get_all, name = "Loop")]
pub struct PyLoop {
    pub id: u32,
    pub tags: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[pymethods]
impl PyLoop {
    fn __repr__(&self) -> String {
        format!("Loop(id={}, tags={}, rows={})", self.id, self.tags.len(), self.rows.len())
    }

    fn __len__(&self) -> usize {
        self.rows.len()
    }
}

/// Block content kept on the Rust side for lookups and re-serialization.
enum Entry {
    Pair(String, Vec<String>),
    Loop(u32, Vec<(String, Vec<String>)>),
}

// ============================================================================
// Block
// ============================================================================

/// A data block. Tag lookups are case-insensitive.
#[pyclass(frozen, name = "Block")]
pub struct PyBlock {
    #[pyo3(get)]
    pub name: String,
    /// Pairs and loops in file order
    #[pyo3(get)]
    pub items: PyObject,
    entries: Vec<Entry>,
    /// lowercase tag -> (entry, column)
    index: HashMap<String, (usize, usize)>,
}

impl PyBlock {
    fn lookup(&self, tag: &str) -> PyResult<(&[String], Option<u32>)> {
        let &(entry, column) = self
            .index
            .get(&tag.to_ascii_lowercase())
            .ok_or_else(|| PyKeyError::new_err(tag.to_string()))?;
        Ok(match &self.entries[entry] {
            Entry::Pair(_, values) => (values, None),
            Entry::Loop(id, columns) => {
                let (_, values) = &columns[column];
                (values, Some(*id))
            }
        })
    }

    fn to_core(&self) -> Result<Block, DocumentError> {
        let mut block = Block::new(self.name.as_str())?;
        for entry in &self.entries {
            match entry {
                Entry::Pair(tag, values) => {
                    block.add_item(tag, Datavalue::from(values.clone()))?;
                }
                Entry::Loop(_, columns) => {
                    let tags: Vec<&str> = columns.iter().map(|(tag, _)| tag.as_str()).collect();
                    let values = columns
                        .iter()
                        .map(|(_, values)| Datavalue::from(values.clone()))
                        .collect();
                    block.add_items_as_loop(&tags, values)?;
                }
            }
        }
        Ok(block)
    }
}

#[pymethods]
impl PyBlock {
    /// Values of a tag. Raises KeyError if the tag is missing.
    #[pyo3(text_signature = "(self, tag)")]
    fn get(&self, tag: &str) -> PyResult<Vec<String>> {
        let (values, _) = self.lookup(tag)?;
        Ok(values.to_vec())
    }

    /// Numeric values of a tag as (value, standard uncertainty) pairs.
    ///
    /// Raises ValueError if the first value is not a number.
    #[pyo3(text_signature = "(self, tag)")]
    fn numbers(&self, tag: &str) -> PyResult<Vec<(f64, f64)>> {
        let (values, _) = self.lookup(tag)?;
        let value = Datavalue::from(values.to_vec());
        let doubles = value.doubles().map_err(value_error)?;
        let uncertainties = value.uncertainties().map_err(value_error)?;
        Ok(doubles.iter().copied().zip(uncertainties.iter().copied()).collect())
    }

    /// Id of the loop holding a tag, or None for a scalar.
    #[pyo3(text_signature = "(self, tag)")]
    fn loop_id(&self, tag: &str) -> PyResult<Option<u32>> {
        let (_, id) = self.lookup(tag)?;
        Ok(id)
    }

    /// Tags in file order, as written.
    #[getter]
    fn tags(&self) -> Vec<String> {
        let mut tags = Vec::with_capacity(self.index.len());
        for entry in &self.entries {
            match entry {
                Entry::Pair(tag, _) => tags.push(tag.clone()),
                Entry::Loop(_, columns) => tags.extend(columns.iter().map(|(tag, _)| tag.clone())),
            }
        }
        tags
    }

    /// Serialize the block as CIF text.
    #[pyo3(signature = (pretty=true), text_signature = "(self, pretty=True)")]
    fn to_cif(&self, pretty: bool) -> PyResult<String> {
        let block = self.to_core().map_err(value_error)?;
        Ok(block.to_cif_string(&FormatOptions { pretty }))
    }

    fn __getitem__(&self, tag: &str) -> PyResult<Vec<String>> {
        self.get(tag)
    }

    fn __contains__(&self, tag: &str) -> bool {
        self.index.contains_key(&tag.to_ascii_lowercase())
    }

    fn __len__(&self) -> usize {
        self.index.len()
    }

    fn __repr__(&self) -> String {
        format!("Block({:?}, tags={})", self.name, self.index.len())
    }
}

fn convert_block(py: Python<'_>, block: &Block) -> PyResult<PyBlock> {
    let items = PyList::empty(py);
    let mut entries = Vec::new();
    let mut index = HashMap::new();

    for item in block.items() {
        let position = entries.len();
        match item {
            Item::Pair(pair) => {
                let values = pair.value.strings().to_vec();
                index.insert(pair.tag.to_ascii_lowercase(), (position, 0));
                items.append(Py::new(
                    py,
                    PyPair {
                        tag: pair.tag.to_string(),
                        values: values.clone(),
                    },
                )?)?;
                entries.push(Entry::Pair(pair.tag.to_string(), values));
            }
            Item::Loop(lp) => {
                let columns: Vec<(String, Vec<String>)> = lp
                    .columns()
                    .map(|(tag, value)| (tag.to_string(), value.strings().to_vec()))
                    .collect();
                for (column, (tag, _)) in columns.iter().enumerate() {
                    index.insert(tag.to_ascii_lowercase(), (position, column));
                }
                items.append(Py::new(
                    py,
                    PyLoop {
                        id: lp.id(),
                        tags: lp.tags().map(str::to_string).collect(),
                        rows: lp
                            .rows()
                            .map(|row| row.into_iter().map(str::to_string).collect())
                            .collect(),
                    },
                )?)?;
                entries.push(Entry::Loop(lp.id(), columns));
            }
        }
    }

    Ok(PyBlock {
        name: block.name().to_string(),
        items: items.into(),
        entries,
        index,
    })
}

// ============================================================================
// Document
// ============================================================================

/// A parsed CIF document. Block lookups are case-insensitive.
#[pyclass(frozen, name = "Document")]
pub struct PyDocument {
    #[pyo3(get)]
    pub source: Option<String>,
    blocks: Vec<Py<PyBlock>>,
}

#[pymethods]
impl PyDocument {
    /// Data blocks in file order.
    #[getter]
    fn blocks(&self, py: Python<'_>) -> Vec<Py<PyBlock>> {
        self.blocks.iter().map(|b| b.clone_ref(py)).collect()
    }

    /// Block names in file order.
    #[getter]
    fn names(&self) -> Vec<String> {
        self.blocks.iter().map(|b| b.get().name.clone()).collect()
    }

    /// Serialize the document as CIF text.
    #[pyo3(signature = (pretty=true), text_signature = "(self, pretty=True)")]
    fn to_cif(&self, pretty: bool) -> PyResult<String> {
        let mut doc = Document::new();
        for block in &self.blocks {
            let block = block.get().to_core().map_err(value_error)?;
            doc.insert_block(block).map_err(value_error)?;
        }
        Ok(doc.to_cif_string(&FormatOptions { pretty }))
    }

    fn __getitem__(&self, py: Python<'_>, name: &str) -> PyResult<Py<PyBlock>> {
        self.blocks
            .iter()
            .find(|b| b.get().name.eq_ignore_ascii_case(name))
            .map(|b| b.clone_ref(py))
            .ok_or_else(|| PyKeyError::new_err(name.to_string()))
    }

    fn __contains__(&self, name: &str) -> bool {
        self.blocks
            .iter()
            .any(|b| b.get().name.eq_ignore_ascii_case(name))
    }

    fn __len__(&self) -> usize {
        self.blocks.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "Document(source={:?}, blocks={})",
            self.source,
            self.blocks.len()
        )
    }
}

fn convert_document(py: Python<'_>, doc: &Document) -> PyResult<PyDocument> {
    let blocks = doc
        .iter()
        .map(|block| Py::new(py, convert_block(py, block)?))
        .collect::<PyResult<Vec<_>>>()?;
    Ok(PyDocument {
        source: doc.source().map(str::to_string),
        blocks,
    })
}

fn quiet_parser() -> CoreParser {
    CoreParser::new().with_logger(Logger::silent())
}

// ============================================================================
// Module functions
// ============================================================================

/// Parse a CIF string.
///
/// Args:
///     input: CIF text to parse
///
/// Returns:
///     Document: Parsed document
///
/// Raises:
///     ValueError: On parse error
#[pyfunction]
#[pyo3(text_signature = "(input)")]
fn parse(py: Python<'_>, input: &str) -> PyResult<PyDocument> {
    let doc = quiet_parser().parse(input).map_err(value_error)?;
    convert_document(py, &doc)
}

/// Read and parse a CIF file.
///
/// Raises:
///     OSError: If the file cannot be read
///     ValueError: On parse error
#[pyfunction]
#[pyo3(text_signature = "(path)")]
fn read_file(py: Python<'_>, path: &str) -> PyResult<PyDocument> {
    let doc = cifdoc_core::read_file_with(&quiet_parser(), path).map_err(|e| match e {
        ReadError::Io { .. } => PyOSError::new_err(e.to_string()),
        ReadError::Parse(e) => value_error(e),
    })?;
    convert_document(py, &doc)
}

/// Check a CIF string. Returns None if it parses, else the error.
#[pyfunction]
#[pyo3(text_signature = "(input)")]
fn validate(input: &str) -> Option<PyParseError> {
    quiet_parser().parse(input).err().map(PyParseError::from)
}

/// Re-serialize a CIF string.
///
/// Args:
///     input: CIF text
///     pretty: Align values and indent loops (default: True)
///
/// Raises:
///     ValueError: On parse error
#[pyfunction]
#[pyo3(signature = (input, pretty=true), text_signature = "(input, pretty=True)")]
fn format(input: &str, pretty: bool) -> PyResult<String> {
    let doc = quiet_parser().parse(input).map_err(value_error)?;
    Ok(doc.to_cif_string(&FormatOptions { pretty }))
}

// ============================================================================
// Module
// ============================================================================

/// cifdoc - CIF parser with an order-preserving document model.
#[pymodule]
fn pycifdoc(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySpan>()?;
    m.add_class::<PyParseErrorKind>()?;
    m.add_class::<PyParseError>()?;
    m.add_class::<PyDocument>()?;
    m.add_class::<PyBlock>()?;
    m.add_class::<PyPair>()?;
    m.add_class::<PyLoop>()?;
    m.add_function(wrap_pyfunction!(parse, m)?)?;
    m.add_function(wrap_pyfunction!(read_file, m)?)?;
    m.add_function(wrap_pyfunction!(validate, m)?)?;
    m.add_function(wrap_pyfunction!(format, m)?)?;
    Ok(())
}
