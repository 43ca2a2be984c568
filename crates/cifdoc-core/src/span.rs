//! Source location tracking for parse errors.
//!
//! The grammar works on byte offsets. Offsets are only turned into
//! line/column positions when an error has to be reported, so the hot
//! path never counts lines.

use memchr::{memchr, memchr_iter, memrchr};

/// A byte range in the source text.
///
/// Spans use byte offsets (not character offsets).
/// Both `start` and `end` are inclusive-exclusive: `[start, end)`.
///
/// # Example
///
/// ```rust
/// use cifdoc_core::span::Span;
///
/// let span = Span::new(0, 10);
/// assert_eq!(span.len(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Starting byte offset (inclusive).
    pub start: u32,
    /// Ending byte offset (exclusive).
    pub end: u32,
}

impl Span {
    /// Create a new span from byte offsets.
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A zero-width span at `offset`.
    #[inline]
    pub const fn point(offset: u32) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Get the length of this span in bytes.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Check if this span is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A 1-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    /// Resolve a byte offset into a line/column position.
    ///
    /// Columns count bytes, which is exact for the ASCII-only CIF 1.1
    /// character set.
    pub fn locate(input: &str, offset: usize) -> Self {
        let bytes = input.as_bytes();
        let offset = offset.min(bytes.len());
        let before = &bytes[..offset];
        let line = memchr_iter(b'\n', before).count() + 1;
        let line_start = memrchr(b'\n', before).map_or(0, |p| p + 1);
        Position {
            line: line as u32,
            column: (offset - line_start + 1) as u32,
        }
    }
}

/// The full text of the line containing `offset`, without its line ending.
pub fn line_at(input: &str, offset: usize) -> &str {
    let bytes = input.as_bytes();
    let offset = offset.min(bytes.len());
    let start = memrchr(b'\n', &bytes[..offset]).map_or(0, |p| p + 1);
    let end = memchr(b'\n', &bytes[offset..]).map_or(bytes.len(), |p| offset + p);
    let end = if end > start && bytes[end - 1] == b'\r' {
        end - 1
    } else {
        end
    };
    input.get(start..end).unwrap_or_default()
}
