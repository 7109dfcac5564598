//! Span-based source code editing with format preservation

use thiserror::Error;
use tree_sitter::Node;

/// Errors that can occur during edit application
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Overlapping edits detected at offset {0}")]
    OverlappingEdits(usize),

    #[error("Edit span {start}..{end} out of bounds for source length {len}")]
    SpanOutOfBounds { start: usize, end: usize, len: usize },

    #[error("Edit span {start}..{end} does not fall on a character boundary")]
    NotCharBoundary { start: usize, end: usize },
}

/// A half-open byte range into the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// An empty span, used for pure insertions
    pub fn at(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn of(node: &Node<'_>) -> Self {
        Self::new(node.start_byte(), node.end_byte())
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Represents a single code edit operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// The source span to replace
    pub span: Span,
    /// The replacement text
    pub replacement: String,
    /// Human-readable description of the edit
    pub message: String,
}

impl Edit {
    /// Create a new edit
    pub fn new(span: Span, replacement: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
            message: message.into(),
        }
    }

    /// Replace the full text of a node
    pub fn replace(node: &Node<'_>, replacement: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Span::of(node), replacement, message)
    }

    /// Insert text at a byte offset without removing anything
    pub fn insert(offset: usize, text: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Span::at(offset), text, message)
    }

    /// Get the byte offset where this edit starts
    pub fn start_offset(&self) -> usize {
        self.span.start
    }

    /// Get the byte offset where this edit ends
    pub fn end_offset(&self) -> usize {
        self.span.end
    }
}

/// Apply edits to source code, preserving everything outside the edited spans
///
/// Edits are ordered by position. Insertions at the same offset keep the
/// order in which they were given, and an insertion at the start of a
/// replaced span lands before the replacement.
///
/// # Returns
/// * `Ok(String)` - The modified source code
/// * `Err(EditError)` - If edits overlap or are out of bounds
pub fn apply_edits(source: &str, edits: &[Edit]) -> Result<String, EditError> {
    if edits.is_empty() {
        return Ok(source.to_string());
    }

    // Stable sort, so same-offset insertions keep their relative order
    let mut sorted_edits: Vec<&Edit> = edits.iter().collect();
    sorted_edits.sort_by_key(|edit| (edit.start_offset(), edit.end_offset()));

    let source_len = source.len();
    let mut prev_end: usize = 0;

    for edit in &sorted_edits {
        let start = edit.start_offset();
        let end = edit.end_offset();

        if end > source_len || start > end {
            return Err(EditError::SpanOutOfBounds {
                start,
                end,
                len: source_len,
            });
        }

        if !source.is_char_boundary(start) || !source.is_char_boundary(end) {
            return Err(EditError::NotCharBoundary { start, end });
        }

        if start < prev_end {
            return Err(EditError::OverlappingEdits(start));
        }

        prev_end = end;
    }

    let extra: usize = sorted_edits.iter().map(|e| e.replacement.len()).sum();
    let mut result = String::with_capacity(source_len + extra);
    let mut cursor = 0;

    for edit in sorted_edits {
        result.push_str(&source[cursor..edit.start_offset()]);
        result.push_str(&edit.replacement);
        cursor = edit.end_offset();
    }
    result.push_str(&source[cursor..]);

    Ok(result)
}
