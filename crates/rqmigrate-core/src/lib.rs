//! rqmigrate-core: Core abstractions for TypeScript rewriting
//!
//! This crate provides:
//! - `Edit`: A span-based code modification
//! - `apply_edits()`: Function to apply edits preserving formatting
//! - `Document`: Source text paired with its tree-sitter syntax tree
//! - `Visitor`: Trait for traversing tree-sitter syntax trees

mod document;
mod edit;
pub mod visitor;

pub use document::{CodecError, Dialect, Document};
pub use edit::{apply_edits, Edit, EditError, Span};
pub use visitor::{
    descendants_of_kind, line_indent, node_text, offset_to_line_column, visit, visit_all, Visitor,
};

pub use tree_sitter::Node;
