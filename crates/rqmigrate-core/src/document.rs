//! Source text paired with its TypeScript syntax tree
//!
//! tree-sitter trees are immutable. A `Document` is "mutated" by applying
//! span edits to its text and reparsing, so every rule always looks at a
//! tree that matches the current text.

use std::path::Path;
use thiserror::Error;
use tree_sitter::{Language, LanguageError, Node, Parser, Tree};

use crate::edit::{apply_edits, Edit, EditError};

/// Errors raised by the tree codec
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to load the TypeScript grammar: {0}")]
    Language(#[from] LanguageError),

    #[error("Parser produced no tree")]
    NoTree,

    #[error("Syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Grammar a source unit is parsed with
///
/// TSX is not a superset of TypeScript: angle-bracket assertions
/// (`<number>x`) and generic arrows (`<T>(x: T) => x`) only parse as `.ts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    TypeScript,
    #[default]
    Tsx,
}

impl Dialect {
    /// `.tsx` files get the TSX grammar, everything else plain TypeScript
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("tsx") => Dialect::Tsx,
            _ => Dialect::TypeScript,
        }
    }

    fn language(self) -> Language {
        match self {
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// A parsed TypeScript source unit
pub struct Document {
    parser: Parser,
    source: String,
    tree: Tree,
}

impl Document {
    /// Parse source text with the TSX grammar
    pub fn parse(source: impl Into<String>) -> Result<Self, CodecError> {
        Self::parse_with(source, Dialect::Tsx)
    }

    /// Parse source text with the given grammar
    ///
    /// Files containing syntax errors are rejected so that rules never
    /// rewrite around a recovery node.
    pub fn parse_with(source: impl Into<String>, dialect: Dialect) -> Result<Self, CodecError> {
        let source = source.into();
        let mut parser = Parser::new();
        parser.set_language(&dialect.language())?;
        let tree = parser.parse(&source, None).ok_or(CodecError::NoTree)?;

        if let Some((line, column)) = first_error(tree.root_node()) {
            return Err(CodecError::Syntax { line, column });
        }

        Ok(Self {
            parser,
            source,
            tree,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Apply edits to the text and reparse
    ///
    /// Returns `false` without reparsing when `edits` is empty.
    pub fn apply(&mut self, edits: &[Edit]) -> Result<bool, CodecError> {
        if edits.is_empty() {
            return Ok(false);
        }

        let updated = apply_edits(&self.source, edits)?;
        let tree = self.parser.parse(&updated, None).ok_or(CodecError::NoTree)?;
        self.source = updated;
        self.tree = tree;
        Ok(true)
    }

    /// Serialize the document back to text
    pub fn into_source(self) -> String {
        self.source
    }
}

/// Locate the first error or missing node, as 1-based line and column
fn first_error(root: Node<'_>) -> Option<(usize, usize)> {
    if !root.has_error() {
        return None;
    }

    let mut cursor = root.walk();
    let mut node = root;
    loop {
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            return Some((pos.row + 1, pos.column + 1));
        }

        let next = node
            .children(&mut cursor)
            .find(|child| child.has_error() || child.is_missing());
        match next {
            Some(child) => node = child,
            None => {
                let pos = node.start_position();
                return Some((pos.row + 1, pos.column + 1));
            }
        }
    }
}
