//! Rule trait and registry for rqmigrate rewrite rules

use rqmigrate_core::{offset_to_line_column, Document, Edit, Node};
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

use crate::imports::ensure_imported;
use crate::options::{MigrateError, MigrateOptions};
use crate::walker::function_scopes;

/// A rewrite that was applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub rule: &'static str,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// A site that almost matched a rule and was left untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub rule: &'static str,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// An import that must be present once a rule's edits land
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredImport {
    pub library: String,
    pub specifier: String,
}

/// Everything a rule wants to do to one scope, planned against a single tree
#[derive(Debug, Default)]
pub struct RuleOutput {
    pub edits: Vec<Edit>,
    pub changes: Vec<Change>,
    pub diagnostics: Vec<Diagnostic>,
    pub imports: Vec<RequiredImport>,
}

fn position(node: &Node<'_>) -> (usize, usize) {
    let point = node.start_position();
    (point.row + 1, point.column + 1)
}

impl RuleOutput {
    pub fn edit(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    /// Record a rewrite anchored at `node`
    pub fn change(&mut self, rule: &'static str, node: &Node<'_>, message: impl Into<String>) {
        let (line, column) = position(node);
        self.changes.push(Change {
            rule,
            line,
            column,
            message: message.into(),
        });
    }

    /// Record a skipped near-match anchored at `node`
    pub fn warn(&mut self, rule: &'static str, node: &Node<'_>, message: impl Into<String>) {
        let (line, column) = position(node);
        self.diagnostics.push(Diagnostic {
            rule,
            line,
            column,
            message: message.into(),
        });
    }

    pub fn require_import(&mut self, library: impl Into<String>, specifier: impl Into<String>) {
        let import = RequiredImport {
            library: library.into(),
            specifier: specifier.into(),
        };
        if !self.imports.contains(&import) {
            self.imports.push(import);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Changes and diagnostics gathered over one migration run
#[derive(Debug, Default)]
pub struct MigrationLog {
    pub changes: Vec<Change>,
    pub diagnostics: Vec<Diagnostic>,
    /// Keys of sites a rule has already reported for the whole file
    reported: HashSet<String>,
}

/// One function scope of a document, as seen by a rule
///
/// Scopes are addressed by document-order index, which survives the
/// reparse after every commit because no rule adds or removes functions.
pub struct ScopeCx<'d> {
    doc: &'d mut Document,
    index: usize,
    options: &'d MigrateOptions,
    log: &'d mut MigrationLog,
}

impl<'d> ScopeCx<'d> {
    pub fn new(
        doc: &'d mut Document,
        index: usize,
        options: &'d MigrateOptions,
        log: &'d mut MigrationLog,
    ) -> Self {
        Self {
            doc,
            index,
            options,
            log,
        }
    }

    /// The function-like node this context is bound to
    pub fn scope(&self) -> Option<Node<'_>> {
        function_scopes(self.doc.root()).get(self.index).copied()
    }

    pub fn root(&self) -> Node<'_> {
        self.doc.root()
    }

    pub fn source(&self) -> &str {
        self.doc.source()
    }

    pub fn options(&self) -> &MigrateOptions {
        self.options
    }

    /// Whether file-wide diagnostics under `key` were already reported
    pub fn is_reported(&self, key: &str) -> bool {
        self.log.reported.contains(key)
    }

    pub fn mark_reported(&mut self, key: impl Into<String>) {
        self.log.reported.insert(key.into());
    }

    /// Apply a rule's planned output to the document
    ///
    /// Diagnostics are logged even when there is nothing to apply. After the
    /// edits land, each required import is ensured against the fresh tree.
    /// Returns whether the document changed.
    pub fn commit(&mut self, output: RuleOutput) -> Result<bool, MigrateError> {
        for diagnostic in &output.diagnostics {
            warn!(
                rule = diagnostic.rule,
                line = diagnostic.line,
                column = diagnostic.column,
                "{}",
                diagnostic.message
            );
        }
        self.log.diagnostics.extend(output.diagnostics);

        if output.edits.is_empty() {
            return Ok(false);
        }

        self.doc.apply(&output.edits)?;
        self.log.changes.extend(output.changes);

        for import in output.imports {
            if let Some(offset) = ensure_imported(self.doc, &import.library, &import.specifier)? {
                let (line, column) = offset_to_line_column(self.doc.source(), offset);
                self.log.changes.push(Change {
                    rule: "ensure_import",
                    line,
                    column,
                    message: format!(
                        "Import {} from '{}'",
                        import.specifier, import.library
                    ),
                });
            }
        }

        Ok(true)
    }
}

/// A rewrite rule applied to each function scope
pub trait Rule: Send + Sync {
    /// The unique identifier for this rule (e.g., "hooks_to_options")
    fn name(&self) -> &'static str;

    /// A short description of what this rule does
    fn description(&self) -> &'static str;

    /// Rewrite the scope, returning whether anything changed
    fn apply(&self, cx: &mut ScopeCx<'_>) -> Result<bool, MigrateError>;
}

/// Registry of all available rewrite rules, in application order
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleRegistry {
    /// Create a new registry with all built-in rules
    pub fn new() -> Self {
        let mut registry = Self { rules: Vec::new() };

        // Order matters: later rules see the output of earlier ones
        registry.register(Box::new(super::imports::RebindImportRule));
        registry.register(Box::new(super::hooks_to_options::HooksToOptionsRule));
        registry.register(Box::new(super::suspense_destructuring::SuspenseDestructuringRule));
        registry.register(Box::new(super::utils_proxy::UtilsProxyRule));

        registry
    }

    /// Register a new rule
    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    /// Get all rule names
    pub fn all_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Every registered rule, in application order
    pub fn all(&self) -> Vec<&dyn Rule> {
        self.rules.iter().map(|r| r.as_ref()).collect()
    }

    /// Get rules filtered by enabled names, keeping application order
    pub fn get_enabled(&self, enabled: &HashSet<String>) -> Vec<&dyn Rule> {
        self.rules
            .iter()
            .filter(|r| enabled.contains(r.name()))
            .map(|r| r.as_ref())
            .collect()
    }

    /// Get all rules with their descriptions (for --list-rules)
    pub fn list_rules(&self) -> Vec<(&'static str, &'static str)> {
        self.rules
            .iter()
            .map(|r| (r.name(), r.description()))
            .collect()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
