//! Scope walker: drives the rule set over every function-like node

use rqmigrate_core::{visit_all, Dialect, Document, Node};
use tracing::debug;

use crate::options::{MigrateError, MigrateOptions};
use crate::registry::{Change, Diagnostic, MigrationLog, Rule, RuleRegistry, ScopeCx};

/// Node kinds treated as a function scope
const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
];

/// Whether a node opens a function scope
pub(crate) fn is_function_like(node: &Node<'_>) -> bool {
    node.is_named() && FUNCTION_KINDS.contains(&node.kind())
}

/// Every function-like node under `root`, in document order
pub fn function_scopes(root: Node<'_>) -> Vec<Node<'_>> {
    let mut scopes = Vec::new();
    visit_all(root, |node| {
        if is_function_like(&node) {
            scopes.push(node);
        }
    });
    scopes
}

/// Innermost function scope strictly enclosing `node`
pub(crate) fn enclosing_function<'t>(node: Node<'t>) -> Option<Node<'t>> {
    let mut current = node.parent();
    while let Some(candidate) = current {
        if is_function_like(&candidate) {
            return Some(candidate);
        }
        current = candidate.parent();
    }
    None
}

/// Result of running the pass over one source unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No rule fired; callers should skip write-back
    Unchanged,
    /// The rewritten source text
    Rewritten(String),
}

/// Outcome plus the record of what happened
#[derive(Debug, Clone)]
pub struct Migration {
    pub outcome: Outcome,
    pub changes: Vec<Change>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Migration {
    pub fn is_changed(&self) -> bool {
        matches!(self.outcome, Outcome::Rewritten(_))
    }

    /// The rewritten source, if any rule fired
    pub fn output(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Rewritten(source) => Some(source),
            Outcome::Unchanged => None,
        }
    }
}

/// Run every built-in rule over a source unit
pub fn migrate(source: &str, options: &MigrateOptions) -> Result<Migration, MigrateError> {
    let registry = RuleRegistry::new();
    migrate_with_rules(source, options, &registry.all())
}

/// Run the given rules over a TSX source unit
pub fn migrate_with_rules(
    source: &str,
    options: &MigrateOptions,
    rules: &[&dyn Rule],
) -> Result<Migration, MigrateError> {
    migrate_source(source, Dialect::Tsx, options, rules)
}

/// Run the given rules, in order, over every function scope of a source unit
///
/// Required options are checked before parsing, so a misconfigured run has
/// no side effects at all.
pub fn migrate_source(
    source: &str,
    dialect: Dialect,
    options: &MigrateOptions,
    rules: &[&dyn Rule],
) -> Result<Migration, MigrateError> {
    options.validate()?;

    let mut doc = Document::parse_with(source, dialect)?;
    let mut log = MigrationLog::default();
    let scope_count = function_scopes(doc.root()).len();
    let mut changed = false;

    debug!(scopes = scope_count, rules = rules.len(), "Starting migration pass");

    for index in 0..scope_count {
        for rule in rules {
            let mut cx = ScopeCx::new(&mut doc, index, options, &mut log);
            let fired = rule.apply(&mut cx)?;
            if fired {
                debug!(rule = rule.name(), scope = index, "Rule rewrote scope");
            }
            changed |= fired;
        }
    }

    let outcome = if changed {
        Outcome::Rewritten(doc.into_source())
    } else {
        Outcome::Unchanged
    };

    Ok(Migration {
        outcome,
        changes: log.changes,
        diagnostics: log.diagnostics,
    })
}
