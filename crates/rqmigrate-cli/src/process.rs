//! File processing logic for rqmigrate

use anyhow::{Context, Result};
use rqmigrate_rules::{
    migrate_source, Change, Diagnostic, Dialect, MigrateError, MigrateOptions, Rule,
};
use std::path::Path;
use tracing::{debug, info_span};

use crate::output::EditInfo;

/// Extensions of files the migration runs on
const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];

/// Result of processing a single file
pub struct ProcessResult {
    /// Rewrites that were found/applied
    pub edits: Vec<EditInfo>,
    /// Sites that almost matched and were left alone
    pub warnings: Vec<EditInfo>,
    /// Original source code
    pub old_source: String,
    /// New source code after edits (only if edits were found)
    pub new_source: Option<String>,
}

impl From<Change> for EditInfo {
    fn from(change: Change) -> Self {
        EditInfo {
            rule: change.rule.to_string(),
            line: change.line,
            column: change.column,
            message: change.message,
        }
    }
}

impl From<Diagnostic> for EditInfo {
    fn from(diagnostic: Diagnostic) -> Self {
        EditInfo {
            rule: diagnostic.rule.to_string(),
            line: diagnostic.line,
            column: diagnostic.column,
            message: diagnostic.message,
        }
    }
}

/// Whether a directory entry is a TypeScript source to migrate
///
/// Declaration files carry no hook calls and are skipped.
pub fn is_source_file(path: &Path) -> bool {
    let has_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
    let is_declaration = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts")
        });
    has_extension && !is_declaration
}

/// Run the migration over a single file
///
/// `.tsx` files are parsed with JSX enabled, everything else as plain
/// TypeScript. Returns `Ok(None)` when the file does not parse.
pub fn process_file(
    path: &Path,
    options: &MigrateOptions,
    rules: &[&dyn Rule],
) -> Result<Option<ProcessResult>> {
    let source_code = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let _span = info_span!("file", path = %path.display()).entered();

    let migration = match migrate_source(&source_code, Dialect::for_path(path), options, rules) {
        Ok(migration) => migration,
        Err(MigrateError::Parse { line, column }) => {
            debug!(line, column, "Skipping file with syntax errors");
            return Ok(None);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to migrate {}", path.display()));
        }
    };

    let new_source = migration.output().map(str::to_string);
    Ok(Some(ProcessResult {
        edits: migration.changes.into_iter().map(EditInfo::from).collect(),
        warnings: migration.diagnostics.into_iter().map(EditInfo::from).collect(),
        old_source: source_code,
        new_source,
    }))
}

/// Write the processed result to the file
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write file: {}", path.display()))
}
