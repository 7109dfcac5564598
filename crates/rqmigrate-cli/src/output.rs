//! Output formatting for rqmigrate
//!
//! Supports text (colored terminal), JSON and unified diff output formats.

use anyhow::Result;
use colored::*;
use serde::Serialize;
use std::path::Path;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Diff,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<OutputFormat> {
        match s.to_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "diff" => Some(OutputFormat::Diff),
            _ => None,
        }
    }
}

/// A rewrite or warning at a source position
#[derive(Debug, Clone, Serialize)]
pub struct EditInfo {
    pub rule: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Result of processing a single file
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub edits: Vec<EditInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<EditInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileResult {
    pub fn success(path: &Path, edits: Vec<EditInfo>, warnings: Vec<EditInfo>) -> Self {
        Self {
            path: path.display().to_string(),
            edits,
            warnings,
            error: None,
        }
    }

    pub fn error(path: &Path, error: String) -> Self {
        Self {
            path: path.display().to_string(),
            edits: Vec::new(),
            warnings: Vec::new(),
            error: Some(error),
        }
    }
}

/// Summary statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub files_processed: usize,
    pub files_with_changes: usize,
    pub total_edits: usize,
    pub warnings: usize,
    pub errors: usize,
}

/// Full JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput {
    pub version: String,
    pub summary: Summary,
    pub files: Vec<FileResult>,
}

/// Reporter for accumulating and outputting results
pub struct Reporter {
    format: OutputFormat,
    verbose: bool,
    results: Vec<FileResult>,
    summary: Summary,
}

impl Reporter {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self {
            format,
            verbose,
            results: Vec::new(),
            summary: Summary::default(),
        }
    }

    /// Report a file with changes (in check mode - showing what would change)
    pub fn report_check(
        &mut self,
        path: &Path,
        edits: Vec<EditInfo>,
        warnings: Vec<EditInfo>,
        old_source: &str,
        new_source: &str,
    ) {
        self.summary.files_processed += 1;
        self.summary.files_with_changes += 1;
        self.summary.total_edits += edits.len();
        self.summary.warnings += warnings.len();

        match self.format {
            OutputFormat::Text => {
                println!("{}", path.display().to_string().bold());
                print_diff(old_source, new_source);
                println!();
                for edit in &edits {
                    println!("  {} {}", "->".green(), edit.message);
                }
                print_warnings(&warnings);
                println!();
            }
            OutputFormat::Diff => {
                print_unified_diff(path, old_source, new_source);
            }
            OutputFormat::Json => {
                // JSON output is handled in finish()
            }
        }

        self.results.push(FileResult::success(path, edits, warnings));
    }

    /// Report a file after applying fixes
    pub fn report_fix(&mut self, path: &Path, edits: Vec<EditInfo>, warnings: Vec<EditInfo>) {
        self.summary.files_processed += 1;
        self.summary.files_with_changes += 1;
        self.summary.total_edits += edits.len();
        self.summary.warnings += warnings.len();

        if self.format == OutputFormat::Text {
            println!("{}", path.display().to_string().bold());
            println!("  {} Applied {} change(s)", "OK".green(), edits.len());
            print_warnings(&warnings);
            println!();
        }

        self.results.push(FileResult::success(path, edits, warnings));
    }

    /// Report a file that needed no changes
    pub fn report_skipped(&mut self, path: &Path, warnings: Vec<EditInfo>) {
        self.summary.files_processed += 1;
        self.summary.warnings += warnings.len();

        if self.format == OutputFormat::Text {
            if !warnings.is_empty() {
                println!("{}", path.display().to_string().bold());
                print_warnings(&warnings);
                println!();
            } else if self.verbose {
                println!("{}: No changes needed", path.display());
            }
        }

        self.results.push(FileResult::success(path, vec![], warnings));
    }

    /// Report an error processing a file
    pub fn report_error(&mut self, path: &Path, error: &str) {
        self.summary.files_processed += 1;
        self.summary.errors += 1;

        if self.format == OutputFormat::Text {
            eprintln!("{}: {} - {}", "Warning".yellow(), path.display(), error);
        }

        self.results.push(FileResult::error(path, error.to_string()));
    }

    /// Print final summary/output
    pub fn finish(self, check_mode: bool) -> Result<()> {
        match self.format {
            OutputFormat::Text => {
                println!();
                println!("{}", "Summary".bold().underline());
                println!("  Files processed: {}", self.summary.files_processed);
                println!("  Files with changes: {}", self.summary.files_with_changes);
                println!("  Total edits: {}", self.summary.total_edits);
                if self.summary.warnings > 0 {
                    println!("  Sites needing manual migration: {}", self.summary.warnings);
                }
                if self.summary.errors > 0 {
                    println!("  Errors: {}", self.summary.errors);
                }

                if check_mode && self.summary.total_edits > 0 {
                    println!();
                    println!("{}", "Run with --fix to apply changes".yellow());
                }
            }
            OutputFormat::Json => {
                let output = JsonOutput {
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    summary: self.summary,
                    files: self.results,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Diff => {
                // Patch output has no summary
            }
        }
        Ok(())
    }

    /// Get summary for exit code determination
    pub fn summary(&self) -> &Summary {
        &self.summary
    }
}

fn print_warnings(warnings: &[EditInfo]) {
    for warning in warnings {
        println!(
            "  {} {}:{} {}",
            "!".yellow(),
            warning.line,
            warning.column,
            warning.message
        );
    }
}

/// Print a colored diff between old and new content
fn print_diff(old: &str, new: &str) {
    for diff_result in diff::lines(old, new) {
        match diff_result {
            diff::Result::Left(l) => {
                println!("  {}", format!("- {}", l).red());
            }
            diff::Result::Right(r) => {
                println!("  {}", format!("+ {}", r).green());
            }
            diff::Result::Both(_, _) => {}
        }
    }
}

/// Print unified diff format (standard diff -u compatible)
fn print_unified_diff(path: &Path, old: &str, new: &str) {
    print!("{}", unified_diff(path, old, new));
}

fn unified_diff(path: &Path, old: &str, new: &str) -> String {
    use similar::{ChangeTag, TextDiff};

    let diff = TextDiff::from_lines(old, new);
    let path_str = path.display().to_string();
    let mut out = format!("--- a/{}\n+++ b/{}\n", path_str, path_str);

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        out.push_str(&format!("{}\n", hunk.header()));
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            out.push_str(&format!("{}{}", sign, change));
            if change.missing_newline() {
                out.push('\n');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(rule: &str, message: &str) -> EditInfo {
        EditInfo {
            rule: rule.to_string(),
            line: 3,
            column: 5,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("text"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("diff"), Some(OutputFormat::Diff));
        assert_eq!(OutputFormat::from_str("xml"), None);
    }

    #[test]
    fn test_summary_counts() {
        let mut reporter = Reporter::new(OutputFormat::Json, false);
        reporter.report_check(
            Path::new("a.tsx"),
            vec![edit("hooks_to_options", "Convert .useQuery()")],
            vec![edit("utils_proxy", "`isMutating` has no query client equivalent")],
            "old\n",
            "new\n",
        );
        reporter.report_skipped(Path::new("b.ts"), vec![]);
        reporter.report_error(Path::new("c.ts"), "Parse error, skipping");

        let summary = reporter.summary();
        assert_eq!(summary.files_processed, 3);
        assert_eq!(summary.files_with_changes, 1);
        assert_eq!(summary.total_edits, 1);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.errors, 1);
    }

    #[test]
    fn test_json_serialization() {
        let output = JsonOutput {
            version: "0.1.0".to_string(),
            summary: Summary {
                files_processed: 10,
                files_with_changes: 3,
                total_edits: 7,
                warnings: 0,
                errors: 0,
            },
            files: vec![
                FileResult::success(
                    Path::new("Posts.tsx"),
                    vec![edit("utils_proxy", "Convert utils.invalidate()")],
                    vec![],
                ),
                FileResult::error(Path::new("broken.ts"), "Parse error, skipping".to_string()),
            ],
        };

        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"version\":\"0.1.0\""));
        assert!(json.contains("\"files_processed\":10"));
        assert!(json.contains("\"rule\":\"utils_proxy\""));
        assert!(json.contains("\"error\":\"Parse error, skipping\""));
        assert!(!json.contains("\"warnings\":[]"));
    }

    #[test]
    fn test_unified_diff() {
        let old = "const a = 1;\nconst b = trpc.x.useQuery();\n";
        let new = "const a = 1;\nconst b = useQuery(trpc.x.queryOptions());\n";
        let patch = unified_diff(Path::new("src/b.ts"), old, new);

        assert!(patch.starts_with("--- a/src/b.ts\n+++ b/src/b.ts\n@@"));
        assert!(patch.contains("-const b = trpc.x.useQuery();\n"));
        assert!(patch.contains("+const b = useQuery(trpc.x.queryOptions());\n"));
        assert!(patch.contains(" const a = 1;\n"));
    }
}
