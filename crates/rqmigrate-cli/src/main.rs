//! rqmigrate CLI - tRPC to TanStack Query options migration
//!
//! Available rules:
//! - rebind_import: Import useTRPC and bind `const trpc = useTRPC()` per function
//! - hooks_to_options: Convert trpc.path.useQuery(input) to useQuery(trpc.path.queryOptions(input))
//! - suspense_destructuring: Convert const [data, query] = useSuspenseQuery(...) to query.data
//! - utils_proxy: Convert utils.path.invalidate() to queryClient.invalidateQueries(trpc.path.queryFilter())

mod config;
mod output;
mod process;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use config::Config;
use output::{EditInfo, OutputFormat, Reporter};
use process::{is_source_file, process_file, write_file};
use rqmigrate_rules::{MigrateOptions, Rule, RuleRegistry};

/// Environment variable holding the log filter
const LOG_ENV: &str = "RQMIGRATE_LOG";

#[derive(Parser)]
#[command(name = "rqmigrate")]
#[command(version)]
#[command(about = "Migrate tRPC React hooks to the TanStack Query options API")]
struct Cli {
    /// Files or directories to process
    #[arg(required_unless_present = "list_rules")]
    paths: Vec<PathBuf>,

    /// Import path of the legacy tRPC client module (e.g. ~/utils/trpc)
    #[arg(long, value_name = "PATH")]
    trpc_file: Option<String>,

    /// Name the legacy tRPC client is imported under (e.g. trpc)
    #[arg(long, value_name = "NAME")]
    trpc_import_name: Option<String>,

    /// Check for changes without applying them (default mode)
    #[arg(long, conflicts_with = "fix")]
    check: bool,

    /// Apply changes to files
    #[arg(long, conflicts_with = "check")]
    fix: bool,

    /// Show verbose output
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Rules to run (can be specified multiple times). Overrides config file.
    #[arg(long, short = 'r', value_name = "RULE")]
    rule: Vec<String>,

    /// Output format: text, json, diff
    #[arg(long, value_name = "FORMAT")]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(long, conflicts_with = "format")]
    json: bool,

    /// Path to config file (default: auto-detect .rqmigrate.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ignore config files
    #[arg(long)]
    no_config: bool,

    /// List available rules and exit
    #[arg(long)]
    list_rules: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "error" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let registry = RuleRegistry::new();

    if cli.list_rules {
        println!("{}", "Available rules:".bold());
        for (name, description) in registry.list_rules() {
            println!("  {} - {}", name.green(), description);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = if cli.no_config {
        Config::default()
    } else if let Some(config_path) = &cli.config {
        Config::load_path(config_path)?
    } else {
        match Config::load()? {
            Some((cfg, path)) => {
                tracing::debug!(path = %path.display(), "Using config");
                cfg
            }
            None => Config::default(),
        }
    };

    let output_format = if cli.json {
        OutputFormat::Json
    } else {
        let format = cli
            .format
            .as_deref()
            .or(config.output.format.as_deref())
            .unwrap_or("text");
        OutputFormat::from_str(format).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid output format '{}'. Valid options: text, json, diff",
                format
            )
        })?
    };

    // Missing required options abort before any file is read
    let options = config.migrate_options(cli.trpc_file.as_deref(), cli.trpc_import_name.as_deref());
    options
        .validate()
        .context("Set it with --trpc-file/--trpc-import-name or in the [migrate] table of .rqmigrate.toml")?;

    let all_rules = registry.all_names();
    for rule in &cli.rule {
        if !all_rules.contains(&rule.as_str()) {
            eprintln!(
                "{}: Unknown rule '{}'. Use --list-rules to see available rules.",
                "Error".red(),
                rule
            );
            return Ok(ExitCode::from(1));
        }
    }

    let enabled_rules = config.effective_rules(&all_rules, &cli.rule);
    let rules = registry.get_enabled(&enabled_rules);
    if rules.is_empty() {
        eprintln!("{}: No rules enabled", "Error".red());
        return Ok(ExitCode::from(1));
    }

    let fix_mode = cli.fix;
    let check_mode = !fix_mode;

    if cli.verbose && output_format == OutputFormat::Text {
        println!(
            "{}: {}",
            "Mode".bold(),
            if fix_mode { "fix" } else { "check" }
        );
        println!(
            "{}: {}",
            "Rules".bold(),
            rules.iter().map(|r| r.name()).collect::<Vec<_>>().join(", ")
        );
        println!();
    }

    let (file_paths, missing_paths) = collect_files(&cli.paths, &config);

    // Process files in parallel
    let results: Vec<FileResult> = file_paths
        .par_iter()
        .map(|path| process_file_to_result(path, &options, &rules))
        .collect();

    // Sort results by path for deterministic output
    let mut sorted_results: Vec<_> = results.into_iter().zip(file_paths.iter()).collect();
    sorted_results.sort_by(|a, b| a.1.cmp(b.1));

    let mut reporter = Reporter::new(output_format, cli.verbose);

    for path in &missing_paths {
        if output_format == OutputFormat::Text {
            eprintln!(
                "{}: Path does not exist: {}",
                "Warning".yellow(),
                path.display()
            );
        }
    }

    for (result, path) in sorted_results {
        report_result(path, result, fix_mode, &mut reporter)?;
    }

    let summary = reporter.summary();
    let exit_code = if summary.errors > 0 {
        ExitCode::from(1)
    } else if check_mode && summary.files_with_changes > 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    };

    reporter.finish(check_mode)?;

    Ok(exit_code)
}

/// Expand the given paths into source files, plus the paths that do not exist
fn collect_files(paths: &[PathBuf], config: &Config) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut file_paths = Vec::new();
    let mut missing_paths = Vec::new();

    for path in paths {
        if path.is_file() {
            file_paths.push(path.clone());
        } else if path.is_dir() {
            for entry in walkdir::WalkDir::new(path)
                .into_iter()
                .filter_entry(|e| e.file_name() != "node_modules")
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_source_file(e.path()))
            {
                let file_path = entry.path();
                if !config.should_exclude(file_path) {
                    file_paths.push(file_path.to_path_buf());
                }
            }
        } else {
            missing_paths.push(path.clone());
        }
    }

    (file_paths, missing_paths)
}

/// Result of processing a single file (for parallel processing)
enum FileResult {
    /// File had no changes
    NoChanges { warnings: Vec<EditInfo> },
    /// File has changes to report/apply
    HasChanges {
        edits: Vec<EditInfo>,
        warnings: Vec<EditInfo>,
        old_source: String,
        new_source: String,
    },
    /// Parse error occurred
    ParseError,
    /// Other error occurred
    Error(String),
}

/// Process a file and return a result (no I/O, suitable for parallel execution)
fn process_file_to_result(path: &Path, options: &MigrateOptions, rules: &[&dyn Rule]) -> FileResult {
    match process_file(path, options, rules) {
        Ok(Some(result)) => match result.new_source {
            Some(new_source) => FileResult::HasChanges {
                edits: result.edits,
                warnings: result.warnings,
                old_source: result.old_source,
                new_source,
            },
            None => FileResult::NoChanges {
                warnings: result.warnings,
            },
        },
        Ok(None) => FileResult::ParseError,
        Err(e) => FileResult::Error(format!("{:#}", e)),
    }
}

/// Report a file result and optionally apply fixes
fn report_result(
    path: &Path,
    result: FileResult,
    fix_mode: bool,
    reporter: &mut Reporter,
) -> Result<()> {
    match result {
        FileResult::NoChanges { warnings } => {
            reporter.report_skipped(path, warnings);
        }
        FileResult::HasChanges {
            edits,
            warnings,
            old_source,
            new_source,
        } => {
            if fix_mode {
                write_file(path, &new_source)?;
                reporter.report_fix(path, edits, warnings);
            } else {
                reporter.report_check(path, edits, warnings, &old_source, &new_source);
            }
        }
        FileResult::ParseError => {
            reporter.report_error(path, "Parse error, skipping");
        }
        FileResult::Error(msg) => {
            reporter.report_error(path, &msg);
        }
    }
    Ok(())
}
