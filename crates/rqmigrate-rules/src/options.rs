//! Migration options and errors

use rqmigrate_core::{CodecError, EditError};
use serde::Deserialize;
use thiserror::Error;

/// Errors that abort a migration
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Missing required option `{0}`")]
    MissingOption(&'static str),

    #[error("Parse error at line {line}, column {column}")]
    Parse { line: usize, column: usize },

    #[error("Conflicting rewrite: {0}")]
    Edit(#[from] EditError),

    #[error(transparent)]
    Codec(CodecError),
}

impl From<CodecError> for MigrateError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Syntax { line, column } => MigrateError::Parse { line, column },
            CodecError::Edit(edit) => MigrateError::Edit(edit),
            other => MigrateError::Codec(other),
        }
    }
}

/// Configuration bundle for one migration run
///
/// `trpc_file` and `trpc_import_name` are required. The remaining names are
/// the identifiers the rewrites emit; their defaults produce the standard
/// `@trpc/tanstack-react-query` output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MigrateOptions {
    /// Import path of the legacy client module (e.g. `~/utils/trpc`)
    pub trpc_file: String,
    /// Local name the legacy client is imported under (e.g. `trpc`)
    pub trpc_import_name: String,
    /// Accessor that replaces the legacy import (`useTRPC`)
    pub accessor: String,
    /// Root identifier of rewritten proxy paths (`trpc`)
    pub proxy_root: String,
    /// Local name bound to the shared caching client (`queryClient`)
    pub query_client: String,
    /// Path method used to build query filters (`queryFilter`)
    pub query_filter: String,
    /// Hook returning the shared caching client (`useQueryClient`)
    pub use_query_client: String,
    /// Library exporting `use_query_client`
    pub query_client_library: String,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            trpc_file: String::new(),
            trpc_import_name: String::new(),
            accessor: "useTRPC".to_string(),
            proxy_root: "trpc".to_string(),
            query_client: "queryClient".to_string(),
            query_filter: "queryFilter".to_string(),
            use_query_client: "useQueryClient".to_string(),
            query_client_library: "@tanstack/react-query".to_string(),
        }
    }
}

impl MigrateOptions {
    /// Options with the two required values and default names
    pub fn new(trpc_file: impl Into<String>, trpc_import_name: impl Into<String>) -> Self {
        Self {
            trpc_file: trpc_file.into(),
            trpc_import_name: trpc_import_name.into(),
            ..Self::default()
        }
    }

    /// Check that the required values are present
    pub fn validate(&self) -> Result<(), MigrateError> {
        if self.trpc_file.trim().is_empty() {
            return Err(MigrateError::MissingOption("trpc_file"));
        }
        if self.trpc_import_name.trim().is_empty() {
            return Err(MigrateError::MissingOption("trpc_import_name"));
        }
        Ok(())
    }
}
