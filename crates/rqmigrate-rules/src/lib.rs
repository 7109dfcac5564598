//! rqmigrate-rules: tRPC client to TanStack Query options migration
//!
//! Available rules, in application order:
//! - rebind_import: Import useTRPC and bind `const trpc = useTRPC()` per function
//! - hooks_to_options: Convert trpc.path.useQuery(input) to useQuery(trpc.path.queryOptions(input))
//! - suspense_destructuring: Convert const [data, query] = useSuspenseQuery(...) to query.data
//! - utils_proxy: Convert utils.path.invalidate() to queryClient.invalidateQueries(trpc.path.queryFilter())

pub mod hooks_to_options;
pub mod imports;
pub mod matcher;
pub mod options;
pub mod registry;
pub mod suspense_destructuring;
pub mod utils_proxy;
pub mod walker;

pub use hooks_to_options::{hook_rule, HookRule, HOOK_RULES};
pub use imports::{ensure_imported, is_imported};
pub use options::{MigrateError, MigrateOptions};
pub use registry::{Change, Diagnostic, Rule, RuleOutput, RuleRegistry, ScopeCx};
pub use utils_proxy::{mapped_method, UTILITY_METHODS};
pub use walker::{
    function_scopes, migrate, migrate_source, migrate_with_rules, Migration, Outcome,
};

pub use rqmigrate_core::Dialect;
