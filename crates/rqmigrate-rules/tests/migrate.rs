//! End-to-end tests for the full migration pass
//!
//! Each test runs every built-in rule through `migrate`, the same entry
//! point the CLI uses.

use indoc::indoc;
use rqmigrate_rules::{ensure_imported, migrate, MigrateError, MigrateOptions, Migration, Outcome};

fn options() -> MigrateOptions {
    MigrateOptions::new("~/utils/trpc", "trpc")
}

fn run(source: &str) -> Migration {
    migrate(source, &options()).unwrap()
}

const COMPONENT: &str = indoc! {"
    import { trpc } from '~/utils/trpc';

    export function PostPage({ id }: { id: string }) {
        const utils = trpc.useUtils();
        const [post, postQuery] = trpc.post.byId.useSuspenseQuery({ id });
        const remove = trpc.post.remove.useMutation({
            onSuccess: () => utils.post.list.invalidate(),
        });
        return <Post post={post} onRemove={() => remove.mutate({ id })} />;
    }
"};

/// Every rule fires on one component
#[test]
fn test_full_component() {
    let migration = run(COMPONENT);
    assert_eq!(
        migration.output().unwrap(),
        indoc! {"
            import { useTRPC } from '~/utils/trpc';
            import { useSuspenseQuery } from '@tanstack/react-query';
            import { useMutation } from '@tanstack/react-query';
            import { useQueryClient } from '@tanstack/react-query';

            export function PostPage({ id }: { id: string }) {
                const trpc = useTRPC();
                const queryClient = useQueryClient();
                const postQuery = useSuspenseQuery(trpc.post.byId.queryOptions({ id }));
                const post = postQuery.data;
                const remove = useMutation(trpc.post.remove.mutationOptions({
                    onSuccess: () => queryClient.invalidateQueries(trpc.post.list.queryFilter()),
                }));
                return <Post post={post} onRemove={() => remove.mutate({ id })} />;
            }
        "}
    );
    assert!(migration.diagnostics.is_empty());

    let rules: Vec<_> = migration.changes.iter().map(|c| c.rule).collect();
    for rule in [
        "rebind_import",
        "hooks_to_options",
        "suspense_destructuring",
        "utils_proxy",
        "ensure_import",
    ] {
        assert!(rules.contains(&rule), "no change recorded for {}", rule);
    }
}

/// Running the pass on its own output changes nothing
#[test]
fn test_idempotent_on_own_output() {
    let fixtures = [
        COMPONENT,
        indoc! {"
            import { trpc } from '~/utils/trpc';

            export const List = () => {
                const [pages, query] = trpc.post.infinite.useSuspenseInfiniteQuery(
                    { limit: 10 },
                    { getNextPageParam: (last) => last.next },
                );
                trpc.post.onAdd.useSubscription(undefined, { onData: () => query.refetch() });
                return pages;
            };
        "},
        indoc! {"
            function A() {
                const utils = trpc.useContext();
                utils.post.byId.prefetch({ id: 1 });
                utils.post();
            }
        "},
    ];

    for fixture in fixtures {
        let first = run(fixture);
        let output = first.output().unwrap();
        let second = run(output);
        assert_eq!(second.outcome, Outcome::Unchanged, "second run changed:\n{}", output);
    }
}

/// A unit without any legacy pattern comes back as the sentinel
#[test]
fn test_no_op_returns_sentinel() {
    let source = indoc! {"
        'use client';
        import { useQuery } from '@tanstack/react-query';
        import { api } from '~/lib/api';

        export function Profile() {
            const profile = useQuery({ queryKey: ['me'], queryFn: api.me });
            const [open, setOpen] = useState(false);
            return profile.data?.name;
        }
    "};
    let migration = run(source);
    assert_eq!(migration.outcome, Outcome::Unchanged);
    assert!(migration.changes.is_empty());
    assert!(migration.diagnostics.is_empty());
}

/// Hook rewrites import each specifier exactly once
#[test]
fn test_import_hygiene() {
    let source = indoc! {"
        import { useQuery } from '@tanstack/react-query';
        import { trpc } from '~/utils/trpc';

        function A() {
            return trpc.post.list.useQuery(input);
        }

        function B() {
            const a = trpc.post.a.useQuery();
            const b = trpc.post.b.useMutation();
            const c = trpc.post.c.useMutation();
        }
    "};
    let output = run(source).output().unwrap().to_string();
    assert!(output.contains("useQuery(trpc.post.list.queryOptions(input))"));
    assert_eq!(output.matches("import { useQuery }").count(), 1);
    assert_eq!(output.matches("import { useMutation }").count(), 1);
    assert_eq!(output.matches("import { useTRPC }").count(), 1);
    assert_eq!(output.matches("const trpc = useTRPC();").count(), 2);
}

#[test]
fn test_ensure_imported_twice() {
    let mut doc = rqmigrate_core::Document::parse("export {};\n").unwrap();
    ensure_imported(&mut doc, "@tanstack/react-query", "useQueryClient").unwrap();
    ensure_imported(&mut doc, "@tanstack/react-query", "useQueryClient").unwrap();
    assert_eq!(doc.source().matches("import").count(), 1);
}

#[test]
fn test_suspense_example() {
    let source = indoc! {"
        function Post() {
            const [data, query] = trpc.post.get.useSuspenseQuery(input);
        }
    "};
    let migration = migrate(source, &options()).unwrap();
    let output = migration.output().unwrap();
    assert!(output.contains(
        "const query = useSuspenseQuery(trpc.post.get.queryOptions(input));\n    const data = query.data;"
    ));
}

#[test]
fn test_malformed_utils_call() {
    let source = indoc! {"
        function A() {
            const utils = trpc.useUtils();
            utils.post();
            utils.post.list.invalidate();
        }
    "};
    let migration = run(source);
    let output = migration.output().unwrap();
    assert!(output.contains("utils.post();"));
    assert!(output.contains("queryClient.invalidateQueries(trpc.post.list.queryFilter());"));
    assert_eq!(output.matches("import { useQueryClient }").count(), 1);
    assert_eq!(migration.diagnostics.len(), 1);
}

#[test]
fn test_missing_configuration() {
    let source = "function A() { trpc.a.useQuery(); }";

    let err = migrate(source, &MigrateOptions::new("", "trpc")).unwrap_err();
    assert!(matches!(err, MigrateError::MissingOption("trpc_file")));

    let err = migrate(source, &MigrateOptions::new("~/utils/trpc", "  ")).unwrap_err();
    assert!(matches!(err, MigrateError::MissingOption("trpc_import_name")));
}

#[test]
fn test_custom_names() {
    let options = MigrateOptions {
        proxy_root: "api".to_string(),
        query_client: "client".to_string(),
        ..MigrateOptions::new("@/trpc", "api")
    };
    let source = indoc! {"
        function A() {
            const utils = api.useUtils();
            utils.viewer.reset();
        }
    "};
    let output = migrate(source, &options).unwrap().output().unwrap().to_string();
    assert!(output.contains("const client = useQueryClient();"));
    assert!(output.contains("client.resetQueries(api.viewer.queryFilter());"));
}
