//! Import bookkeeping
//!
//! - `ensure_imported`: add `import { x } from 'lib'` unless it is already there
//! - `RebindImportRule`: swap the legacy client import for its accessor hook
//!   and rebind the old name at the top of each function that uses it
//!
//! ```tsx
//! // Before
//! import { trpc } from '~/utils/trpc';
//! function Posts() {
//!     const posts = trpc.post.list.useQuery();
//! }
//!
//! // After
//! import { useTRPC } from '~/utils/trpc';
//! function Posts() {
//!     const trpc = useTRPC();
//!     const posts = trpc.post.list.useQuery();
//! }
//! ```

use rqmigrate_core::{
    descendants_of_kind, line_indent, node_text, visit_all, Document, Edit, Node,
};

use crate::options::{MigrateError, MigrateOptions};
use crate::registry::{Rule, RuleOutput, ScopeCx};
use crate::walker::{enclosing_function, is_function_like};

const RULE: &str = "rebind_import";

/// Top-level import declarations, in document order
fn import_statements(root: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = root.walk();
    root.named_children(&mut cursor)
        .filter(|node| node.kind() == "import_statement")
        .collect()
}

/// Unquoted value of a string literal node
fn string_value<'s>(node: &Node<'_>, source: &'s str) -> &'s str {
    let text = node_text(node, source);
    if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Whether a node carries a `type` modifier token (`import type`, `{ type X }`)
fn has_type_modifier(node: &Node<'_>) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == "type");
    found
}

/// Value imports of `statement` if it imports from `library`
fn specifiers_from<'t>(statement: Node<'t>, source: &str, library: &str) -> Vec<Node<'t>> {
    let from_library = statement
        .child_by_field_name("source")
        .is_some_and(|s| string_value(&s, source) == library);
    if !from_library || has_type_modifier(&statement) {
        return Vec::new();
    }

    descendants_of_kind(statement, "import_specifier")
        .into_iter()
        .filter(|specifier| !has_type_modifier(specifier))
        .collect()
}

/// Local binding introduced by an import specifier
fn local_name<'s>(specifier: &Node<'_>, source: &'s str) -> &'s str {
    specifier
        .child_by_field_name("alias")
        .or_else(|| specifier.child_by_field_name("name"))
        .map_or("", |name| node_text(&name, source))
}

/// Whether `specifier` is already bound from `library`
pub fn is_imported(root: Node<'_>, source: &str, library: &str, specifier: &str) -> bool {
    import_statements(root).into_iter().any(|statement| {
        specifiers_from(statement, source, library)
            .iter()
            .any(|s| local_name(s, source) == specifier)
    })
}

/// A string-literal statement such as `'use client';`
fn is_directive(node: &Node<'_>) -> bool {
    node.kind() == "expression_statement"
        && node
            .named_child(0)
            .is_some_and(|expr| expr.kind() == "string")
}

/// Whether `node` belongs to a comment or directive prologue
fn is_prologue(node: &Node<'_>) -> bool {
    matches!(node.kind(), "comment" | "hash_bang_line") || is_directive(node)
}

/// Offset just past the directive prologue and leading comments
fn prologue_end(root: Node<'_>, source: &str) -> Option<usize> {
    let mut cursor = root.walk();
    let first = root.named_children(&mut cursor).find(|node| !is_prologue(node));
    first.map(|node| node.start_byte()).or_else(|| {
        if source.is_empty() {
            Some(0)
        } else {
            None
        }
    })
}

/// Make sure `specifier` is imported from `library`
///
/// The presence check queries the live tree every time. A missing import is
/// added as its own declaration after the last existing import, or at the
/// top of the file when there are none. Returns the offset of the new
/// declaration, or `None` if it was already present.
pub fn ensure_imported(
    doc: &mut Document,
    library: &str,
    specifier: &str,
) -> Result<Option<usize>, MigrateError> {
    let (edit, start) = {
        let source = doc.source();
        let root = doc.root();
        if is_imported(root, source, library, specifier) {
            return Ok(None);
        }

        let message = format!("Import {} from '{}'", specifier, library);
        match import_statements(root).last() {
            Some(last) => {
                let quote = last
                    .child_by_field_name("source")
                    .and_then(|s| node_text(&s, source).chars().next())
                    .unwrap_or('\'');
                let text = format!(
                    "\nimport {{ {} }} from {}{}{};",
                    specifier, quote, library, quote
                );
                (Edit::insert(last.end_byte(), text, message), last.end_byte() + 1)
            }
            None => match prologue_end(root, source) {
                Some(offset) => {
                    let text = format!("import {{ {} }} from '{}';\n", specifier, library);
                    (Edit::insert(offset, text, message), offset)
                }
                None => {
                    let separator = if source.ends_with('\n') { "" } else { "\n" };
                    let text = format!(
                        "{}import {{ {} }} from '{}';\n",
                        separator, specifier, library
                    );
                    let start = source.len() + separator.len();
                    (Edit::insert(source.len(), text, message), start)
                }
            },
        }
    };

    doc.apply(&[edit])?;
    Ok(Some(start))
}

/// Whether `name` is a parameter or a directly declared variable of `function`
pub(crate) fn declares(function: Node<'_>, name: &str, source: &str) -> bool {
    if let Some(parameter) = function.child_by_field_name("parameter") {
        if node_text(&parameter, source) == name {
            return true;
        }
    }

    if let Some(parameters) = function.child_by_field_name("parameters") {
        let mut cursor = parameters.walk();
        let bound = parameters.named_children(&mut cursor).any(|param| {
            let pattern = param.child_by_field_name("pattern").unwrap_or(param);
            let mut found = false;
            visit_all(pattern, |node| {
                if matches!(node.kind(), "identifier" | "shorthand_property_identifier_pattern")
                    && node_text(&node, source) == name
                {
                    found = true;
                }
            });
            found
        });
        if bound {
            return true;
        }
    }

    let Some(body) = function.child_by_field_name("body") else {
        return false;
    };
    descendants_of_kind(body, "variable_declarator")
        .into_iter()
        .any(|declarator| {
            declarator
                .child_by_field_name("name")
                .is_some_and(|n| n.kind() == "identifier" && node_text(&n, source) == name)
                && enclosing_function(declarator).is_some_and(|f| f.id() == function.id())
        })
}

/// Whether `name` is bound by `scope` or any function enclosing it
fn bound_in_scope_chain(scope: Node<'_>, name: &str, source: &str) -> bool {
    let mut current = Some(scope);
    while let Some(node) = current {
        if is_function_like(&node) && declares(node, name, source) {
            return true;
        }
        current = node.parent();
    }
    false
}

/// Plan the accessor rebinding for one scope
fn plan_rebind(scope: Node<'_>, root: Node<'_>, source: &str, options: &MigrateOptions) -> RuleOutput {
    let mut output = RuleOutput::default();
    let name = options.trpc_import_name.as_str();

    let mut legacy = None;
    let mut has_accessor = false;
    for statement in import_statements(root) {
        for specifier in specifiers_from(statement, source, &options.trpc_file) {
            let local = local_name(&specifier, source);
            if local == name {
                legacy = Some(specifier);
            } else if local == options.accessor {
                has_accessor = true;
            }
        }
    }
    if legacy.is_none() && !has_accessor {
        return output;
    }

    let Some(body) = scope.child_by_field_name("body") else {
        return output;
    };
    let referenced = descendants_of_kind(body, "identifier")
        .iter()
        .any(|ident| node_text(ident, source) == name);
    if !referenced || bound_in_scope_chain(scope, name, source) {
        return output;
    }

    if body.kind() != "statement_block" {
        output.warn(
            RULE,
            &scope,
            format!(
                "Cannot bind `{}` inside an expression-bodied arrow function; left unchanged",
                name
            ),
        );
        return output;
    }

    let mut cursor = body.walk();
    let first_statement = body.named_children(&mut cursor).find(|node| !is_prologue(node));
    let Some(first_statement) = first_statement else {
        return output;
    };

    if let Some(specifier) = legacy {
        if !has_accessor {
            output.edit(Edit::replace(
                &specifier,
                options.accessor.as_str(),
                format!("Import {} instead of {}", options.accessor, name),
            ));
            output.change(
                RULE,
                &specifier,
                format!("Replace `{}` import with `{}`", name, options.accessor),
            );
        }
    }

    let declaration = format!("const {} = {}();", name, options.accessor);
    let separator = if first_statement.start_position().row > body.start_position().row {
        format!("\n{}", line_indent(source, first_statement.start_byte()))
    } else {
        " ".to_string()
    };
    let edit = Edit::insert(
        first_statement.start_byte(),
        format!("{}{}", declaration, separator),
        format!("Rebind {}", name),
    );
    output.edit(edit);
    output.change(
        RULE,
        &body,
        format!("Bind `{}` from `{}()`", name, options.accessor),
    );

    output
}

/// Rule: replace the legacy client import with its accessor hook
pub struct RebindImportRule;

impl Rule for RebindImportRule {
    fn name(&self) -> &'static str {
        RULE
    }

    fn description(&self) -> &'static str {
        "Import the useTRPC accessor and bind the client name inside each function that uses it"
    }

    fn apply(&self, cx: &mut ScopeCx<'_>) -> Result<bool, MigrateError> {
        let output = {
            let Some(scope) = cx.scope() else {
                return Ok(false);
            };
            plan_rebind(scope, cx.root(), cx.source(), cx.options())
        };
        cx.commit(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::migrate_with_rules;
    use indoc::indoc;

    fn rebind(source: &str) -> Option<String> {
        let options = MigrateOptions::new("~/utils/trpc", "trpc");
        migrate_with_rules(source, &options, &[&RebindImportRule])
            .unwrap()
            .output()
            .map(str::to_string)
    }

    fn ensure(source: &str, library: &str, specifier: &str) -> String {
        let mut doc = Document::parse(source).unwrap();
        ensure_imported(&mut doc, library, specifier).unwrap();
        doc.into_source()
    }

    // ==================== ensure_imported ====================

    #[test]
    fn test_ensure_appends_after_last_import() {
        let source = indoc! {"
            import React from 'react';
            import { trpc } from '~/utils/trpc';

            export const a = 1;
        "};
        let result = ensure(source, "@tanstack/react-query", "useQuery");
        assert_eq!(
            result,
            indoc! {"
                import React from 'react';
                import { trpc } from '~/utils/trpc';
                import { useQuery } from '@tanstack/react-query';

                export const a = 1;
            "}
        );
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let source = "import React from 'react';\n";
        let mut doc = Document::parse(source).unwrap();
        let first = ensure_imported(&mut doc, "@tanstack/react-query", "useQuery").unwrap();
        let second = ensure_imported(&mut doc, "@tanstack/react-query", "useQuery").unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(doc.source().matches("useQuery").count(), 1);
    }

    #[test]
    fn test_ensure_respects_existing_specifier() {
        let source = "import { useMutation, useQuery } from '@tanstack/react-query';\n";
        assert_eq!(ensure(source, "@tanstack/react-query", "useQuery"), source);
    }

    #[test]
    fn test_ensure_ignores_other_library() {
        let source = "import { useQuery } from 'react-query';\n";
        let result = ensure(source, "@tanstack/react-query", "useQuery");
        assert!(result.contains("import { useQuery } from '@tanstack/react-query';"));
    }

    #[test]
    fn test_ensure_ignores_type_only_import() {
        let source = "import type { useQuery } from '@tanstack/react-query';\n";
        let result = ensure(source, "@tanstack/react-query", "useQuery");
        assert_eq!(result.matches("import").count(), 2);
    }

    #[test]
    fn test_ensure_copies_quote_style() {
        let source = "import React from \"react\";\n";
        let result = ensure(source, "@tanstack/react-query", "useQuery");
        assert!(result.contains("import { useQuery } from \"@tanstack/react-query\";"));
    }

    #[test]
    fn test_ensure_without_imports_goes_after_directive() {
        let source = "\"use client\";\n\nexport const a = 1;\n";
        let result = ensure(source, "@tanstack/react-query", "useQuery");
        assert_eq!(
            result,
            "\"use client\";\n\nimport { useQuery } from '@tanstack/react-query';\nexport const a = 1;\n"
        );
    }

    // ==================== RebindImportRule ====================

    #[test]
    fn test_rebind_replaces_import_and_binds_name() {
        let source = indoc! {"
            import { trpc } from '~/utils/trpc';

            export function Posts() {
                const posts = trpc.post.list.useQuery();
                return posts;
            }
        "};
        let result = rebind(source).unwrap();
        assert_eq!(
            result,
            indoc! {"
                import { useTRPC } from '~/utils/trpc';

                export function Posts() {
                    const trpc = useTRPC();
                    const posts = trpc.post.list.useQuery();
                    return posts;
                }
            "}
        );
    }

    #[test]
    fn test_rebind_every_top_level_function() {
        let source = indoc! {"
            import { trpc } from '~/utils/trpc';

            function A() {
                return trpc.a.useQuery();
            }

            const B = () => {
                return trpc.b.useQuery();
            };
        "};
        let result = rebind(source).unwrap();
        assert_eq!(result.matches("const trpc = useTRPC();").count(), 2);
        assert_eq!(result.matches("useTRPC }").count(), 1);
    }

    #[test]
    fn test_rebind_skips_nested_function() {
        let source = indoc! {"
            import { trpc } from '~/utils/trpc';

            function A() {
                const opts = useMemo(() => {
                    return trpc.a.queryOptions();
                }, []);
            }
        "};
        let result = rebind(source).unwrap();
        assert_eq!(result.matches("const trpc = useTRPC();").count(), 1);
        let binding = result.find("const trpc").unwrap();
        assert!(binding < result.find("useMemo").unwrap());
    }

    #[test]
    fn test_rebind_requires_configured_module() {
        let source = indoc! {"
            import { trpc } from '~/other/trpc';

            function A() {
                return trpc.a.useQuery();
            }
        "};
        assert!(rebind(source).is_none());
    }

    #[test]
    fn test_rebind_skips_functions_without_reference() {
        let source = indoc! {"
            import { trpc } from '~/utils/trpc';

            function A() {
                return 1;
            }
        "};
        assert!(rebind(source).is_none());
    }

    #[test]
    fn test_rebind_skips_expression_body() {
        let source = indoc! {"
            import { trpc } from '~/utils/trpc';

            const A = () => trpc.a.useQuery();
        "};
        let options = MigrateOptions::new("~/utils/trpc", "trpc");
        let migration = migrate_with_rules(source, &options, &[&RebindImportRule]).unwrap();
        assert!(!migration.is_changed());
        assert_eq!(migration.diagnostics.len(), 1);
        assert_eq!(migration.diagnostics[0].rule, "rebind_import");
    }

    #[test]
    fn test_rebind_same_line_body() {
        let source = indoc! {"
            import { trpc } from '~/utils/trpc';

            function A() { return trpc.a.useQuery(); }
        "};
        let result = rebind(source).unwrap();
        assert!(result.contains("function A() { const trpc = useTRPC(); return trpc.a.useQuery(); }"));
    }

    #[test]
    fn test_rebind_after_function_directive() {
        let source = indoc! {"
            import { trpc } from '~/utils/trpc';

            function A() {
                'use memo';
                return trpc.a.useQuery();
            }
        "};
        let result = rebind(source).unwrap();
        assert!(result.contains(
            "function A() {\n    'use memo';\n    const trpc = useTRPC();\n    return trpc.a.useQuery();\n}"
        ));
    }

    #[test]
    fn test_rebind_skips_parameter_shadow() {
        let source = indoc! {"
            import { trpc } from '~/utils/trpc';

            function A(trpc: Client) {
                return trpc.a.useQuery();
            }
        "};
        assert!(rebind(source).is_none());
    }

    #[test]
    fn test_rebind_is_idempotent() {
        let source = indoc! {"
            import { trpc } from '~/utils/trpc';

            function A() {
                return trpc.a.useQuery();
            }
        "};
        let once = rebind(source).unwrap();
        assert!(rebind(&once).is_none());
    }

    #[test]
    fn test_rebind_empty_body() {
        let source = indoc! {"
            import { trpc } from '~/utils/trpc';

            function A() {}
        "};
        assert!(rebind(source).is_none());
    }
}
