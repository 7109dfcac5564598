//! Rule: utils_proxy
//!
//! Replaces the `useUtils()` helper object with the shared query client.
//! Every call made through the helper, anywhere in the file, is rewritten
//! to pass a query filter to the equivalent client method.
//!
//! Example transformation:
//! ```tsx
//! // Before
//! const utils = trpc.useUtils();
//! utils.post.list.invalidate();
//!
//! // After
//! import { useQueryClient } from '@tanstack/react-query';
//! const queryClient = useQueryClient();
//! queryClient.invalidateQueries(trpc.post.list.queryFilter());
//! ```
//!
//! Sites are resolved against one tree before anything is edited, so the
//! helper name is never looked up after it has been renamed.

use rqmigrate_core::{node_text, visit_all, Edit, Node, Span};
use tracing::debug;

use crate::imports::declares;
use crate::matcher::{call, identifier_named, member, property_in};
use crate::options::{MigrateError, MigrateOptions};
use crate::registry::{Rule, RuleOutput, ScopeCx};
use crate::walker::enclosing_function;

const RULE: &str = "utils_proxy";

const UTILS_ACCESSORS: &[&str] = &["useUtils", "useContext"];

/// Helper methods and their query client counterparts
///
/// `setMutationDefaults`, `getMutationDefaults` and `isMutating` have no
/// filter-based equivalent and are left for manual migration.
pub const UTILITY_METHODS: &[(&str, &str)] = &[
    ("fetch", "fetchQuery"),
    ("fetchInfinite", "fetchInfiniteQuery"),
    ("prefetch", "prefetchQuery"),
    ("prefetchInfinite", "prefetchInfiniteQuery"),
    ("ensureData", "ensureQueryData"),
    ("invalidate", "invalidateQueries"),
    ("reset", "resetQueries"),
    ("refetch", "refetchQueries"),
    ("cancel", "cancelQuery"),
    ("setData", "setQueryData"),
    ("setQueriesData", "setQueriesData"),
    ("setInfiniteData", "setInfiniteQueryData"),
    ("getData", "getQueryData"),
    ("getInfiniteData", "getInfiniteQueryData"),
];

/// Query client method for a helper method, if it has one
pub fn mapped_method(method: &str) -> Option<&'static str> {
    UTILITY_METHODS
        .iter()
        .find(|(helper, _)| *helper == method)
        .map(|(_, client)| *client)
}

/// `const <name> = <root>.useUtils()`
#[derive(Debug, Clone, Copy)]
struct UtilsBinding<'t> {
    name: Node<'t>,
    call: Node<'t>,
}

/// Declarations of the helper found under a scope
#[derive(Debug, Default)]
struct Resolved<'t> {
    bindings: Vec<UtilsBinding<'t>>,
    /// Declarators binding a pattern, owned directly by the scope
    patterns: Vec<Node<'t>>,
}

fn resolve<'t>(scope: Node<'t>, source: &str, options: &MigrateOptions) -> Resolved<'t> {
    let mut resolved = Resolved::default();
    let roots = identifier_named(options.trpc_import_name.as_str())
        .or(identifier_named(options.proxy_root.as_str()));
    let pattern = call(member(roots, property_in(UTILS_ACCESSORS))).bind("call");

    for bindings in pattern.find_all(scope, source) {
        let Some(call) = bindings.get("call") else {
            continue;
        };
        let Some(declarator) = call
            .parent()
            .filter(|parent| parent.kind() == "variable_declarator")
        else {
            debug!(line = call.start_position().row + 1, "Helper call is not bound to a variable");
            continue;
        };
        let is_value = declarator
            .child_by_field_name("value")
            .is_some_and(|value| value.id() == call.id());
        let Some(name) = declarator.child_by_field_name("name").filter(|_| is_value) else {
            continue;
        };

        if name.kind() == "identifier" {
            resolved.bindings.push(UtilsBinding { name, call });
        } else if enclosing_function(declarator).is_some_and(|f| f.id() == scope.id()) {
            resolved.patterns.push(name);
        }
    }

    resolved
}

/// How one reference to the helper name is handled
enum Site<'t> {
    Rewrite {
        call: Node<'t>,
        method: Node<'t>,
        mapped: &'static str,
    },
    Malformed(String),
    NotProxy,
}

/// Classify a reference by climbing its member chain
fn classify<'t>(reference: Node<'t>, source: &str) -> Site<'t> {
    let mut top = reference;
    let mut depth = 0;
    while let Some(parent) = top.parent() {
        let is_object = parent
            .child_by_field_name("object")
            .is_some_and(|object| object.id() == top.id());
        if !is_object {
            break;
        }
        match parent.kind() {
            "member_expression" => {
                top = parent;
                depth += 1;
            }
            "subscript_expression" => {
                return Site::Malformed(format!(
                    "Computed access in `{}`; left unchanged",
                    node_text(&parent, source)
                ));
            }
            _ => break,
        }
    }

    if depth == 0 {
        return Site::NotProxy;
    }

    let chain = node_text(&top, source);
    let call = top.parent().filter(|parent| {
        parent.kind() == "call_expression"
            && parent
                .child_by_field_name("function")
                .is_some_and(|function| function.id() == top.id())
    });
    let Some(call) = call else {
        return Site::Malformed(format!("`{}` is not called; left unchanged", chain));
    };
    if depth < 2 {
        return Site::Malformed(format!(
            "Expected `<utils>.<path>.<method>(...)`, found `{}(...)`; left unchanged",
            chain
        ));
    }

    let Some(method) = top
        .child_by_field_name("property")
        .filter(|property| property.kind() == "property_identifier")
    else {
        return Site::Malformed(format!("Cannot resolve the method of `{}`; left unchanged", chain));
    };
    let method_name = node_text(&method, source);
    match mapped_method(method_name) {
        Some(mapped) => Site::Rewrite {
            call,
            method,
            mapped,
        },
        None => Site::Malformed(format!(
            "`{}` has no query client equivalent; left unchanged",
            method_name
        )),
    }
}

/// Span covering the declarator of `binding`, its separator and, when it is
/// the only declarator, the whole declaration line
fn declaration_span(binding: UtilsBinding<'_>, source: &str) -> Option<Span> {
    let declarator = binding.call.parent()?;
    let declaration = declarator.parent()?;
    let mut cursor = declaration.walk();
    let declarators: Vec<_> = declaration
        .named_children(&mut cursor)
        .filter(|node| node.kind() == "variable_declarator")
        .collect();
    let index = declarators
        .iter()
        .position(|node| node.id() == declarator.id())?;

    if declarators.len() > 1 {
        return Some(match declarators.get(index + 1) {
            Some(next) => Span::new(declarator.start_byte(), next.start_byte()),
            None => Span::new(declarators[index - 1].end_byte(), declarator.end_byte()),
        });
    }

    let start = declaration.start_byte();
    let end = declaration.end_byte();
    let line_start = source[..start].rfind('\n').map_or(0, |newline| newline + 1);
    let starts_line = source[line_start..start].chars().all(char::is_whitespace);
    if starts_line && source[end..].starts_with('\n') {
        Some(Span::new(line_start, end + 1))
    } else {
        Some(Span::new(start, end))
    }
}

/// Plan the migration of one helper binding and every call made through it
///
/// Malformed sites are warned about only when `report_sites` is set; they
/// are never edited, so a later binding with the same name would find them
/// again.
fn plan_binding(
    binding: UtilsBinding<'_>,
    root: Node<'_>,
    source: &str,
    options: &MigrateOptions,
    report_sites: bool,
    output: &mut RuleOutput,
) {
    let name = node_text(&binding.name, source);

    let mut references = Vec::new();
    visit_all(root, |node| {
        if node.kind() == "identifier"
            && node.id() != binding.name.id()
            && node_text(&node, source) == name
        {
            references.push(node);
        }
    });

    for reference in references {
        match classify(reference, source) {
            Site::Rewrite {
                call,
                method,
                mapped,
            } => {
                output.edit(Edit::insert(
                    call.start_byte(),
                    format!("{}.{}(", options.query_client, mapped),
                    format!("Call {}.{}", options.query_client, mapped),
                ));
                output.edit(Edit::replace(
                    &reference,
                    options.proxy_root.as_str(),
                    format!("Use {} as the path root", options.proxy_root),
                ));
                output.edit(Edit::replace(
                    &method,
                    options.query_filter.as_str(),
                    format!("Pass {}", options.query_filter),
                ));
                output.edit(Edit::insert(call.end_byte(), ")", "Close query client call"));
                output.change(
                    RULE,
                    &call,
                    format!(
                        "Convert {}.{}() to {}.{}()",
                        name,
                        node_text(&method, source),
                        options.query_client,
                        mapped
                    ),
                );
            }
            Site::Malformed(message) if report_sites => output.warn(RULE, &reference, message),
            Site::Malformed(_) => {}
            Site::NotProxy => {
                debug!(
                    line = reference.start_position().row + 1,
                    name, "Skipping non-member use of helper"
                );
            }
        }
    }

    // A query client already bound next to the helper takes over its sites
    let reuse = name != options.query_client
        && enclosing_function(binding.name)
            .is_some_and(|function| declares(function, &options.query_client, source));
    if reuse {
        if let Some(span) = declaration_span(binding, source) {
            output.edit(Edit::new(
                span,
                "",
                format!("Remove {} in favor of {}", name, options.query_client),
            ));
            output.change(
                RULE,
                &binding.call,
                format!(
                    "Remove `{}`; `{}` is already in scope",
                    node_text(&binding.call, source),
                    options.query_client
                ),
            );
            return;
        }
    }

    output.edit(Edit::replace(
        &binding.call,
        format!("{}()", options.use_query_client),
        format!("Call {}()", options.use_query_client),
    ));
    output.edit(Edit::replace(
        &binding.name,
        options.query_client.as_str(),
        format!("Rename {} to {}", name, options.query_client),
    ));
    output.change(
        RULE,
        &binding.call,
        format!(
            "Replace `{}` with `{}()`",
            node_text(&binding.call, source),
            options.use_query_client
        ),
    );
    output.require_import(
        options.query_client_library.as_str(),
        options.use_query_client.as_str(),
    );
}

/// Rule: migrate the useUtils helper to the query client
pub struct UtilsProxyRule;

impl Rule for UtilsProxyRule {
    fn name(&self) -> &'static str {
        RULE
    }

    fn description(&self) -> &'static str {
        "Convert utils.path.invalidate() and friends to queryClient.invalidateQueries(trpc.path.queryFilter())"
    }

    fn apply(&self, cx: &mut ScopeCx<'_>) -> Result<bool, MigrateError> {
        let mut changed = false;
        let mut first = true;

        // One binding per commit: the next one is resolved against the
        // rewritten tree, where sites it shares with earlier ones are gone.
        loop {
            let mut reported = None;
            let output = {
                let Some(scope) = cx.scope() else {
                    return Ok(changed);
                };
                let (root, source, options) = (cx.root(), cx.source(), cx.options());
                let resolved = resolve(scope, source, options);

                let mut output = RuleOutput::default();
                if first {
                    for pattern in &resolved.patterns {
                        output.warn(
                            RULE,
                            pattern,
                            format!(
                                "Helper bound to `{}` instead of a plain name; left unchanged",
                                node_text(pattern, source)
                            ),
                        );
                    }
                }
                if let Some(binding) = resolved.bindings.first() {
                    let key = format!("{}:{}", RULE, node_text(&binding.name, source));
                    let report_sites = !cx.is_reported(&key);
                    plan_binding(*binding, root, source, options, report_sites, &mut output);
                    reported = Some(key);
                }
                output
            };
            first = false;
            if let Some(key) = reported {
                cx.mark_reported(key);
            }

            if output.is_empty() {
                cx.commit(output)?;
                return Ok(changed);
            }
            changed |= cx.commit(output)?;
        }
    }
}
