//! Rule: suspense_destructuring
//!
//! The suspense hooks no longer return a `[data, query]` tuple. Bind the
//! query object and read `data` from it instead.
//!
//! Example transformation:
//! ```tsx
//! // Before
//! const [post, postQuery] = useSuspenseQuery(trpc.post.byId.queryOptions({ id }));
//!
//! // After
//! const postQuery = useSuspenseQuery(trpc.post.byId.queryOptions({ id }));
//! const post = postQuery.data;
//! ```

use rqmigrate_core::{line_indent, node_text, visit_all, Edit, Node};

use crate::matcher::{any, call, identifier_in, member, property_in};
use crate::options::MigrateError;
use crate::registry::{Rule, RuleOutput, ScopeCx};

const RULE: &str = "suspense_destructuring";

const SUSPENSE_HOOKS: &[&str] = &["useSuspenseQuery", "useSuspenseInfiniteQuery"];

/// Statement containers a declaration can be followed in
const STATEMENT_PARENTS: &[&str] = &[
    "program",
    "statement_block",
    "switch_case",
    "switch_default",
    "export_statement",
];

/// Elements of an array pattern, with `None` for holes
fn array_slots<'t>(pattern: Node<'t>) -> Vec<Option<Node<'t>>> {
    let mut slots = Vec::new();
    let mut current = None;
    let mut cursor = pattern.walk();

    for child in pattern.children(&mut cursor) {
        match child.kind() {
            "[" | "]" | "comment" => {}
            "," => slots.push(current.take()),
            _ => current = Some(child),
        }
    }
    // A trailing comma does not add an element
    if current.is_some() {
        slots.push(current);
    }
    slots
}

/// Plan the rewrite of every `[data, query]` suspense destructuring in `scope`
pub fn plan_suspense(scope: Node<'_>, source: &str) -> RuleOutput {
    let mut output = RuleOutput::default();
    let suspense_call = call(member(any(), property_in(SUSPENSE_HOOKS)).or(identifier_in(SUSPENSE_HOOKS)));

    let mut declarations = Vec::new();
    visit_all(scope, |node| {
        if matches!(node.kind(), "lexical_declaration" | "variable_declaration") {
            declarations.push(node);
        }
    });

    for declaration in declarations {
        let mut cursor = declaration.walk();
        let declarators: Vec<_> = declaration
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "variable_declarator")
            .collect();
        let [declarator] = declarators.as_slice() else {
            continue;
        };

        let (Some(pattern), Some(value)) = (
            declarator.child_by_field_name("name"),
            declarator.child_by_field_name("value"),
        ) else {
            continue;
        };
        if pattern.kind() != "array_pattern" || suspense_call.matches(value, source).is_none() {
            continue;
        }

        let in_statement_list = declaration
            .parent()
            .is_some_and(|p| STATEMENT_PARENTS.contains(&p.kind()));
        if !in_statement_list {
            continue;
        }

        let slots = array_slots(pattern);
        let (data, query) = match slots.as_slice() {
            [Some(data), Some(query)]
                if data.kind() == "identifier" && query.kind() == "identifier" =>
            {
                (*data, *query)
            }
            _ => {
                output.warn(
                    RULE,
                    &pattern,
                    format!(
                        "Expected `[data, query]` destructuring of a suspense hook, found `{}`; left unchanged",
                        node_text(&pattern, source)
                    ),
                );
                continue;
            }
        };

        let data_name = node_text(&data, source);
        let query_name = node_text(&query, source);
        let indent = line_indent(source, declaration.start_byte());

        output.edit(Edit::replace(
            &pattern,
            query_name,
            format!("Bind {} directly", query_name),
        ));
        output.edit(Edit::insert(
            declaration.end_byte(),
            format!("\n{}const {} = {}.data;", indent, data_name, query_name),
            format!("Read {} from {}.data", data_name, query_name),
        ));
        output.change(
            RULE,
            &declaration,
            format!(
                "Convert [{}, {}] destructuring to {}.data",
                data_name, query_name, query_name
            ),
        );
    }

    output
}

/// Rule: normalize suspense hook tuple destructuring
pub struct SuspenseDestructuringRule;

impl Rule for SuspenseDestructuringRule {
    fn name(&self) -> &'static str {
        RULE
    }

    fn description(&self) -> &'static str {
        "Convert const [data, query] = useSuspenseQuery(...) to a query binding plus query.data"
    }

    fn apply(&self, cx: &mut ScopeCx<'_>) -> Result<bool, MigrateError> {
        let output = {
            let Some(scope) = cx.scope() else {
                return Ok(false);
            };
            plan_suspense(scope, cx.source())
        };
        cx.commit(output)
    }
}
