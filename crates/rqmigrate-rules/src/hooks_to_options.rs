//! Rule: hooks_to_options
//!
//! Moves tRPC procedure hooks onto the TanStack Query hooks by way of the
//! matching options producer.
//!
//! Example transformation:
//! ```tsx
//! // Before
//! const posts = trpc.post.list.useQuery(input);
//!
//! // After
//! import { useQuery } from '@tanstack/react-query';
//! const posts = useQuery(trpc.post.list.queryOptions(input));
//! ```

use rqmigrate_core::{Edit, Node};

use crate::matcher::{any, call, member, property_named};
use crate::options::MigrateError;
use crate::registry::{Rule, RuleOutput, ScopeCx};

const RULE: &str = "hooks_to_options";

/// A hook and the options producer that replaces its inline arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookRule {
    pub hook: &'static str,
    pub producer: &'static str,
    pub library: &'static str,
}

const REACT_QUERY: &str = "@tanstack/react-query";
const TRPC_REACT_QUERY: &str = "@trpc/tanstack-react-query";

/// Known hooks, in rewrite order
pub const HOOK_RULES: &[HookRule] = &[
    HookRule {
        hook: "useQuery",
        producer: "queryOptions",
        library: REACT_QUERY,
    },
    HookRule {
        hook: "useSuspenseQuery",
        producer: "queryOptions",
        library: REACT_QUERY,
    },
    HookRule {
        hook: "useInfiniteQuery",
        producer: "infiniteQueryOptions",
        library: REACT_QUERY,
    },
    HookRule {
        hook: "useSuspenseInfiniteQuery",
        producer: "infiniteQueryOptions",
        library: REACT_QUERY,
    },
    HookRule {
        hook: "useMutation",
        producer: "mutationOptions",
        library: REACT_QUERY,
    },
    HookRule {
        hook: "useSubscription",
        producer: "subscriptionOptions",
        library: TRPC_REACT_QUERY,
    },
];

/// Look up the rule for a hook name
pub fn hook_rule(hook: &str) -> Option<&'static HookRule> {
    HOOK_RULES.iter().find(|rule| rule.hook == hook)
}

/// Plan `obj.hook(args)` -> `hook(obj.producer(args))` for every match in `scope`
pub fn plan_hook(rule: &HookRule, scope: Node<'_>, source: &str) -> RuleOutput {
    let mut output = RuleOutput::default();
    let pattern = call(member(any(), property_named(rule.hook).bind("property"))).bind("call");

    for bindings in pattern.find_all(scope, source) {
        let (Some(call), Some(property)) = (bindings.get("call"), bindings.get("property")) else {
            continue;
        };

        // Outer calls come first in document order, so their opening text
        // lands before that of any call nested in their callee.
        output.edit(Edit::insert(
            call.start_byte(),
            format!("{}(", rule.hook),
            format!("Wrap in {}()", rule.hook),
        ));
        output.edit(Edit::replace(
            &property,
            rule.producer,
            format!("Rename {} to {}", rule.hook, rule.producer),
        ));
        output.edit(Edit::insert(call.end_byte(), ")", format!("Close {}()", rule.hook)));
        output.change(
            RULE,
            &call,
            format!(
                "Convert .{}() to {}(.{}())",
                rule.hook, rule.hook, rule.producer
            ),
        );
    }

    if !output.is_empty() {
        output.require_import(rule.library, rule.hook);
    }
    output
}

/// Rule: rewrite procedure hooks into options-producer calls
pub struct HooksToOptionsRule;

impl Rule for HooksToOptionsRule {
    fn name(&self) -> &'static str {
        RULE
    }

    fn description(&self) -> &'static str {
        "Convert trpc.path.useQuery(input) to useQuery(trpc.path.queryOptions(input)) and friends"
    }

    fn apply(&self, cx: &mut ScopeCx<'_>) -> Result<bool, MigrateError> {
        let mut changed = false;

        // One hook kind per commit, each planned against a fresh tree
        for rule in HOOK_RULES {
            let output = {
                let Some(scope) = cx.scope() else {
                    return Ok(changed);
                };
                plan_hook(rule, scope, cx.source())
            };
            changed |= cx.commit(output)?;
        }

        Ok(changed)
    }
}
