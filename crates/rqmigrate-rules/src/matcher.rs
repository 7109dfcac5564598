//! Declarative structural matching over tree-sitter nodes
//!
//! A `Pattern` is built from a few primitives (`identifier`, `member`,
//! `call`, ...) and matched against a node. A successful match returns the
//! nodes captured with `bind`, a failed match returns `None`.
//!
//! ```ignore
//! // trpc.useUtils() / trpc.useContext()
//! let pattern = call(member(
//!     identifier_named("trpc"),
//!     property_in(&["useUtils", "useContext"]).bind("method"),
//! ))
//! .bind("call");
//! ```

use rqmigrate_core::{node_text, visit_all, Node};

/// Name constraint for identifiers and properties
#[derive(Debug, Clone)]
pub enum Names {
    Any,
    Exact(String),
    OneOf(&'static [&'static str]),
}

impl Names {
    fn matches(&self, text: &str) -> bool {
        match self {
            Names::Any => true,
            Names::Exact(name) => name == text,
            Names::OneOf(names) => names.contains(&text),
        }
    }
}

/// A structural pattern over syntax nodes
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches any node
    Any,
    /// Plain identifier reference
    Identifier(Names),
    /// Non-computed member property (`obj.name`)
    Property(Names),
    /// Member access `object.property`
    Member {
        object: Box<Pattern>,
        property: Box<Pattern>,
    },
    /// Call expression with the given callee
    Call { callee: Box<Pattern> },
    /// Capture the matched node under a name
    Bind(&'static str, Box<Pattern>),
    /// First matching alternative wins
    Either(Vec<Pattern>),
}

/// Nodes captured by a successful match
#[derive(Debug, Clone, Default)]
pub struct Bindings<'t> {
    nodes: Vec<(&'static str, Node<'t>)>,
}

impl<'t> Bindings<'t> {
    /// Get a captured node
    pub fn get(&self, name: &str) -> Option<Node<'t>> {
        self.nodes
            .iter()
            .find(|(bound, _)| *bound == name)
            .map(|(_, node)| *node)
    }

    fn push(&mut self, name: &'static str, node: Node<'t>) {
        self.nodes.push((name, node));
    }
}

impl Pattern {
    /// Match a node, returning the captured bindings on success
    pub fn matches<'t>(&self, node: Node<'t>, source: &str) -> Option<Bindings<'t>> {
        let mut bindings = Bindings::default();
        self.match_into(node, source, &mut bindings)
            .then_some(bindings)
    }

    /// Every match under `root` (inclusive), in document order
    pub fn find_all<'t>(&self, root: Node<'t>, source: &str) -> Vec<Bindings<'t>> {
        let mut found = Vec::new();
        visit_all(root, |node| {
            if let Some(bindings) = self.matches(node, source) {
                found.push(bindings);
            }
        });
        found
    }

    /// Capture the node matched by this pattern
    pub fn bind(self, name: &'static str) -> Self {
        Pattern::Bind(name, Box::new(self))
    }

    /// Try this pattern, then `other`
    pub fn or(self, other: Pattern) -> Self {
        match self {
            Pattern::Either(mut alternatives) => {
                alternatives.push(other);
                Pattern::Either(alternatives)
            }
            first => Pattern::Either(vec![first, other]),
        }
    }

    fn match_into<'t>(&self, node: Node<'t>, source: &str, bindings: &mut Bindings<'t>) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Identifier(names) => {
                node.kind() == "identifier" && names.matches(node_text(&node, source))
            }
            Pattern::Property(names) => {
                node.kind() == "property_identifier" && names.matches(node_text(&node, source))
            }
            Pattern::Member { object, property } => {
                if node.kind() != "member_expression" {
                    return false;
                }
                let (Some(obj), Some(prop)) = (
                    node.child_by_field_name("object"),
                    node.child_by_field_name("property"),
                ) else {
                    return false;
                };
                object.match_into(obj, source, bindings) && property.match_into(prop, source, bindings)
            }
            Pattern::Call { callee } => {
                if node.kind() != "call_expression" {
                    return false;
                }
                match node.child_by_field_name("function") {
                    Some(function) => callee.match_into(function, source, bindings),
                    None => false,
                }
            }
            Pattern::Bind(name, inner) => {
                if inner.match_into(node, source, bindings) {
                    bindings.push(name, node);
                    true
                } else {
                    false
                }
            }
            Pattern::Either(alternatives) => {
                let mark = bindings.nodes.len();
                for alternative in alternatives {
                    if alternative.match_into(node, source, bindings) {
                        return true;
                    }
                    bindings.nodes.truncate(mark);
                }
                false
            }
        }
    }
}

pub fn any() -> Pattern {
    Pattern::Any
}

pub fn identifier() -> Pattern {
    Pattern::Identifier(Names::Any)
}

pub fn identifier_named(name: impl Into<String>) -> Pattern {
    Pattern::Identifier(Names::Exact(name.into()))
}

pub fn identifier_in(names: &'static [&'static str]) -> Pattern {
    Pattern::Identifier(Names::OneOf(names))
}

pub fn property_named(name: impl Into<String>) -> Pattern {
    Pattern::Property(Names::Exact(name.into()))
}

pub fn property_in(names: &'static [&'static str]) -> Pattern {
    Pattern::Property(Names::OneOf(names))
}

pub fn member(object: Pattern, property: Pattern) -> Pattern {
    Pattern::Member {
        object: Box::new(object),
        property: Box::new(property),
    }
}

pub fn call(callee: Pattern) -> Pattern {
    Pattern::Call {
        callee: Box::new(callee),
    }
}
