//! Traversal helpers for tree-sitter syntax trees
//!
//! Provides a trait-based visitor that rules can implement, plus a few
//! free functions for the common "find every node of kind K" queries.
//! All traversals are pre-order, so results come back in document order.

use tree_sitter::Node;

/// Trait for visiting syntax nodes
pub trait Visitor<'t> {
    /// Called for each node. Return `true` to continue traversal into children.
    fn visit_node(&mut self, node: Node<'t>, source: &str) -> bool;
}

/// Run a visitor over `root` and all of its descendants
pub fn visit<'t, V: Visitor<'t>>(visitor: &mut V, root: Node<'t>, source: &str) {
    let mut cursor = root.walk();
    let mut descend = visitor.visit_node(root, source);

    loop {
        if descend && cursor.goto_first_child() {
            descend = visitor.visit_node(cursor.node(), source);
            continue;
        }

        loop {
            if cursor.node().id() == root.id() {
                return;
            }
            if cursor.goto_next_sibling() {
                descend = visitor.visit_node(cursor.node(), source);
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

struct FnVisitor<F>(F);

impl<'t, F: FnMut(Node<'t>)> Visitor<'t> for FnVisitor<F> {
    fn visit_node(&mut self, node: Node<'t>, _source: &str) -> bool {
        (self.0)(node);
        true
    }
}

/// Call `f` on `root` and every descendant
pub fn visit_all<'t>(root: Node<'t>, f: impl FnMut(Node<'t>)) {
    visit(&mut FnVisitor(f), root, "");
}

/// Collect every node of the given kind under `root` (inclusive)
pub fn descendants_of_kind<'t>(root: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    let mut found = Vec::new();
    visit_all(root, |node| {
        if node.kind() == kind {
            found.push(node);
        }
    });
    found
}

/// Source text covered by a node
pub fn node_text<'s>(node: &Node<'_>, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Leading whitespace of the line containing `offset`
pub fn line_indent(source: &str, offset: usize) -> &str {
    let line_start = source[..offset.min(source.len())]
        .rfind('\n')
        .map_or(0, |i| i + 1);
    let rest = &source[line_start..];
    let width = rest
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(rest.len());
    &rest[..width]
}

/// Convert byte offset to line and column numbers (1-based)
pub fn offset_to_line_column(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;
    use indoc::indoc;

    #[test]
    fn test_descendants_in_document_order() {
        let source = "a(); function f() { b(); c(); }";
        let doc = Document::parse(source).unwrap();
        let calls: Vec<_> = descendants_of_kind(doc.root(), "call_expression")
            .iter()
            .map(|n| node_text(n, source).to_string())
            .collect();
        assert_eq!(calls, vec!["a()", "b()", "c()"]);
    }

    #[test]
    fn test_descendants_of_subtree_only() {
        let source = "a(); function f() { b(); }";
        let doc = Document::parse(source).unwrap();
        let function = descendants_of_kind(doc.root(), "function_declaration")[0];
        let calls = descendants_of_kind(function, "call_expression");
        assert_eq!(calls.len(), 1);
        assert_eq!(node_text(&calls[0], source), "b()");
    }

    struct SkipFunctions {
        seen: Vec<String>,
    }

    impl<'t> Visitor<'t> for SkipFunctions {
        fn visit_node(&mut self, node: Node<'t>, source: &str) -> bool {
            if node.kind() == "identifier" {
                self.seen.push(node_text(&node, source).to_string());
            }
            node.kind() != "arrow_function"
        }
    }

    #[test]
    fn test_visitor_can_prune() {
        let source = "const a = b; const c = () => d;";
        let doc = Document::parse(source).unwrap();
        let mut visitor = SkipFunctions { seen: Vec::new() };
        visit(&mut visitor, doc.root(), source);
        assert_eq!(visitor.seen, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_line_indent() {
        let source = indoc! {"
            function f() {
                const a = 1;
            }
        "};
        let offset = source.find("const").unwrap();
        assert_eq!(line_indent(source, offset), "    ");
        assert_eq!(line_indent(source, 0), "");
    }

    #[test]
    fn test_offset_to_line_column() {
        let source = "line1\nline2\nline3";
        assert_eq!(offset_to_line_column(source, 0), (1, 1));
        assert_eq!(offset_to_line_column(source, 5), (1, 6));
        assert_eq!(offset_to_line_column(source, 6), (2, 1));
        assert_eq!(offset_to_line_column(source, 12), (3, 1));
    }
}
