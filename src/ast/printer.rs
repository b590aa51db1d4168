//! Indented text dump of an AST, used by the driver's `--ast` flag.

use super::{Node, NodeValue};
use std::fmt::Write;

pub fn print(root: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, root, 0);
    out
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    match &node.value {
        NodeValue::Kind(kind) => {
            let _ = writeln!(out, "{:?}", kind);
        }
        NodeValue::Identifier(name) => {
            let _ = writeln!(out, "Identifier: {}", name);
        }
        NodeValue::Number(value) => {
            let _ = writeln!(out, "Number: {}", value);
        }
        NodeValue::Str(value) => {
            let _ = writeln!(out, "String: {:?}", value);
        }
        NodeValue::Bool(value) => {
            let _ = writeln!(out, "Boolean: {}", value);
        }
        NodeValue::TypeId(handle) => {
            let _ = writeln!(out, "Type: {}", handle.primitive_name().unwrap_or("<contract>"));
        }
    }
    for child in &node.children {
        write_node(out, child, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::stream::Location;

    #[test]
    fn nested_nodes_are_indented() {
        let location = Location::default();
        let tree = Node::internal(
            NodeKind::Addition,
            vec![
                Node::leaf(NodeValue::Identifier("a".to_string()), location),
                Node::leaf(NodeValue::Number(2), location),
            ],
            location,
        );
        let printed = print(&tree);
        assert_eq!(printed, "Addition\n  Identifier: a\n  Number: 2\n");
    }
}
