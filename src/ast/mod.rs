//! Abstract syntax tree.
//!
//! A node is either a leaf carrying a literal value, an identifier or a type
//! handle, or an internal node carrying a [`NodeKind`] tag and an ordered
//! sequence of owned children. Nodes are immutable once constructed; the
//! `ModuleDefinition` root owns the entire tree. Every node records the
//! source location it was parsed at.

mod precedence;
pub mod printer;

pub use precedence::{associativity, has_higher_precedence, operand_count, precedence, Associativity};

use crate::stream::Location;
use crate::types::TypeHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum NodeKind {
    Call,
    Parentheses,
    Index,
    MemberCall,

    Exponent,

    UnaryPlus,
    UnaryMinus,

    Multiplication,
    Division,
    FloorDivision,
    Modulus,

    Addition,
    Subtraction,

    BitwiseLeftShift,
    BitwiseRightShift,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseNot,

    Equality,
    Inequality,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,

    IsIdentical,
    IsNotIdentical,
    IsMemberOf,
    IsNotMemberOf,

    LogicalNot,
    LogicalAnd,
    LogicalOr,

    Assign,

    AssignExponent,
    AssignAddition,
    AssignSubtraction,
    AssignMultiplication,
    AssignDivision,
    AssignFloorDivision,
    AssignModulus,
    AssignBitwiseLeftShift,
    AssignBitwiseRightShift,
    AssignBitwiseAnd,
    AssignBitwiseOr,
    AssignBitwiseXor,

    StatementIf,
    StatementElif,
    StatementElse,
    StatementWhile,
    StatementPass,
    StatementReturn,
    StatementImport,
    StatementAssert,

    ContractDefinition,
    FunctionDefinition,
    FunctionParameterDefinition,
    ModuleDefinition,
    VariableDefinition,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum NodeValue {
    Kind(NodeKind),
    Identifier(String),
    Number(i64),
    Str(String),
    Bool(bool),
    TypeId(TypeHandle),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Node {
    pub value: NodeValue,
    pub children: Vec<Node>,
    pub location: Location,
}

impl Node {
    pub fn leaf(value: NodeValue, location: Location) -> Self {
        Node { value, children: Vec::new(), location }
    }

    pub fn internal(kind: NodeKind, children: Vec<Node>, location: Location) -> Self {
        Node { value: NodeValue::Kind(kind), children, location }
    }

    pub fn kind(&self) -> Option<NodeKind> {
        match self.value {
            NodeValue::Kind(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_kind(&self, kind: NodeKind) -> bool {
        self.value == NodeValue::Kind(kind)
    }

    pub fn identifier(&self) -> Option<&str> {
        match &self.value {
            NodeValue::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn type_id(&self) -> Option<TypeHandle> {
        match self.value {
            NodeValue::TypeId(handle) => Some(handle),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_node_owns_children() {
        let location = Location::default();
        let node = Node::internal(
            NodeKind::Addition,
            vec![
                Node::leaf(NodeValue::Number(1), location),
                Node::leaf(NodeValue::Number(2), location),
            ],
            location,
        );
        assert!(node.is_kind(NodeKind::Addition));
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[0].value, NodeValue::Number(1));
    }

    #[test]
    fn leaf_accessors_discriminate() {
        let location = Location::default();
        let ident = Node::leaf(NodeValue::Identifier("x".to_string()), location);
        assert_eq!(ident.identifier(), Some("x"));
        assert_eq!(ident.kind(), None);
        assert_eq!(ident.type_id(), None);

        let ty = Node::leaf(NodeValue::TypeId(TypeHandle::NUM), location);
        assert_eq!(ty.type_id(), Some(TypeHandle::NUM));
    }
}
