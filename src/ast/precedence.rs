//! Operator precedence, associativity and arity.
//!
//! Smaller group numbers bind tighter. Only `Exponent` is right-associative.

use super::NodeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    LeftToRight,
    RightToLeft,
}

/// Precedence group of a node kind, 1 (tightest) through 16 (loosest).
pub fn precedence(kind: NodeKind) -> u8 {
    use NodeKind::*;
    match kind {
        Call | Parentheses => 1,

        Index | MemberCall => 2,

        Exponent => 3,

        UnaryPlus | UnaryMinus | BitwiseNot => 4,

        Multiplication | Division | FloorDivision | Modulus => 5,

        Addition | Subtraction => 6,

        BitwiseLeftShift | BitwiseRightShift => 7,

        BitwiseAnd => 8,

        BitwiseXor => 9,

        BitwiseOr => 10,

        Equality | Inequality | GreaterThan | GreaterThanEqual | LessThan | LessThanEqual
        | IsIdentical | IsNotIdentical | IsMemberOf | IsNotMemberOf => 11,

        LogicalNot => 12,

        LogicalAnd => 13,

        LogicalOr => 14,

        Assign | AssignExponent | AssignAddition | AssignSubtraction | AssignMultiplication
        | AssignDivision | AssignFloorDivision | AssignModulus | AssignBitwiseLeftShift
        | AssignBitwiseRightShift | AssignBitwiseAnd | AssignBitwiseOr | AssignBitwiseXor => 15,

        StatementIf | StatementElif | StatementElse | StatementWhile | StatementPass
        | StatementReturn | StatementImport | StatementAssert | ContractDefinition
        | FunctionDefinition | FunctionParameterDefinition | ModuleDefinition
        | VariableDefinition => 16,
    }
}

pub fn associativity(kind: NodeKind) -> Associativity {
    if kind == NodeKind::Exponent {
        Associativity::RightToLeft
    } else {
        Associativity::LeftToRight
    }
}

/// Number of operands required before the parser pushes the operator. Kinds
/// whose operand count is discovered while parsing (calls, bodies of compound
/// statements) report only the required minimum.
pub fn operand_count(kind: NodeKind) -> usize {
    use NodeKind::*;
    match kind {
        StatementPass | StatementElse | ModuleDefinition => 0,

        UnaryPlus | UnaryMinus | BitwiseNot | LogicalNot | StatementReturn | StatementImport
        | StatementAssert => 1,

        Index | Exponent | Multiplication | Division | FloorDivision | Modulus | Addition
        | Subtraction | BitwiseLeftShift | BitwiseRightShift | BitwiseAnd | BitwiseOr
        | BitwiseXor | Equality | Inequality | GreaterThan | GreaterThanEqual | LessThan
        | LessThanEqual | IsIdentical | IsNotIdentical | IsMemberOf | IsNotMemberOf
        | LogicalAnd | LogicalOr | Assign | AssignExponent | AssignAddition
        | AssignSubtraction | AssignMultiplication | AssignDivision | AssignFloorDivision
        | AssignModulus | AssignBitwiseLeftShift | AssignBitwiseRightShift | AssignBitwiseAnd
        | AssignBitwiseOr | AssignBitwiseXor | MemberCall | FunctionParameterDefinition => 2,

        Call | Parentheses | StatementIf | StatementElif | StatementWhile
        | ContractDefinition | FunctionDefinition | VariableDefinition => 1,
    }
}

/// Shunting rule: a pending operator `lhs` is popped before pushing `rhs`
/// when it binds at least as tight (left-associative) or strictly tighter
/// (right-associative).
pub fn has_higher_precedence(lhs: NodeKind, rhs: NodeKind) -> bool {
    match associativity(lhs) {
        Associativity::LeftToRight => precedence(lhs) <= precedence(rhs),
        Associativity::RightToLeft => precedence(lhs) < precedence(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use NodeKind::*;

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert!(precedence(Multiplication) < precedence(Addition));
        assert!(has_higher_precedence(Multiplication, Addition));
        assert!(!has_higher_precedence(Addition, Multiplication));
    }

    #[test]
    fn left_associative_pops_equal_precedence() {
        assert!(has_higher_precedence(Addition, Subtraction));
        assert!(has_higher_precedence(Subtraction, Addition));
    }

    #[test]
    fn exponent_is_right_associative() {
        assert_eq!(associativity(Exponent), Associativity::RightToLeft);
        assert!(!has_higher_precedence(Exponent, Exponent));
    }

    #[test]
    fn comparisons_share_a_group() {
        assert_eq!(precedence(Equality), precedence(LessThanEqual));
        assert_eq!(precedence(IsIdentical), precedence(GreaterThan));
    }

    #[test]
    fn assignments_are_looser_than_logic() {
        assert!(precedence(LogicalOr) < precedence(Assign));
        assert!(precedence(Assign) < precedence(StatementIf));
    }

    #[test]
    fn unary_kinds_take_one_operand() {
        assert_eq!(operand_count(UnaryMinus), 1);
        assert_eq!(operand_count(LogicalNot), 1);
        assert_eq!(operand_count(StatementReturn), 1);
    }

    #[test]
    fn dynamic_kinds_require_one_operand() {
        assert_eq!(operand_count(Call), 1);
        assert_eq!(operand_count(FunctionDefinition), 1);
        assert_eq!(operand_count(StatementElse), 0);
        assert_eq!(operand_count(ModuleDefinition), 0);
    }
}
