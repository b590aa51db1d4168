//! Shunting-Yard parser.
//!
//! A single recursive function drives the whole grammar: expressions run
//! through two working stacks (owned operand subtrees and pending operators),
//! while compound statements (`if`, `elif`, `else`, `while`, `def`, `let`,
//! `contract`) recurse into indented bodies. At the root a `ModuleDefinition`
//! sentinel sits at the bottom of the operator stack, so module-level
//! statements float above the arithmetic shunting.
//!
//! ```text
//! source ─ tokenizer ─ cursor ─ HERE ─ AST (ModuleDefinition root)
//! ```

use crate::ast::{self, Node, NodeKind, NodeValue};
use crate::error::{CompileError, Result};
use crate::lexer::TokenCursor;
use crate::reserved::ReservedToken;
use crate::stream::Location;
use crate::token::TokenValue;
use crate::types::TypeHandle;

/// Pending operator on the shunting stack: kind, the position it was read
/// at, and the running operand count (grown while arguments or body
/// statements are parsed).
struct OperatorInfo {
    kind: NodeKind,
    location: Location,
    operand_count: usize,
}

impl OperatorInfo {
    fn new(kind: NodeKind, location: Location) -> Self {
        OperatorInfo { kind, location, operand_count: ast::operand_count(kind) }
    }
}

/// Parse a whole source file into its `ModuleDefinition` root.
pub fn parse(cursor: &mut TokenCursor) -> Result<Node> {
    let module = parse_impl(cursor, 0, false)?;
    module.ok_or_else(|| {
        CompileError::internal(cursor.peek().location, "Parsing produced no module")
    })
}

/// Tokens that terminate the current expression.
fn is_end_of_expression(value: &TokenValue) -> bool {
    match value {
        TokenValue::Indentation | TokenValue::Newline | TokenValue::Eof => true,
        TokenValue::Reserved(token) => matches!(
            token,
            ReservedToken::OpParenClose
                | ReservedToken::OpSubscriptClose
                | ReservedToken::OpColon
                | ReservedToken::OpComma
        ),
        _ => false,
    }
}

/// Map a reserved token to the node kind it introduces. `expecting_operand`
/// disambiguates prefix `+`/`-` from their binary forms. Tokens with no
/// mapping (type keywords, literal keywords) return `None` and are handled
/// by the caller.
fn node_kind_of(token: ReservedToken, expecting_operand: bool) -> Option<NodeKind> {
    use NodeKind::*;
    use ReservedToken::*;
    let kind = match token {
        OpParenOpen => Parentheses,
        OpSubscriptOpen => Index,
        OpDot => MemberCall,

        OpExp => Exponent,
        OpMul => Multiplication,
        OpDiv => Division,
        OpFloorDiv => FloorDivision,
        OpMod => Modulus,

        OpAdd => {
            if expecting_operand {
                UnaryPlus
            } else {
                Addition
            }
        }
        OpSub => {
            if expecting_operand {
                UnaryMinus
            } else {
                Subtraction
            }
        }

        OpShiftLeft => BitwiseLeftShift,
        OpShiftRight => BitwiseRightShift,
        OpBitwiseAnd => BitwiseAnd,
        OpBitwiseOr => BitwiseOr,
        OpBitwiseXor => BitwiseXor,
        OpBitwiseNot => BitwiseNot,

        OpLogicalAnd | KwAnd => LogicalAnd,
        OpLogicalOr | KwOr => LogicalOr,
        OpLogicalNot => LogicalNot,

        OpEqual => Equality,
        OpNotEqual => Inequality,
        OpGreaterThan => GreaterThan,
        OpGreaterThanEqual => GreaterThanEqual,
        OpLessThan => LessThan,
        OpLessThanEqual => LessThanEqual,

        OpAssign => Assign,
        OpAssignExp => AssignExponent,
        OpAssignAdd => AssignAddition,
        OpAssignSub => AssignSubtraction,
        OpAssignMul => AssignMultiplication,
        OpAssignDiv => AssignDivision,
        OpAssignFloorDiv => AssignFloorDivision,
        OpAssignMod => AssignModulus,
        OpAssignShiftLeft => AssignBitwiseLeftShift,
        OpAssignShiftRight => AssignBitwiseRightShift,
        OpAssignBitwiseAnd => AssignBitwiseAnd,
        OpAssignBitwiseOr => AssignBitwiseOr,
        OpAssignBitwiseXor => AssignBitwiseXor,

        KwIf => StatementIf,
        KwElif => StatementElif,
        KwElse => StatementElse,
        KwWhile => StatementWhile,
        KwPass => StatementPass,
        KwReturn => StatementReturn,
        KwImport => StatementImport,
        KwAssert => StatementAssert,

        KwDef => FunctionDefinition,
        KwLet => VariableDefinition,
        KwContract => ContractDefinition,

        _ => return None,
    };
    Some(kind)
}

/// Build an AST leaf out of the current token without advancing the cursor.
fn parse_operand(cursor: &TokenCursor) -> Result<Node> {
    let token = cursor.peek();
    let location = token.location;
    let value = match &token.value {
        TokenValue::Number(value) => NodeValue::Number(*value),
        TokenValue::Str(value) => NodeValue::Str(value.clone()),
        TokenValue::Identifier(name) => NodeValue::Identifier(name.clone()),
        TokenValue::Reserved(ReservedToken::KwTrue) => NodeValue::Bool(true),
        TokenValue::Reserved(ReservedToken::KwFalse) => NodeValue::Bool(false),
        TokenValue::Reserved(token) => match TypeHandle::of_keyword(*token) {
            Some(handle) => NodeValue::TypeId(handle),
            None => return Err(CompileError::parsing(location, "Syntax error - unexpected operand")),
        },
        _ => return Err(CompileError::parsing(location, "Syntax error - unexpected operand")),
    };
    Ok(Node::leaf(value, location))
}

/// Pop the top operator, take its operands off the operand stack and push
/// back the assembled node.
fn pop_operator(operands: &mut Vec<Node>, operators: &mut Vec<OperatorInfo>) -> Result<()> {
    let top = operators.pop().expect("operator stack is non-empty");
    if operands.len() < top.operand_count {
        return Err(CompileError::parsing(top.location, "Syntax error - missing operands"));
    }
    let children = operands.split_off(operands.len() - top.operand_count);
    operands.push(Node::internal(top.kind, children, top.location));
    Ok(())
}

fn expect_reserved(cursor: &mut TokenCursor, expected: &[ReservedToken]) -> Result<()> {
    if let Some(token) = cursor.peek().reserved() {
        if expected.contains(&token) {
            cursor.advance()?;
            return Ok(());
        }
    }
    let mut message = String::from("Syntax error - missing ");
    for (index, token) in expected.iter().enumerate() {
        if index > 0 {
            message.push_str(" or ");
        }
        message.push('\'');
        message.push_str(token.text());
        message.push('\'');
    }
    Err(CompileError::parsing(cursor.peek().location, message))
}

fn expect_newline(cursor: &mut TokenCursor) -> Result<()> {
    if cursor.peek().is_newline() {
        cursor.advance()?;
        Ok(())
    } else {
        Err(CompileError::parsing(cursor.peek().location, "Syntax error - missing newline"))
    }
}

/// Parse one nested sub-expression; the caller requires a value.
fn parse_expression(cursor: &mut TokenCursor) -> Result<Node> {
    let location = cursor.peek().location;
    parse_impl(cursor, 0, true)?
        .ok_or_else(|| CompileError::parsing(location, "Expected expression"))
}

/// Parse statements at a deeper indentation level until a line with
/// insufficient indentation is seen; the cursor is rewound so the caller can
/// inspect the dedented line.
fn parse_body(cursor: &mut TokenCursor, indentation_level: usize) -> Result<Vec<Node>> {
    let mut statements = Vec::new();

    while !cursor.peek().is_eof() {
        if let Some(statement) = parse_impl(cursor, indentation_level, true)? {
            statements.push(statement);
        }

        let snapshot = cursor.clone();
        let mut current = 0usize;
        while current != indentation_level {
            if cursor.peek().is_indentation() {
                cursor.advance()?;
                current += 1;
            } else if cursor.peek().is_newline() {
                cursor.advance()?;
            } else {
                break;
            }
        }
        if current < indentation_level {
            *cursor = snapshot;
            break;
        }
    }

    Ok(statements)
}

/// Body of a compound statement: either a newline followed by an indented
/// block, or a single statement inline after the colon.
fn parse_suite(
    cursor: &mut TokenCursor,
    indentation_level: usize,
) -> Result<Vec<Node>> {
    if cursor.peek().is_newline() {
        cursor.advance()?;
        parse_body(cursor, indentation_level + 1)
    } else {
        Ok(vec![parse_expression(cursor)?])
    }
}

/// Comma-separated expressions up to a closing parenthesis, which is
/// consumed. The opening parenthesis has already been consumed.
fn parse_argument_list(cursor: &mut TokenCursor, operands: &mut Vec<Node>) -> Result<usize> {
    let mut count = 0usize;
    if !cursor.peek().is_reserved(ReservedToken::OpParenClose) {
        loop {
            operands.push(parse_expression(cursor)?);
            count += 1;
            match cursor.peek().reserved() {
                Some(ReservedToken::OpParenClose) => break,
                Some(ReservedToken::OpComma) => cursor.advance()?,
                _ => {
                    return Err(CompileError::parsing(
                        cursor.peek().location,
                        "Syntax error - expecting ',' or ')'",
                    ))
                }
            }
        }
    }
    expect_reserved(cursor, &[ReservedToken::OpParenClose])?;
    Ok(count)
}

fn parse_impl(
    cursor: &mut TokenCursor,
    indentation_level: usize,
    already_in_module: bool,
) -> Result<Option<Node>> {
    let mut operands: Vec<Node> = Vec::new();
    let mut operators: Vec<OperatorInfo> = Vec::new();
    let mut expecting_operand = true;

    // Consume the indentation this expression sits at.
    let mut consumed = 0usize;
    while consumed < indentation_level && cursor.peek().is_indentation() {
        cursor.advance()?;
        consumed += 1;
    }

    if !already_in_module {
        operators.push(OperatorInfo::new(NodeKind::ModuleDefinition, cursor.peek().location));
    }

    // Skip empty lines.
    while cursor.peek().is_newline() || cursor.peek().is_eof() {
        cursor.advance()?;
        if cursor.peek().is_eof() {
            expecting_operand = false;
            break;
        }
    }

    while !is_end_of_expression(&cursor.peek().value) {
        let token = cursor.peek().clone();

        if let Some(reserved_token) = token.reserved() {
            // `is not` and `not in` span two tokens; the cursor is left on
            // the second one so the shared advance consumes the pair.
            let kind = match reserved_token {
                ReservedToken::KwIs if !expecting_operand => {
                    let snapshot = cursor.clone();
                    cursor.advance()?;
                    if cursor.peek().is_reserved(ReservedToken::KwNot) {
                        Some(NodeKind::IsNotIdentical)
                    } else {
                        *cursor = snapshot;
                        Some(NodeKind::IsIdentical)
                    }
                }
                ReservedToken::KwNot if !expecting_operand => {
                    cursor.advance()?;
                    if cursor.peek().is_reserved(ReservedToken::KwIn) {
                        Some(NodeKind::IsNotMemberOf)
                    } else {
                        return Err(CompileError::parsing(token.location, "Syntax error"));
                    }
                }
                ReservedToken::KwNot => Some(NodeKind::LogicalNot),
                ReservedToken::KwIn if !expecting_operand => Some(NodeKind::IsMemberOf),
                other => node_kind_of(other, expecting_operand),
            };

            let Some(kind) = kind else {
                // Type keywords and boolean literals act as operands.
                if let Some(handle) = TypeHandle::of_keyword(reserved_token) {
                    if !expecting_operand {
                        return Err(CompileError::parsing(token.location, "Syntax error"));
                    }
                    operands.push(Node::leaf(NodeValue::TypeId(handle), token.location));
                    expecting_operand = false;
                    cursor.advance()?;
                    // A type name terminates the sub-expression.
                    break;
                }
                if matches!(reserved_token, ReservedToken::KwTrue | ReservedToken::KwFalse) {
                    if !expecting_operand {
                        return Err(CompileError::parsing(token.location, "Syntax error"));
                    }
                    let value = reserved_token == ReservedToken::KwTrue;
                    operands.push(Node::leaf(NodeValue::Bool(value), token.location));
                    expecting_operand = false;
                    cursor.advance()?;
                    continue;
                }
                return Err(CompileError::parsing(
                    token.location,
                    format!("Unknown token: {}", token.text()),
                ));
            };

            let mut info = OperatorInfo::new(kind, token.location);

            // Shunting rule: pop pending tighter operators first.
            while let Some(top) = operators.last() {
                if top.kind == NodeKind::ModuleDefinition
                    || !ast::has_higher_precedence(top.kind, info.kind)
                {
                    break;
                }
                pop_operator(&mut operands, &mut operators)?;
            }

            match kind {
                NodeKind::Parentheses => {
                    expect_reserved(cursor, &[ReservedToken::OpParenOpen])?;
                    if cursor.peek().is_reserved(ReservedToken::OpParenClose) {
                        return Err(CompileError::parsing(cursor.peek().location, "Expected expression"));
                    }
                    info.operand_count = parse_argument_list(cursor, &mut operands)?;
                    operators.push(info);
                    expecting_operand = false;
                }
                NodeKind::Index => {
                    expect_reserved(cursor, &[ReservedToken::OpSubscriptOpen])?;
                    operands.push(parse_expression(cursor)?);
                    expect_reserved(cursor, &[ReservedToken::OpSubscriptClose])?;
                    operators.push(info);
                    expecting_operand = false;
                }
                NodeKind::StatementIf | NodeKind::StatementElif => {
                    expect_reserved(cursor, &[ReservedToken::KwIf, ReservedToken::KwElif])?;
                    operands.push(parse_expression(cursor)?);
                    expect_reserved(cursor, &[ReservedToken::OpColon])?;
                    let body = parse_suite(cursor, indentation_level)?;
                    info.operand_count += body.len();
                    operands.extend(body);

                    // A trailing `elif`/`else` at the same indentation
                    // becomes one extra child.
                    let snapshot = cursor.clone();
                    if cursor.peek().is_newline() {
                        cursor.advance()?;
                    }
                    let after_newline = cursor.clone();
                    let mut indents = 0usize;
                    while indents < indentation_level && cursor.peek().is_indentation() {
                        cursor.advance()?;
                        indents += 1;
                    }
                    let has_tail = indents == indentation_level
                        && matches!(
                            cursor.peek().reserved(),
                            Some(ReservedToken::KwElif | ReservedToken::KwElse)
                        );
                    if has_tail {
                        *cursor = after_newline;
                        if let Some(tail) = parse_impl(cursor, indentation_level, true)? {
                            operands.push(tail);
                            info.operand_count += 1;
                        }
                    } else {
                        *cursor = snapshot;
                    }
                    operators.push(info);
                }
                NodeKind::StatementElse => {
                    expect_reserved(cursor, &[ReservedToken::KwElse])?;
                    expect_reserved(cursor, &[ReservedToken::OpColon])?;
                    let body = parse_suite(cursor, indentation_level)?;
                    info.operand_count += body.len();
                    operands.extend(body);
                    operators.push(info);
                }
                NodeKind::StatementWhile => {
                    expect_reserved(cursor, &[ReservedToken::KwWhile])?;
                    operands.push(parse_expression(cursor)?);
                    expect_reserved(cursor, &[ReservedToken::OpColon])?;
                    let body = parse_suite(cursor, indentation_level)?;
                    info.operand_count += body.len();
                    operands.extend(body);
                    operators.push(info);
                }
                NodeKind::FunctionDefinition => {
                    expect_reserved(cursor, &[ReservedToken::KwDef])?;
                    operands.push(parse_operand(cursor)?);
                    cursor.advance()?;

                    expect_reserved(cursor, &[ReservedToken::OpParenOpen])?;
                    if cursor.peek().identifier() == Some("self") {
                        let location = cursor.peek().location;
                        let name = parse_expression(cursor)?;
                        operands.push(Node::internal(
                            NodeKind::FunctionParameterDefinition,
                            vec![name],
                            location,
                        ));
                        info.operand_count += 1;
                        if cursor.peek().is_reserved(ReservedToken::OpComma) {
                            cursor.advance()?;
                        }
                    }
                    while !cursor.peek().is_reserved(ReservedToken::OpParenClose) {
                        let location = cursor.peek().location;
                        let name = parse_expression(cursor)?;
                        expect_reserved(cursor, &[ReservedToken::OpColon])?;
                        let parameter_type = parse_expression(cursor)?;
                        operands.push(Node::internal(
                            NodeKind::FunctionParameterDefinition,
                            vec![name, parameter_type],
                            location,
                        ));
                        info.operand_count += 1;
                        match cursor.peek().reserved() {
                            Some(ReservedToken::OpParenClose) => break,
                            Some(ReservedToken::OpComma) => cursor.advance()?,
                            _ => {
                                return Err(CompileError::parsing(
                                    cursor.peek().location,
                                    "Syntax error - expecting ',' or ')'",
                                ))
                            }
                        }
                    }
                    expect_reserved(cursor, &[ReservedToken::OpParenClose])?;

                    if cursor.peek().is_reserved(ReservedToken::OpArrow) {
                        cursor.advance()?;
                        operands.push(parse_expression(cursor)?);
                        info.operand_count += 1;
                    }

                    expect_reserved(cursor, &[ReservedToken::OpColon])?;
                    let body = parse_suite(cursor, indentation_level)?;
                    info.operand_count += body.len();
                    operands.extend(body);
                    operators.push(info);
                }
                NodeKind::VariableDefinition => {
                    expect_reserved(cursor, &[ReservedToken::KwLet])?;
                    operands.push(parse_operand(cursor)?);
                    cursor.advance()?;

                    if cursor.peek().is_reserved(ReservedToken::OpColon) {
                        cursor.advance()?;
                        operands.push(parse_operand(cursor)?);
                        info.operand_count += 1;
                        cursor.advance()?;
                    }
                    if cursor.peek().is_reserved(ReservedToken::OpAssign) {
                        cursor.advance()?;
                        operands.push(parse_expression(cursor)?);
                        info.operand_count += 1;
                    }
                    operators.push(info);
                }
                NodeKind::ContractDefinition => {
                    expect_reserved(cursor, &[ReservedToken::KwContract])?;
                    operands.push(parse_expression(cursor)?);
                    expect_reserved(cursor, &[ReservedToken::OpColon])?;
                    expect_newline(cursor)?;
                    let body = parse_body(cursor, indentation_level + 1)?;
                    info.operand_count += body.len();
                    operands.extend(body);
                    operators.push(info);
                }
                _ => {
                    // Plain unary, binary and single-expression statement
                    // operators.
                    expecting_operand = info.operand_count != 0;
                    operators.push(info);
                    cursor.advance()?;
                }
            }
            continue;
        }

        // Operand token.
        if !expecting_operand {
            return Err(CompileError::parsing(token.location, "Syntax error"));
        }
        let operand = parse_operand(cursor)?;
        let is_identifier = operand.identifier().is_some();
        operands.push(operand);
        expecting_operand = false;
        cursor.advance()?;

        // An identifier followed by `(` becomes a call.
        if is_identifier && cursor.peek().is_reserved(ReservedToken::OpParenOpen) {
            let mut info = OperatorInfo::new(NodeKind::Call, cursor.peek().location);
            cursor.advance()?;
            info.operand_count += parse_argument_list(cursor, &mut operands)?;
            operators.push(info);
        }
    }

    if expecting_operand && operands.is_empty() {
        return Err(CompileError::parsing(
            cursor.peek().location,
            "Syntax error - expecting an operand",
        ));
    }

    while matches!(operators.last(), Some(top) if top.kind != NodeKind::ModuleDefinition) {
        pop_operator(&mut operands, &mut operators)?;
    }

    if matches!(operators.last(), Some(top) if top.kind == NodeKind::ModuleDefinition) {
        // Remaining tokens become additional top-level children.
        while !cursor.peek().is_eof() {
            if let Some(statement) = parse_impl(cursor, 0, true)? {
                operands.push(statement);
            }
        }
        let sentinel = operators.pop().expect("sentinel is on the stack");
        return Ok(Some(Node::internal(
            NodeKind::ModuleDefinition,
            operands,
            sentinel.location,
        )));
    }

    Ok(operands.pop())
}
