//! Expression lowering: operators, assignments, calls and member access.

use super::{load_if_storage, lower_value, Context};
use crate::ast::{Node, NodeKind};
use crate::error::{CompileError, Result};
use crate::ir::{BinOp, Const, IcmpCond, Type, ValueId};

fn binary_op(kind: NodeKind) -> Option<BinOp> {
    use NodeKind::*;
    Some(match kind {
        Multiplication => BinOp::Mul,
        Division | FloorDivision => BinOp::SDiv,
        Modulus => BinOp::SRem,
        Addition => BinOp::Add,
        Subtraction => BinOp::Sub,
        BitwiseLeftShift => BinOp::Shl,
        BitwiseRightShift => BinOp::AShr,
        BitwiseAnd | LogicalAnd => BinOp::And,
        BitwiseOr | LogicalOr => BinOp::Or,
        BitwiseXor => BinOp::Xor,
        _ => return None,
    })
}

fn icmp_cond(kind: NodeKind) -> Option<IcmpCond> {
    use NodeKind::*;
    Some(match kind {
        Equality | IsIdentical => IcmpCond::Eq,
        Inequality | IsNotIdentical => IcmpCond::Ne,
        GreaterThan => IcmpCond::Ugt,
        GreaterThanEqual => IcmpCond::Uge,
        LessThan => IcmpCond::Ult,
        LessThanEqual => IcmpCond::Ule,
        _ => return None,
    })
}

fn compound_op(kind: NodeKind) -> Option<BinOp> {
    use NodeKind::*;
    Some(match kind {
        AssignAddition => BinOp::Add,
        AssignSubtraction => BinOp::Sub,
        AssignMultiplication => BinOp::Mul,
        AssignDivision | AssignFloorDivision => BinOp::SDiv,
        AssignModulus => BinOp::SRem,
        AssignBitwiseLeftShift => BinOp::Shl,
        AssignBitwiseRightShift => BinOp::AShr,
        AssignBitwiseAnd => BinOp::And,
        AssignBitwiseOr => BinOp::Or,
        AssignBitwiseXor => BinOp::Xor,
        _ => return None,
    })
}

pub(super) fn lower_unary(ctx: &mut Context, node: &Node, kind: NodeKind) -> Result<Option<ValueId>> {
    if node.children.len() != 1 {
        return Err(CompileError::internal(node.location, "Unary operator takes one operand"));
    }
    let operand = lower_value(ctx, &node.children[0])?;
    let operand = load_if_storage(ctx, operand);

    let value = match kind {
        NodeKind::UnaryPlus => operand,
        NodeKind::UnaryMinus => {
            let zero = ctx.builder.const_int(Type::Int(64), 0);
            ctx.builder.binary(BinOp::Sub, zero, operand)
        }
        NodeKind::BitwiseNot => ctx.builder.not(operand),
        NodeKind::LogicalNot => {
            let word = ctx.builder.int_cast(operand, Type::Int(64));
            let zero = ctx.builder.const_int(Type::Int(64), 0);
            ctx.builder.icmp(IcmpCond::Eq, word, zero)
        }
        _ => return Err(CompileError::internal(node.location, "Not a unary operator")),
    };
    Ok(Some(value))
}

fn lower_binary_parts(ctx: &mut Context, node: &Node, kind: NodeKind) -> Result<ValueId> {
    if node.children.len() != 2 {
        return Err(CompileError::internal(node.location, "Binary operator takes two operands"));
    }
    let lhs = lower_value(ctx, &node.children[0])?;
    let lhs = load_if_storage(ctx, lhs);
    let rhs = lower_value(ctx, &node.children[1])?;
    let rhs = load_if_storage(ctx, rhs);

    if let Some(op) = binary_op(kind) {
        Ok(ctx.builder.binary(op, lhs, rhs))
    } else if let Some(cond) = icmp_cond(kind) {
        Ok(ctx.builder.icmp(cond, lhs, rhs))
    } else {
        Err(CompileError::internal(node.location, "Not a binary operator"))
    }
}

pub(super) fn lower_binary(ctx: &mut Context, node: &Node, kind: NodeKind) -> Result<Option<ValueId>> {
    Ok(Some(lower_binary_parts(ctx, node, kind)?))
}

pub(super) fn lower_assign(ctx: &mut Context, node: &Node) -> Result<Option<ValueId>> {
    if node.children.len() != 2 {
        return Err(CompileError::internal(node.location, "Assignment takes two operands"));
    }
    let target = &node.children[0];
    let source = &node.children[1];

    let value = lower_value(ctx, source)?;
    let value = load_if_storage(ctx, value);

    // A string-valued right side replaces the variable binding with the new
    // global string pointer, whether it came from a literal, another string
    // variable or a call.
    if ctx.builder.module().value_type(value) == Type::str_ptr() {
        if let Some(name) = target.identifier() {
            if ctx.symbols.variable(name).is_none() {
                return Err(CompileError::compile(
                    target.location,
                    format!("Unknown identifier '{}'", name),
                ));
            }
            ctx.symbols.set_variable(name, value);
        } else {
            let storage = lower_value(ctx, target)?;
            if !matches!(ctx.builder.module().value_type(storage).pointee(), Some(Type::Ptr(_))) {
                return Err(CompileError::compile(
                    target.location,
                    "Left side of the assignment is not assignable",
                ));
            }
            ctx.builder.store(value, storage);
        }
        return Ok(Some(value));
    }

    let storage = lower_value(ctx, target)?;
    if !matches!(ctx.builder.module().value_type(storage).pointee(), Some(Type::Int(_))) {
        return Err(CompileError::compile(target.location, "Left side of the assignment is not assignable"));
    }
    ctx.builder.store(value, storage);
    Ok(Some(storage))
}

pub(super) fn lower_compound_assign(
    ctx: &mut Context,
    node: &Node,
    kind: NodeKind,
) -> Result<Option<ValueId>> {
    if node.children.len() != 2 {
        return Err(CompileError::internal(node.location, "Assignment takes two operands"));
    }
    let name = node.children[0].identifier().ok_or_else(|| {
        CompileError::compile(
            node.children[0].location,
            "Left side of a compound assignment must be a variable",
        )
    })?;
    let storage = ctx.symbols.variable(name).ok_or_else(|| {
        CompileError::compile(node.children[0].location, format!("Unknown identifier '{}'", name))
    })?;
    if !matches!(ctx.builder.module().value_type(storage).pointee(), Some(Type::Int(_))) {
        return Err(CompileError::compile(
            node.children[0].location,
            format!("'{}' is not assignable", name),
        ));
    }

    let op = compound_op(kind)
        .ok_or_else(|| CompileError::internal(node.location, "Not a compound assignment"))?;
    let value = {
        let lhs = load_if_storage(ctx, storage);
        let rhs = lower_value(ctx, &node.children[1])?;
        let rhs = load_if_storage(ctx, rhs);
        ctx.builder.binary(op, lhs, rhs)
    };
    ctx.builder.store(value, storage);
    Ok(Some(storage))
}

pub(super) fn lower_call(ctx: &mut Context, node: &Node) -> Result<Option<ValueId>> {
    if node.children.is_empty() {
        return Err(CompileError::internal(node.location, "Call has no callee"));
    }
    let name = node.children[0]
        .identifier()
        .ok_or_else(|| CompileError::compile(node.children[0].location, "Call target must be an identifier"))?
        .to_string();

    // A contract type name creates a fresh instance.
    if let Some(layout) = ctx.symbols.contracts.get(&name).cloned() {
        let instance_ty = Type::Struct(layout.struct_id);
        let instance = ctx
            .builder
            .add_global(instance_ty.clone(), Const::Zero(instance_ty));
        let default_ctor = layout.default_ctor.ok_or_else(|| {
            CompileError::internal(node.location, "Contract has no default constructor")
        })?;
        let initial = ctx.builder.call(default_ctor, Vec::new());
        ctx.builder.store(initial, instance);

        if let Some(&ctor) = ctx.symbols.functions.get(&format!("{}____init__", name)) {
            ctx.builder.call(ctor, vec![instance]);
        }
        return Ok(Some(instance));
    }

    let mut args = Vec::with_capacity(node.children.len() - 1);
    for child in &node.children[1..] {
        let value = lower_value(ctx, child)?;
        args.push(load_if_storage(ctx, value));
    }

    if name == "print" {
        if args.len() != 1 {
            return Err(CompileError::compile(node.location, "print expects exactly one argument"));
        }
        let format = match ctx.builder.module().value_type(args[0]) {
            Type::Int(_) => "%d\n",
            Type::Ptr(_) => "%s\n",
            _ => {
                return Err(CompileError::compile(
                    node.location,
                    "print argument must be a number or a string",
                ))
            }
        };
        let format = ctx.builder.global_string_ptr(format);
        let printf = ctx
            .symbols
            .external_builtin("print")
            .ok_or_else(|| CompileError::internal(node.location, "print is not registered"))?;
        return Ok(Some(ctx.builder.call(printf, vec![format, args[0]])));
    }

    if let Some(func) = ctx.symbols.external_builtin(&name) {
        return Ok(Some(ctx.builder.call(func, args)));
    }
    if let Some(func) = ctx.symbols.internal_builtin(&name) {
        return Ok(Some(ctx.builder.call(func, args)));
    }

    let func = if !ctx.symbols.current_contract.is_empty() {
        let method_key = format!("{}__{}", ctx.symbols.current_contract, name);
        ctx.symbols
            .functions
            .get(&method_key)
            .or_else(|| ctx.symbols.functions.get(&name))
            .copied()
    } else {
        ctx.symbols.functions.get(&name).copied()
    };
    let func = func.ok_or_else(|| {
        CompileError::compile(node.location, format!("Unknown function '{}'", name))
    })?;
    Ok(Some(ctx.builder.call(func, args)))
}

pub(super) fn lower_member_call(ctx: &mut Context, node: &Node) -> Result<Option<ValueId>> {
    if node.children.len() != 2 {
        return Err(CompileError::internal(node.location, "Member access takes two operands"));
    }
    let variable_name = node.children[0].identifier().ok_or_else(|| {
        CompileError::compile(node.children[0].location, "Member access requires a variable")
    })?;
    let instance = ctx.symbols.variable(variable_name).ok_or_else(|| {
        CompileError::compile(
            node.children[0].location,
            format!("Unknown identifier '{}'", variable_name),
        )
    })?;

    let struct_id = match ctx.builder.module().value_type(instance).pointee() {
        Some(Type::Struct(id)) => *id,
        _ => {
            return Err(CompileError::compile(
                node.children[0].location,
                format!("'{}' is not a contract instance", variable_name),
            ))
        }
    };
    let (contract_name, layout) = ctx
        .symbols
        .contract_of_struct(struct_id)
        .map(|(name, layout)| (name.to_string(), layout.clone()))
        .ok_or_else(|| CompileError::internal(node.location, "Unregistered contract type"))?;

    let member = &node.children[1];
    if let Some(member_name) = member.identifier() {
        let data_member = layout.member(member_name).ok_or_else(|| {
            CompileError::compile(
                member.location,
                format!("'{}' has no data member '{}'", contract_name, member_name),
            )
        })?;
        return Ok(Some(ctx.builder.struct_gep(instance, data_member.index)));
    }

    if member.is_kind(NodeKind::Call) {
        let call_nodes = &member.children;
        if call_nodes.is_empty() {
            return Err(CompileError::internal(member.location, "Call has no callee"));
        }
        let method_name = call_nodes[0].identifier().ok_or_else(|| {
            CompileError::compile(call_nodes[0].location, "Call target must be an identifier")
        })?;
        let func = ctx
            .symbols
            .functions
            .get(&format!("{}__{}", contract_name, method_name))
            .copied()
            .ok_or_else(|| {
                CompileError::compile(
                    member.location,
                    format!("'{}' has no function '{}'", contract_name, method_name),
                )
            })?;

        let mut args = vec![instance];
        for child in &call_nodes[1..] {
            let value = lower_value(ctx, child)?;
            args.push(load_if_storage(ctx, value));
        }
        return Ok(Some(ctx.builder.call(func, args)));
    }

    Err(CompileError::compile(member.location, "Invalid member access"))
}

pub(super) fn lower_index(ctx: &mut Context, node: &Node) -> Result<Option<ValueId>> {
    if node.children.len() != 2 {
        return Err(CompileError::internal(node.location, "Subscript takes two operands"));
    }
    let name = node.children[0].identifier().ok_or_else(|| {
        CompileError::compile(node.children[0].location, "Subscript requires an identifier")
    })?;

    if let Some(func) = ctx.symbols.internal_builtin(name) {
        return Ok(Some(ctx.builder.call(func, Vec::new())));
    }

    Err(CompileError::compile(
        node.location,
        format!("Subscript is not supported for '{}'", name),
    ))
}
