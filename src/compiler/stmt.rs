//! Statement lowering: control flow, loops, assertions and definitions.

use super::symbols::{ContractLayout, DataMember};
use super::{condition_word, load_if_storage, lower, lower_type, lower_value, Context};
use crate::ast::{Node, NodeKind, NodeValue};
use crate::error::{CompileError, Result};
use crate::ir::{Const, IcmpCond, Linkage, Signature, Type, ValueId};
use crate::types::TypeHandle;

fn is_chain_tail(node: &Node) -> bool {
    matches!(node.kind(), Some(NodeKind::StatementElif | NodeKind::StatementElse))
}

/// `if`/`elif`: branch between a then block and an else block, both joining
/// an end block. A trailing `elif`/`else` child is lowered inside the else
/// block; when both arms produce values of the same type they are joined
/// with a φ-node.
pub(super) fn lower_conditional(ctx: &mut Context, node: &Node) -> Result<Option<ValueId>> {
    let nodes = &node.children;
    if nodes.len() < 2 {
        return Err(CompileError::compile(
            node.location,
            "Control flow requires a condition and at least one body statement",
        ));
    }

    let word = condition_word(ctx, &nodes[0])?;
    let zero = ctx.builder.const_int(Type::Int(64), 0);
    let condition = ctx.builder.icmp(IcmpCond::Ne, word, zero);

    let func = ctx.builder.current_function();
    let then_block = ctx.builder.append_block(func, "if.then");
    let else_block = ctx.builder.append_block(func, "if.else");
    let end_block = ctx.builder.append_block(func, "if.end");
    ctx.builder.cond_br(condition, then_block, else_block);

    let tail_index = nodes[1..].iter().position(is_chain_tail).map(|i| i + 1);
    let body_end = tail_index.unwrap_or(nodes.len());

    ctx.builder.set_insert_point(func, then_block);
    let mut then_value = None;
    for child in &nodes[1..body_end] {
        let value = lower(ctx, child)?;
        if then_value.is_none() {
            then_value = value;
        }
    }
    let then_exit = ctx.builder.current_block();
    ctx.builder.br(end_block);

    ctx.builder.set_insert_point(func, else_block);
    let mut else_value = None;
    if let Some(index) = tail_index {
        for child in &nodes[index..] {
            let value = lower(ctx, child)?;
            if else_value.is_none() {
                else_value = value;
            }
        }
    }
    let else_exit = ctx.builder.current_block();
    ctx.builder.br(end_block);

    ctx.builder.set_insert_point(func, end_block);

    if tail_index.is_some() {
        if let (Some(then_value), Some(else_value)) = (then_value, else_value) {
            let then_ty = ctx.builder.module().value_type(then_value);
            let else_ty = ctx.builder.module().value_type(else_value);
            if then_ty == else_ty && then_ty != Type::Void {
                let phi = ctx.builder.phi(
                    then_ty,
                    vec![(then_value, then_exit), (else_value, else_exit)],
                );
                return Ok(Some(phi));
            }
        }
    }
    Ok(then_value)
}

/// `else`: emit the children in sequence; the last value is the result.
pub(super) fn lower_else(ctx: &mut Context, node: &Node) -> Result<Option<ValueId>> {
    let mut value = None;
    for child in &node.children {
        value = lower(ctx, child)?;
    }
    Ok(value)
}

/// `while`: cond, body and after blocks; the body jumps back to cond.
pub(super) fn lower_loop(ctx: &mut Context, node: &Node) -> Result<Option<ValueId>> {
    let nodes = &node.children;
    if nodes.len() < 2 {
        return Err(CompileError::compile(
            node.location,
            "Loop requires a condition and at least one body statement",
        ));
    }

    let func = ctx.builder.current_function();
    let cond_block = ctx.builder.append_block(func, "while.cond");
    let body_block = ctx.builder.append_block(func, "while.body");
    let after_block = ctx.builder.append_block(func, "while.after");

    ctx.builder.br(cond_block);
    ctx.builder.set_insert_point(func, cond_block);
    let word = condition_word(ctx, &nodes[0])?;
    let zero = ctx.builder.const_int(Type::Int(64), 0);
    let condition = ctx.builder.icmp(IcmpCond::Ne, word, zero);
    ctx.builder.cond_br(condition, body_block, after_block);

    ctx.builder.set_insert_point(func, body_block);
    for child in &nodes[1..] {
        lower(ctx, child)?;
    }
    ctx.builder.br(cond_block);

    ctx.builder.set_insert_point(func, after_block);
    Ok(None)
}

pub(super) fn lower_return(ctx: &mut Context, node: &Node) -> Result<Option<ValueId>> {
    if node.children.len() != 1 {
        return Err(CompileError::compile(node.location, "Return takes a single value"));
    }
    let value = lower_value(ctx, &node.children[0])?;
    let value = load_if_storage(ctx, value);
    ctx.builder.ret(Some(value));
    Ok(Some(value))
}

/// `import m` records the module name for the linker; no instructions.
pub(super) fn lower_import(ctx: &mut Context, node: &Node) -> Result<Option<ValueId>> {
    if node.children.len() != 1 {
        return Err(CompileError::compile(node.location, "Import takes a single module name"));
    }
    let name = node.children[0]
        .identifier()
        .ok_or_else(|| CompileError::compile(node.children[0].location, "Import expects a module name"))?;
    ctx.imported_modules.push(name.to_string());
    Ok(None)
}

/// `assert c`: call `abort` when the condition is false, fall through
/// otherwise.
pub(super) fn lower_assert(ctx: &mut Context, node: &Node) -> Result<Option<ValueId>> {
    if node.children.len() != 1 {
        return Err(CompileError::compile(node.location, "Assert takes a single condition"));
    }
    let word = condition_word(ctx, &node.children[0])?;
    let zero = ctx.builder.const_int(Type::Int(64), 0);
    let is_false = ctx.builder.icmp(IcmpCond::Eq, word, zero);

    let func = ctx.builder.current_function();
    let fail_block = ctx.builder.append_block(func, "assert.fail");
    let end_block = ctx.builder.append_block(func, "assert.end");
    ctx.builder.cond_br(is_false, fail_block, end_block);

    ctx.builder.set_insert_point(func, fail_block);
    let abort = ctx
        .symbols
        .external_builtin("abort")
        .ok_or_else(|| CompileError::internal(node.location, "abort is not registered"))?;
    ctx.builder.call(abort, Vec::new());
    ctx.builder.br(end_block);

    ctx.builder.set_insert_point(func, end_block);
    Ok(None)
}

/// `let`: allocate storage in the function entry block, initialize with the
/// explicit initializer or the type's zero value, and register the mangled
/// name. Strings and contract instances bind to their pointer directly;
/// string assignment rebinds the symbol instead of storing through it.
pub(super) fn lower_variable(ctx: &mut Context, node: &Node) -> Result<Option<ValueId>> {
    let nodes = &node.children;
    if nodes.len() < 2 {
        return Err(CompileError::compile(
            node.location,
            "Variable definition requires a type annotation or an initializer",
        ));
    }
    let name = nodes[0]
        .identifier()
        .ok_or_else(|| CompileError::compile(nodes[0].location, "Variable name must be an identifier"))?
        .to_string();

    // With both a type annotation and an initializer, the initializer wins.
    let init = if nodes.len() <= 2 { &nodes[1] } else { &nodes[2] };

    let value = match &init.value {
        NodeValue::TypeId(handle) => {
            if *handle == TypeHandle::STR || *handle == TypeHandle::ADDRESS {
                ctx.builder.global_string_ptr("")
            } else {
                let ty = lower_type(init.location, *handle)?;
                let slot = ctx.builder.alloca_in_entry(ty.clone());
                let zero = ctx.builder.const_int(ty, 0);
                ctx.builder.store(zero, slot);
                slot
            }
        }
        _ => {
            let value = lower_value(ctx, init)?;
            let value = load_if_storage(ctx, value);
            let ty = ctx.builder.module().value_type(value);
            match ty {
                Type::Int(_) => {
                    let slot = ctx.builder.alloca_in_entry(ty);
                    ctx.builder.store(value, slot);
                    slot
                }
                _ => value,
            }
        }
    };

    ctx.symbols.set_variable(&name, value);
    Ok(Some(value))
}

/// `def`: collect parameters and the return type, create the function, bind
/// arguments, emit the body, synthesize the void return, and clean up the
/// scope.
pub(super) fn lower_function(ctx: &mut Context, node: &Node) -> Result<Option<ValueId>> {
    let nodes = &node.children;
    if nodes.len() < 2 {
        return Err(CompileError::compile(
            node.location,
            "Function definition requires a name and at least one body statement",
        ));
    }
    let name = nodes[0]
        .identifier()
        .ok_or_else(|| CompileError::compile(nodes[0].location, "Function name must be an identifier"))?
        .to_string();

    ctx.symbols.current_function = name.clone();

    let mut parameter_names = Vec::new();
    let mut parameter_types = Vec::new();
    let mut return_type = Type::Void;

    for child in &nodes[1..] {
        if child.is_kind(NodeKind::FunctionParameterDefinition) {
            let parameter = &child.children;
            match parameter.len() {
                2 => {
                    let parameter_name = parameter[0].identifier().ok_or_else(|| {
                        CompileError::compile(parameter[0].location, "Parameter name must be an identifier")
                    })?;
                    let handle = parameter[1].type_id().ok_or_else(|| {
                        CompileError::compile(parameter[1].location, "Parameter requires a type annotation")
                    })?;
                    parameter_names.push(ctx.symbols.mangle(parameter_name));
                    parameter_types.push(lower_type(parameter[1].location, handle)?);
                }
                1 => {
                    let parameter_name = parameter[0].identifier().ok_or_else(|| {
                        CompileError::compile(parameter[0].location, "Parameter name must be an identifier")
                    })?;
                    if parameter_name != "self" {
                        return Err(CompileError::compile(
                            parameter[0].location,
                            "Only the 'self' parameter may omit its type",
                        ));
                    }
                    let contract = ctx.symbols.current_contract.clone();
                    if contract.is_empty() {
                        return Err(CompileError::compile(
                            parameter[0].location,
                            "'self' parameter outside of a contract",
                        ));
                    }
                    let layout = ctx
                        .symbols
                        .contracts
                        .get(&contract)
                        .ok_or_else(|| CompileError::internal(parameter[0].location, "Unregistered contract"))?;
                    parameter_names.push(ctx.symbols.mangle("self"));
                    parameter_types.push(Type::ptr(Type::Struct(layout.struct_id)));
                }
                _ => {
                    return Err(CompileError::internal(
                        child.location,
                        "Malformed function parameter",
                    ))
                }
            }
        } else if let Some(handle) = child.type_id() {
            return_type = lower_type(child.location, handle)?;
            break;
        }
    }

    let key = ctx.symbols.function_key(&name);
    let func = ctx.builder.declare_function(
        &key,
        Signature { params: parameter_types, ret: return_type.clone(), variadic: false },
        Linkage::External,
    );
    let entry = ctx.builder.append_block(func, "entry");
    ctx.builder.set_insert_point(func, entry);

    // Arguments are immutable; bind them directly, no allocas needed.
    for (index, parameter_name) in parameter_names.iter().enumerate() {
        let value = ctx.builder.param(func, index);
        ctx.symbols.variables.insert(parameter_name.clone(), value);
    }

    for child in &nodes[1..] {
        if child.is_kind(NodeKind::FunctionParameterDefinition) || child.type_id().is_some() {
            continue;
        }
        lower(ctx, child)?;
    }

    if return_type == Type::Void {
        ctx.builder.ret(None);
    }

    ctx.symbols.purge_scope();
    ctx.symbols.current_function.clear();
    ctx.symbols.functions.insert(key, func);
    Ok(None)
}

/// `contract`: first pass collects the data-member layout and initial
/// values, the second lowers member functions, and finally the default
/// constructor is synthesized.
pub(super) fn lower_contract(ctx: &mut Context, node: &Node) -> Result<Option<ValueId>> {
    let nodes = &node.children;
    if nodes.len() < 2 {
        return Err(CompileError::compile(
            node.location,
            "Contract definition requires a name and at least one body statement",
        ));
    }
    let name = nodes[0]
        .identifier()
        .ok_or_else(|| CompileError::compile(nodes[0].location, "Contract name must be an identifier"))?
        .to_string();

    // Register the struct handle before lowering member functions so
    // `self` resolves to a pointer to this contract.
    let struct_id = ctx.builder.struct_create(&name);
    ctx.types.register_contract(&name);
    ctx.symbols.current_contract = name.clone();

    let mut field_types = Vec::new();
    let mut initial_values = Vec::new();
    let mut members = Vec::new();

    for child in &nodes[1..] {
        if !child.is_kind(NodeKind::VariableDefinition) {
            continue;
        }
        let member_nodes = &child.children;
        if member_nodes.len() < 2 {
            return Err(CompileError::compile(child.location, "Data member requires a type annotation"));
        }
        let member_name = member_nodes[0].identifier().ok_or_else(|| {
            CompileError::compile(member_nodes[0].location, "Data member name must be an identifier")
        })?;
        let handle = member_nodes[1].type_id().ok_or_else(|| {
            CompileError::compile(member_nodes[1].location, "Data member requires a type annotation")
        })?;
        let ty = lower_type(member_nodes[1].location, handle)?;

        let init = if member_nodes.len() > 2 {
            match &member_nodes[2].value {
                NodeValue::Number(value) => Const::Int { ty: ty.clone(), value: *value },
                NodeValue::Bool(value) => Const::Int { ty: ty.clone(), value: *value as i64 },
                NodeValue::Str(value) => Const::Str(ctx.builder.intern_string(value)),
                _ => {
                    return Err(CompileError::compile(
                        member_nodes[2].location,
                        "Data member initializer must be a literal",
                    ))
                }
            }
        } else {
            match &ty {
                Type::Int(_) => Const::Int { ty: ty.clone(), value: 0 },
                Type::Ptr(_) => Const::Str(ctx.builder.intern_string("")),
                other => Const::Zero(other.clone()),
            }
        };

        members.push(DataMember { name: member_name.to_string(), ty: ty.clone(), index: members.len() });
        field_types.push(ty);
        initial_values.push(init);
    }

    ctx.builder.struct_set_body(struct_id, field_types);
    ctx.symbols.contracts.insert(
        name.clone(),
        ContractLayout { struct_id, members, default_ctor: None },
    );

    for child in &nodes[1..] {
        if child.is_kind(NodeKind::FunctionDefinition) {
            lower(ctx, child)?;
        }
    }

    // Synthesize the default constructor: store the initial aggregate on the
    // stack and return the loaded value.
    let ctor_name = format!("{}____default_init__", name);
    let ctor = ctx.builder.declare_function(
        &ctor_name,
        Signature { params: Vec::new(), ret: Type::Struct(struct_id), variadic: false },
        Linkage::External,
    );
    let entry = ctx.builder.append_block(ctor, "entry");
    ctx.builder.set_insert_point(ctor, entry);
    let slot = ctx.builder.alloca_in_entry(Type::Struct(struct_id));
    let aggregate = ctx.builder.const_struct(struct_id, initial_values);
    ctx.builder.store(aggregate, slot);
    let value = ctx.builder.load(slot);
    ctx.builder.ret(Some(value));

    ctx.symbols.functions.insert(ctor_name, ctor);
    if let Some(layout) = ctx.symbols.contracts.get_mut(&name) {
        layout.default_ctor = Some(ctor);
    }

    ctx.symbols.purge_scope();
    ctx.symbols.current_contract.clear();
    Ok(None)
}
