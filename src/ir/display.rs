//! Textual rendering of an IR module, in the spirit of LLVM assembly.

use std::fmt;

use super::{BinOp, Block, BlockId, Const, Function, IcmpCond, InstKind, Module, Type, ValueData, ValueId};

fn type_str(module: &Module, ty: &Type) -> String {
    match ty {
        Type::Void => "void".to_string(),
        Type::Int(width) => format!("i{}", width),
        Type::Ptr(inner) => format!("{}*", type_str(module, inner)),
        Type::Array(element) => format!("[{}]", type_str(module, element)),
        Type::Struct(id) => format!("%{}", module.struct_def(*id).name),
    }
}

fn escape_bytes(value: &str) -> String {
    let mut out = String::new();
    for byte in value.bytes() {
        match byte {
            b'"' | b'\\' => out.push_str(&format!("\\{:02X}", byte)),
            0x20..=0x7E => out.push(byte as char),
            _ => out.push_str(&format!("\\{:02X}", byte)),
        }
    }
    out
}

fn const_str(module: &Module, value: &Const) -> String {
    match value {
        Const::Int { value, .. } => value.to_string(),
        Const::Str(index) => format!("@str{}", index),
        Const::Struct(_, fields) => {
            let rendered: Vec<String> = fields.iter().map(|f| const_str(module, f)).collect();
            format!("{{ {} }}", rendered.join(", "))
        }
        Const::Zero(_) => "zeroinitializer".to_string(),
    }
}

fn operand(module: &Module, value: ValueId) -> String {
    match module.value(value) {
        ValueData::ConstInt { value, .. } => value.to_string(),
        ValueData::ConstStruct { fields, .. } => {
            let rendered: Vec<String> = fields.iter().map(|f| const_str(module, f)).collect();
            format!("{{ {} }}", rendered.join(", "))
        }
        ValueData::Str(index) => format!("@str{}", index),
        ValueData::Global(index) => format!("@{}", module.globals[*index].name),
        ValueData::Param { index, .. } => format!("%arg{}", index),
        ValueData::Inst(inst) => format!("%{}", inst.0),
    }
}

fn block_name(block: &Block, id: BlockId) -> String {
    format!("{}.{}", block.label, id.index())
}

fn binop_str(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "add",
        BinOp::Sub => "sub",
        BinOp::Mul => "mul",
        BinOp::SDiv => "sdiv",
        BinOp::SRem => "srem",
        BinOp::And => "and",
        BinOp::Or => "or",
        BinOp::Xor => "xor",
        BinOp::Shl => "shl",
        BinOp::AShr => "ashr",
    }
}

fn icmp_str(cond: IcmpCond) -> &'static str {
    match cond {
        IcmpCond::Eq => "eq",
        IcmpCond::Ne => "ne",
        IcmpCond::Ult => "ult",
        IcmpCond::Ugt => "ugt",
        IcmpCond::Ule => "ule",
        IcmpCond::Uge => "uge",
    }
}

fn write_function(f: &mut fmt::Formatter<'_>, module: &Module, function: &Function) -> fmt::Result {
    let params: Vec<String> = function
        .sig
        .params
        .iter()
        .enumerate()
        .map(|(index, ty)| format!("{} %arg{}", type_str(module, ty), index))
        .collect();
    let mut params = params.join(", ");
    if function.sig.variadic {
        if !params.is_empty() {
            params.push_str(", ");
        }
        params.push_str("...");
    }

    if function.is_declaration() {
        return writeln!(
            f,
            "declare {} @{}({})",
            type_str(module, &function.sig.ret),
            function.name,
            params
        );
    }

    let linkage = match function.linkage {
        super::Linkage::External => "",
        super::Linkage::Internal => "internal ",
    };
    writeln!(
        f,
        "define {}{} @{}({}) {{",
        linkage,
        type_str(module, &function.sig.ret),
        function.name,
        params
    )?;

    for (index, block) in function.blocks.iter().enumerate() {
        let id = BlockId(index as u32);
        writeln!(f, "{}:", block_name(block, id))?;
        for &inst_id in &block.insts {
            let inst = module.inst(inst_id);
            let result = format!("%{}", inst_id.0);
            match &inst.kind {
                InstKind::Alloca { ty } => {
                    writeln!(f, "  {} = alloca {}", result, type_str(module, ty))?;
                }
                InstKind::Load { ptr } => {
                    let ty = module.value_type(inst.result);
                    writeln!(
                        f,
                        "  {} = load {}, {} {}",
                        result,
                        type_str(module, &ty),
                        type_str(module, &module.value_type(*ptr)),
                        operand(module, *ptr)
                    )?;
                }
                InstKind::Store { value, ptr } => {
                    writeln!(
                        f,
                        "  store {} {}, {} {}",
                        type_str(module, &module.value_type(*value)),
                        operand(module, *value),
                        type_str(module, &module.value_type(*ptr)),
                        operand(module, *ptr)
                    )?;
                }
                InstKind::Binary { op, lhs, rhs } => {
                    writeln!(
                        f,
                        "  {} = {} {} {}, {}",
                        result,
                        binop_str(*op),
                        type_str(module, &module.value_type(*lhs)),
                        operand(module, *lhs),
                        operand(module, *rhs)
                    )?;
                }
                InstKind::Not { value } => {
                    writeln!(
                        f,
                        "  {} = xor {} {}, -1",
                        result,
                        type_str(module, &module.value_type(*value)),
                        operand(module, *value)
                    )?;
                }
                InstKind::Icmp { cond, lhs, rhs } => {
                    writeln!(
                        f,
                        "  {} = icmp {} {} {}, {}",
                        result,
                        icmp_str(*cond),
                        type_str(module, &module.value_type(*lhs)),
                        operand(module, *lhs),
                        operand(module, *rhs)
                    )?;
                }
                InstKind::Cast { value, ty } => {
                    writeln!(
                        f,
                        "  {} = cast {} {} to {}",
                        result,
                        type_str(module, &module.value_type(*value)),
                        operand(module, *value),
                        type_str(module, ty)
                    )?;
                }
                InstKind::Call { func, args } => {
                    let callee = module.function(*func);
                    let rendered: Vec<String> = args
                        .iter()
                        .map(|&a| {
                            format!("{} {}", type_str(module, &module.value_type(a)), operand(module, a))
                        })
                        .collect();
                    let ret = type_str(module, &callee.sig.ret);
                    if callee.sig.ret == Type::Void {
                        writeln!(f, "  call {} @{}({})", ret, callee.name, rendered.join(", "))?;
                    } else {
                        writeln!(
                            f,
                            "  {} = call {} @{}({})",
                            result,
                            ret,
                            callee.name,
                            rendered.join(", ")
                        )?;
                    }
                }
                InstKind::Phi { ty, incoming } => {
                    let rendered: Vec<String> = incoming
                        .iter()
                        .map(|(value, block)| {
                            let target = &function.blocks[block.index()];
                            format!("[ {}, %{} ]", operand(module, *value), block_name(target, *block))
                        })
                        .collect();
                    writeln!(
                        f,
                        "  {} = phi {} {}",
                        result,
                        type_str(module, ty),
                        rendered.join(", ")
                    )?;
                }
                InstKind::StructGep { base, index } => {
                    writeln!(
                        f,
                        "  {} = getelementptr {} {}, {}",
                        result,
                        type_str(module, &module.value_type(*base)),
                        operand(module, *base),
                        index
                    )?;
                }
                InstKind::Br { dest } => {
                    let target = &function.blocks[dest.index()];
                    writeln!(f, "  br label %{}", block_name(target, *dest))?;
                }
                InstKind::CondBr { cond, then_dest, else_dest } => {
                    let then_block = &function.blocks[then_dest.index()];
                    let else_block = &function.blocks[else_dest.index()];
                    writeln!(
                        f,
                        "  br i1 {}, label %{}, label %{}",
                        operand(module, *cond),
                        block_name(then_block, *then_dest),
                        block_name(else_block, *else_dest)
                    )?;
                }
                InstKind::Ret { value } => match value {
                    Some(value) => writeln!(
                        f,
                        "  ret {} {}",
                        type_str(module, &module.value_type(*value)),
                        operand(module, *value)
                    )?,
                    None => writeln!(f, "  ret void")?,
                },
            }
        }
    }
    writeln!(f, "}}")
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; module = '{}'", self.name)?;
        writeln!(f, "target triple = \"{}\"", self.target_triple)?;

        for def in &self.structs {
            let fields: Vec<String> = def.fields.iter().map(|t| type_str(self, t)).collect();
            writeln!(f, "%{} = type {{ {} }}", def.name, fields.join(", "))?;
        }
        for (index, value) in self.strings.iter().enumerate() {
            writeln!(
                f,
                "@str{} = private constant c\"{}\\00\"",
                index,
                escape_bytes(value)
            )?;
        }
        for global in &self.globals {
            writeln!(
                f,
                "@{} = global {} {}",
                global.name,
                type_str(self, &global.ty),
                const_str(self, &global.init)
            )?;
        }

        for function in &self.functions {
            if function.discarded {
                continue;
            }
            writeln!(f)?;
            write_function(f, self, function)?;
        }
        Ok(())
    }
}
