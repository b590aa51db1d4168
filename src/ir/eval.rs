//! Host-side evaluator for test builds.
//!
//! Executes a module's `main` function directly, implementing the external
//! builtins (`printf`, `abort`, `is_utf8`) and the ADVM intrinsics with host
//! placeholders. `print` output is captured into a string so end-to-end
//! tests can compare runtime stdout without leaving the process.

use std::collections::HashMap;

use super::{BinOp, BlockId, Const, FuncId, IcmpCond, InstId, InstKind, Module, Type, ValueData, ValueId};

/// Address returned by the host placeholders for the ADVM address
/// intrinsics.
pub const HOST_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

const FUEL: u64 = 50_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trap {
    /// The program called `abort`, e.g. through a failed `assert`.
    Abort,
    DivisionByZero,
    OutOfFuel,
    NoMain,
    Invalid(String),
}

impl std::fmt::Display for Trap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trap::Abort => write!(f, "aborted"),
            Trap::DivisionByZero => write!(f, "division by zero"),
            Trap::OutOfFuel => write!(f, "execution budget exhausted"),
            Trap::NoMain => write!(f, "module has no main function"),
            Trap::Invalid(message) => write!(f, "invalid module: {}", message),
        }
    }
}

#[derive(Debug)]
pub struct Evaluation {
    pub output: String,
    pub exit: i64,
}

#[derive(Debug, Clone)]
enum Place {
    Slot(usize),
    Global(usize),
    Field(Box<Place>, usize),
}

#[derive(Debug, Clone)]
enum StrRef {
    Pool(usize),
    Static(&'static str),
}

#[derive(Debug, Clone)]
enum RtValue {
    Int { value: i64, width: u8 },
    Str(StrRef),
    Ptr(Place),
    Struct(Vec<RtValue>),
    Null,
    Void,
}

struct Frame {
    args: Vec<RtValue>,
    results: HashMap<InstId, RtValue>,
}

struct Evaluator<'m> {
    module: &'m Module,
    output: String,
    slots: Vec<RtValue>,
    globals: Vec<RtValue>,
    fuel: u64,
}

fn mask(value: i64, width: u8) -> i64 {
    if width >= 64 {
        value
    } else {
        value & ((1i64 << width) - 1)
    }
}

fn zero_value(module: &Module, ty: &Type) -> RtValue {
    match ty {
        Type::Void => RtValue::Void,
        Type::Int(width) => RtValue::Int { value: 0, width: *width },
        Type::Ptr(_) | Type::Array(_) => RtValue::Null,
        Type::Struct(id) => {
            let fields = module
                .struct_def(*id)
                .fields
                .iter()
                .map(|f| zero_value(module, f))
                .collect();
            RtValue::Struct(fields)
        }
    }
}

fn const_value(module: &Module, value: &Const) -> RtValue {
    match value {
        Const::Int { ty, value } => {
            let width = match ty {
                Type::Int(width) => *width,
                _ => 64,
            };
            RtValue::Int { value: *value, width }
        }
        Const::Str(index) => RtValue::Str(StrRef::Pool(*index)),
        Const::Struct(_, fields) => {
            RtValue::Struct(fields.iter().map(|f| const_value(module, f)).collect())
        }
        Const::Zero(ty) => zero_value(module, ty),
    }
}

impl<'m> Evaluator<'m> {
    fn new(module: &'m Module) -> Self {
        let globals = module
            .globals
            .iter()
            .map(|g| const_value(module, &g.init))
            .collect();
        Evaluator { module, output: String::new(), slots: Vec::new(), globals, fuel: FUEL }
    }

    fn resolve(&self, frame: &Frame, value: ValueId) -> Result<RtValue, Trap> {
        match self.module.value(value) {
            ValueData::ConstInt { ty, value } => {
                let width = match ty {
                    Type::Int(width) => *width,
                    _ => 64,
                };
                Ok(RtValue::Int { value: *value, width })
            }
            ValueData::ConstStruct { fields, .. } => Ok(RtValue::Struct(
                fields.iter().map(|f| const_value(self.module, f)).collect(),
            )),
            ValueData::Str(index) => Ok(RtValue::Str(StrRef::Pool(*index))),
            ValueData::Global(index) => Ok(RtValue::Ptr(Place::Global(*index))),
            ValueData::Param { index, .. } => frame
                .args
                .get(*index)
                .cloned()
                .ok_or_else(|| Trap::Invalid(format!("missing argument {}", index))),
            ValueData::Inst(inst) => frame
                .results
                .get(inst)
                .cloned()
                .ok_or_else(|| Trap::Invalid("value used before definition".to_string())),
        }
    }

    fn place_mut(&mut self, place: &Place) -> Result<&mut RtValue, Trap> {
        match place {
            Place::Slot(index) => Ok(&mut self.slots[*index]),
            Place::Global(index) => Ok(&mut self.globals[*index]),
            Place::Field(base, index) => {
                let parent = self.place_mut(base)?;
                match parent {
                    RtValue::Struct(fields) => fields
                        .get_mut(*index)
                        .ok_or_else(|| Trap::Invalid("field index out of range".to_string())),
                    _ => Err(Trap::Invalid("field access into a non-aggregate".to_string())),
                }
            }
        }
    }

    fn read_place(&mut self, place: &Place) -> Result<RtValue, Trap> {
        Ok(self.place_mut(place)?.clone())
    }

    fn write_place(&mut self, place: &Place, value: RtValue) -> Result<(), Trap> {
        *self.place_mut(place)? = value;
        Ok(())
    }

    fn as_place(value: RtValue) -> Result<Place, Trap> {
        match value {
            RtValue::Ptr(place) => Ok(place),
            RtValue::Null => Err(Trap::Invalid("null pointer dereference".to_string())),
            _ => Err(Trap::Invalid("expected a pointer value".to_string())),
        }
    }

    fn as_int(value: &RtValue) -> Result<i64, Trap> {
        match value {
            RtValue::Int { value, .. } => Ok(*value),
            _ => Err(Trap::Invalid("expected an integer value".to_string())),
        }
    }

    fn str_of(&self, value: &RtValue) -> Result<&str, Trap> {
        match value {
            RtValue::Str(StrRef::Pool(index)) => Ok(&self.module.strings[*index]),
            RtValue::Str(StrRef::Static(value)) => Ok(value),
            _ => Err(Trap::Invalid("expected a string pointer".to_string())),
        }
    }

    fn external(&mut self, name: &str, args: &[RtValue]) -> Result<RtValue, Trap> {
        match name {
            "printf" => {
                let format = self.str_of(&args[0])?.to_string();
                let mut rendered = String::new();
                let mut arg_index = 1usize;
                let mut chars = format.chars();
                while let Some(c) = chars.next() {
                    if c != '%' {
                        rendered.push(c);
                        continue;
                    }
                    match chars.next() {
                        Some('d') => {
                            let value = args
                                .get(arg_index)
                                .ok_or_else(|| Trap::Invalid("printf argument missing".to_string()))?;
                            rendered.push_str(&Self::as_int(value)?.to_string());
                            arg_index += 1;
                        }
                        Some('s') => {
                            let value = args
                                .get(arg_index)
                                .ok_or_else(|| Trap::Invalid("printf argument missing".to_string()))?;
                            rendered.push_str(self.str_of(value)?);
                            arg_index += 1;
                        }
                        Some(other) => {
                            rendered.push('%');
                            rendered.push(other);
                        }
                        None => rendered.push('%'),
                    }
                }
                let written = rendered.len() as i64;
                self.output.push_str(&rendered);
                Ok(RtValue::Int { value: written, width: 32 })
            }
            "abort" => Err(Trap::Abort),
            "is_utf8" => Ok(RtValue::Int { value: 1, width: 32 }),
            "advm.contract.addr" | "advm.caller.addr" => Ok(RtValue::Str(StrRef::Static(HOST_ADDRESS))),
            "advm.block.ts" => Ok(RtValue::Int { value: 0, width: 64 }),
            other => Err(Trap::Invalid(format!("call to undefined function '{}'", other))),
        }
    }

    fn binary(op: BinOp, lhs: i64, rhs: i64) -> Result<i64, Trap> {
        Ok(match op {
            BinOp::Add => lhs.wrapping_add(rhs),
            BinOp::Sub => lhs.wrapping_sub(rhs),
            BinOp::Mul => lhs.wrapping_mul(rhs),
            BinOp::SDiv => {
                if rhs == 0 {
                    return Err(Trap::DivisionByZero);
                }
                lhs.wrapping_div(rhs)
            }
            BinOp::SRem => {
                if rhs == 0 {
                    return Err(Trap::DivisionByZero);
                }
                lhs.wrapping_rem(rhs)
            }
            BinOp::And => lhs & rhs,
            BinOp::Or => lhs | rhs,
            BinOp::Xor => lhs ^ rhs,
            BinOp::Shl => lhs.wrapping_shl(rhs as u32 & 63),
            BinOp::AShr => lhs.wrapping_shr(rhs as u32 & 63),
        })
    }

    fn icmp(cond: IcmpCond, lhs: i64, rhs: i64) -> bool {
        let (ul, ur) = (lhs as u64, rhs as u64);
        match cond {
            IcmpCond::Eq => lhs == rhs,
            IcmpCond::Ne => lhs != rhs,
            IcmpCond::Ult => ul < ur,
            IcmpCond::Ugt => ul > ur,
            IcmpCond::Ule => ul <= ur,
            IcmpCond::Uge => ul >= ur,
        }
    }

    fn exec_function(&mut self, func: FuncId, args: Vec<RtValue>) -> Result<RtValue, Trap> {
        let module = self.module;
        let function = module.function(func);
        if function.is_declaration() {
            return self.external(&function.name, &args);
        }

        let mut frame = Frame { args, results: HashMap::new() };
        let mut block = BlockId(0);
        let mut prev: Option<BlockId> = None;

        'blocks: loop {
            let insts = function.blocks[block.index()].insts.clone();
            for inst_id in insts {
                if self.fuel == 0 {
                    return Err(Trap::OutOfFuel);
                }
                self.fuel -= 1;

                let inst = module.inst(inst_id);
                match &inst.kind {
                    InstKind::Alloca { ty } => {
                        self.slots.push(zero_value(module, ty));
                        let place = Place::Slot(self.slots.len() - 1);
                        frame.results.insert(inst_id, RtValue::Ptr(place));
                    }
                    InstKind::Load { ptr } => {
                        let place = Self::as_place(self.resolve(&frame, *ptr)?)?;
                        let value = self.read_place(&place)?;
                        frame.results.insert(inst_id, value);
                    }
                    InstKind::Store { value, ptr } => {
                        let value = self.resolve(&frame, *value)?;
                        let place = Self::as_place(self.resolve(&frame, *ptr)?)?;
                        self.write_place(&place, value)?;
                    }
                    InstKind::Binary { op, lhs, rhs } => {
                        let lhs = self.resolve(&frame, *lhs)?;
                        let rhs = self.resolve(&frame, *rhs)?;
                        let width = match &lhs {
                            RtValue::Int { width, .. } => *width,
                            _ => 64,
                        };
                        let value = Self::binary(*op, Self::as_int(&lhs)?, Self::as_int(&rhs)?)?;
                        frame.results.insert(inst_id, RtValue::Int { value, width });
                    }
                    InstKind::Not { value } => {
                        let operand = self.resolve(&frame, *value)?;
                        let width = match &operand {
                            RtValue::Int { width, .. } => *width,
                            _ => 64,
                        };
                        let value = mask(!Self::as_int(&operand)?, width.max(1));
                        frame.results.insert(inst_id, RtValue::Int { value, width });
                    }
                    InstKind::Icmp { cond, lhs, rhs } => {
                        let lhs = self.resolve(&frame, *lhs)?;
                        let rhs = self.resolve(&frame, *rhs)?;
                        let result = Self::icmp(*cond, Self::as_int(&lhs)?, Self::as_int(&rhs)?);
                        frame
                            .results
                            .insert(inst_id, RtValue::Int { value: result as i64, width: 1 });
                    }
                    InstKind::Cast { value, ty } => {
                        let operand = self.resolve(&frame, *value)?;
                        let width = match ty {
                            Type::Int(width) => *width,
                            _ => 64,
                        };
                        let source_width = match &operand {
                            RtValue::Int { width, .. } => *width,
                            _ => 64,
                        };
                        let raw = Self::as_int(&operand)?;
                        let extended = if source_width >= 64 { raw } else { mask(raw, source_width) };
                        frame
                            .results
                            .insert(inst_id, RtValue::Int { value: mask(extended, width.max(1)), width });
                    }
                    InstKind::Call { func, args } => {
                        let mut values = Vec::with_capacity(args.len());
                        for &arg in args {
                            values.push(self.resolve(&frame, arg)?);
                        }
                        let result = self.exec_function(*func, values)?;
                        frame.results.insert(inst_id, result);
                    }
                    InstKind::Phi { incoming, .. } => {
                        let prev_block =
                            prev.ok_or_else(|| Trap::Invalid("phi in entry block".to_string()))?;
                        let chosen = incoming
                            .iter()
                            .find(|(_, block)| *block == prev_block)
                            .ok_or_else(|| Trap::Invalid("phi has no matching predecessor".to_string()))?;
                        let value = self.resolve(&frame, chosen.0)?;
                        frame.results.insert(inst_id, value);
                    }
                    InstKind::StructGep { base, index } => {
                        let place = Self::as_place(self.resolve(&frame, *base)?)?;
                        frame
                            .results
                            .insert(inst_id, RtValue::Ptr(Place::Field(Box::new(place), *index)));
                    }
                    InstKind::Br { dest } => {
                        prev = Some(block);
                        block = *dest;
                        continue 'blocks;
                    }
                    InstKind::CondBr { cond, then_dest, else_dest } => {
                        let cond = self.resolve(&frame, *cond)?;
                        prev = Some(block);
                        block = if Self::as_int(&cond)? != 0 { *then_dest } else { *else_dest };
                        continue 'blocks;
                    }
                    InstKind::Ret { value } => {
                        return match value {
                            Some(value) => self.resolve(&frame, *value),
                            None => Ok(RtValue::Void),
                        };
                    }
                }
            }
            return Err(Trap::Invalid(format!(
                "block '{}' has no terminator",
                function.blocks[block.index()].label
            )));
        }
    }
}

/// Execute the module's `main` function, capturing `print` output.
pub fn run_main(module: &Module) -> Result<Evaluation, Trap> {
    let main = module.lookup_function("main").ok_or(Trap::NoMain)?;
    let mut evaluator = Evaluator::new(module);
    let result = evaluator.exec_function(main, Vec::new())?;
    let exit = match result {
        RtValue::Int { value, .. } => value,
        _ => 0,
    };
    Ok(Evaluation { output: evaluator.output, exit })
}
