//! Typed IR lowering.
//!
//! Walks the AST and drives the backend instruction builder: a pattern match
//! over node values dispatches literals, identifier lookups, operators and
//! statements to the expression and statement lowerers. Module assembly
//! wraps the walk, routing top-level statements into a synthetic `main` and
//! definitions into their own functions.
//!
//! ```text
//! AST ─ HERE ─ instruction module ─ linker handoff
//! ```

pub mod builtins;
pub mod symbols;

mod expr;
mod stmt;

use crate::ast::{Node, NodeKind, NodeValue};
use crate::error::{CompileError, Result};
use crate::ir::{self, Builder, Linkage, Signature, Type, ValueId};
use crate::stream::Location;
use crate::types::{TypeHandle, TypeRegistry};

use symbols::Symbols;

pub struct CompileOptions {
    /// Keep the synthetic `main` so the artifact can be executed directly.
    /// Production builds erase it; the ADVM dispatches into contract
    /// functions itself.
    pub keep_main: bool,
    pub target_triple: String,
}

impl CompileOptions {
    pub fn production() -> Self {
        CompileOptions { keep_main: false, target_triple: "wasm32-unknown-wasi".to_string() }
    }

    pub fn testing() -> Self {
        CompileOptions { keep_main: true, target_triple: "host".to_string() }
    }
}

/// Everything the lowering pass threads through its functions. No global
/// state; the context owns the builder, the symbol tables and the list of
/// imports collected for the linker.
pub struct Context {
    pub builder: Builder,
    pub symbols: Symbols,
    pub types: TypeRegistry,
    pub imported_modules: Vec<String>,
}

/// The finished artifact handed to the linker collaborator.
#[derive(Debug)]
pub struct CompiledModule {
    pub module: ir::Module,
    pub imported_modules: Vec<String>,
}

/// Backend type of a primitive type handle.
pub(crate) fn lower_type(location: Location, handle: TypeHandle) -> Result<Type> {
    let ty = if handle == TypeHandle::STR || handle == TypeHandle::ADDRESS {
        Type::str_ptr()
    } else if handle == TypeHandle::BOOL || handle == TypeHandle::I8 || handle == TypeHandle::U8 {
        Type::Int(8)
    } else if handle == TypeHandle::I16 || handle == TypeHandle::U16 {
        Type::Int(16)
    } else if handle == TypeHandle::I32 || handle == TypeHandle::U32 {
        Type::Int(32)
    } else if handle == TypeHandle::NUM || handle == TypeHandle::I64 || handle == TypeHandle::U64 {
        Type::Int(64)
    } else {
        return Err(CompileError::compile(location, "Unknown type"));
    };
    Ok(ty)
}

/// Lower a node that must produce a value.
pub(crate) fn lower_value(ctx: &mut Context, node: &Node) -> Result<ValueId> {
    lower(ctx, node)?
        .ok_or_else(|| CompileError::compile(node.location, "Expected a value"))
}

/// Storage handles are pointers to their primitive slot; operands and call
/// arguments load through them. String values (pointers to a byte array)
/// and pointers to aggregates (contract instances) pass through untouched.
pub(crate) fn load_if_storage(ctx: &mut Context, value: ValueId) -> ValueId {
    let ty = ctx.builder.module().value_type(value);
    match ty.pointee() {
        Some(Type::Int(_)) | Some(Type::Ptr(_)) => ctx.builder.load(value),
        _ => value,
    }
}

/// Lower a branch condition into its 64-bit comparison word.
pub(crate) fn condition_word(ctx: &mut Context, node: &Node) -> Result<ValueId> {
    let value = lower_value(ctx, node)?;
    let value = load_if_storage(ctx, value);
    Ok(ctx.builder.int_cast(value, Type::Int(64)))
}

/// The lowering visitor: pattern-match on the node value and emit backend
/// instructions. `Ok(None)` means the node produced no value, e.g. a
/// statement.
pub(crate) fn lower(ctx: &mut Context, node: &Node) -> Result<Option<ValueId>> {
    use NodeKind::*;

    match &node.value {
        NodeValue::Kind(kind) => match kind {
            UnaryPlus | UnaryMinus | BitwiseNot | LogicalNot => expr::lower_unary(ctx, node, *kind),

            Multiplication | Division | FloorDivision | Modulus | Addition | Subtraction
            | BitwiseLeftShift | BitwiseRightShift | BitwiseAnd | BitwiseOr | BitwiseXor
            | LogicalAnd | LogicalOr | Equality | Inequality | GreaterThan | GreaterThanEqual
            | LessThan | LessThanEqual | IsIdentical | IsNotIdentical => {
                expr::lower_binary(ctx, node, *kind)
            }

            Exponent => Err(CompileError::compile(
                node.location,
                "Exponentiation is not supported by the backend",
            )),
            IsMemberOf | IsNotMemberOf => Err(CompileError::compile(
                node.location,
                "Membership tests are not supported",
            )),

            Assign => expr::lower_assign(ctx, node),
            AssignExponent => Err(CompileError::compile(
                node.location,
                "Exponentiation is not supported by the backend",
            )),
            AssignAddition | AssignSubtraction | AssignMultiplication | AssignDivision
            | AssignFloorDivision | AssignModulus | AssignBitwiseLeftShift
            | AssignBitwiseRightShift | AssignBitwiseAnd | AssignBitwiseOr | AssignBitwiseXor => {
                expr::lower_compound_assign(ctx, node, *kind)
            }

            Call => expr::lower_call(ctx, node),
            MemberCall => expr::lower_member_call(ctx, node),
            Index => expr::lower_index(ctx, node),
            Parentheses => {
                if node.children.len() != 1 {
                    return Err(CompileError::compile(
                        node.location,
                        "Parenthesized expression holds a single value",
                    ));
                }
                lower(ctx, &node.children[0])
            }

            StatementIf | StatementElif => stmt::lower_conditional(ctx, node),
            StatementElse => stmt::lower_else(ctx, node),
            StatementWhile => stmt::lower_loop(ctx, node),
            StatementPass => Ok(None),
            StatementReturn => stmt::lower_return(ctx, node),
            StatementImport => stmt::lower_import(ctx, node),
            StatementAssert => stmt::lower_assert(ctx, node),

            ContractDefinition => stmt::lower_contract(ctx, node),
            FunctionDefinition => stmt::lower_function(ctx, node),
            VariableDefinition => stmt::lower_variable(ctx, node),
            FunctionParameterDefinition => Ok(None),

            ModuleDefinition => Err(CompileError::internal(
                node.location,
                "Nested module definition",
            )),
        },

        NodeValue::Identifier(name) => match ctx.symbols.variable(name) {
            Some(value) => Ok(Some(value)),
            None => Err(CompileError::compile(
                node.location,
                format!("Unknown identifier '{}'", name),
            )),
        },
        NodeValue::Number(value) => Ok(Some(ctx.builder.const_int(Type::Int(64), *value))),
        NodeValue::Bool(value) => Ok(Some(ctx.builder.const_int(Type::Int(64), *value as i64))),
        NodeValue::Str(value) => Ok(Some(ctx.builder.global_string_ptr(value))),
        NodeValue::TypeId(_) => Ok(None),
    }
}

/// Module assembly: create `main`, route top-level statements into it, and
/// lower definitions into their own functions. Returns the full lowering
/// context together with the handle of the synthetic `main`.
pub(crate) fn lower_module(root: &Node, options: &CompileOptions) -> Result<(Context, ir::FuncId)> {
    if !root.is_kind(NodeKind::ModuleDefinition) {
        return Err(CompileError::internal(
            root.location,
            "Module definition is the root node of the AST",
        ));
    }

    let mut builder = Builder::new("module", &options.target_triple);
    let registered = builtins::register(&mut builder);
    let mut ctx = Context {
        builder,
        symbols: Symbols::new(registered.external, registered.internal),
        types: TypeRegistry::new(),
        imported_modules: Vec::new(),
    };

    let main = ctx.builder.declare_function(
        "main",
        Signature { params: Vec::new(), ret: Type::Int(32), variadic: false },
        Linkage::External,
    );
    let entry = ctx.builder.append_block(main, "entry");
    ctx.builder.set_insert_point(main, entry);

    let mut in_main = true;
    let mut main_position = ctx.builder.position();

    for child in &root.children {
        let is_definition = matches!(
            child.kind(),
            Some(NodeKind::ContractDefinition | NodeKind::FunctionDefinition)
        );
        if is_definition {
            if in_main {
                main_position = ctx.builder.position();
                in_main = false;
            }
            lower(&mut ctx, child)?;
        } else {
            if !in_main {
                let (func, block) = main_position;
                ctx.builder.set_insert_point(func, block);
                in_main = true;
            }
            lower(&mut ctx, child)?;
        }
    }

    if !in_main {
        let (func, block) = main_position;
        ctx.builder.set_insert_point(func, block);
    }
    let zero = ctx.builder.const_int(Type::Int(32), 0);
    ctx.builder.ret(Some(zero));

    Ok((ctx, main))
}

/// Finalize a module for the linker. In production builds `main` is erased
/// so the artifact is a pure library for the target VM's dynamic dispatch;
/// test builds keep it for direct execution.
pub fn compile(root: &Node, options: CompileOptions) -> Result<CompiledModule> {
    let (mut ctx, main) = lower_module(root, &options)?;
    if !options.keep_main {
        ctx.builder.erase_function(main);
    }
    Ok(CompiledModule {
        module: ctx.builder.finish(),
        imported_modules: ctx.imported_modules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn lowered(source: &str) -> (Context, ir::FuncId) {
        let mut cursor = tokenize(source).expect("tokenizes");
        let root = parse(&mut cursor).expect("parses");
        lower_module(&root, &CompileOptions::testing()).expect("lowers")
    }

    #[test]
    fn function_scope_leaves_no_variables_behind() {
        let (ctx, _) = lowered("def sum(a: num, b: num) -> num:\n    let s = a + b\n    return s\n");
        assert!(
            !ctx.symbols.variables.keys().any(|k| k.starts_with("_sum_")),
            "leftover scope entries: {:?}",
            ctx.symbols.variables.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn method_scope_leaves_no_variables_behind() {
        let source = "contract C:\n    let v: num = 0\n    def f(self, x: num) -> num:\n        let y = x\n        return y\n";
        let (ctx, _) = lowered(source);
        assert!(!ctx.symbols.variables.keys().any(|k| k.starts_with("C_f_")));
    }

    #[test]
    fn identically_named_locals_lower_without_collision() {
        let source = "def f() -> num:\n    let x = 1\n    return x\n\ndef g() -> num:\n    let x = 2\n    return x\n";
        let (ctx, _) = lowered(source);
        assert!(ctx.symbols.functions.contains_key("f"));
        assert!(ctx.symbols.functions.contains_key("g"));
        assert!(ctx.symbols.variables.is_empty());
    }

    #[test]
    fn contract_members_have_dense_source_order_indices() {
        let source = "contract Token:\n    let supply: num = 100\n    let name: str = \"tok\"\n    let live: bool = True\n";
        let (ctx, _) = lowered(source);
        let layout = &ctx.symbols.contracts["Token"];
        let names: Vec<&str> = layout.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["supply", "name", "live"]);
        let indices: Vec<usize> = layout.members.iter().map(|m| m.index).collect();
        assert_eq!(indices, [0, 1, 2]);
    }

    #[test]
    fn every_contract_gets_a_default_constructor() {
        let (ctx, _) = lowered("contract Empty:\n    let x: num = 0\n");
        let layout = &ctx.symbols.contracts["Empty"];
        assert!(layout.default_ctor.is_some());
        assert!(ctx.symbols.functions.contains_key("Empty____default_init__"));
        assert!(ctx
            .builder
            .module()
            .lookup_function("Empty____default_init__")
            .is_some());
    }

    #[test]
    fn user_constructor_registers_under_contract_mangling() {
        let source = "contract C:\n    let x: num = 0\n    def __init__(self):\n        self.x = 5\n";
        let (ctx, _) = lowered(source);
        assert!(ctx.symbols.functions.contains_key("C____init__"));
    }

    #[test]
    fn import_records_each_occurrence_without_instructions() {
        let (ctx, main) = lowered("import runtime\nimport runtime\n");
        assert_eq!(ctx.imported_modules, ["runtime", "runtime"]);
        // main holds nothing but its final `ret 0`.
        let module = ctx.builder.module();
        assert_eq!(module.function(main).blocks[0].insts.len(), 1);
    }

    #[test]
    fn unknown_identifier_is_a_compile_error() {
        let mut cursor = tokenize("print(missing)\n").expect("tokenizes");
        let root = parse(&mut cursor).expect("parses");
        let error = compile(&root, CompileOptions::testing()).unwrap_err();
        assert_eq!(error.kind, crate::error::ErrorKind::Compile);
        assert!(error.message.contains("missing"), "{}", error.message);
    }

    #[test]
    fn production_build_erases_main() {
        let mut cursor = tokenize("print(1)\n").expect("tokenizes");
        let root = parse(&mut cursor).expect("parses");
        let compiled = compile(&root, CompileOptions::production()).expect("compiles");
        assert!(compiled.module.lookup_function("main").is_none());

        let mut cursor = tokenize("print(1)\n").expect("tokenizes");
        let root = parse(&mut cursor).expect("parses");
        let compiled = compile(&root, CompileOptions::testing()).expect("compiles");
        assert!(compiled.module.lookup_function("main").is_some());
    }
}
