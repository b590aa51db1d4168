//! Built-in library declarations.
//!
//! Registered once before lowering starts: external declarations satisfied
//! by the target's runtime (`printf`, `abort`, `is_utf8`), and internal
//! nullary wrappers around the ADVM intrinsics so user code can call them by
//! conventional names.

use std::collections::BTreeMap;

use crate::ir::{Builder, FuncId, Linkage, Signature, Type};

pub struct Builtins {
    pub external: BTreeMap<String, FuncId>,
    pub internal: BTreeMap<String, FuncId>,
}

fn intrinsic_wrapper(
    builder: &mut Builder,
    return_type: Type,
    intrinsic_name: &str,
    wrapper_name: &str,
) -> FuncId {
    let intrinsic = builder.declare_function(
        intrinsic_name,
        Signature { params: Vec::new(), ret: return_type.clone(), variadic: false },
        Linkage::External,
    );

    let wrapper = builder.declare_function(
        wrapper_name,
        Signature { params: Vec::new(), ret: return_type, variadic: false },
        Linkage::Internal,
    );
    let entry = builder.append_block(wrapper, "entry");
    builder.set_insert_point(wrapper, entry);
    let value = builder.call(intrinsic, Vec::new());
    builder.ret(Some(value));
    wrapper
}

/// Declare every built-in into the module and hand back the lookup tables.
pub fn register(builder: &mut Builder) -> Builtins {
    let mut external = BTreeMap::new();
    let mut internal = BTreeMap::new();

    let printf = builder.declare_function(
        "printf",
        Signature { params: vec![Type::ptr(Type::Int(8))], ret: Type::Int(32), variadic: true },
        Linkage::External,
    );
    external.insert("print".to_string(), printf);

    let abort = builder.declare_function(
        "abort",
        Signature { params: Vec::new(), ret: Type::Void, variadic: false },
        Linkage::External,
    );
    external.insert("abort".to_string(), abort);

    let is_utf8 = builder.declare_function(
        "is_utf8",
        Signature { params: vec![Type::ptr(Type::Int(8))], ret: Type::Int(32), variadic: false },
        Linkage::External,
    );
    external.insert("is_utf8".to_string(), is_utf8);

    internal.insert(
        "contract_address".to_string(),
        intrinsic_wrapper(builder, Type::str_ptr(), "advm.contract.addr", "contract_address"),
    );
    internal.insert(
        "caller_address".to_string(),
        intrinsic_wrapper(builder, Type::str_ptr(), "advm.caller.addr", "caller_address"),
    );
    internal.insert(
        "block_timestamp".to_string(),
        intrinsic_wrapper(builder, Type::Int(64), "advm.block.ts", "block_timestamp"),
    );

    Builtins { external, internal }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_builtins_are_registered() {
        let mut builder = Builder::new("test", "host");
        let builtins = register(&mut builder);

        assert!(builtins.external.contains_key("print"));
        assert!(builtins.external.contains_key("abort"));
        assert!(builtins.external.contains_key("is_utf8"));
        assert!(builtins.internal.contains_key("contract_address"));
        assert!(builtins.internal.contains_key("caller_address"));
        assert!(builtins.internal.contains_key("block_timestamp"));
    }

    #[test]
    fn wrappers_are_defined_over_declared_intrinsics() {
        let mut builder = Builder::new("test", "host");
        let builtins = register(&mut builder);
        let module = builder.module();

        let wrapper = builtins.internal["block_timestamp"];
        assert!(!module.function(wrapper).is_declaration());
        assert_eq!(module.function(wrapper).linkage, Linkage::Internal);

        let intrinsic = module.lookup_function("advm.block.ts").expect("intrinsic is declared");
        assert!(module.function(intrinsic).is_declaration());
    }

    #[test]
    fn print_maps_to_variadic_printf() {
        let mut builder = Builder::new("test", "host");
        let builtins = register(&mut builder);
        let module = builder.module();
        let printf = builtins.external["print"];
        assert_eq!(module.function(printf).name, "printf");
        assert!(module.function(printf).sig.variadic);
    }
}
