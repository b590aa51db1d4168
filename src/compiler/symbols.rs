//! Symbol tables for the lowering pass.
//!
//! All maps are flat and keyed by mangled name. Inside contract `C` and
//! function `F` an identifier `x` lives under `C_F_x`; at module scope it
//! keeps its bare name. Contract methods are registered as `C__m`, the
//! synthesized default constructor as `C____default_init__` and a
//! user-defined constructor as `C____init__`. Leaving a scope deletes every
//! variable whose key starts with the scope's prefix, which gives scoped
//! lifetimes without a stack of maps.

use std::collections::BTreeMap;

use crate::ir::{FuncId, StructId, Type, ValueId};

/// One named, typed data member of a contract, with its zero-based index in
/// the contract layout.
#[derive(Debug, Clone)]
pub struct DataMember {
    pub name: String,
    pub ty: Type,
    pub index: usize,
}

/// Layout descriptor of a user-defined contract type.
#[derive(Debug, Clone)]
pub struct ContractLayout {
    pub struct_id: StructId,
    pub members: Vec<DataMember>,
    pub default_ctor: Option<FuncId>,
}

impl ContractLayout {
    pub fn member(&self, name: &str) -> Option<&DataMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

pub struct Symbols {
    /// Locals, arguments and globals, keyed by mangled name. Entries are
    /// removed once their scope exits.
    pub variables: BTreeMap<String, ValueId>,
    /// User-defined functions, keyed by mangled name.
    pub functions: BTreeMap<String, FuncId>,
    /// User-defined contract types, keyed by source name.
    pub contracts: BTreeMap<String, ContractLayout>,

    pub current_contract: String,
    pub current_function: String,

    external_builtins: BTreeMap<String, FuncId>,
    internal_builtins: BTreeMap<String, FuncId>,
}

impl Symbols {
    pub fn new(
        external_builtins: BTreeMap<String, FuncId>,
        internal_builtins: BTreeMap<String, FuncId>,
    ) -> Self {
        Symbols {
            variables: BTreeMap::new(),
            functions: BTreeMap::new(),
            contracts: BTreeMap::new(),
            current_contract: String::new(),
            current_function: String::new(),
            external_builtins,
            internal_builtins,
        }
    }

    pub fn external_builtin(&self, name: &str) -> Option<FuncId> {
        self.external_builtins.get(name).copied()
    }

    pub fn internal_builtin(&self, name: &str) -> Option<FuncId> {
        self.internal_builtins.get(name).copied()
    }

    /// Mangle an identifier for the current scope.
    pub fn mangle(&self, name: &str) -> String {
        if self.current_contract.is_empty() && self.current_function.is_empty() {
            name.to_string()
        } else {
            format!("{}_{}_{}", self.current_contract, self.current_function, name)
        }
    }

    /// Registration key for a function named `name` in the current contract.
    pub fn function_key(&self, name: &str) -> String {
        if self.current_contract.is_empty() {
            name.to_string()
        } else {
            format!("{}__{}", self.current_contract, name)
        }
    }

    /// Resolve an identifier: the current scope's mangled entry first, the
    /// module-scope entry second.
    pub fn variable(&self, name: &str) -> Option<ValueId> {
        self.variables
            .get(&self.mangle(name))
            .or_else(|| self.variables.get(name))
            .copied()
    }

    pub fn set_variable(&mut self, name: &str, value: ValueId) {
        self.variables.insert(self.mangle(name), value);
    }

    fn scope_prefix(&self) -> String {
        format!("{}_{}_", self.current_contract, self.current_function)
    }

    /// Delete every variable belonging to the current scope.
    pub fn purge_scope(&mut self) {
        let prefix = self.scope_prefix();
        self.variables.retain(|key, _| !key.starts_with(&prefix));
    }

    /// Find the contract a backend struct handle belongs to.
    pub fn contract_of_struct(&self, struct_id: StructId) -> Option<(&str, &ContractLayout)> {
        self.contracts
            .iter()
            .find(|(_, layout)| layout.struct_id == struct_id)
            .map(|(name, layout)| (name.as_str(), layout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Builder, Linkage, Signature, Type};

    fn symbols() -> Symbols {
        Symbols::new(BTreeMap::new(), BTreeMap::new())
    }

    fn some_value() -> ValueId {
        let mut builder = Builder::new("test", "host");
        builder.const_int(Type::Int(64), 0)
    }

    #[test]
    fn module_scope_names_stay_bare() {
        let symbols = symbols();
        assert_eq!(symbols.mangle("x"), "x");
        assert_eq!(symbols.function_key("f"), "f");
    }

    #[test]
    fn scoped_names_carry_contract_and_function() {
        let mut symbols = symbols();
        symbols.current_contract = "Token".to_string();
        symbols.current_function = "transfer".to_string();
        assert_eq!(symbols.mangle("amount"), "Token_transfer_amount");
        assert_eq!(symbols.function_key("transfer"), "Token__transfer");
    }

    #[test]
    fn purge_removes_only_current_scope() {
        let mut symbols = symbols();
        let value = some_value();
        symbols.variables.insert("global".to_string(), value);
        symbols.variables.insert("Token_f_x".to_string(), value);
        symbols.variables.insert("Token_g_x".to_string(), value);

        symbols.current_contract = "Token".to_string();
        symbols.current_function = "f".to_string();
        symbols.purge_scope();

        assert!(!symbols.variables.contains_key("Token_f_x"));
        assert!(symbols.variables.contains_key("Token_g_x"));
        assert!(symbols.variables.contains_key("global"));
    }

    #[test]
    fn lookup_falls_back_to_module_scope() {
        let mut symbols = symbols();
        let value = some_value();
        symbols.variables.insert("counter".to_string(), value);
        symbols.current_function = "f".to_string();
        assert_eq!(symbols.variable("counter"), Some(value));
    }

    #[test]
    fn identically_named_locals_do_not_collide() {
        let mut symbols = symbols();
        let value = some_value();
        symbols.current_function = "f".to_string();
        symbols.set_variable("x", value);
        symbols.current_function = "g".to_string();
        symbols.set_variable("x", value);
        assert_eq!(symbols.variables.len(), 2);
    }

    #[test]
    fn contract_members_resolve_by_struct() {
        let mut builder = Builder::new("test", "host");
        let sid = builder.struct_create("Token");
        let ctor = builder.declare_function(
            "Token____default_init__",
            Signature { params: Vec::new(), ret: Type::Struct(sid), variadic: false },
            Linkage::External,
        );

        let mut symbols = symbols();
        symbols.contracts.insert(
            "Token".to_string(),
            ContractLayout {
                struct_id: sid,
                members: vec![DataMember { name: "supply".to_string(), ty: Type::Int(64), index: 0 }],
                default_ctor: Some(ctor),
            },
        );

        let (name, layout) = symbols.contract_of_struct(sid).expect("contract is registered");
        assert_eq!(name, "Token");
        assert_eq!(layout.member("supply").map(|m| m.index), Some(0));
        assert_eq!(layout.member("missing").map(|m| m.index), None);
    }
}
