//! Type registry: interned handles for primitive and contract types.
//!
//! Primitives are interned once at fixed handles, so the parser can map a
//! type keyword to its handle without a registry instance. Contract types are
//! registered by the lowering pass, keyed by their source name; a contract's
//! handle is written at most once and stays stable for the life of the
//! registry.

use std::collections::HashMap;

use crate::reserved::ReservedToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct TypeHandle(u32);

const PRIMITIVES: [&str; 12] = [
    "address", "bool", "num", "str", "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64",
];

impl TypeHandle {
    pub const ADDRESS: TypeHandle = TypeHandle(0);
    pub const BOOL: TypeHandle = TypeHandle(1);
    pub const NUM: TypeHandle = TypeHandle(2);
    pub const STR: TypeHandle = TypeHandle(3);
    pub const I8: TypeHandle = TypeHandle(4);
    pub const I16: TypeHandle = TypeHandle(5);
    pub const I32: TypeHandle = TypeHandle(6);
    pub const I64: TypeHandle = TypeHandle(7);
    pub const U8: TypeHandle = TypeHandle(8);
    pub const U16: TypeHandle = TypeHandle(9);
    pub const U32: TypeHandle = TypeHandle(10);
    pub const U64: TypeHandle = TypeHandle(11);

    pub fn is_primitive(self) -> bool {
        (self.0 as usize) < PRIMITIVES.len()
    }

    pub fn primitive_name(self) -> Option<&'static str> {
        PRIMITIVES.get(self.0 as usize).copied()
    }

    /// Handle of the primitive named by a type-specifier keyword.
    pub fn of_keyword(token: ReservedToken) -> Option<TypeHandle> {
        match token {
            ReservedToken::KwAddress => Some(Self::ADDRESS),
            ReservedToken::KwBool => Some(Self::BOOL),
            ReservedToken::KwNum => Some(Self::NUM),
            ReservedToken::KwStr => Some(Self::STR),
            ReservedToken::KwI8 => Some(Self::I8),
            ReservedToken::KwI16 => Some(Self::I16),
            ReservedToken::KwI32 => Some(Self::I32),
            ReservedToken::KwI64 => Some(Self::I64),
            ReservedToken::KwU8 => Some(Self::U8),
            ReservedToken::KwU16 => Some(Self::U16),
            ReservedToken::KwU32 => Some(Self::U32),
            ReservedToken::KwU64 => Some(Self::U64),
            _ => None,
        }
    }
}

pub struct TypeRegistry {
    names: Vec<String>,
    map: HashMap<String, TypeHandle>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = TypeRegistry { names: Vec::new(), map: HashMap::new() };
        for name in PRIMITIVES {
            registry.intern(name);
        }
        registry
    }

    fn intern(&mut self, name: &str) -> TypeHandle {
        if let Some(&handle) = self.map.get(name) {
            return handle;
        }
        let handle = TypeHandle(self.names.len() as u32);
        self.names.push(name.to_string());
        self.map.insert(name.to_string(), handle);
        handle
    }

    /// Register a user-defined contract type. Idempotent; the first
    /// registration wins and later calls return the same handle.
    pub fn register_contract(&mut self, name: &str) -> TypeHandle {
        self.intern(name)
    }

    pub fn handle(&self, name: &str) -> Option<TypeHandle> {
        self.map.get(name).copied()
    }

    pub fn name(&self, handle: TypeHandle) -> &str {
        &self.names[handle.0 as usize]
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
