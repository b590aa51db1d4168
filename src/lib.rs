//! Compiler front-end and code generator for the AO smart-contract
//! language, targeting the ADVM.
//!
//! # Pipeline
//!
//! ```text
//! ┌────────┐   ┌───────────┐   ┌────────┐   ┌─────┐   ┌──────────┐   ┌────────┐
//! │ source │ → │ tokenizer │ → │ parser │ → │ AST │ → │ lowering │ → │ module │
//! └────────┘   └───────────┘   └────────┘   └─────┘   └──────────┘   └────────┘
//!                                                                        ↓
//!                                                                     linker
//! ```
//!
//! Tokenization is indentation-sensitive and lazy; parsing is a single
//! recursive Shunting-Yard engine producing an owned AST rooted at a module
//! definition; lowering walks the tree into an SSA-style instruction module
//! that is handed to the linker collaborator. Errors carry a source
//! location and unwind to the driver, which is the only component that
//! formats them.

pub mod ast;
pub mod compiler;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod linker;
pub mod parser;
pub mod reserved;
pub mod stream;
pub mod token;
pub mod types;

pub use ast::{Node, NodeKind, NodeValue};
pub use compiler::{compile, CompileOptions, CompiledModule};
pub use error::{CompileError, ErrorKind, Result};
pub use lexer::{tokenize, TokenCursor};
pub use parser::parse;
pub use reserved::ReservedToken;
pub use stream::{Location, Stream};
pub use token::{Token, TokenValue};
pub use types::{TypeHandle, TypeRegistry};

/// Run the whole front-end over a source text.
pub fn compile_source(source: &str, options: CompileOptions) -> Result<CompiledModule> {
    let mut cursor = lexer::tokenize(source)?;
    let root = parser::parse(&mut cursor)?;
    compiler::compile(&root, options)
}
