//! Semantic analysis and code generation core for PL0.
//!
//! The parser (external) produces the raw tree and a populated symbol table;
//! [`compile`] type checks the tree, rewrites it into a typed tree and emits
//! stack-machine code per procedure for the VM loader (external).

pub mod ast;
pub mod checker;
pub mod codegen;
pub mod errors;
pub mod symtab;
pub mod types;

use std::error::Error;
use std::fmt::Display;

pub use checker::{check_program, TypeInfo};
pub use codegen::{generate, Code, Instruction, Procedures, CASE_LABEL_MISSING, SIZE_JUMP_ALWAYS};
pub use errors::{ErrorSink, FatalError};
pub use symtab::SymbolTable;
pub use types::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Diagnostics were reported; no code was generated.
    Rejected,
    /// A checker/generator invariant broke; compilation aborted.
    Fatal(FatalError),
}

impl Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Rejected => f.write_str("compilation rejected with diagnostics"),
            CompileError::Fatal(fatal) => fatal.fmt(f),
        }
    }
}

impl Error for CompileError {}

/// Check `program` and, when no diagnostics were reported, generate code for
/// every procedure. Diagnostics stay in the sink either way.
pub fn compile(
    program: ast::ProgramNode<()>,
    symtab: &mut SymbolTable,
    errors: &mut ErrorSink,
) -> Result<Procedures, CompileError> {
    let program = check_program(program, symtab, errors);
    if errors.had_errors() {
        return Err(CompileError::Rejected);
    }
    generate(&program, symtab, errors).map_err(CompileError::Fatal)
}
