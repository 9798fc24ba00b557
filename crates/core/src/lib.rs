//! A just-in-time compiler for Brainfuck.
//!
//! Source text goes through exactly one transformation chain: the [lexer]
//! scans each nesting level into run-coalesced tokens, and the code
//! generator compiles them recursively into a single instruction buffer,
//! with every loop body placed ahead of the call site that reaches it. The
//! x86-64 encoder folds repeated commands into immediate operands as it
//! goes. The finished buffer is remapped executable and invoked against a
//! 1 MiB tape, with all I/O going through two host routines whose addresses
//! travel in a small table.

extern crate jitmem;

pub mod errors;
pub mod io;
pub mod jit;
pub mod lexer;

mod asm;
mod codegen;

pub use crate::codegen::CodeGenerator;
pub use crate::errors::CompilationError;
pub use crate::jit::{CompiledProgram, TAPE_SIZE};

/// Compiles source text to native code, injected into this process's image
/// and ready to run.
///
/// Compilation failures and memory-mapping failures are different families
/// of error; callers that only report them can box both.
pub fn jit_compile(source: &[u8]) -> Result<CompiledProgram, Box<dyn std::error::Error>> {
    let mut gen = CodeGenerator::new();
    let entry = gen.compile(source)?;

    let program = CompiledProgram::from_binary(gen.machine_code(), entry)?;
    Ok(program)
}
