//! Generates machine code for a given program.
//!
//! Compilation is recursive: every loop interior is compiled as its own
//! routine, placed in the buffer ahead of the level that calls it. A call
//! displacement can then always be computed the moment its call site is
//! emitted, because the target offset is already fixed.

use std::collections::VecDeque;

use crate::asm::amd64::Amd64Assembly;
use crate::errors::CompilationError;
use crate::lexer::{tokenize, Token, TokenKind};

/// Compiles tokenized source into one buffer of x86-64 code, bodies first.
pub struct CodeGenerator {
    asm: Amd64Assembly,
}

/// What kind of routine a nesting level compiles to. The program gets the
/// prologue and epilogue; a loop body just returns to its call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Routine {
    Program,
    LoopBody,
}

impl CodeGenerator {
    pub fn new() -> Self {
        CodeGenerator {
            asm: Amd64Assembly::new(),
        }
    }

    /// Compiles the whole source, returning the entry offset of the
    /// top-level routine within [Self::machine_code].
    pub fn compile(&mut self, source: &[u8]) -> Result<usize, CompilationError> {
        self.compile_range(source, 0, source.len(), Routine::Program)
    }

    pub fn machine_code(&self) -> &[u8] {
        self.asm.machine_code()
    }

    /// Compiles one nesting level and returns its entry offset.
    fn compile_range(
        &mut self,
        source: &[u8],
        start: usize,
        end: usize,
        routine: Routine,
    ) -> Result<usize, CompilationError> {
        let tokens = tokenize(source, start, end)?;
        let mut bodies = self.compile_loop_bodies(source, &tokens)?;

        let entry = self.asm.here();
        if routine == Routine::Program {
            self.asm.prologue();
        }

        for token in &tokens {
            match token.kind {
                TokenKind::Loop => {
                    let target = bodies
                        .pop_front()
                        .expect("loop has no precompiled body: lexer and generator disagree");
                    self.asm.loop_call(target);
                }
                TokenKind::Skip => (),
                kind => self.asm.emit_template(kind, token.run_length()),
            }
        }

        assert!(
            bodies.is_empty(),
            "{} precompiled bodies were never called: lexer and generator disagree",
            bodies.len()
        );

        match routine {
            Routine::Program => self.asm.epilogue(),
            Routine::LoopBody => self.asm.ret(),
        }

        Ok(entry)
    }

    /// First pass over a level: recursively compile the interior of every
    /// direct child loop, collecting entry offsets in encounter order. The
    /// linear pass dequeues them in the same order, one per Loop token.
    fn compile_loop_bodies(
        &mut self,
        source: &[u8],
        tokens: &[Token],
    ) -> Result<VecDeque<usize>, CompilationError> {
        let mut bodies = VecDeque::new();

        for token in tokens {
            if token.kind == TokenKind::Loop {
                let entry =
                    self.compile_range(source, token.start, token.end, Routine::LoopBody)?;
                bodies.push_back(entry);
            }
        }

        Ok(bodies)
    }
}
