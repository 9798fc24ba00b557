//! Assembler for x86-64.
//!
//! Every token kind maps to a fixed instruction template; emission is
//! appending template bytes and patching the odd immediate or displacement.

use crate::lexer::TokenKind;

// REGISTERS:
//
// rbx (callee saved) - current pointer on the tape (during function)
// r12 (callee saved) - the output routine (during function)
// r13 (callee saved) - the input routine (during function)
//
// rdi (argument)     - pointer to the I/O table
// rsi (argument)     - reserved, unused
// rdx (argument)     - pointer to the tape
//
// see: https://en.wikipedia.org/wiki/X86_calling_conventions#System_V_AMD64_ABI

/// Location and operand maximum of a template's immediate byte.
#[derive(Clone, Copy)]
struct ImmediateField {
    offset: usize,
    max: usize,
}

/// A fixed machine-code template for one token kind.
#[derive(Clone, Copy)]
struct Template {
    bytes: &'static [u8],
    immediate: Option<ImmediateField>,
}

// `add rbx, imm8` and `sub rbx, imm8` sign-extend their immediate, so the
// largest count one instruction can carry is 127. The byte forms wrap
// mod 256 and take the full 255.
const POINTER_INC: Template = Template {
    bytes: &[0x48, 0x83, 0xC3, 0x00], // add rbx, imm8
    immediate: Some(ImmediateField { offset: 3, max: 127 }),
};

const POINTER_DEC: Template = Template {
    bytes: &[0x48, 0x83, 0xEB, 0x00], // sub rbx, imm8
    immediate: Some(ImmediateField { offset: 3, max: 127 }),
};

const CELL_INC: Template = Template {
    bytes: &[0x80, 0x03, 0x00], // add byte [rbx], imm8
    immediate: Some(ImmediateField { offset: 2, max: 255 }),
};

const CELL_DEC: Template = Template {
    bytes: &[0x80, 0x2B, 0x00], // sub byte [rbx], imm8
    immediate: Some(ImmediateField { offset: 2, max: 255 }),
};

const OUTPUT: Template = Template {
    bytes: &[
        0x48, 0x0F, 0xB6, 0x3B, // movzx rdi, byte [rbx]
        0x41, 0xFF, 0xD4, // call r12
    ],
    immediate: None,
};

const INPUT: Template = Template {
    bytes: &[
        0x41, 0xFF, 0xD5, // call r13
        0x88, 0x03, // mov [rbx], al
    ],
    immediate: None,
};

/// Fixed templates, indexed by `TokenKind as usize`. Loop and Skip have no
/// entry: loops get control glue with a patched displacement, and skips emit
/// nothing.
const TEMPLATES: [Option<Template>; 8] = [
    Some(POINTER_INC),
    Some(POINTER_DEC),
    Some(CELL_INC),
    Some(CELL_DEC),
    Some(OUTPUT),
    Some(INPUT),
    None,
    None,
];

// The zero test lives at the call site: test the current cell, skip past the
// call when it is zero, otherwise call the body and jump back to the test.
// The body itself just returns after one pass.
//
// The sub/add pair keeps rsp on a 16-byte boundary at every call, whatever
// the loop depth; the I/O routines are entitled to that alignment.
const LOOP_GLUE: &[u8] = &[
    0x80, 0x3B, 0x00, // cmp byte [rbx], 0
    0x74, 0x0F, // je +15 (past the call and the back-jump)
    0x48, 0x83, 0xEC, 0x08, // sub rsp, 8
    0xE8, 0x00, 0x00, 0x00, 0x00, // call rel32 (placeholder)
    0x48, 0x83, 0xC4, 0x08, // add rsp, 8
    0xEB, 0xEC, // jmp -20 (back to the cmp)
];

/// Where the rel32 placeholder sits within [LOOP_GLUE].
const LOOP_GLUE_DISP_OFFSET: usize = 10;

/// A call's rel32 is relative to the end of the call instruction, 14 bytes
/// into the glue.
const LOOP_GLUE_CALL_END: usize = 14;

// rbx, r12 and r13 are callee saved, so the program saves them before
// taking them over. The odd number of pushes needs the 8-byte pad to leave
// rsp on a 16-byte boundary for the call sites at this level.
const PROLOGUE: &[u8] = &[
    0x55, // push rbp
    0x48, 0x89, 0xE5, // mov rbp, rsp
    0x53, // push rbx
    0x41, 0x54, // push r12
    0x41, 0x55, // push r13
    0x48, 0x83, 0xEC, 0x08, // sub rsp, 8
    0x48, 0x89, 0xD3, // mov rbx, rdx
    0x4C, 0x8B, 0x27, // mov r12, [rdi]
    0x4C, 0x8B, 0x6F, 0x08, // mov r13, [rdi + 8]
];

const EPILOGUE: &[u8] = &[
    0x48, 0x83, 0xC4, 0x08, // add rsp, 8
    0x41, 0x5D, // pop r13
    0x41, 0x5C, // pop r12
    0x5B, // pop rbx
    0xC9, // leave
    0xC3, // ret
];

const RETURN: &[u8] = &[
    0xC3, // ret
];

/// Generates x86-64 machine code.
///
/// One buffer accumulates the code of the whole compile; distinct routines
/// (the top-level program and every loop body) occupy disjoint ranges of it.
pub struct Amd64Assembly {
    code: Vec<u8>,
}

impl Amd64Assembly {
    pub fn new() -> Self {
        Amd64Assembly { code: Vec::new() }
    }

    /// The offset where the next emitted instruction will land.
    pub fn here(&self) -> usize {
        self.code.len()
    }

    /// Returns machine code.
    pub fn machine_code(&self) -> &[u8] {
        &self.code[..]
    }

    /// The program prologue: establish a frame, save the callee-saved
    /// registers the program takes over, move the tape argument (rdx) into
    /// the cursor register (rbx), and cache the two I/O routine addresses
    /// from the I/O table argument (rdi) in r12 and r13, where they stay
    /// live for the whole program.
    pub fn prologue(&mut self) {
        self.emit(PROLOGUE);
    }

    /// The program epilogue: tear down the frame and return to the harness.
    pub fn epilogue(&mut self) {
        self.emit(EPILOGUE);
    }

    /// Terminates a loop body; control returns to the call-site glue.
    pub fn ret(&mut self) {
        self.emit(RETURN);
    }

    /// Emits the code for `count` repetitions of a fixed-template token
    /// kind. A kind with an immediate field folds the whole run into as few
    /// instructions as the operand maximum permits; kinds without one never
    /// coalesce, so their `count` is 1.
    pub fn emit_template(&mut self, kind: TokenKind, count: usize) {
        let template = TEMPLATES[kind as usize]
            .unwrap_or_else(|| panic!("no fixed template for {:?}", kind));

        match template.immediate {
            Some(field) => {
                let mut remaining = count;
                while remaining > field.max {
                    self.emit_patched(template.bytes, field.offset, field.max as u8);
                    remaining -= field.max;
                }
                if remaining != 0 {
                    self.emit_patched(template.bytes, field.offset, remaining as u8);
                }
            }
            None => self.emit(template.bytes),
        }
    }

    /// Emits the loop control glue, resolving its call displacement against
    /// `target`, the entry offset of the already-emitted loop body.
    pub fn loop_call(&mut self, target: usize) {
        let here = self.here();
        self.emit(LOOP_GLUE);

        let displacement = target as i64 - (here + LOOP_GLUE_CALL_END) as i64;
        self.patch_rel32(here + LOOP_GLUE_DISP_OFFSET, displacement as i32);
    }

    fn emit(&mut self, bytes: &[u8]) {
        self.code.extend_from_slice(bytes);
    }

    /// Emits a template with its immediate byte overwritten.
    fn emit_patched(&mut self, bytes: &'static [u8], offset: usize, immediate: u8) {
        let at = self.here();
        self.emit(bytes);
        self.code[at + offset] = immediate;
    }

    /// Writes a position-relative displacement into the placeholder bytes of
    /// an already-emitted call or jump.
    fn patch_rel32(&mut self, at: usize, displacement: i32) {
        self.code[at..at + 4].copy_from_slice(&displacement.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind::*;

    #[test]
    fn a_single_increment_patches_the_immediate() {
        let mut asm = Amd64Assembly::new();
        asm.emit_template(CellInc, 1);
        assert_eq!(&[0x80, 0x03, 0x01], asm.machine_code());
    }

    #[test]
    fn a_cell_run_folds_up_to_255_per_instruction() {
        let mut asm = Amd64Assembly::new();
        asm.emit_template(CellDec, 255);
        assert_eq!(&[0x80, 0x2B, 0xFF], asm.machine_code());
    }

    #[test]
    fn a_cell_run_past_255_chains_full_templates() {
        let mut asm = Amd64Assembly::new();
        asm.emit_template(CellInc, 510);
        assert_eq!(
            &[0x80, 0x03, 0xFF, 0x80, 0x03, 0xFF],
            asm.machine_code()
        );

        let mut asm = Amd64Assembly::new();
        asm.emit_template(CellInc, 511);
        assert_eq!(
            &[0x80, 0x03, 0xFF, 0x80, 0x03, 0xFF, 0x80, 0x03, 0x01],
            asm.machine_code()
        );
    }

    #[test]
    fn an_exact_multiple_emits_no_trailing_instruction() {
        let mut asm = Amd64Assembly::new();
        asm.emit_template(CellInc, 255 * 3);
        assert_eq!(9, asm.machine_code().len());
    }

    #[test]
    fn a_pointer_run_folds_only_up_to_127() {
        // The imm8 of add/sub rbx is sign-extended; 200 must split.
        let mut asm = Amd64Assembly::new();
        asm.emit_template(PointerInc, 200);
        assert_eq!(
            &[0x48, 0x83, 0xC3, 0x7F, 0x48, 0x83, 0xC3, 0x49],
            asm.machine_code()
        );
    }

    #[test]
    fn the_loop_glue_call_is_relative_to_the_call_end() {
        let mut asm = Amd64Assembly::new();
        asm.emit_template(CellDec, 1); // 3 bytes of padding before the glue
        asm.loop_call(0);

        let code = asm.machine_code();
        assert_eq!(3 + LOOP_GLUE.len(), code.len());
        // glue starts at 3; the call ends at 3 + 14; target 0 is -17 away
        let disp = i32::from_le_bytes(code[13..17].try_into().unwrap());
        assert_eq!(-17, disp);
    }

    #[test]
    fn io_templates_have_no_immediate() {
        let mut asm = Amd64Assembly::new();
        asm.emit_template(Output, 1);
        asm.emit_template(Input, 1);
        assert_eq!(
            &[0x48, 0x0F, 0xB6, 0x3B, 0x41, 0xFF, 0xD4, 0x41, 0xFF, 0xD5, 0x88, 0x03],
            asm.machine_code()
        );
    }
}
