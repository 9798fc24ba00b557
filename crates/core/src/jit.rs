//! Owns compiled machine code and runs it.

use std::mem;
use std::ptr;

use jitmem::{ExecutableRegion, WritableRegion};
use libc::c_void;

use crate::io::{self, GetChar, IoTable, PutChar};

/// How much memory a running program gets: 1 MiB of byte cells, zeroed.
pub const TAPE_SIZE: usize = 1024 * 1024;

/// The fixed calling convention of generated code: the I/O table, a
/// reserved argument, and the tape.
type Entry = unsafe extern "C" fn(*const IoTable, *mut c_void, *mut u8);

/// A program compiled to executable x86-64 code in this process's image.
///
/// The region stays mapped (and executable) exactly as long as this value
/// lives, so the entry pointer taken in [Self::run_with_custom_io] never
/// dangles.
pub struct CompiledProgram {
    code: ExecutableRegion,
    entry: usize,
}

impl CompiledProgram {
    /// Copies finished machine code into fresh memory and makes it
    /// executable. The memory is never writable and executable at once.
    pub(crate) fn from_binary(binary: &[u8], entry: usize) -> jitmem::Result<CompiledProgram> {
        let mut mem = WritableRegion::allocate(binary.len())?;
        mem[0..binary.len()].copy_from_slice(binary);

        Ok(CompiledProgram {
            code: mem.into_executable()?,
            entry,
        })
    }

    /// Runs the program on a fresh zeroed tape against the console.
    pub fn run(&self) {
        let mut tape = vec![0u8; TAPE_SIZE];
        self.run_with_custom_io(&mut tape, io::console_putchar, io::console_getchar);
    }

    /// Runs the program on a caller-supplied tape with caller-supplied I/O
    /// routines. The cursor starts at the first cell; motion past either
    /// end of the tape is not checked.
    pub fn run_with_custom_io(&self, tape: &mut [u8], output: PutChar, input: GetChar) {
        let table = IoTable::new(output, input);
        let program: Entry = unsafe { mem::transmute(self.code.addr().add(self.entry)) };

        unsafe { program(&table, ptr::null_mut(), tape.as_mut_ptr()) };
    }
}
