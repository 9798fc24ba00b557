//! The two host routines generated code calls, and the table that carries
//! their addresses into the program.

use libc::c_void;

/// Has the same shape as `libc`'s `putchar(3)`.
pub type PutChar = extern "C" fn(u32) -> u32;

/// Has the same shape as `libc`'s `getchar(3)`, except end of input reads
/// as 0 instead of EOF.
pub type GetChar = extern "C" fn() -> u32;

/// The two routine addresses passed by reference into generated code.
///
/// The program prologue loads `output` from offset 0 and `input` from
/// offset 8, so the layout and field order are part of the ABI.
#[repr(C)]
pub struct IoTable {
    pub output: PutChar,
    pub input: GetChar,
}

impl IoTable {
    pub fn new(output: PutChar, input: GetChar) -> Self {
        IoTable { output, input }
    }
}

// Keep these routines thin: generated code calls them on whatever stack
// parity the loop depth left behind.

/// Writes one byte to stdout.
pub(crate) extern "C" fn console_putchar(c: u32) -> u32 {
    let byte = c as u8;
    unsafe { libc::write(1, &byte as *const u8 as *const c_void, 1) };
    c
}

/// Reads one byte from stdin, blocking; end of input reads as 0.
pub(crate) extern "C" fn console_getchar() -> u32 {
    let mut byte = 0u8;
    match unsafe { libc::read(0, &mut byte as *mut u8 as *mut c_void, 1) } {
        1 => byte as u32,
        _ => 0,
    }
}
