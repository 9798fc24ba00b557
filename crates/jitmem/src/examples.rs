//! (only used in test cases)
//! Writes examples to memory

use crate::{ExecutableRegion, WritableRegion};

/// Writes a program equivalent to `fn(x: u32) -> u32 { x + 1 }` to the given
/// buffer.
///
/// # Panics
///
/// If the target architecture is not supported. Currently, only `x86_64` and
/// `aarch64` are supported.
pub fn write_increment_function(buffer: &mut [u8]) {
    let instructions: &[u8] = if cfg!(target_arch = "x86_64") {
        &[
            // lea eax, [rdi + 1]
            0x8D, 0x47, 0x01, //
            // ret
            0xC3,
        ]
    } else if cfg!(target_arch = "aarch64") {
        &[
            // add w0, w0, #1
            0x00, 0x04, 0x00, 0x11, //
            // ret
            0xC0, 0x03, 0x5F, 0xD6,
        ]
    } else {
        panic!("no program for arch")
    };

    buffer[0..instructions.len()].copy_from_slice(instructions);
}

/// Returns an [ExecutableRegion] with the program created by
/// [write_increment_function].
pub fn generate_increment_program() -> ExecutableRegion {
    let mut mem = WritableRegion::allocate(4096).unwrap();
    write_increment_function(&mut mem[..]);

    mem.into_executable().unwrap()
}
