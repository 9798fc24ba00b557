//! Machine code injection for the current process.
//!
//! Memory comes out of `mmap(2)` with no access at all ([MappedRegion]).
//! Converting it to a [WritableRegion] lets code be copied in; converting
//! again to an [ExecutableRegion] trades write access for execute access.
//! A region is never writable and executable at the same time.

extern crate errno;
extern crate libc;

mod error;
mod executable_region;
mod mapped_region;
mod writable_region;

pub mod examples;

pub use crate::error::{MappingError, Result};
pub use crate::executable_region::ExecutableRegion;
pub use crate::mapped_region::MappedRegion;
pub use crate::writable_region::WritableRegion;

/// Casts an [ExecutableRegion] to a function of the given type.
///
/// # Safety
///
/// The region must hold valid machine code for the current architecture,
/// starting at offset zero and following the calling convention of
/// `$fn_type`.
#[macro_export]
macro_rules! as_function {
    ($region:expr, $fn_type:ty) => {
        std::mem::transmute::<*const u8, $fn_type>($region.addr())
    };
}
