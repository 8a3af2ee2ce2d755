//! A zero-copy, scatter/gather codec for the GVariant binary serialization
//! format.
//!
//! A [`GVariant`] is either being written (basic types and containers
//! appended left to right) or, once [`GVariant::seal`]ed, read back
//! (entered/exited/peeked in the same order). The wire format never needs
//! the whole value to live in one contiguous buffer: both directions work
//! over an ordered list of borrowed-or-owned byte segments (see
//! [`vecs::VecArena`]), so large values can be built or consumed without a
//! single big copy.
//!
//! ```text
//! let mut v = GVariant::new(b"(us)").unwrap();
//! v.write_u32(7).unwrap();
//! v.write_string("hello").unwrap();
//! let v = v.seal();
//! ```
//!
//! Malformed or truncated input is never undefined behavior: readers
//! substitute the documented default value (zero, empty string, `Nothing`)
//! for anything that doesn't fit the framing the type expects.

#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod element;
pub mod error;
pub mod level;
pub mod reader;
pub mod signature;
pub mod value;
pub mod vararg;
pub mod variant;
pub mod vecs;
pub mod word;
pub mod writer;

pub use error::{Error, Result};
pub use value::Value;
pub use variant::GVariant;

/// Maximum container nesting depth a signature or a value may reach.
///
/// Matches `C_VARIANT_MAX_LEVEL (255)`: deep enough for any real-world
/// type, shallow enough that walking it never threatens the call stack
/// even though the parser itself is iterative.
pub const MAX_DEPTH: usize = 255;

/// Maximum byte length of a single signature string.
///
/// Matches `C_VARIANT_MAX_SIGNATURE (65535)`.
pub const MAX_SIGNATURE: usize = 65535;

/// Maximum nesting depth the vararg iterator (`readv`/`writev`) supports.
///
/// Matches `C_VARIANT_MAX_VARG`; independent of `MAX_DEPTH` because a
/// vararg signature walk and a value's own container depth are bounded by
/// different call sites.
pub const MAX_VARG: usize = 16;

/// Levels kept inline in a [`level::LevelStack`] before it spills to the
/// heap. Matches `C_VARIANT_MAX_INLINE_LEVELS`.
pub const MAX_INLINE_LEVELS: usize = 16;

/// Maximum number of backing vector segments a single value may have.
///
/// Matches `C_VARIANT_MAX_VECS`; enforced by [`variant::GVariant::new_from_vecs`].
pub const MAX_VECS: usize = 65535;

/// Rounds `value` up to the next multiple of `alignment`, which must be a
/// power of two.
#[inline]
pub(crate) fn align_to(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}
