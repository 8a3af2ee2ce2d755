//! Error taxonomy for this crate.
//!
//! Every fallible entry point returns one of these codes. The first error
//! produced on a [`crate::GVariant`] latches into its poison slot (see
//! [`crate::GVariant::return_poison`]) and is remembered for the value's
//! lifetime; later operations keep running but will usually keep failing.

use core::fmt;

/// Error codes returned by this crate's operations.
///
/// Malformed wire data never triggers undefined behavior: the reader
/// substitutes documented default values instead of surfacing most of these.
/// Only programming errors (wrong type at the cursor, writing past a seal,
/// exiting above the root, mutating the unit value) and the handful of hard
/// resource limits below are reported as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The type requested at the cursor does not match the type actually
    /// there, `exit` was called with no open container, or a mutating call
    /// was made on the unit value.
    BadRequest,
    /// A signature failed the type grammar, or an invalid container marker
    /// was used with `enter`/`exit`/`begin`/`end`.
    InvalidType,
    /// Nesting depth exceeded [`crate::MAX_DEPTH`].
    TooDeep,
    /// Signature length exceeded [`crate::MAX_SIGNATURE`].
    TooLong,
    /// Concatenated vector length overflows the native word, or a requested
    /// buffer allocation would overflow.
    TooBig,
    /// The iovec count for a single value would exceed the hard limit.
    OutOfBuffers,
    /// The allocator refused a request.
    OutOfMemory,
    /// A mutating operation was attempted on the unit (NULL) value.
    NotUnique,
    /// An internal invariant was violated. Always a bug.
    Internal,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest => write!(f, "type at cursor does not match requested operation"),
            Self::InvalidType => write!(f, "invalid GVariant type or signature"),
            Self::TooDeep => write!(f, "type nesting exceeds the maximum supported depth"),
            Self::TooLong => write!(f, "signature exceeds the maximum supported length"),
            Self::TooBig => write!(f, "value size overflows the native word"),
            Self::OutOfBuffers => write!(f, "too many backing vectors for one value"),
            Self::OutOfMemory => write!(f, "allocation failed"),
            Self::NotUnique => write!(f, "attempt to mutate the unit value"),
            Self::Internal => write!(f, "internal error (this is a bug)"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Convenience alias used throughout this crate.
pub type Result<T> = core::result::Result<T, Error>;
