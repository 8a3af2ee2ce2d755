//! An owned tree of GVariant values.
//!
//! The original's vararg reader/writer (`c_variant_readv`/`c_variant_writev`)
//! take a C `va_list`: a format string like `"u(s)a(ss)"` paired with a
//! matching run of untyped arguments pulled straight off the stack. Rust has
//! no safe analog to a `va_list` reachable from ordinary code, so
//! [`crate::vararg`] and [`crate::GVariant::readv`]/[`writev`] work against
//! this typed tree instead — one node per basic value or container, built or
//! walked alongside the signature string doing the actual driving.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use smallvec::SmallVec;

/// One GVariant value, fully decoded into owned memory.
///
/// Basic types carry their native Rust representation directly; strings
/// carry an owned, NUL-free `String` (the wire NUL terminator is purely a
/// framing detail, not part of the value). Containers nest further `Value`s.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Byte(u8),
    Bool(bool),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    Double(f64),
    String(String),
    ObjectPath(String),
    Signature(String),
    /// `Nothing` is `None`; `Just x` is `Some`.
    Maybe(Option<Box<Value>>),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
    /// Dict-entry (`{kv}`): exactly the pair, never a full map — building a
    /// map out of a stream of entries is left to the caller, same as the
    /// original never aggregates array-of-pair into anything but an array.
    Pair(Box<Value>, Box<Value>),
    /// A variant, carrying the embedded type signature of its payload
    /// alongside the payload itself.
    Variant(SmallVec<[u8; 32]>, Box<Value>),
}

impl Value {
    /// The element byte of this value's own type (the byte [`crate::reader`]
    /// and [`crate::writer`] expect as `basic`/`container`).
    pub fn element(&self) -> u8 {
        match self {
            Value::Byte(_) => b'y',
            Value::Bool(_) => b'b',
            Value::I16(_) => b'n',
            Value::U16(_) => b'q',
            Value::I32(_) => b'i',
            Value::U32(_) => b'u',
            Value::I64(_) => b'x',
            Value::U64(_) => b't',
            Value::Double(_) => b'd',
            Value::String(_) => b's',
            Value::ObjectPath(_) => b'o',
            Value::Signature(_) => b'g',
            Value::Maybe(_) => b'm',
            Value::Array(_) => b'a',
            Value::Tuple(_) => b'(',
            Value::Pair(..) => b'{',
            Value::Variant(..) => b'v',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn element_byte_matches_basic_types() {
        assert_eq!(Value::U32(0).element(), b'u');
        assert_eq!(Value::String("x".to_string()).element(), b's');
        assert_eq!(Value::Maybe(None).element(), b'm');
    }

    #[test]
    fn nested_tuple_is_structurally_comparable() {
        let a = Value::Tuple(Vec::from([Value::U32(1), Value::Bool(true)]));
        let b = Value::Tuple(Vec::from([Value::U32(1), Value::Bool(true)]));
        assert_eq!(a, b);
    }
}
