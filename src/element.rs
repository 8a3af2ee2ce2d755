//! The 256-entry element table.
//!
//! Every GVariant type string is built from single-byte elements. This
//! module answers, for any possible byte value, whether it is a valid
//! element and what its alignment/class is — the leaf table the signature
//! analyzer, reader, and writer all consult.

/// Per-byte facts about a GVariant type-string element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementInfo {
    /// log2 alignment in bytes (0..=3), meaningful only for fixed-size basics.
    pub alignment: u8,
    /// Whether this byte is recognized as a GVariant element at all.
    pub is_valid: bool,
    /// Whether this byte is allowed to appear in a real type string (the
    /// table also carries a few API-only markers — `r`/`e`/`?`/`*` — that
    /// are valid as *requests* but never appear in wire type strings).
    pub is_real: bool,
    /// Whether this element is a basic (non-container) type.
    pub is_basic: bool,
    /// Whether this element has a fixed wire size.
    pub is_fixed: bool,
}

const INVALID: ElementInfo = ElementInfo {
    alignment: 0,
    is_valid: false,
    is_real: false,
    is_basic: false,
    is_fixed: false,
};

const fn basic(alignment: u8, fixed: bool) -> ElementInfo {
    ElementInfo {
        alignment,
        is_valid: true,
        is_real: true,
        is_basic: true,
        is_fixed: fixed,
    }
}

const fn container(alignment: u8) -> ElementInfo {
    ElementInfo {
        alignment,
        is_valid: true,
        is_real: true,
        is_basic: false,
        is_fixed: false,
    }
}

const fn api_only() -> ElementInfo {
    ElementInfo {
        alignment: 0,
        is_valid: true,
        is_real: false,
        is_basic: false,
        is_fixed: false,
    }
}

const fn build() -> [ElementInfo; 256] {
    let mut table = [INVALID; 256];

    table[b'b' as usize] = basic(0, true); // bool
    table[b'y' as usize] = basic(0, true); // byte
    table[b'n' as usize] = basic(1, true); // int16
    table[b'q' as usize] = basic(1, true); // uint16
    table[b'i' as usize] = basic(2, true); // int32
    table[b'u' as usize] = basic(2, true); // uint32
    table[b'x' as usize] = basic(3, true); // int64
    table[b't' as usize] = basic(3, true); // uint64
    table[b'h' as usize] = basic(2, true); // handle, obsolete alias of u32
    table[b'd' as usize] = basic(3, true); // double
    table[b's' as usize] = basic(0, false); // string
    table[b'o' as usize] = basic(0, false); // object path
    table[b'g' as usize] = basic(0, false); // signature

    table[b'v' as usize] = container(3); // variant
    table[b'm' as usize] = container(0); // maybe
    table[b'a' as usize] = container(0); // array
    table[b'(' as usize] = container(0); // tuple open
    table[b')' as usize] = container(0); // tuple close
    table[b'{' as usize] = container(0); // pair open
    table[b'}' as usize] = container(0); // pair close

    table[b'r' as usize] = api_only(); // any tuple
    table[b'e' as usize] = api_only(); // any pair
    table[b'?' as usize] = api_only(); // any basic
    table[b'*' as usize] = api_only(); // any type

    table
}

/// The full 256-entry element table, indexed by raw byte value.
pub static ELEMENTS: [ElementInfo; 256] = build();

/// Looks up the element info for a raw byte. Always succeeds: bytes outside
/// the recognized set simply report `is_valid: false`.
#[inline]
pub fn element(byte: u8) -> ElementInfo {
    ELEMENTS[byte as usize]
}
