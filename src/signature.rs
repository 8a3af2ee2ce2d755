//! The signature analyzer: an iterative, non-recursive parser of the
//! GVariant type grammar.
//!
//! ```text
//! TYPE  := basic | 'v' | '(' ')' | 'm' TYPE | 'a' TYPE | '(' TUPLE ')' | '{' PAIR '}'
//! TUPLE := TYPE | TYPE TUPLE
//! PAIR  := basic TYPE
//! ```
//!
//! [`signature_next`] parses exactly one top-level type from the head of a
//! byte string and reports how much of the input it consumed, so callers can
//! walk a tuple's children one at a time without ever recursing on the call
//! stack — nesting depth in GVariant is attacker-controlled, so the parser
//! has to be iterative to give cheap, bounded-stack rejection of malformed
//! input.

use crate::error::{Error, Result};
use crate::{MAX_DEPTH, MAX_SIGNATURE};
use smallvec::SmallVec;

/// Per-top-level-type result of [`signature_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    /// log2 of the byte alignment required by this type (0..=3).
    pub alignment: u8,
    /// Fixed size in bytes, or 0 if the type is variable-size.
    pub size: usize,
    /// For a `maybe`/`array` whose element is fixed-size, that element's
    /// size; 0 otherwise (including for non-bound types).
    pub bound_size: usize,
    /// Maximum container nesting encountered while parsing this type.
    pub depth: usize,
    /// Number of bytes consumed from the signature to parse this type.
    pub length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    /// Implicit closing of `m`/`a` by the next leaf.
    Bound,
    Tuple,
    PairFirst,
    PairSecond,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    state: FrameState,
    alignment: u8,
    /// Padding added when the container's span was speculatively 8-aligned
    /// on open; subtracted back out once the real alignment is known.
    aligned: usize,
}

fn align_to(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

/// Parses the leading GVariant type from `sig`.
///
/// Returns `Ok(None)` if `sig` is empty, `Ok(Some(info))` if a type was
/// parsed (use `info.length` to advance past it), or `Err` if the leading
/// bytes of `sig` do not form a valid type.
pub fn signature_next(sig: &[u8]) -> Result<Option<TypeInfo>> {
    if sig.len() > MAX_SIGNATURE {
        return Err(Error::TooLong);
    }

    let max_depth = MAX_DEPTH.min(sig.len());
    let mut stack: SmallVec<[Frame; 16]> = SmallVec::new();

    let mut state = Frame {
        state: FrameState::Tuple,
        alignment: 0,
        aligned: 0,
    };

    let mut size: usize = 0;
    let mut level: usize = 0;
    let mut known_level: usize = 0;
    let mut fixed_size = true;
    let mut end_of_pair = false;

    let mut i = 0usize;
    while i < sig.len() {
        let byte = sig[i];
        let el = crate::element::element(byte);

        if !el.is_real {
            return Err(Error::InvalidType);
        }

        let is_leaf;

        match byte {
            b'm' | b'a' | b'(' | b'{' => {
                if level >= max_depth {
                    return Err(Error::TooDeep);
                }
                if end_of_pair || matches!(state.state, FrameState::PairFirst) {
                    return Err(Error::InvalidType);
                }

                stack.push(state);
                level += 1;
                if level > known_level {
                    known_level = level;
                }

                state.state = match byte {
                    b'(' => FrameState::Tuple,
                    b'{' => FrameState::PairFirst,
                    _ => FrameState::Bound,
                };

                // The container's own alignment isn't known until it
                // closes, so speculatively align to the maximum (8) and
                // shift back down on close if possible.
                let t = align_to(size, 8);
                state.alignment = 0;
                state.aligned = t - size;
                size = t;

                is_leaf = false;
            }
            b')' | b'}' => {
                if byte == b')' {
                    if level == 0 {
                        return Err(Error::InvalidType);
                    }
                    if !matches!(state.state, FrameState::Tuple) {
                        return Err(Error::InvalidType);
                    }
                    if i > 0 && sig[i - 1] == b'(' {
                        // Unit type: fixed size of 1.
                        size += 1;
                    }
                } else {
                    if !end_of_pair {
                        return Err(Error::InvalidType);
                    }
                }

                if fixed_size {
                    size -= state.aligned & !((1usize << state.alignment) - 1);
                    size = align_to(size, 1usize << state.alignment);
                }

                let saved = stack.pop().ok_or(Error::InvalidType)?;
                level -= 1;
                let mut saved = saved;
                if state.alignment > saved.alignment {
                    saved.alignment = state.alignment;
                }
                state = saved;

                end_of_pair = false;
                is_leaf = true;
            }
            b'b' | b'y' | b'n' | b'q' | b'i' | b'u' | b'x' | b't' | b'h' | b'd' | b's' | b'o'
            | b'g' | b'v' => {
                if end_of_pair {
                    return Err(Error::InvalidType);
                }
                if matches!(state.state, FrameState::PairFirst) && !el.is_basic {
                    return Err(Error::InvalidType);
                }

                if !el.is_fixed {
                    fixed_size = false;
                }
                if el.alignment > state.alignment {
                    state.alignment = el.alignment;
                }
                if fixed_size {
                    size = align_to(size, 1usize << el.alignment);
                    size += 1usize << el.alignment;
                }

                is_leaf = true;
            }
            _ => return Err(Error::InvalidType),
        }

        if is_leaf {
            let mut bound_size = 0;

            while matches!(state.state, FrameState::Bound) {
                bound_size = if fixed_size { size } else { 0 };
                fixed_size = false;

                let saved = stack.pop().ok_or(Error::InvalidType)?;
                level -= 1;
                let mut saved = saved;
                if state.alignment > saved.alignment {
                    saved.alignment = state.alignment;
                }
                state = saved;
            }

            match state.state {
                FrameState::PairFirst => state.state = FrameState::PairSecond,
                FrameState::PairSecond => end_of_pair = true,
                _ => {}
            }

            if level == 0 {
                return Ok(Some(TypeInfo {
                    alignment: state.alignment,
                    size: if fixed_size { size } else { 0 },
                    bound_size,
                    depth: known_level,
                    length: i + 1,
                }));
            }
        }

        i += 1;
    }

    if i > 0 {
        return Err(Error::InvalidType);
    }

    Ok(None)
}

/// Parses `sig` as exactly one type, requiring that the parsed type consume
/// the entire input.
pub fn signature_one(sig: &[u8]) -> Result<TypeInfo> {
    match signature_next(sig)? {
        Some(info) if info.length == sig.len() => Ok(info),
        _ => Err(Error::InvalidType),
    }
}

/// Iterates over the top-level types of a signature (e.g. the children of a
/// tuple, with the surrounding brackets already stripped).
pub struct SignatureIter<'a> {
    remaining: &'a [u8],
}

impl<'a> SignatureIter<'a> {
    pub fn new(sig: &'a [u8]) -> Self {
        Self { remaining: sig }
    }
}

impl<'a> Iterator for SignatureIter<'a> {
    type Item = Result<(TypeInfo, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        match signature_next(self.remaining) {
            Ok(None) => None,
            Ok(Some(info)) => {
                let (head, tail) = self.remaining.split_at(info.length);
                self.remaining = tail;
                Some(Ok((info, head)))
            }
            Err(e) => {
                self.remaining = &[];
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next(sig: &str) -> Result<Option<TypeInfo>> {
        signature_next(sig.as_bytes())
    }

    #[test]
    fn empty_signature_is_empty() {
        assert_eq!(next("").unwrap(), None);
    }

    #[test]
    fn simple_basics() {
        let info = next("u").unwrap().unwrap();
        assert_eq!(info.alignment, 2);
        assert_eq!(info.size, 4);
        assert_eq!(info.length, 1);

        let info = next("x").unwrap().unwrap();
        assert_eq!(info.alignment, 3);
        assert_eq!(info.size, 8);
    }

    #[test]
    fn strings_are_variable() {
        let info = next("s").unwrap().unwrap();
        assert_eq!(info.size, 0);
        assert_eq!(info.alignment, 0);
    }

    #[test]
    fn unit_type_is_fixed_size_one() {
        let info = next("()").unwrap().unwrap();
        assert_eq!(info.size, 1);
        assert_eq!(info.alignment, 0);
        assert_eq!(info.length, 2);
    }

    #[test]
    fn only_parses_leading_type() {
        let info = next("uu").unwrap().unwrap();
        assert_eq!(info.length, 1);
    }

    #[test]
    fn known_invalid_signatures_fail() {
        for bad in ["A", "$", "{}", "{)", "{()y}", "{yyy}", "(", ")", "a", "m"] {
            let r = next(bad);
            assert!(r.is_err(), "expected {bad:?} to fail, got {r:?}");
        }
    }

    #[test]
    fn mama_is_valid_maybe_nesting() {
        // 'm' 'a' 'm' 'a' is four bound containers with no leaf: invalid,
        // since nothing ever closes them.
        assert!(next("mama").is_err());
    }

    #[test]
    fn nested_pair_in_dict_entry_is_invalid() {
        assert!(next("{mau}").is_err());
    }

    #[test]
    fn deep_but_well_formed_nesting_is_rejected_past_the_pair_rule() {
        assert!(next("(uu(u())uu{vu}uu)").is_err());
    }

    #[test]
    fn complex_nested_tuple() {
        let info = next("(u(u(u(u(u)u)u)u)u)").unwrap().unwrap();
        assert_eq!(info.alignment, 2);
        assert_eq!(info.size, 40);
        assert_eq!(info.depth, 4);
        assert_eq!(info.length, 19);
    }

    #[test]
    fn signature_one_requires_exact_match() {
        assert!(signature_one(b"uu").is_err());
        assert!(signature_one(b"u").is_ok());
    }

    #[test]
    fn too_long_signature_is_rejected() {
        let sig = vec![b'y'; crate::MAX_SIGNATURE + 1];
        assert_eq!(signature_next(&sig), Err(Error::TooLong));
    }

    #[test]
    fn too_deep_signature_is_rejected() {
        let mut sig = "a".repeat(crate::MAX_DEPTH + 1);
        sig.push('y');
        assert_eq!(signature_next(sig.as_bytes()), Err(Error::TooDeep));
    }

    #[test]
    fn never_reads_past_caller_supplied_length() {
        let sig = b"$foo";
        assert_eq!(signature_next(&sig[..0]).unwrap(), None);
    }

    #[test]
    fn signature_iter_walks_tuple_children() {
        let children: Vec<_> = SignatureIter::new(b"uasb")
            .map(|r| r.unwrap().1)
            .collect();
        assert_eq!(children, vec![&b"u"[..], b"as", b"b"]);
    }
}
