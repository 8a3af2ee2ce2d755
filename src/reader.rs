//! The reader: walks a sealed value's levels, resolving one type at a time
//! against its wire bytes.
//!
//! Every function here operates on a [`vecs::VecArena`] plus the current
//! [`level::LevelStack`] frame — there is no separate "reader" value: the
//! [`crate::GVariant`] façade simply calls these free functions with its own
//! state. This mirrors the original's `c_variant_peek`/`_advance`/
//! `_enter_one`/`_exit_one`/`_read_one`, which operate directly on `CVariant`
//! rather than a distinct cursor type.

use smallvec::SmallVec;

use crate::align_to;
use crate::element;
use crate::error::{Error, Result};
use crate::level::{Enclosing, Level, LevelStack};
use crate::signature::{self, TypeInfo};
use crate::vecs::VecArena;
use crate::word;

/// Result of [`peek`]: the parsed type, the byte span available to it
/// (`size`, possibly truncated to 0 for malformed framing), and the offset
/// (relative to the frame start) where the type ends.
#[derive(Debug, Clone, Copy)]
pub struct PeekInfo {
    pub info: TypeInfo,
    pub size: usize,
    pub end: usize,
}

/// Looks at the type expected next (`element`) without consuming it.
///
/// Aligns the current level's front cursor to the type's required
/// alignment (this is the one place `peek` mutates level state — the
/// actual consumption happens in [`advance`]). Resolves the type's byte
/// span per its enclosing container's framing rule; out-of-range or
/// malformed framing truncates `size` to 0 rather than erroring, so the
/// caller reads the documented default value instead.
///
/// If `want_front` is set, also returns a pointer to the type's bytes —
/// `None` if the bytes aren't available as one contiguous slice (forcing
/// the caller to fall back to the default value).
pub fn peek<'s>(
    arena: &'s VecArena,
    levels: &mut LevelStack,
    element: u8,
    want_front: bool,
) -> Result<(PeekInfo, Option<&'s [u8]>)> {
    let level = levels.current_mut();

    if level.type_str.is_empty() || level.type_str[0] != element || level.index == 0 {
        return Err(Error::BadRequest);
    }

    let info = signature::signature_next(&level.type_str)?.ok_or(Error::Internal)?;

    let aligned = align_to(level.offset, 1usize << info.alignment);
    level.front_off += aligned - level.offset;
    level.offset = aligned;

    let mut offset = aligned;
    if info.size > 0 {
        offset += info.size;
    } else {
        let wz = 1usize << level.wordsize;
        match level.enclosing {
            Enclosing::Variant => {
                offset = level.index - 1;
            }
            Enclosing::Maybe => {
                offset = level.size - 1;
            }
            Enclosing::Array => {
                let idx = (level.index - 1) * wz;
                let tail = arena.tail(level, idx);
                if wz <= tail.len() {
                    offset = word::load(&tail[tail.len() - wz..], level.wordsize) as usize;
                }
            }
            Enclosing::Root | Enclosing::Tuple | Enclosing::Pair => {
                let idx = (level.index - 1) * wz;
                if info.length == level.type_str.len() {
                    if idx <= level.size {
                        offset = level.size - idx;
                    }
                } else {
                    let tail = arena.tail(level, idx);
                    if wz <= tail.len() {
                        offset = word::load(&tail[tail.len() - wz..], level.wordsize) as usize;
                    }
                }
            }
        }
    }

    let size = if offset >= level.offset && offset <= level.size {
        offset - level.offset
    } else {
        0
    };

    let front = if want_front {
        let front_avail = arena.front(level);
        if size <= front_avail.len() {
            Some(&front_avail[..size])
        } else {
            None
        }
    } else {
        None
    };

    Ok((
        PeekInfo {
            info,
            size,
            end: offset,
        },
        front,
    ))
}

/// Consumes the type last returned by [`peek`], moving the front cursor to
/// `end` and updating the container-specific `index`/remaining type string.
pub fn advance(arena: &VecArena, levels: &mut LevelStack, info: &TypeInfo, end: usize) {
    let level = levels.current_mut();
    arena.jump(level, end);

    match level.enclosing {
        Enclosing::Maybe | Enclosing::Array => {
            level.index -= 1;
        }
        Enclosing::Root | Enclosing::Tuple | Enclosing::Pair => {
            if info.size == 0 {
                level.index += 1;
            }
            level.advance_type(info.length);
        }
        Enclosing::Variant => {
            level.advance_type(info.length);
        }
    }
}

/// Enters the container type expected next (`container` must be one of
/// `v`, `m`, `a`, `(`, `{`), pushing a new level for it.
pub fn enter_one(arena: &VecArena, levels: &mut LevelStack, container: u8) -> Result<()> {
    let (peek_info, _) = peek(arena, levels, container, false)?;
    let PeekInfo { info, size, end } = peek_info;

    let parent = levels.current().clone();
    let enclosing = Enclosing::from_open_byte(container).ok_or(Error::InvalidType)?;
    let wordsize = word::word_size(size, 0);

    let mut next = Level {
        size,
        tail_vec: parent.front_vec,
        tail_off: parent.front_off + size,
        wordsize,
        enclosing,
        type_str: SmallVec::new(),
        front_vec: parent.front_vec,
        front_off: parent.front_off,
        offset: 0,
        index: 0,
    };

    match enclosing {
        Enclosing::Variant => {
            let tail = arena.tail(&mut next, 0);
            let tail_size = tail.len();
            let mut i = 1usize;
            while i < tail_size && tail[tail_size - i - 1] != 0 {
                i += 1;
            }

            let mut resolved = false;
            if i < tail_size {
                let candidate = &tail[tail_size - i..tail_size];
                if signature::signature_one(candidate).is_ok() {
                    next.type_str = SmallVec::from_slice(candidate);
                    next.index = next.size - i;
                    resolved = true;
                }
            }
            if !resolved {
                // Unrecoverable variant tail (no type string, or an invalid
                // one): degrade to the unit type rather than error, per the
                // "variant recovery" default substitution rule.
                next.type_str = SmallVec::from_slice(b"()");
                next.index = 1;
            }
        }
        Enclosing::Maybe => {
            next.type_str = SmallVec::from_slice(&parent.type_str[1..info.length]);
            if size > 0 && (info.bound_size == 0 || info.bound_size == size) {
                next.index = 1;
            }
        }
        Enclosing::Array => {
            next.type_str = SmallVec::from_slice(&parent.type_str[1..info.length]);
            if info.bound_size > 0 {
                if size % info.bound_size == 0 {
                    next.index = size / info.bound_size;
                }
            } else {
                let tail = arena.tail(&mut next, 0);
                let tail_size = tail.len();
                let wz = 1usize << next.wordsize;
                if wz <= tail_size {
                    let offset = word::load(&tail[tail_size - wz..], next.wordsize) as usize;
                    if offset < size && (size - offset) % wz == 0 {
                        next.index = (size - offset) / wz;
                    }
                }
            }
        }
        Enclosing::Tuple | Enclosing::Pair => {
            next.type_str = SmallVec::from_slice(&parent.type_str[1..info.length - 1]);
            next.index = 1;
        }
        Enclosing::Root => return Err(Error::Internal),
    }

    advance(arena, levels, &info, end);
    levels.push(next);
    Ok(())
}

/// Exits the current container, returning to its parent level.
pub fn exit_one(levels: &mut LevelStack) -> Result<()> {
    levels.pop().map(|_| ()).ok_or(Error::BadRequest)
}

/// Exits the current container, requiring it to be `container`
/// (`v`, `m`, `a`, `)`, `}`).
pub fn exit_try(levels: &mut LevelStack, container: u8) -> Result<()> {
    let want = Enclosing::from_close_byte(container).ok_or(Error::InvalidType)?;
    if levels.current().enclosing != want {
        return Err(Error::BadRequest);
    }
    exit_one(levels)
}

/// A basic value read back from the wire, already defaulted if the
/// framing didn't check out.
#[derive(Debug, Clone, Copy)]
pub enum Scalar<'a> {
    /// Raw little-endian bytes for a fixed-size basic type; only the first
    /// `len` bytes are meaningful (1, 2, 4, or 8 depending on the type).
    Fixed { bytes: [u8; 8], len: usize },
    /// A string/path/signature value, with its trailing NUL already
    /// stripped. Empty on default (malformed or absent data), never `None`
    /// — strings always have a defined default ("").
    Str(&'a [u8]),
}

/// Reads one basic value (`basic` must be a non-container element byte),
/// substituting the type's default on malformed or out-of-range framing.
pub fn read_one<'s>(arena: &'s VecArena, levels: &mut LevelStack, basic: u8) -> Result<Scalar<'s>> {
    let (peek_info, front) = peek(arena, levels, basic, true)?;
    let PeekInfo { info, size, end } = peek_info;

    let el = element::element(basic);
    let value = if el.is_fixed {
        let mut bytes = [0u8; 8];
        if let Some(f) = front {
            bytes[..size].copy_from_slice(&f[..size]);
        }
        Scalar::Fixed { bytes, len: size }
    } else {
        let s: &[u8] = match front {
            Some(f) if size > 0 && f[size - 1] == 0 => &f[..size - 1],
            _ => &[],
        };
        Scalar::Str(s)
    };

    advance(arena, levels, &info, end);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vecs::Segment;

    fn arena_of(bytes: &'static [u8]) -> VecArena<'static> {
        let mut arena = VecArena::new();
        arena.push(Segment::Borrowed(bytes));
        arena
    }

    fn root_levels(size: usize, ty: &[u8]) -> LevelStack {
        LevelStack::new(Level::root(size, ty, word::word_size(size, 0)))
    }

    #[test]
    fn reads_fixed_u32() {
        let arena = arena_of(&[0x2a, 0, 0, 0]);
        let mut levels = root_levels(4, b"u");
        let Scalar::Fixed { bytes, len } = read_one(&arena, &mut levels, b'u').unwrap() else {
            panic!("expected fixed");
        };
        assert_eq!(len, 4);
        assert_eq!(u32::from_le_bytes(bytes[..4].try_into().unwrap()), 42);
    }

    #[test]
    fn reads_simple_string() {
        let arena = arena_of(b"hi\0");
        let mut levels = root_levels(3, b"s");
        let Scalar::Str(s) = read_one(&arena, &mut levels, b's').unwrap() else {
            panic!("expected str");
        };
        assert_eq!(s, b"hi");
    }

    #[test]
    fn malformed_string_defaults_to_empty() {
        // no trailing NUL: not a valid string frame.
        let arena = arena_of(b"hi");
        let mut levels = root_levels(2, b"s");
        let Scalar::Str(s) = read_one(&arena, &mut levels, b's').unwrap() else {
            panic!("expected str");
        };
        assert_eq!(s, b"");
    }

    #[test]
    fn wrong_type_at_cursor_is_bad_request() {
        let arena = arena_of(&[0u8; 4]);
        let mut levels = root_levels(4, b"u");
        assert_eq!(read_one(&arena, &mut levels, b's'), Err(Error::BadRequest));
    }

    #[test]
    fn enter_and_exit_tuple() {
        // "(u)" with u = 7
        let arena = arena_of(&[7, 0, 0, 0]);
        let mut levels = root_levels(4, b"(u)");
        enter_one(&arena, &mut levels, b'(').unwrap();
        let Scalar::Fixed { bytes, .. } = read_one(&arena, &mut levels, b'u').unwrap() else {
            panic!("expected fixed");
        };
        assert_eq!(u32::from_le_bytes(bytes[..4].try_into().unwrap()), 7);
        exit_try(&mut levels, b')').unwrap();
        assert!(levels.is_root());
    }

    #[test]
    fn exit_at_root_is_bad_request() {
        let mut levels = root_levels(0, b"");
        assert_eq!(exit_one(&mut levels), Err(Error::BadRequest));
    }

    #[test]
    fn array_of_fixed_elements() {
        // "au" with two elements: 1, 2
        let bytes = [1u8, 0, 0, 0, 2, 0, 0, 0];
        let arena = arena_of(&bytes);
        let mut levels = root_levels(8, b"au");
        enter_one(&arena, &mut levels, b'a').unwrap();
        let Scalar::Fixed { bytes: b1, .. } = read_one(&arena, &mut levels, b'u').unwrap() else {
            panic!()
        };
        assert_eq!(u32::from_le_bytes(b1[..4].try_into().unwrap()), 1);
        let Scalar::Fixed { bytes: b2, .. } = read_one(&arena, &mut levels, b'u').unwrap() else {
            panic!()
        };
        assert_eq!(u32::from_le_bytes(b2[..4].try_into().unwrap()), 2);
    }
}
