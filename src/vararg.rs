//! Drives a [`Value`] tree to/from a sealed or in-progress value, standing in
//! for the original's `c_variant_readv`/`c_variant_writev` (which walk a
//! format string alongside a C `va_list`).
//!
//! [`crate::reader`] and [`crate::writer`] already carry their own
//! type-string state (`Level::type_str`, `WriteLevel`'s internal type
//! string) — there's no second signature to walk here, just a recursive
//! descent that converts each type this crate's own state says comes next
//! into (or out of) a [`Value`] node. Recursion depth is bounded by
//! [`crate::MAX_VARG`] rather than carried as an explicit level stack: the
//! original needs a bounded stack because it has no call stack to spare
//! inside a format-string walker written in C without recursion helpers;
//! ordinary Rust recursion bounded by an explicit depth check is simpler and
//! just as safe for a walk this shallow.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::level::LevelStack;
use crate::reader::{self, Scalar};
use crate::value::Value;
use crate::vecs::VecArena;
use crate::writer::Writer;
use crate::MAX_VARG;

/// Reads the type expected next at the current level into a [`Value`],
/// recursing into containers.
pub fn read(arena: &VecArena, levels: &mut LevelStack) -> Result<Value> {
    read_at(arena, levels, 0)
}

fn read_at(arena: &VecArena, levels: &mut LevelStack, depth: usize) -> Result<Value> {
    if depth > MAX_VARG {
        return Err(Error::TooDeep);
    }

    let el = *levels
        .current()
        .type_str
        .first()
        .ok_or(Error::BadRequest)?;

    match el {
        b'y' => fixed(arena, levels, el).map(|b| Value::Byte(b[0])),
        b'b' => fixed(arena, levels, el).map(|b| Value::Bool(b.iter().any(|&x| x != 0))),
        b'n' => fixed(arena, levels, el).map(|b| Value::I16(i16::from_le_bytes([b[0], b[1]]))),
        b'q' => fixed(arena, levels, el).map(|b| Value::U16(u16::from_le_bytes([b[0], b[1]]))),
        b'i' => fixed(arena, levels, el)
            .map(|b| Value::I32(i32::from_le_bytes(b[..4].try_into().unwrap()))),
        b'u' => fixed(arena, levels, el)
            .map(|b| Value::U32(u32::from_le_bytes(b[..4].try_into().unwrap()))),
        b'x' => fixed(arena, levels, el)
            .map(|b| Value::I64(i64::from_le_bytes(b[..8].try_into().unwrap()))),
        b't' => fixed(arena, levels, el)
            .map(|b| Value::U64(u64::from_le_bytes(b[..8].try_into().unwrap()))),
        b'd' => fixed(arena, levels, el)
            .map(|b| Value::Double(f64::from_le_bytes(b[..8].try_into().unwrap()))),
        b's' => text(arena, levels, el).map(Value::String),
        b'o' => text(arena, levels, el).map(Value::ObjectPath),
        b'g' => text(arena, levels, el).map(Value::Signature),
        b'v' => {
            reader::enter_one(arena, levels, b'v')?;
            let ty = levels.current().type_str.clone();
            let inner = read_at(arena, levels, depth + 1)?;
            reader::exit_try(levels, b'v')?;
            Ok(Value::Variant(ty, Box::new(inner)))
        }
        b'm' => {
            reader::enter_one(arena, levels, b'm')?;
            let present = levels.current().index > 0;
            let inner = if present {
                Some(Box::new(read_at(arena, levels, depth + 1)?))
            } else {
                None
            };
            reader::exit_try(levels, b'm')?;
            Ok(Value::Maybe(inner))
        }
        b'a' => {
            reader::enter_one(arena, levels, b'a')?;
            let count = levels.current().index;
            let mut items = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                items.push(read_at(arena, levels, depth + 1)?);
            }
            reader::exit_try(levels, b'a')?;
            Ok(Value::Array(items))
        }
        b'(' => {
            reader::enter_one(arena, levels, b'(')?;
            let mut items = Vec::new();
            while !levels.current().type_str.is_empty() {
                items.push(read_at(arena, levels, depth + 1)?);
            }
            reader::exit_try(levels, b')')?;
            Ok(Value::Tuple(items))
        }
        b'{' => {
            reader::enter_one(arena, levels, b'{')?;
            let key = read_at(arena, levels, depth + 1)?;
            let val = read_at(arena, levels, depth + 1)?;
            reader::exit_try(levels, b'}')?;
            Ok(Value::Pair(Box::new(key), Box::new(val)))
        }
        _ => Err(Error::InvalidType),
    }
}

fn fixed(arena: &VecArena, levels: &mut LevelStack, el: u8) -> Result<[u8; 8]> {
    match reader::read_one(arena, levels, el)? {
        Scalar::Fixed { bytes, .. } => Ok(bytes),
        Scalar::Str(_) => Err(Error::Internal),
    }
}

fn text(arena: &VecArena, levels: &mut LevelStack, el: u8) -> Result<String> {
    match reader::read_one(arena, levels, el)? {
        Scalar::Str(s) => Ok(String::from_utf8_lossy(s).into_owned()),
        Scalar::Fixed { .. } => Err(Error::Internal),
    }
}

/// Writes a [`Value`] as the type expected next.
pub fn write(writer: &mut Writer, value: &Value) -> Result<()> {
    write_at(writer, value, 0)
}

fn write_at(writer: &mut Writer, value: &Value, depth: usize) -> Result<()> {
    if depth > MAX_VARG {
        return Err(Error::TooDeep);
    }

    match value {
        Value::Byte(b) => writer.append_basic(b'y', &[*b]),
        Value::Bool(b) => writer.append_basic(b'b', &[*b as u8]),
        Value::I16(v) => writer.append_basic(b'n', &v.to_le_bytes()),
        Value::U16(v) => writer.append_basic(b'q', &v.to_le_bytes()),
        Value::I32(v) => writer.append_basic(b'i', &v.to_le_bytes()),
        Value::U32(v) => writer.append_basic(b'u', &v.to_le_bytes()),
        Value::I64(v) => writer.append_basic(b'x', &v.to_le_bytes()),
        Value::U64(v) => writer.append_basic(b't', &v.to_le_bytes()),
        Value::Double(v) => writer.append_basic(b'd', &v.to_le_bytes()),
        Value::String(s) => write_text(writer, b's', s),
        Value::ObjectPath(s) => write_text(writer, b'o', s),
        Value::Signature(s) => write_text(writer, b'g', s),
        Value::Maybe(inner) => {
            writer.begin(b'm', None)?;
            if let Some(v) = inner {
                write_at(writer, v, depth + 1)?;
            }
            writer.end_try(b'm')
        }
        Value::Array(items) => {
            writer.begin(b'a', None)?;
            for item in items {
                write_at(writer, item, depth + 1)?;
            }
            writer.end_try(b'a')
        }
        Value::Tuple(items) => {
            writer.begin(b'(', None)?;
            for item in items {
                write_at(writer, item, depth + 1)?;
            }
            writer.end_try(b')')
        }
        Value::Pair(key, val) => {
            writer.begin(b'{', None)?;
            write_at(writer, key, depth + 1)?;
            write_at(writer, val, depth + 1)?;
            writer.end_try(b'}')
        }
        Value::Variant(ty, inner) => {
            writer.begin(b'v', Some(ty))?;
            write_at(writer, inner, depth + 1)?;
            writer.end_try(b'v')
        }
    }
}

fn write_text(writer: &mut Writer, el: u8, s: &str) -> Result<()> {
    let mut bytes = Vec::with_capacity(s.len() + 1);
    bytes.extend_from_slice(s.as_bytes());
    bytes.push(0);
    writer.append_basic(el, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use alloc::string::ToString;

    #[test]
    fn round_trips_tuple_through_value_tree() {
        let value = Value::Tuple(Vec::from([
            Value::U32(42),
            Value::String("hi".to_string()),
            Value::Array(Vec::from([Value::Byte(1), Value::Byte(2)])),
        ]));

        let mut w = Writer::new(b"(usay)").unwrap();
        write(&mut w, &value).unwrap();
        let arena = w.seal().unwrap();

        let mut levels = LevelStack::new(Level::root(arena.total_len(), b"(usay)", 0));
        let decoded = read(&arena, &mut levels).unwrap();

        assert_eq!(decoded, value);
    }

    #[test]
    fn round_trips_variant() {
        let value = Value::Variant(smallvec::SmallVec::from_slice(b"u"), Box::new(Value::U32(9)));

        let mut w = Writer::new(b"v").unwrap();
        write(&mut w, &value).unwrap();
        let arena = w.seal().unwrap();

        let mut levels = LevelStack::new(Level::root(arena.total_len(), b"v", 0));
        let decoded = read(&arena, &mut levels).unwrap();
        assert_eq!(decoded, value);
    }
}
