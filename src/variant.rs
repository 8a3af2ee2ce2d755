//! The public façade tying the reader, writer, and vararg tree together into
//! one value that is either still being written or sealed and readable.
//!
//! The original keeps one `CVariant` struct for both states, flipping a
//! `sealed` flag once `c_variant_seal` runs. Rust's ownership makes an
//! explicit two-state enum a better fit than a runtime flag guarding which
//! fields are valid — `seal` consumes the writing value and returns a sealed
//! one rather than mutating in place, so a stale writer handle can't survive
//! past the point its buffers were taken over by the arena.
//!
//! Every fallible method latches its first error into a poison slot, mirroring
//! the original's convention of a `CVariant` remembering the first error any
//! operation on it produced (see `error.rs`): once poisoned, further calls
//! keep returning that same error rather than attempting more work.

use alloc::vec::Vec;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::level::{Enclosing, Level, LevelStack};
use crate::reader;
use crate::signature;
use crate::vararg;
use crate::value::Value;
use crate::vecs::{Segment, VecArena};
use crate::word;
use crate::writer::Writer;

/// One GVariant value, either still accepting writes or sealed and ready to
/// be read back.
pub enum GVariant<'a> {
    Writing {
        writer: Writer<'a>,
        root_type: SmallVec<[u8; 32]>,
        poison: Option<Error>,
    },
    Sealed {
        arena: VecArena<'a>,
        levels: LevelStack,
        root_type: SmallVec<[u8; 32]>,
        poison: Option<Error>,
    },
}

impl<'a> GVariant<'a> {
    /// Starts a new value of the given root type, ready to be written.
    pub fn new(root_type: &[u8]) -> Result<Self> {
        let writer = Writer::new(root_type)?;
        Ok(GVariant::Writing {
            writer,
            root_type: SmallVec::from_slice(root_type),
            poison: None,
        })
    }

    /// Wraps already-serialized segments as a sealed value, without
    /// re-parsing or copying them.
    pub fn new_from_vecs(root_type: &[u8], segments: Vec<Segment<'a>>) -> Result<Self> {
        signature::signature_one(root_type)?;

        if segments.len() > crate::MAX_VECS {
            return Err(Error::OutOfBuffers);
        }

        let mut arena = VecArena::new();
        for seg in segments {
            arena.push(seg);
        }
        let total = arena.checked_total_len().ok_or(Error::TooBig)?;
        let levels = LevelStack::new(Level::root(total, root_type, word::word_size(total, 0)));

        Ok(GVariant::Sealed {
            arena,
            levels,
            root_type: SmallVec::from_slice(root_type),
            poison: None,
        })
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self, GVariant::Sealed { .. })
    }

    /// The first error latched by any operation on this value, if any.
    pub fn return_poison(&self) -> Option<Error> {
        match self {
            GVariant::Writing { poison, .. } | GVariant::Sealed { poison, .. } => *poison,
        }
    }

    /// The backing segments, once sealed.
    pub fn get_vecs(&self) -> Option<&VecArena<'a>> {
        match self {
            GVariant::Sealed { arena, .. } => Some(arena),
            GVariant::Writing { .. } => None,
        }
    }

    fn check_poison(&self) -> Result<()> {
        match self.return_poison() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Records `result`'s error as this value's poison, if it isn't already
    /// poisoned, then returns `result` unchanged.
    fn latch<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = result {
            let slot = match self {
                GVariant::Writing { poison, .. } | GVariant::Sealed { poison, .. } => poison,
            };
            if slot.is_none() {
                *slot = Some(e);
            }
        }
        result
    }

    /// Finishes writing, closing any still-open containers, and returns the
    /// sealed, readable value.
    pub fn seal(self) -> Result<Self> {
        match self {
            GVariant::Sealed { .. } => Ok(self),
            GVariant::Writing {
                writer,
                root_type,
                poison,
            } => {
                if let Some(e) = poison {
                    return Err(e);
                }
                let arena = writer.seal()?;
                let total = arena.total_len();
                let levels =
                    LevelStack::new(Level::root(total, &root_type, word::word_size(total, 0)));
                Ok(GVariant::Sealed {
                    arena,
                    levels,
                    root_type,
                    poison: None,
                })
            }
        }
    }

    /// Resets the read cursor back to the root level, for re-reading a
    /// sealed value from the start.
    pub fn rewind(&mut self) -> Result<()> {
        self.check_poison()?;
        match self {
            GVariant::Sealed {
                arena,
                levels,
                root_type,
                ..
            } => {
                let total = arena.total_len();
                levels.reset_to_root(Level::root(total, root_type, word::word_size(total, 0)));
                Ok(())
            }
            GVariant::Writing { .. } => Err(Error::BadRequest),
        }
    }

    /// The element byte of the type expected next at the current level, or
    /// `None` once the current container is exhausted.
    pub fn peek_type(&self) -> Result<Option<u8>> {
        self.check_poison()?;
        match self {
            GVariant::Sealed { levels, .. } => Ok(levels.current().type_str.first().copied()),
            GVariant::Writing { .. } => Err(Error::BadRequest),
        }
    }

    /// The number of elements remaining to be read at the current level.
    pub fn peek_count(&self) -> Result<usize> {
        self.check_poison()?;
        let levels = match self {
            GVariant::Sealed { levels, .. } => levels,
            GVariant::Writing { .. } => return Err(Error::BadRequest),
        };
        let level = levels.current();
        match level.enclosing {
            // `index` means "remaining element count" only for array/maybe;
            // for a variant it's an internal byte offset into its tail, not
            // a count, so it falls under the "everything else" rule below.
            Enclosing::Array | Enclosing::Maybe => Ok(level.index),
            Enclosing::Root | Enclosing::Tuple | Enclosing::Pair | Enclosing::Variant => {
                Ok(if level.type_str.is_empty() { 0 } else { 1 })
            }
        }
    }

    /// Enters the container type expected next.
    pub fn enter(&mut self, container: u8) -> Result<()> {
        self.check_poison()?;
        let result = match self {
            GVariant::Sealed { arena, levels, .. } => reader::enter_one(arena, levels, container),
            GVariant::Writing { .. } => Err(Error::BadRequest),
        };
        self.latch(result)
    }

    /// Exits the current container.
    pub fn exit(&mut self) -> Result<()> {
        self.check_poison()?;
        let result = match self {
            GVariant::Sealed { levels, .. } => reader::exit_one(levels),
            GVariant::Writing { .. } => Err(Error::BadRequest),
        };
        self.latch(result)
    }

    /// Exits the current container, requiring it to be `container`.
    pub fn exit_try(&mut self, container: u8) -> Result<()> {
        self.check_poison()?;
        let result = match self {
            GVariant::Sealed { levels, .. } => reader::exit_try(levels, container),
            GVariant::Writing { .. } => Err(Error::BadRequest),
        };
        self.latch(result)
    }

    /// Reads the type expected next into an owned [`Value`], recursing into
    /// containers.
    pub fn readv(&mut self) -> Result<Value> {
        self.check_poison()?;
        let result = match self {
            GVariant::Sealed { arena, levels, .. } => vararg::read(arena, levels),
            GVariant::Writing { .. } => Err(Error::BadRequest),
        };
        self.latch(result)
    }

    /// Writes a [`Value`] as the type expected next.
    pub fn writev(&mut self, value: &Value) -> Result<()> {
        self.check_poison()?;
        let result = match self {
            GVariant::Writing { writer, .. } => vararg::write(writer, value),
            GVariant::Sealed { .. } => Err(Error::BadRequest),
        };
        self.latch(result)
    }

    /// Writes one basic value.
    pub fn append_basic(&mut self, basic: u8, bytes: &[u8]) -> Result<()> {
        self.check_poison()?;
        let result = match self {
            GVariant::Writing { writer, .. } => writer.append_basic(basic, bytes),
            GVariant::Sealed { .. } => Err(Error::BadRequest),
        };
        self.latch(result)
    }

    /// Begins a new container.
    pub fn begin(&mut self, container: u8, variant_type: Option<&[u8]>) -> Result<()> {
        self.check_poison()?;
        let result = match self {
            GVariant::Writing { writer, .. } => writer.begin(container, variant_type),
            GVariant::Sealed { .. } => Err(Error::BadRequest),
        };
        self.latch(result)
    }

    /// Ends the current container, requiring it to be `container`.
    pub fn end(&mut self, container: u8) -> Result<()> {
        self.check_poison()?;
        let result = match self {
            GVariant::Writing { writer, .. } => writer.end_try(container),
            GVariant::Sealed { .. } => Err(Error::BadRequest),
        };
        self.latch(result)
    }

    /// Splices pre-serialized segments in directly as the value expected
    /// next, without copying.
    pub fn insert(&mut self, ty: &[u8], segments: Vec<Segment<'a>>) -> Result<()> {
        self.check_poison()?;
        let result = match self {
            GVariant::Writing { writer, .. } => writer.insert(ty, segments),
            GVariant::Sealed { .. } => Err(Error::BadRequest),
        };
        self.latch(result)
    }
}

/// A `None` reference stands in for the unit type `()`, per the original's
/// "NULL is accepted and treated as `()`" convention: readers see the
/// empty-tuple default, any call that would mutate a unit value into
/// something else fails with [`Error::NotUnique`] instead.
pub fn unit_peek_count(v: Option<&GVariant>) -> Result<usize> {
    match v {
        Some(gv) => gv.peek_count(),
        None => Ok(0),
    }
}

pub fn unit_peek_type(v: Option<&GVariant>) -> Result<Option<u8>> {
    match v {
        Some(gv) => gv.peek_type(),
        None => Ok(None),
    }
}

pub fn unit_readv(v: Option<&mut GVariant>) -> Result<Value> {
    match v {
        Some(gv) => gv.readv(),
        None => Ok(Value::Tuple(Vec::new())),
    }
}

pub fn unit_writev(v: Option<&mut GVariant>, value: &Value) -> Result<()> {
    match v {
        Some(gv) => gv.writev(value),
        None => Err(Error::NotUnique),
    }
}

pub fn unit_begin(
    v: Option<&mut GVariant>,
    container: u8,
    variant_type: Option<&[u8]>,
) -> Result<()> {
    match v {
        Some(gv) => gv.begin(container, variant_type),
        None => Err(Error::NotUnique),
    }
}

pub fn unit_append_basic(v: Option<&mut GVariant>, basic: u8, bytes: &[u8]) -> Result<()> {
    match v {
        Some(gv) => gv.append_basic(basic, bytes),
        None => Err(Error::NotUnique),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn writes_then_reads_back_through_values() {
        let mut v = GVariant::new(b"(us)").unwrap();
        v.begin(b'(', None).unwrap();
        v.writev(&Value::U32(7)).unwrap();
        v.writev(&Value::String("hi".to_string())).unwrap();
        v.end(b')').unwrap();
        let mut sealed = v.seal().unwrap();
        assert!(sealed.is_sealed());

        sealed.enter(b'(').unwrap();
        assert_eq!(sealed.peek_count().unwrap(), 1);
        assert_eq!(sealed.readv().unwrap(), Value::U32(7));
        assert_eq!(
            sealed.readv().unwrap(),
            Value::String("hi".to_string())
        );
        sealed.exit_try(b')').unwrap();
    }

    #[test]
    fn wraps_preserialized_segments_without_copying() {
        let bytes: &[u8] = &[9, 0, 0, 0];
        let mut v = GVariant::new_from_vecs(b"u", vec![Segment::Borrowed(bytes)]).unwrap();
        assert_eq!(v.readv().unwrap(), Value::U32(9));
    }

    #[test]
    fn new_from_vecs_rejects_too_many_segments() {
        let one: &[u8] = &[0];
        let segments = (0..=crate::MAX_VECS)
            .map(|_| Segment::Borrowed(one))
            .collect();
        assert_eq!(
            GVariant::new_from_vecs(b"y", segments).unwrap_err(),
            Error::OutOfBuffers
        );
    }

    #[test]
    fn poison_latches_and_sticks() {
        let mut v = GVariant::new(b"u").unwrap();
        assert_eq!(v.append_basic(b's', b"x\0"), Err(Error::BadRequest));
        assert_eq!(v.return_poison(), Some(Error::BadRequest));
        // still poisoned even for an otherwise-valid call
        assert_eq!(v.append_basic(b'u', &1u32.to_le_bytes()), Err(Error::BadRequest));
    }

    #[test]
    fn rewind_allows_rereading_a_sealed_value() {
        let mut v = GVariant::new(b"u").unwrap();
        v.append_basic(b'u', &5u32.to_le_bytes()).unwrap();
        let mut sealed = v.seal().unwrap();

        assert_eq!(sealed.readv().unwrap(), Value::U32(5));
        sealed.rewind().unwrap();
        assert_eq!(sealed.readv().unwrap(), Value::U32(5));
    }

    #[test]
    fn unit_free_functions_treat_none_as_the_unit_type() {
        assert_eq!(unit_peek_count(None).unwrap(), 0);
        assert_eq!(unit_peek_type(None).unwrap(), None);
        assert_eq!(unit_readv(None).unwrap(), Value::Tuple(Vec::new()));
        assert_eq!(
            unit_writev(None, &Value::U32(1)),
            Err(Error::NotUnique)
        );
        assert_eq!(unit_begin(None, b'(', None), Err(Error::NotUnique));
        assert_eq!(
            unit_append_basic(None, b'u', &1u32.to_le_bytes()),
            Err(Error::NotUnique)
        );
    }

    #[test]
    fn unit_free_functions_forward_to_a_real_value() {
        let mut v = GVariant::new(b"u").unwrap();
        unit_append_basic(Some(&mut v), b'u', &5u32.to_le_bytes()).unwrap();
        let mut sealed = v.seal().unwrap();
        assert_eq!(unit_peek_type(Some(&sealed)).unwrap(), Some(b'u'));
        assert_eq!(unit_readv(Some(&mut sealed)).unwrap(), Value::U32(5));
    }
}
