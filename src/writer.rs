//! The writer: serializes basic values and containers left to right into a
//! growing buffer, reserving framing-offset slots ahead of time and filling
//! them in once each container's final size is known.
//!
//! The original keeps one buffer split into a front half (growing forward,
//! holding real data) and a tail half (growing backward, holding scratch
//! framing-offset words later compacted and copied to their final position).
//! That split exists to avoid moving already-written bytes as more space is
//! reserved — a concern for a C `realloc`-based allocator, not for a `Vec`,
//! which already amortizes growth. This module instead keeps one
//! monotonically growing `trunk`, and treats framing-offset slots as plain
//! `usize` placeholders recorded per level, written into the trunk as the
//! real offsets become known at [`Writer::end`]/[`Writer::seal`]. The
//! two-stage nature (reserve now, fill in later) is the same; only the
//! storage is simplified to ordinary owned memory instead of C pointer
//! arithmetic over two growing halves.

use alloc::vec::Vec;
use smallvec::SmallVec;

use crate::align_to;
use crate::error::{Error, Result};
use crate::level::Enclosing;
use crate::signature::{self, TypeInfo};
use crate::vecs::{Segment, VecArena};
use crate::word;
use crate::MAX_INLINE_LEVELS;

struct WriteLevel {
    /// Absolute byte position (across the whole value, not just the
    /// current trunk) where this level's payload begins.
    start: usize,
    enclosing: Enclosing,
    /// Remaining type string for this level, owned inline — see the
    /// matching note on `level::Level`.
    type_str: SmallVec<[u8; 32]>,
    /// Container-specific counter: for arrays/tuples/pairs, the number of
    /// recorded framing-offset slots; for maybes, 1 once a dynamic payload
    /// has been written, else 0.
    index: usize,
    /// Recorded end offsets (relative to `start`) for children that need a
    /// framing-offset slot, in append order.
    child_ends: Vec<usize>,
    /// For a variant level: the embedded type string to append after the
    /// payload once the variant closes.
    variant_type_tail: SmallVec<[u8; 32]>,
    /// This level's own `TypeInfo`, as its parent saw it when this level
    /// was opened (`size > 0` means this level is fixed-size).
    closing_info: TypeInfo,
    /// Index into the parent's `child_ends` reserved for this level, if
    /// the parent needed a framing slot for it.
    parent_reservation: Option<usize>,
}

/// Serializes one value into an arena of byte segments.
///
/// `Writer<'a>` owns its levels and scratch state directly; there's no
/// separate cursor type the way [`crate::reader`] is a set of free
/// functions over borrowed state — a writer's bookkeeping (the open trunk,
/// the framing-offset reservations) doesn't make sense to thread through
/// call sites piecemeal the way a reader's does.
pub struct Writer<'a> {
    arena: VecArena<'a>,
    trunk: Vec<u8>,
    /// Total length of everything already flushed into `arena` (i.e. not
    /// part of `trunk`). `base + trunk.len()` is the absolute write
    /// position.
    base: usize,
    levels: SmallVec<[WriteLevel; MAX_INLINE_LEVELS]>,
}

impl<'a> Writer<'a> {
    /// Starts a new value of the given root type (must parse as exactly
    /// one type).
    pub fn new(root_type: &[u8]) -> Result<Self> {
        let info = signature::signature_one(root_type)?;

        let root = WriteLevel {
            start: 0,
            enclosing: Enclosing::Root,
            type_str: SmallVec::from_slice(root_type),
            index: 0,
            child_ends: Vec::new(),
            variant_type_tail: SmallVec::new(),
            closing_info: info,
            parent_reservation: None,
        };

        let mut levels = SmallVec::new();
        levels.push(root);

        Ok(Writer {
            arena: VecArena::new(),
            trunk: Vec::new(),
            base: 0,
            levels,
        })
    }

    fn current(&self) -> &WriteLevel {
        self.levels.last().expect("writer level stack is never empty")
    }

    fn current_mut(&mut self) -> &mut WriteLevel {
        self.levels
            .last_mut()
            .expect("writer level stack is never empty")
    }

    #[inline]
    fn pos(&self) -> usize {
        self.base + self.trunk.len()
    }

    fn align(&mut self, alignment: u8) {
        let target = align_to(self.pos(), 1usize << alignment) - self.base;
        if target > self.trunk.len() {
            self.trunk.resize(target, 0);
        }
    }

    /// Parses the type expected next at the current level.
    fn next_type(&self) -> Result<(u8, TypeInfo)> {
        let level = self.current();
        if level.type_str.is_empty() {
            return Err(Error::BadRequest);
        }
        let info = signature::signature_next(&level.type_str)?.ok_or(Error::Internal)?;
        Ok((level.type_str[0], info))
    }

    /// Aligns the trunk for `info` and, if this child needs a
    /// framing-offset slot, reserves one in the current level.
    fn reserve_frame(&mut self, info: &TypeInfo) -> Option<usize> {
        self.align(info.alignment);

        let level = self.current();
        let need_frame = match level.enclosing {
            Enclosing::Root | Enclosing::Tuple | Enclosing::Pair => {
                // The last child of a tuple/pair never gets a frame: its
                // end is implicitly the container's own end.
                info.length < level.type_str.len() && info.size == 0
            }
            Enclosing::Array => info.size == 0,
            Enclosing::Maybe | Enclosing::Variant => false,
        };

        if need_frame {
            let level = self.current_mut();
            level.child_ends.push(0);
            Some(level.child_ends.len() - 1)
        } else {
            None
        }
    }

    /// Finishes a child (basic value or just-closed container): records its
    /// real end offset into its reservation, if any, and advances the
    /// level's index/remaining type string.
    fn finish_child(&mut self, info: &TypeInfo, reservation: Option<usize>) {
        let end = self.pos();
        let level = self.current_mut();
        let rel_end = end - level.start;

        if let Some(idx) = reservation {
            level.child_ends[idx] = rel_end;
            level.index += 1;
        }

        match level.enclosing {
            Enclosing::Array => {}
            Enclosing::Maybe => {
                if info.size == 0 {
                    level.index += 1;
                }
                level.advance_type_by(info.length);
            }
            Enclosing::Root | Enclosing::Tuple | Enclosing::Pair | Enclosing::Variant => {
                level.advance_type_by(info.length);
            }
        }
    }

    /// Writes this level's own trailer (framing-offset table, variant type
    /// tail, or maybe marker byte) and, if it's fixed-size, pads it out to
    /// its exact predetermined length.
    fn finalize_level(&mut self) -> Result<()> {
        let payload_len = self.pos() - self.current().start;

        match self.current().enclosing {
            Enclosing::Variant => {
                self.trunk.push(0);
                let tail = self.current().variant_type_tail.clone();
                self.trunk.extend_from_slice(&tail);
            }
            Enclosing::Maybe => {
                if self.current().index > 0 {
                    self.trunk.push(0);
                }
            }
            Enclosing::Array => {
                let level = self.current();
                if !level.child_ends.is_empty() {
                    let wz = word::word_size(payload_len, level.child_ends.len());
                    let ends = level.child_ends.clone();
                    for off in ends {
                        let mut buf = [0u8; 8];
                        word::store(&mut buf, wz, off as u64);
                        self.trunk.extend_from_slice(&buf[..1usize << wz]);
                    }
                }
            }
            Enclosing::Tuple | Enclosing::Pair | Enclosing::Root => {
                // Unlike an array's table, a tuple/pair's reader walks this
                // table from the container's end inward as it consumes
                // fields front-to-back, so the *first* recorded frame must
                // end up physically *last* (closest to the container end).
                let level = self.current();
                if !level.child_ends.is_empty() {
                    let wz = word::word_size(payload_len, level.child_ends.len());
                    let ends = level.child_ends.clone();
                    for off in ends.into_iter().rev() {
                        let mut buf = [0u8; 8];
                        word::store(&mut buf, wz, off as u64);
                        self.trunk.extend_from_slice(&buf[..1usize << wz]);
                    }
                }
            }
        }

        let level = self.current();
        if level.closing_info.size > 0 {
            let target = level.start + level.closing_info.size - self.base;
            if target < self.trunk.len() {
                return Err(Error::Internal);
            }
            self.trunk.resize(target, 0);
        }

        Ok(())
    }

    /// Writes one basic value. `bytes` must be exactly the type's fixed
    /// size for fixed types, or the value's bytes plus a trailing NUL for
    /// strings/paths/signatures.
    pub fn append_basic(&mut self, basic: u8, bytes: &[u8]) -> Result<()> {
        let (el, info) = self.next_type()?;
        if el != basic {
            return Err(Error::BadRequest);
        }
        if info.size > 0 && bytes.len() != info.size {
            return Err(Error::BadRequest);
        }

        let reservation = self.reserve_frame(&info);
        self.trunk.extend_from_slice(bytes);
        self.finish_child(&info, reservation);
        Ok(())
    }

    /// Begins a new container (`v`, `m`, `a`, `(`, or `{`). `variant_type`
    /// must be `Some` exactly when `container == b'v'`.
    pub fn begin(&mut self, container: u8, variant_type: Option<&[u8]>) -> Result<()> {
        let (el, info) = self.next_type()?;
        if el != container {
            return Err(Error::BadRequest);
        }
        let enclosing = Enclosing::from_open_byte(container).ok_or(Error::InvalidType)?;

        let reservation = self.reserve_frame(&info);
        let parent_type_str = self.current().type_str.clone();
        let start = self.pos();

        let mut child_type_str: SmallVec<[u8; 32]> = SmallVec::new();
        let mut variant_type_tail: SmallVec<[u8; 32]> = SmallVec::new();

        match enclosing {
            Enclosing::Variant => {
                let vt = variant_type.ok_or(Error::BadRequest)?;
                signature::signature_one(vt)?;
                child_type_str = SmallVec::from_slice(vt);
                variant_type_tail = SmallVec::from_slice(vt);
            }
            Enclosing::Maybe | Enclosing::Array => {
                child_type_str = SmallVec::from_slice(&parent_type_str[1..info.length]);
            }
            Enclosing::Tuple | Enclosing::Pair => {
                child_type_str = SmallVec::from_slice(&parent_type_str[1..info.length - 1]);
            }
            Enclosing::Root => return Err(Error::Internal),
        }

        self.levels.push(WriteLevel {
            start,
            enclosing,
            type_str: child_type_str,
            index: 0,
            child_ends: Vec::new(),
            variant_type_tail,
            closing_info: info,
            parent_reservation: reservation,
        });

        Ok(())
    }

    /// Ends the current container, returning to its parent.
    pub fn end(&mut self) -> Result<()> {
        if self.levels.len() < 2 {
            return Err(Error::BadRequest);
        }
        self.finalize_level()?;
        let level = self.levels.pop().expect("checked len above");
        self.finish_child(&level.closing_info, level.parent_reservation);
        Ok(())
    }

    /// Ends the current container, requiring it to be `container`
    /// (`v`, `m`, `a`, `)`, `}`).
    pub fn end_try(&mut self, container: u8) -> Result<()> {
        let want = Enclosing::from_close_byte(container).ok_or(Error::InvalidType)?;
        if self.current().enclosing != want {
            return Err(Error::BadRequest);
        }
        self.end()
    }

    /// Splices pre-serialized `segments` in directly, without copying, as
    /// the value for the type expected next. `ty` must match that type
    /// exactly; the segments' total length must match a fixed type's size.
    pub fn insert(&mut self, ty: &[u8], segments: Vec<Segment<'a>>) -> Result<()> {
        let (el, info) = self.next_type()?;
        if ty.is_empty() || el != ty[0] {
            return Err(Error::BadRequest);
        }
        if ty.len() != info.length || ty != &self.current().type_str[..info.length] {
            return Err(Error::BadRequest);
        }

        let size: usize = segments.iter().map(Segment::len).sum();
        if info.size > 0 && size != info.size {
            return Err(Error::BadRequest);
        }

        let reservation = self.reserve_frame(&info);

        let flushed = core::mem::take(&mut self.trunk);
        self.base += flushed.len();
        if !flushed.is_empty() {
            self.arena.push(Segment::Owned(flushed));
        }
        for seg in segments {
            self.arena.push(seg);
        }
        self.base += size;

        self.finish_child(&info, reservation);
        Ok(())
    }

    /// Closes every open container and returns the finished value as an
    /// arena of segments, ready to be read back.
    pub fn seal(mut self) -> Result<VecArena<'a>> {
        while self.levels.len() > 1 {
            self.end()?;
        }
        self.finalize_level()?;

        let trunk = core::mem::take(&mut self.trunk);
        if !trunk.is_empty() {
            self.arena.push(Segment::Owned(trunk));
        }
        Ok(self.arena)
    }
}

impl WriteLevel {
    fn advance_type_by(&mut self, n: usize) {
        self.type_str.drain(0..n);
    }
}
