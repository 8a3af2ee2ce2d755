//! The level / state stack: tracks the current position inside a
//! serialized value across arbitrarily nested containers.
//!
//! Each [`Level`] is one frame — one container's worth of bookkeeping.
//! [`LevelStack`] is the stack of frames, inline up to
//! [`crate::MAX_INLINE_LEVELS`] and spilling to the heap beyond that (the
//! safe-Rust replacement for the original's pointer-chained overflow
//! blocks — see `DESIGN.md`).
//!
//! A variant's children are typed by a signature that lives inside the
//! *wire data* (the bytes trailing a `v`), not in the value's root type
//! string. Rather than make `Level` borrow from two different buffers with
//! two different lifetimes, each level just owns its remaining type string
//! outright as a small inline buffer — cheap to copy for the handful of
//! bytes a single nesting level's signature ever is, and it sidesteps a
//! self-referential struct entirely.

use smallvec::SmallVec;

/// The container a [`Level`] is nested directly inside. The root level is
/// `Root`, treated identically to `Tuple` everywhere except that it cannot
/// be exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enclosing {
    Root,
    Tuple,
    Pair,
    Variant,
    Maybe,
    Array,
}

impl Enclosing {
    /// The container-open byte that produces this `Enclosing` (`Root` is
    /// treated as a `(` whose closing bracket never appears on the wire).
    pub fn marker(self) -> u8 {
        match self {
            Enclosing::Root | Enclosing::Tuple => b'(',
            Enclosing::Pair => b'{',
            Enclosing::Variant => b'v',
            Enclosing::Maybe => b'm',
            Enclosing::Array => b'a',
        }
    }

    pub fn from_open_byte(b: u8) -> Option<Enclosing> {
        match b {
            b'(' => Some(Enclosing::Tuple),
            b'{' => Some(Enclosing::Pair),
            b'v' => Some(Enclosing::Variant),
            b'm' => Some(Enclosing::Maybe),
            b'a' => Some(Enclosing::Array),
            _ => None,
        }
    }

    /// Maps a container-*close* byte (`)`, `}`, or one of the non-bracketed
    /// markers `v`/`m`/`a` reused for closing) to the `Enclosing` it closes.
    pub fn from_close_byte(b: u8) -> Option<Enclosing> {
        match b {
            b')' => Some(Enclosing::Tuple),
            b'}' => Some(Enclosing::Pair),
            b'v' => Some(Enclosing::Variant),
            b'm' => Some(Enclosing::Maybe),
            b'a' => Some(Enclosing::Array),
            _ => None,
        }
    }
}

/// One frame of the parsing/writing stack — one container's worth of
/// position bookkeeping.
#[derive(Debug, Clone)]
pub struct Level {
    // -- static: fixed at push time --
    /// Byte length of this frame (0 for an as-yet-unknown top-level write).
    pub size: usize,
    /// Vector index one past the last byte of the frame.
    pub tail_vec: usize,
    /// Byte offset (within `tail_vec`) one past the last byte of the frame.
    pub tail_off: usize,
    /// log2 of the framing-offset word width chosen for this container.
    pub wordsize: u8,
    /// The container type this level is nested directly inside.
    pub enclosing: Enclosing,

    // -- dynamic: advance with iteration --
    /// The remaining type string for this frame, owned inline. See the
    /// module docs for why this isn't an offset/length pair into a shared
    /// buffer.
    pub type_str: SmallVec<[u8; 32]>,
    /// Current vector index of the read/write cursor.
    pub front_vec: usize,
    /// Current byte offset within `front_vec`.
    pub front_off: usize,
    /// Current byte offset relative to the frame start.
    pub offset: usize,
    /// Container-specific counter; see module docs on each container kind
    /// in `reader.rs`/`writer.rs` for its meaning.
    pub index: usize,
}

impl Level {
    /// Builds the root level spanning `size` bytes, with the root type
    /// string `ty`.
    ///
    /// `tail_vec`/`tail_off` follow the same convention [`crate::vecs::VecArena::tail`]
    /// relies on: `tail_off` counts bytes from the *start* of segment
    /// `tail_vec` to this frame's end, so a root level spanning the whole
    /// arena always starts folded at segment 0.
    pub fn root(size: usize, ty: &[u8], wordsize: u8) -> Self {
        Level {
            size,
            tail_vec: 0,
            tail_off: size,
            wordsize,
            enclosing: Enclosing::Root,
            type_str: SmallVec::from_slice(ty),
            front_vec: 0,
            front_off: 0,
            offset: 0,
            index: 1,
        }
    }

    /// Drops `n` bytes from the front of the remaining type string, once
    /// they've been consumed by a parsed child type.
    pub fn advance_type(&mut self, n: usize) {
        self.type_str.drain(0..n);
    }
}

/// The stack of [`Level`] frames belonging to one value.
///
/// Bounded inline storage handles the common shallow-nesting case without
/// touching the allocator; deeper values spill the `SmallVec` to the heap
/// transparently.
#[derive(Debug, Clone)]
pub struct LevelStack {
    frames: SmallVec<[Level; 16]>,
}

impl LevelStack {
    pub fn new(root: Level) -> Self {
        let mut frames = SmallVec::new();
        frames.push(root);
        LevelStack { frames }
    }

    /// Resets the stack back to a single root frame, reusing the
    /// allocation (mirrors the original's "unused" cached detached block").
    pub fn reset_to_root(&mut self, root: Level) {
        self.frames.clear();
        self.frames.push(root);
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    #[inline]
    pub fn current(&self) -> &Level {
        self.frames.last().expect("level stack is never empty")
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut Level {
        self.frames.last_mut().expect("level stack is never empty")
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.frames.len() == 1
    }

    pub fn push(&mut self, level: Level) {
        self.frames.push(level);
    }

    /// Pops the current frame. Returns `None` (and leaves the stack
    /// unchanged) if already at the root.
    pub fn pop(&mut self) -> Option<Level> {
        if self.is_root() {
            None
        } else {
            self.frames.pop()
        }
    }
}
