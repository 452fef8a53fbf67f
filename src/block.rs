use std::{fmt, mem};

const WORD: usize = mem::size_of::<usize>();

/// Encoded form of an absent `prev`/`next` link.
const NIL: usize = usize::MAX;

/// Bytes taken by a block header in front of every payload.
pub const HEADER_SIZE: usize = 4 * WORD;

/// Block metadata stored in-band at the start of every block.
///
/// Links are arena offsets of the neighbouring block headers in address
/// order; they reference positions in the shared buffer and own nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
  pub size: usize,
  pub used: bool,
  pub prev: Option<usize>,
  pub next: Option<usize>,
}

impl Block {
  pub fn new(
    size: usize,
    used: bool,
    prev: Option<usize>,
    next: Option<usize>,
  ) -> Self {
    Self {
      size,
      used,
      prev,
      next,
    }
  }

  /// Decodes the header stored at `offset`, or `None` if it would not fit in `bytes`.
  pub fn read(
    bytes: &[u8],
    offset: usize,
  ) -> Option<Self> {
    let raw = bytes.get(offset..offset.checked_add(HEADER_SIZE)?)?;

    let word = |index: usize| {
      let mut buf = [0u8; WORD];
      buf.copy_from_slice(&raw[index * WORD..(index + 1) * WORD]);
      usize::from_ne_bytes(buf)
    };

    let link = |value: usize| (value != NIL).then_some(value);

    Some(Self {
      size: word(0),
      used: word(1) != 0,
      prev: link(word(2)),
      next: link(word(3)),
    })
  }

  /// Encodes the header at `offset`. Returns `false` if it would not fit in `bytes`.
  pub fn write(
    &self,
    bytes: &mut [u8],
    offset: usize,
  ) -> bool {
    let Some(end) = offset.checked_add(HEADER_SIZE) else {
      return false;
    };
    let Some(raw) = bytes.get_mut(offset..end) else {
      return false;
    };

    let words = [
      self.size,
      self.used as usize,
      self.prev.unwrap_or(NIL),
      self.next.unwrap_or(NIL),
    ];

    for (chunk, value) in raw.chunks_exact_mut(WORD).zip(words) {
      chunk.copy_from_slice(&value.to_ne_bytes());
    }

    true
  }
}

/// Caller-facing reference to an allocation: the payload offset within the arena.
///
/// A handle always points just past a block header, never at the header itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(usize);

impl Handle {
  /// Builds a handle from a raw payload offset. The heap validates it on use.
  pub fn from_offset(offset: usize) -> Self {
    Self(offset)
  }

  pub(crate) fn for_block(header: usize) -> Self {
    Self(header + HEADER_SIZE)
  }

  pub fn offset(&self) -> usize {
    self.0
  }

  /// Header offset this handle would belong to, if it could belong to any.
  pub(crate) fn header(&self) -> Option<usize> {
    self.0.checked_sub(HEADER_SIZE)
  }
}

impl fmt::Display for Handle {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "+{:#x}", self.0)
  }
}
