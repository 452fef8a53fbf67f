use log::{info, warn};

use crate::{
  align::ALIGNMENT,
  arena::Arena,
  block::{Block, HEADER_SIZE, Handle},
  error::{Error, Result},
};

mod allocate;
mod deallocate;
mod diagnostics;
mod resize;

pub use diagnostics::{BlockInfo, Blocks, Stats};

/// Pool size used when no capacity is configured (64 * 4 bytes).
pub const DEFAULT_CAPACITY: usize = 64 * 4;

/// Variable-size heap over one fixed arena.
///
/// The arena is partitioned into an address-ordered, doubly linked chain of
/// blocks whose headers live inside the arena itself. The chain always covers
/// the arena exactly and never holds two neighbouring free blocks.
pub struct Heap {
  arena: Arena,
  head: usize,
}

impl Heap {
  /// Maps an arena of `capacity` bytes holding one free block that spans all of it.
  pub fn new(capacity: usize) -> Result<Self> {
    if capacity < HEADER_SIZE || capacity % ALIGNMENT != 0 {
      warn!("Rejected arena capacity {}", capacity);
      return Err(Error::InvalidCapacity {
        capacity,
        minimum: HEADER_SIZE,
        alignment: ALIGNMENT,
      });
    }

    let mut heap = Self {
      arena: Arena::map(capacity)?,
      head: 0,
    };

    heap.store(heap.head, &Block::new(capacity - HEADER_SIZE, false, None, None))?;

    info!(
      "Initialized arena of {} bytes at {:#x}",
      capacity,
      heap.arena.base_address()
    );

    Ok(heap)
  }

  pub fn with_default_capacity() -> Result<Self> {
    Self::new(DEFAULT_CAPACITY)
  }

  pub fn capacity(&self) -> usize {
    self.arena.capacity()
  }

  /// Read-only view of the payload behind a live handle.
  pub fn payload(
    &self,
    handle: Handle,
  ) -> Result<&[u8]> {
    let (_, block) = self.live(handle)?;
    let start = handle.offset();

    self
      .arena
      .bytes()
      .get(start..start + block.size)
      .ok_or_else(|| Error::Corrupted(format!("payload of {} runs past the arena", handle)))
  }

  pub fn payload_mut(
    &mut self,
    handle: Handle,
  ) -> Result<&mut [u8]> {
    let (_, block) = self.live(handle)?;
    let start = handle.offset();

    self
      .arena
      .bytes_mut()
      .get_mut(start..start + block.size)
      .ok_or_else(|| Error::Corrupted(format!("payload of {} runs past the arena", handle)))
  }

  /// Current payload capacity of a live handle, which may exceed the size it was requested with.
  pub fn size_of(
    &self,
    handle: Handle,
  ) -> Result<usize> {
    self.live(handle).map(|(_, block)| block.size)
  }

  fn block(
    &self,
    offset: usize,
  ) -> Result<Block> {
    Block::read(self.arena.bytes(), offset)
      .ok_or_else(|| Error::Corrupted(format!("header at {:#x} lies outside the arena", offset)))
  }

  fn store(
    &mut self,
    offset: usize,
    block: &Block,
  ) -> Result<()> {
    if block.write(self.arena.bytes_mut(), offset) {
      Ok(())
    } else {
      Err(Error::Corrupted(format!("header at {:#x} lies outside the arena", offset)))
    }
  }

  /// Points the back-link of the block at `offset`, if any, to `prev`.
  fn relink_prev(
    &mut self,
    offset: Option<usize>,
    prev: Option<usize>,
  ) -> Result<()> {
    let Some(offset) = offset else {
      return Ok(());
    };

    let mut block = self.block(offset)?;
    block.prev = prev;
    self.store(offset, &block)
  }

  fn chain(&self) -> Chain<'_> {
    Chain {
      bytes: self.arena.bytes(),
      cursor: Some(self.head),
    }
  }

  /// Resolves a handle to the tracked block it belongs to, used or free.
  fn locate(
    &self,
    handle: Handle,
  ) -> Result<(usize, Block)> {
    let header = handle
      .header()
      .filter(|header| *header < self.capacity())
      .ok_or(Error::InvalidPointer(handle))?;

    self
      .chain()
      .take_while(|(offset, _)| *offset <= header)
      .find(|(offset, _)| *offset == header)
      .ok_or(Error::InvalidPointer(handle))
  }

  /// Like [`Heap::locate`], but the block must currently be in use.
  fn live(
    &self,
    handle: Handle,
  ) -> Result<(usize, Block)> {
    let (offset, block) = self.locate(handle)?;

    if !block.used {
      return Err(Error::DoubleFree(handle));
    }

    Ok((offset, block))
  }

  /// Shrinks `block` to `size` and carves the rest into a new free block right after it,
  /// provided the rest has room for a header plus a non-empty payload.
  ///
  /// The block is stored either way; the returned copy reflects what was written.
  fn split(
    &mut self,
    offset: usize,
    mut block: Block,
    size: usize,
  ) -> Result<Block> {
    if block.size > size + HEADER_SIZE {
      let remainder_offset = offset + HEADER_SIZE + size;
      let remainder = Block::new(
        block.size - size - HEADER_SIZE,
        false,
        Some(offset),
        block.next,
      );

      self.store(remainder_offset, &remainder)?;
      self.relink_prev(block.next, Some(remainder_offset))?;

      block.next = Some(remainder_offset);
      block.size = size;
    }

    self.store(offset, &block)?;
    Ok(block)
  }

  /// Absorbs the successor of `block` when that successor is free.
  fn merge_next(
    &mut self,
    offset: usize,
    mut block: Block,
  ) -> Result<Block> {
    let Some(next_offset) = block.next else {
      return Ok(block);
    };

    let next = self.block(next_offset)?;
    if next.used {
      return Ok(block);
    }

    block.size += HEADER_SIZE + next.size;
    block.next = next.next;

    self.relink_prev(next.next, Some(offset))?;
    self.store(offset, &block)?;

    Ok(block)
  }
}

/// Walks the block chain in address order, yielding `(header offset, header)`.
///
/// Stops early on a link that does not move strictly forward or a header
/// that does not fit, so a damaged chain can never loop.
struct Chain<'a> {
  bytes: &'a [u8],
  cursor: Option<usize>,
}

impl Iterator for Chain<'_> {
  type Item = (usize, Block);

  fn next(&mut self) -> Option<Self::Item> {
    let offset = self.cursor.take()?;
    let block = Block::read(self.bytes, offset)?;

    self.cursor = block.next.filter(|next| *next > offset);

    Some((offset, block))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_new_single_free_block() {
    let heap = Heap::new(256).unwrap();

    assert_eq!(heap.capacity(), 256);
    assert_eq!(
      heap.dump(),
      vec![BlockInfo {
        address: 0,
        size: 256 - HEADER_SIZE,
        used: false,
      }]
    );
    heap.verify().unwrap();
  }

  #[test]
  fn test_new_rejects_invalid_capacity() {
    for capacity in [0, HEADER_SIZE - 8, HEADER_SIZE + 3, 255] {
      let error = Heap::new(capacity).err().unwrap();

      assert!(matches!(error, Error::InvalidCapacity { .. }), "{capacity}");
      assert!(error.is_init());
    }
  }

  #[test]
  fn test_new_header_only_arena() {
    let mut heap = Heap::new(HEADER_SIZE).unwrap();

    assert_eq!(heap.stats().free_bytes, 0);

    let handle = heap.allocate(0).unwrap();

    assert_eq!(heap.size_of(handle).unwrap(), 0);
    assert!(matches!(heap.allocate(0), Err(Error::OutOfMemory { .. })));
  }

  #[test]
  fn test_default_capacity() {
    let heap = Heap::with_default_capacity().unwrap();

    assert_eq!(heap.capacity(), DEFAULT_CAPACITY);
  }

  #[test]
  fn test_payload_access() {
    let mut heap = Heap::new(256).unwrap();
    let handle = heap.allocate(10).unwrap();

    assert_eq!(heap.size_of(handle).unwrap(), 16);

    heap.payload_mut(handle).unwrap().copy_from_slice(b"hello, heap!!!!!");

    assert_eq!(heap.payload(handle).unwrap(), b"hello, heap!!!!!");

    heap.free(handle).unwrap();

    assert!(matches!(heap.payload(handle), Err(Error::DoubleFree(_))));
    assert!(matches!(heap.size_of(Handle::from_offset(7)), Err(Error::InvalidPointer(_))));
  }

  #[test]
  fn test_locate_rejects_interior_offsets() {
    let mut heap = Heap::new(256).unwrap();
    let handle = heap.allocate(32).unwrap();

    assert!(heap.locate(handle).is_ok());

    for offset in [0, 1, handle.offset() + 8, handle.offset() - 1, 256, 1 << 20] {
      assert!(matches!(
        heap.locate(Handle::from_offset(offset)),
        Err(Error::InvalidPointer(_))
      ));
    }
  }

  #[test]
  fn test_independent_arenas() {
    let mut first = Heap::new(128).unwrap();
    let second = Heap::new(128).unwrap();

    first.allocate(16).unwrap();

    assert_eq!(first.stats().used_blocks, 1);
    assert_eq!(second.stats().used_blocks, 0);
  }
}
