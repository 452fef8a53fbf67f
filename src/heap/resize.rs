use log::{debug, warn};

use super::Heap;
use crate::{
  align::align_request,
  block::{Block, HEADER_SIZE, Handle},
  error::{Error, Result},
};

impl Heap {
  /// Changes the payload capacity behind `handle` to at least `new_size` bytes.
  ///
  /// - No handle: same as [`Heap::allocate`].
  /// - `new_size == 0`: same as [`Heap::free`], returns `None`.
  /// - Shrinking and growing into a free successor happen in place and keep the handle.
  /// - Otherwise the payload moves to a fresh block and the old one is freed.
  ///
  /// If the move cannot be satisfied the old block stays allocated and untouched.
  pub fn resize(
    &mut self,
    handle: Option<Handle>,
    new_size: usize,
  ) -> Result<Option<Handle>> {
    let Some(handle) = handle else {
      return self.allocate(new_size).map(Some);
    };

    if new_size == 0 {
      return self.free(handle).map(|_| None);
    }

    let (offset, block) = self
      .live(handle)
      .inspect_err(|error| warn!("Rejected resize: {}", error))?;

    let requested = align_request(new_size).ok_or_else(|| {
      warn!("Out of memory: cannot resize {} to {} bytes", handle, new_size);
      Error::OutOfMemory { requested: new_size }
    })?;

    if requested == block.size {
      return Ok(Some(handle));
    }

    if requested < block.size {
      self.shrink(offset, block, requested)?;
      debug!("Shrunk block {:#x} to {} bytes in place", offset, requested);
      return Ok(Some(handle));
    }

    if self.grow_in_place(offset, block, requested)? {
      debug!("Grew block {:#x} to {} bytes in place", offset, requested);
      return Ok(Some(handle));
    }

    self.relocate(handle, block, new_size).map(Some)
  }

  /// Gives back the tail of a used block beyond `size`.
  fn shrink(
    &mut self,
    offset: usize,
    mut block: Block,
    size: usize,
  ) -> Result<()> {
    let slack = block.size - size;

    if slack > HEADER_SIZE {
      let block = self.split(offset, block, size)?;

      // The new tail may sit right before another free block.
      if let Some(tail_offset) = block.next {
        let tail = self.block(tail_offset)?;
        self.merge_next(tail_offset, tail)?;
      }

      return Ok(());
    }

    // Too small for a block of its own: hand the slack to a free successor
    // by sliding its header down, or keep it as internal slack.
    let Some(next_offset) = block.next else {
      return Ok(());
    };

    let mut next = self.block(next_offset)?;
    if next.used {
      return Ok(());
    }

    let moved = next_offset - slack;
    next.size += slack;
    next.prev = Some(offset);

    self.store(moved, &next)?;
    self.relink_prev(next.next, Some(moved))?;

    block.size = size;
    block.next = Some(moved);
    self.store(offset, &block)
  }

  /// Extends a used block into its free successor when the two together hold `size`.
  ///
  /// Capacity is checked before anything is written; returns `false` and leaves
  /// the chain alone when the block cannot grow where it is.
  fn grow_in_place(
    &mut self,
    offset: usize,
    block: Block,
    size: usize,
  ) -> Result<bool> {
    let Some(next_offset) = block.next else {
      return Ok(false);
    };

    let next = self.block(next_offset)?;
    if next.used || block.size + HEADER_SIZE + next.size < size {
      return Ok(false);
    }

    let merged = self.merge_next(offset, block)?;
    self.split(offset, merged, size)?;

    Ok(true)
  }

  /// Moves the payload to a newly allocated block and frees the old one.
  fn relocate(
    &mut self,
    handle: Handle,
    block: Block,
    new_size: usize,
  ) -> Result<Handle> {
    let moved = self.allocate(new_size)?;

    let count = block.size.min(self.size_of(moved)?);
    let source = handle.offset();
    self
      .arena
      .bytes_mut()
      .copy_within(source..source + count, moved.offset());

    self.free(handle)?;

    debug!("Relocated {} to {} copying {} bytes", handle, moved, count);

    Ok(moved)
  }
}
