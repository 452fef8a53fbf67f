use log::{debug, warn};

use super::Heap;
use crate::{
  block::{Block, Handle},
  error::Result,
};

impl Heap {
  /// Releases the block behind `handle` and merges it with free neighbours.
  ///
  /// Handles that do not land on a tracked block are reported as
  /// `InvalidPointer`; handles of blocks that are already free as
  /// `DoubleFree`. Neither touches the arena.
  ///
  /// Validating the handle walks the block chain, so this is linear in the
  /// number of blocks; the merge itself touches at most two neighbours.
  pub fn free(
    &mut self,
    handle: Handle,
  ) -> Result<()> {
    let (offset, mut block) = self
      .live(handle)
      .inspect_err(|error| warn!("Rejected free: {}", error))?;

    block.used = false;
    self.store(offset, &block)?;

    let merged = self.coalesce(offset, block)?;

    debug!(
      "Freed block {:#x}, now part of free block {:#x}",
      offset, merged
    );

    Ok(())
  }

  /// Merges the free block at `offset` with its successor, then with its predecessor.
  ///
  /// Returns the header offset of the resulting free block, which is the
  /// left-most of the blocks involved.
  fn coalesce(
    &mut self,
    offset: usize,
    block: Block,
  ) -> Result<usize> {
    let block = self.merge_next(offset, block)?;

    if let Some(prev_offset) = block.prev {
      let prev = self.block(prev_offset)?;

      if !prev.used {
        self.merge_next(prev_offset, prev)?;
        return Ok(prev_offset);
      }
    }

    Ok(offset)
  }
}
