use log::{debug, warn};

use super::Heap;
use crate::{
  align::align_request,
  block::{Block, HEADER_SIZE, Handle},
  error::{Error, Result},
};

impl Heap {
  /// Best-fit search over the chain.
  ///
  /// Picks the free block with the smallest capacity that still holds `size`.
  /// Ties go to the lowest address because the scan only replaces the current
  /// best on a strictly smaller capacity.
  fn find_best_fit(
    &self,
    size: usize,
  ) -> Option<(usize, Block)> {
    let mut best: Option<(usize, Block)> = None;

    for (offset, block) in self.chain() {
      if block.used || block.size < size {
        continue;
      }

      match best {
        Some((_, current)) if current.size <= block.size => {}
        _ => best = Some((offset, block)),
      }
    }

    best
  }

  /// Reserves a payload of at least `size` bytes and returns its handle.
  ///
  /// The size is rounded up to the arena alignment. A zero-byte request is
  /// served like any other. On failure nothing in the arena changes.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Handle> {
    let out_of_memory = || {
      warn!("Out of memory: cannot allocate {} bytes", size);
      Error::OutOfMemory { requested: size }
    };

    let requested = align_request(size).ok_or_else(out_of_memory)?;
    let (offset, block) = self.find_best_fit(requested).ok_or_else(out_of_memory)?;

    // Only trips on a corrupted header; a consistent chain never ends past the arena.
    let fits = offset
      .checked_add(HEADER_SIZE + requested)
      .is_some_and(|end| end <= self.capacity());
    if !fits {
      return Err(out_of_memory());
    }

    let mut block = self.split(offset, block, requested)?;
    block.used = true;
    self.store(offset, &block)?;

    debug!(
      "Allocated {} bytes (capacity {}) at block {:#x}",
      size, block.size, offset
    );

    Ok(Handle::for_block(offset))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::heap::BlockInfo;

  fn pattern(heap: &Heap) -> Vec<(usize, bool)> {
    heap.blocks().map(|info| (info.size, info.used)).collect()
  }

  #[test]
  fn test_allocate_splits_block() {
    let mut heap = Heap::new(256).unwrap();
    let handle = heap.allocate(16).unwrap();

    assert_eq!(handle.offset(), HEADER_SIZE);
    assert_eq!(
      heap.dump(),
      vec![
        BlockInfo {
          address: 0,
          size: 16,
          used: true,
        },
        BlockInfo {
          address: HEADER_SIZE + 16,
          size: 256 - 2 * HEADER_SIZE - 16,
          used: false,
        },
      ]
    );
    heap.verify().unwrap();
  }

  #[test]
  fn test_allocate_rounds_to_alignment() {
    let mut heap = Heap::new(256).unwrap();
    let first = heap.allocate(1).unwrap();
    let second = heap.allocate(9).unwrap();

    assert_eq!(heap.size_of(first).unwrap(), 8);
    assert_eq!(heap.size_of(second).unwrap(), 16);
    assert_eq!(second.offset() % crate::align::ALIGNMENT, 0);
  }

  #[test]
  fn test_allocate_zero_bytes() {
    let mut heap = Heap::new(256).unwrap();
    let first = heap.allocate(0).unwrap();
    let second = heap.allocate(0).unwrap();

    assert_ne!(first, second);
    assert_eq!(heap.size_of(first).unwrap(), 0);
    heap.verify().unwrap();
  }

  #[test]
  fn test_allocate_keeps_slack_instead_of_empty_block() {
    let capacity = 2 * HEADER_SIZE + 64;
    let mut heap = Heap::new(capacity).unwrap();

    // Splitting would leave a header with no payload behind.
    let handle = heap.allocate(capacity - 2 * HEADER_SIZE).unwrap();

    assert_eq!(heap.size_of(handle).unwrap(), capacity - HEADER_SIZE);
    assert_eq!(pattern(&heap), vec![(capacity - HEADER_SIZE, true)]);
    heap.verify().unwrap();
  }

  #[test]
  fn test_allocate_best_fit() {
    let mut heap = Heap::new(512).unwrap();

    let a = heap.allocate(64).unwrap();
    let _b = heap.allocate(8).unwrap();
    let c = heap.allocate(24).unwrap();
    let _d = heap.allocate(8).unwrap();

    heap.free(a).unwrap();
    heap.free(c).unwrap();

    // The 24 byte hole is the tightest fit even though the 64 byte one comes first.
    let e = heap.allocate(16).unwrap();

    assert_eq!(e, c);
  }

  #[test]
  fn test_allocate_best_fit_tie_goes_to_lowest_address() {
    let mut heap = Heap::new(512).unwrap();

    let a = heap.allocate(32).unwrap();
    let _b = heap.allocate(8).unwrap();
    let c = heap.allocate(32).unwrap();
    let _d = heap.allocate(8).unwrap();

    heap.free(c).unwrap();
    heap.free(a).unwrap();

    assert_eq!(heap.allocate(32).unwrap(), a);
    assert_eq!(heap.allocate(32).unwrap(), c);
  }

  #[test]
  fn test_allocate_out_of_memory_leaves_chain_untouched() {
    let mut heap = Heap::new(256).unwrap();
    heap.allocate(64).unwrap();

    let before = heap.dump();

    assert!(matches!(
      heap.allocate(512),
      Err(Error::OutOfMemory { requested: 512 })
    ));
    assert!(matches!(
      heap.allocate(usize::MAX),
      Err(Error::OutOfMemory { .. })
    ));
    assert_eq!(heap.dump(), before);
  }

  #[test]
  fn test_allocate_until_exhausted() {
    let mut heap = Heap::new(256).unwrap();
    let mut handles = Vec::new();

    while let Ok(handle) = heap.allocate(16) {
      handles.push(handle);
    }

    assert_eq!(handles.len(), 256 / (HEADER_SIZE + 16));
    assert_eq!(heap.stats().free_blocks, 0);
    heap.verify().unwrap();
  }
}
