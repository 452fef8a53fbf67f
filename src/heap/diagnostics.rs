use std::fmt;

use super::{Chain, Heap};
use crate::{
  block::HEADER_SIZE,
  error::{Error, Result},
};

/// One block as seen by a diagnostic walk. `address` is the header offset in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  pub address: usize,
  pub size: usize,
  pub used: bool,
}

/// Address-ordered iterator over the blocks of a [`Heap`].
pub struct Blocks<'a> {
  chain: Chain<'a>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    self.chain.next().map(|(address, block)| BlockInfo {
      address,
      size: block.size,
      used: block.used,
    })
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
  pub capacity: usize,
  pub blocks: usize,
  pub used_blocks: usize,
  pub free_blocks: usize,
  pub used_bytes: usize,
  pub free_bytes: usize,
  pub largest_free: usize,
}

impl Heap {
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks { chain: self.chain() }
  }

  pub fn dump(&self) -> Vec<BlockInfo> {
    self.blocks().collect()
  }

  /// Payload totals; header bytes are counted in neither `used_bytes` nor `free_bytes`.
  pub fn stats(&self) -> Stats {
    self.blocks().fold(
      Stats {
        capacity: self.capacity(),
        ..Stats::default()
      },
      |mut stats, info| {
        stats.blocks += 1;

        if info.used {
          stats.used_blocks += 1;
          stats.used_bytes += info.size;
        } else {
          stats.free_blocks += 1;
          stats.free_bytes += info.size;
          stats.largest_free = stats.largest_free.max(info.size);
        }

        stats
      },
    )
  }

  /// Checks the structural invariants of the block chain.
  ///
  /// Blocks must tile the arena from offset 0 to its capacity with no gaps,
  /// every back-link must name the previous block, and no two neighbours may
  /// both be free.
  pub fn verify(&self) -> Result<()> {
    let corrupted = |message: String| Err(Error::Corrupted(message));

    let mut expected = self.head;
    let mut prev: Option<(usize, bool)> = None;

    for (offset, block) in self.chain() {
      if offset != expected {
        return corrupted(format!("block at {:#x}, expected one at {:#x}", offset, expected));
      }

      if block.prev != prev.map(|(address, _)| address) {
        return corrupted(format!(
          "block at {:#x} links back to {:?}, expected {:?}",
          offset,
          block.prev,
          prev.map(|(address, _)| address)
        ));
      }

      if let Some((address, false)) = prev {
        if !block.used {
          return corrupted(format!(
            "free blocks at {:#x} and {:#x} are adjacent",
            address, offset
          ));
        }
      }

      expected = match offset
        .checked_add(HEADER_SIZE)
        .and_then(|end| end.checked_add(block.size))
      {
        Some(end) if end <= self.capacity() => end,
        _ => return corrupted(format!("block at {:#x} runs past the arena", offset)),
      };

      if block.next.is_some_and(|next| next != expected) {
        return corrupted(format!(
          "block at {:#x} links forward to {:?}, expected {:#x}",
          offset, block.next, expected
        ));
      }

      prev = Some((offset, block.used));
    }

    if expected != self.capacity() {
      return corrupted(format!(
        "chain covers {} of {} bytes",
        expected,
        self.capacity()
      ));
    }

    Ok(())
  }
}

impl fmt::Display for Heap {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let base = self.arena.base_address();

    writeln!(f, "Memory Dump:")?;

    for info in self.blocks() {
      writeln!(
        f,
        "\tBlock at {:#x}, size {}, used {}",
        base + info.address,
        info.size,
        info.used as u8
      )?;
    }

    write!(f, "End Memory Dump")
  }
}
