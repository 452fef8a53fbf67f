use std::io;

use thiserror::Error;

use crate::block::Handle;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
  /// The arena capacity cannot hold a block header or breaks the 8-byte boundary.
  #[error("invalid arena capacity {capacity}: need a multiple of {alignment} of at least {minimum} bytes")]
  InvalidCapacity {
    capacity: usize,
    minimum: usize,
    alignment: usize,
  },

  #[error("failed to map arena memory: {0}")]
  ArenaMap(#[source] io::Error),

  #[error("out of memory: no free block can hold {requested} bytes")]
  OutOfMemory { requested: usize },

  #[error("invalid pointer {0}")]
  InvalidPointer(Handle),

  #[error("block at {0} is already free")]
  DoubleFree(Handle),

  #[error("block chain corrupted: {0}")]
  Corrupted(String),
}

impl Error {
  /// True for the failures that happen while setting up the arena.
  pub fn is_init(&self) -> bool {
    matches!(self, Error::InvalidCapacity { .. } | Error::ArenaMap(_))
  }
}
