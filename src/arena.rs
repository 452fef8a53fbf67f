use std::{io, ptr::NonNull, slice};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void, mmap, munmap};

use crate::error::{Error, Result};

/// Fixed-capacity byte region obtained straight from the kernel.
///
/// The mapping is page aligned and zero filled. It lives exactly as long as
/// the `Arena` value and is never resized.
pub struct Arena {
  base: NonNull<u8>,
  capacity: usize,
}

impl Arena {
  /// Maps `capacity` bytes of anonymous private memory.
  ///
  /// `capacity` must be non-zero; the caller validates anything stricter.
  pub fn map(capacity: usize) -> Result<Self> {
    if capacity == 0 {
      return Err(Error::ArenaMap(io::Error::from(io::ErrorKind::InvalidInput)));
    }

    let address = unsafe {
      mmap(
        std::ptr::null_mut(),
        capacity,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      return Err(Error::ArenaMap(io::Error::last_os_error()));
    }

    let base = NonNull::new(address as *mut u8)
      .ok_or_else(|| Error::ArenaMap(io::Error::from(io::ErrorKind::AddrNotAvailable)))?;

    Ok(Self { base, capacity })
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Address of the first byte, for diagnostics only.
  pub fn base_address(&self) -> usize {
    self.base.as_ptr() as usize
  }

  pub fn bytes(&self) -> &[u8] {
    // The mapping is valid for `capacity` bytes for as long as `self` lives.
    unsafe { slice::from_raw_parts(self.base.as_ptr(), self.capacity) }
  }

  pub fn bytes_mut(&mut self) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(self.base.as_ptr(), self.capacity) }
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    let result = unsafe { munmap(self.base.as_ptr() as *mut c_void, self.capacity) };

    if result != 0 {
      log::error!(
        "munmap of {} byte arena at {:#x} failed: {}",
        self.capacity,
        self.base_address(),
        io::Error::last_os_error()
      );
    }
  }
}

// The arena is an exclusively owned mapping; moving it across threads is fine.
unsafe impl Send for Arena {}
