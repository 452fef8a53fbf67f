/// Fixed byte boundary every header and payload in the arena sits on.
pub const ALIGNMENT: usize = 8;

/// Rounds `value` up to the next multiple of `align`, which must be a power of two.
///
/// # Examples
///
/// ```rust
/// use vsheap::align_to;
///
/// assert_eq!(align_to!(0, 8), 0);
/// assert_eq!(align_to!(1, 8), 8);
/// assert_eq!(align_to!(17, 8), 24);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    ($value + $align - 1) & !($align - 1)
  };
}

/// Rounds a request up to [`ALIGNMENT`], or `None` if that would overflow.
pub(crate) fn align_request(size: usize) -> Option<usize> {
  size
    .checked_add(ALIGNMENT - 1)
    .map(|_| align_to!(size, ALIGNMENT))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align_request_rounds_to_boundary() {
    for size in 0..=64usize {
      let aligned = align_request(size).unwrap();

      assert_eq!(aligned % ALIGNMENT, 0);
      assert!(aligned >= size);
      assert!(aligned - size < ALIGNMENT);
    }
  }

  #[test]
  fn test_align_request_overflow() {
    assert_eq!(align_request(0), Some(0));
    assert_eq!(align_request(9), Some(16));
    assert_eq!(align_request(usize::MAX - ALIGNMENT + 2), None);
    assert_eq!(align_request(usize::MAX), None);
  }
}
