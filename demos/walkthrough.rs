use std::env;

use log::{error, info};
use vsheap::{DEFAULT_CAPACITY, Error, Handle, Heap};

/// Reads the arena size from `VSHEAP_CAPACITY`, falling back to the default pool.
fn configured_capacity() -> usize {
  match env::var("VSHEAP_CAPACITY") {
    Ok(value) => value.parse().unwrap_or_else(|_| {
      error!("Ignoring unparsable VSHEAP_CAPACITY={:?}", value);
      DEFAULT_CAPACITY
    }),
    Err(_) => DEFAULT_CAPACITY,
  }
}

fn main() -> Result<(), Error> {
  if env::var_os("RUST_LOG").is_none() {
    // SAFETY: nothing else is running yet.
    unsafe { env::set_var("RUST_LOG", "info") };
  }
  pretty_env_logger::init();

  let mut heap = Heap::new(configured_capacity())?;
  println!("Initial State:\n{heap}");

  // --------------------------------------------------------------------
  // 1) Fill the arena with 16 byte blocks until it runs out.
  // --------------------------------------------------------------------
  let mut blocks: Vec<Handle> = Vec::new();
  while let Ok(handle) = heap.allocate(16) {
    blocks.push(handle);
  }
  println!(
    "\n[1] Out of memory after {} successful allocations\n{heap}",
    blocks.len()
  );

  // --------------------------------------------------------------------
  // 2) Free everything again. Coalescing brings back one spanning block.
  // --------------------------------------------------------------------
  for handle in blocks.drain(..) {
    heap.free(handle)?;
  }
  println!("\n[2] Free all blocks\n{heap}");

  // --------------------------------------------------------------------
  // 3) Double free is reported, not fatal.
  // --------------------------------------------------------------------
  let handle = heap.allocate(8)?;
  heap.free(handle)?;
  if let Err(error) = heap.free(handle) {
    println!("\n[3] Second free rejected: {error}");
  }

  // --------------------------------------------------------------------
  // 4) Handles that do not belong to any block.
  // --------------------------------------------------------------------
  for offset in [0, 7, heap.capacity() + 1] {
    if let Err(error) = heap.free(Handle::from_offset(offset)) {
      println!("[4] {error}");
    }
  }

  // --------------------------------------------------------------------
  // 5) Coalescing: free the outer blocks first, then the middle one.
  // --------------------------------------------------------------------
  let a = heap.allocate(8)?;
  let b = heap.allocate(16)?;
  let c = heap.allocate(48)?;
  heap.free(a)?;
  heap.free(c)?;
  println!("\n[5] Freed the outer blocks\n{heap}");
  heap.free(b)?;
  println!("[5] Freed the middle block\n{heap}");

  // --------------------------------------------------------------------
  // 6) Resize: allocate, grow, shrink, free.
  // --------------------------------------------------------------------
  let d = heap.resize(None, 16)?;
  let e = heap.resize(d, 48)?;
  println!("\n[6] Grew {:?} to {:?}\n{heap}", d, e);
  let f = heap.resize(e, 8)?;
  println!("[6] Shrunk to {:?}\n{heap}", f);
  heap.resize(f, 0)?;
  println!("[6] Freed through resize\n{heap}");

  heap.verify()?;
  info!("Walkthrough finished with a consistent heap.");

  Ok(())
}
