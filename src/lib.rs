//! # vsheap - A Variable-Size Heap Manager
//!
//! This crate provides a self-contained **best-fit heap** that serves
//! allocation, deallocation and resize requests out of one fixed-capacity
//! arena, without going through any general-purpose allocator.
//!
//! ## Overview
//!
//! The arena is split into blocks. Every block starts with a header and is
//! linked to its neighbours in address order:
//!
//! ```text
//!   Arena (fixed capacity C):
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │ ┌────────┬────────┐┌────────┬──────┐┌────────┬──────────────────────┐ │
//!   │ │ header │  used  ││ header │ free ││ header │        used          │ │
//!   │ └────────┴────────┘└────────┴──────┘└────────┴──────────────────────┘ │
//!   │   ▲    │             ▲   │  ▲   │      ▲                               │
//!   │   │    └── next ─────┘   │  │   └──────┘                               │
//!   │   └──────── prev ────────┘  └── prev ... next ──                       │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Σ (header + payload) over all blocks == C
//!   No two neighbouring blocks are both free.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   vsheap
//!   ├── align      - ALIGNMENT and the align_to! macro
//!   ├── arena      - mmap-backed fixed byte region
//!   ├── block      - Block header encoding and handles
//!   ├── error      - Error type
//!   └── heap       - Heap: allocate, free, resize, diagnostics
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use vsheap::Heap;
//!
//! let mut heap = Heap::new(256).unwrap();
//!
//! let handle = heap.allocate(16).unwrap();
//! heap.payload_mut(handle).unwrap().copy_from_slice(b"sixteen bytes!!!");
//!
//! let handle = heap.resize(Some(handle), 48).unwrap().unwrap();
//! assert_eq!(&heap.payload(handle).unwrap()[..16], b"sixteen bytes!!!");
//!
//! heap.free(handle).unwrap();
//! assert_eq!(heap.dump().len(), 1);
//! ```
//!
//! ## How It Works
//!
//! **Allocation** scans every block and keeps the free one with the smallest
//! capacity that still fits, preferring the lowest address on ties. When the
//! winner has room to spare for another header plus payload it is split:
//!
//! ```text
//!   Before:  ┌────────┬──────────────────────────────────────┐
//!            │ header │               free                   │
//!            └────────┴──────────────────────────────────────┘
//!
//!   After:   ┌────────┬──────────┐┌────────┬─────────────────┐
//!            │ header │   used   ││ header │      free       │
//!            └────────┴──────────┘└────────┴─────────────────┘
//!                     ▲
//!                     └── Handle returned to the caller
//! ```
//!
//! **Freeing** marks the block free, merges the next block into it if that
//! one is free, then merges it into the previous block if that one is free.
//!
//! **Resizing** shrinks in place, grows in place into a free successor when
//! the two together are large enough, and otherwise moves the payload to a
//! new block and frees the old one.
//!
//! ## Handles
//!
//! Headers are stored inside the arena and addressed by byte offset. A
//! [`Handle`] is the offset of a payload. Every handle passed back in is
//! resolved against the block chain first, so stray or stale handles are
//! reported as [`Error::InvalidPointer`] or [`Error::DoubleFree`] instead of
//! corrupting the arena.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: callers sharing a heap must serialize access
//! - **Fixed capacity**: the arena never grows
//! - **Fixed alignment**: sizes are rounded up to 8 bytes
//! - **Unix-only**: the arena comes from `mmap(2)`

pub mod align;
mod arena;
mod block;
mod error;
mod heap;

pub use block::{HEADER_SIZE, Handle};
pub use error::{Error, Result};
pub use heap::{BlockInfo, Blocks, DEFAULT_CAPACITY, Heap, Stats};
