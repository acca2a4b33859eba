//! Bump allocation with scoped lifetimes for Strata.
//!
//! Provides chained bump arenas that draw their memory either from the
//! global heap, from one large virtual-memory reservation, or from another
//! arena. Memory is never freed per allocation; a whole scope is reclaimed
//! at once by resetting its allocator. This crate is the only one in the
//! workspace that contains `unsafe` code.
//!
//! # Architecture
//!
//! ```text
//! VirtualHeap (one reservation, pages committed geometrically)
//! └── Block (grows in place over the committed prefix)
//!
//! LinearAllocator<'a, A> (borrows its backing allocator for 'a)
//! └── Arena<BackedBlocks<'a, A>>
//!     └── Block × n (one backing request each, first-fit, index order)
//!
//! HeapArena = Arena<HeapBlocks> (standalone, blocks from the global heap)
//! ```
//!
//! Both [`VirtualHeap`] and [`LinearAllocator`] implement [`Allocator`], so
//! allocators nest to any depth:
//!
//! ```
//! use strata_arena::{gib, Allocator, LinearAllocator, VirtualHeap};
//!
//! let heap = VirtualHeap::new(gib(1));
//! let mut frame = LinearAllocator::new(4096, &heap);
//! for _ in 0..3 {
//!     let scratch = frame.alloc_slice_fill(256, 0.0f32);
//!     scratch[0] = 1.0;
//!     frame.reset();
//! }
//! ```
//!
//! # Lifetimes
//!
//! Allocation takes `&self`; reset and rewind take `&mut self`. Because a
//! dependent [`LinearAllocator`] holds a shared borrow of its backing
//! allocator, the borrow checker rejects resetting or dropping a backing
//! allocator while anything still allocates from it.
//!
//! # Failure
//!
//! Running out of capacity is a sizing bug, so [`Allocator::allocate`] and
//! friends log the [`ArenaError`] and panic. [`Allocator::try_allocate`]
//! returns the same error for callers that want to probe.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod allocator;
pub mod arena;
pub mod block;
pub mod config;
pub mod error;
pub mod linear;
pub mod platform;
mod raw;
pub mod source;
pub mod virtual_heap;

// Public re-exports for the primary API surface.
pub use allocator::Allocator;
pub use arena::{Arena, HeapArena};
pub use block::{Block, Buffer};
pub use config::{gib, kib, mib, tib, ArenaConfig, HeapConfig};
pub use error::ArenaError;
pub use linear::{BackedBlocks, LinearAllocator};
pub use platform::{OsPlatform, PageRange, Platform, Reservation};
pub use source::{BlockSource, HeapBlocks};
pub use virtual_heap::VirtualHeap;
