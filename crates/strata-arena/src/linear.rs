//! Arenas layered on other allocators.
//!
//! A [`LinearAllocator`] is an [`Arena`] whose blocks are carved out of a
//! backing [`Allocator`]: one backing request per block. The backing
//! allocator is borrowed for the lifetime `'a`, so it cannot be reset or
//! dropped while a dependent exists.
//!
//! ```text
//! VirtualHeap ("application")
//! └── LinearAllocator ("demo")
//!     └── LinearAllocator ("frame")   reset every frame
//! ```

use std::cell::RefCell;
use std::ptr::NonNull;

use crate::allocator::Allocator;
use crate::arena::Arena;
use crate::block::Buffer;
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::source::BlockSource;

/// A [`BlockSource`] that requests each block from another allocator.
///
/// Released blocks are handed to [`Allocator::free`]; for the bump
/// allocators in this crate that is a no-op and the memory comes back when
/// the backing allocator is reset.
pub struct BackedBlocks<'a, A: Allocator + ?Sized> {
    backing: &'a A,
    requests: usize,
}

impl<'a, A: Allocator + ?Sized> BackedBlocks<'a, A> {
    /// Draw blocks from `backing`.
    pub fn new(backing: &'a A) -> Self {
        Self {
            backing,
            requests: 0,
        }
    }

    /// The backing allocator.
    pub fn backing(&self) -> &'a A {
        self.backing
    }

    /// Blocks requested from the backing allocator so far.
    pub fn requests(&self) -> usize {
        self.requests
    }
}

impl<A: Allocator + ?Sized> BlockSource for BackedBlocks<'_, A> {
    fn append_block(&mut self, size: usize, align: usize) -> Result<Buffer, ArenaError> {
        let ptr = self.backing.try_allocate(size, align)?;
        self.requests += 1;
        Ok(Buffer::new(ptr, size))
    }

    fn release_block(&mut self, buffer: Buffer) {
        self.backing.free(buffer.ptr());
    }
}

/// A block-chain bump allocator whose blocks come from a backing
/// allocator.
pub struct LinearAllocator<'a, A: Allocator + ?Sized> {
    arena: RefCell<Arena<BackedBlocks<'a, A>>>,
}

impl<'a, A: Allocator + ?Sized> LinearAllocator<'a, A> {
    /// Create an allocator over `backing` whose first block holds at least
    /// `initial_size` bytes. Later blocks grow from there.
    pub fn new(initial_size: usize, backing: &'a A) -> Self {
        Self {
            arena: RefCell::new(Arena::from_parts(
                BackedBlocks::new(backing),
                ArenaConfig::with_initial_block_size(initial_size),
            )),
        }
    }

    /// Create an allocator over `backing` with an explicit configuration.
    pub fn with_config(backing: &'a A, config: ArenaConfig) -> Result<Self, ArenaError> {
        Ok(Self {
            arena: RefCell::new(Arena::new(BackedBlocks::new(backing), config)?),
        })
    }

    /// Bump-allocate `size` bytes aligned to `align`, requesting a new
    /// block from the backing allocator if none fits.
    pub fn allocate_data(&self, size: usize, align: usize) -> Result<NonNull<u8>, ArenaError> {
        self.arena.borrow_mut().try_push(size, align)
    }

    /// Mark every block empty. Blocks stay allocated from the backing
    /// allocator.
    pub fn reset(&mut self) {
        self.arena.get_mut().reset();
    }

    /// Move the cursor of the block holding `ptr` back to `ptr`.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is not inside any block's live range.
    #[track_caller]
    pub fn rewind(&mut self, ptr: NonNull<u8>) {
        self.arena.get_mut().rewind(ptr);
    }

    /// Drop every block. The next allocation starts a new chain with a
    /// fresh backing request.
    pub fn release(&mut self) {
        self.arena.get_mut().release();
    }

    /// Whether `ptr` lies inside the live range of any block.
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        self.arena.borrow().contains(ptr)
    }

    /// Bytes used across all blocks.
    pub fn used(&self) -> usize {
        self.arena.borrow().used()
    }

    /// Total capacity across all blocks.
    pub fn capacity(&self) -> usize {
        self.arena.borrow().capacity()
    }

    /// Number of blocks in the chain.
    pub fn block_count(&self) -> usize {
        self.arena.borrow().block_count()
    }

    /// The backing allocator.
    pub fn backing(&self) -> &'a A {
        self.arena.borrow().source().backing()
    }
}

// SAFETY: every block is one allocation from `A`, valid for the borrow
// `'a`. The arena hands out aligned, disjoint ranges of those blocks and
// reclaims them only through `reset`/`rewind`/`release`, which take
// `&mut self`.
#[allow(unsafe_code)]
unsafe impl<A: Allocator + ?Sized> Allocator for LinearAllocator<'_, A> {
    fn try_allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, ArenaError> {
        self.allocate_data(size, align)
    }
}
