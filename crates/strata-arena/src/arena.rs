//! Block-chain bump allocator.
//!
//! An [`Arena`] owns a chain of [`Block`]s held by value and visited in
//! append order. Allocation is first-fit over the chain; when nothing fits,
//! a new block is requested from the arena's [`BlockSource`], sized
//! `max(request, growth_factor * largest_block)`.
//!
//! ```text
//! Arena
//! ├── blocks: [Block 0] → [Block 1] → [Block 2]   (index order = chain order)
//! └── source: BlockSource (heap, or another allocator)
//! ```

use std::ptr::NonNull;

use smallvec::SmallVec;

use crate::block::Block;
use crate::config::ArenaConfig;
use crate::error::{fatal, ArenaError};
use crate::source::{BlockSource, HeapBlocks};

/// A growable chain of bump-allocated blocks.
///
/// `reset()` keeps every block, so replaying the same sequence of pushes
/// after a reset returns the same sequence of pointers.
pub struct Arena<S: BlockSource> {
    blocks: SmallVec<[Block; 4]>,
    source: S,
    config: ArenaConfig,
}

/// An arena whose blocks come from the global heap.
pub type HeapArena = Arena<HeapBlocks>;

impl Arena<HeapBlocks> {
    /// Create a heap-backed arena whose first block holds at least
    /// `initial_block_size` bytes.
    pub fn on_heap(initial_block_size: usize) -> Self {
        Self::from_parts(
            HeapBlocks::new(),
            ArenaConfig::with_initial_block_size(initial_block_size),
        )
    }
}

impl<S: BlockSource> Arena<S> {
    /// Create an empty arena drawing blocks from `source`.
    ///
    /// Returns `Err(ArenaError::InvalidConfig)` if `config` fails validation.
    pub fn new(source: S, config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        Ok(Self::from_parts(source, config))
    }

    /// `config` must already be valid.
    pub(crate) fn from_parts(source: S, config: ArenaConfig) -> Self {
        debug_assert!(config.validate().is_ok());
        Self {
            blocks: SmallVec::new(),
            source,
            config,
        }
    }

    /// Bump-allocate `size` bytes aligned to `align`, growing the chain if
    /// needed.
    ///
    /// A non-power-of-two `align` is replaced by the configured default.
    /// Returns `Err` if the block source cannot supply a block large enough.
    pub fn try_push(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, ArenaError> {
        let align = self.config.normalize_align(align);

        if let Some(ptr) = self.blocks.iter_mut().find_map(|b| b.push(size, align)) {
            return Ok(ptr);
        }

        let block_size = self.next_block_size(size);
        let buffer = self.source.append_block(block_size, align)?;
        tracing::debug!(
            index = self.blocks.len(),
            size = buffer.size(),
            requested = size,
            align,
            "appended arena block"
        );
        self.blocks.push(Block::new(buffer));

        let index = self.blocks.len() - 1;
        self.blocks[index]
            .push(size, align)
            .ok_or(ArenaError::CapacityExceeded {
                requested: size,
                capacity: buffer.size(),
            })
    }

    /// Bump-allocate `size` bytes aligned to `align`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be satisfied even after growing the
    /// chain. That means the arena's sizing is wrong, not that memory is
    /// temporarily short.
    #[track_caller]
    pub fn push(&mut self, size: usize, align: usize) -> NonNull<u8> {
        self.try_push(size, align).unwrap_or_else(|err| fatal(err))
    }

    /// Mark every block empty. Memory is kept for reuse.
    pub fn reset(&mut self) {
        for block in &mut self.blocks {
            block.reset();
        }
        tracing::trace!(blocks = self.blocks.len(), "arena reset");
    }

    /// Move the cursor of the block holding `ptr` back to `ptr`.
    ///
    /// Everything allocated in that block at or after `ptr` is discarded.
    /// Other blocks are untouched.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` does not lie in any block's live range.
    #[track_caller]
    pub fn rewind(&mut self, ptr: NonNull<u8>) {
        // Prefer a block where `ptr` addresses a live byte, so a pointer
        // equal to one block's top and another block's start resolves to
        // the block that handed it out.
        let index = self
            .blocks
            .iter()
            .position(|b| b.holds(ptr))
            .or_else(|| self.blocks.iter().position(|b| b.contains(ptr)));
        match index {
            Some(index) => {
                if let Err(err) = self.blocks[index].rewind(ptr) {
                    fatal(err);
                }
            }
            None => fatal(ArenaError::OutsideBlock {
                addr: ptr.as_ptr() as usize,
            }),
        }
    }

    /// Whether `ptr` lies inside the live range of any block.
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        self.blocks.iter().any(|b| b.contains(ptr))
    }

    /// The next free address in the most recently appended block, or
    /// `None` for an empty chain.
    pub fn top(&self) -> Option<NonNull<u8>> {
        self.blocks.last().map(Block::top)
    }

    /// Return every block to the source. The next push starts a new chain.
    pub fn release(&mut self) {
        for block in self.blocks.drain(..) {
            self.source.release_block(block.buffer());
        }
    }

    /// The blocks in chain order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks in the chain.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Capacity of the largest block, or zero for an empty chain.
    pub fn largest_block(&self) -> usize {
        self.blocks.iter().map(Block::capacity).max().unwrap_or(0)
    }

    /// Bytes used across all blocks, including alignment padding.
    pub fn used(&self) -> usize {
        self.blocks.iter().map(Block::used).sum()
    }

    /// Total capacity across all blocks.
    pub fn capacity(&self) -> usize {
        self.blocks.iter().map(Block::capacity).sum()
    }

    /// The arena configuration.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// The block source.
    pub fn source(&self) -> &S {
        &self.source
    }

    fn next_block_size(&self, requested: usize) -> usize {
        let floor = if self.blocks.is_empty() {
            self.config.initial_block_size
        } else {
            self.largest_block().saturating_mul(self.config.growth_factor)
        };
        requested.max(floor).max(self.config.default_align)
    }
}

impl<S: BlockSource> Drop for Arena<S> {
    fn drop(&mut self) {
        self.release();
    }
}
