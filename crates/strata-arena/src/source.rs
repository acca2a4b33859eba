//! Where arena blocks come from.
//!
//! An [`Arena`](crate::Arena) never obtains memory itself. When no block in
//! its chain can satisfy a request, it asks its [`BlockSource`] for a new
//! buffer. [`HeapBlocks`] draws blocks from the global heap;
//! [`BackedBlocks`](crate::linear::BackedBlocks) draws them from another
//! [`Allocator`](crate::Allocator).

use smallvec::SmallVec;

use crate::block::Buffer;
use crate::error::ArenaError;
use crate::raw::HeapAllocation;

/// Supplier of backing memory for arena blocks.
pub trait BlockSource {
    /// Provide a buffer of at least `size` bytes whose first byte is
    /// aligned to `align` (a power of two).
    fn append_block(&mut self, size: usize, align: usize) -> Result<Buffer, ArenaError>;

    /// Take back a buffer previously returned by
    /// [`BlockSource::append_block`]. The arena no longer references it.
    fn release_block(&mut self, buffer: Buffer);
}

/// Blocks allocated from the global heap and freed when released.
#[derive(Default)]
pub struct HeapBlocks {
    allocations: SmallVec<[HeapAllocation; 4]>,
}

impl HeapBlocks {
    /// Create a source with no outstanding blocks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks currently held.
    pub fn outstanding(&self) -> usize {
        self.allocations.len()
    }
}

impl BlockSource for HeapBlocks {
    fn append_block(&mut self, size: usize, align: usize) -> Result<Buffer, ArenaError> {
        let allocation =
            HeapAllocation::new(size, align).ok_or(ArenaError::OutOfMemory { size, align })?;
        let buffer = Buffer::new(allocation.ptr(), allocation.size());
        self.allocations.push(allocation);
        Ok(buffer)
    }

    fn release_block(&mut self, buffer: Buffer) {
        if let Some(pos) = self
            .allocations
            .iter()
            .position(|a| a.ptr() == buffer.ptr())
        {
            // Dropping the allocation frees it.
            self.allocations.swap_remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_returns_aligned_buffer_of_requested_size() {
        let mut source = HeapBlocks::new();
        let buffer = source.append_block(4096, 256).unwrap();
        assert_eq!(buffer.size(), 4096);
        assert_eq!(buffer.start_addr() % 256, 0);
        assert_eq!(source.outstanding(), 1);
    }

    #[test]
    fn release_frees_only_the_matching_block() {
        let mut source = HeapBlocks::new();
        let a = source.append_block(64, 16).unwrap();
        let _b = source.append_block(64, 16).unwrap();
        source.release_block(a);
        assert_eq!(source.outstanding(), 1);
        // Releasing twice is a no-op.
        source.release_block(a);
        assert_eq!(source.outstanding(), 1);
    }

    #[test]
    fn unsatisfiable_block_reports_its_layout() {
        let mut source = HeapBlocks::new();
        assert_eq!(
            source.append_block(usize::MAX, 16),
            Err(ArenaError::OutOfMemory {
                size: usize::MAX,
                align: 16,
            })
        );
        assert_eq!(source.outstanding(), 0);
    }
}
