//! Memory buffers and bump-allocated blocks.
//!
//! A [`Buffer`] is a non-owning view over contiguous memory. A [`Block`]
//! pairs a buffer with a bump cursor; it is the unit every arena in this
//! crate allocates from.

use std::ptr::NonNull;

use crate::error::ArenaError;
use crate::raw;

/// A raw, non-owning view over a contiguous memory region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Buffer {
    ptr: NonNull<u8>,
    size: usize,
}

impl Buffer {
    /// Describe `size` bytes starting at `ptr`.
    pub fn new(ptr: NonNull<u8>, size: usize) -> Self {
        Self { ptr, size }
    }

    /// First byte of the region.
    pub fn ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Length of the region in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Address of the first byte.
    pub fn start_addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }
}

/// A fixed-capacity region with bump allocation.
///
/// `used` only grows between resets. Every allocation handed out lies in
/// `[start, start + used)`, and allocations never overlap.
#[derive(Debug)]
pub struct Block {
    buffer: Buffer,
    used: usize,
}

impl Block {
    /// Create an empty block over `buffer`.
    pub fn new(buffer: Buffer) -> Self {
        Self { buffer, used: 0 }
    }

    /// Offset one past the end of a `size`-byte allocation aligned to
    /// `align`, placed at the current cursor.
    ///
    /// Returns `None` on address overflow. `align` must be a power of two.
    pub fn end_offset_for(&self, size: usize, align: usize) -> Option<usize> {
        debug_assert!(align.is_power_of_two());
        let start = self.buffer.start_addr();
        let top = start.checked_add(self.used)?;
        let aligned = top.checked_add(align - 1)? & !(align - 1);
        aligned.checked_add(size).map(|end| end - start)
    }

    /// Whether a `size`-byte allocation aligned to `align` fits.
    pub fn fits(&self, size: usize, align: usize) -> bool {
        self.end_offset_for(size, align)
            .is_some_and(|end| end <= self.buffer.size)
    }

    /// Bump-allocate `size` bytes aligned to `align`.
    ///
    /// Returns `None` if the remaining capacity is insufficient. A
    /// zero-size request consumes only alignment padding.
    pub fn push(&mut self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let end = self.end_offset_for(size, align)?;
        if end > self.buffer.size {
            return None;
        }
        self.used = end;
        Some(raw::byte_add(self.buffer.ptr, end - size))
    }

    /// The next free address.
    pub fn top(&self) -> NonNull<u8> {
        raw::byte_add(self.buffer.ptr, self.used)
    }

    /// Whether `ptr` lies in `[start, start + used]`, i.e. at or before the
    /// top of this block.
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        let start = self.buffer.start_addr();
        addr >= start && addr - start <= self.used
    }

    /// Whether `ptr` is the start of a live byte, i.e. in `[start, start + used)`.
    pub(crate) fn holds(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        let start = self.buffer.start_addr();
        addr >= start && addr - start < self.used
    }

    /// Move the cursor back to `ptr`, discarding everything allocated at or
    /// after it.
    pub fn rewind(&mut self, ptr: NonNull<u8>) -> Result<(), ArenaError> {
        if !self.contains(ptr) {
            return Err(ArenaError::OutsideBlock {
                addr: ptr.as_ptr() as usize,
            });
        }
        self.used = ptr.as_ptr() as usize - self.buffer.start_addr();
        Ok(())
    }

    /// Reset the cursor to zero without releasing memory.
    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Bytes handed out so far, including alignment padding.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.size
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.buffer.size - self.used
    }

    /// The backing buffer.
    pub fn buffer(&self) -> Buffer {
        self.buffer
    }

    /// Change the capacity of the block in place.
    ///
    /// Used by the virtual heap when more of its reservation is committed
    /// or decommitted. `size` must not cut into the used prefix.
    pub(crate) fn resize(&mut self, size: usize) {
        debug_assert!(size >= self.used);
        self.buffer.size = size;
    }
}
