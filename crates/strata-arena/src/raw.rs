//! Low-level primitives for arena memory operations.
//!
//! Apart from the OS calls in [`crate::platform`], every `unsafe` operation
//! in this crate lives here, each with a mandatory `// SAFETY:` comment.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::ptr::{self, NonNull};
use std::slice;

/// `ptr + offset` for an offset that stays inside the region `ptr` points into.
pub(crate) fn byte_add(ptr: NonNull<u8>, offset: usize) -> NonNull<u8> {
    // SAFETY: offsets inside a live region never wrap the address space,
    // so the result of adding them to a non-null pointer is non-null.
    unsafe { NonNull::new_unchecked(ptr.as_ptr().wrapping_add(offset)) }
}

/// An owned allocation from the global heap, freed on drop.
pub(crate) struct HeapAllocation {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl HeapAllocation {
    /// Allocate at least `size` bytes aligned to `align`.
    ///
    /// Returns `None` if the layout is invalid or the heap is exhausted.
    pub(crate) fn new(size: usize, align: usize) -> Option<Self> {
        let layout = Layout::from_size_align(size.max(1), align).ok()?;
        // SAFETY: `layout` has a non-zero size.
        let ptr = NonNull::new(unsafe { alloc::alloc(layout) })?;
        Some(Self { ptr, layout })
    }

    pub(crate) fn ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    pub(crate) fn size(&self) -> usize {
        self.layout.size()
    }
}

impl Drop for HeapAllocation {
    fn drop(&mut self) {
        // SAFETY: `ptr` was returned by `alloc::alloc` with exactly `layout`
        // and is freed only here.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

/// Write `len` copies of `value` starting at `ptr` and return them as a slice.
///
/// # Safety
///
/// `ptr` must be aligned for `T`, valid for writes of
/// `len * size_of::<T>()` bytes, and not referenced by anything else for `'a`.
pub(crate) unsafe fn fill_slice<'a, T: Copy>(ptr: NonNull<u8>, len: usize, value: T) -> &'a mut [T] {
    let base = ptr.cast::<T>().as_ptr();
    for i in 0..len {
        // SAFETY: `i < len`, so `base + i` is inside the caller's region.
        unsafe { base.add(i).write(value) };
    }
    // SAFETY: all `len` elements were initialised above; exclusivity is
    // guaranteed by the caller.
    unsafe { slice::from_raw_parts_mut(base, len) }
}

/// Copy `s` to `dst`, append a NUL byte, and return the copy (without the NUL).
///
/// # Safety
///
/// `dst` must be valid for writes of `s.len() + 1` bytes and not referenced
/// by anything else for `'a`.
pub(crate) unsafe fn copy_str<'a>(dst: NonNull<u8>, s: &str) -> &'a str {
    let len = s.len();
    let dst = dst.as_ptr();
    // SAFETY: `dst` has room for `len + 1` bytes and is a fresh arena
    // allocation, so it cannot overlap `s`.
    unsafe {
        ptr::copy_nonoverlapping(s.as_ptr(), dst, len);
        dst.add(len).write(0);
    }
    // SAFETY: the bytes were copied verbatim from a `&str`, so they are
    // valid UTF-8.
    unsafe { std::str::from_utf8_unchecked(slice::from_raw_parts(dst, len)) }
}
