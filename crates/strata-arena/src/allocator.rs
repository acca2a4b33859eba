//! The allocation capability shared by every bump allocator in the crate.
//!
//! [`Allocator`] takes `&self` so several dependents can draw from one
//! backing allocator at once; implementors use interior mutability and are
//! therefore `!Sync`. Resetting needs `&mut self`, which the borrow checker
//! only grants once every slice handed out by the allocator, and every
//! allocator layered on top of it, is gone.

use std::mem;
use std::ptr::NonNull;

use crate::error::{fatal, ArenaError};
use crate::raw;

/// Arena-style allocation: bump only, reclaimed in bulk.
///
/// `free` is a no-op and `reallocate` is a fresh allocation. Both exist so
/// that callers can be written against this trait without caring whether
/// the allocator behind it ever frees.
///
/// # Safety
///
/// The provided methods write through the pointers `try_allocate` returns
/// and hand them out as `&mut [T]` and `&str`. An implementor must
/// guarantee that every `Ok(ptr)` from `try_allocate(size, align)`:
///
/// - is aligned to `align` (after replacing a non-power-of-two `align`
///   with the implementor's default alignment),
/// - is valid for reads and writes of `size` bytes,
/// - does not overlap any other allocation still reachable from `&self`,
/// - stays valid for as long as the `&self` borrow it came from, which in
///   practice means memory is only reclaimed through `&mut self`.
///
/// A safe impl is rejected:
///
/// ```compile_fail,E0200
/// use std::ptr::NonNull;
/// use strata_arena::{Allocator, ArenaError};
///
/// struct Dangling;
///
/// impl Allocator for Dangling {
///     fn try_allocate(&self, _size: usize, _align: usize) -> Result<NonNull<u8>, ArenaError> {
///         Ok(NonNull::dangling())
///     }
/// }
/// ```
#[allow(unsafe_code)]
pub unsafe trait Allocator {
    /// Allocate `size` bytes aligned to `align`.
    ///
    /// A non-power-of-two `align` is replaced by the allocator's default
    /// alignment. Returns `Err` when the allocator cannot grow enough.
    fn try_allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, ArenaError>;

    /// Allocate `size` bytes aligned to `align`.
    ///
    /// # Panics
    ///
    /// Panics if the allocator cannot satisfy the request.
    #[track_caller]
    fn allocate(&self, size: usize, align: usize) -> NonNull<u8> {
        self.try_allocate(size, align).unwrap_or_else(|err| fatal(err))
    }

    /// Equivalent to [`Allocator::allocate`]. The old allocation is neither
    /// grown in place nor copied.
    #[track_caller]
    fn reallocate(&self, _ptr: NonNull<u8>, size: usize, align: usize) -> NonNull<u8> {
        self.allocate(size, align)
    }

    /// No-op. Memory is reclaimed only by resetting the allocator.
    fn free(&self, _ptr: NonNull<u8>) {}

    /// Copy `s` into the allocator with a trailing NUL byte (`len + 1` bytes
    /// in total) and return the copy.
    #[track_caller]
    #[allow(unsafe_code)]
    fn copy_string(&self, s: &str) -> &str {
        let ptr = self.allocate(s.len() + 1, 1);
        // SAFETY: `ptr` is a fresh, exclusive allocation of `s.len() + 1`
        // bytes that lives as long as `&self`.
        unsafe {
            raw::copy_str(ptr, s)
        }
    }

    /// Allocate uninitialised storage for `count` values of `T`.
    ///
    /// # Panics
    ///
    /// Panics if `count * size_of::<T>()` overflows or cannot be satisfied.
    #[track_caller]
    fn allocate_array<T>(&self, count: usize) -> NonNull<T>
    where
        Self: Sized,
    {
        self.allocate(array_size::<T>(count), mem::align_of::<T>()).cast()
    }

    /// Allocate `len` copies of `value` and return them as a mutable slice.
    ///
    /// # Panics
    ///
    /// Panics if the allocation cannot be satisfied.
    #[track_caller]
    #[allow(unsafe_code, clippy::mut_from_ref)]
    fn alloc_slice_fill<T: Copy>(&self, len: usize, value: T) -> &mut [T]
    where
        Self: Sized,
    {
        let ptr = self.allocate(array_size::<T>(len), mem::align_of::<T>());
        // SAFETY: `ptr` is a fresh allocation aligned for `T` with room for
        // `len` values. Allocations never overlap, and the slice borrows
        // `self`, so no reset can happen while it is alive.
        unsafe {
            raw::fill_slice(ptr, len, value)
        }
    }
}

#[track_caller]
fn array_size<T>(count: usize) -> usize {
    match mem::size_of::<T>().checked_mul(count) {
        Some(size) => size,
        None => fatal(ArenaError::CapacityExceeded {
            requested: usize::MAX,
            capacity: isize::MAX as usize,
        }),
    }
}

// SAFETY: every allocation comes from `A`, which upholds the contract; the
// reference lives no longer than the borrow of `A`.
#[allow(unsafe_code)]
unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    fn try_allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, ArenaError> {
        (**self).try_allocate(size, align)
    }

    fn free(&self, ptr: NonNull<u8>) {
        (**self).free(ptr)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::arena::HeapArena;

    struct ArenaCell(RefCell<HeapArena>);

    // SAFETY: `try_push` hands out aligned, disjoint ranges of blocks the
    // arena owns until it is reset or dropped, both of which need `&mut`.
    #[allow(unsafe_code)]
    unsafe impl Allocator for ArenaCell {
        fn try_allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, ArenaError> {
            self.0.borrow_mut().try_push(size, align)
        }
    }

    #[test]
    fn copy_string_appends_nul() {
        let alloc = ArenaCell(RefCell::new(HeapArena::on_heap(256)));
        let copy = alloc.copy_string("strata");
        assert_eq!(copy, "strata");
        assert_eq!(alloc.0.borrow().used(), 7);
    }

    #[test]
    fn slice_fill_is_aligned_and_initialised() {
        let alloc = ArenaCell(RefCell::new(HeapArena::on_heap(256)));
        alloc.allocate(1, 1);
        let values = alloc.alloc_slice_fill(10, 0xABCD_u64);
        assert_eq!(values.as_ptr() as usize % mem::align_of::<u64>(), 0);
        assert!(values.iter().all(|&v| v == 0xABCD));
        values[3] = 1;
        assert_eq!(values[3], 1);
    }

    #[test]
    fn array_storage_is_disjoint() {
        let alloc = ArenaCell(RefCell::new(HeapArena::on_heap(1024)));
        let a = alloc.allocate_array::<u32>(16);
        let b = alloc.allocate_array::<u32>(16);
        assert!(b.as_ptr() as usize >= a.as_ptr() as usize + 64);
    }

    #[test]
    fn reallocate_returns_fresh_memory() {
        let alloc = ArenaCell(RefCell::new(HeapArena::on_heap(1024)));
        let a = alloc.allocate(32, 8);
        alloc.free(a);
        let b = alloc.reallocate(a, 64, 8);
        assert_ne!(a, b);
    }

    #[test]
    #[should_panic(expected = "arena capacity exceeded")]
    fn oversized_array_panics() {
        let alloc = ArenaCell(RefCell::new(HeapArena::on_heap(64)));
        alloc.allocate_array::<u64>(usize::MAX / 4);
    }

    #[test]
    fn successive_slice_fills_never_alias() {
        let alloc = ArenaCell(RefCell::new(HeapArena::on_heap(16)));
        let x = alloc.alloc_slice_fill(4, 1u64);
        let y = alloc.alloc_slice_fill(4, 2u64);
        assert_ne!(x.as_ptr(), y.as_ptr());
        let x_end = x.as_ptr() as usize + 4 * mem::size_of::<u64>();
        let y_end = y.as_ptr() as usize + 4 * mem::size_of::<u64>();
        assert!(x_end <= y.as_ptr() as usize || y_end <= x.as_ptr() as usize);
        x[0] = 7;
        assert_eq!(x, [7, 1, 1, 1]);
        assert_eq!(y, [2, 2, 2, 2]);
    }

    fn bump_through<A: Allocator>(alloc: A) {
        alloc.allocate(8, 8);
    }

    #[test]
    fn references_forward_to_the_allocator() {
        let alloc = ArenaCell(RefCell::new(HeapArena::on_heap(64)));
        let by_ref: &dyn Allocator = &alloc;
        by_ref.allocate(8, 8);
        bump_through(&alloc);
        assert_eq!(alloc.0.borrow().used(), 16);
    }
}
