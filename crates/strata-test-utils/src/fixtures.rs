//! Instrumented platform and allocator wrappers.
//!
//! - [`CountingPlatform`] forwards to a real [`Platform`] and counts every
//!   call, so tests can assert on reserve/commit/decommit traffic.
//! - [`RecordingAllocator`] forwards to another [`Allocator`] and records
//!   each request, so tests can check how nested allocators draw blocks.

#![allow(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::ptr::NonNull;
use std::rc::Rc;

use strata_arena::{Allocator, ArenaError, OsPlatform, PageRange, Platform};

/// Call counts shared between a [`CountingPlatform`] and the test that
/// created it.
#[derive(Debug, Default)]
pub struct PlatformCounters {
    pub reserves: Cell<usize>,
    pub commits: Cell<usize>,
    pub decommits: Cell<usize>,
    pub releases: Cell<usize>,
    pub pages_committed: Cell<usize>,
    pub pages_decommitted: Cell<usize>,
}

fn bump(cell: &Cell<usize>, by: usize) {
    cell.set(cell.get() + by);
}

/// A [`Platform`] that counts the calls it forwards.
pub struct CountingPlatform<P: Platform = OsPlatform> {
    inner: P,
    counters: Rc<PlatformCounters>,
}

impl CountingPlatform<OsPlatform> {
    pub fn new() -> Self {
        Self::wrap(OsPlatform::new())
    }
}

impl Default for CountingPlatform<OsPlatform> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Platform> CountingPlatform<P> {
    pub fn wrap(inner: P) -> Self {
        Self {
            inner,
            counters: Rc::default(),
        }
    }

    /// A handle to the counters that outlives moving the platform into a
    /// heap.
    pub fn counters(&self) -> Rc<PlatformCounters> {
        Rc::clone(&self.counters)
    }
}

// SAFETY: every call forwards to `inner` unchanged; only counters are added.
unsafe impl<P: Platform> Platform for CountingPlatform<P> {
    fn page_size(&self) -> usize {
        self.inner.page_size()
    }

    fn reserve(&self, size: usize) -> Option<PageRange> {
        bump(&self.counters.reserves, 1);
        self.inner.reserve(size)
    }

    unsafe fn commit(&self, ptr: NonNull<u8>, size: usize) -> Option<PageRange> {
        bump(&self.counters.commits, 1);
        // SAFETY: forwarded under the caller's contract.
        let range = unsafe { self.inner.commit(ptr, size) }?;
        bump(&self.counters.pages_committed, range.pages);
        Some(range)
    }

    unsafe fn decommit(&self, ptr: NonNull<u8>, size: usize) {
        bump(&self.counters.decommits, 1);
        bump(&self.counters.pages_decommitted, self.pages_for(size));
        // SAFETY: forwarded under the caller's contract.
        unsafe { self.inner.decommit(ptr, size) }
    }

    unsafe fn release(&self, range: PageRange) {
        bump(&self.counters.releases, 1);
        // SAFETY: forwarded under the caller's contract.
        unsafe { self.inner.release(range) }
    }
}

/// An [`Allocator`] that records every request before forwarding it.
pub struct RecordingAllocator<'a, A: Allocator + ?Sized> {
    inner: &'a A,
    requests: RefCell<Vec<(usize, usize)>>,
    frees: Cell<usize>,
}

impl<'a, A: Allocator + ?Sized> RecordingAllocator<'a, A> {
    pub fn new(inner: &'a A) -> Self {
        Self {
            inner,
            requests: RefCell::new(Vec::new()),
            frees: Cell::new(0),
        }
    }

    /// `(size, align)` of every request, in order.
    pub fn requests(&self) -> Vec<(usize, usize)> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn free_count(&self) -> usize {
        self.frees.get()
    }
}

// SAFETY: allocations are exactly those of `inner`, which upholds the
// contract for at least as long as this borrow.
unsafe impl<A: Allocator + ?Sized> Allocator for RecordingAllocator<'_, A> {
    fn try_allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, ArenaError> {
        self.requests.borrow_mut().push((size, align));
        self.inner.try_allocate(size, align)
    }

    fn free(&self, ptr: NonNull<u8>) {
        bump(&self.frees, 1);
        self.inner.free(ptr);
    }
}
