//! A bump allocator over one large virtual address reservation.
//!
//! [`VirtualHeap`] reserves its whole address range up front and commits
//! pages lazily, in order from the base. It holds a single [`Block`] whose
//! buffer is always exactly the committed prefix of the reservation, so
//! pointers handed out never move when the heap grows.
//!
//! ```text
//! base                       committed                       reserved
//!  │◄──────── used ────────►│                                     │
//!  ├────────────────────────┼──────────────┬──────────────────────┤
//!  │   live allocations     │  committed   │  reserved, no access │
//!  └────────────────────────┴──────────────┴──────────────────────┘
//! ```
//!
//! Growth is geometric. The first commit is exactly what the first request
//! needs; every later commit is `growth_factor * max(committed, size + align)`
//! bytes, clamped to what is left of the reservation. Running out of
//! reservation is fatal.

use std::cell::RefCell;
use std::ptr::NonNull;

use crate::allocator::Allocator;
use crate::block::{Block, Buffer};
use crate::config::HeapConfig;
use crate::error::{fatal, ArenaError};
use crate::platform::{OsPlatform, Platform, Reservation};

struct HeapState<P: Platform> {
    reservation: Reservation<P>,
    block: Block,
}

/// A growable bump allocator over reserved virtual memory.
///
/// Typically created once at startup with a multi-GiB reservation, then
/// used as the backing allocator for scoped
/// [`LinearAllocator`](crate::LinearAllocator)s.
pub struct VirtualHeap<P: Platform = OsPlatform> {
    state: RefCell<HeapState<P>>,
    config: HeapConfig,
}

impl VirtualHeap<OsPlatform> {
    /// Reserve `reserve_size` bytes (rounded up to whole pages) of address
    /// space. Nothing is committed yet.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses the reservation.
    #[track_caller]
    pub fn new(reserve_size: usize) -> Self {
        Self::try_new(reserve_size).unwrap_or_else(|err| fatal(err))
    }

    /// Like [`VirtualHeap::new`], returning the error instead of panicking.
    pub fn try_new(reserve_size: usize) -> Result<Self, ArenaError> {
        Self::with_platform(OsPlatform::new(), HeapConfig::new(reserve_size))
    }
}

impl<P: Platform> VirtualHeap<P> {
    /// Reserve address space on `platform` as described by `config`.
    pub fn with_platform(platform: P, config: HeapConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        let reservation = Reservation::new(platform, config.reserve_size)?;
        let block = Block::new(Buffer::new(reservation.base(), 0));
        Ok(Self {
            state: RefCell::new(HeapState { reservation, block }),
            config,
        })
    }

    /// Bump-allocate `size` bytes aligned to `align`, committing more pages
    /// if the committed prefix is too small.
    ///
    /// Returns `Err(ArenaError::ReservationExceeded)` if the reservation
    /// cannot hold the request.
    pub fn allocate_data(&self, size: usize, align: usize) -> Result<NonNull<u8>, ArenaError> {
        let align = self.config.normalize_align(align);
        let mut state = self.state.borrow_mut();
        if let Some(ptr) = state.block.push(size, align) {
            return Ok(ptr);
        }
        state.grow(size, align, self.config.growth_factor)?;
        let capacity = state.block.capacity();
        state
            .block
            .push(size, align)
            .ok_or(ArenaError::CapacityExceeded {
                requested: size,
                capacity,
            })
    }

    /// Mark the heap empty. Committed pages are kept.
    pub fn reset(&mut self) {
        let state = self.state.get_mut();
        state.block.reset();
        tracing::trace!(
            committed = state.reservation.pages_committed(),
            "virtual heap reset"
        );
    }

    /// Move the cursor back to `ptr`, discarding everything allocated at or
    /// after it.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is outside `[base, base + used]`.
    #[track_caller]
    pub fn rewind(&mut self, ptr: NonNull<u8>) {
        if let Err(err) = self.state.get_mut().block.rewind(ptr) {
            fatal(err);
        }
    }

    /// Decommit every page past the one holding the last used byte.
    pub fn trim(&mut self) {
        let state = self.state.get_mut();
        let page_size = state.reservation.page_size();
        let keep = state.block.used().div_ceil(page_size);
        state.reservation.decommit_to(keep);
        let committed = state.reservation.committed_bytes();
        state.block.resize(committed);
    }

    /// Whether `ptr` lies in `[base, base + used]`.
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        self.state.borrow().block.contains(ptr)
    }

    /// Pages reserved at construction.
    pub fn pages_reserved(&self) -> usize {
        self.state.borrow().reservation.pages_reserved()
    }

    /// Pages committed so far.
    pub fn pages_committed(&self) -> usize {
        self.state.borrow().reservation.pages_committed()
    }

    /// Committed size in bytes. Equal to the block's capacity.
    pub fn committed_bytes(&self) -> usize {
        self.state.borrow().reservation.committed_bytes()
    }

    /// Bytes handed out since the last reset, including padding.
    pub fn used(&self) -> usize {
        self.state.borrow().block.used()
    }

    /// First byte of the reservation.
    pub fn base(&self) -> NonNull<u8> {
        self.state.borrow().reservation.base()
    }

    /// The heap configuration.
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }
}

impl<P: Platform> HeapState<P> {
    fn grow(&mut self, size: usize, align: usize, growth_factor: usize) -> Result<(), ArenaError> {
        let page_size = self.reservation.page_size();
        let available = self.reservation.pages_available();
        let committed = self.reservation.committed_bytes();

        let needed_end = self
            .block
            .end_offset_for(size, align)
            .ok_or(ArenaError::CapacityExceeded {
                requested: size,
                capacity: self.reservation.reserved_bytes(),
            })?;
        let shortfall = needed_end.saturating_sub(committed);
        let min_pages = shortfall.div_ceil(page_size);
        if min_pages > available {
            return Err(ArenaError::ReservationExceeded {
                requested_pages: self.reservation.pages_committed() + min_pages,
                reserved_pages: self.reservation.pages_reserved(),
            });
        }

        let target = if committed == 0 {
            shortfall
        } else {
            committed
                .max(size.saturating_add(align))
                .saturating_mul(growth_factor)
                .max(shortfall)
        };
        let pages = target.div_ceil(page_size).clamp(min_pages, available);
        self.reservation.commit_pages(pages)?;
        self.block.resize(self.reservation.committed_bytes());
        Ok(())
    }
}

// SAFETY: `allocate_data` bumps a cursor over committed pages of a live
// reservation, so ranges are aligned, writable and disjoint. Pages are only
// decommitted by `trim` and the cursor only moves back by `reset`/`rewind`,
// all of which take `&mut self`.
#[allow(unsafe_code)]
unsafe impl<P: Platform> Allocator for VirtualHeap<P> {
    fn try_allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, ArenaError> {
        self.allocate_data(size, align)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{gib, kib, mib};

    #[test]
    fn nothing_is_committed_up_front() {
        let heap = VirtualHeap::new(mib(1));
        assert_eq!(heap.pages_committed(), 0);
        assert_eq!(heap.committed_bytes(), 0);
        assert!(heap.pages_reserved() >= 1);
    }

    #[test]
    fn first_commit_is_only_what_is_needed() {
        let heap = VirtualHeap::new(mib(16));
        heap.allocate(10, 8);
        assert_eq!(heap.pages_committed(), 1);
    }

    #[test]
    fn later_commits_grow_geometrically() {
        let heap = VirtualHeap::new(mib(64));
        let page = OsPlatform::new().page_size();
        heap.allocate(page, 8);
        assert_eq!(heap.pages_committed(), 1);
        heap.allocate(1, 1);
        // 2 * max(page, 1 + 1) = two more pages.
        assert_eq!(heap.pages_committed(), 3);
    }

    #[test]
    fn end_to_end_ints_then_reset() {
        let heap = VirtualHeap::new(gib(1));
        let small = heap.alloc_slice_fill(1200, 0i32);
        small[1199] = 42;
        assert_eq!(small[1199], 42);
        let first = small.as_ptr() as usize;

        let large = heap.allocate_array::<i32>(1_000_000);
        assert!(large.as_ptr() as usize >= first + 1200 * 4);

        let mut heap = heap;
        heap.reset();
        assert_eq!(heap.used(), 0);
        assert_eq!(heap.allocate_array::<i32>(1200).as_ptr() as usize, first);
        assert_eq!(heap.allocate_array::<i32>(1_000_000), large);
    }

    #[test]
    fn allocations_are_writable_across_growth() {
        let heap = VirtualHeap::new(mib(8));
        let a = heap.alloc_slice_fill(kib(4), 1u8);
        let b = heap.alloc_slice_fill(kib(64), 2u8);
        let c = heap.alloc_slice_fill(kib(512), 3u8);
        assert!(a.iter().all(|&x| x == 1));
        assert!(b.iter().all(|&x| x == 2));
        assert!(c.iter().all(|&x| x == 3));
    }

    #[test]
    fn growth_is_clamped_to_the_reservation() {
        let page = OsPlatform::new().page_size();
        let heap = VirtualHeap::new(page * 4);
        heap.allocate(page * 3, 1);
        // Geometric growth would want 6 more pages; only 1 is left.
        heap.allocate(page / 2, 1);
        assert_eq!(heap.pages_committed(), 4);
    }

    #[test]
    #[should_panic(expected = "pages reserved")]
    fn exceeding_the_reservation_is_fatal() {
        let heap = VirtualHeap::new(mib(1));
        heap.allocate(mib(2), 16);
    }

    #[test]
    fn try_allocate_reports_the_ceiling() {
        let heap = VirtualHeap::new(mib(1));
        assert!(matches!(
            heap.try_allocate(mib(2), 16),
            Err(ArenaError::ReservationExceeded { .. })
        ));
        // A failed request leaves the heap usable.
        heap.allocate(64, 16);
    }

    #[test]
    fn trim_decommits_the_unused_tail() {
        let mut heap = VirtualHeap::new(mib(16));
        let page = OsPlatform::new().page_size();
        heap.allocate(page, 1);
        heap.allocate(page * 8, 1);
        let grown = heap.pages_committed();
        heap.reset();
        heap.allocate(10, 1);
        heap.trim();
        assert!(heap.pages_committed() < grown);
        assert_eq!(heap.pages_committed(), 1);
        // Growing again after a trim recommits.
        heap.allocate(page * 2, 1);
        assert!(heap.pages_committed() >= 3);
    }

    #[test]
    fn rewind_reuses_the_tail() {
        let mut heap = VirtualHeap::new(mib(1));
        heap.allocate(32, 16);
        let mark = heap.allocate(64, 16);
        heap.allocate(128, 16);
        heap.rewind(mark);
        assert_eq!(heap.used(), 32);
        assert_eq!(heap.allocate(64, 16), mark);
    }

    #[test]
    fn non_power_of_two_alignment_uses_default() {
        let heap = VirtualHeap::new(mib(1));
        heap.allocate(1, 1);
        let p = heap.allocate(8, 24);
        assert_eq!(p.as_ptr() as usize % 16, 0);
    }
}
