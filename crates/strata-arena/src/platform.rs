//! Virtual-memory primitives: page size, reserve, commit, decommit, release.
//!
//! [`Platform`] is the seam between the heap and the operating system.
//! [`OsPlatform`] implements it with `mmap`/`mprotect` on Unix and
//! `VirtualAlloc`/`VirtualFree` on Windows. [`Reservation`] wraps one
//! reserved range and only ever commits or decommits inside it, so the
//! unsafe platform calls stay behind a safe, bounds-checked API.

#![allow(unsafe_code)]

use std::ptr::NonNull;

use crate::error::ArenaError;
use crate::raw;

/// A page-aligned range returned by [`Platform::reserve`] or
/// [`Platform::commit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRange {
    /// First byte of the range.
    pub base: NonNull<u8>,
    /// Length of the range in pages.
    pub pages: usize,
}

/// Operating-system virtual memory capability.
///
/// # Safety
///
/// [`Reservation`] and the heaps above it trust every implementation to
/// hand out real mappings:
///
/// - [`page_size`](Platform::page_size) is a non-zero power of two and does
///   not change.
/// - A range returned by [`reserve`](Platform::reserve) is a live mapping of
///   `pages * page_size` bytes starting at `base`, page-aligned, overlapping
///   no other live mapping, until it is passed to
///   [`release`](Platform::release).
/// - After [`commit`](Platform::commit) returns `Some`, every byte of the
///   committed range is readable and writable until it is decommitted or
///   released.
///
/// ```compile_fail,E0200
/// use std::ptr::NonNull;
/// use strata_arena::{PageRange, Platform};
///
/// struct Imaginary;
///
/// impl Platform for Imaginary {
///     fn page_size(&self) -> usize { 4096 }
///     fn reserve(&self, _: usize) -> Option<PageRange> {
///         Some(PageRange { base: NonNull::dangling(), pages: 1 << 20 })
///     }
///     unsafe fn commit(&self, ptr: NonNull<u8>, _: usize) -> Option<PageRange> {
///         Some(PageRange { base: ptr, pages: 1 })
///     }
///     unsafe fn decommit(&self, _: NonNull<u8>, _: usize) {}
///     unsafe fn release(&self, _: PageRange) {}
/// }
/// ```
pub unsafe trait Platform {
    /// Size of one page in bytes. Always a power of two.
    fn page_size(&self) -> usize;

    /// Whole pages needed to hold `bytes` bytes.
    fn pages_for(&self, bytes: usize) -> usize {
        bytes.div_ceil(self.page_size())
    }

    /// Reserve at least `size` bytes of address space without backing
    /// memory. Returns `None` if the OS refuses.
    fn reserve(&self, size: usize) -> Option<PageRange>;

    /// Commit physical pages for `size` bytes (rounded up to pages)
    /// starting at `ptr`. Returns `None` if the OS refuses.
    ///
    /// # Safety
    ///
    /// `ptr` must be page-aligned and `ptr..ptr + size` must lie inside a
    /// range returned by [`Platform::reserve`] on this platform that has not
    /// been released.
    unsafe fn commit(&self, ptr: NonNull<u8>, size: usize) -> Option<PageRange>;

    /// Return the physical pages behind `ptr..ptr + size` to the OS. The
    /// range stays reserved.
    ///
    /// # Safety
    ///
    /// Same contract as [`Platform::commit`]; no live reference may point
    /// into the range.
    unsafe fn decommit(&self, ptr: NonNull<u8>, size: usize);

    /// Release a whole reservation.
    ///
    /// # Safety
    ///
    /// `range` must be exactly a value returned by [`Platform::reserve`],
    /// released at most once, with no live reference into it.
    unsafe fn release(&self, range: PageRange);
}

/// The host operating system's virtual memory.
#[derive(Clone, Copy, Debug)]
pub struct OsPlatform {
    page_size: usize,
}

impl OsPlatform {
    /// Query the page size and create the platform handle.
    pub fn new() -> Self {
        Self {
            page_size: os::page_size(),
        }
    }
}

impl Default for OsPlatform {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: ranges come straight from mmap/VirtualAlloc with no access and are
// made read-write by mprotect/VirtualAlloc(MEM_COMMIT) before `commit`
// returns. `page_size` is queried once from the OS.
unsafe impl Platform for OsPlatform {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn reserve(&self, size: usize) -> Option<PageRange> {
        let pages = self.pages_for(size).max(1);
        let base = os::reserve(pages.checked_mul(self.page_size)?)?;
        Some(PageRange { base, pages })
    }

    unsafe fn commit(&self, ptr: NonNull<u8>, size: usize) -> Option<PageRange> {
        let pages = self.pages_for(size);
        // SAFETY: forwarded from the caller; the length is rounded up to
        // whole pages, which stays inside the reservation because
        // reservations are whole pages too.
        let ok = unsafe { os::commit(ptr, pages * self.page_size) };
        ok.then_some(PageRange { base: ptr, pages })
    }

    unsafe fn decommit(&self, ptr: NonNull<u8>, size: usize) {
        // SAFETY: forwarded from the caller.
        unsafe { os::decommit(ptr, size) }
    }

    unsafe fn release(&self, range: PageRange) {
        // SAFETY: forwarded from the caller.
        unsafe { os::release(range.base, range.pages * self.page_size) }
    }
}

#[cfg(unix)]
mod os {
    use std::ptr::{self, NonNull};

    const FALLBACK_PAGE_SIZE: usize = 4096;

    pub(super) fn page_size() -> usize {
        // SAFETY: sysconf has no preconditions.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size < 1 {
            FALLBACK_PAGE_SIZE
        } else {
            size as usize
        }
    }

    pub(super) fn reserve(size: usize) -> Option<NonNull<u8>> {
        // SAFETY: anonymous private mapping at an address chosen by the
        // kernel; PROT_NONE keeps it inaccessible until committed.
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return None;
        }
        NonNull::new(ptr.cast())
    }

    pub(super) unsafe fn commit(ptr: NonNull<u8>, size: usize) -> bool {
        // SAFETY: the caller guarantees the range is inside a live mapping.
        unsafe { libc::mprotect(ptr.as_ptr().cast(), size, libc::PROT_READ | libc::PROT_WRITE) == 0 }
    }

    pub(super) unsafe fn decommit(ptr: NonNull<u8>, size: usize) {
        // SAFETY: the caller guarantees the range is inside a live mapping
        // and unreferenced.
        unsafe {
            libc::madvise(ptr.as_ptr().cast(), size, libc::MADV_DONTNEED);
            libc::mprotect(ptr.as_ptr().cast(), size, libc::PROT_NONE);
        }
    }

    pub(super) unsafe fn release(ptr: NonNull<u8>, size: usize) {
        // SAFETY: the caller passes exactly one whole mapping.
        unsafe {
            libc::munmap(ptr.as_ptr().cast(), size);
        }
    }
}

#[cfg(windows)]
mod os {
    use std::ffi::c_void;
    use std::mem;
    use std::ptr::{self, NonNull};

    use windows_sys::Win32::System::Memory::{
        VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE, MEM_RESERVE,
        PAGE_NOACCESS, PAGE_READWRITE,
    };
    use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

    pub(super) fn page_size() -> usize {
        // SAFETY: SYSTEM_INFO is plain data, and GetSystemInfo fills it.
        let mut info: SYSTEM_INFO = unsafe { mem::zeroed() };
        unsafe { GetSystemInfo(&mut info) };
        info.dwPageSize as usize
    }

    pub(super) fn reserve(size: usize) -> Option<NonNull<u8>> {
        // SAFETY: reserving at an address chosen by the OS.
        let ptr = unsafe { VirtualAlloc(ptr::null(), size, MEM_RESERVE, PAGE_NOACCESS) };
        NonNull::new(ptr.cast())
    }

    pub(super) unsafe fn commit(ptr: NonNull<u8>, size: usize) -> bool {
        // SAFETY: the caller guarantees the range is inside a live reservation.
        let committed = unsafe {
            VirtualAlloc(ptr.as_ptr() as *const c_void, size, MEM_COMMIT, PAGE_READWRITE)
        };
        !committed.is_null()
    }

    pub(super) unsafe fn decommit(ptr: NonNull<u8>, size: usize) {
        // SAFETY: the caller guarantees the range is inside a live
        // reservation and unreferenced.
        unsafe {
            VirtualFree(ptr.as_ptr().cast(), size, MEM_DECOMMIT);
        }
    }

    pub(super) unsafe fn release(ptr: NonNull<u8>, _size: usize) {
        // SAFETY: the caller passes the base of one whole reservation.
        unsafe {
            VirtualFree(ptr.as_ptr().cast(), 0, MEM_RELEASE);
        }
    }
}

/// One reserved address range and the committed prefix inside it.
///
/// Pages are committed strictly in order from the base, so the committed
/// region is always `[base, base + pages_committed * page_size)`. The whole
/// range is released when the reservation is dropped.
pub struct Reservation<P: Platform> {
    platform: P,
    range: PageRange,
    page_size: usize,
    pages_committed: usize,
}

impl<P: Platform> Reservation<P> {
    /// Reserve at least `size` bytes of address space on `platform`.
    pub fn new(platform: P, size: usize) -> Result<Self, ArenaError> {
        let range = platform
            .reserve(size)
            .ok_or(ArenaError::ReserveFailed { size })?;
        let page_size = platform.page_size();
        tracing::debug!(size, pages = range.pages, page_size, "reserved address space");
        Ok(Self {
            platform,
            range,
            page_size,
            pages_committed: 0,
        })
    }

    /// First byte of the reservation.
    pub fn base(&self) -> NonNull<u8> {
        self.range.base
    }

    /// The platform this reservation was made on.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Page size in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Pages reserved at construction.
    pub fn pages_reserved(&self) -> usize {
        self.range.pages
    }

    /// Pages currently committed.
    pub fn pages_committed(&self) -> usize {
        self.pages_committed
    }

    /// Pages that can still be committed.
    pub fn pages_available(&self) -> usize {
        self.range.pages - self.pages_committed
    }

    /// Reserved size in bytes.
    pub fn reserved_bytes(&self) -> usize {
        self.range.pages * self.page_size
    }

    /// Committed size in bytes.
    pub fn committed_bytes(&self) -> usize {
        self.pages_committed * self.page_size
    }

    /// Commit `pages` more pages directly after the committed prefix.
    ///
    /// Returns `Err(ArenaError::ReservationExceeded)` if that would pass the
    /// reserved page count, or `Err(ArenaError::CommitFailed)` if the OS
    /// refuses.
    pub fn commit_pages(&mut self, pages: usize) -> Result<(), ArenaError> {
        let total = self.pages_committed.saturating_add(pages);
        if total > self.range.pages {
            return Err(ArenaError::ReservationExceeded {
                requested_pages: total,
                reserved_pages: self.range.pages,
            });
        }
        if pages == 0 {
            return Ok(());
        }

        let offset = self.committed_bytes();
        let size = pages * self.page_size;
        let ptr = raw::byte_add(self.range.base, offset);
        // SAFETY: `offset + size <= reserved_bytes()` by the check above,
        // `offset` is a whole number of pages, and the reservation is live
        // until `self` is dropped.
        let committed = unsafe { self.platform.commit(ptr, size) }
            .ok_or(ArenaError::CommitFailed { offset, size })?;
        self.pages_committed += committed.pages.min(pages);
        tracing::debug!(
            pages,
            committed = self.pages_committed,
            reserved = self.range.pages,
            "committed pages"
        );
        Ok(())
    }

    /// Decommit everything past the first `keep_pages` committed pages.
    ///
    /// The caller must not hold references into the decommitted tail.
    pub fn decommit_to(&mut self, keep_pages: usize) {
        if keep_pages >= self.pages_committed {
            return;
        }
        let offset = keep_pages * self.page_size;
        let size = (self.pages_committed - keep_pages) * self.page_size;
        // SAFETY: `[offset, offset + size)` is the committed tail of this
        // live reservation.
        unsafe {
            self.platform
                .decommit(raw::byte_add(self.range.base, offset), size)
        };
        tracing::debug!(
            released = self.pages_committed - keep_pages,
            kept = keep_pages,
            "decommitted pages"
        );
        self.pages_committed = keep_pages;
    }
}

impl<P: Platform> Drop for Reservation<P> {
    fn drop(&mut self) {
        tracing::debug!(
            pages = self.range.pages,
            committed = self.pages_committed,
            "releasing reservation"
        );
        // SAFETY: `range` came from `reserve` and is released only here.
        unsafe { self.platform.release(self.range) }
    }
}
