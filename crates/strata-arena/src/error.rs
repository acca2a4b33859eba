//! Arena-specific error types.
//!
//! Capacity and configuration failures are fatal for the infallible entry
//! points ([`Arena::push`](crate::Arena::push),
//! [`Allocator::allocate`](crate::Allocator::allocate)): they are logged and
//! turned into a panic by [`fatal`]. The `try_*` entry points return the same
//! values instead.

use std::error::Error;
use std::fmt;

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// A request cannot be satisfied by any block, even after growth.
    CapacityExceeded {
        /// Number of bytes requested.
        requested: usize,
        /// Capacity of the largest block available for the request.
        capacity: usize,
    },
    /// Committing more pages would exceed the virtual reservation.
    ReservationExceeded {
        /// Total pages the heap would need committed.
        requested_pages: usize,
        /// Pages reserved when the heap was created.
        reserved_pages: usize,
    },
    /// The platform refused to reserve address space.
    ReserveFailed {
        /// Size of the reservation in bytes.
        size: usize,
    },
    /// The platform refused to commit pages inside a reservation.
    CommitFailed {
        /// Byte offset of the commit within the reservation.
        offset: usize,
        /// Size of the commit in bytes.
        size: usize,
    },
    /// The global allocator could not provide a block.
    OutOfMemory {
        /// Size of the block in bytes.
        size: usize,
        /// Alignment of the block in bytes.
        align: usize,
    },
    /// A configuration value violates its documented invariant.
    InvalidConfig {
        /// Human-readable description of the violation.
        reason: String,
    },
    /// A pointer handed to `rewind` does not lie in any block's live range.
    OutsideBlock {
        /// Address of the offending pointer.
        addr: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "arena capacity exceeded: requested {requested} bytes, capacity {capacity} bytes"
                )
            }
            Self::ReservationExceeded {
                requested_pages,
                reserved_pages,
            } => {
                write!(
                    f,
                    "cannot commit {requested_pages} pages, only {reserved_pages} pages reserved"
                )
            }
            Self::ReserveFailed { size } => {
                write!(f, "failed to reserve {size} bytes of address space")
            }
            Self::CommitFailed { offset, size } => {
                write!(f, "failed to commit {size} bytes at reservation offset {offset}")
            }
            Self::OutOfMemory { size, align } => {
                write!(f, "global allocator refused {size} bytes aligned to {align}")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
            Self::OutsideBlock { addr } => {
                write!(f, "pointer {addr:#x} is outside every block's live range")
            }
        }
    }
}

impl Error for ArenaError {}

/// Terminate on an unrecoverable allocator error.
///
/// These errors mean an allocator was sized wrong by its owner; carrying
/// on with it risks handing out overlapping memory.
#[cold]
#[track_caller]
pub(crate) fn fatal(err: ArenaError) -> ! {
    tracing::error!(error = %err, "fatal allocator error");
    panic!("{err}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_sizes() {
        let err = ArenaError::CapacityExceeded {
            requested: 128,
            capacity: 64,
        };
        let text = err.to_string();
        assert!(text.contains("128"));
        assert!(text.contains("64"));
    }

    #[test]
    fn reservation_display_mentions_pages() {
        let err = ArenaError::ReservationExceeded {
            requested_pages: 300,
            reserved_pages: 256,
        };
        assert_eq!(
            err.to_string(),
            "cannot commit 300 pages, only 256 pages reserved"
        );
    }

    #[test]
    fn out_of_memory_display_names_the_layout() {
        let err = ArenaError::OutOfMemory {
            size: 4096,
            align: 64,
        };
        assert_eq!(
            err.to_string(),
            "global allocator refused 4096 bytes aligned to 64"
        );
    }

    #[test]
    #[should_panic(expected = "arena capacity exceeded")]
    fn fatal_panics_with_display_text() {
        fatal(ArenaError::CapacityExceeded {
            requested: 1,
            capacity: 0,
        });
    }
}
