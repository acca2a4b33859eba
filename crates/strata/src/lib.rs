//! Strata: scoped memory lifetimes for real-time applications.
//!
//! This is the top-level facade crate that re-exports the public API of the
//! Strata sub-crates. For most users, adding `strata` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use strata::prelude::*;
//!
//! // One reservation for the whole application; pages are committed lazily.
//! let heap = VirtualHeap::new(gib(1));
//!
//! // A per-frame scope drawing its blocks from the heap.
//! let mut frame = LinearAllocator::new(kib(64), &heap);
//! for _ in 0..3 {
//!     let particles = frame.alloc_slice_fill(1024, [0.0f32; 3]);
//!     particles[0][1] = 9.81;
//!     let label = frame.copy_string("particles");
//!     assert_eq!(label, "particles");
//!     frame.reset();
//! }
//!
//! // Weak references into a pool of values.
//! struct Mesh;
//! let mut meshes: Registry<&str, Mesh> = Registry::new();
//! let cube = meshes.add("cube.obj");
//! assert_eq!(meshes.get(cube), Some(&"cube.obj"));
//! meshes.remove(cube);
//! assert!(!meshes.is_valid(cube));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`arena`] | `strata-arena` | Platform layer, blocks, arenas, `VirtualHeap`, `LinearAllocator` |
//! | [`handle`] | `strata-handle` | `Handle`, `RawHandle`, `Registry` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Bump allocators and the virtual-memory layer (`strata-arena`).
///
/// [`arena::VirtualHeap`] and [`arena::LinearAllocator`] are also
/// available in the [`prelude`].
pub use strata_arena as arena;

/// Generational handles (`strata-handle`).
///
/// The [`handle::Registry`] issues [`handle::Handle`]s that go stale when
/// their value is removed.
pub use strata_handle as handle;

/// Common imports for typical Strata usage.
///
/// ```rust
/// use strata::prelude::*;
/// ```
pub mod prelude {
    // Allocators
    pub use strata_arena::{Allocator, HeapArena, LinearAllocator, VirtualHeap};

    // Configuration and sizes
    pub use strata_arena::{gib, kib, mib, tib, ArenaConfig, HeapConfig};
    pub use strata_handle::RegistryConfig;

    // Errors
    pub use strata_arena::ArenaError;
    pub use strata_handle::RegistryError;

    // Handles
    pub use strata_handle::{Handle, Registry};
}
