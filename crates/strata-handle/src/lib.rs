//! Generational handles for Strata.
//!
//! A [`Registry`] stores values in dense slots and hands out [`Handle`]s:
//! `(index, generation)` pairs that act as weak references. Removing a value
//! bumps its slot's generation, so stale handles stop resolving instead of
//! aliasing whatever moves into the slot next.
//!
//! ```
//! use strata_handle::Registry;
//!
//! let mut textures: Registry<&str> = Registry::new();
//! let albedo = textures.add("albedo.png");
//! assert_eq!(textures.get(albedo), Some(&"albedo.png"));
//!
//! textures.remove(albedo);
//! assert!(!textures.is_valid(albedo));
//! assert_eq!(textures.get(albedo), None);
//! ```
//!
//! Invalid handles are never fatal. `get`, `get_mut` and `remove` log a
//! `tracing` warning and return `None`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handle;
pub mod registry;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use handle::{Handle, RawHandle};
pub use registry::Registry;
