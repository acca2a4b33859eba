//! Test utilities for Strata development.
//!
//! Provides instrumented stand-ins for the arena crate's seams
//! ([`CountingPlatform`] for [`Platform`](strata_arena::Platform),
//! [`RecordingAllocator`] for [`Allocator`](strata_arena::Allocator)) and a
//! one-call logging setup for tests.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{CountingPlatform, PlatformCounters, RecordingAllocator};

use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness's captured stdout.
///
/// Filtered by `RUST_LOG`. Safe to call from every test; only the first
/// call installs the subscriber.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
