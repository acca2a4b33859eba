//! Registry sizing parameters.

use crate::error::RegistryError;
use crate::handle::RawHandle;

/// Configuration for a [`Registry`](crate::Registry).
///
/// Validated at construction; all values are immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Number of slots allocated up front. Capacity doubles from here
    /// whenever the free list runs low.
    ///
    /// Default: 1024. Must be non-zero and at most [`RegistryConfig::MAX_SLOTS`].
    pub reserve_size: usize,

    /// Growth is triggered when an `add` finds fewer free indices than
    /// this. A larger value delays slot reuse, so stale handles stay
    /// invalid for longer before their index is recycled.
    ///
    /// Default: 1024. Must be at most [`RegistryConfig::MAX_SLOTS`].
    pub min_free_indices: usize,
}

impl RegistryConfig {
    /// Default number of slots allocated at construction.
    pub const DEFAULT_RESERVE_SIZE: usize = 1024;

    /// Default free-list low-water mark.
    pub const DEFAULT_MIN_FREE_INDICES: usize = 1024;

    /// Largest number of slots a registry can hold. The index
    /// `u32::MAX` is reserved for [`RawHandle::INVALID`].
    pub const MAX_SLOTS: usize = RawHandle::INVALID.index as usize;

    /// Create a config with default values.
    pub fn new() -> Self {
        Self {
            reserve_size: Self::DEFAULT_RESERVE_SIZE,
            min_free_indices: Self::DEFAULT_MIN_FREE_INDICES,
        }
    }

    /// Check the invariants documented on each field.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.reserve_size == 0 {
            return Err(RegistryError::InvalidConfig {
                reason: "reserve_size must be non-zero".to_string(),
            });
        }
        if self.reserve_size > Self::MAX_SLOTS {
            return Err(RegistryError::InvalidConfig {
                reason: format!(
                    "reserve_size {} exceeds the {} slot limit",
                    self.reserve_size,
                    Self::MAX_SLOTS
                ),
            });
        }
        if self.min_free_indices > Self::MAX_SLOTS {
            return Err(RegistryError::InvalidConfig {
                reason: format!(
                    "min_free_indices {} exceeds the {} slot limit",
                    self.min_free_indices,
                    Self::MAX_SLOTS
                ),
            });
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new()
    }
}
