//! Allocator configuration parameters and size helpers.

use crate::error::ArenaError;

/// `n` kibibytes in bytes.
pub const fn kib(n: usize) -> usize {
    n * 1024
}

/// `n` mebibytes in bytes.
pub const fn mib(n: usize) -> usize {
    kib(n) * 1024
}

/// `n` gibibytes in bytes.
pub const fn gib(n: usize) -> usize {
    mib(n) * 1024
}

/// `n` tebibytes in bytes.
pub const fn tib(n: usize) -> usize {
    gib(n) * 1024
}

/// Configuration for a block-chain [`Arena`](crate::Arena) and for
/// [`LinearAllocator`](crate::LinearAllocator).
///
/// Validated at construction; all values are immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Multiplier applied to the largest existing block when a new block
    /// has to be appended.
    ///
    /// Default: 2. Must be at least 1.
    pub growth_factor: usize,

    /// Alignment substituted for any requested alignment that is not a
    /// power of two.
    ///
    /// Default: 16. Must itself be a power of two.
    pub default_align: usize,

    /// Minimum size in bytes of the first block in the chain.
    ///
    /// Default: 0 (the first block is sized to the first request).
    pub initial_block_size: usize,
}

impl ArenaConfig {
    /// Default growth factor for appended blocks.
    pub const DEFAULT_GROWTH_FACTOR: usize = 2;

    /// Default alignment used to replace non-power-of-two requests.
    pub const DEFAULT_ALIGN: usize = 16;

    /// Create a config with default values.
    pub fn new() -> Self {
        Self {
            growth_factor: Self::DEFAULT_GROWTH_FACTOR,
            default_align: Self::DEFAULT_ALIGN,
            initial_block_size: 0,
        }
    }

    /// Create a config whose first block holds at least `size` bytes.
    pub fn with_initial_block_size(size: usize) -> Self {
        Self {
            initial_block_size: size,
            ..Self::new()
        }
    }

    /// Check the invariants documented on each field.
    pub fn validate(&self) -> Result<(), ArenaError> {
        validate_common(self.growth_factor, self.default_align)
    }

    /// Replace a non-power-of-two alignment with [`Self::default_align`].
    pub fn normalize_align(&self, align: usize) -> usize {
        normalize_align(align, self.default_align)
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for a [`VirtualHeap`](crate::VirtualHeap).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
    /// Bytes of address space reserved up front. This is the hard ceiling
    /// the heap may ever commit; it is rounded up to whole pages.
    pub reserve_size: usize,

    /// Multiplier applied to the committed size on every growth step
    /// after the first commit.
    ///
    /// Default: 2. Must be at least 1.
    pub growth_factor: usize,

    /// Alignment substituted for any requested alignment that is not a
    /// power of two.
    ///
    /// Default: 16. Must itself be a power of two.
    pub default_align: usize,
}

impl HeapConfig {
    /// Default growth factor for commitment.
    pub const DEFAULT_GROWTH_FACTOR: usize = 2;

    /// Create a heap config reserving `reserve_size` bytes.
    pub fn new(reserve_size: usize) -> Self {
        Self {
            reserve_size,
            growth_factor: Self::DEFAULT_GROWTH_FACTOR,
            default_align: ArenaConfig::DEFAULT_ALIGN,
        }
    }

    /// Check the invariants documented on each field.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.reserve_size == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "reserve_size must be non-zero".to_string(),
            });
        }
        validate_common(self.growth_factor, self.default_align)
    }

    /// Replace a non-power-of-two alignment with [`Self::default_align`].
    pub fn normalize_align(&self, align: usize) -> usize {
        normalize_align(align, self.default_align)
    }
}

fn validate_common(growth_factor: usize, default_align: usize) -> Result<(), ArenaError> {
    if growth_factor == 0 {
        return Err(ArenaError::InvalidConfig {
            reason: "growth_factor must be >= 1 (got 0)".to_string(),
        });
    }
    if !default_align.is_power_of_two() {
        return Err(ArenaError::InvalidConfig {
            reason: format!("default_align must be a power of two (got {default_align})"),
        });
    }
    Ok(())
}

fn normalize_align(align: usize, default_align: usize) -> usize {
    if align.is_power_of_two() {
        align
    } else {
        default_align
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_helpers_scale_by_1024() {
        assert_eq!(kib(1), 1024);
        assert_eq!(mib(1), 1024 * 1024);
        assert_eq!(gib(2), 2 * 1024 * 1024 * 1024);
        assert_eq!(tib(1), gib(1024));
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = ArenaConfig::default();
        assert_eq!(config.growth_factor, 2);
        assert_eq!(config.default_align, 16);
        assert_eq!(config.initial_block_size, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_power_of_two_alignment_falls_back_to_default() {
        let config = ArenaConfig::new();
        assert_eq!(config.normalize_align(0), 16);
        assert_eq!(config.normalize_align(3), 16);
        assert_eq!(config.normalize_align(24), 16);
        assert_eq!(config.normalize_align(1), 1);
        assert_eq!(config.normalize_align(64), 64);
    }

    #[test]
    fn zero_growth_factor_is_rejected() {
        let config = ArenaConfig {
            growth_factor: 0,
            ..ArenaConfig::new()
        };
        assert!(matches!(
            config.validate(),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn heap_config_rejects_zero_reservation_and_bad_align() {
        assert!(HeapConfig::new(0).validate().is_err());
        let config = HeapConfig {
            default_align: 12,
            ..HeapConfig::new(mib(1))
        };
        assert!(config.validate().is_err());
        assert!(HeapConfig::new(mib(1)).validate().is_ok());
    }
}
