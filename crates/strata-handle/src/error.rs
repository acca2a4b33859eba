//! Registry error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur when building or growing a registry.
///
/// Stale or invalid handles are not errors: lookups return `None` and log a
/// warning instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// A configuration value violates its documented invariant.
    InvalidConfig {
        /// Human-readable description of the violation.
        reason: String,
    },
    /// Every index is occupied or retired and the registry cannot grow.
    Exhausted {
        /// Number of slots in the registry.
        capacity: usize,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid registry config: {reason}"),
            Self::Exhausted { capacity } => {
                write!(f, "registry exhausted: all {capacity} slots in use or retired")
            }
        }
    }
}

impl Error for RegistryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_capacity() {
        let err = RegistryError::Exhausted { capacity: 8 };
        assert_eq!(err.to_string(), "registry exhausted: all 8 slots in use or retired");
    }
}
