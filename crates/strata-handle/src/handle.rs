//! Generational handles.
//!
//! A handle is an `(index, generation)` pair naming one occupancy of one
//! registry slot. It owns nothing; once the slot is removed its generation
//! moves on and the handle stops resolving.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Untyped `(index, generation)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawHandle {
    /// Slot index in the registry.
    pub index: u32,
    /// Generation of the slot when the handle was issued.
    pub generation: u32,
}

impl RawHandle {
    /// The sentinel handle. Never issued and never valid.
    pub const INVALID: Self = Self {
        index: u32::MAX,
        generation: u32::MAX,
    };

    /// Construct a handle from its parts.
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Whether this is [`RawHandle::INVALID`].
    pub const fn is_invalid(self) -> bool {
        self.index == u32::MAX && self.generation == u32::MAX
    }

    /// Pack into 64 bits: generation in the high half, index in the low
    /// half.
    pub const fn to_u64(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    /// Inverse of [`RawHandle::to_u64`].
    pub const fn from_u64(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl Default for RawHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            f.write_str("invalid")
        } else {
            write!(f, "{}v{}", self.index, self.generation)
        }
    }
}

/// A typed handle issued by a [`Registry`](crate::Registry) with marker `M`.
///
/// `M` only keeps handles from different registries apart at compile time;
/// it is never stored, and `Handle<M>` is `Copy` whatever `M` is.
pub struct Handle<M> {
    raw: RawHandle,
    _marker: PhantomData<fn() -> M>,
}

impl<M> Handle<M> {
    /// The sentinel handle.
    pub const INVALID: Self = Self::from_raw(RawHandle::INVALID);

    /// Wrap a raw handle.
    pub const fn from_raw(raw: RawHandle) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// The untyped pair.
    pub fn raw(self) -> RawHandle {
        self.raw
    }

    /// Slot index.
    pub fn index(self) -> u32 {
        self.raw.index
    }

    /// Slot generation at issue time.
    pub fn generation(self) -> u32 {
        self.raw.generation
    }

    /// Whether this is the sentinel handle.
    pub fn is_invalid(self) -> bool {
        self.raw.is_invalid()
    }

    /// See [`RawHandle::to_u64`].
    pub fn to_u64(self) -> u64 {
        self.raw.to_u64()
    }

    /// See [`RawHandle::from_u64`].
    pub const fn from_u64(bits: u64) -> Self {
        Self::from_raw(RawHandle::from_u64(bits))
    }
}

impl<M> Clone for Handle<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Handle<M> {}

impl<M> PartialEq for Handle<M> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<M> Eq for Handle<M> {}

impl<M> Hash for Handle<M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<M> Default for Handle<M> {
    fn default() -> Self {
        Self::INVALID
    }
}

impl<M> fmt::Debug for Handle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("index", &self.raw.index)
            .field("generation", &self.raw.generation)
            .finish()
    }
}

impl<M> fmt::Display for Handle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

impl<M> From<Handle<M>> for RawHandle {
    fn from(handle: Handle<M>) -> Self {
        handle.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Texture;

    #[test]
    fn u64_packs_generation_high() {
        let raw = RawHandle::new(7, 3);
        assert_eq!(raw.to_u64(), (3u64 << 32) | 7);
        assert_eq!(RawHandle::from_u64(raw.to_u64()), raw);
    }

    #[test]
    fn invalid_is_all_ones() {
        assert_eq!(RawHandle::INVALID.to_u64(), u64::MAX);
        assert!(RawHandle::default().is_invalid());
        assert!(Handle::<Texture>::default().is_invalid());
        assert!(!RawHandle::new(u32::MAX, 0).is_invalid());
    }

    #[test]
    fn typed_handles_are_copy_without_marker_bounds() {
        let a = Handle::<Texture>::from_raw(RawHandle::new(1, 2));
        let b = a;
        assert_eq!(a, b);
        assert_eq!(a.index(), 1);
        assert_eq!(a.generation(), 2);
    }

    #[test]
    fn display_and_debug() {
        let h = Handle::<Texture>::from_raw(RawHandle::new(4, 9));
        assert_eq!(h.to_string(), "4v9");
        assert_eq!(format!("{h:?}"), "Handle { index: 4, generation: 9 }");
        assert_eq!(Handle::<Texture>::INVALID.to_string(), "invalid");
    }
}
