//! Slot registry with generation counters.
//!
//! Values live in a dense slot array. Each slot carries a generation that
//! is bumped every time its value is removed, so handles issued for an
//! earlier occupant stop resolving. Freed indices are queued FIFO, which
//! spreads reuse across the whole array instead of hammering one slot.
//!
//! A slot whose generation reaches `u32::MAX` (the sentinel generation) is
//! retired for good rather than recycled. Wrapping back to 0 would let a
//! handle from the slot's first occupant resolve again.

use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::handle::{Handle, RawHandle};

/// A pool of `T` addressed by [`Handle<M>`].
///
/// `M` defaults to `T`; pick a separate marker to keep handles of two
/// registries holding the same value type from being mixed up.
///
/// Storage grows (doubling) and never shrinks.
pub struct Registry<T, M = T> {
    data: Vec<Option<T>>,
    generations: Vec<u32>,
    free_indices: VecDeque<u32>,
    config: RegistryConfig,
    len: usize,
    _marker: PhantomData<fn() -> M>,
}

impl<T, M> Registry<T, M> {
    /// Create a registry with the default [`RegistryConfig`].
    pub fn new() -> Self {
        let config = RegistryConfig::new();
        let mut registry = Self::empty(config.clone());
        registry.grow_to(config.reserve_size);
        registry
    }

    /// Create a registry with an explicit configuration.
    pub fn with_config(config: RegistryConfig) -> Result<Self, RegistryError> {
        config.validate()?;
        let reserve = config.reserve_size;
        let mut registry = Self::empty(config);
        registry.grow_to(reserve);
        Ok(registry)
    }

    fn empty(config: RegistryConfig) -> Self {
        Self {
            data: Vec::new(),
            generations: Vec::new(),
            free_indices: VecDeque::new(),
            config,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Store `value` and return a handle to it.
    ///
    /// # Panics
    ///
    /// Panics if every index up to the slot limit is occupied or retired.
    #[track_caller]
    pub fn add(&mut self, value: T) -> Handle<M> {
        match self.try_add(value) {
            Ok(handle) => handle,
            Err(err) => {
                tracing::error!(error = %err, "registry cannot grow");
                panic!("{err}");
            }
        }
    }

    /// Store `value` and return a handle to it, or
    /// `Err(RegistryError::Exhausted)` if no index is left.
    pub fn try_add(&mut self, value: T) -> Result<Handle<M>, RegistryError> {
        self.ensure_free();
        let index = self.free_indices.pop_front().ok_or(RegistryError::Exhausted {
            capacity: self.data.len(),
        })?;
        let slot = index as usize;
        debug_assert!(self.data[slot].is_none());
        self.data[slot] = Some(value);
        self.len += 1;
        Ok(Handle::from_raw(RawHandle::new(index, self.generations[slot])))
    }

    /// Whether `handle` refers to the current occupant of its slot.
    pub fn is_valid(&self, handle: Handle<M>) -> bool {
        self.slot_of(handle).is_some()
    }

    /// Remove and return the value behind `handle`.
    ///
    /// The slot's generation is bumped, so every copy of `handle` goes
    /// stale. An invalid handle logs a warning and returns `None`.
    pub fn remove(&mut self, handle: Handle<M>) -> Option<T> {
        let Some(slot) = self.slot_of(handle) else {
            self.warn_invalid(handle, "remove");
            return None;
        };
        let value = self.data[slot].take();
        self.len -= 1;
        self.generations[slot] += 1;
        if self.generations[slot] == RawHandle::INVALID.generation {
            tracing::debug!(index = slot, "retiring slot with exhausted generation");
        } else {
            self.free_indices.push_back(handle.index());
        }
        value
    }

    /// Borrow the value behind `handle`.
    ///
    /// An invalid handle logs a warning and returns `None`. The borrow ends
    /// before the registry can be mutated again.
    pub fn get(&self, handle: Handle<M>) -> Option<&T> {
        match self.slot_of(handle) {
            Some(slot) => self.data[slot].as_ref(),
            None => {
                self.warn_invalid(handle, "get");
                None
            }
        }
    }

    /// Mutably borrow the value behind `handle`.
    ///
    /// An invalid handle logs a warning and returns `None`.
    pub fn get_mut(&mut self, handle: Handle<M>) -> Option<&mut T> {
        match self.slot_of(handle) {
            Some(slot) => self.data[slot].as_mut(),
            None => {
                self.warn_invalid(handle, "get_mut");
                None
            }
        }
    }

    /// Whether `handle` is valid. Unlike [`Registry::get`], never logs.
    pub fn contains(&self, handle: Handle<M>) -> bool {
        self.is_valid(handle)
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no value is live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots, occupied or not.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of indices queued for reuse.
    pub fn free_count(&self) -> usize {
        self.free_indices.len()
    }

    /// The configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Iterate over live values with their handles, in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<M>, &T)> + '_ {
        self.data
            .iter()
            .zip(&self.generations)
            .enumerate()
            .filter_map(|(index, (value, &generation))| {
                let value = value.as_ref()?;
                Some((Handle::from_raw(RawHandle::new(index as u32, generation)), value))
            })
    }

    fn slot_of(&self, handle: Handle<M>) -> Option<usize> {
        let raw = handle.raw();
        if raw.is_invalid() {
            return None;
        }
        let slot = raw.index as usize;
        let generation = *self.generations.get(slot)?;
        if generation != raw.generation || generation == RawHandle::INVALID.generation {
            return None;
        }
        self.data[slot].is_some().then_some(slot)
    }

    fn warn_invalid(&self, handle: Handle<M>, op: &'static str) {
        let current = self.generations.get(handle.index() as usize).copied();
        tracing::warn!(
            op,
            index = handle.index(),
            generation = handle.generation(),
            current_generation = ?current,
            capacity = self.data.len(),
            "invalid handle"
        );
    }

    /// Double the slot count until the free list is above the low-water
    /// mark, or the slot limit is reached.
    fn ensure_free(&mut self) {
        let want = self.config.min_free_indices.max(1);
        while self.free_indices.len() < want && self.data.len() < RegistryConfig::MAX_SLOTS {
            let target = self
                .data
                .len()
                .saturating_mul(2)
                .max(self.config.reserve_size)
                .min(RegistryConfig::MAX_SLOTS);
            self.grow_to(target);
        }
    }

    fn grow_to(&mut self, target: usize) {
        let old = self.data.len();
        if target <= old {
            return;
        }
        self.data.resize_with(target, || None);
        self.generations.resize(target, 0);
        self.free_indices.extend(old as u32..target as u32);
        tracing::debug!(from = old, to = target, "registry grown");
    }
}

impl<T, M> Default for Registry<T, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, M> fmt::Debug for Registry<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("len", &self.len)
            .field("capacity", &self.data.len())
            .field("free", &self.free_indices.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Registry<i32> {
        Registry::with_config(RegistryConfig {
            reserve_size: 4,
            min_free_indices: 1,
        })
        .unwrap()
    }

    #[test]
    fn add_get_round_trip() {
        let mut registry = Registry::<i32>::new();
        let h = registry.add(42);
        assert_eq!(registry.get(h), Some(&42));
        assert!(registry.is_valid(h));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn first_handle_is_index_zero_generation_zero() {
        let mut registry = small();
        let h = registry.add(1);
        assert_eq!((h.index(), h.generation()), (0, 0));
    }

    #[test]
    fn get_mut_modifies_value() {
        let mut registry = small();
        let h = registry.add(10);
        *registry.get_mut(h).unwrap() = 20;
        assert_eq!(registry.get(h), Some(&20));
    }

    #[test]
    fn remove_invalidates_every_copy() {
        let mut registry = small();
        let h = registry.add(99);
        let copy = h;
        assert_eq!(registry.remove(h), Some(99));
        assert!(!registry.is_valid(copy));
        assert_eq!(registry.get(copy), None);
        assert_eq!(registry.get_mut(copy), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn double_remove_is_a_no_op() {
        let mut registry = small();
        let h = registry.add(1);
        assert_eq!(registry.remove(h), Some(1));
        let free = registry.free_count();
        assert_eq!(registry.remove(h), None);
        assert_eq!(registry.free_count(), free);
    }

    #[test]
    fn freed_indices_are_reused_fifo() {
        let mut registry = small();
        let handles: Vec<_> = (0..3).map(|v| registry.add(v)).collect();
        // Free list is now [3]; removing 1 then 0 queues them behind it.
        registry.remove(handles[1]);
        registry.remove(handles[0]);
        assert_eq!(registry.add(10).index(), 3);
        let reused = registry.add(11);
        assert_eq!(reused.index(), 1);
        assert_eq!(reused.generation(), 1);
        assert_eq!(registry.add(12).index(), 0);
    }

    #[test]
    fn stale_handle_does_not_see_new_occupant() {
        let mut registry = Registry::<&str>::with_config(RegistryConfig {
            reserve_size: 1,
            min_free_indices: 1,
        })
        .unwrap();
        let old = registry.add("old");
        registry.remove(old);
        // Index 0 is the only free index, so the new value lands on it.
        let new = registry.add("new");
        assert_eq!(new.index(), 0);
        assert_eq!(registry.get(old), None);
        assert_eq!(registry.get(new), Some(&"new"));
    }

    #[test]
    fn grows_by_doubling_when_free_list_runs_low() {
        let mut registry = small();
        assert_eq!(registry.capacity(), 4);
        for v in 0..4 {
            registry.add(v);
        }
        assert_eq!(registry.capacity(), 4);
        registry.add(4);
        assert_eq!(registry.capacity(), 8);
    }

    #[test]
    fn default_registry_preallocates() {
        let registry = Registry::<u8>::new();
        assert_eq!(registry.capacity(), 1024);
        assert_eq!(registry.free_count(), 1024);
    }

    #[test]
    fn sentinel_and_out_of_range_handles_are_invalid() {
        let mut registry = small();
        registry.add(1);
        assert!(!registry.is_valid(Handle::INVALID));
        assert!(!registry.is_valid(Handle::from_raw(RawHandle::new(999, 0))));
        assert_eq!(registry.remove(Handle::INVALID), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn vacant_slot_at_generation_zero_is_invalid() {
        let registry = small();
        assert!(!registry.is_valid(Handle::from_raw(RawHandle::new(2, 0))));
    }

    #[test]
    fn iter_yields_live_values_with_their_handles() {
        let mut registry = small();
        let a = registry.add(1);
        let b = registry.add(2);
        let c = registry.add(3);
        registry.remove(b);
        let live: Vec<_> = registry.iter().collect();
        assert_eq!(live, vec![(a, &1), (c, &3)]);
    }

    #[test]
    fn generation_exhaustion_retires_slot() {
        let mut registry = small();
        let h = registry.add(1);
        registry.remove(h);

        // Fast-forward slot 0 to one step before the sentinel generation.
        registry.generations[0] = u32::MAX - 1;
        registry.free_indices.retain(|&i| i != 0);
        registry.free_indices.push_front(0);
        let last = registry.add(2);
        assert_eq!(last.index(), 0);
        assert_eq!(last.generation(), u32::MAX - 1);

        registry.remove(last);
        assert_eq!(registry.generations[0], u32::MAX);
        assert!(
            !registry.free_indices.contains(&0),
            "slot with exhausted generation must be retired, not recycled"
        );
        assert!(!registry.is_valid(last));
        assert!(!registry.is_valid(Handle::from_raw(RawHandle::new(0, u32::MAX))));

        for v in 0..16 {
            assert_ne!(registry.add(v).index(), 0, "retired slot must not be reused");
        }
    }

    #[test]
    fn typed_markers_keep_registries_apart() {
        struct Mesh;
        let mut meshes: Registry<String, Mesh> = Registry::new();
        let h: Handle<Mesh> = meshes.add("cube".to_string());
        assert_eq!(meshes.get(h).map(String::as_str), Some("cube"));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn removed_handles_never_resolve(ops in prop::collection::vec(any::<bool>(), 1..200)) {
                let mut registry = Registry::<usize>::with_config(RegistryConfig {
                    reserve_size: 4,
                    min_free_indices: 2,
                })
                .unwrap();
                let mut live = Vec::new();
                let mut dead = Vec::new();
                for (i, add) in ops.into_iter().enumerate() {
                    if add || live.is_empty() {
                        live.push((registry.add(i), i));
                    } else {
                        let (h, v) = live.swap_remove(i % live.len());
                        prop_assert_eq!(registry.remove(h), Some(v));
                        dead.push(h);
                    }
                }
                for (h, v) in &live {
                    prop_assert_eq!(registry.get(*h), Some(v));
                }
                for h in &dead {
                    prop_assert!(!registry.is_valid(*h));
                }
                prop_assert_eq!(registry.len(), live.len());
            }
        }
    }
}
