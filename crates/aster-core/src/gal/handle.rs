// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Generation-tagged resource handles and the slot table backing them.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A typed, generation-tagged identifier for a device-owned resource.
///
/// A handle is an index into the device's slot table for `T` plus a
/// generation counter. When a slot is freed and later reused, its
/// generation is bumped, so handles to the old occupant stop resolving
/// instead of silently aliasing the new one (the classic ABA problem).
///
/// Generation `0` is reserved for the invalid handle; a default-constructed
/// handle is invalid.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// The invalid handle. Never resolves to a resource.
    pub const INVALID: Self = Self {
        index: 0,
        generation: 0,
        _marker: PhantomData,
    };

    pub(crate) const fn from_parts(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Returns `true` if this is the invalid handle.
    pub const fn is_invalidated(&self) -> bool {
        self.generation == 0
    }

    /// The slot index. Only meaningful for valid handles.
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// The generation tag. `0` for invalid handles.
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Resets this handle to [`Handle::INVALID`].
    pub fn invalidate(&mut self) {
        *self = Self::INVALID;
    }
}

// Manual impls: deriving would put unwanted bounds on `T`.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Handle<T> {}
impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}
impl<T> Eq for Handle<T> {}
impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}
impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::INVALID
    }
}
impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalidated() {
            write!(f, "Handle(invalid)")
        } else {
            write!(f, "Handle({}v{})", self.index, self.generation)
        }
    }
}

/// A slot table mapping [`Handle`]s to owned values.
///
/// Freed slots go onto a free list and are reused with a bumped
/// generation. Lookups with a stale handle return `None`.
#[derive(Debug)]
pub struct HandleTable<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

impl<T> HandleTable<T> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Inserts a value and returns its handle.
    pub fn insert(&mut self, value: T) -> Handle<T> {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none());
            slot.value = Some(value);
            Handle::from_parts(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 1,
                value: Some(value),
            });
            Handle::from_parts(index, 1)
        }
    }

    /// Resolves a handle, rejecting stale generations.
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    /// Resolves a handle mutably, rejecting stale generations.
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_mut()
    }

    /// Returns `true` if the handle currently resolves.
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    /// Removes the value behind `handle`, bumping the slot generation so
    /// the handle (and all its copies) stop resolving.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() || slot.value.is_none() {
            return None;
        }
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1).max(1);
        self.free.push(handle.index());
        self.len -= 1;
        value
    }

    /// The number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no entries are live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over all live entries with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value
                .as_ref()
                .map(|v| (Handle::from_parts(i as u32, slot.generation), v))
        })
    }

    /// Removes and returns every live entry. Used at device shutdown.
    pub fn drain_all(&mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len);
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let Some(value) = slot.value.take() {
                slot.generation = slot.generation.wrapping_add(1).max(1);
                self.free.push(i as u32);
                out.push(value);
            }
        }
        self.len = 0;
        out
    }
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_handle_is_invalid() {
        let handle: Handle<u32> = Handle::default();
        assert!(handle.is_invalidated());
    }

    #[test]
    fn insert_get_remove() {
        let mut table = HandleTable::new();
        let h = table.insert(42u32);
        assert!(!h.is_invalidated());
        assert_eq!(table.get(h), Some(&42));
        assert_eq!(table.remove(h), Some(42));
        assert_eq!(table.get(h), None);
        assert!(table.is_empty());
    }

    #[test]
    fn stale_handle_does_not_resolve_reused_slot() {
        let mut table = HandleTable::new();
        let stale = table.insert(1u32);
        table.remove(stale);

        // The slot is reused, but with a bumped generation.
        let fresh = table.insert(2u32);
        assert_eq!(fresh.index(), stale.index());
        assert_ne!(fresh.generation(), stale.generation());

        assert_eq!(table.get(stale), None);
        assert_eq!(table.get(fresh), Some(&2));
    }

    #[test]
    fn drain_all_invalidates_everything() {
        let mut table = HandleTable::new();
        let a = table.insert("a");
        let b = table.insert("b");
        let drained = table.drain_all();
        assert_eq!(drained.len(), 2);
        assert!(table.get(a).is_none());
        assert!(table.get(b).is_none());
    }
}
