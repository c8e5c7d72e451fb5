// SPDX-License-Identifier: Apache-2.0

//! `i32`-keyed map on top of the hopscotch table.
//!
//! A map carries exactly one payload type for its whole lifetime; the payload
//! kinds used in this crate are integers (`IntToIntMap`), node handles
//! (`IntToNodeMap`) and text (`IntToTextMap`).

use crate::int_hash_table::{HopscotchSlots, IntHashError};
use crate::node::NodeRef;

#[derive(Debug, Clone)]
pub struct IntHashMap<V> {
    slots: HopscotchSlots<V>,
}

pub type IntToIntMap = IntHashMap<i32>;
pub type IntToNodeMap = IntHashMap<NodeRef>;
pub type IntToTextMap = IntHashMap<String>;

impl<V> Default for IntHashMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> IntHashMap<V> {
    pub fn new() -> Self {
        Self {
            slots: HopscotchSlots::new(),
        }
    }

    /// Adds `key` with a default payload and returns the payload slot for the
    /// caller to fill. Fails if the key is already present.
    pub fn add(&mut self, key: i32) -> Result<&mut V, IntHashError>
    where
        V: Default,
    {
        self.insert(key, V::default())
    }

    /// Adds `key` carrying `value`. Fails if the key is already present.
    pub fn insert(&mut self, key: i32, value: V) -> Result<&mut V, IntHashError> {
        let pos = self.slots.insert(key)?;
        Ok(self.slots.set_data(pos, value))
    }

    pub fn contains(&self, key: i32) -> bool {
        self.slots.contains(key)
    }

    pub fn get(&self, key: i32) -> Option<&V> {
        let pos = self.slots.get_pos(key);
        self.slots.data_at(pos)
    }

    pub fn get_mut(&mut self, key: i32) -> Option<&mut V> {
        let pos = self.slots.get_pos(key);
        self.slots.data_at_mut(pos)
    }

    /// Removes `key`, returning its payload. Fails if the key is absent.
    pub fn remove(&mut self, key: i32) -> Result<V, IntHashError> {
        match self.slots.remove(key)? {
            (_, Some(value)) => Ok(value),
            (_, None) => unreachable!("present key {} had no payload", key),
        }
    }

    /// Removes `key`, writing its payload to `stored` when one is supplied.
    pub fn remove_into(&mut self, key: i32, stored: Option<&mut V>) -> Result<(), IntHashError> {
        let value = self.remove(key)?;
        if let Some(stored) = stored {
            *stored = value;
        }
        Ok(())
    }

    /// Returns the position of `key`, or `size()` if it is absent.
    pub fn get_pos(&self, key: i32) -> usize {
        self.slots.get_pos(key)
    }

    pub fn count(&self) -> usize {
        self.slots.count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn size(&self) -> usize {
        self.slots.size()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &V)> + '_ {
        self.slots.occupied_positions().filter_map(move |pos| {
            let key = self.slots.key_at(pos)?;
            let value = self.slots.data_at(pos)?;
            Some((key, value))
        })
    }

    /// Memory footprint of the map in bytes (payload heap data excluded).
    pub fn size_in_bytes(&self) -> usize {
        self.slots.size_in_bytes()
    }

    pub fn check_invariants(&self) {
        self.slots.check_invariants();
    }
}

impl IntHashMap<String> {
    /// Like `size_in_bytes`, also counting the heap text of every payload.
    pub fn size_in_bytes_with_text(&self) -> usize {
        self.size_in_bytes() + self.iter().map(|(_, s)| s.capacity()).sum::<usize>()
    }
}
