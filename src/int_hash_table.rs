// SPDX-License-Identifier: Apache-2.0

//! Open-addressing set of `i32` keys using hopscotch hashing.
//!
//! Every present key lives within `HOP_RANGE` slots of its home slot
//! (`hash(key) mod size`, wrapping around the end of the table). Insertion
//! finds the nearest vacant slot and "hops" it backwards into the key's
//! neighborhood by relocating keys that can legally move forward; when no such
//! sequence of relocations exists the table doubles and rehashes.
//!
//! Lookups therefore probe at most `HOP_RANGE` slots. Positions returned by
//! `add` / `get_pos` are only meaningful until the next mutating call: any
//! insertion may relocate other keys and any resize relocates all of them.
//!
//! ```
//! use xlsynth_beta::int_hash_table::IntHashTable;
//!
//! let mut table = IntHashTable::new();
//! table.add(42).unwrap();
//! assert!(table.contains(42));
//! assert!(table.add(42).is_err());
//! table.remove(42).unwrap();
//! assert!(!table.contains(42));
//! ```

use std::fmt;

/// Maximum distance (in slots) of a key from its home slot.
pub const HOP_RANGE: usize = 32;

/// Maximum distance scanned when searching for a vacant slot on insertion.
const ADD_RANGE: usize = 8 * HOP_RANGE;

const INITIAL_SIZE: usize = 32;

/// Marker in `hop_info` for a vacant slot; real displacements are always
/// `< HOP_RANGE`.
const EMPTY: u8 = u8::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntHashError {
    DuplicateKey(i32),
    MissingKey(i32),
}

impl fmt::Display for IntHashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntHashError::DuplicateKey(key) => {
                write!(f, "key {} is already present in the int hash table", key)
            }
            IntHashError::MissingKey(key) => {
                write!(f, "key {} is not present in the int hash table", key)
            }
        }
    }
}

impl std::error::Error for IntHashError {}

#[inline]
fn hash(key: i32) -> usize {
    // murmur3 finalizer; home slots come from the low bits, so every key bit
    // has to reach them.
    let mut h = key as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h as usize
}

/// Parallel key / displacement / payload buffers shared by `IntHashTable` and
/// `IntHashMap`. The set instantiates it with `V = ()`.
#[derive(Debug, Clone)]
pub(crate) struct HopscotchSlots<V> {
    keys: Vec<i32>,
    /// Displacement of the occupant from its home slot, or `EMPTY`.
    hop_info: Vec<u8>,
    data: Vec<Option<V>>,
    count: usize,
}

impl<V> HopscotchSlots<V> {
    pub(crate) fn with_size(size: usize) -> Self {
        assert!(
            size.is_power_of_two(),
            "hopscotch table size must be a power of two, got {}",
            size
        );
        Self {
            keys: vec![0; size],
            hop_info: vec![EMPTY; size],
            data: (0..size).map(|_| None).collect(),
            count: 0,
        }
    }

    pub(crate) fn new() -> Self {
        Self::with_size(INITIAL_SIZE)
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.count
    }

    #[inline]
    fn mask(&self) -> usize {
        self.size() - 1
    }

    #[inline]
    fn home(&self, key: i32) -> usize {
        hash(key) & self.mask()
    }

    #[inline]
    fn is_occupied(&self, pos: usize) -> bool {
        self.hop_info[pos] != EMPTY
    }

    /// Returns the slot holding `key`, or `size()` if it is absent.
    pub(crate) fn get_pos(&self, key: i32) -> usize {
        let size = self.size();
        let mask = self.mask();
        let home = self.home(key);
        for dist in 0..HOP_RANGE.min(size) {
            let pos = (home + dist) & mask;
            // A matching displacement implies the occupant shares our home slot.
            if self.hop_info[pos] as usize == dist && self.keys[pos] == key {
                return pos;
            }
        }
        size
    }

    pub(crate) fn contains(&self, key: i32) -> bool {
        self.get_pos(key) != self.size()
    }

    pub(crate) fn key_at(&self, pos: usize) -> Option<i32> {
        if pos < self.size() && self.is_occupied(pos) {
            Some(self.keys[pos])
        } else {
            None
        }
    }

    pub(crate) fn data_at(&self, pos: usize) -> Option<&V> {
        self.data.get(pos).and_then(|d| d.as_ref())
    }

    pub(crate) fn data_at_mut(&mut self, pos: usize) -> Option<&mut V> {
        self.data.get_mut(pos).and_then(|d| d.as_mut())
    }

    /// Places `key` without checking for duplicates. Returns `None` if the
    /// neighborhood constraint can not be met at the current size; in that
    /// case the only mutation performed is a (valid) relocation of other keys.
    fn try_place(&mut self, key: i32) -> Option<usize> {
        let size = self.size();
        let mask = self.mask();
        let home = self.home(key);

        let mut dist = (0..ADD_RANGE.min(size)).find(|d| !self.is_occupied((home + d) & mask))?;

        while dist >= HOP_RANGE {
            let vacant = (home + dist) & mask;
            let mut hopped = false;
            // Every slot between `home` and `vacant` is occupied; look for the
            // occupant farthest from `vacant` that may legally move into it.
            for back in (1..HOP_RANGE).rev() {
                let candidate = (vacant + size - back) & mask;
                let displacement = self.hop_info[candidate] as usize;
                if displacement + back < HOP_RANGE {
                    self.keys[vacant] = self.keys[candidate];
                    self.hop_info[vacant] = (displacement + back) as u8;
                    self.data[vacant] = self.data[candidate].take();
                    self.hop_info[candidate] = EMPTY;
                    dist -= back;
                    hopped = true;
                    break;
                }
            }
            if !hopped {
                return None;
            }
        }

        let pos = (home + dist) & mask;
        debug_assert!(!self.is_occupied(pos));
        self.keys[pos] = key;
        self.hop_info[pos] = dist as u8;
        self.count += 1;
        Some(pos)
    }

    /// Builds a table of `new_size` holding every present key, or returns
    /// `None` if some key can not be placed at that size. `self` is left
    /// untouched on failure.
    fn rehashed_keys(&self, new_size: usize) -> Option<HopscotchSlots<V>> {
        let mut resized = HopscotchSlots::with_size(new_size);
        for pos in 0..self.size() {
            if self.is_occupied(pos) {
                resized.try_place(self.keys[pos])?;
            }
        }
        Some(resized)
    }

    fn grow(&mut self) {
        let old_size = self.size();
        let mut new_size = old_size * 2;
        let mut resized = loop {
            if let Some(resized) = self.rehashed_keys(new_size) {
                break resized;
            }
            new_size *= 2;
        };
        // All keys are placed; now carry the payloads over.
        for pos in 0..old_size {
            if self.is_occupied(pos) {
                let new_pos = resized.get_pos(self.keys[pos]);
                resized.data[new_pos] = self.data[pos].take();
            }
        }
        log::trace!(
            "int hash table resized {} -> {} slots ({} keys)",
            old_size,
            new_size,
            self.count
        );
        *self = resized;
    }

    /// Adds `key` and returns its slot. The payload of the slot is left
    /// unset for the caller to fill.
    pub(crate) fn insert(&mut self, key: i32) -> Result<usize, IntHashError> {
        if self.contains(key) {
            return Err(IntHashError::DuplicateKey(key));
        }
        if self.count == self.size() {
            self.grow();
        }
        loop {
            if let Some(pos) = self.try_place(key) {
                return Ok(pos);
            }
            self.grow();
        }
    }

    pub(crate) fn set_data(&mut self, pos: usize, value: V) -> &mut V {
        debug_assert!(self.is_occupied(pos));
        self.data[pos].insert(value)
    }

    /// Removes `key`, returning the slot it occupied and its payload.
    pub(crate) fn remove(&mut self, key: i32) -> Result<(usize, Option<V>), IntHashError> {
        let pos = self.get_pos(key);
        if pos == self.size() {
            return Err(IntHashError::MissingKey(key));
        }
        self.keys[pos] = 0;
        self.hop_info[pos] = EMPTY;
        self.count -= 1;
        Ok((pos, self.data[pos].take()))
    }

    pub(crate) fn clear(&mut self) {
        for pos in 0..self.size() {
            self.keys[pos] = 0;
            self.hop_info[pos] = EMPTY;
            self.data[pos] = None;
        }
        self.count = 0;
    }

    pub(crate) fn occupied_positions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.size()).filter(move |pos| self.is_occupied(*pos))
    }

    pub(crate) fn size_in_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.keys.capacity() * std::mem::size_of::<i32>()
            + self.hop_info.capacity() * std::mem::size_of::<u8>()
            + self.data.capacity() * std::mem::size_of::<Option<V>>()
    }

    /// Checks the structural invariants of the table, panicking on violation.
    pub(crate) fn check_invariants(&self) {
        let mut occupied = 0;
        for pos in 0..self.size() {
            if !self.is_occupied(pos) {
                continue;
            }
            occupied += 1;
            let displacement = self.hop_info[pos] as usize;
            assert!(
                displacement < HOP_RANGE,
                "slot {} has displacement {} outside the neighborhood",
                pos,
                displacement
            );
            let home = self.home(self.keys[pos]);
            assert_eq!(
                (home + displacement) & self.mask(),
                pos,
                "slot {} displacement does not lead back to home slot {}",
                pos,
                home
            );
        }
        assert_eq!(occupied, self.count, "occupied slot count mismatch");
    }
}

/// Set of `i32` keys (node ids, in practice).
///
/// Dropping the table releases all backing storage.
#[derive(Debug, Clone)]
pub struct IntHashTable {
    slots: HopscotchSlots<()>,
}

impl Default for IntHashTable {
    fn default() -> Self {
        Self::new()
    }
}

impl IntHashTable {
    pub fn new() -> Self {
        Self {
            slots: HopscotchSlots::new(),
        }
    }

    /// Adds `key` and returns the position at which it is stored. Fails if the
    /// key is already present.
    pub fn add(&mut self, key: i32) -> Result<usize, IntHashError> {
        self.slots.insert(key)
    }

    pub fn contains(&self, key: i32) -> bool {
        self.slots.contains(key)
    }

    /// Removes `key` and returns the position it was stored at. Fails if the
    /// key is absent.
    pub fn remove(&mut self, key: i32) -> Result<usize, IntHashError> {
        self.slots.remove(key).map(|(pos, _)| pos)
    }

    /// Returns the position of `key`, or `size()` if it is absent.
    pub fn get_pos(&self, key: i32) -> usize {
        self.slots.get_pos(key)
    }

    /// Returns the key stored at `pos`, if that slot is occupied.
    pub fn key_at(&self, pos: usize) -> Option<i32> {
        self.slots.key_at(pos)
    }

    /// Number of keys present.
    pub fn count(&self) -> usize {
        self.slots.count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Number of slots (capacity).
    pub fn size(&self) -> usize {
        self.slots.size()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.slots
            .occupied_positions()
            .filter_map(move |pos| self.slots.key_at(pos))
    }

    /// Memory footprint of the table in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.slots.size_in_bytes()
    }

    pub fn check_invariants(&self) {
        self.slots.check_invariants();
    }
}
