// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Entry identifiers and the stable id-to-handle table.

use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

/// Identifier of an indexed entry.
///
/// Ids are handed out by [`EntityTable::insert`] in strictly increasing order
/// and are never reused by the same table, so a stale id can never alias a
/// newer entry.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

impl EntryId {
    /// Creates an id from its raw value.
    ///
    /// Most callers obtain ids from an [`EntityTable`] instead.
    #[must_use]
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntryId").field(&self.0).finish()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A stable mapping from monotonically increasing [`EntryId`]s to handles.
///
/// The table is agnostic to what a handle is. Spatial owners usually store a
/// weak reference so that entities keep their own lifetime; when an entity goes
/// away, its owner calls [`remove`](Self::remove) (or [`retain`](Self::retain))
/// and removes the id from the tree.
///
/// # Example
///
/// ```rust
/// use vigil_quadtree::EntityTable;
///
/// let mut table = EntityTable::new();
/// let a = table.insert('a');
/// let b = table.insert('b');
/// assert!(a < b);
///
/// table.remove(a);
/// let c = table.insert('c');
/// // Keys are never reused.
/// assert!(c > b);
/// ```
#[derive(Clone, Debug)]
pub struct EntityTable<T> {
    next: u64,
    entries: HashMap<EntryId, T>,
}

impl<T> Default for EntityTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntityTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: 0,
            entries: HashMap::new(),
        }
    }

    /// Stores `handle` under a fresh id.
    pub fn insert(&mut self, handle: T) -> EntryId {
        let id = EntryId(self.next);
        self.next += 1;
        self.entries.insert(id, handle);
        id
    }

    /// Removes and returns the handle for `id`.
    pub fn remove(&mut self, id: EntryId) -> Option<T> {
        self.entries.remove(&id)
    }

    /// Returns the handle for `id`.
    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<&T> {
        self.entries.get(&id)
    }

    /// Returns `true` if `id` is present.
    #[must_use]
    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(id, handle)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &T)> + '_ {
        self.entries.iter().map(|(id, h)| (*id, h))
    }

    /// Keeps only the entries for which `keep` returns `true`.
    ///
    /// Returns the ids that were dropped, so the caller can remove them from
    /// its spatial index.
    pub fn retain(&mut self, mut keep: impl FnMut(EntryId, &T) -> bool) -> Vec<EntryId> {
        let mut dropped = Vec::new();
        self.entries.retain(|id, handle| {
            let kept = keep(*id, handle);
            if !kept {
                dropped.push(*id);
            }
            kept
        });
        dropped
    }

    /// Removes every entry. Ids handed out afterwards still continue the sequence.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
