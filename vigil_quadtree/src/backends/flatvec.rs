// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flat vector backend with linear scans. Small and simple; good for tiny sets
//! and as an exact oracle for the quadtree's candidate sets.

use alloc::vec::Vec;
use core::fmt::Debug;

use kurbo::{Point, Rect};

use crate::backend::SpatialBackend;
use crate::entry::EntryId;
use crate::extent;
use crate::tree::Reindex;

/// Flat vector backend with linear scans.
///
/// Results are exact with respect to the stored extents: an id is reported
/// only if its extent really intersects the query.
#[derive(Clone, Default)]
pub struct FlatVec {
    entries: Vec<(EntryId, Rect)>,
}

impl Debug for FlatVec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlatVec")
            .field("alive", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl FlatVec {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SpatialBackend for FlatVec {
    fn insert(&mut self, id: EntryId, extent: Rect) -> Reindex {
        self.update(id, extent)
    }

    fn update(&mut self, id: EntryId, extent: Rect) -> Reindex {
        let extent = extent.abs();
        if let Some(e) = self.entries.iter_mut().find(|(i, _)| *i == id) {
            e.1 = extent;
        } else {
            self.entries.push((id, extent));
        }
        Reindex::Incremental
    }

    fn remove(&mut self, id: EntryId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(i, _)| *i != id);
        self.entries.len() != before
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn visit_point<F: FnMut(EntryId)>(&self, point: Point, mut f: F) {
        for (id, e) in &self.entries {
            if extent::contains_point(e, point) {
                f(*id);
            }
        }
    }

    fn visit_rect<F: FnMut(EntryId)>(&self, rect: Rect, mut f: F) {
        let rect = rect.abs();
        for (id, e) in &self.entries {
            if extent::intersects(e, &rect) {
                f(*id);
            }
        }
    }
}
