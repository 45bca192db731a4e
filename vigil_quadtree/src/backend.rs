// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend trait shared by the quadtree and the flat-vector scan.

use hashbrown::HashSet;
use kurbo::{Point, Rect};

use crate::entry::EntryId;
use crate::tree::{Quadtree, Reindex};

/// Spatial backend abstraction over entry extents.
///
/// Implementations may report the same id more than once from the `visit_*`
/// methods; the `query_*` methods always return de-duplicated sets.
pub trait SpatialBackend {
    /// Index a new entry.
    fn insert(&mut self, id: EntryId, extent: Rect) -> Reindex;

    /// Move an existing entry (or insert it if unknown).
    fn update(&mut self, id: EntryId, extent: Rect) -> Reindex;

    /// Remove an entry. Returns `false` if it was not indexed.
    fn remove(&mut self, id: EntryId) -> bool;

    /// Forget every entry.
    fn clear(&mut self);

    /// Visit entries whose extent may contain the point.
    fn visit_point<F: FnMut(EntryId)>(&self, point: Point, f: F);

    /// Visit entries whose extent may intersect the rectangle.
    fn visit_rect<F: FnMut(EntryId)>(&self, rect: Rect, f: F);

    /// Entries whose extent may contain the point. Default: collects `visit_point`.
    fn query_point(&self, point: Point) -> HashSet<EntryId> {
        let mut out = HashSet::new();
        self.visit_point(point, |id| {
            out.insert(id);
        });
        out
    }

    /// Entries whose extent may intersect the rectangle. Default: collects `visit_rect`.
    fn query_rect(&self, rect: Rect) -> HashSet<EntryId> {
        let mut out = HashSet::new();
        self.visit_rect(rect, |id| {
            out.insert(id);
        });
        out
    }
}

impl SpatialBackend for Quadtree {
    fn insert(&mut self, id: EntryId, extent: Rect) -> Reindex {
        Self::insert(self, id, extent)
    }

    fn update(&mut self, id: EntryId, extent: Rect) -> Reindex {
        Self::update(self, id, extent)
    }

    /// Removes and immediately prunes.
    fn remove(&mut self, id: EntryId) -> bool {
        let removed = Self::remove(self, id);
        if removed {
            self.prune();
        }
        removed
    }

    fn clear(&mut self) {
        Self::clear(self);
    }

    fn visit_point<F: FnMut(EntryId)>(&self, point: Point, f: F) {
        Self::visit_rect(self, Rect::from_points(point, point), f);
    }

    fn visit_rect<F: FnMut(EntryId)>(&self, rect: Rect, f: F) {
        Self::visit_rect(self, rect, f);
    }
}
