// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use kurbo::Rect;
use tracing::{debug, warn};
use vigil_quadtree::{EntityTable, Quadtree, QuadtreeConfig};

use crate::geometry::{Geometry, SpatialReference};
use crate::notify::{EntityKey, Notifier};
use crate::target::SpatialTarget;

/// A spatial target over the result of a layer query.
///
/// The query itself runs elsewhere. Each time it completes, the owner hands the
/// resulting geometries to [`apply_query_result`](Self::apply_query_result),
/// which replaces the previous result and rebuilds the index.
pub struct FeatureQueryTarget {
    key: EntityKey,
    notifier: Notifier,
    spatial_reference: SpatialReference,
    query: String,
    state: RefCell<QueryState>,
}

struct QueryState {
    features: EntityTable<Geometry>,
    tree: Quadtree,
    results: u64,
}

impl fmt::Debug for FeatureQueryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("FeatureQueryTarget")
            .field("key", &self.key)
            .field("query", &self.query)
            .field("features", &state.features.len())
            .field("results", &state.results)
            .finish_non_exhaustive()
    }
}

impl FeatureQueryTarget {
    /// Creates a target with no results yet. `query` describes the layer query
    /// (for example a where clause) and is only used for display.
    #[must_use]
    pub fn new(
        notifier: &Notifier,
        spatial_reference: SpatialReference,
        query: impl Into<String>,
    ) -> Rc<Self> {
        Rc::new(Self {
            key: notifier.new_key(),
            notifier: notifier.clone(),
            spatial_reference,
            query: query.into(),
            state: RefCell::new(QueryState {
                features: EntityTable::new(),
                tree: Quadtree::new(QuadtreeConfig::default()),
                results: 0,
            }),
        })
    }

    /// Identity of this target.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        self.key
    }

    /// The query description.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Replaces the held features with a completed query result.
    ///
    /// Geometries in another spatial reference, or without an extent, are
    /// skipped. Returns how many were kept.
    pub fn apply_query_result(&self, features: impl IntoIterator<Item = Geometry>) -> usize {
        let (kept, skipped) = {
            let mut state = self.state.borrow_mut();
            state.features.clear();
            let mut entries = Vec::new();
            let mut skipped = 0_usize;
            for geometry in features {
                let extent = (geometry.spatial_reference() == self.spatial_reference)
                    .then(|| geometry.extent())
                    .flatten();
                match extent {
                    Some(extent) => entries.push((state.features.insert(geometry), extent)),
                    None => skipped += 1,
                }
            }
            match entries.iter().map(|(_, r)| *r).reduce(|a, b| a.union(b)) {
                Some(extent) => state.tree.build(extent, entries.iter().copied()),
                None => state.tree.clear(),
            }
            state.results += 1;
            (entries.len(), skipped)
        };
        if skipped > 0 {
            warn!(target_key = %self.key, skipped, "query result geometries skipped");
        }
        debug!(target_key = %self.key, kept, "query result applied");
        self.notifier.changed(self.key);
        kept
    }

    /// Drops the current result.
    pub fn clear(&self) {
        self.apply_query_result(std::iter::empty());
    }

    /// Number of features in the current result.
    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.state.borrow().features.len()
    }

    /// Number of results applied so far.
    #[must_use]
    pub fn result_count(&self) -> u64 {
        self.state.borrow().results
    }
}

impl SpatialTarget for FeatureQueryTarget {
    fn key(&self) -> EntityKey {
        self.key
    }

    fn spatial_reference(&self) -> SpatialReference {
        self.spatial_reference
    }

    fn candidate_geometries(&self, extent: Rect) -> Vec<Geometry> {
        let state = self.state.borrow();
        state
            .tree
            .query_rect(extent)
            .into_iter()
            .filter_map(|id| state.features.get(id).cloned())
            .collect()
    }
}

impl Drop for FeatureQueryTarget {
    fn drop(&mut self) {
        self.notifier.removed(self.key);
    }
}
