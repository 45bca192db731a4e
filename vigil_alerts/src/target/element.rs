// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use hashbrown::HashMap;
use kurbo::Rect;
use tracing::{debug, trace, warn};
use vigil_quadtree::{EntityTable, EntryId, Quadtree, QuadtreeConfig};

use crate::geometry::{Geometry, SpatialReference};
use crate::notify::{EntityKey, Notifier};
use crate::source::GeoElement;
use crate::target::SpatialTarget;

/// A spatial target over a live set of [`GeoElement`]s.
///
/// Members are held weakly and indexed by extent in a [`Quadtree`]. Adding or
/// removing a member rebuilds the index; a member moving updates it
/// incrementally; a member being dropped is removed and the tree pruned.
///
/// Members must be expressed in the target's spatial reference.
pub struct GeoElementTarget {
    key: EntityKey,
    notifier: Notifier,
    spatial_reference: SpatialReference,
    index: RefCell<MemberIndex>,
    this: Weak<Self>,
}

struct MemberIndex {
    members: EntityTable<Weak<GeoElement>>,
    by_key: HashMap<EntityKey, EntryId>,
    tree: Quadtree,
}

impl MemberIndex {
    fn rebuild(&mut self, spatial_reference: SpatialReference) {
        let entries: Vec<(EntryId, Rect)> = self
            .members
            .iter()
            .filter_map(|(id, member)| Some((id, member.upgrade()?.extent_in(spatial_reference)?)))
            .collect();
        let Some(extent) = entries.iter().map(|(_, r)| *r).reduce(|a, b| a.union(b)) else {
            self.tree.clear();
            return;
        };
        self.tree.build(extent, entries);
    }
}

impl fmt::Debug for GeoElementTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index = self.index.borrow();
        f.debug_struct("GeoElementTarget")
            .field("key", &self.key)
            .field("spatial_reference", &self.spatial_reference)
            .field("members", &index.members.len())
            .field("tree", &index.tree)
            .finish_non_exhaustive()
    }
}

impl GeoElementTarget {
    /// Creates an empty target with the default quadtree configuration.
    #[must_use]
    pub fn new(notifier: &Notifier, spatial_reference: SpatialReference) -> Rc<Self> {
        Self::with_config(notifier, spatial_reference, QuadtreeConfig::default())
    }

    /// Creates an empty target whose index uses `config`.
    #[must_use]
    pub fn with_config(
        notifier: &Notifier,
        spatial_reference: SpatialReference,
        config: QuadtreeConfig,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            key: notifier.new_key(),
            notifier: notifier.clone(),
            spatial_reference,
            index: RefCell::new(MemberIndex {
                members: EntityTable::new(),
                by_key: HashMap::new(),
                tree: Quadtree::new(config),
            }),
            this: this.clone(),
        })
    }

    /// Identity of this target.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        self.key
    }

    /// Adds a member. Returns `false` if it is already a member or its
    /// geometry is in another spatial reference.
    pub fn add_element(&self, element: &Rc<GeoElement>) -> bool {
        if element.geometry().spatial_reference() != self.spatial_reference {
            warn!(
                target_key = %self.key,
                element = %element.key(),
                "element rejected: spatial reference differs from target"
            );
            return false;
        }
        {
            let mut index = self.index.borrow_mut();
            if index.by_key.contains_key(&element.key()) {
                return false;
            }
            let id = index.members.insert(Rc::downgrade(element));
            index.by_key.insert(element.key(), id);
            index.rebuild(self.spatial_reference);
            trace!(target_key = %self.key, members = index.members.len(), "member index rebuilt");
        }
        element.join(self.this.clone());
        debug!(target_key = %self.key, element = %element.key(), "element added to target");
        self.notifier.changed(self.key);
        true
    }

    /// Removes a member. Returns `false` if it was not a member.
    pub fn remove_element(&self, key: EntityKey) -> bool {
        let member = {
            let mut index = self.index.borrow_mut();
            let Some(id) = index.by_key.remove(&key) else {
                return false;
            };
            let member = index.members.remove(id);
            index.rebuild(self.spatial_reference);
            member
        };
        if let Some(element) = member.as_ref().and_then(Weak::upgrade) {
            element.leave(self.key);
        }
        debug!(target_key = %self.key, element = %key, "element removed from target");
        self.notifier.changed(self.key);
        true
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.borrow().members.len()
    }

    /// Returns `true` if there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `key` is a member.
    #[must_use]
    pub fn contains(&self, key: EntityKey) -> bool {
        self.index.borrow().by_key.contains_key(&key)
    }

    /// Root extent of the member index.
    #[must_use]
    pub fn index_bounds(&self) -> Option<Rect> {
        self.index.borrow().tree.bounds()
    }

    /// Number of nodes in the member index.
    #[must_use]
    pub fn index_node_count(&self) -> usize {
        self.index.borrow().tree.node_count()
    }

    pub(crate) fn member_moved(&self, key: EntityKey) {
        {
            let mut index = self.index.borrow_mut();
            let Some(&id) = index.by_key.get(&key) else {
                return;
            };
            let extent = index
                .members
                .get(id)
                .and_then(Weak::upgrade)
                .and_then(|e| e.extent_in(self.spatial_reference));
            match extent {
                Some(extent) => {
                    let reindex = index.tree.update(id, extent);
                    trace!(target_key = %self.key, element = %key, ?reindex, "member moved");
                }
                None => {
                    index.tree.remove(id);
                    index.tree.prune();
                    warn!(
                        target_key = %self.key,
                        element = %key,
                        "member left the index: spatial reference differs from target"
                    );
                }
            }
        }
        self.notifier.changed(self.key);
    }

    pub(crate) fn member_dropped(&self, key: EntityKey) {
        {
            let mut index = self.index.borrow_mut();
            let Some(id) = index.by_key.remove(&key) else {
                return;
            };
            index.members.remove(id);
            index.tree.remove(id);
            index.tree.prune();
        }
        trace!(target_key = %self.key, element = %key, "dropped member removed from index");
        self.notifier.changed(self.key);
    }
}

impl SpatialTarget for GeoElementTarget {
    fn key(&self) -> EntityKey {
        self.key
    }

    fn spatial_reference(&self) -> SpatialReference {
        self.spatial_reference
    }

    fn candidate_geometries(&self, extent: Rect) -> Vec<Geometry> {
        let index = self.index.borrow();
        index
            .tree
            .query_rect(extent)
            .into_iter()
            .filter_map(|id| index.members.get(id)?.upgrade())
            .map(|e| e.geometry())
            .collect()
    }
}

impl Drop for GeoElementTarget {
    fn drop(&mut self) {
        self.notifier.removed(self.key);
    }
}
