// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The quadtree and its nodes.

use alloc::boxed::Box;
use core::fmt;

use hashbrown::{HashMap, HashSet};
use kurbo::{Point, Rect};
use smallvec::SmallVec;

use crate::config::QuadtreeConfig;
use crate::entry::EntryId;
use crate::extent;

type IdSet = SmallVec<[EntryId; 8]>;

/// How an insert or update was absorbed by the tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Reindex {
    /// The entry was placed in the existing node structure.
    Incremental,
    /// The whole tree was rebuilt over the union of all indexed extents.
    Rebuilt,
}

/// Read-only view of a node, handed out by [`Quadtree::visit_nodes`].
#[derive(Copy, Clone, Debug)]
pub struct NodeInfo<'a> {
    /// Bounds covered by the node.
    pub bounds: Rect,
    /// Depth of the node; the root is `0`.
    pub depth: u8,
    /// Every id whose extent intersects this node (its own plus its children's).
    pub ids: &'a [EntryId],
    /// Ids that terminate at this node rather than being pushed to children.
    pub assigned: &'a [EntryId],
    /// Number of materialized children.
    pub children: usize,
}

struct Node {
    bounds: Rect,
    depth: u8,
    ids: IdSet,
    assigned: IdSet,
    children: [Option<Box<Node>>; 4],
}

impl Node {
    fn new(bounds: Rect, depth: u8) -> Self {
        Self {
            bounds,
            depth,
            ids: SmallVec::new(),
            assigned: SmallVec::new(),
            children: [None, None, None, None],
        }
    }

    fn quadrant(&self, q: usize) -> Rect {
        let b = self.bounds;
        let c = b.center();
        match q {
            0 => Rect::new(b.x0, b.y0, c.x, c.y),
            1 => Rect::new(c.x, b.y0, b.x1, c.y),
            2 => Rect::new(b.x0, c.y, c.x, b.y1),
            _ => Rect::new(c.x, c.y, b.x1, b.y1),
        }
    }

    /// Places `id` in this node and, unless it terminates here, in every child it touches.
    ///
    /// The caller guarantees `extent` intersects `self.bounds`.
    fn assign(&mut self, id: EntryId, extent: &Rect, max_levels: u8) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
        if self.depth >= max_levels || extent::contains_rect(extent, &self.bounds) {
            if !self.assigned.contains(&id) {
                self.assigned.push(id);
            }
            return;
        }
        let child_depth = self.depth + 1;
        for q in 0..4 {
            let quadrant = self.quadrant(q);
            if !extent::intersects(&quadrant, extent) {
                continue;
            }
            let child =
                self.children[q].get_or_insert_with(|| Box::new(Self::new(quadrant, child_depth)));
            child.assign(id, extent, max_levels);
        }
    }

    fn remove(&mut self, id: EntryId) -> bool {
        let Some(pos) = self.ids.iter().position(|x| *x == id) else {
            return false;
        };
        self.ids.swap_remove(pos);
        if let Some(pos) = self.assigned.iter().position(|x| *x == id) {
            self.assigned.swap_remove(pos);
        }
        for child in self.children.iter_mut().flatten() {
            child.remove(id);
        }
        true
    }

    fn prune(&mut self) {
        for slot in &mut self.children {
            if slot.as_ref().is_some_and(|c| c.ids.is_empty()) {
                *slot = None;
            } else if let Some(child) = slot {
                child.prune();
            }
        }
    }

    fn visit_rect(&self, rect: &Rect, f: &mut impl FnMut(EntryId)) {
        if !extent::intersects(&self.bounds, rect) {
            return;
        }
        for id in &self.assigned {
            f(*id);
        }
        for child in self.children.iter().flatten() {
            child.visit_rect(rect, f);
        }
    }

    fn visit_nodes(&self, f: &mut impl FnMut(NodeInfo<'_>)) {
        f(NodeInfo {
            bounds: self.bounds,
            depth: self.depth,
            ids: &self.ids,
            assigned: &self.assigned,
            children: self.children.iter().flatten().count(),
        });
        for child in self.children.iter().flatten() {
            child.visit_nodes(f);
        }
    }
}

/// An incremental quadtree over entry extents.
///
/// The tree stores each entry's last indexed extent so that removal and
/// refitting rebuilds do not need the caller's entities. Exact geometry is
/// never stored; queries return candidate sets.
///
/// Float inputs are assumed to be finite; non-finite extents are ignored.
///
/// # Example
///
/// ```rust
/// use kurbo::Rect;
/// use vigil_quadtree::{EntryId, Quadtree, QuadtreeConfig, Reindex};
///
/// let mut tree = Quadtree::new(QuadtreeConfig::default());
/// let a = EntryId::new(0);
///
/// // The first insert fits the root around the extent.
/// assert_eq!(tree.insert(a, Rect::new(0.0, 0.0, 10.0, 10.0)), Reindex::Rebuilt);
///
/// // Moving inside the root is incremental; moving outside refits.
/// assert_eq!(tree.update(a, Rect::new(2.0, 2.0, 8.0, 8.0)), Reindex::Incremental);
/// assert_eq!(tree.update(a, Rect::new(50.0, 50.0, 60.0, 60.0)), Reindex::Rebuilt);
///
/// assert!(tree.query_rect(Rect::new(55.0, 55.0, 56.0, 56.0)).contains(&a));
/// ```
pub struct Quadtree {
    config: QuadtreeConfig,
    bounds: Option<Rect>,
    root: Option<Box<Node>>,
    extents: HashMap<EntryId, Rect>,
    churn: usize,
}

impl fmt::Debug for Quadtree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Quadtree")
            .field("config", &self.config)
            .field("bounds", &self.bounds)
            .field("len", &self.extents.len())
            .field("nodes", &self.node_count())
            .field("churn", &self.churn)
            .finish_non_exhaustive()
    }
}

impl Default for Quadtree {
    fn default() -> Self {
        Self::new(QuadtreeConfig::default())
    }
}

impl Quadtree {
    /// Creates an empty tree with no root extent.
    #[must_use]
    pub fn new(config: QuadtreeConfig) -> Self {
        Self {
            config,
            bounds: None,
            root: None,
            extents: HashMap::new(),
            churn: 0,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &QuadtreeConfig {
        &self.config
    }

    /// Resets the tree to a single root and assigns every entry into it.
    ///
    /// The root covers `extent` grown to include every entry, so no entry is
    /// ever left outside the indexed region. Previously indexed entries are
    /// forgotten. Empty nodes are pruned.
    pub fn build(&mut self, extent: Rect, entries: impl IntoIterator<Item = (EntryId, Rect)>) {
        self.extents.clear();
        let mut root_extent = extent.abs();
        for (id, e) in entries {
            if !extent::is_finite(&e) {
                continue;
            }
            let e = e.abs();
            root_extent = root_extent.union(e);
            self.extents.insert(id, e);
        }
        self.rebuild_over(root_extent);
    }

    /// Indexes `id` with `extent`.
    ///
    /// If the extent fits in the current root, the id is pushed down the
    /// existing structure, creating only the children it actually touches.
    /// Otherwise, or when the churn budget is exhausted, the tree is rebuilt over
    /// the union of all extents. Inserting an id that is already present behaves
    /// like [`update`](Self::update).
    pub fn insert(&mut self, id: EntryId, extent: Rect) -> Reindex {
        if !extent::is_finite(&extent) {
            return Reindex::Incremental;
        }
        let extent = extent.abs();
        if self.extents.contains_key(&id) {
            return self.update(id, extent);
        }
        self.extents.insert(id, extent);
        self.churn += 1;
        match self.bounds {
            Some(bounds)
                if extent::contains_rect(&bounds, &extent)
                    && self.churn <= self.config.churn_budget(self.extents.len()) =>
            {
                let max_levels = self.config.max_levels;
                self.root
                    .get_or_insert_with(|| Box::new(Node::new(bounds, 0)))
                    .assign(id, &extent, max_levels);
                Reindex::Incremental
            }
            _ => {
                self.refit();
                Reindex::Rebuilt
            }
        }
    }

    /// Removes `id` from every node that holds it.
    ///
    /// Nodes left with an empty id set stay in place until [`prune`](Self::prune)
    /// runs. Returns `false` if `id` was not indexed.
    pub fn remove(&mut self, id: EntryId) -> bool {
        if self.extents.remove(&id).is_none() {
            return false;
        }
        self.churn += 1;
        if let Some(root) = self.root.as_mut() {
            root.remove(id);
        }
        true
    }

    /// Deletes every node whose id set is empty, including the root.
    pub fn prune(&mut self) {
        if self.root.as_ref().is_some_and(|r| r.ids.is_empty()) {
            self.root = None;
        } else if let Some(root) = self.root.as_mut() {
            root.prune();
        }
    }

    /// Moves `id` to `extent`.
    ///
    /// While the new extent fits inside the root this is `remove` + `insert` +
    /// `prune` on the existing structure; otherwise the tree is rebuilt over
    /// the union of all live extents. Updating an unknown id inserts it.
    pub fn update(&mut self, id: EntryId, extent: Rect) -> Reindex {
        if !extent::is_finite(&extent) {
            return Reindex::Incremental;
        }
        let extent = extent.abs();
        let Some(old) = self.extents.get_mut(&id) else {
            return self.insert(id, extent);
        };
        if *old == extent {
            return Reindex::Incremental;
        }
        *old = extent;
        match (self.bounds, self.root.as_mut()) {
            (Some(bounds), Some(root)) if extent::contains_rect(&bounds, &extent) => {
                root.remove(id);
                root.assign(id, &extent, self.config.max_levels);
                self.prune();
                Reindex::Incremental
            }
            _ => {
                self.refit();
                Reindex::Rebuilt
            }
        }
    }

    /// Returns the ids of every entry that may intersect `rect`.
    ///
    /// This is a bounding-box candidate set: it never omits an entry whose
    /// indexed extent intersects `rect`, but it may include entries that do not.
    /// An empty tree yields an empty set.
    #[must_use]
    pub fn query_rect(&self, rect: Rect) -> HashSet<EntryId> {
        let mut out = HashSet::new();
        self.visit_rect(rect, |id| {
            out.insert(id);
        });
        out
    }

    /// Returns the ids of every entry that may contain `point`.
    #[must_use]
    pub fn query_point(&self, point: Point) -> HashSet<EntryId> {
        self.query_rect(Rect::from_points(point, point))
    }

    /// Visits candidate ids for `rect`. The same id may be visited more than once.
    pub fn visit_rect(&self, rect: Rect, mut f: impl FnMut(EntryId)) {
        if let Some(root) = self.root.as_ref() {
            root.visit_rect(&rect.abs(), &mut f);
        }
    }

    /// Root extent of the current build, if any.
    ///
    /// The extent survives removal of every entry so later inserts inside it stay incremental.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    /// Number of indexed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extents.len()
    }

    /// Returns `true` if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extents.is_empty()
    }

    /// Returns `true` if `id` is indexed.
    #[must_use]
    pub fn contains(&self, id: EntryId) -> bool {
        self.extents.contains_key(&id)
    }

    /// Extent `id` was last indexed with.
    #[must_use]
    pub fn extent_of(&self, id: EntryId) -> Option<Rect> {
        self.extents.get(&id).copied()
    }

    /// Iterates over every indexed `(id, extent)` pair in unspecified order.
    pub fn entries(&self) -> impl Iterator<Item = (EntryId, Rect)> + '_ {
        self.extents.iter().map(|(id, e)| (*id, *e))
    }

    /// Number of materialized nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        let mut n = 0;
        self.visit_nodes(|_| n += 1);
        n
    }

    /// Visits every reachable node depth-first, root first.
    pub fn visit_nodes(&self, mut f: impl FnMut(NodeInfo<'_>)) {
        if let Some(root) = self.root.as_ref() {
            root.visit_nodes(&mut f);
        }
    }

    /// Forgets every entry and the root extent.
    pub fn clear(&mut self) {
        self.extents.clear();
        self.root = None;
        self.bounds = None;
        self.churn = 0;
    }

    /// Rebuilds over the union of every live extent.
    fn refit(&mut self) {
        let mut union: Option<Rect> = None;
        for e in self.extents.values() {
            union = Some(union.map_or(*e, |u| u.union(*e)));
        }
        match union {
            Some(extent) => self.rebuild_over(extent),
            None => {
                self.root = None;
                self.churn = 0;
            }
        }
    }

    fn rebuild_over(&mut self, extent: Rect) {
        let max_levels = self.config.max_levels;
        let mut root = Node::new(extent, 0);
        for (id, e) in &self.extents {
            root.assign(*id, e, max_levels);
        }
        self.bounds = Some(extent);
        self.root = Some(Box::new(root));
        self.churn = 0;
        self.prune();
    }
}
