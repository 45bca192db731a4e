// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vigil Quadtree: an incremental quadtree over 2D extents.
//!
//! This crate indexes opaque entries by [`EntryId`] and their axis-aligned
//! bounding extents ([`kurbo::Rect`]). It answers "which entries might overlap
//! this region?" with a **candidate set**: the result is conservative (no false
//! negatives for entries inside the root extent) but may contain entries whose
//! exact geometry does not touch the query. Callers are expected to run their
//! own precise test over the returned ids.
//!
//! - [`Quadtree`]: the tree itself, with incremental [`insert`](Quadtree::insert),
//!   [`update`](Quadtree::update), [`remove`](Quadtree::remove) and
//!   [`prune`](Quadtree::prune), plus wholesale [`build`](Quadtree::build).
//! - [`EntityTable`]: a stable `EntryId -> handle` table whose keys are never
//!   reused. Handles are typically weak references; the tree never owns
//!   the lifetime of what it indexes.
//! - [`SpatialBackend`]: the common insert/update/remove/visit surface, implemented
//!   by [`Quadtree`] and by [`FlatVec`] (a linear scan that is useful as an exact
//!   oracle and for tiny sets).
//!
//! ## Minimal example
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use vigil_quadtree::{EntityTable, Quadtree, QuadtreeConfig};
//!
//! let mut handles = EntityTable::new();
//! let a = handles.insert("harbour");
//! let b = handles.insert("airfield");
//!
//! let mut tree = Quadtree::new(QuadtreeConfig::default());
//! tree.build(
//!     Rect::new(0.0, 0.0, 100.0, 100.0),
//!     [(a, Rect::new(10.0, 10.0, 20.0, 20.0)), (b, Rect::new(70.0, 70.0, 90.0, 80.0))],
//! );
//!
//! let hits = tree.query_point(Point::new(15.0, 15.0));
//! assert!(hits.contains(&a));
//! assert!(!hits.contains(&b));
//! ```
//!
//! ## Node model
//!
//! Each node covers an axis-aligned box and keeps the set of ids whose extent
//! intersects it. An id is *assigned* to a node (and not pushed further down)
//! once the node is at the configured depth limit or the entry's extent covers
//! the whole node; otherwise it is pushed into every child quadrant its extent
//! touches, materializing children lazily. An id straddling a split line is
//! therefore held by several nodes. Nodes whose id set becomes empty are
//! removed by [`Quadtree::prune`].
//!
//! When an extent no longer fits inside the root, or enough entries have been
//! inserted and removed since the last build, the tree refits itself over the
//! union of every indexed extent and reports [`Reindex::Rebuilt`].
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod backend;
pub mod backends;
mod config;
mod entry;
pub mod extent;
mod tree;

pub use backend::SpatialBackend;
pub use backends::FlatVec;
pub use config::QuadtreeConfig;
pub use entry::{EntityTable, EntryId};
pub use tree::{NodeInfo, Quadtree, Reindex};
