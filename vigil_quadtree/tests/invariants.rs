// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for the quadtree.
//!
//! The flat-vector backend is exact with respect to stored extents, so it is
//! used as the oracle: every id it reports must also be a quadtree candidate.

use kurbo::{Point, Rect};
use proptest::prelude::*;
use vigil_quadtree::{EntryId, FlatVec, Quadtree, QuadtreeConfig, SpatialBackend};

#[derive(Clone, Debug)]
enum Op {
    Insert(u64, Rect),
    Update(u64, Rect),
    Remove(u64),
}

fn arb_rect() -> impl Strategy<Value = Rect> {
    (0.0..1000.0_f64, 0.0..1000.0_f64, 0.0..150.0_f64, 0.0..150.0_f64)
        .prop_map(|(x, y, w, h)| Rect::new(x, y, x + w, y + h))
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..40_u64, arb_rect()).prop_map(|(id, r)| Op::Insert(id, r)),
        2 => (0..40_u64, arb_rect()).prop_map(|(id, r)| Op::Update(id, r)),
        1 => (0..40_u64).prop_map(Op::Remove),
    ]
}

fn arb_config() -> impl Strategy<Value = QuadtreeConfig> {
    (1_u8..9, 0.0..1.0_f64, 0_usize..40).prop_map(|(levels, ratio, min)| {
        QuadtreeConfig::default()
            .with_max_levels(levels)
            .with_churn_rebuild(ratio, min)
    })
}

fn apply(tree: &mut Quadtree, oracle: &mut FlatVec, op: &Op) {
    match *op {
        Op::Insert(id, r) => {
            tree.insert(EntryId::new(id), r);
            SpatialBackend::insert(oracle, EntryId::new(id), r);
        }
        Op::Update(id, r) => {
            tree.update(EntryId::new(id), r);
            SpatialBackend::update(oracle, EntryId::new(id), r);
        }
        Op::Remove(id) => {
            tree.remove(EntryId::new(id));
            tree.prune();
            SpatialBackend::remove(oracle, EntryId::new(id));
        }
    }
}

proptest! {
    #[test]
    fn candidates_never_miss_a_true_intersection(
        config in arb_config(),
        ops in proptest::collection::vec(arb_op(), 1..80),
        queries in proptest::collection::vec(arb_rect(), 1..10),
    ) {
        let mut tree = Quadtree::new(config);
        let mut oracle = FlatVec::new();
        for op in &ops {
            apply(&mut tree, &mut oracle, op);
        }
        prop_assert_eq!(tree.len(), oracle.len());
        for q in queries {
            let candidates = tree.query_rect(q);
            for id in SpatialBackend::query_rect(&oracle, q) {
                prop_assert!(candidates.contains(&id), "missing {} for query {:?}", id, q);
            }
        }
    }

    #[test]
    fn point_queries_never_miss(
        ops in proptest::collection::vec(arb_op(), 1..60),
        points in proptest::collection::vec((0.0..1150.0_f64, 0.0..1150.0_f64), 1..20),
    ) {
        let mut tree = Quadtree::default();
        let mut oracle = FlatVec::new();
        for op in &ops {
            apply(&mut tree, &mut oracle, op);
        }
        for (x, y) in points {
            let p = Point::new(x, y);
            let candidates = tree.query_point(p);
            for id in SpatialBackend::query_point(&oracle, p) {
                prop_assert!(candidates.contains(&id));
            }
        }
    }

    #[test]
    fn pruned_tree_has_no_empty_nodes(
        config in arb_config(),
        ops in proptest::collection::vec(arb_op(), 1..80),
    ) {
        let mut tree = Quadtree::new(config);
        for op in &ops {
            match *op {
                Op::Insert(id, r) => { tree.insert(EntryId::new(id), r); }
                Op::Update(id, r) => { tree.update(EntryId::new(id), r); }
                Op::Remove(id) => { tree.remove(EntryId::new(id)); }
            }
        }
        tree.prune();
        let max_levels = config.max_levels;
        let mut ok = true;
        tree.visit_nodes(|n| {
            ok &= !n.ids.is_empty();
            ok &= n.depth <= max_levels;
            ok &= n.assigned.iter().all(|id| n.ids.contains(id));
        });
        prop_assert!(ok);
    }
}

#[test]
fn build_covers_entries_outside_the_requested_extent() {
    let mut tree = Quadtree::default();
    tree.build(
        Rect::new(0.0, 0.0, 10.0, 10.0),
        [(EntryId::new(1), Rect::new(50.0, 50.0, 60.0, 60.0))],
    );
    assert!(tree.query_point(Point::new(55.0, 55.0)).contains(&EntryId::new(1)));
}
