// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filtered view behavior and cache consistency.

use std::rc::Rc;

use proptest::prelude::*;
use vigil_alerts::{
    AlertCondition, AlertFilter, AlertLevel, AlertRegistry, AlertTarget, AttributeValue,
    ConditionId, FilteredAlertView, FixedValueTarget, GeoElement, Geometry, IdsFilter, LevelFilter,
    SortOrder,
};

/// A registry with one attribute-equals binding per track, all against the
/// same "hostile" target.
struct Fixture {
    registry: AlertRegistry,
    _target: Rc<FixedValueTarget>,
    tracks: Vec<Rc<GeoElement>>,
    ids: Vec<ConditionId>,
}

fn fixture(tracks: &[(AlertLevel, bool)]) -> Fixture {
    let registry = AlertRegistry::default();
    let notifier = registry.notifier();
    let target = FixedValueTarget::new(&notifier, "hostile");
    let mut elements = Vec::new();
    let mut ids = Vec::new();
    for (i, (level, hostile)) in tracks.iter().enumerate() {
        let status = if *hostile { "hostile" } else { "friendly" };
        let track = GeoElement::with_attributes(
            &notifier,
            Geometry::wgs84_point(0.0, 0.0),
            [("status", status)],
        );
        let data = AlertCondition::attribute_equals(format!("track {i}"), *level, "status")
            .unwrap()
            .instantiate(track.clone(), &AlertTarget::value(&target))
            .unwrap();
        ids.push(registry.add_condition(data).unwrap());
        elements.push(track);
    }
    Fixture {
        registry,
        _target: target,
        tracks: elements,
        ids,
    }
}

#[test]
fn excluded_ids_come_back_with_the_same_identity() {
    let f = fixture(&[(AlertLevel::High, true), (AlertLevel::High, true)]);
    let ids_filter = Rc::new(IdsFilter::new());
    let level_filter = Rc::new(LevelFilter::new(AlertLevel::Medium));
    let mut view = FilteredAlertView::new(&f.registry);
    view.apply_filters([
        ids_filter.clone() as Rc<dyn AlertFilter>,
        level_filter as Rc<dyn AlertFilter>,
    ]);
    assert_eq!(view.ids(), f.ids);

    let u = f.ids[0];
    ids_filter.add_excluded_id(u);
    assert!(!view.contains(u));
    assert_eq!(view.ids(), [f.ids[1]]);
    assert_eq!(f.registry.matches_query(0), Some(true));

    ids_filter.clear_excluded_ids();
    assert!(view.contains(u));
    assert_eq!(view.ids(), f.ids);
    assert_eq!(f.registry.condition(u).unwrap().id(), Some(u));
    assert_eq!(f.registry.row_count(), 2);
}

#[test]
fn level_filter_and_disabled_rows() {
    let f = fixture(&[
        (AlertLevel::Low, true),
        (AlertLevel::High, true),
        (AlertLevel::Critical, false),
        (AlertLevel::Critical, true),
    ]);
    let level = Rc::new(LevelFilter::new(AlertLevel::High));
    let mut view = FilteredAlertView::new(&f.registry);
    view.apply_filters([level.clone() as Rc<dyn AlertFilter>]);
    assert_eq!(view.ids(), [f.ids[1], f.ids[3]]);

    level.set_minimum_level(AlertLevel::Low);
    assert_eq!(view.row_count(), 3);

    f.registry.set_condition_enabled(f.ids[0], false);
    assert_eq!(view.ids(), [f.ids[1], f.ids[3]]);
    assert_eq!(view.active_count_at_or_above(AlertLevel::Critical), 1);
    assert_eq!(view.active_count_at_or_above(AlertLevel::Low), 2);
}

#[test]
fn sort_by_level() {
    let f = fixture(&[
        (AlertLevel::Low, true),
        (AlertLevel::Critical, true),
        (AlertLevel::Medium, true),
        (AlertLevel::Critical, true),
    ]);
    let mut view = FilteredAlertView::new(&f.registry);
    assert_eq!(view.sort_order(), SortOrder::Registry);
    view.set_sort_order(SortOrder::LevelDescending);
    assert_eq!(view.ids(), [f.ids[1], f.ids[3], f.ids[2], f.ids[0]]);
    assert_eq!(view.source_row(0), Some(1));
    assert_eq!(view.row_at(3), Some(f.ids[0]));
    assert_eq!(view.row_at(4), None);
}

#[test]
fn row_changes_only_retest_that_row() {
    let f = fixture(&[
        (AlertLevel::High, true),
        (AlertLevel::High, false),
        (AlertLevel::High, true),
    ]);
    let mut view = FilteredAlertView::new(&f.registry);
    assert_eq!(view.cached_rows(), 0);
    assert_eq!(view.row_count(), 2);
    assert_eq!(view.cached_rows(), 3);
    let tests = view.filter_tests();

    f.tracks[1].set_attribute("status", "hostile");
    assert_eq!(view.row_count(), 3);
    assert_eq!(view.filter_tests(), tests + 1);

    // Reading again without changes costs nothing.
    assert_eq!(view.row_count(), 3);
    assert_eq!(view.filter_tests(), tests + 1);
}

#[test]
fn structural_changes_clear_the_cache() {
    let mut f = fixture(&[(AlertLevel::High, true), (AlertLevel::High, true)]);
    let mut view = FilteredAlertView::new(&f.registry);
    assert_eq!(view.ids(), f.ids);

    let first = f.tracks.remove(0);
    drop(first);
    assert_eq!(view.ids(), [f.ids[1]]);
    assert_eq!(view.source_row(0), Some(0));

    f.registry.remove_condition(f.ids[1]);
    assert_eq!(view.row_count(), 0);
    assert_eq!(view.cached_rows(), 0);
}

#[derive(Clone, Debug)]
enum Op {
    Toggle(usize),
    Enable(usize, bool),
    MinLevel(u8),
    Exclude(usize),
    Include(usize),
    ClearExcluded,
    Replace,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..6_usize).prop_map(Op::Toggle),
        (0..6_usize, any::<bool>()).prop_map(|(i, on)| Op::Enable(i, on)),
        (1..=4_u8).prop_map(Op::MinLevel),
        (0..6_usize).prop_map(Op::Exclude),
        (0..6_usize).prop_map(Op::Include),
        Just(Op::ClearExcluded),
        Just(Op::Replace),
    ]
}

proptest! {
    #[test]
    fn view_matches_a_fresh_scan(
        levels in proptest::collection::vec((1..=4_u8, any::<bool>()), 6),
        ops in proptest::collection::vec(arb_op(), 1..40),
    ) {
        let tracks: Vec<(AlertLevel, bool)> = levels
            .iter()
            .map(|(l, h)| (AlertLevel::from_u8(*l).unwrap(), *h))
            .collect();
        let f = fixture(&tracks);
        let mut level = Rc::new(LevelFilter::new(AlertLevel::Low));
        let ids_filter = Rc::new(IdsFilter::new());
        let mut view = FilteredAlertView::new(&f.registry);
        view.apply_filters([
            level.clone() as Rc<dyn AlertFilter>,
            ids_filter.clone() as Rc<dyn AlertFilter>,
        ]);

        for op in ops {
            match op {
                Op::Toggle(i) => {
                    let hostile = f.tracks[i].attribute("status") == AttributeValue::from("hostile");
                    let next = if hostile { "friendly" } else { "hostile" };
                    f.tracks[i].set_attribute("status", next);
                }
                Op::Enable(i, on) => f.registry.set_condition_enabled(f.ids[i], on),
                Op::MinLevel(l) => level.set_minimum_level(AlertLevel::from_u8(l).unwrap()),
                Op::Exclude(i) => { ids_filter.add_excluded_id(f.ids[i]); }
                Op::Include(i) => { ids_filter.remove_excluded_id(f.ids[i]); }
                Op::ClearExcluded => ids_filter.clear_excluded_ids(),
                Op::Replace => {
                    level = Rc::new(LevelFilter::new(level.minimum_level()));
                    view.apply_filters([
                        level.clone() as Rc<dyn AlertFilter>,
                        ids_filter.clone() as Rc<dyn AlertFilter>,
                    ]);
                }
            }

            let expected: Vec<ConditionId> = (0..f.registry.row_count())
                .filter(|row| {
                    let visible = {
                        let data = f.registry.row_at(*row).unwrap();
                        data.is_enabled()
                            && data.level() >= level.minimum_level()
                            && !ids_filter.is_excluded(data.id().unwrap())
                    };
                    visible && f.registry.matches_query(*row) == Some(true)
                })
                .map(|row| f.registry.row_at(row).unwrap().id().unwrap())
                .collect();
            prop_assert_eq!(view.ids(), expected);
        }
    }
}
