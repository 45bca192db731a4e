// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use vigil_alerts::{
    AlertCondition, AlertLevel, AlertRegistry, AlertTarget, FilteredAlertView, GeoElement,
    GeoElementTarget, Geometry, LinearUnit, PositionSource, SpatialReference,
};

/// A registry with `zones` square zones on a grid and `movers` position
/// sources, each bound to the zone target.
struct Scene {
    registry: AlertRegistry,
    _target: Rc<GeoElementTarget>,
    _zones: Vec<Rc<GeoElement>>,
    movers: Vec<Rc<PositionSource>>,
}

fn square(x: f64, y: f64, half: f64) -> Geometry {
    Geometry::wgs84_polygon([
        (x - half, y - half),
        (x + half, y - half),
        (x + half, y + half),
        (x - half, y + half),
    ])
}

fn scene(zones: usize, movers: usize, condition: &AlertCondition) -> Scene {
    let registry = AlertRegistry::default();
    let notifier = registry.notifier();
    let target = GeoElementTarget::new(&notifier, SpatialReference::Wgs84);
    let side = (zones as f64).sqrt().ceil() as usize;
    let elements: Vec<Rc<GeoElement>> = (0..zones)
        .map(|i| {
            let x = (i % side) as f64 * 0.1;
            let y = (i / side) as f64 * 0.1;
            let zone = GeoElement::new(&notifier, square(x, y, 0.02));
            target.add_element(&zone);
            zone
        })
        .collect();
    let sources: Vec<Rc<PositionSource>> = (0..movers)
        .map(|i| {
            let source = PositionSource::at(&notifier, Geometry::wgs84_point(0.0, i as f64 * 0.01));
            if let Ok(data) = condition.instantiate(source.clone(), &AlertTarget::spatial(&target)) {
                registry.add_condition(data);
            }
            source
        })
        .collect();
    Scene {
        registry,
        _target: target,
        _zones: elements,
        movers: sources,
    }
}

fn bench_moves(c: &mut Criterion, group_name: &str, condition: &AlertCondition) {
    let mut group = c.benchmark_group(group_name);
    for &zones in &[16_usize, 256, 1024] {
        let scene = scene(zones, 32, condition);
        let mut step = 0_u32;
        group.throughput(Throughput::Elements(scene.movers.len() as u64));
        group.bench_function(BenchmarkId::from_parameter(zones), |b| {
            b.iter(|| {
                step = step.wrapping_add(1);
                let dx = f64::from(step % 64) * 0.025;
                for (i, mover) in scene.movers.iter().enumerate() {
                    mover.set_wgs84(dx, i as f64 * 0.01);
                }
                black_box(scene.registry.row_count())
            });
        });
    }
    group.finish();
}

fn bench_within_area(c: &mut Criterion) {
    if let Ok(condition) = AlertCondition::within_area("in zone", AlertLevel::High) {
        bench_moves(c, "within_area_moves", &condition);
    }
}

fn bench_within_distance(c: &mut Criterion) {
    if let Ok(condition) = AlertCondition::within_distance(
        "near zone",
        AlertLevel::Medium,
        500.0,
        LinearUnit::Meters,
    ) {
        bench_moves(c, "within_distance_moves", &condition);
    }
}

fn bench_view_sync(c: &mut Criterion) {
    let Ok(condition) = AlertCondition::within_area("in zone", AlertLevel::High) else {
        return;
    };
    let mut group = c.benchmark_group("view_sync");
    for &movers in &[32_usize, 256] {
        let scene = scene(256, movers, &condition);
        let mut view = FilteredAlertView::new(&scene.registry);
        let mut step = 0_u32;
        group.bench_function(BenchmarkId::from_parameter(movers), |b| {
            b.iter(|| {
                step = step.wrapping_add(1);
                let dx = f64::from(step % 64) * 0.025;
                if let Some(first) = scene.movers.first() {
                    first.set_wgs84(dx, 0.0);
                }
                black_box(view.row_count())
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_within_area,
    bench_within_distance,
    bench_view_sync
);
criterion_main!(benches);
