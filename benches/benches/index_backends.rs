// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{
    BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main,
};
use kurbo::{Point, Rect, Vec2};
use vigil_quadtree::{EntryId, FlatVec, Quadtree, QuadtreeConfig, SpatialBackend};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

/// An `n` by `n` grid of touching squares.
fn gen_grid(n: usize, cell: f64) -> Vec<(EntryId, Rect)> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let x0 = x as f64 * cell;
            let y0 = y as f64 * cell;
            let id = EntryId::new(out.len() as u64);
            out.push((id, Rect::new(x0, y0, x0 + cell, y0 + cell)));
        }
    }
    out
}

/// Small rectangles gathered around a few random centers, like vessels
/// around harbours.
fn gen_clustered(n_clusters: usize, per_cluster: usize, spread: f64) -> Vec<(EntryId, Rect)> {
    let mut rng = Rng::new(0xC1A5_7E55_9999_ABCD);
    let centers: Vec<(f64, f64)> = (0..n_clusters)
        .map(|_| (rng.next_f64() * 2000.0, rng.next_f64() * 2000.0))
        .collect();
    let mut out = Vec::with_capacity(n_clusters * per_cluster);
    for (cx, cy) in centers {
        for _ in 0..per_cluster {
            let x = cx + (rng.next_f64() - 0.5) * spread;
            let y = cy + (rng.next_f64() - 0.5) * spread;
            let id = EntryId::new(out.len() as u64);
            out.push((id, Rect::new(x, y, x + 12.0, y + 12.0)));
        }
    }
    out
}

fn world_of(entries: &[(EntryId, Rect)]) -> Rect {
    entries
        .iter()
        .map(|(_, r)| *r)
        .reduce(|a, b| a.union(b))
        .unwrap_or(Rect::ZERO)
}

fn gen_probes(count: usize, world: Rect) -> Vec<Point> {
    let mut rng = Rng::new(0x81FD_BEE7_94F0_AF1A);
    (0..count)
        .map(|_| {
            Point::new(
                world.x0 + rng.next_f64() * world.width(),
                world.y0 + rng.next_f64() * world.height(),
            )
        })
        .collect()
}

fn filled<B: SpatialBackend>(mut backend: B, entries: &[(EntryId, Rect)]) -> B {
    for (id, rect) in entries {
        backend.insert(*id, *rect);
    }
    backend
}

fn bench_insert(c: &mut Criterion) {
    fn bench<B, F>(b: &mut criterion::Bencher<'_>, entries: &[(EntryId, Rect)], make: F)
    where
        B: SpatialBackend,
        F: Fn() -> B + Clone,
    {
        b.iter_batched(
            make,
            |backend| filled(backend, entries),
            BatchSize::SmallInput,
        );
    }

    let mut group = c.benchmark_group("insert_grid");
    for &n in &[16_usize, 32, 64] {
        let entries = gen_grid(n, 10.0);
        group.throughput(Throughput::Elements(entries.len() as u64));
        group.bench_function(BenchmarkId::new("FlatVec", n), |b| {
            bench(b, &entries, FlatVec::new);
        });
        group.bench_function(BenchmarkId::new("Quadtree", n), |b| {
            bench(b, &entries, || Quadtree::new(QuadtreeConfig::default()));
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_clustered");
    for &per_cluster in &[64_usize, 256, 1024] {
        let entries = gen_clustered(8, per_cluster, 200.0);
        let world = world_of(&entries);
        group.throughput(Throughput::Elements(entries.len() as u64));
        group.bench_function(BenchmarkId::new("Quadtree", entries.len()), |b| {
            b.iter(|| {
                let mut tree = Quadtree::new(QuadtreeConfig::default());
                tree.build(world, entries.iter().copied());
                tree
            });
        });
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    fn bench<B: SpatialBackend>(b: &mut criterion::Bencher<'_>, backend: &B, probes: &[Point]) {
        b.iter(|| {
            let mut hits = 0_usize;
            for probe in probes {
                let window = Rect::from_center_size(*probe, (25.0, 25.0));
                backend.visit_rect(black_box(window), |_| hits += 1);
            }
            hits
        });
    }

    let mut group = c.benchmark_group("query_clustered");
    for &per_cluster in &[64_usize, 256, 1024] {
        let entries = gen_clustered(8, per_cluster, 200.0);
        let probes = gen_probes(256, world_of(&entries));
        let flat = filled(FlatVec::new(), &entries);
        let mut tree = Quadtree::new(QuadtreeConfig::default());
        tree.build(world_of(&entries), entries.iter().copied());
        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_function(BenchmarkId::new("FlatVec", entries.len()), |b| {
            bench(b, &flat, &probes);
        });
        group.bench_function(BenchmarkId::new("Quadtree", entries.len()), |b| {
            bench(b, &tree, &probes);
        });
    }
    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_moving");
    for &per_cluster in &[64_usize, 256] {
        let entries = gen_clustered(8, per_cluster, 200.0);
        let world = world_of(&entries);
        group.throughput(Throughput::Elements(entries.len() as u64));
        group.bench_function(BenchmarkId::new("Quadtree", entries.len()), |b| {
            b.iter_batched(
                || {
                    let mut tree = Quadtree::new(QuadtreeConfig::default());
                    tree.build(world, entries.iter().copied());
                    tree
                },
                |mut tree| {
                    for (id, rect) in &entries {
                        tree.update(*id, *rect + Vec2::new(3.0, -2.0));
                    }
                    tree
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_build, bench_query, bench_update);
criterion_main!(benches);
