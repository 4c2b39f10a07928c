//! Criterion benchmarks for snap resolution.

use criterion::{Criterion, criterion_group, criterion_main};
use nalgebra::Point3;
use snapwright_core::graph::PartGraph;
use snapwright_core::test_utils::*;
use snapwright_spatial::{SnapRequest, SnapResolver, SpatialIndex};

/// A flat `n` x `n` field of flush cubes plus one unplaced preview cube.
fn field(n: usize) -> (PartGraph, snapwright_core::id::PartId) {
    let mut graph = PartGraph::new();
    for z in 0..n {
        for x in 0..n {
            placed_cube(&mut graph, x as f64, 0.0, z as f64);
        }
    }
    let preview = graph.spawn(&cube_prefab("cube"), pose_at(0.0, 5.0, 0.0));
    (graph, preview)
}

fn bench_snap(c: &mut Criterion) {
    let mut group = c.benchmark_group("snap");
    group.sample_size(50);

    // Benchmark: rebuild the index over 400 parts.
    group.bench_function("index_rebuild_400", |b| {
        let (graph, _) = field(20);
        let mut index = SpatialIndex::new();
        b.iter(|| index.rebuild(&graph));
    });

    // Benchmark: general-path resolve over a dense field.
    group.bench_function("resolve_dense_field", |b| {
        let (mut graph, preview) = field(20);
        let index = SpatialIndex::from_graph(&graph);
        let mut resolver = SnapResolver::default();
        let request = SnapRequest::at(Point3::new(10.2, 1.1, 10.3));
        b.iter(|| resolver.resolve(&mut graph, &index, preview, &request, &[]));
    });

    // Benchmark: hovered-target resolve with a face filter.
    group.bench_function("resolve_hovered_face", |b| {
        let (mut graph, preview) = field(20);
        let index = SpatialIndex::from_graph(&graph);
        let target = graph.parts_in_spawn_order()[210];
        let mut resolver = SnapResolver::default();
        let request = SnapRequest::hovering(
            Point3::new(10.0, 1.1, 10.0),
            target,
            Some(nalgebra::Vector3::y()),
        );
        b.iter(|| resolver.resolve(&mut graph, &index, preview, &request, &[]));
    });

    group.finish();
}

criterion_group!(benches, bench_snap);
criterion_main!(benches);
