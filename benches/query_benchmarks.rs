use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use geo::{Point, polygon};
use geoquery::{
    ArenaTreeIndex, Envelope, LayerId, LeafRef, MemoryGeometryProvider, SearchArg,
    SpatialPredicate, SpatialQueryEngine,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

const LEAF_FANOUT: usize = 16;

/// Bulk-load a layer of unit-ish squares scattered over [0, extent]^2.
fn build_layer(
    index: &mut ArenaTreeIndex,
    provider: &mut MemoryGeometryProvider,
    layer: LayerId,
    first_id: u64,
    count: usize,
    extent: f64,
    rng: &mut StdRng,
) {
    let mut squares: Vec<(u64, f64, f64)> = (0..count)
        .map(|i| {
            (
                first_id + i as u64,
                rng.gen_range(0.0..extent),
                rng.gen_range(0.0..extent),
            )
        })
        .collect();
    squares.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut level = Vec::new();
    for chunk in squares.chunks(LEAF_FANOUT) {
        let mut entries = Vec::with_capacity(chunk.len());
        let mut node_env: Option<Envelope> = None;
        for &(id, x, y) in chunk {
            let entry_env = Envelope::new_2d(x, y, x + 1.0, y + 1.0).unwrap();
            provider.insert(
                LeafRef(id),
                polygon![
                    (x: x, y: y),
                    (x: x + 1.0, y: y),
                    (x: x + 1.0, y: y + 1.0),
                    (x: x, y: y + 1.0),
                ],
            );
            match &mut node_env {
                Some(existing) => existing.expand_to_include(&entry_env).unwrap(),
                None => node_env = Some(entry_env.clone()),
            }
            entries.push((LeafRef(id), entry_env));
        }
        level.push(index.add_leaf(node_env.unwrap(), entries));
    }
    while level.len() > 1 {
        level = level
            .chunks(LEAF_FANOUT)
            .map(|chunk| index.add_internal(chunk.to_vec()).unwrap())
            .collect();
    }
    let root = index.add_internal(vec![level[0]]).unwrap();
    index.set_layer_root(layer, root);
}

fn benchmark_range_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_queries");

    for dataset_size in [1_000usize, 10_000, 100_000] {
        let mut rng = StdRng::seed_from_u64(42);
        let mut index = ArenaTreeIndex::new();
        let mut provider = MemoryGeometryProvider::new();
        let extent = (dataset_size as f64).sqrt() * 4.0;
        build_layer(
            &mut index,
            &mut provider,
            LayerId(0),
            1,
            dataset_size,
            extent,
            &mut rng,
        );
        let engine = SpatialQueryEngine::new(&index, &provider);

        // A window covering roughly 1% of the extent.
        let side = extent / 10.0;
        let window = SearchArg::Window(
            Envelope::new_2d(extent / 2.0, extent / 2.0, extent / 2.0 + side, extent / 2.0 + side)
                .unwrap(),
        );
        group.bench_with_input(
            BenchmarkId::new("window_1pct", dataset_size),
            &dataset_size,
            |b, _| {
                b.iter(|| {
                    engine
                        .range(black_box(&[LayerId(0)]), black_box(&window), None)
                        .unwrap()
                })
            },
        );

        let around = SearchArg::Around {
            geometry: geo::Geometry::Point(Point::new(extent / 2.0, extent / 2.0)),
            distance: side,
        };
        group.bench_with_input(
            BenchmarkId::new("buffered_point", dataset_size),
            &dataset_size,
            |b, _| {
                b.iter(|| {
                    engine
                        .range(black_box(&[LayerId(0)]), black_box(&around), None)
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

fn benchmark_knn_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("knn_queries");

    let mut rng = StdRng::seed_from_u64(42);
    let mut index = ArenaTreeIndex::new();
    let mut provider = MemoryGeometryProvider::new();
    let extent = 1_000.0;
    build_layer(
        &mut index,
        &mut provider,
        LayerId(0),
        1,
        50_000,
        extent,
        &mut rng,
    );
    let engine = SpatialQueryEngine::new(&index, &provider);
    let query = Point::new(extent / 2.0, extent / 2.0);

    for k in [1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::new("knn", k), &k, |b, &k| {
            b.iter(|| {
                engine
                    .knn(black_box(&[LayerId(0)]), black_box(query), black_box(k))
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn benchmark_join_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("join_queries");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(20));

    for dataset_size in [1_000usize, 5_000] {
        let mut rng = StdRng::seed_from_u64(42);
        let mut index = ArenaTreeIndex::new();
        let mut provider = MemoryGeometryProvider::new();
        let extent = (dataset_size as f64).sqrt() * 8.0;
        build_layer(
            &mut index,
            &mut provider,
            LayerId(0),
            1,
            dataset_size,
            extent,
            &mut rng,
        );
        build_layer(
            &mut index,
            &mut provider,
            LayerId(1),
            1_000_000,
            dataset_size,
            extent,
            &mut rng,
        );
        let engine = SpatialQueryEngine::new(&index, &provider);

        group.bench_with_input(
            BenchmarkId::new("intersects", dataset_size),
            &dataset_size,
            |b, _| {
                b.iter(|| {
                    engine
                        .join(
                            black_box(LayerId(0)),
                            black_box(LayerId(1)),
                            SpatialPredicate::Intersects,
                        )
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_range_queries,
    benchmark_knn_queries,
    benchmark_join_queries
);

criterion_main!(benches);
