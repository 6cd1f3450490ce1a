//! Performance benchmarks for listsync-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use listsync_engine::{
    CacheSnapshot, ConnectivityState, Delivery, EngineConfig, MemoryCacheStore,
    MemoryRemoteSource, ShoppingList, SyncEngine,
};

fn make_lists(count: usize) -> Vec<ShoppingList> {
    (0..count)
        .map(|i| {
            ShoppingList::new("user_1", format!("List {}", i), ["Milk", "Eggs", "Bread"])
                .with_id(format!("L{}", i))
        })
        .collect()
}

fn bench_snapshot_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_codec");

    for size in [10, 100, 1000] {
        let snapshot = CacheSnapshot::new(make_lists(size));
        let json = snapshot.to_json().unwrap();

        group.bench_with_input(BenchmarkId::new("to_json", size), &snapshot, |b, s| {
            b.iter(|| black_box(s).to_json())
        });

        group.bench_with_input(BenchmarkId::new("from_json", size), &json, |b, j| {
            b.iter(|| CacheSnapshot::from_json(black_box(j)))
        });
    }

    group.finish();
}

fn bench_remote_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("remote_snapshot");

    for size in [10, 100, 1000] {
        let lists = make_lists(size);

        group.bench_with_input(BenchmarkId::new("apply", size), &lists, |b, lists| {
            let (mut engine, _deliveries) = SyncEngine::new(
                EngineConfig::new("user_1"),
                MemoryCacheStore::new(),
                MemoryRemoteSource::new(),
            )
            .unwrap();
            engine.on_connectivity_changed(ConnectivityState::Connected);
            let generation = engine.active_generation().unwrap();

            b.iter(|| {
                engine.on_remote_snapshot(black_box(Delivery {
                    generation,
                    lists: lists.clone(),
                }))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_snapshot_codec, bench_remote_snapshot);
criterion_main!(benches);
