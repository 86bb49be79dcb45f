//! Throughput of the arena collections and of the partitioned runner under each policy.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tmsync::SyncPolicy;
use tmsync_bench::harness::{Benchmark, Input, Registry};
use tmsync_bench::{ChainedMap, DynArray, OrderedSet};

const SIZES: [usize; 3] = [1_000, 10_000, 100_000];

fn bench_collections(c: &mut Criterion) {
    let mut group = c.benchmark_group("collections");

    for size in SIZES {
        let values = Input::generate(size, 1, 0x5eed).values().to_vec();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("dyn_array_push", size), &values, |b, values| {
            b.iter(|| {
                let mut array = DynArray::new();
                for &v in values {
                    array.push_back(black_box(v));
                }
                black_box(array)
            })
        });

        group.bench_with_input(BenchmarkId::new("ordered_set_insert", size), &values, |b, values| {
            b.iter(|| {
                let mut set = OrderedSet::new();
                for &v in values {
                    let _ = set.insert_multi(black_box(v));
                }
                black_box(set)
            })
        });

        group.bench_with_input(BenchmarkId::new("chained_map_insert", size), &values, |b, values| {
            b.iter(|| {
                let mut map = ChainedMap::with_buckets(values.len());
                for &v in values {
                    let _ = map.insert_multi(black_box(v), 0u64);
                }
                black_box(map)
            })
        });
    }

    group.finish();
}

fn bench_runner(c: &mut Criterion) {
    let registry = Registry::builtin();
    let mut group = c.benchmark_group("runner");
    group.sample_size(10);
    let size = 10_000;
    group.throughput(Throughput::Elements(size as u64));

    for name in ["ArraySumTest", "TreeInsertTest", "HashInsertTest"] {
        for (policy, threads) in [
            (SyncPolicy::None, 1),
            (SyncPolicy::Exclusive, 4),
            (SyncPolicy::Optimistic, 4),
        ] {
            let id = BenchmarkId::new(name, format!("{}/{threads}", policy.label()));
            group.bench_function(id, |b| {
                let Some(mut bench) = registry.create(name, policy) else {
                    return;
                };
                bench.generate(size, threads);
                b.iter(|| {
                    bench.setup();
                    if threads == 1 {
                        bench.run_sequential();
                    } else {
                        bench.run_threaded();
                    }
                    bench.teardown();
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_collections, bench_runner);
criterion_main!(benches);
