//! Shard rebuild and blob store benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use diamond_bench::utils::{random_selectors, split_evenly};
use diamond_core::{
    BlobStore, Category, FacetAddress, FileBlobStore, MemoryBlobStore, ShardCache,
};
use diamond_storage::reuse_or_write;
use tempfile::tempdir;

fn inputs(
    facets: usize,
    selectors: usize,
) -> (Vec<FacetAddress>, Vec<Vec<diamond_core::Selector>>) {
    let lists = split_evenly(&random_selectors(selectors), facets);
    let addresses = (1..=facets as u64).map(FacetAddress::from_index).collect();
    (addresses, lists)
}

/// Benchmark a full shard rebuild with and without dedup.
fn bench_rebuild_shard(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebuild_shard");
    let category = Category::default();

    for (facets, selectors) in [(5, 100), (50, 1000)] {
        let (addresses, lists) = inputs(facets, selectors);
        group.throughput(Throughput::Elements(selectors as u64));

        for dedup in [false, true] {
            let label = if dedup { "dedup" } else { "rewrite" };
            group.bench_with_input(
                BenchmarkId::new(label, format!("{selectors}/{facets}")),
                &(addresses.clone(), lists.clone()),
                |b, (addresses, lists)| {
                    let mut store = MemoryBlobStore::new();
                    let mut cache = ShardCache::new();
                    b.iter(|| {
                        let report = cache
                            .rebuild_shard(&mut store, &category, addresses, lists, dedup)
                            .unwrap();
                        for handle in report.superseded {
                            store.release(handle).unwrap();
                        }
                    });
                },
            );
        }
    }
    group.finish();
}

/// Benchmark content-addressed reuse against a plain write.
fn bench_reuse_or_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("reuse_or_write");
    let payload = vec![0xABu8; 4 * 256];

    group.bench_function("reuse", |b| {
        let mut store = MemoryBlobStore::new();
        let blob = reuse_or_write(&mut store, None, &payload).unwrap().blob();
        b.iter(|| black_box(reuse_or_write(&mut store, Some(&blob), &payload).unwrap()));
    });
    group.bench_function("write", |b| {
        let mut store = MemoryBlobStore::new();
        b.iter(|| {
            let handle = store.write(black_box(&payload)).unwrap();
            store.release(handle).unwrap();
        });
    });
    group.finish();
}

/// Benchmark file-backed blob reads.
fn bench_file_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_read");

    for size in [64usize, 1024, 16 * 1024] {
        let dir = tempdir().unwrap();
        let mut store = FileBlobStore::open(&dir.path().join("bench.blobs")).unwrap();
        let handle = store.write(&vec![0x5Au8; size]).unwrap();
        store.sync().unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &handle, |b, handle| {
            b.iter(|| black_box(store.read(*handle).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rebuild_shard, bench_reuse_or_write, bench_file_read);
criterion_main!(benches);
