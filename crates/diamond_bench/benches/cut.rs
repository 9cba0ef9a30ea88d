//! Cut application benchmarks.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use diamond_bench::utils::{populated_diamond, random_selectors, BenchFacet};
use diamond_core::{BlobRetention, Config, FacetAddress, FacetCut};
use std::sync::Arc;

/// Benchmark adding then removing one facet on a populated diamond.
fn bench_add_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_remove");

    for cache in [false, true] {
        for width in [1usize, 10, 100] {
            let diamond = populated_diamond(Config::new().cache_enabled(cache), 10, 500, 1);
            let selectors = random_selectors(width)
                .into_iter()
                .filter(|s| diamond.facet_address(*s).is_none())
                .collect::<Vec<_>>();
            let address = diamond
                .deploy(Arc::new(BenchFacet::new(1_000, selectors.clone())))
                .unwrap();

            let label = if cache { "cached" } else { "live" };
            group.throughput(Throughput::Elements(selectors.len() as u64));
            group.bench_with_input(BenchmarkId::new(label, width), &selectors, |b, selectors| {
                b.iter(|| {
                    diamond
                        .diamond_cut(FacetCut::new().add(address, selectors.iter().copied()))
                        .unwrap();
                    diamond.diamond_cut(FacetCut::new().remove(address)).unwrap();
                });
            });
        }
    }
    group.finish();
}

/// Benchmark replacing a facet back and forth.
fn bench_replace(c: &mut Criterion) {
    let mut group = c.benchmark_group("replace");

    for retention in [BlobRetention::Reclaim, BlobRetention::Retain] {
        let config = Config::new().cache_enabled(true).blob_retention(retention);
        let diamond = populated_diamond(config, 10, 500, 1);
        let old = FacetAddress::from_index(1);
        let claims = diamond.facet_function_selectors(old).unwrap();
        let new = diamond
            .deploy(Arc::new(BenchFacet::new(2_000, claims)))
            .unwrap();

        group.bench_function(BenchmarkId::from_parameter(format!("{retention:?}")), |b| {
            b.iter(|| {
                diamond.diamond_cut(FacetCut::new().replace(old, new)).unwrap();
                diamond.diamond_cut(FacetCut::new().replace(new, old)).unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_add_remove, bench_replace);
criterion_main!(benches);
