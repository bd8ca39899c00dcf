//! Criterion benchmarks for the acquisition hot paths.
//!
//! Benchmarks:
//! 1. Dedup of merged listings (canonical URL + seen set)
//! 2. Cache lookups with freshness checks
//! 3. A full orchestrator run against warm caches

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use combo_core::cache::{CacheOptions, CacheStore, CacheTier, CachedValue};
use combo_core::domain::{Component, ComponentCategory, RawDeal};
use combo_core::fetch::SourceSettings;
use combo_core::orchestrator::{dedup_by_url, Orchestrator, OrchestratorOptions};
use combo_core::sources::{SourceRegistry, StaticSource};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_deals(n: usize) -> Vec<RawDeal> {
    (0..n)
        .map(|i| {
            // Every third URL repeats an earlier one with different casing.
            let id = if i % 3 == 2 { i - 1 } else { i };
            let host = if i % 2 == 0 { "shop.example" } else { "SHOP.example" };
            RawDeal::new(
                format!("https://{host}/combo/{id}/"),
                "shop",
                500.0 + i as f64,
                vec![
                    Component::new(format!("CPU {}", i % 20), ComponentCategory::Cpu),
                    Component::new(format!("Board {}", i % 15), ComponentCategory::Motherboard),
                    Component::new(format!("RAM {}", i % 10), ComponentCategory::Ram),
                ],
            )
        })
        .collect()
}

// ── 1. Dedup ─────────────────────────────────────────────────────────

fn bench_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup");

    for &count in &[100, 1_000, 10_000] {
        let deals = make_deals(count);
        group.bench_with_input(BenchmarkId::new("dedup_by_url", count), &count, |b, _| {
            b.iter(|| dedup_by_url(black_box(deals.clone())));
        });
    }

    group.finish();
}

// ── 2. Cache Lookups ─────────────────────────────────────────────────

fn bench_cache_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_lookup");
    let dir = tempfile::tempdir().unwrap();
    let cache = CacheStore::open(dir.path(), CacheOptions::default()).unwrap();
    for i in 0..500 {
        cache
            .store(CacheTier::AmazonPrice, &format!("part {i}"), CachedValue::Price(i as f64))
            .unwrap();
    }
    let now = chrono::Utc::now();

    group.bench_function("lookup_fresh_hit", |b| {
        b.iter(|| cache.lookup_fresh(CacheTier::AmazonPrice, black_box("part 250"), now));
    });
    group.bench_function("lookup_miss", |b| {
        b.iter(|| cache.lookup(CacheTier::AmazonPrice, black_box("absent part")));
    });

    group.finish();
}

// ── 3. Warm Orchestrator Run ─────────────────────────────────────────

fn bench_warm_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("orchestrator");
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(CacheStore::open(dir.path(), CacheOptions::default()).unwrap());

    let deals = make_deals(300);
    let mut prices = StaticSource::new("prices").price_only();
    for deal in &deals {
        for component in &deal.components {
            prices = prices.with_price(component.name.clone(), 100.0);
        }
    }
    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(StaticSource::new("shop").with_deals(deals)), SourceSettings::immediate());
    registry.register(Arc::new(prices), SourceSettings::immediate());
    let orchestrator = Orchestrator::new(cache, Arc::new(registry), OrchestratorOptions::default());

    // First run fills the price tier; measured runs hit the cache.
    orchestrator.run();
    group.bench_function("warm_run_300_deals", |b| {
        b.iter(|| orchestrator.run());
    });

    group.finish();
}

criterion_group!(benches, bench_dedup, bench_cache_lookup, bench_warm_run);
criterion_main!(benches);
