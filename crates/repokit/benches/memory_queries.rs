//! Query pipeline benchmarks over the in-memory store
//!
//! Measures filtering, sorting and paging as the entity set grows, and the
//! effect of the query cache on repeated queries.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use repokit::repokit_cache::{CacheConfig, MemoryCacheProvider};
use repokit::{Entity, QueryOptions, Repository, RepositoryFactory, RepositoryOptions};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Order {
    id: i64,
    customer: String,
    total: f64,
    shipped: bool,
}

impl Entity for Order {}

fn orders(count: usize) -> Vec<Order> {
    (0..count)
        .map(|i| Order {
            id: 0,
            customer: format!("customer-{}", i % 37),
            total: (i % 500) as f64 * 1.5,
            shipped: i % 3 == 0,
        })
        .collect()
}

fn seeded(rt: &Runtime, options: RepositoryOptions, count: usize) -> Repository<Order, i64> {
    let repo = RepositoryFactory::new(options)
        .unwrap()
        .create::<Order, i64>()
        .unwrap();
    rt.block_on(repo.add_range(&orders(count))).unwrap();
    repo
}

fn query() -> QueryOptions<Order> {
    QueryOptions::new()
        .where_eq("shipped", false)
        .where_gt("total", 100)
        .order_by_desc("total")
        .page_with(2, 50)
}

fn bench_filter_sort_page(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("filter_sort_page");

    for &size in &[100usize, 1_000, 10_000] {
        let options = RepositoryOptions::builder()
            .use_in_memory_database(&format!("bench-orders-{}", size))
            .build();
        let repo = seeded(&rt, options, size);
        let query = query();

        group.bench_with_input(BenchmarkId::new("uncached", size), &size, |b, _| {
            b.to_async(&rt)
                .iter(|| async { black_box(repo.find_all_where(&query).await.unwrap()) })
        });
    }

    group.finish();
}

fn bench_cached_queries(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let provider = Arc::new(MemoryCacheProvider::new(CacheConfig::default()));
    let options = RepositoryOptions::builder()
        .use_in_memory_database("bench-orders-cached")
        .use_cache_provider(provider)
        .cache_expiration(Duration::from_secs(300))
        .build();
    let repo = seeded(&rt, options, 10_000);
    let query = query();

    c.bench_function("cached_find_all_10000", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(repo.find_all_where(&query).await.unwrap()) })
    });
}

criterion_group!(benches, bench_filter_sort_page, bench_cached_queries);
criterion_main!(benches);
