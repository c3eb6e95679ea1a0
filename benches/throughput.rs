//! Throughput benchmark for the ArborKV value store.
//!
//! Measures the core store operations - the tree-indexed point ops and
//! the ordered prefix scan - without the network layer.

use arborkv::storage::ValueStore;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;

/// Benchmark scalar SET operations
fn bench_set(c: &mut Criterion) {
    let store = Arc::new(ValueStore::default());

    let mut group = c.benchmark_group("set_scalar");
    group.throughput(Throughput::Elements(1));

    group.bench_function("fresh_keys", |b| {
        let mut i = 0u64;
        b.iter(|| {
            store.set_scalar(&format!("key:{i}"), "value".to_string(), None);
            i += 1;
        });
    });

    group.bench_function("overwrite_one_key", |b| {
        b.iter(|| {
            store.set_scalar("hot", "value".to_string(), None);
        });
    });

    group.finish();
}

/// Benchmark scalar GET operations
fn bench_get(c: &mut Criterion) {
    let store = Arc::new(ValueStore::default());

    // Pre-populate with data
    for i in 0..100_000 {
        store.set_scalar(&format!("key:{i}"), format!("value:{i}"), None);
    }

    let mut group = c.benchmark_group("get_scalar");
    group.throughput(Throughput::Elements(1));

    group.bench_function("hit", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(store.get_scalar(&key).unwrap());
            i += 1;
        });
    });

    group.bench_function("miss", |b| {
        b.iter(|| {
            black_box(store.get_scalar("absent").is_err());
        });
    });

    group.finish();
}

/// Benchmark list pushes
fn bench_push(c: &mut Criterion) {
    let store = Arc::new(ValueStore::default());

    let mut group = c.benchmark_group("push");
    group.throughput(Throughput::Elements(1));

    group.bench_function("rpush_one_list", |b| {
        b.iter(|| {
            store.rpush("list", "element".to_string(), None).unwrap();
        });
    });

    group.finish();
}

/// Benchmark ordered prefix scans
fn bench_prefix_scan(c: &mut Criterion) {
    let store = Arc::new(ValueStore::default());

    for i in 0..10_000 {
        store.set_scalar(&format!("user:{i:05}"), "v".to_string(), None);
        store.set_scalar(&format!("zone:{i:05}"), "v".to_string(), None);
    }

    let mut group = c.benchmark_group("scan");

    group.bench_function("narrow_prefix", |b| {
        b.iter(|| {
            black_box(store.get_by_prefix("user:0000").unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_set, bench_get, bench_push, bench_prefix_scan);
criterion_main!(benches);
