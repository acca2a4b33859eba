//! Criterion micro-benchmarks for registry add/get/remove.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use strata_bench::{churn_schedule, ChurnStep};
use strata_handle::{Handle, Registry};

/// Benchmark: 10K adds into a fresh default registry.
fn bench_registry_add_10k(c: &mut Criterion) {
    c.bench_function("registry_add_10k", |b| {
        b.iter(|| {
            let mut registry: Registry<u64> = Registry::new();
            for v in 0..10_000u64 {
                black_box(registry.add(v));
            }
            registry
        });
    });
}

/// Benchmark: 10K lookups through live handles.
fn bench_registry_get_10k(c: &mut Criterion) {
    let mut registry: Registry<u64> = Registry::new();
    let handles: Vec<Handle<u64>> = (0..10_000u64).map(|v| registry.add(v)).collect();

    c.bench_function("registry_get_10k", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for &h in &handles {
                if let Some(v) = registry.get(h) {
                    sum = sum.wrapping_add(*v);
                }
            }
            black_box(sum)
        });
    });
}

/// Benchmark: a 10K-step add/remove churn schedule.
fn bench_registry_churn_10k(c: &mut Criterion) {
    let schedule = churn_schedule(42, 10_000);

    c.bench_function("registry_churn_10k", |b| {
        b.iter(|| {
            let mut registry: Registry<usize> = Registry::new();
            let mut live: Vec<Handle<usize>> = Vec::new();
            for (i, step) in schedule.iter().enumerate() {
                match *step {
                    ChurnStep::Remove(at) if !live.is_empty() => {
                        let h = live.swap_remove(at % live.len());
                        black_box(registry.remove(h));
                    }
                    _ => live.push(registry.add(i)),
                }
            }
            registry.len()
        });
    });
}

criterion_group!(
    benches,
    bench_registry_add_10k,
    bench_registry_get_10k,
    bench_registry_churn_10k
);
criterion_main!(benches);
