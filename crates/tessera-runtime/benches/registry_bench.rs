//! Benchmarks for isolation registry operations

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tessera_runtime::{sync_scope, IsolationMode, IsolationRegistry, RegistryConfig};

fn registry(mode: IsolationMode) -> IsolationRegistry {
    IsolationRegistry::with_config(RegistryConfig::default().with_initial_mode(mode))
}

fn bench_thread_scoped_get(c: &mut Criterion) {
    let registry = registry(IsolationMode::ThreadScoped);
    registry.set("request_id", 42u64);

    c.bench_function("thread_scoped_get", |b| {
        b.iter(|| black_box(registry.get::<u64>(black_box("request_id"))))
    });
}

fn bench_thread_scoped_set(c: &mut Criterion) {
    let registry = registry(IsolationMode::ThreadScoped);

    c.bench_function("thread_scoped_set", |b| {
        b.iter(|| registry.set("request_id", black_box(42u64)))
    });
}

fn bench_task_scoped_get(c: &mut Criterion) {
    let registry = registry(IsolationMode::TaskScoped);

    sync_scope(|| {
        registry.set("request_id", 42u64);
        c.bench_function("task_scoped_get", |b| {
            b.iter(|| black_box(registry.get::<u64>(black_box("request_id"))))
        });
    });
}

fn bench_task_scoped_set(c: &mut Criterion) {
    let registry = registry(IsolationMode::TaskScoped);

    sync_scope(|| {
        c.bench_function("task_scoped_set", |b| {
            b.iter(|| registry.set("request_id", black_box(42u64)))
        });
    });
}

fn bench_root_task_get(c: &mut Criterion) {
    let registry = registry(IsolationMode::TaskScoped);
    registry.set("request_id", 42u64);

    c.bench_function("root_task_get", |b| {
        b.iter(|| black_box(registry.get::<u64>(black_box("request_id"))))
    });
}

criterion_group!(
    benches,
    bench_thread_scoped_get,
    bench_thread_scoped_set,
    bench_task_scoped_get,
    bench_task_scoped_set,
    bench_root_task_get,
);
criterion_main!(benches);
