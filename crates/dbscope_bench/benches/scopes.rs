//! Scope lifecycle benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dbscope_core::{AmbientLocator, IsolationLevel, JoinOption};
use dbscope_testkit::{Primary, RecordingFixture, RecordingProvider};

type Provider = RecordingProvider<Primary>;

/// Benchmark creating and disposing an empty scope.
fn bench_create_dispose(c: &mut Criterion) {
    let fixture = RecordingFixture::new();

    c.bench_function("create_dispose", |b| {
        b.iter(|| {
            let scope = fixture.factory.create(JoinOption::JoinExisting).unwrap();
            black_box(scope.id());
            scope.dispose().unwrap();
        });
    });
}

/// Benchmark a full unit of work: open one handle, save, dispose.
fn bench_unit_of_work(c: &mut Criterion) {
    let mut group = c.benchmark_group("unit_of_work");
    let fixture = RecordingFixture::new();

    group.bench_function("implicit", |b| {
        b.iter(|| {
            let mut scope = fixture.factory.create(JoinOption::JoinExisting).unwrap();
            black_box(scope.get::<Provider>().unwrap());
            scope.save().unwrap();
            scope.dispose().unwrap();
        });
        fixture.primary.clear();
    });

    group.bench_function("explicit_transaction", |b| {
        b.iter(|| {
            let mut scope = fixture
                .factory
                .create_with_isolation_level(IsolationLevel::ReadCommitted)
                .unwrap();
            black_box(scope.get::<Provider>().unwrap());
            scope.save().unwrap();
            scope.dispose().unwrap();
        });
        fixture.primary.clear();
    });

    group.finish();
}

/// Benchmark joining an ambient scope at increasing depth.
fn bench_nested_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_join");
    let fixture = RecordingFixture::new();

    for depth in [1usize, 4, 16].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, &depth| {
            b.iter(|| {
                let mut scopes = Vec::with_capacity(depth);
                for _ in 0..depth {
                    scopes.push(fixture.factory.create(JoinOption::JoinExisting).unwrap());
                }
                black_box(scopes[depth - 1].get::<Provider>().unwrap());
                while let Some(scope) = scopes.pop() {
                    scope.dispose().unwrap();
                }
            });
        });
    }
    fixture.primary.clear();
    group.finish();
}

/// Benchmark resolving the ambient handle through the locator.
fn bench_locator(c: &mut Criterion) {
    let fixture = RecordingFixture::new();
    let scope = fixture.factory.create(JoinOption::JoinExisting).unwrap();
    scope.get::<Provider>().unwrap();
    let locator = AmbientLocator::new();

    c.bench_function("locator_get", |b| {
        b.iter(|| black_box(locator.require::<Provider>().unwrap()));
    });

    c.bench_function("suppress_restore", |b| {
        b.iter(|| fixture.factory.suppress_ambient_scope().release());
    });

    scope.dispose().unwrap();
}

criterion_group!(
    benches,
    bench_create_dispose,
    bench_unit_of_work,
    bench_nested_join,
    bench_locator
);
criterion_main!(benches);
