//! Memory engine benchmarks through scopes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dbscope_core::{IsolationLevel, JoinOption};
use dbscope_memory::{Entity, EntityId, MemoryProvider};
use dbscope_testkit::MemoryFixture;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Record {
    id: EntityId,
    payload: Vec<u8>,
}

impl Entity for Record {
    const TABLE: &'static str = "bench";

    fn id(&self) -> EntityId {
        self.id
    }
}

/// Generate records with random payloads of the specified size.
fn generate_records(count: usize, size: usize) -> Vec<Record> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| Record {
            id: EntityId::new(),
            payload: (0..size).map(|_| rng.gen()).collect(),
        })
        .collect()
}

/// Benchmark saving batches of writes.
fn bench_batch_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_save");

    for batch_size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let fixture = MemoryFixture::memory();
                let records = generate_records(batch_size, 256);

                b.iter(|| {
                    let mut scope = fixture.factory.create(JoinOption::JoinExisting).unwrap();
                    let session = scope.get::<MemoryProvider>().unwrap();
                    {
                        let mut session = session.lock();
                        for record in &records {
                            session.put(black_box(record)).unwrap();
                        }
                    }
                    scope.save().unwrap();
                    scope.dispose().unwrap();
                });
            },
        );
    }
    group.finish();
}

/// Benchmark saving inside an explicit transaction.
fn bench_transactional_save(c: &mut Criterion) {
    let fixture = MemoryFixture::memory();
    let records = generate_records(100, 256);

    c.bench_function("transactional_save_100", |b| {
        b.iter(|| {
            let mut scope = fixture
                .factory
                .create_with_isolation_level(IsolationLevel::Serializable)
                .unwrap();
            let session = scope.get::<MemoryProvider>().unwrap();
            {
                let mut session = session.lock();
                for record in &records {
                    session.put(record).unwrap();
                }
            }
            scope.save().unwrap();
            scope.dispose().unwrap();
        });
    });
}

/// Benchmark reads in a read-only scope.
fn bench_read_only_get(c: &mut Criterion) {
    let fixture = MemoryFixture::memory();
    let records = generate_records(1000, 256);
    {
        let mut scope = fixture.factory.create(JoinOption::JoinExisting).unwrap();
        let session = scope.get::<MemoryProvider>().unwrap();
        for record in &records {
            session.lock().put(record).unwrap();
        }
        scope.save().unwrap();
        scope.dispose().unwrap();
    }

    c.bench_function("read_only_get", |b| {
        let mut i = 0;
        b.iter(|| {
            let scope = fixture
                .factory
                .create_read_only(JoinOption::JoinExisting)
                .unwrap();
            let id = records[i % records.len()].id;
            let found = scope
                .get::<MemoryProvider>()
                .unwrap()
                .lock()
                .get::<Record>(id)
                .unwrap();
            black_box(found);
            scope.dispose().unwrap();
            i += 1;
        });
    });
}

criterion_group!(
    benches,
    bench_batch_save,
    bench_transactional_save,
    bench_read_only_get
);
criterion_main!(benches);
