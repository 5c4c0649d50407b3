//! Compiler and harness benchmarks.
//!
//! Measures the cost of building each backend's operation and of one
//! rolled-back execution against an embedded SQLite database.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use storebench::{
    compiler_for, measure, Backend, IdStrategy, LogicalTest, OffsetIds, SqliteConnection,
    TestKind,
};

const COUNTS: [i64; 3] = [10, 100, 1000];

fn bench_compile(c: &mut Criterion) {
    let ids: Arc<dyn IdStrategy> = Arc::new(OffsetIds::default());

    for kind in [TestKind::SelectJoin, TestKind::InsertMulti, TestKind::DeleteMulti] {
        let mut group = c.benchmark_group(format!("compile/{kind}"));

        for backend in Backend::ALL {
            let compiler = compiler_for(backend, ids.clone());
            for count in COUNTS {
                let test = LogicalTest::new(kind, count);
                group.bench_with_input(BenchmarkId::new(backend.name(), count), &test, |b, test| {
                    b.iter(|| black_box(compiler.compile(test)));
                });
            }
        }

        group.finish();
    }
}

fn bench_sqlite_measure(c: &mut Criterion) {
    let mut group = c.benchmark_group("measure/sqlite");
    let ids = OffsetIds::default();

    let mut conn = SqliteConnection::open_in_memory().unwrap();
    conn.apply_schema().unwrap();
    conn.seed(1000, &ids).unwrap();

    let compiler = compiler_for(Backend::Postgres, Arc::new(ids));
    for kind in [TestKind::SelectBase, TestKind::SelectDate, TestKind::InsertMulti, TestKind::UpdateBase] {
        for count in [10, 100] {
            let op = compiler.compile(&LogicalTest::new(kind, count));
            group.bench_with_input(BenchmarkId::new(kind.name(), count), &op, |b, op| {
                b.iter(|| black_box(measure(&mut conn, op, 1).unwrap()));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_sqlite_measure);

criterion_main!(benches);
