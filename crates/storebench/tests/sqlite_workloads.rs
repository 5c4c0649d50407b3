//! Integration tests running compiled relational workloads on SQLite.

use std::sync::Arc;

use storebench::{
    compiler_for, measure, measure_with, Backend, BenchConfig, Benchmark, CompiledOperation,
    Connection, Dialect, HarnessOptions, IdStrategy, IsolationScope, LogicalTest, OffsetIds,
    SqliteConnection, TestKind,
};

const SEEDED_ORDERS: i64 = 20;

struct Dataset {
    conn: SqliteConnection,
}

impl Dataset {
    fn new() -> Self {
        let mut conn = SqliteConnection::open_in_memory().unwrap();
        conn.apply_schema().unwrap();
        conn.seed(SEEDED_ORDERS, &OffsetIds::default()).unwrap();
        Self { conn }
    }

    fn count(&self, sql: &str) -> i64 {
        self.conn.raw().query_row(sql, [], |row| row.get(0)).unwrap()
    }

    fn snapshot(&self) -> (i64, i64, i64) {
        (
            self.count("SELECT COUNT(*) FROM orders"),
            self.count("SELECT COUNT(*) FROM order_products"),
            self.count("SELECT COALESCE(SUM(order_dow), 0) FROM orders"),
        )
    }
}

fn compile(backend: Backend, kind: TestKind, count: i64) -> CompiledOperation {
    let ids: Arc<dyn IdStrategy> = Arc::new(OffsetIds::default());
    compiler_for(backend, ids).compile(&LogicalTest::new(kind, count))
}

fn run_once(data: &mut Dataset, op: &CompiledOperation) -> u64 {
    let m = measure(&mut data.conn, op, 1).unwrap();
    assert_eq!(m.failures, 0, "operation failed:\n{op}");
    m.rows
}

#[test]
fn test_relational_cardinalities() {
    let mut data = Dataset::new();
    let expected = [
        (TestKind::SelectBase, 5),
        (TestKind::SelectJoin, 5),
        (TestKind::SelectDate, 5),
        (TestKind::InsertBase, 5),
        (TestKind::InsertMulti, 10),
        (TestKind::UpdateBase, 5),
        // inserted ids are not in the seeded dataset
        (TestKind::DeleteBase, 0),
        (TestKind::DeleteMulti, 10),
    ];

    for backend in [Backend::Postgres, Backend::MariaDb] {
        for (kind, rows) in expected {
            let op = compile(backend, kind, 5);
            assert_eq!(run_once(&mut data, &op), rows, "{backend} {kind}");
        }
    }
}

#[test]
fn test_rollback_invariant_for_every_test() {
    let mut data = Dataset::new();
    let before = data.snapshot();

    for kind in TestKind::ALL {
        let op = compile(Backend::Postgres, kind, 8);
        let m = measure(&mut data.conn, &op, 5).unwrap();
        assert_eq!(m.failures, 0, "{kind}");
        assert_eq!(data.snapshot(), before, "{kind} leaked state");
    }
}

#[test]
fn test_repeated_inserts_do_not_collide() {
    let mut data = Dataset::new();
    let op = compile(Backend::Postgres, TestKind::InsertMulti, 5);

    // rolled back per repetition, so the same keys are free every time
    let m = measure(&mut data.conn, &op, 3).unwrap();
    assert_eq!(m.failures, 0);

    // one transaction for all repetitions: the second insert hits the first
    let options = HarnessOptions::default().with_isolation(IsolationScope::WholeRun);
    let m = measure_with(&mut data.conn, &op, 3, options).unwrap();
    assert_eq!(m.failures, 2);
    assert_eq!(data.snapshot().0, SEEDED_ORDERS);
}

#[test]
fn test_delete_base_removes_inserted_orders() {
    let mut data = Dataset::new();
    let insert = compile(Backend::MariaDb, TestKind::InsertBase, 6);
    let delete = compile(Backend::MariaDb, TestKind::DeleteBase, 6);

    let mut statements = insert.statements().to_vec();
    statements.extend_from_slice(delete.statements());
    let op = CompiledOperation::batch(statements, delete.footprint);

    assert_eq!(run_once(&mut data, &op), 12);
}

#[test]
fn test_delete_multi_respects_foreign_keys() {
    let mut data = Dataset::new();
    let op = compile(Backend::Postgres, TestKind::DeleteMulti, 4);

    // parent first violates order_products.order_id
    let mut reversed = op.statements().to_vec();
    reversed.reverse();
    let reversed = CompiledOperation::batch(reversed, op.footprint);
    assert_eq!(measure(&mut data.conn, &reversed, 1).unwrap().failures, 1);

    assert_eq!(run_once(&mut data, &op), 8);
}

#[test]
fn test_update_sets_order_dow() {
    let mut data = Dataset::new();
    let op = compile(Backend::Postgres, TestKind::UpdateBase, 14);

    data.conn.begin().unwrap();
    data.conn.execute(&op).unwrap();
    let mismatched = data.count(
        "SELECT COUNT(*) FROM orders WHERE order_id <= 14 AND order_dow <> order_id % 7",
    );
    data.conn.rollback().unwrap();

    assert_eq!(mismatched, 0);
}

#[test]
fn test_select_date_returns_boundary_first() {
    let data = Dataset::new();
    let op = compile(Backend::Postgres, TestKind::SelectDate, 3);

    let mut stmt = data.conn.raw().prepare(&op.statements()[0]).unwrap();
    let stamps: Vec<String> = stmt
        .query_map([], |row| row.get(3))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(stamps.len(), 3);
    assert_eq!(stamps[0], "2020-01-02 01:00:00");
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_both_dialects_agree_on_rows() {
    for kind in TestKind::ALL {
        let mut pg = Dataset::new();
        let mut maria = Dataset::new();
        let pg_rows = run_once(&mut pg, &compile(Backend::Postgres, kind, 7));
        let maria_rows = run_once(&mut maria, &compile(Backend::MariaDb, kind, 7));
        assert_eq!(pg_rows, maria_rows, "{kind}");
    }
}

#[test]
fn test_benchmark_run_records_every_test() {
    let dir = tempfile::tempdir().unwrap();
    let bench = Benchmark::new(BenchConfig::default().with_results_dir(dir.path()));
    let mut data = Dataset::new();

    for kind in TestKind::ALL {
        for count in [5, 1, 10] {
            let report = bench
                .run(&mut data.conn, Backend::Postgres, kind.name(), count, 2)
                .unwrap();
            assert!(report.recorded);
            assert_eq!(report.measurement.failures, 0, "{kind} {count}");
        }
    }

    for kind in TestKind::ALL {
        let merged = bench.recorder().merged_series(kind.name()).unwrap();
        let counts: Vec<i64> = merged.series["postgres"].iter().map(|s| s.record_count).collect();
        assert_eq!(counts, vec![1, 5, 10]);
    }
    assert_eq!(data.snapshot().0, SEEDED_ORDERS);
}

#[test]
fn test_dialect_of_mariadb_compiler() {
    let ids: Arc<dyn IdStrategy> = Arc::new(OffsetIds::default());
    let compiler = storebench::compile::RelationalCompiler::new(Dialect::MariaDb, ids);
    assert_eq!(compiler.dialect(), Dialect::MariaDb);
    let op = storebench::BackendCompiler::compile(
        &compiler,
        &LogicalTest::new(TestKind::InsertBase, 2),
    );
    assert!(!op.statements()[0].contains("RETURNING"));
}
