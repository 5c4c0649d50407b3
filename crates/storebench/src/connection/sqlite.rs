//! Embedded relational connection backed by SQLite.
//!
//! Runs the relational compiler's statements locally, which makes it the
//! reference engine for checking cardinalities and the rollback guarantee.

use std::path::Path;

use rusqlite::{params, Connection as RawConnection};

use crate::compile::Dialect;
use crate::error::BackendError;
use crate::fixtures::{self, IdStrategy, SyntheticOrder, PRODUCT_CYCLE};
use crate::operation::{CompiledOperation, OperationBody};
use crate::schema;

use super::Connection;

/// SQLite connection executing relational statements.
pub struct SqliteConnection {
    conn: RawConnection,
    label: String,
}

impl SqliteConnection {
    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, BackendError> {
        Ok(Self::from_raw(RawConnection::open_in_memory()?, "sqlite::memory"))
    }

    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let path = path.as_ref();
        let label = format!("sqlite:{}", path.display());
        Ok(Self::from_raw(RawConnection::open(path)?, label))
    }

    pub fn from_raw(conn: RawConnection, label: impl Into<String>) -> Self {
        Self {
            conn,
            label: label.into(),
        }
    }

    /// Create the relational schema and enforce foreign keys.
    pub fn apply_schema(&self) -> Result<(), BackendError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn
            .execute_batch(&schema::relational_ddl(Dialect::Postgres))?;
        Ok(())
    }

    /// Load `orders` reference orders (ids `seeded_order_id(1..=orders)`),
    /// one order line each, and the products, users, aisles and departments
    /// they point to.
    pub fn seed(&mut self, orders: i64, ids: &dyn IdStrategy) -> Result<(), BackendError> {
        let tx = self.conn.transaction()?;
        {
            tx.execute(
                "INSERT OR IGNORE INTO aisles (aisle_id, aisle) VALUES (1, 'fresh fruits')",
                [],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO departments (department_id, department) VALUES (1, 'produce')",
                [],
            )?;

            let mut product = tx.prepare(
                "INSERT OR IGNORE INTO products (product_id, product_name, aisle_id, department_id) \
                 VALUES (?1, ?2, 1, 1)",
            )?;
            for i in 0..PRODUCT_CYCLE.max(orders) {
                let product_id = ids.product_id(i);
                product.execute(params![product_id, fixtures::product_name(product_id)])?;
            }

            let mut user = tx.prepare("INSERT OR IGNORE INTO users (user_id, name) VALUES (?1, ?2)")?;
            let mut order = tx.prepare(
                "INSERT INTO orders (order_id, user_id, order_number, order_dow, order_hour_of_day, \
                 days_since_prior_order, order_timestamp) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            let mut line = tx.prepare(
                "INSERT INTO order_products (order_id, product_id, add_to_cart_order, reordered) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;

            for i in 1..=orders {
                let record = SyntheticOrder::seeded(i, ids);
                let order_id = record.order_id;
                user.execute(params![record.user_id, format!("User{i}")])?;
                order.execute(params![
                    order_id,
                    record.user_id,
                    record.order_number,
                    record.order_dow,
                    record.order_hour_of_day,
                    record.days_since_prior_order,
                    record.timestamp_literal(),
                ])?;
                line.execute(params![
                    order_id,
                    record.line.product_id,
                    record.line.add_to_cart_order,
                    record.line.reordered,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(connection = %self.label, orders, "seeded reference data");
        Ok(())
    }

    /// The underlying rusqlite connection.
    pub fn raw(&self) -> &RawConnection {
        &self.conn
    }

    fn run_statement(&self, sql: &str) -> Result<u64, BackendError> {
        let mut stmt = self.conn.prepare(sql)?;
        if stmt.column_count() == 0 {
            return Ok(stmt.execute([])? as u64);
        }

        let mut rows = stmt.query([])?;
        let mut count = 0;
        while rows.next()?.is_some() {
            count += 1;
        }
        Ok(count)
    }
}

impl Connection for SqliteConnection {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_transactional(&self) -> bool {
        true
    }

    fn begin(&mut self) -> Result<(), BackendError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn execute(&mut self, op: &CompiledOperation) -> Result<u64, BackendError> {
        match &op.body {
            OperationBody::Noop => Ok(0),
            OperationBody::Statement(_) | OperationBody::Batch(_) => {
                let mut total = 0;
                for sql in op.statements() {
                    total += self.run_statement(sql)?;
                }
                Ok(total)
            }
            OperationBody::Document(_) => Err(BackendError::new(
                "document operations cannot run on a relational connection",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::OffsetIds;
    use crate::operation::Footprint;

    fn connection() -> SqliteConnection {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.apply_schema().unwrap();
        conn
    }

    #[test]
    fn test_counts_selected_rows() {
        let mut conn = connection();
        conn.raw()
            .execute_batch("INSERT INTO users (user_id, name) VALUES (1, 'User1'), (2, 'User2');")
            .unwrap();

        let op = CompiledOperation::statement("SELECT user_id FROM users", Footprint::default());
        assert_eq!(conn.execute(&op).unwrap(), 2);
    }

    #[test]
    fn test_counts_affected_rows_across_batch() {
        let mut conn = connection();
        let op = CompiledOperation::batch(
            vec![
                "INSERT INTO users (user_id, name) VALUES (1, 'a'), (2, 'b'), (3, 'c')".into(),
                "DELETE FROM users WHERE user_id < 3".into(),
            ],
            Footprint::default(),
        );
        assert_eq!(conn.execute(&op).unwrap(), 5);
    }

    #[test]
    fn test_rollback_discards_writes() {
        let mut conn = connection();
        conn.begin().unwrap();
        let op = CompiledOperation::statement(
            "INSERT INTO users (user_id, name) VALUES (9, 'x')",
            Footprint::default(),
        );
        assert_eq!(conn.execute(&op).unwrap(), 1);
        conn.rollback().unwrap();

        let remaining: i64 = conn
            .raw()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_seed_reference_data() {
        let mut conn = connection();
        conn.seed(12, &OffsetIds::default()).unwrap();

        let count = |sql: &str| -> i64 { conn.raw().query_row(sql, [], |row| row.get(0)).unwrap() };
        assert_eq!(count("SELECT COUNT(*) FROM orders"), 12);
        assert_eq!(count("SELECT COUNT(*) FROM order_products"), 12);
        assert_eq!(count("SELECT COUNT(*) FROM products"), 10);
        assert_eq!(count("SELECT MIN(order_id) FROM orders"), 1);
        assert_eq!(
            count("SELECT COUNT(*) FROM orders WHERE order_timestamp = '2020-01-02 01:00:00'"),
            1
        );
    }

    struct MorningOrders;

    impl IdStrategy for MorningOrders {
        fn order_id(&self, i: i64) -> i64 {
            OffsetIds::default().order_id(i)
        }

        fn seeded_order_id(&self, i: i64) -> i64 {
            i
        }

        fn user_id(&self, i: i64) -> i64 {
            OffsetIds::default().user_id(i)
        }

        fn product_id(&self, i: i64) -> i64 {
            OffsetIds::default().product_id(i)
        }

        fn seeded_order_timestamp(&self, _i: i64) -> chrono::NaiveDateTime {
            crate::timestamp::generate(8, 0).unwrap()
        }
    }

    #[test]
    fn test_seed_uses_strategy_time_keys() {
        let mut conn = connection();
        conn.seed(3, &MorningOrders).unwrap();

        let stamped: i64 = conn
            .raw()
            .query_row(
                "SELECT COUNT(*) FROM orders WHERE order_timestamp = '2020-01-01 08:00:00'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stamped, 3);
    }

    #[test]
    fn test_rejects_document_ops() {
        let mut conn = connection();
        let op = CompiledOperation::document(vec![], Footprint::default());
        assert!(conn.execute(&op).is_err());
    }

    #[test]
    fn test_invalid_sql_is_backend_error() {
        let mut conn = connection();
        let op = CompiledOperation::statement("SELEC nothing", Footprint::default());
        let err = conn.execute(&op).unwrap_err();
        assert!(!err.message.is_empty());
    }
}
