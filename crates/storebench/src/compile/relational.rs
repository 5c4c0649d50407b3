//! Compiler for the normalized relational schema.
//!
//! Orders and order lines live in separate tables and are joined at query
//! time. Multi-record writes are one multi-row statement per table.

use std::sync::Arc;

use crate::catalog::{Backend, TestKind};
use crate::fixtures::{IdStrategy, SyntheticOrder};
use crate::operation::{CompiledOperation, Footprint};
use crate::timestamp;

use super::{count_of, id_list, quote, BackendCompiler};

const ORDER_COLUMNS: &str = "order_id, user_id, order_number, order_dow, order_hour_of_day, \
                             days_since_prior_order, order_timestamp";

/// SQL dialect of a relational backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MariaDb,
}

impl Dialect {
    pub fn backend(&self) -> Backend {
        match self {
            Dialect::Postgres => Backend::Postgres,
            Dialect::MariaDb => Backend::MariaDb,
        }
    }

    /// Clause appended to order inserts.
    fn returning_clause(&self) -> &'static str {
        match self {
            Dialect::Postgres => " RETURNING order_id",
            Dialect::MariaDb => "",
        }
    }
}

/// Compiles tests into SQL for PostgreSQL and MariaDB.
pub struct RelationalCompiler {
    dialect: Dialect,
    ids: Arc<dyn IdStrategy>,
}

impl RelationalCompiler {
    pub fn new(dialect: Dialect, ids: Arc<dyn IdStrategy>) -> Self {
        Self { dialect, ids }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn seeded_ids(&self, count: i64) -> String {
        id_list((1..=count).map(|i| self.ids.seeded_order_id(i)))
    }

    fn orders(&self, count: i64) -> Vec<SyntheticOrder> {
        (1..=count)
            .map(|i| SyntheticOrder::for_index(i, self.ids.as_ref()))
            .collect()
    }

    fn insert_orders(&self, orders: &[SyntheticOrder]) -> String {
        let rows = orders
            .iter()
            .map(|o| {
                format!(
                    "({}, {}, {}, {}, {}, {}, {})",
                    o.order_id,
                    o.user_id,
                    o.order_number,
                    o.order_dow,
                    o.order_hour_of_day,
                    o.days_since_prior_order,
                    quote(&o.timestamp_literal()),
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES {rows}{}",
            self.dialect.returning_clause()
        )
    }

    fn insert_order_lines(&self, orders: &[SyntheticOrder]) -> String {
        let rows = orders
            .iter()
            .map(|o| {
                format!(
                    "({}, {}, {}, {})",
                    o.order_id, o.line.product_id, o.line.add_to_cart_order, o.line.reordered
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO order_products (order_id, product_id, add_to_cart_order, reordered) \
             VALUES {rows}"
        )
    }
}

impl BackendCompiler for RelationalCompiler {
    fn backend(&self) -> Backend {
        self.dialect.backend()
    }

    fn translate(&self, kind: TestKind, count: i64) -> CompiledOperation {
        let n = count_of(count);
        match kind {
            TestKind::SelectBase => CompiledOperation::statement(
                format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id IN ({})",
                    self.seeded_ids(count)
                ),
                Footprint::new(n, 0, 0),
            ),
            TestKind::SelectJoin => CompiledOperation::statement(
                format!(
                    "SELECT o.order_id, o.user_id, o.order_number, op.product_id, p.product_name, \
                     p.aisle_id, p.department_id \
                     FROM orders o \
                     JOIN order_products op ON o.order_id = op.order_id \
                     JOIN products p ON op.product_id = p.product_id \
                     WHERE o.order_id IN ({})",
                    self.seeded_ids(count)
                ),
                Footprint::new(n, 0, 0),
            ),
            TestKind::SelectDate => CompiledOperation::statement(
                format!(
                    "SELECT order_id, user_id, order_number, order_timestamp FROM orders \
                     WHERE order_timestamp >= {} ORDER BY order_timestamp LIMIT {count}",
                    quote(&timestamp::format_timestamp(&timestamp::range_boundary()))
                ),
                Footprint::new(n, 0, 0),
            ),
            TestKind::InsertBase => CompiledOperation::statement(
                self.insert_orders(&self.orders(count)),
                Footprint::new(n, 0, 0),
            ),
            TestKind::InsertMulti => {
                let orders = self.orders(count);
                CompiledOperation::batch(
                    vec![self.insert_orders(&orders), self.insert_order_lines(&orders)],
                    Footprint::new(n, n, 0),
                )
            }
            TestKind::UpdateBase => CompiledOperation::statement(
                format!(
                    "UPDATE orders SET order_dow = order_id % 7 WHERE order_id IN ({})",
                    self.seeded_ids(count)
                ),
                Footprint::new(n, 0, 0),
            ),
            TestKind::DeleteBase => CompiledOperation::statement(
                format!(
                    "DELETE FROM orders WHERE order_id IN ({})",
                    id_list((1..=count).map(|i| self.ids.order_id(i)))
                ),
                Footprint::new(n, 0, 0),
            ),
            TestKind::DeleteMulti => {
                let ids = self.seeded_ids(count);
                CompiledOperation::batch(
                    vec![
                        format!("DELETE FROM order_products WHERE order_id IN ({ids})"),
                        format!("DELETE FROM orders WHERE order_id IN ({ids})"),
                    ],
                    Footprint::new(n, 0, 0),
                )
            }
        }
    }
}
