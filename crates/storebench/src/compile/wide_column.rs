//! Compiler for the wide-column store.
//!
//! The store has no joins and no referential integrity. Reads are served by
//! query-shaped tables (`order_products_by_order` for the join-style test,
//! `orders_by_timestamp` for the range test), so every write is mirrored into
//! those tables in the same logged batch and every delete removes dependent
//! rows before the parent `orders` row.

use std::sync::Arc;

use crate::catalog::{Backend, TestKind};
use crate::fixtures::{updated_order_dow, IdStrategy, SyntheticOrder};
use crate::operation::{CompiledOperation, Footprint};
use crate::timestamp;

use super::{count_of, id_list, quote, BackendCompiler};

/// Keyspace the tables live in unless configured otherwise.
pub const DEFAULT_KEYSPACE: &str = "instacart";

/// Compiles tests into CQL.
pub struct WideColumnCompiler {
    keyspace: String,
    ids: Arc<dyn IdStrategy>,
}

/// Wrap statements in one logged batch.
pub fn logged_batch(statements: &[String]) -> String {
    let mut batch = String::from("BEGIN BATCH\n");
    for statement in statements {
        batch.push_str("  ");
        batch.push_str(statement);
        batch.push_str(";\n");
    }
    batch.push_str("APPLY BATCH");
    batch
}

impl WideColumnCompiler {
    pub fn new(ids: Arc<dyn IdStrategy>) -> Self {
        Self::with_keyspace(DEFAULT_KEYSPACE, ids)
    }

    pub fn with_keyspace(keyspace: impl Into<String>, ids: Arc<dyn IdStrategy>) -> Self {
        Self {
            keyspace: keyspace.into(),
            ids,
        }
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    fn table(&self, name: &str) -> String {
        format!("{}.{}", self.keyspace, name)
    }

    fn orders(&self, count: i64) -> Vec<SyntheticOrder> {
        (1..=count)
            .map(|i| SyntheticOrder::for_index(i, self.ids.as_ref()))
            .collect()
    }

    fn insert_order(&self, o: &SyntheticOrder) -> String {
        format!(
            "INSERT INTO {} (order_id, user_id, order_number, order_dow, order_timestamp, \
             days_since_prior_order) VALUES ({}, {}, {}, {}, {}, {})",
            self.table("orders"),
            o.order_id,
            o.user_id,
            o.order_number,
            o.order_dow,
            quote(&o.timestamp_literal()),
            o.days_since_prior_order,
        )
    }

    fn insert_order_by_timestamp(&self, o: &SyntheticOrder) -> String {
        format!(
            "INSERT INTO {} (order_timestamp, order_id, user_id, order_number) \
             VALUES ({}, {}, {}, {})",
            self.table("orders_by_timestamp"),
            quote(&o.timestamp_literal()),
            o.order_id,
            o.user_id,
            o.order_number,
        )
    }

    fn insert_order_line(&self, o: &SyntheticOrder) -> String {
        format!(
            "INSERT INTO {} (order_id, product_id, user_id, order_number, order_dow, \
             order_timestamp, days_since_prior_order, product_name, add_to_cart_order, reordered) \
             VALUES ({}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
            self.table("order_products_by_order"),
            o.order_id,
            o.line.product_id,
            o.user_id,
            o.order_number,
            o.order_dow,
            quote(&o.timestamp_literal()),
            o.days_since_prior_order,
            quote(&o.line.product_name),
            o.line.add_to_cart_order,
            o.line.reordered,
        )
    }

    fn delete_by_timestamp(&self, order: &SyntheticOrder) -> String {
        format!(
            "DELETE FROM {} WHERE order_timestamp = {} AND order_id = {}",
            self.table("orders_by_timestamp"),
            quote(&order.timestamp_literal()),
            order.order_id,
        )
    }

    fn delete_orders(&self, orders: &[SyntheticOrder]) -> CompiledOperation {
        let n = orders.len();
        let order_ids = || orders.iter().map(|o| o.order_id);
        let mut statements = Vec::with_capacity(n + 2);
        statements.push(format!(
            "DELETE FROM {} WHERE order_id IN ({})",
            self.table("order_products_by_order"),
            id_list(order_ids())
        ));
        statements.extend(orders.iter().map(|o| self.delete_by_timestamp(o)));
        statements.push(format!(
            "DELETE FROM {} WHERE order_id IN ({})",
            self.table("orders"),
            id_list(order_ids())
        ));
        CompiledOperation::statement(logged_batch(&statements), Footprint::new(n, 0, 2 * n))
    }

    fn insert(&self, count: i64, with_lines: bool) -> CompiledOperation {
        let n = count_of(count);
        let mut statements = Vec::with_capacity(n * if with_lines { 3 } else { 2 });
        for order in self.orders(count) {
            statements.push(self.insert_order(&order));
            statements.push(self.insert_order_by_timestamp(&order));
            if with_lines {
                statements.push(self.insert_order_line(&order));
            }
        }
        let children = if with_lines { n } else { 0 };
        CompiledOperation::statement(logged_batch(&statements), Footprint::new(n, children, n))
    }

    fn select(&self, columns: &str, table: &str, count: i64) -> CompiledOperation {
        CompiledOperation::statement(
            format!(
                "SELECT {columns} FROM {} WHERE order_id IN ({})",
                self.table(table),
                id_list((1..=count).map(|i| self.ids.seeded_order_id(i)))
            ),
            Footprint::new(count_of(count), 0, 0),
        )
    }
}

impl BackendCompiler for WideColumnCompiler {
    fn backend(&self) -> Backend {
        Backend::Cassandra
    }

    fn translate(&self, kind: TestKind, count: i64) -> CompiledOperation {
        let n = count_of(count);
        match kind {
            TestKind::SelectBase => self.select(
                "order_id, user_id, order_number, order_dow, order_timestamp, days_since_prior_order",
                "orders",
                count,
            ),
            TestKind::SelectJoin => self.select(
                "order_id, product_id, user_id, order_number, order_dow, order_timestamp, \
                 days_since_prior_order, product_name, add_to_cart_order, reordered",
                "order_products_by_order",
                count,
            ),
            // rows come back in token order; partitions cannot be ordered by timestamp
            TestKind::SelectDate => CompiledOperation::statement(
                format!(
                    "SELECT order_timestamp, order_id, user_id, order_number FROM {} \
                     WHERE order_timestamp >= {} LIMIT {count} ALLOW FILTERING",
                    self.table("orders_by_timestamp"),
                    quote(&timestamp::format_timestamp(&timestamp::range_boundary()))
                ),
                Footprint::new(n, 0, 0),
            ),
            TestKind::InsertBase => self.insert(count, false),
            TestKind::InsertMulti => self.insert(count, true),
            TestKind::UpdateBase => {
                let mut statements = Vec::with_capacity(n * 2);
                for i in 1..=count {
                    let order_id = self.ids.seeded_order_id(i);
                    let dow = updated_order_dow(order_id);
                    statements.push(format!(
                        "UPDATE {} SET order_dow = {dow} WHERE order_id = {order_id}",
                        self.table("orders")
                    ));
                    // order_dow is a static column there, keyed by order_id alone
                    statements.push(format!(
                        "UPDATE {} SET order_dow = {dow} WHERE order_id = {order_id}",
                        self.table("order_products_by_order")
                    ));
                }
                CompiledOperation::statement(logged_batch(&statements), Footprint::new(n, 0, n))
            }
            TestKind::DeleteBase => self.delete_orders(&self.orders(count)),
            TestKind::DeleteMulti => {
                let seeded: Vec<SyntheticOrder> = (1..=count)
                    .map(|i| SyntheticOrder::seeded(i, self.ids.as_ref()))
                    .collect();
                self.delete_orders(&seeded)
            }
        }
    }
}
