//! Compiler for the document store.
//!
//! An order document embeds its order lines in a `products` array, so the
//! join-style test is a plain lookup and deleting an order removes its lines.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::catalog::{Backend, TestKind};
use crate::fixtures::{IdStrategy, SyntheticOrder};
use crate::operation::{CompiledOperation, DocumentAction, DocumentOp, Footprint};
use crate::timestamp;

use super::{count_of, BackendCompiler};

/// Collection holding order documents.
pub const ORDERS_COLLECTION: &str = "orders";

/// Extended-JSON date for Unix milliseconds.
pub fn date_value(millis: i64) -> Value {
    json!({ "$date": { "$numberLong": millis.to_string() } })
}

/// Compiles tests into document store descriptors.
pub struct DocumentCompiler {
    ids: Arc<dyn IdStrategy>,
}

impl DocumentCompiler {
    pub fn new(ids: Arc<dyn IdStrategy>) -> Self {
        Self { ids }
    }

    fn id_filter(ids: impl IntoIterator<Item = i64>) -> Value {
        json!({ "_id": { "$in": ids.into_iter().collect::<Vec<_>>() } })
    }

    fn seeded_filter(&self, count: i64) -> Value {
        Self::id_filter((1..=count).map(|i| self.ids.seeded_order_id(i)))
    }

    fn order_document(order: &SyntheticOrder, with_lines: bool) -> Value {
        let products = if with_lines {
            vec![json!({
                "product_id": order.line.product_id,
                "product_name": order.line.product_name,
                "add_to_cart_order": order.line.add_to_cart_order,
                "reordered": order.line.reordered,
            })]
        } else {
            Vec::new()
        };

        json!({
            "_id": order.order_id,
            "user_id": order.user_id,
            "order_number": order.order_number,
            "order_dow": order.order_dow,
            "order_hour_of_day": order.order_hour_of_day,
            "days_since_prior_order": order.days_since_prior_order,
            "order_timestamp": date_value(order.timestamp_millis()),
            "products": products,
        })
    }

    fn insert(&self, count: i64, with_lines: bool) -> CompiledOperation {
        let n = count_of(count);
        let mut documents: Vec<Value> = (1..=count)
            .map(|i| Self::order_document(&SyntheticOrder::for_index(i, self.ids.as_ref()), with_lines))
            .collect();

        let children = if with_lines { n } else { 0 };
        let op = if documents.len() == 1 {
            DocumentOp::new(ORDERS_COLLECTION, DocumentAction::InsertOne, vec![documents.remove(0)])
        } else {
            DocumentOp::new(
                ORDERS_COLLECTION,
                DocumentAction::InsertMany,
                vec![Value::Array(documents)],
            )
        };
        CompiledOperation::document(vec![op], Footprint::new(n, children, 0))
    }
}

impl BackendCompiler for DocumentCompiler {
    fn backend(&self) -> Backend {
        Backend::Mongo
    }

    fn translate(&self, kind: TestKind, count: i64) -> CompiledOperation {
        let n = count_of(count);
        let single = |op: DocumentOp| CompiledOperation::document(vec![op], Footprint::new(n, 0, 0));

        match kind {
            TestKind::SelectBase => single(DocumentOp::new(
                ORDERS_COLLECTION,
                DocumentAction::Find,
                vec![self.seeded_filter(count), json!({ "products": 0 })],
            )),
            TestKind::SelectJoin => single(DocumentOp::new(
                ORDERS_COLLECTION,
                DocumentAction::Find,
                vec![self.seeded_filter(count)],
            )),
            TestKind::SelectDate => {
                let boundary = timestamp::range_boundary().and_utc().timestamp_millis();
                single(
                    DocumentOp::new(
                        ORDERS_COLLECTION,
                        DocumentAction::Find,
                        vec![json!({ "order_timestamp": { "$gte": date_value(boundary) } })],
                    )
                    .with_sort(json!({ "order_timestamp": 1 }))
                    .with_limit(n as u64),
                )
            }
            TestKind::InsertBase => self.insert(count, false),
            TestKind::InsertMulti => self.insert(count, true),
            TestKind::UpdateBase => single(DocumentOp::new(
                ORDERS_COLLECTION,
                DocumentAction::UpdateMany,
                vec![
                    self.seeded_filter(count),
                    json!([{ "$set": { "order_dow": { "$mod": ["$_id", 7] } } }]),
                ],
            )),
            TestKind::DeleteBase => single(DocumentOp::new(
                ORDERS_COLLECTION,
                DocumentAction::DeleteMany,
                vec![Self::id_filter((1..=count).map(|i| self.ids.order_id(i)))],
            )),
            TestKind::DeleteMulti => single(DocumentOp::new(
                ORDERS_COLLECTION,
                DocumentAction::DeleteMany,
                vec![self.seeded_filter(count)],
            )),
        }
    }
}
