//! Synthetic records shared by every compiler.
//!
//! A compiler never invents field values on its own: record `i` is built here
//! once so all backends agree on what "the same record" is.

use chrono::NaiveDateTime;

use crate::timestamp;

/// Default first id handed out to inserted orders.
pub const DEFAULT_ORDER_BASE: i64 = 1_000_000;

/// Default first id for the users owning inserted orders.
pub const DEFAULT_USER_BASE: i64 = 10_000;

/// Default first product id referenced by generated order lines.
pub const DEFAULT_PRODUCT_BASE: i64 = 100;

/// Number of distinct products generated order lines cycle through.
pub const PRODUCT_CYCLE: i64 = 10;

/// Derives synthetic keys from a loop index.
///
/// Ids are deterministic but not globally unique: re-running an insert test
/// against a live backend reuses the same keys.
pub trait IdStrategy: Send + Sync {
    /// Key of the order written by insert tests for index `i`.
    fn order_id(&self, i: i64) -> i64;

    /// Key of a pre-loaded order read, updated or deleted for index `i`.
    fn seeded_order_id(&self, i: i64) -> i64;

    fn user_id(&self, i: i64) -> i64;

    fn product_id(&self, i: i64) -> i64;

    /// Time-index key the pre-loaded order `i` was stored under.
    ///
    /// Defaults to the generated timestamp. Strategies over an externally
    /// loaded dataset override this with the loader's key.
    fn seeded_order_timestamp(&self, i: i64) -> NaiveDateTime {
        record_timestamp(i)
    }
}

/// Base-plus-offset keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetIds {
    pub order_base: i64,
    pub user_base: i64,
    pub product_base: i64,
}

impl OffsetIds {
    pub fn new(order_base: i64, user_base: i64, product_base: i64) -> Self {
        Self {
            order_base,
            user_base,
            product_base,
        }
    }
}

impl Default for OffsetIds {
    fn default() -> Self {
        Self::new(DEFAULT_ORDER_BASE, DEFAULT_USER_BASE, DEFAULT_PRODUCT_BASE)
    }
}

impl IdStrategy for OffsetIds {
    fn order_id(&self, i: i64) -> i64 {
        self.order_base + i
    }

    fn seeded_order_id(&self, i: i64) -> i64 {
        i
    }

    fn user_id(&self, i: i64) -> i64 {
        self.user_base + i
    }

    fn product_id(&self, i: i64) -> i64 {
        self.product_base + i.rem_euclid(PRODUCT_CYCLE)
    }
}

/// Time-index key of record `i`: hour `i % 24`, day offset `i % 30`.
pub fn record_timestamp(i: i64) -> NaiveDateTime {
    let (hour, day_offset) = (i.rem_euclid(24), i.rem_euclid(30));
    // both components are in range by construction
    timestamp::generate(hour, day_offset).unwrap_or_else(|_| timestamp::range_boundary())
}

/// Display name of a generated product.
pub fn product_name(product_id: i64) -> String {
    format!("Product {product_id}")
}

/// An order line of a generated order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: i64,
    pub product_name: String,
    pub add_to_cart_order: i64,
    pub reordered: i64,
}

/// Generated order `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticOrder {
    pub order_id: i64,
    pub user_id: i64,
    pub order_number: i64,
    pub order_dow: i64,
    pub order_hour_of_day: i64,
    pub days_since_prior_order: i64,
    pub order_timestamp: NaiveDateTime,
    pub line: OrderLine,
}

impl SyntheticOrder {
    pub fn for_index(i: i64, ids: &dyn IdStrategy) -> Self {
        let product_id = ids.product_id(i);
        Self {
            order_id: ids.order_id(i),
            user_id: ids.user_id(i),
            order_number: i,
            order_dow: i.rem_euclid(7),
            order_hour_of_day: i.rem_euclid(24),
            days_since_prior_order: i.rem_euclid(30),
            order_timestamp: record_timestamp(i),
            line: OrderLine {
                product_id,
                product_name: product_name(product_id),
                add_to_cart_order: 1,
                reordered: 0,
            },
        }
    }

    /// Pre-loaded order `i`: seeded key and time-index key, generated fields.
    pub fn seeded(i: i64, ids: &dyn IdStrategy) -> Self {
        Self {
            order_id: ids.seeded_order_id(i),
            order_timestamp: ids.seeded_order_timestamp(i),
            ..Self::for_index(i, ids)
        }
    }

    /// Timestamp literal as embedded in SQL-shaped statements.
    pub fn timestamp_literal(&self) -> String {
        timestamp::format_timestamp(&self.order_timestamp)
    }

    /// Unix milliseconds of the order timestamp.
    pub fn timestamp_millis(&self) -> i64 {
        self.order_timestamp.and_utc().timestamp_millis()
    }
}

/// The value `update_base` assigns to `order_dow` of order `order_id`.
pub fn updated_order_dow(order_id: i64) -> i64 {
    order_id.rem_euclid(7)
}
