//! Table layouts the compilers target.
//!
//! Loading data is done elsewhere; these definitions document each
//! backend's projection of the order model and let local relational runs
//! create the schema.

use crate::compile::Dialect;

/// Normalized relational schema.
pub fn relational_ddl(dialect: Dialect) -> String {
    let timestamp_type = match dialect {
        Dialect::Postgres => "TIMESTAMP",
        Dialect::MariaDb => "DATETIME",
    };

    format!(
        r#"
CREATE TABLE IF NOT EXISTS aisles (
    aisle_id INTEGER PRIMARY KEY,
    aisle TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS departments (
    department_id INTEGER PRIMARY KEY,
    department TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    product_id INTEGER PRIMARY KEY,
    product_name TEXT NOT NULL,
    aisle_id INTEGER NOT NULL REFERENCES aisles(aisle_id),
    department_id INTEGER NOT NULL REFERENCES departments(department_id)
);

CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS orders (
    order_id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    order_number INTEGER NOT NULL,
    order_dow INTEGER NOT NULL,
    order_hour_of_day INTEGER NOT NULL,
    days_since_prior_order INTEGER,
    order_timestamp {timestamp_type} NOT NULL
);

CREATE TABLE IF NOT EXISTS order_products (
    order_id INTEGER NOT NULL REFERENCES orders(order_id),
    product_id INTEGER NOT NULL REFERENCES products(product_id),
    add_to_cart_order INTEGER NOT NULL,
    reordered INTEGER NOT NULL,
    PRIMARY KEY (order_id, product_id)
);

CREATE INDEX IF NOT EXISTS idx_orders_timestamp ON orders(order_timestamp);
CREATE INDEX IF NOT EXISTS idx_order_products_order ON order_products(order_id);
"#
    )
}

/// Wide-column keyspace with its query-shaped tables.
///
/// Order-level columns of `order_products_by_order` are static so an order
/// can be updated by partition key alone.
pub fn wide_column_ddl(keyspace: &str, replication_factor: u32) -> String {
    format!(
        r#"
CREATE KEYSPACE IF NOT EXISTS {keyspace}
    WITH REPLICATION = {{ 'class' : 'SimpleStrategy', 'replication_factor' : {replication_factor} }};

CREATE TABLE IF NOT EXISTS {keyspace}.products (
    product_id int PRIMARY KEY,
    product_name text,
    aisle_id int,
    department_id int
);

CREATE TABLE IF NOT EXISTS {keyspace}.orders (
    order_id int PRIMARY KEY,
    user_id int,
    order_number int,
    order_dow int,
    order_timestamp timestamp,
    days_since_prior_order int
);

CREATE TABLE IF NOT EXISTS {keyspace}.orders_by_timestamp (
    order_timestamp timestamp,
    order_id int,
    user_id int,
    order_number int,
    PRIMARY KEY (order_timestamp, order_id)
);

CREATE TABLE IF NOT EXISTS {keyspace}.order_products_by_order (
    order_id int,
    product_id int,
    user_id int static,
    order_number int static,
    order_dow int static,
    order_timestamp timestamp static,
    days_since_prior_order int static,
    product_name text,
    add_to_cart_order int,
    reordered int,
    PRIMARY KEY (order_id, product_id)
);

CREATE TABLE IF NOT EXISTS {keyspace}.users (
    user_id int PRIMARY KEY,
    name text
);
"#
    )
}

/// Statements of a DDL script, split on `;`.
pub fn statements(ddl: &str) -> impl Iterator<Item = &str> {
    ddl.split(';').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relational_ddl_dialects() {
        assert!(relational_ddl(Dialect::Postgres).contains("order_timestamp TIMESTAMP NOT NULL"));
        assert!(relational_ddl(Dialect::MariaDb).contains("order_timestamp DATETIME NOT NULL"));
        assert_eq!(statements(&relational_ddl(Dialect::Postgres)).count(), 8);
    }

    #[test]
    fn test_wide_column_ddl() {
        let ddl = wide_column_ddl("instacart", 1);
        assert!(ddl.contains("'replication_factor' : 1 }"));
        assert!(ddl.contains("PRIMARY KEY (order_timestamp, order_id)"));
        assert!(ddl.contains("order_dow int static"));
        assert_eq!(statements(&ddl).count(), 6);
    }
}
