//! Workload catalog: logical tests and the backends they run against.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A backend-independent benchmark scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TestKind {
    /// Point lookup of orders by id.
    SelectBase,
    /// Orders together with their order lines and product details.
    SelectJoin,
    /// Orders at or after a fixed instant.
    SelectDate,
    /// Insert orders without order lines.
    InsertBase,
    /// Insert orders with one order line each.
    InsertMulti,
    /// Update one order-level column.
    UpdateBase,
    /// Delete orders that own no order lines.
    DeleteBase,
    /// Delete orders together with their order lines.
    DeleteMulti,
}

impl TestKind {
    pub const ALL: [TestKind; 8] = [
        TestKind::SelectBase,
        TestKind::SelectJoin,
        TestKind::SelectDate,
        TestKind::InsertBase,
        TestKind::InsertMulti,
        TestKind::UpdateBase,
        TestKind::DeleteBase,
        TestKind::DeleteMulti,
    ];

    /// Identifier used on the command line and as the series directory.
    pub fn name(&self) -> &'static str {
        match self {
            TestKind::SelectBase => "select_base",
            TestKind::SelectJoin => "select_join",
            TestKind::SelectDate => "select_date",
            TestKind::InsertBase => "insert_base",
            TestKind::InsertMulti => "insert_multi",
            TestKind::UpdateBase => "update_base",
            TestKind::DeleteBase => "delete_base",
            TestKind::DeleteMulti => "delete_multi",
        }
    }

    /// Look up a test by identifier. Unknown names are not an error.
    pub fn lookup(name: &str) -> Option<TestKind> {
        TestKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name.trim())
    }

    /// Whether the test writes to the backend.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            TestKind::SelectBase | TestKind::SelectJoin | TestKind::SelectDate
        )
    }

    /// Whether the test reads or writes order lines as well as orders.
    pub fn touches_children(&self) -> bool {
        matches!(
            self,
            TestKind::SelectJoin | TestKind::InsertMulti | TestKind::DeleteMulti
        )
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TestKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestKind::lookup(s).ok_or_else(|| Error::invalid(format!("unknown test: {s}")))
    }
}

/// A test together with its workload size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalTest {
    kind: TestKind,
    record_count: i64,
}

impl LogicalTest {
    pub fn new(kind: TestKind, record_count: i64) -> Self {
        Self { kind, record_count }
    }

    pub fn kind(&self) -> TestKind {
        self.kind
    }

    pub fn record_count(&self) -> i64 {
        self.record_count
    }

    /// Loop indices `1..=record_count`; empty when the count is not positive.
    pub fn indices(&self) -> impl Iterator<Item = i64> {
        1..=self.record_count.max(0)
    }

    /// Number of records the test covers, zero for non-positive counts.
    pub fn effective_count(&self) -> usize {
        usize::try_from(self.record_count).unwrap_or(0)
    }
}

/// Physical model a backend stores the order data in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendFamily {
    /// Normalized tables joined at query time.
    Relational,
    /// Orders with embedded order lines.
    Document,
    /// Query-shaped tables with secondary lookup tables.
    WideColumn,
}

/// The storage engines under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Backend {
    Postgres,
    MariaDb,
    Mongo,
    Cassandra,
}

impl Backend {
    pub const ALL: [Backend; 4] = [
        Backend::Postgres,
        Backend::MariaDb,
        Backend::Mongo,
        Backend::Cassandra,
    ];

    /// Identifier used on the command line and as the series file stem.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Postgres => "postgres",
            Backend::MariaDb => "mariadb",
            Backend::Mongo => "mongo",
            Backend::Cassandra => "cassandra",
        }
    }

    pub fn family(&self) -> BackendFamily {
        match self {
            Backend::Postgres | Backend::MariaDb => BackendFamily::Relational,
            Backend::Mongo => BackendFamily::Document,
            Backend::Cassandra => BackendFamily::WideColumn,
        }
    }

    /// Whether mutations can be rolled back after measurement.
    pub fn is_transactional(&self) -> bool {
        self.family() == BackendFamily::Relational
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::ALL
            .into_iter()
            .find(|backend| backend.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid(format!("unknown backend: {s}")))
    }
}
