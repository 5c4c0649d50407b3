//! Backend operation compilers.
//!
//! Each compiler turns a [`LogicalTest`] into the operation its backend family
//! needs to answer the same business question: normalized joins for the
//! relational engines, embedded documents for the document store and
//! query-shaped tables for the wide-column store. All of them draw record
//! values from [`crate::fixtures`] and ids from one [`IdStrategy`].

pub mod document;
pub mod relational;
pub mod wide_column;

use std::sync::Arc;

use crate::catalog::{Backend, LogicalTest, TestKind};
use crate::fixtures::IdStrategy;
use crate::operation::CompiledOperation;

pub use document::DocumentCompiler;
pub use relational::{Dialect, RelationalCompiler};
pub use wide_column::WideColumnCompiler;

/// Translates logical tests into operations for one backend.
pub trait BackendCompiler: Send + Sync {
    /// Backend the produced operations target.
    fn backend(&self) -> Backend;

    /// Build the operation for `kind` over loop indices `1..=count`.
    ///
    /// Only called with `count >= 1`.
    fn translate(&self, kind: TestKind, count: i64) -> CompiledOperation;

    /// Compile a test. Non-positive counts yield a no-op.
    fn compile(&self, test: &LogicalTest) -> CompiledOperation {
        if test.record_count() <= 0 {
            return CompiledOperation::noop();
        }
        let op = self.translate(test.kind(), test.record_count());
        tracing::debug!(
            backend = %self.backend(),
            test = %test.kind(),
            count = test.record_count(),
            round_trips = op.len(),
            "compiled operation"
        );
        op
    }

    /// Compile by test identifier. Unknown identifiers yield a no-op.
    fn compile_named(&self, name: &str, record_count: i64) -> CompiledOperation {
        match TestKind::lookup(name) {
            Some(kind) => self.compile(&LogicalTest::new(kind, record_count)),
            None => {
                tracing::debug!(backend = %self.backend(), test = name, "unknown test, compiling no-op");
                CompiledOperation::noop()
            }
        }
    }
}

/// Compiler for `backend` using `ids` for synthetic keys.
pub fn compiler_for(backend: Backend, ids: Arc<dyn IdStrategy>) -> Box<dyn BackendCompiler> {
    match backend {
        Backend::Postgres => Box::new(RelationalCompiler::new(Dialect::Postgres, ids)),
        Backend::MariaDb => Box::new(RelationalCompiler::new(Dialect::MariaDb, ids)),
        Backend::Mongo => Box::new(DocumentCompiler::new(ids)),
        Backend::Cassandra => Box::new(WideColumnCompiler::new(ids)),
    }
}

/// Comma-separated id list for `IN (...)` predicates.
pub(crate) fn id_list(ids: impl IntoIterator<Item = i64>) -> String {
    ids.into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Single-quoted SQL/CQL string literal.
pub(crate) fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub(crate) fn count_of(count: i64) -> usize {
    usize::try_from(count).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::OffsetIds;
    use crate::operation::Footprint;

    fn all_compilers() -> Vec<Box<dyn BackendCompiler>> {
        let ids: Arc<dyn IdStrategy> = Arc::new(OffsetIds::default());
        Backend::ALL
            .into_iter()
            .map(|backend| compiler_for(backend, ids.clone()))
            .collect()
    }

    #[test]
    fn test_compiler_for_backend() {
        for (backend, compiler) in Backend::ALL.into_iter().zip(all_compilers()) {
            assert_eq!(compiler.backend(), backend);
        }
    }

    #[test]
    fn test_unknown_test_is_noop() {
        for compiler in all_compilers() {
            assert!(compiler.compile_named("select", 5).is_noop());
            assert!(compiler.compile_named("", 5).is_noop());
        }
    }

    #[test]
    fn test_non_positive_count_is_noop() {
        for compiler in all_compilers() {
            for kind in TestKind::ALL {
                for count in [0, -1, -100] {
                    let op = compiler.compile(&LogicalTest::new(kind, count));
                    assert!(op.is_noop(), "{} {} {}", compiler.backend(), kind, count);
                    assert_eq!(op.footprint, Footprint::default());
                }
            }
        }
    }

    #[test]
    fn test_compilation_is_reproducible() {
        for compiler in all_compilers() {
            for kind in TestKind::ALL {
                let test = LogicalTest::new(kind, 7);
                assert_eq!(compiler.compile(&test), compiler.compile(&test));
            }
        }
    }

    #[test]
    fn test_footprints_agree_across_backends() {
        for kind in TestKind::ALL {
            for count in [1, 5, 40] {
                let test = LogicalTest::new(kind, count);
                let footprints: Vec<_> = all_compilers()
                    .iter()
                    .map(|c| c.compile(&test).footprint)
                    .collect();
                for fp in &footprints {
                    assert_eq!(fp.primary, count as usize, "{kind} primary");
                    assert_eq!(fp.children, footprints[0].children, "{kind} children");
                }
            }
        }
    }

    #[test]
    fn test_insert_multi_five_records() {
        let test = LogicalTest::new(TestKind::InsertMulti, 5);
        for compiler in all_compilers() {
            let fp = compiler.compile(&test).footprint;
            assert_eq!(fp.primary, 5);
            assert_eq!(fp.children, 5);
        }
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("O'Brien"), "'O''Brien'");
        assert_eq!(id_list([1, 2, 3]), "1, 2, 3");
    }
}
