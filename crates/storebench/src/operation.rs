//! Compiled, backend-specific operations.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Rows or documents an operation is expected to return or affect.
///
/// Compilers fill this in while building the operation; for a given
/// `(test, count)` the `primary` and `children` figures agree across
/// backends even though the physical writes differ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Footprint {
    /// Orders.
    pub primary: usize,
    /// Order lines, whether stored in their own table or embedded.
    pub children: usize,
    /// Rows in secondary lookup tables (wide-column only).
    pub secondary: usize,
}

impl Footprint {
    pub fn new(primary: usize, children: usize, secondary: usize) -> Self {
        Self {
            primary,
            children,
            secondary,
        }
    }

    pub fn total(&self) -> usize {
        self.primary + self.children + self.secondary
    }
}

/// Collection-level action of a document operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentAction {
    Find,
    InsertOne,
    InsertMany,
    UpdateMany,
    DeleteMany,
}

impl DocumentAction {
    pub fn name(&self) -> &'static str {
        match self {
            DocumentAction::Find => "find",
            DocumentAction::InsertOne => "insert_one",
            DocumentAction::InsertMany => "insert_many",
            DocumentAction::UpdateMany => "update_many",
            DocumentAction::DeleteMany => "delete_many",
        }
    }
}

/// A structured `(resource, action, arguments, limit)` descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentOp {
    pub collection: String,
    pub action: DocumentAction,
    pub arguments: Vec<Value>,
    /// Sort specification applied before `limit`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl DocumentOp {
    pub fn new(collection: impl Into<String>, action: DocumentAction, arguments: Vec<Value>) -> Self {
        Self {
            collection: collection.into(),
            action,
            arguments,
            sort: None,
            limit: None,
        }
    }

    pub fn with_sort(mut self, sort: Value) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Executable body of a compiled operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationBody {
    /// Nothing to execute.
    Noop,
    /// One statement.
    Statement(String),
    /// Statements executed in order as one logical operation.
    Batch(Vec<String>),
    /// Document store descriptors.
    Document(Vec<DocumentOp>),
}

/// A logical test compiled for one backend.
///
/// Parameters are embedded by value; compiling the same
/// `(test, backend, count)` twice yields equal operations.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledOperation {
    pub body: OperationBody,
    pub footprint: Footprint,
}

impl CompiledOperation {
    pub fn noop() -> Self {
        Self {
            body: OperationBody::Noop,
            footprint: Footprint::default(),
        }
    }

    pub fn statement(sql: impl Into<String>, footprint: Footprint) -> Self {
        Self {
            body: OperationBody::Statement(sql.into()),
            footprint,
        }
    }

    /// A batch; a single statement collapses to [`OperationBody::Statement`].
    pub fn batch(mut statements: Vec<String>, footprint: Footprint) -> Self {
        let body = match statements.len() {
            0 => OperationBody::Noop,
            1 => OperationBody::Statement(statements.remove(0)),
            _ => OperationBody::Batch(statements),
        };
        Self { body, footprint }
    }

    pub fn document(ops: Vec<DocumentOp>, footprint: Footprint) -> Self {
        Self {
            body: OperationBody::Document(ops),
            footprint,
        }
    }

    pub fn is_noop(&self) -> bool {
        match &self.body {
            OperationBody::Noop => true,
            OperationBody::Batch(statements) => statements.is_empty(),
            OperationBody::Document(ops) => ops.is_empty(),
            OperationBody::Statement(_) => false,
        }
    }

    /// SQL-shaped statements in execution order; empty for document bodies.
    pub fn statements(&self) -> &[String] {
        match &self.body {
            OperationBody::Statement(sql) => std::slice::from_ref(sql),
            OperationBody::Batch(statements) => statements,
            OperationBody::Noop | OperationBody::Document(_) => &[],
        }
    }

    pub fn document_ops(&self) -> &[DocumentOp] {
        match &self.body {
            OperationBody::Document(ops) => ops,
            _ => &[],
        }
    }

    /// Number of round trips the operation takes.
    pub fn len(&self) -> usize {
        match &self.body {
            OperationBody::Noop => 0,
            OperationBody::Statement(_) => 1,
            OperationBody::Batch(statements) => statements.len(),
            OperationBody::Document(ops) => ops.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for CompiledOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            OperationBody::Noop => write!(f, "-- no-op"),
            OperationBody::Statement(sql) => write!(f, "{sql};"),
            OperationBody::Batch(statements) => {
                for (i, sql) in statements.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{sql};")?;
                }
                Ok(())
            }
            OperationBody::Document(ops) => {
                for (i, op) in ops.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    let json = serde_json::to_string(op).map_err(|_| fmt::Error)?;
                    write!(f, "{json}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_collapses_single_statement() {
        let op = CompiledOperation::batch(vec!["SELECT 1".into()], Footprint::default());
        assert_eq!(op.body, OperationBody::Statement("SELECT 1".into()));
        assert_eq!(op.len(), 1);

        let empty = CompiledOperation::batch(vec![], Footprint::default());
        assert!(empty.is_noop());
    }

    #[test]
    fn test_statements_view() {
        let op = CompiledOperation::batch(
            vec!["DELETE FROM a".into(), "DELETE FROM b".into()],
            Footprint::new(1, 1, 0),
        );
        assert_eq!(op.statements().len(), 2);
        assert_eq!(op.to_string(), "DELETE FROM a;\nDELETE FROM b;");
        assert!(op.document_ops().is_empty());
    }

    #[test]
    fn test_document_display() {
        let op = CompiledOperation::document(
            vec![DocumentOp::new("orders", DocumentAction::Find, vec![json!({"_id": 1})]).with_limit(5)],
            Footprint::new(1, 0, 0),
        );
        assert_eq!(
            op.to_string(),
            r#"{"collection":"orders","action":"find","arguments":[{"_id":1}],"limit":5}"#
        );
        assert!(op.statements().is_empty());

        let sorted = DocumentOp::new("orders", DocumentAction::Find, vec![json!({})])
            .with_sort(json!({"order_timestamp": 1}))
            .with_limit(2);
        assert_eq!(
            serde_json::to_string(&sorted).unwrap(),
            r#"{"collection":"orders","action":"find","arguments":[{}],"sort":{"order_timestamp":1},"limit":2}"#
        );
    }

    #[test]
    fn test_noop() {
        let op = CompiledOperation::noop();
        assert!(op.is_noop());
        assert!(op.is_empty());
        assert_eq!(op.footprint.total(), 0);
    }
}
