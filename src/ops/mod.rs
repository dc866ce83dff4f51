//! Reversible view operations.
//!
//! Three operations cover every view change: [`CreateViewOp`],
//! [`ReplaceViewOp`] and [`DropViewOp`]. Each one can
//! - produce the DDL it runs for a dialect ([`MigrateOperation::statements`]),
//! - produce the operation that undoes it ([`MigrateOperation::reverse`]),
//! - render itself as a migration script call ([`MigrateOperation::to_call`]).
//!
//! Operations are plain values. They are never mutated after construction.

mod create;
mod drop;
mod replace;

pub use create::CreateViewOp;
pub use drop::DropViewOp;
pub use replace::ReplaceViewOp;

use serde::Serialize;

use crate::dialect::Dialect;
use crate::engine::Connection;
use crate::error::ViewResult;
use crate::schema::{SchemaName, ViewKey};
use crate::script::OpCall;

/// Identity of an operation for diff reporting: `(kind, schema, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DiffTuple {
    pub kind: &'static str,
    pub schema: SchemaName,
    pub name: String,
}

/// Behaviour shared by every view operation.
pub trait MigrateOperation {
    /// Name the operation is registered and rendered under.
    const NAME: &'static str;

    /// The operation that undoes this one.
    fn reverse(&self) -> ViewResult<ViewOp>;

    fn to_diff_tuple(&self) -> DiffTuple;

    /// DDL statements, in execution order.
    fn statements(&self, dialect: Dialect) -> Vec<String>;

    /// The script call that reproduces this operation.
    fn to_call(&self) -> OpCall;

    /// Render as migration script text.
    fn render(&self) -> String {
        self.to_call().to_string()
    }
}

/// Any view operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op")]
pub enum ViewOp {
    #[serde(rename = "create_view")]
    Create(CreateViewOp),
    #[serde(rename = "replace_view")]
    Replace(ReplaceViewOp),
    #[serde(rename = "drop_view")]
    Drop(DropViewOp),
}

impl ViewOp {
    pub fn name(&self) -> &str {
        match self {
            Self::Create(op) => &op.name,
            Self::Replace(op) => &op.name,
            Self::Drop(op) => &op.name,
        }
    }

    pub fn schema(&self) -> &SchemaName {
        match self {
            Self::Create(op) => &op.schema,
            Self::Replace(op) => &op.schema,
            Self::Drop(op) => &op.schema,
        }
    }

    /// The registered operation name (`create_view`, ...).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create(_) => CreateViewOp::NAME,
            Self::Replace(_) => ReplaceViewOp::NAME,
            Self::Drop(_) => DropViewOp::NAME,
        }
    }

    pub fn reverse(&self) -> ViewResult<ViewOp> {
        match self {
            Self::Create(op) => op.reverse(),
            Self::Replace(op) => op.reverse(),
            Self::Drop(op) => op.reverse(),
        }
    }

    pub fn to_diff_tuple(&self) -> DiffTuple {
        match self {
            Self::Create(op) => op.to_diff_tuple(),
            Self::Replace(op) => op.to_diff_tuple(),
            Self::Drop(op) => op.to_diff_tuple(),
        }
    }

    pub fn statements(&self, dialect: Dialect) -> Vec<String> {
        match self {
            Self::Create(op) => op.statements(dialect),
            Self::Replace(op) => op.statements(dialect),
            Self::Drop(op) => op.statements(dialect),
        }
    }

    pub fn to_call(&self) -> OpCall {
        match self {
            Self::Create(op) => op.to_call(),
            Self::Replace(op) => op.to_call(),
            Self::Drop(op) => op.to_call(),
        }
    }

    pub fn render(&self) -> String {
        self.to_call().to_string()
    }

    /// One-line human readable summary.
    pub fn describe(&self) -> String {
        let target = ViewKey::new(self.schema().clone(), self.name());
        match self {
            Self::Create(_) => format!("Create view {}", target),
            Self::Replace(op) if op.drop => format!("Replace view {} (drop + create)", target),
            Self::Replace(_) => format!("Replace view {}", target),
            Self::Drop(_) => format!("Drop view {}", target),
        }
    }

    /// Run the forward DDL on a connection.
    pub async fn execute<C: Connection>(&self, conn: &mut C, dialect: Dialect) -> ViewResult<()> {
        for statement in self.statements(dialect) {
            tracing::debug!("{}", statement);
            conn.execute(&statement).await?;
        }
        Ok(())
    }
}

impl From<CreateViewOp> for ViewOp {
    fn from(op: CreateViewOp) -> Self {
        Self::Create(op)
    }
}

impl From<ReplaceViewOp> for ViewOp {
    fn from(op: ReplaceViewOp) -> Self {
        Self::Replace(op)
    }
}

impl From<DropViewOp> for ViewOp {
    fn from(op: DropViewOp) -> Self {
        Self::Drop(op)
    }
}

fn create_view_sql(dialect: Dialect, schema: &SchemaName, name: &str, definition: &str) -> String {
    format!(
        "CREATE VIEW {} AS {}",
        dialect.qualified_name(schema, name),
        definition
    )
}

fn drop_view_sql(dialect: Dialect, schema: &SchemaName, name: &str) -> String {
    format!("DROP VIEW {}", dialect.qualified_name(schema, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SqlRecorder;

    #[test]
    fn test_describe() {
        let op: ViewOp = CreateViewOp::new("v1", "SELECT 1")
            .with_schema(SchemaName::named("public"))
            .into();
        assert_eq!(op.describe(), "Create view public.v1");

        let op: ViewOp = ReplaceViewOp::new("v1", "SELECT 2").with_drop(true).into();
        assert_eq!(op.describe(), "Replace view v1 (drop + create)");

        let op: ViewOp = DropViewOp::new("v1").into();
        assert_eq!(op.describe(), "Drop view v1");
    }

    #[test]
    fn test_serialize_json() {
        let op: ViewOp = DropViewOp::new("v2").with_old_definition("SELECT 2").into();
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "drop_view");
        assert_eq!(json["name"], "v2");
        assert_eq!(json["schema"], serde_json::Value::Null);
        assert_eq!(json["old_definition"], "SELECT 2");
    }

    #[tokio::test]
    async fn test_execute_runs_statements_in_order() {
        let op: ViewOp = ReplaceViewOp::new("v3", "SELECT 3")
            .with_old_definition("SELECT 4")
            .into();

        let mut conn = SqlRecorder::new();
        op.execute(&mut conn, Dialect::Sqlite).await.unwrap();
        assert_eq!(
            conn.statements,
            vec!["DROP VIEW v3", "CREATE VIEW v3 AS SELECT 3"]
        );
    }

    #[test]
    fn test_double_reverse_round_trip() {
        let ops: Vec<ViewOp> = vec![
            CreateViewOp::new("a", "SELECT 1")
                .with_schema(SchemaName::named("s"))
                .into(),
            ReplaceViewOp::new("b", "SELECT 2")
                .with_old_definition("SELECT 1")
                .into(),
            DropViewOp::new("c").with_old_definition("SELECT 3").into(),
        ];

        for op in ops {
            let back = op.reverse().unwrap().reverse().unwrap();
            assert_eq!(back.kind(), op.kind());
            assert_eq!(back.name(), op.name());
            assert_eq!(back.schema(), op.schema());
            assert_eq!(back.statements(Dialect::Postgresql), op.statements(Dialect::Postgresql));
        }
    }
}
