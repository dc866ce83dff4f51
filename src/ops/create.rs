//! `create_view`: a new view and its reversal to `drop_view`.

use serde::Serialize;

use super::{DiffTuple, DropViewOp, MigrateOperation, ViewOp, create_view_sql};
use crate::dialect::Dialect;
use crate::error::ViewResult;
use crate::schema::SchemaName;
use crate::script::OpCall;

/// `CREATE VIEW`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateViewOp {
    pub name: String,
    pub definition: String,
    pub schema: SchemaName,
}

impl CreateViewOp {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
            schema: SchemaName::Default,
        }
    }

    pub fn with_schema(mut self, schema: SchemaName) -> Self {
        self.schema = schema;
        self
    }

    /// Registry entry point: `create_view(name, definition, schema=null)`.
    pub fn from_call(call: &OpCall) -> ViewResult<ViewOp> {
        call.expect_params(&["name", "definition", "schema"])?;
        let op = Self::new(call.required_str(0, "name")?, call.required_str(1, "definition")?)
            .with_schema(call.optional_str(2, "schema")?.into());
        Ok(op.into())
    }
}

impl MigrateOperation for CreateViewOp {
    const NAME: &'static str = "create_view";

    /// A drop that remembers this definition, so it reverses back to us.
    fn reverse(&self) -> ViewResult<ViewOp> {
        Ok(DropViewOp::new(&self.name)
            .with_schema(self.schema.clone())
            .with_old_definition(&self.definition)
            .into())
    }

    fn to_diff_tuple(&self) -> DiffTuple {
        DiffTuple {
            kind: Self::NAME,
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }

    fn statements(&self, dialect: Dialect) -> Vec<String> {
        vec![create_view_sql(dialect, &self.schema, &self.name, &self.definition)]
    }

    fn to_call(&self) -> OpCall {
        OpCall::new(Self::NAME)
            .arg(self.name.as_str())
            .arg(self.definition.as_str())
            .schema_kwarg(&self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements() {
        let op = CreateViewOp::new("v1", "SELECT 1").with_schema(SchemaName::named("public"));
        assert_eq!(
            op.statements(Dialect::Postgresql),
            vec!["CREATE VIEW public.v1 AS SELECT 1"]
        );
        let op = CreateViewOp::new("Order Totals", "SELECT 1");
        assert_eq!(
            op.statements(Dialect::Sqlite),
            vec!["CREATE VIEW \"Order Totals\" AS SELECT 1"]
        );
    }

    #[test]
    fn test_reverse_is_drop_with_old_definition() {
        let op = CreateViewOp::new("v1", "SELECT 1").with_schema(SchemaName::named("s"));
        assert_eq!(
            op.reverse().unwrap(),
            ViewOp::Drop(
                DropViewOp::new("v1")
                    .with_schema(SchemaName::named("s"))
                    .with_old_definition("SELECT 1")
            )
        );
    }

    #[test]
    fn test_diff_tuple() {
        let op = CreateViewOp::new("v1", "SELECT 1");
        assert_eq!(
            op.to_diff_tuple(),
            DiffTuple {
                kind: "create_view",
                schema: SchemaName::Default,
                name: "v1".to_string(),
            }
        );
    }

    #[test]
    fn test_render() {
        let op = CreateViewOp::new("v1", "SELECT 1");
        assert_eq!(op.render(), r#"op.create_view("v1", "SELECT 1")"#);

        let op = op.with_schema(SchemaName::named("public"));
        assert_eq!(
            op.render(),
            r#"op.create_view("v1", "SELECT 1", schema="public")"#
        );
    }
}
