//! `drop_view`.

use serde::Serialize;

use super::{CreateViewOp, DiffTuple, MigrateOperation, ViewOp, drop_view_sql};
use crate::dialect::Dialect;
use crate::error::{ViewError, ViewResult};
use crate::schema::SchemaName;
use crate::script::OpCall;

/// `DROP VIEW`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropViewOp {
    pub name: String,
    pub schema: SchemaName,
    /// Definition of the dropped view. Required to reverse.
    pub old_definition: Option<String>,
}

impl DropViewOp {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: SchemaName::Default,
            old_definition: None,
        }
    }

    pub fn with_schema(mut self, schema: SchemaName) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_old_definition(mut self, old_definition: impl Into<String>) -> Self {
        self.old_definition = Some(old_definition.into());
        self
    }

    /// Registry entry point: `drop_view(name, schema=null)`.
    pub fn from_call(call: &OpCall) -> ViewResult<ViewOp> {
        call.expect_params(&["name", "schema"])?;
        let op = Self::new(call.required_str(0, "name")?)
            .with_schema(call.optional_str(1, "schema")?.into());
        Ok(op.into())
    }
}

impl MigrateOperation for DropViewOp {
    const NAME: &'static str = "drop_view";

    fn reverse(&self) -> ViewResult<ViewOp> {
        let old_definition = self
            .old_definition
            .as_ref()
            .ok_or_else(|| ViewError::missing_old_definition(Self::NAME, &self.name))?;

        Ok(CreateViewOp::new(&self.name, old_definition)
            .with_schema(self.schema.clone())
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
        vec![drop_view_sql(dialect, &self.schema, &self.name)]
    }

    fn to_call(&self) -> OpCall {
        OpCall::new(Self::NAME)
            .arg(self.name.as_str())
            .schema_kwarg(&self.schema)
    }
}
