//! `replace_view`, reversed by swapping definitions.

use serde::Serialize;

use super::{DiffTuple, MigrateOperation, ViewOp, create_view_sql, drop_view_sql};
use crate::dialect::Dialect;
use crate::error::{ViewError, ViewResult};
use crate::schema::SchemaName;
use crate::script::{ArgValue, OpCall};

/// Replace a view's definition.
///
/// Runs `CREATE OR REPLACE VIEW` where the dialect has it. With `drop` set,
/// or on SQLite, the view is dropped and created again instead; PostgreSQL
/// refuses to replace a view whose column list changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaceViewOp {
    pub name: String,
    pub definition: String,
    pub schema: SchemaName,
    pub drop: bool,
    /// Definition being replaced. Required to reverse.
    pub old_definition: Option<String>,
}

impl ReplaceViewOp {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
            schema: SchemaName::Default,
            drop: false,
            old_definition: None,
        }
    }

    pub fn with_schema(mut self, schema: SchemaName) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_drop(mut self, drop: bool) -> Self {
        self.drop = drop;
        self
    }

    pub fn with_old_definition(mut self, old_definition: impl Into<String>) -> Self {
        self.old_definition = Some(old_definition.into());
        self
    }

    /// Registry entry point: `replace_view(name, definition, schema=null, drop=false)`.
    pub fn from_call(call: &OpCall) -> ViewResult<ViewOp> {
        call.expect_params(&["name", "definition", "schema", "drop"])?;
        let op = Self::new(call.required_str(0, "name")?, call.required_str(1, "definition")?)
            .with_schema(call.optional_str(2, "schema")?.into())
            .with_drop(call.flag(3, "drop")?);
        Ok(op.into())
    }
}

impl MigrateOperation for ReplaceViewOp {
    const NAME: &'static str = "replace_view";

    /// Swap the definitions. The schema and drop flag carry over.
    fn reverse(&self) -> ViewResult<ViewOp> {
        let old_definition = self
            .old_definition
            .as_ref()
            .ok_or_else(|| ViewError::missing_old_definition(Self::NAME, &self.name))?;

        Ok(Self::new(&self.name, old_definition)
            .with_schema(self.schema.clone())
            .with_drop(self.drop)
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
        if self.drop || !dialect.supports_replace() {
            vec![
                drop_view_sql(dialect, &self.schema, &self.name),
                create_view_sql(dialect, &self.schema, &self.name, &self.definition),
            ]
        } else {
            vec![format!(
                "CREATE OR REPLACE VIEW {} AS {}",
                dialect.qualified_name(&self.schema, &self.name),
                self.definition
            )]
        }
    }

    fn to_call(&self) -> OpCall {
        let call = OpCall::new(Self::NAME)
            .arg(self.name.as_str())
            .arg(self.definition.as_str())
            .schema_kwarg(&self.schema);

        if self.drop {
            call.kwarg("drop", ArgValue::Bool(true))
        } else {
            call
        }
    }
}
