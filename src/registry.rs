//! Operation registry and the migration execution engine.
//!
//! Operations are not registered globally. Whoever builds an [`Operations`]
//! engine owns an [`OperationRegistry`], fills it once (usually with
//! [`register_view_operations`]) and passes it in.

use std::collections::HashMap;
use std::fmt;

use crate::dialect::Dialect;
use crate::engine::Connection;
use crate::error::{ViewError, ViewResult};
use crate::ops::{CreateViewOp, DropViewOp, MigrateOperation, ReplaceViewOp, ViewOp};
use crate::schema::SchemaName;
use crate::script::{ArgValue, OpCall, parse_script};

/// Constructor entry point for a registered operation.
pub type OpConstructor = fn(&OpCall) -> ViewResult<ViewOp>;

/// Maps operation names to their constructors.
#[derive(Default)]
pub struct OperationRegistry {
    constructors: HashMap<String, OpConstructor>,
}

impl OperationRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the view operations registered.
    pub fn with_view_operations() -> Self {
        let mut registry = Self::new();
        register_view_operations(&mut registry);
        registry
    }

    /// Register `constructor` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: &str, constructor: OpConstructor) {
        self.constructors.insert(name.to_string(), constructor);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build the operation a call describes.
    pub fn build(&self, call: &OpCall) -> ViewResult<ViewOp> {
        let constructor = self
            .constructors
            .get(&call.name)
            .ok_or_else(|| ViewError::UnknownOperation(call.name.clone()))?;
        constructor(call)
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("operations", &self.names())
            .finish()
    }
}

/// Register `create_view`, `replace_view` and `drop_view`.
pub fn register_view_operations(registry: &mut OperationRegistry) {
    registry.register(CreateViewOp::NAME, CreateViewOp::from_call);
    registry.register(ReplaceViewOp::NAME, ReplaceViewOp::from_call);
    registry.register(DropViewOp::NAME, DropViewOp::from_call);
}

/// Executes operations against a connection.
pub struct Operations<'a, C> {
    conn: &'a mut C,
    dialect: Dialect,
    registry: &'a OperationRegistry,
}

impl<'a, C: Connection> Operations<'a, C> {
    pub fn new(conn: &'a mut C, dialect: Dialect, registry: &'a OperationRegistry) -> Self {
        Self {
            conn,
            dialect,
            registry,
        }
    }

    /// Run an operation forward.
    pub async fn invoke(&mut self, op: &ViewOp) -> ViewResult<()> {
        tracing::info!("{}", op.describe());
        op.execute(&mut *self.conn, self.dialect).await
    }

    /// Build a call through the registry and run it.
    pub async fn invoke_call(&mut self, call: &OpCall) -> ViewResult<()> {
        let op = self.registry.build(call)?;
        self.invoke(&op).await
    }

    /// `op.create_view(name, definition, schema=...)`
    pub async fn create_view(
        &mut self,
        name: &str,
        definition: &str,
        schema: SchemaName,
    ) -> ViewResult<()> {
        let call = OpCall::new(CreateViewOp::NAME)
            .arg(name)
            .arg(definition)
            .schema_kwarg(&schema);
        self.invoke_call(&call).await
    }

    /// `op.replace_view(name, definition, schema=..., drop=...)`
    pub async fn replace_view(
        &mut self,
        name: &str,
        definition: &str,
        schema: SchemaName,
        drop: bool,
    ) -> ViewResult<()> {
        let call = OpCall::new(ReplaceViewOp::NAME)
            .arg(name)
            .arg(definition)
            .schema_kwarg(&schema)
            .kwarg("drop", ArgValue::Bool(drop));
        self.invoke_call(&call).await
    }

    /// `op.drop_view(name, schema=...)`
    pub async fn drop_view(&mut self, name: &str, schema: SchemaName) -> ViewResult<()> {
        let call = OpCall::new(DropViewOp::NAME)
            .arg(name)
            .schema_kwarg(&schema);
        self.invoke_call(&call).await
    }

    /// Parse a migration script and run every call in order.
    ///
    /// All calls are built before the first one runs, so an unknown
    /// operation or a bad argument fails without touching the database.
    /// Returns the number of operations run.
    pub async fn run_script(&mut self, script: &str) -> ViewResult<usize> {
        let ops = parse_script(script)?
            .iter()
            .map(|call| self.registry.build(call))
            .collect::<ViewResult<Vec<_>>>()?;

        for op in &ops {
            self.invoke(op).await?;
        }

        Ok(ops.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SqlRecorder;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_registry_names() {
        let registry = OperationRegistry::with_view_operations();
        assert_eq!(registry.names(), vec!["create_view", "drop_view", "replace_view"]);
        assert!(!OperationRegistry::new().contains("create_view"));
    }

    #[test]
    fn test_build_applies_defaults() {
        let registry = OperationRegistry::with_view_operations();

        let op = registry
            .build(&OpCall::new("replace_view").arg("v").arg("SELECT 1"))
            .unwrap();
        assert_eq!(op, ViewOp::Replace(ReplaceViewOp::new("v", "SELECT 1")));

        let op = registry
            .build(&OpCall::new("drop_view").arg("v").arg("aux"))
            .unwrap();
        assert_eq!(
            op,
            ViewOp::Drop(DropViewOp::new("v").with_schema(SchemaName::named("aux")))
        );
    }

    #[test]
    fn test_build_rejects_bad_calls() {
        let registry = OperationRegistry::with_view_operations();

        assert!(matches!(
            registry.build(&OpCall::new("alter_view").arg("v")),
            Err(ViewError::UnknownOperation(name)) if name == "alter_view"
        ));
        assert!(matches!(
            registry.build(&OpCall::new("create_view").arg("v")),
            Err(ViewError::InvalidArgument { .. })
        ));
        assert!(matches!(
            registry.build(&OpCall::new("replace_view").arg("v").arg("q").kwarg("drop", "yes")),
            Err(ViewError::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn test_entry_points_execute_through_registry() {
        let registry = OperationRegistry::with_view_operations();
        let mut conn = SqlRecorder::new();
        let mut ops = Operations::new(&mut conn, Dialect::Postgresql, &registry);

        ops.create_view("v1", "SELECT 1", SchemaName::named("public"))
            .await
            .unwrap();
        ops.replace_view("v1", "SELECT 2", SchemaName::named("public"), false)
            .await
            .unwrap();
        ops.replace_view("v1", "SELECT 3", SchemaName::Default, true)
            .await
            .unwrap();
        ops.drop_view("v1", SchemaName::Default).await.unwrap();

        assert_eq!(
            conn.statements,
            vec![
                "CREATE VIEW public.v1 AS SELECT 1",
                "CREATE OR REPLACE VIEW public.v1 AS SELECT 2",
                "DROP VIEW v1",
                "CREATE VIEW v1 AS SELECT 3",
                "DROP VIEW v1",
            ]
        );
    }

    #[tokio::test]
    async fn test_run_script_builds_everything_first() {
        let registry = OperationRegistry::with_view_operations();
        let mut conn = SqlRecorder::new();
        let mut ops = Operations::new(&mut conn, Dialect::Sqlite, &registry);

        let err = ops
            .run_script("op.create_view(\"a\", \"SELECT 1\")\nop.rename_view(\"a\", \"b\")")
            .await
            .unwrap_err();
        assert!(matches!(err, ViewError::UnknownOperation(_)));
        assert!(conn.statements.is_empty());
    }

    #[tokio::test]
    async fn test_run_script() {
        let registry = OperationRegistry::with_view_operations();
        let mut conn = SqlRecorder::new();
        let mut ops = Operations::new(&mut conn, Dialect::Sqlite, &registry);

        let count = ops
            .run_script(
                "-- upgrade\nop.create_view(\"a\", \"SELECT 1\")\nop.replace_view(\"a\", \"SELECT 2\")\n",
            )
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            conn.statements,
            vec![
                "CREATE VIEW a AS SELECT 1",
                "DROP VIEW a",
                "CREATE VIEW a AS SELECT 2",
            ]
        );
    }
}
