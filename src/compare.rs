//! View comparison for autogeneration.
//!
//! [`compare_views`] runs once per autogeneration pass: it reflects the
//! views in the database, compares them with the declared ones and appends
//! one operation per difference to the pass's [`UpgradeOps`].
//!
//! | declared | reflected | definitions | operation |
//! |----------|-----------|-------------|-----------|
//! | yes      | no        |             | `create_view` |
//! | no       | yes       |             | `drop_view` (remembers the old definition) |
//! | yes      | yes       | differ      | `replace_view` (remembers the old definition) |
//! | yes      | yes       | equal       | nothing |

use tracing::{debug, info};

use crate::dialect::Dialect;
use crate::engine::{Connection, ViewDb};
use crate::error::ViewResult;
use crate::metadata::ViewMetadata;
use crate::ops::{CreateViewOp, DropViewOp, ReplaceViewOp, ViewOp};
use crate::reflect::reflect_views;
use crate::schema::{SchemaName, ViewKey, ViewSet};

/// Object type passed to name filters for views.
pub const VIEW_OBJECT_TYPE: &str = "view";

/// Names of the objects enclosing the one being filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentNames {
    pub schema_name: SchemaName,
}

/// Decides whether `(name, object_type, parents)` takes part in the diff.
pub type NameFilter<'a> = Box<dyn Fn(&str, &str, &ParentNames) -> bool + 'a>;

/// Everything one autogeneration pass needs.
pub struct AutogenContext<'a, C> {
    pub connection: &'a mut C,
    /// Dialect name as the connection reports it (`postgresql`, `sqlite`, ...).
    pub dialect_name: String,
    /// The connection's default schema, e.g. `public` or `main`.
    pub default_schema_name: String,
    pub metadata: &'a ViewMetadata,
    name_filters: Vec<NameFilter<'a>>,
}

impl<'a, C: Connection> AutogenContext<'a, C> {
    pub fn new(
        connection: &'a mut C,
        dialect_name: impl Into<String>,
        default_schema_name: impl Into<String>,
        metadata: &'a ViewMetadata,
    ) -> Self {
        Self {
            connection,
            dialect_name: dialect_name.into(),
            default_schema_name: default_schema_name.into(),
            metadata,
            name_filters: Vec::new(),
        }
    }

    /// Add a name filter. Every filter must accept an object for it to be diffed.
    pub fn with_name_filter(
        mut self,
        filter: impl Fn(&str, &str, &ParentNames) -> bool + 'a,
    ) -> Self {
        self.name_filters.push(Box::new(filter));
        self
    }

    pub fn run_name_filters(&self, name: &str, object_type: &str, parents: &ParentNames) -> bool {
        self.name_filters
            .iter()
            .all(|filter| filter(name, object_type, parents))
    }

    fn include_view(&self, key: &ViewKey) -> bool {
        let parents = ParentNames {
            schema_name: key.schema.clone(),
        };
        self.run_name_filters(&key.name, VIEW_OBJECT_TYPE, &parents)
    }
}

impl<'a> AutogenContext<'a, ViewDb> {
    /// Context for a sqlx connection, taking dialect and default schema from it.
    pub fn for_db(db: &'a mut ViewDb, metadata: &'a ViewMetadata) -> Self {
        let dialect_name = db.dialect().name();
        let default_schema_name = db.default_schema_name().to_string();
        Self::new(db, dialect_name, default_schema_name, metadata)
    }
}

/// Operations produced by an autogeneration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeOps {
    pub ops: Vec<ViewOp>,
}

impl UpgradeOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ViewOp> {
        self.ops.iter()
    }
}

/// Partition of view keys between declared and reflected state.
///
/// Every key of either side appears in exactly one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewDiff {
    /// Declared only.
    pub added: Vec<ViewKey>,
    /// Reflected only.
    pub removed: Vec<ViewKey>,
    /// On both sides, definitions differ.
    pub changed: Vec<ViewKey>,
    /// On both sides, definitions equal.
    pub unchanged: Vec<ViewKey>,
}

/// Partition keys of two view sets.
pub fn diff_views(declared: &ViewSet, reflected: &ViewSet) -> ViewDiff {
    let mut diff = ViewDiff::default();

    for (key, definition) in declared {
        match reflected.get(key) {
            None => diff.added.push(key.clone()),
            Some(existing) if existing == definition => diff.unchanged.push(key.clone()),
            Some(_) => diff.changed.push(key.clone()),
        }
    }

    diff.removed = reflected
        .keys()
        .filter(|key| !declared.contains_key(*key))
        .cloned()
        .collect();

    diff
}

/// Compare declared and reflected views and append the operations needed.
///
/// Fails with [`ViewError::UnsupportedDialect`](crate::ViewError::UnsupportedDialect)
/// before touching the database if the dialect has no view support. On any
/// error nothing is appended.
pub async fn compare_views<C: Connection>(
    ctx: &mut AutogenContext<'_, C>,
    upgrade_ops: &mut UpgradeOps,
    schemas: &[SchemaName],
) -> ViewResult<()> {
    let dialect: Dialect = ctx.dialect_name.parse()?;

    let declared = ctx.metadata.compiled();
    let reflected = reflect_views(
        &mut *ctx.connection,
        dialect,
        &ctx.default_schema_name,
        schemas,
    )
    .await?;

    let diff = diff_views(&declared, &reflected);
    let mut ops = Vec::new();

    for key in diff.added.iter().filter(|key| ctx.include_view(key)) {
        info!("Detected added view '{}'", key);
        ops.push(
            CreateViewOp::new(&key.name, &declared[key])
                .with_schema(key.schema.clone())
                .into(),
        );
    }

    for key in diff.removed.iter().filter(|key| ctx.include_view(key)) {
        info!("Detected removed view '{}'", key);
        ops.push(
            DropViewOp::new(&key.name)
                .with_schema(key.schema.clone())
                .with_old_definition(&reflected[key])
                .into(),
        );
    }

    for key in diff.changed.iter().filter(|key| ctx.include_view(key)) {
        info!("Detected changed view '{}'", key);
        debug!("Declared definition: |{}|", declared[key]);
        debug!("Database definition: |{}|", reflected[key]);
        ops.push(
            ReplaceViewOp::new(&key.name, &declared[key])
                .with_schema(key.schema.clone())
                .with_old_definition(&reflected[key])
                .into(),
        );
    }

    upgrade_ops.ops.extend(ops);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockConnection;
    use crate::error::ViewError;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    fn set(entries: &[(SchemaName, &str, &str)]) -> ViewSet {
        entries
            .iter()
            .map(|(schema, name, def)| (ViewKey::new(schema.clone(), *name), def.to_string()))
            .collect()
    }

    #[test]
    fn test_diff_partition_is_complete() {
        let declared = set(&[
            (SchemaName::Default, "same", "SELECT 1"),
            (SchemaName::Default, "changed", "SELECT 2"),
            (SchemaName::named("s"), "new", "SELECT 3"),
        ]);
        let reflected = set(&[
            (SchemaName::Default, "same", "SELECT 1"),
            (SchemaName::Default, "changed", "SELECT 20"),
            (SchemaName::Default, "old", "SELECT 4"),
        ]);

        let diff = diff_views(&declared, &reflected);
        assert_eq!(diff.added, vec![ViewKey::new(SchemaName::named("s"), "new")]);
        assert_eq!(diff.removed, vec![ViewKey::unqualified("old")]);
        assert_eq!(diff.changed, vec![ViewKey::unqualified("changed")]);
        assert_eq!(diff.unchanged, vec![ViewKey::unqualified("same")]);

        let mut all: Vec<_> = diff
            .added
            .iter()
            .chain(&diff.removed)
            .chain(&diff.changed)
            .chain(&diff.unchanged)
            .cloned()
            .collect();
        all.sort();
        let mut expected: Vec<_> = declared.keys().chain(reflected.keys()).cloned().collect();
        expected.sort();
        expected.dedup();
        assert_eq!(all, expected);
    }

    #[tokio::test]
    async fn test_added_view() {
        let metadata = ViewMetadata::new().view_in(SchemaName::named("public"), "v1", "SELECT 1");
        let mut conn = MockConnection::default();
        let mut ctx = AutogenContext::new(&mut conn, "postgresql", "postgres", &metadata);

        let mut upgrade_ops = UpgradeOps::new();
        compare_views(&mut ctx, &mut upgrade_ops, &[SchemaName::named("public")])
            .await
            .unwrap();

        assert_eq!(
            upgrade_ops.ops,
            vec![ViewOp::Create(
                CreateViewOp::new("v1", "SELECT 1").with_schema(SchemaName::named("public"))
            )]
        );
    }

    #[tokio::test]
    async fn test_removed_view_remembers_definition() {
        let metadata = ViewMetadata::new();
        let mut conn = MockConnection::default()
            .with_rows("sqlite_master", vec![vec!["v2", "CREATE VIEW v2 AS SELECT 2"]]);
        let mut ctx = AutogenContext::new(&mut conn, "sqlite", "main", &metadata);

        let mut upgrade_ops = UpgradeOps::new();
        compare_views(&mut ctx, &mut upgrade_ops, &[SchemaName::Default])
            .await
            .unwrap();

        let expected = DropViewOp::new("v2").with_old_definition("SELECT 2");
        assert_eq!(upgrade_ops.ops, vec![ViewOp::Drop(expected)]);
        assert_eq!(
            upgrade_ops.ops[0].reverse().unwrap(),
            ViewOp::Create(CreateViewOp::new("v2", "SELECT 2"))
        );
    }

    #[tokio::test]
    async fn test_changed_view() {
        let metadata = ViewMetadata::new().view("v3", "SELECT 3");
        let mut conn = MockConnection::default()
            .with_rows("pg_views", vec![vec!["public", "v3", " SELECT 4;"]]);
        let mut ctx = AutogenContext::new(&mut conn, "postgresql", "public", &metadata);

        let mut upgrade_ops = UpgradeOps::new();
        compare_views(&mut ctx, &mut upgrade_ops, &[SchemaName::Default])
            .await
            .unwrap();

        assert_eq!(
            upgrade_ops.ops,
            vec![ViewOp::Replace(
                ReplaceViewOp::new("v3", "SELECT 3").with_old_definition("SELECT 4")
            )]
        );
    }

    #[tokio::test]
    async fn test_name_filter_suppresses_views() {
        let metadata = ViewMetadata::new()
            .view("keep_me", "SELECT 1")
            .view("tmp_scratch", "SELECT 2");
        let mut conn = MockConnection::default();
        let seen = RefCell::new(Vec::new());

        let mut ctx = AutogenContext::new(&mut conn, "sqlite", "main", &metadata).with_name_filter(
            |name, object_type, parents| {
                seen.borrow_mut()
                    .push((name.to_string(), object_type.to_string(), parents.clone()));
                !name.starts_with("tmp_")
            },
        );

        let mut upgrade_ops = UpgradeOps::new();
        compare_views(&mut ctx, &mut upgrade_ops, &[SchemaName::Default])
            .await
            .unwrap();
        drop(ctx);

        assert_eq!(upgrade_ops.len(), 1);
        assert_eq!(upgrade_ops.ops[0].name(), "keep_me");

        let seen = seen.into_inner();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].1, "view");
        assert_eq!(seen[0].2, ParentNames { schema_name: SchemaName::Default });
    }

    #[tokio::test]
    async fn test_unsupported_dialect_fails_before_querying() {
        let metadata = ViewMetadata::new().view("v1", "SELECT 1");
        let mut conn = MockConnection::default();
        let mut ctx = AutogenContext::new(&mut conn, "mysql", "app", &metadata);

        let mut upgrade_ops = UpgradeOps::new();
        let err = compare_views(&mut ctx, &mut upgrade_ops, &[SchemaName::Default])
            .await
            .unwrap_err();
        drop(ctx);

        assert!(matches!(err, ViewError::UnsupportedDialect(name) if name == "mysql"));
        assert!(upgrade_ops.is_empty());
        assert!(conn.queries.is_empty());
    }
}
