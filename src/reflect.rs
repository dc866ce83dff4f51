//! View reflection: read the views that currently exist in the database.

use crate::dialect::Dialect;
use crate::engine::{Bind, Connection};
use crate::error::ViewResult;
use crate::normalize::{normalize_postgresql, normalize_sqlite};
use crate::schema::{SchemaName, ViewKey, ViewSet};

/// Reflect all views in `schemas`, keyed by identity, definitions normalized.
///
/// `default_schema` is the name the connection reports for its default
/// schema. It is only used at the catalog boundary; keys for views in that
/// schema always carry [`SchemaName::Default`], and requesting it by name is
/// the same as requesting `Default`.
pub async fn reflect_views<C: Connection>(
    conn: &mut C,
    dialect: Dialect,
    default_schema: &str,
    schemas: &[SchemaName],
) -> ViewResult<ViewSet> {
    let schemas = resolve_schemas(default_schema, schemas);
    let views = match dialect {
        Dialect::Sqlite => reflect_sqlite(conn, default_schema, &schemas).await?,
        Dialect::Postgresql => reflect_postgresql(conn, default_schema, &schemas).await?,
    };

    tracing::debug!(
        "Reflected {} view(s) from {} schema(s)",
        views.len(),
        schemas.len()
    );

    Ok(views)
}

/// Requested schemas with the default schema spelled `Default`, duplicates removed.
fn resolve_schemas(default_schema: &str, schemas: &[SchemaName]) -> Vec<SchemaName> {
    let mut resolved = Vec::with_capacity(schemas.len());
    for schema in schemas {
        let schema = SchemaName::from_catalog(schema.to_catalog(default_schema), default_schema);
        if !resolved.contains(&schema) {
            resolved.push(schema);
        }
    }
    resolved
}

/// One `sqlite_master` query per schema.
pub async fn reflect_sqlite<C: Connection>(
    conn: &mut C,
    default_schema: &str,
    schemas: &[SchemaName],
) -> ViewResult<ViewSet> {
    let mut views = ViewSet::new();

    for schema in schemas {
        let catalog_schema = schema.to_catalog(default_schema);
        let prefix = match schema {
            SchemaName::Default => String::new(),
            SchemaName::Named(name) => format!("{}.", Dialect::Sqlite.quote_identifier(name)),
        };
        let sql = format!("SELECT name, sql FROM {}sqlite_master WHERE type='view'", prefix);

        for row in conn.fetch_all(&sql, &[]).await? {
            if let [name, definition, ..] = row.as_slice() {
                views.insert(
                    ViewKey::new(
                        SchemaName::from_catalog(catalog_schema, default_schema),
                        name.as_str(),
                    ),
                    normalize_sqlite(definition),
                );
            }
        }
    }

    Ok(views)
}

/// One `pg_views` query across all requested schemas.
pub async fn reflect_postgresql<C: Connection>(
    conn: &mut C,
    default_schema: &str,
    schemas: &[SchemaName],
) -> ViewResult<ViewSet> {
    let catalog_schemas: Vec<String> = schemas
        .iter()
        .map(|schema| schema.to_catalog(default_schema).to_string())
        .collect();

    let rows = conn
        .fetch_all(
            "SELECT schemaname, viewname, definition FROM pg_views WHERE schemaname = ANY($1)",
            &[Bind::TextList(catalog_schemas)],
        )
        .await?;

    let mut views = ViewSet::new();
    for row in rows {
        if let [schema, name, definition, ..] = row.as_slice() {
            views.insert(
                ViewKey::new(SchemaName::from_catalog(schema, default_schema), name.as_str()),
                normalize_postgresql(definition),
            );
        }
    }

    Ok(views)
}
