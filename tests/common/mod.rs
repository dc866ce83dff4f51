//! Shared helpers for integration tests.

use qail_views::engine::{Bind, CatalogRow};
use qail_views::{Connection, ViewResult};

/// A fake database that answers catalog queries from canned rows.
#[derive(Debug, Default)]
pub struct FakeCatalog {
    /// `sqlite_master` rows: `(name, sql)`
    pub sqlite_views: Vec<(String, String)>,
    /// `pg_views` rows: `(schemaname, viewname, definition)`
    pub pg_views: Vec<(String, String, String)>,
    pub queries: Vec<String>,
    pub executed: Vec<String>,
}

impl FakeCatalog {
    pub fn sqlite(views: &[(&str, &str)]) -> Self {
        Self {
            sqlite_views: views
                .iter()
                .map(|(n, d)| (n.to_string(), d.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn postgresql(views: &[(&str, &str, &str)]) -> Self {
        Self {
            pg_views: views
                .iter()
                .map(|(s, n, d)| (s.to_string(), n.to_string(), d.to_string()))
                .collect(),
            ..Self::default()
        }
    }
}

impl Connection for FakeCatalog {
    async fn fetch_all(&mut self, sql: &str, binds: &[Bind]) -> ViewResult<Vec<CatalogRow>> {
        self.queries.push(sql.to_string());

        if sql.contains("pg_views") {
            let wanted = match binds.first() {
                Some(Bind::TextList(schemas)) => schemas.clone(),
                _ => Vec::new(),
            };
            return Ok(self
                .pg_views
                .iter()
                .filter(|(schema, _, _)| wanted.contains(schema))
                .map(|(s, n, d)| vec![s.clone(), n.clone(), d.clone()])
                .collect());
        }

        if sql.contains("FROM sqlite_master") {
            return Ok(self
                .sqlite_views
                .iter()
                .map(|(n, d)| vec![n.clone(), d.clone()])
                .collect());
        }

        Ok(Vec::new())
    }

    async fn execute(&mut self, sql: &str) -> ViewResult<u64> {
        self.executed.push(sql.to_string());
        Ok(0)
    }
}
