//! Declared views: what the application says should exist.

use std::collections::BTreeMap;

use crate::normalize::collapse_newlines;
use crate::schema::{SchemaName, ViewKey, ViewSet};

/// Declared views, keyed by identity, holding compiled query text.
///
/// # Example
///
/// ```
/// use qail_views::{SchemaName, ViewMetadata};
///
/// let metadata = ViewMetadata::new()
///     .view("active_users", "SELECT id FROM users WHERE active")
///     .view_in(SchemaName::named("reporting"), "totals", "SELECT count(*) FROM orders");
/// assert_eq!(metadata.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewMetadata {
    views: BTreeMap<ViewKey, String>,
}

impl ViewMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a view in the default schema.
    pub fn view(self, name: impl Into<String>, query: impl Into<String>) -> Self {
        self.view_in(SchemaName::Default, name, query)
    }

    /// Declare a view in `schema`.
    pub fn view_in(
        mut self,
        schema: SchemaName,
        name: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        self.insert(ViewKey::new(schema, name), query);
        self
    }

    /// Declare a view, replacing an earlier declaration with the same key.
    pub fn insert(&mut self, key: ViewKey, query: impl Into<String>) {
        self.views.insert(key, query.into());
    }

    pub fn get(&self, key: &ViewKey) -> Option<&str> {
        self.views.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ViewKey, &str)> {
        self.views.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Schemas that hold at least one declared view.
    pub fn schemas(&self) -> Vec<SchemaName> {
        let mut schemas: Vec<SchemaName> = self.views.keys().map(|k| k.schema.clone()).collect();
        schemas.dedup();
        schemas
    }

    /// Declared queries in comparable form (newlines collapsed).
    pub fn compiled(&self) -> ViewSet {
        self.views
            .iter()
            .map(|(key, query)| (key.clone(), collapse_newlines(query)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiled_collapses_newlines() {
        let metadata = ViewMetadata::new().view("v1", "SELECT a\nFROM t\nWHERE b");
        assert_eq!(
            metadata.compiled().get(&ViewKey::unqualified("v1")).map(String::as_str),
            Some("SELECT aFROM tWHERE b")
        );
    }

    #[test]
    fn test_redeclaring_replaces() {
        let metadata = ViewMetadata::new().view("v1", "SELECT 1").view("v1", "SELECT 2");
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata.get(&ViewKey::unqualified("v1")), Some("SELECT 2"));
    }

    #[test]
    fn test_schemas() {
        let metadata = ViewMetadata::new()
            .view("a", "SELECT 1")
            .view("b", "SELECT 1")
            .view_in(SchemaName::named("reporting"), "c", "SELECT 1");
        assert_eq!(
            metadata.schemas(),
            vec![SchemaName::Default, SchemaName::named("reporting")]
        );
    }
}
