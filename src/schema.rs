//! View identity: schema names and view keys.
//!
//! A view in the database's default schema is always [`SchemaName::Default`],
//! whether the database reports that schema by name or not. The only place a
//! literal default-schema name (`public`, `main`, ...) appears is the catalog
//! boundary, see [`SchemaName::from_catalog`] and [`SchemaName::to_catalog`].

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// The schema a view lives in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaName {
    /// The connection's default schema.
    #[default]
    Default,
    /// An explicitly named schema.
    Named(String),
}

impl SchemaName {
    /// Named schema.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Map a schema name reported by the database catalog.
    ///
    /// A name equal to the connection's default schema becomes `Default`.
    pub fn from_catalog(reported: &str, default_schema: &str) -> Self {
        if reported == default_schema {
            Self::Default
        } else {
            Self::Named(reported.to_string())
        }
    }

    /// Name to hand to the database catalog.
    pub fn to_catalog<'a>(&'a self, default_schema: &'a str) -> &'a str {
        match self {
            Self::Default => default_schema,
            Self::Named(name) => name,
        }
    }
}

impl From<Option<&str>> for SchemaName {
    fn from(schema: Option<&str>) -> Self {
        schema.map(SchemaName::named).unwrap_or_default()
    }
}

impl From<Option<String>> for SchemaName {
    fn from(schema: Option<String>) -> Self {
        schema.map(SchemaName::Named).unwrap_or_default()
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "(default)"),
            Self::Named(name) => write!(f, "{}", name),
        }
    }
}

impl Serialize for SchemaName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Default => serializer.serialize_none(),
            Self::Named(name) => serializer.serialize_str(name),
        }
    }
}

/// Identity of a view: `(schema, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ViewKey {
    pub schema: SchemaName,
    pub name: String,
}

impl ViewKey {
    pub fn new(schema: SchemaName, name: impl Into<String>) -> Self {
        Self {
            schema,
            name: name.into(),
        }
    }

    /// A view in the default schema.
    pub fn unqualified(name: impl Into<String>) -> Self {
        Self::new(SchemaName::Default, name)
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            SchemaName::Default => write!(f, "{}", self.name),
            SchemaName::Named(schema) => write!(f, "{}.{}", schema, self.name),
        }
    }
}

/// Views keyed by identity, mapped to their (normalized) definitions.
pub type ViewSet = BTreeMap<ViewKey, String>;
