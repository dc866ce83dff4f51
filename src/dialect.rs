//! Supported SQL dialects.
//!
//! View reflection only exists for SQLite-family and PostgreSQL-family
//! databases. Everything dialect-specific (catalog layout, default schema,
//! quoting, whether `CREATE OR REPLACE VIEW` exists) hangs off [`Dialect`].

use crate::error::ViewError;
use crate::schema::SchemaName;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Words that must be quoted when used as identifiers.
const RESERVED_WORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "between", "both", "by",
    "case", "cast", "check", "collate", "column", "constraint", "create", "cross", "current_date",
    "current_time", "current_timestamp", "current_user", "default", "delete", "desc", "distinct",
    "do", "drop", "else", "end", "except", "exists", "false", "fetch", "for", "foreign", "from",
    "full", "grant", "group", "having", "in", "index", "inner", "insert", "intersect", "into",
    "is", "join", "leading", "left", "like", "limit", "natural", "not", "null", "offset", "on",
    "only", "or", "order", "outer", "primary", "references", "replace", "returning", "right",
    "select", "session_user", "set", "some", "table", "then", "to", "trailing", "true", "union",
    "unique", "update", "user", "using", "values", "view", "when", "where", "with",
];

/// A database dialect with view support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Sqlite,
    Postgresql,
}

impl Dialect {
    /// Dialect for a connection URL (`postgres://`, `postgresql://`, `sqlite:`).
    pub fn from_url(url: &str) -> Result<Self, ViewError> {
        let scheme = url.split(':').next().unwrap_or_default();
        scheme.parse()
    }

    /// Canonical dialect name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgresql => "postgresql",
        }
    }

    /// Name the dialect uses for its default schema when none is reported.
    pub const fn default_schema_name(&self) -> &'static str {
        match self {
            Self::Sqlite => "main",
            Self::Postgresql => "public",
        }
    }

    /// Whether `CREATE OR REPLACE VIEW` is available.
    ///
    /// SQLite has no atomic replace; a changed view is dropped and recreated.
    pub const fn supports_replace(&self) -> bool {
        matches!(self, Self::Postgresql)
    }

    /// Quote an identifier if it would not survive unquoted.
    ///
    /// Lowercase, non-reserved identifiers are left alone so that generated
    /// DDL reads the way a person would write it.
    pub fn quote_identifier<'a>(&self, ident: &'a str) -> Cow<'a, str> {
        if requires_quotes(ident) {
            // Both dialects use ANSI double quotes
            Cow::Owned(format!("\"{}\"", ident.replace('"', "\"\"")))
        } else {
            Cow::Borrowed(ident)
        }
    }

    /// Quoted, schema-qualified view name.
    pub fn qualified_name(&self, schema: &SchemaName, name: &str) -> String {
        match schema {
            SchemaName::Default => self.quote_identifier(name).into_owned(),
            SchemaName::Named(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(name)
            ),
        }
    }
}

fn requires_quotes(ident: &str) -> bool {
    let mut chars = ident.chars();
    let legal_start = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_');
    let legal_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$');

    !legal_start || !legal_rest || RESERVED_WORDS.contains(&ident)
}

impl FromStr for Dialect {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "postgresql" | "postgres" | "pg" => Ok(Self::Postgresql),
            _ => Err(ViewError::UnsupportedDialect(s.to_string())),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
