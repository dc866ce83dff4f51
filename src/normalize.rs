//! View definition normalization.
//!
//! Databases hand back view bodies in their own layout: SQLite keeps the full
//! `CREATE VIEW` statement, PostgreSQL pretty-prints the query and adds type
//! casts. Normalizing both the reflected and the declared side to the same
//! single-line form keeps the comparator from reporting formatting noise as
//! a changed view.
//!
//! Normalization never fails. Text without the expected prefix or suffix is
//! passed through untouched.

use regex::Regex;
use std::sync::LazyLock;

use crate::dialect::Dialect;

static SQLITE_CREATE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^CREATE VIEW \S+ AS ").expect("valid regex"));

static PG_NEWLINE_INDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n *").expect("valid regex"));

// Also matches `::word` inside string literals; accepted false-normalization risk.
static PG_TYPE_CAST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"::[a-z]+").expect("valid regex"));

/// Normalize a raw catalog definition for the given dialect.
pub fn normalize(dialect: Dialect, definition: &str) -> String {
    match dialect {
        Dialect::Sqlite => normalize_sqlite(definition),
        Dialect::Postgresql => normalize_postgresql(definition),
    }
}

/// Normalize the `sql` column of `sqlite_master`.
///
/// Strips `CREATE VIEW <name> AS ` and deletes newlines.
pub fn normalize_sqlite(definition: &str) -> String {
    SQLITE_CREATE_PREFIX
        .replace(definition, "")
        .replace('\n', "")
}

/// Normalize the `definition` column of `pg_views`.
///
/// Trims, drops one trailing semicolon, deletes every newline together with
/// the indentation after it, and strips `::type` casts.
pub fn normalize_postgresql(definition: &str) -> String {
    let definition = definition.trim();
    let definition = definition.strip_suffix(';').unwrap_or(definition);
    let definition = PG_NEWLINE_INDENT.replace_all(definition, "");
    PG_TYPE_CAST.replace_all(&definition, "").into_owned()
}

/// Collapse a compiled declared query to the comparable form.
///
/// Newlines are deleted, not replaced, matching what the reflected side goes
/// through.
pub fn collapse_newlines(query: &str) -> String {
    query.replace('\n', "")
}
