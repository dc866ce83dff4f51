//! # qail-views: migrations for SQL views
//!
//! > **Declare your views. Let the diff write the migration.**
//!
//! qail-views compares the views an application declares with the views
//! that exist in a PostgreSQL or SQLite database and produces reversible
//! `create_view`, `replace_view` and `drop_view` operations.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use qail_views::prelude::*;
//!
//! let metadata = ViewMetadata::new().view("active_users", "SELECT id FROM users WHERE active");
//!
//! let mut db = ViewDb::connect("sqlite://app.db").await?;
//! let mut ctx = AutogenContext::for_db(&mut db, &metadata);
//! let mut upgrade_ops = UpgradeOps::new();
//! compare_views(&mut ctx, &mut upgrade_ops, &[SchemaName::Default]).await?;
//!
//! let script = render_migration(&upgrade_ops.ops)?;
//! println!("{}", script.upgrade);
//! // => op.create_view("active_users", "SELECT id FROM users WHERE active")
//! ```
//!
//! ## Operations
//!
//! | Operation      | Forward                         | Reverse                   |
//! |----------------|---------------------------------|---------------------------|
//! | `create_view`  | `CREATE VIEW`                   | `drop_view`               |
//! | `replace_view` | `CREATE OR REPLACE VIEW`        | `replace_view` (old text) |
//! | `drop_view`    | `DROP VIEW`                     | `create_view` (old text)  |

pub mod compare;
pub mod config;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod normalize;
pub mod ops;
pub mod reflect;
pub mod registry;
pub mod schema;
pub mod script;

pub use compare::{AutogenContext, ParentNames, UpgradeOps, compare_views};
pub use dialect::Dialect;
pub use engine::{Connection, SqlRecorder, ViewDb};
pub use error::{ViewError, ViewResult};
pub use metadata::ViewMetadata;
pub use ops::{CreateViewOp, DropViewOp, MigrateOperation, ReplaceViewOp, ViewOp};
pub use registry::{OperationRegistry, Operations};
pub use schema::{SchemaName, ViewKey, ViewSet};

pub mod prelude {
    pub use crate::compare::{AutogenContext, ParentNames, UpgradeOps, compare_views, diff_views};
    pub use crate::config::ViewsConfig;
    pub use crate::dialect::Dialect;
    pub use crate::engine::{Connection, SqlRecorder, ViewDb};
    pub use crate::error::*;
    pub use crate::metadata::ViewMetadata;
    pub use crate::ops::*;
    pub use crate::reflect::reflect_views;
    pub use crate::registry::{OperationRegistry, Operations, register_view_operations};
    pub use crate::schema::{SchemaName, ViewKey, ViewSet};
    pub use crate::script::{MigrationScript, OpCall, parse_script, render_migration};
}
