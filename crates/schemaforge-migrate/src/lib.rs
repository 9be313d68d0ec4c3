//! # schemaforge-migrate
//!
//! Declarative schema migrations: declare the desired schema once, inspect
//! the live database, diff, and apply ordered DDL, for SQLite, PostgreSQL,
//! and SQL Server from the same portable model.
//!
//! # Architecture
//!
//! - **Operations** - the closed set of schema changes a plan can contain
//! - **Diff** - compares `(current, desired)` snapshots into an ordered,
//!   additive-by-default operation list
//! - **Dialect** - per-database SQL generation, including portable type and
//!   default-expression lowering
//! - **Inspect** - reads a live catalog back into a portable schema
//! - **Runner** - policy enforcement, transactions, execution, cancellation
//! - **State** - replays a plan onto an in-memory schema for previews
//!
//! # Example
//!
//! ```rust,ignore
//! use schemaforge_core::prelude::*;
//! use schemaforge_migrate::prelude::*;
//!
//! let desired = Schema::new("app").table(
//!     Table::new("users")
//!         .column(Column::new("id", PortableType::BigInt).identity())
//!         .column(Column::new("email", PortableType::VarChar { max_length: 255 }).not_null())
//!         .primary_key(PrimaryKey::new(vec!["id".into()])),
//! );
//!
//! let mut conn = SqliteConnection::connect("sqlite:app.db").await?;
//! let current = SchemaInspector::inspect(&mut conn).await?;
//! let plan = SchemaDiff::calculate(&current, &desired, DiffOptions::new())?;
//! let summary = MigrationRunner::apply(
//!     &mut conn,
//!     &plan,
//!     Dialect::Sqlite.generator(),
//!     &RunnerOptions::default(),
//!     None,
//! )
//! .await?;
//! println!("applied {} operation(s)", summary.applied);
//! ```
//!
//! Destructive changes (drops, alterations) are refused unless the caller
//! opts in through both [`diff::DiffOptions`] and
//! [`runner::RunnerOptions`]; the engine persists nothing of its own and
//! borrows the connection only for the duration of a call.

pub mod connection;
pub mod defaults;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod inspect;
pub mod operations;
pub mod runner;
pub mod state;
#[cfg(feature = "mssql")]
pub mod tds;

#[cfg(test)]
pub(crate) mod testing;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::connection::{PostgresConnection, SchemaConnection, SqlRow, SqlValue, SqliteConnection};
    pub use crate::defaults::translate_default;
    pub use crate::dialect::{
        Dialect, PostgresDialect, SqlDialect, SqlServerDialect, SqliteDialect,
    };
    pub use crate::diff::{DiffOptions, SchemaDiff};
    pub use crate::error::{MigrateError, Result};
    pub use crate::inspect::SchemaInspector;
    pub use crate::operations::{ColumnChanges, MigrationOperation};
    pub use crate::runner::{MigrationRunner, MigrationSummary, RunnerOptions};
    pub use crate::state::SchemaState;
    #[cfg(feature = "mssql")]
    pub use crate::tds::MssqlConnection;
}
