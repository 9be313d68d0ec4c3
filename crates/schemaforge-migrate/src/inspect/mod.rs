//! Schema inspection.
//!
//! Each dialect reads its catalog through [`SchemaConnection`] and
//! reconstructs a freshly owned [`Schema`] snapshot: columns in
//! `ordinal_position` order, primary-key columns in key order, the implicit
//! primary-key index omitted, foreign-key actions mapped into the closed
//! action set, and raw catalog defaults surfaced as `default_sql`. Portable
//! types are reconstructed best-effort; on SQLite the affinity system makes
//! that reconstruction deliberately lossy.

mod mssql;
mod postgres;
mod sqlite;

use schemaforge_core::schema::Schema;

use crate::connection::SchemaConnection;
use crate::dialect::Dialect;
use crate::error::Result;

/// Reads a live database's catalog into a portable schema snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaInspector;

impl SchemaInspector {
    /// Inspects the database behind `conn`, dispatching on its dialect.
    pub async fn inspect(conn: &mut dyn SchemaConnection) -> Result<Schema> {
        match conn.dialect() {
            Dialect::Sqlite => sqlite::inspect(conn).await,
            Dialect::Postgres => postgres::inspect(conn).await,
            Dialect::SqlServer => mssql::inspect(conn).await,
        }
    }
}

/// Maps a catalog action keyword into the closed action set.
pub(crate) fn action_from_keyword(keyword: &str) -> schemaforge_core::schema::ForeignKeyAction {
    use schemaforge_core::schema::ForeignKeyAction;
    match keyword.trim().to_ascii_uppercase().as_str() {
        "CASCADE" => ForeignKeyAction::Cascade,
        "SET NULL" | "SET_NULL" => ForeignKeyAction::SetNull,
        "SET DEFAULT" | "SET_DEFAULT" => ForeignKeyAction::SetDefault,
        "RESTRICT" => ForeignKeyAction::Restrict,
        _ => ForeignKeyAction::NoAction,
    }
}
