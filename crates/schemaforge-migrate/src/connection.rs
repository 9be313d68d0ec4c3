//! Connection abstraction.
//!
//! Inspectors and the runner are written once against [`SchemaConnection`];
//! the sqlx-backed SQLite and PostgreSQL implementations live here, and a
//! tiberius-backed SQL Server implementation is available behind the `mssql`
//! feature (see [`crate::tds`]). Catalog rows come back as loosely typed
//! [`SqlValue`]s because catalog queries mix drivers and column types.
//!
//! The engine borrows a connection for the duration of a call; it never
//! opens, closes, or shares one.

use async_trait::async_trait;
use sqlx::{Column as _, Connection as _, Row as _, TypeInfo as _};

use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};

/// A loosely typed scalar read from a catalog query.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer of any width.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Character data.
    Text(String),
    /// Binary data.
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Returns true for SQL NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text content, if this is a text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content; text digits are parsed, booleans map to 0/1.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean content; integers and catalog yes/no strings are accepted.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(v) => Some(*v != 0),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "yes" | "true" | "1" => Some(true),
                "no" | "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

/// One row of a catalog query, keyed by column name.
#[derive(Debug, Clone, Default)]
pub struct SqlRow {
    columns: Vec<(String, SqlValue)>,
}

impl SqlRow {
    /// Builds a row from name/value pairs.
    #[must_use]
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// Looks a value up by column name, case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Text value of a column.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(SqlValue::as_str)
    }

    /// Integer value of a column.
    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(SqlValue::as_i64)
    }

    /// Boolean value of a column.
    #[must_use]
    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(SqlValue::as_bool)
    }
}

/// A borrowed database connection the engine can drive.
///
/// `begin`/`commit`/`rollback` manage a single transaction; the runner
/// guarantees it releases any transaction it opened exactly once, on every
/// exit path.
#[async_trait]
pub trait SchemaConnection: Send {
    /// The dialect this connection speaks.
    fn dialect(&self) -> Dialect;

    /// Executes a statement, returning the affected row count.
    async fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Runs a query and collects all rows.
    async fn query(&mut self, sql: &str) -> Result<Vec<SqlRow>>;

    /// Begins a transaction.
    async fn begin(&mut self) -> Result<()>;

    /// Commits the open transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Rolls back the open transaction.
    async fn rollback(&mut self) -> Result<()>;
}

/// SQLite connection backed by sqlx.
pub struct SqliteConnection {
    conn: sqlx::SqliteConnection,
}

impl SqliteConnection {
    /// Wraps an existing sqlx connection.
    #[must_use]
    pub fn new(conn: sqlx::SqliteConnection) -> Self {
        Self { conn }
    }

    /// Opens a connection from a URL such as `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self> {
        let conn = sqlx::SqliteConnection::connect(url).await?;
        Ok(Self::new(conn))
    }

    /// Returns the wrapped sqlx connection.
    #[must_use]
    pub fn into_inner(self) -> sqlx::SqliteConnection {
        self.conn
    }

    fn decode_row(row: &sqlx::sqlite::SqliteRow) -> SqlRow {
        let mut columns = Vec::with_capacity(row.columns().len());
        for (i, column) in row.columns().iter().enumerate() {
            // PRAGMA rows mix storage classes; decode by what actually
            // fits rather than the declared type.
            let value = if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
                v.map_or(SqlValue::Null, SqlValue::Int)
            } else if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
                v.map_or(SqlValue::Null, SqlValue::Float)
            } else if let Ok(v) = row.try_get::<Option<String>, _>(i) {
                v.map_or(SqlValue::Null, SqlValue::Text)
            } else if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(i) {
                v.map_or(SqlValue::Null, SqlValue::Bytes)
            } else {
                SqlValue::Null
            };
            columns.push((column.name().to_string(), value));
        }
        SqlRow::new(columns)
    }
}

#[async_trait]
impl SchemaConnection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let done = sqlx::query(sql).execute(&mut self.conn).await?;
        Ok(done.rows_affected())
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<SqlRow>> {
        let rows = sqlx::query(sql).fetch_all(&mut self.conn).await?;
        Ok(rows.iter().map(Self::decode_row).collect())
    }

    async fn begin(&mut self) -> Result<()> {
        self.execute("BEGIN").await.map(drop)
    }

    async fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT").await.map(drop)
    }

    async fn rollback(&mut self) -> Result<()> {
        self.execute("ROLLBACK").await.map(drop)
    }
}

/// PostgreSQL connection backed by sqlx.
pub struct PostgresConnection {
    conn: sqlx::PgConnection,
}

impl PostgresConnection {
    /// Wraps an existing sqlx connection.
    #[must_use]
    pub fn new(conn: sqlx::PgConnection) -> Self {
        Self { conn }
    }

    /// Opens a connection from a `postgres://` URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let conn = sqlx::PgConnection::connect(url).await?;
        Ok(Self::new(conn))
    }

    /// Returns the wrapped sqlx connection.
    #[must_use]
    pub fn into_inner(self) -> sqlx::PgConnection {
        self.conn
    }

    fn decode_row(row: &sqlx::postgres::PgRow) -> Result<SqlRow> {
        let mut columns = Vec::with_capacity(row.columns().len());
        for (i, column) in row.columns().iter().enumerate() {
            let type_name = column.type_info().name().to_ascii_uppercase();
            let value = match type_name.as_str() {
                "INT2" => row
                    .try_get::<Option<i16>, _>(i)?
                    .map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))),
                "INT4" => row
                    .try_get::<Option<i32>, _>(i)?
                    .map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))),
                "INT8" => row
                    .try_get::<Option<i64>, _>(i)?
                    .map_or(SqlValue::Null, SqlValue::Int),
                "FLOAT4" => row
                    .try_get::<Option<f32>, _>(i)?
                    .map_or(SqlValue::Null, |v| SqlValue::Float(f64::from(v))),
                "FLOAT8" => row
                    .try_get::<Option<f64>, _>(i)?
                    .map_or(SqlValue::Null, SqlValue::Float),
                "BOOL" => row
                    .try_get::<Option<bool>, _>(i)?
                    .map_or(SqlValue::Null, SqlValue::Bool),
                "BYTEA" => row
                    .try_get::<Option<Vec<u8>>, _>(i)?
                    .map_or(SqlValue::Null, SqlValue::Bytes),
                _ => row
                    .try_get::<Option<String>, _>(i)
                    .map(|v| v.map_or(SqlValue::Null, SqlValue::Text))
                    .unwrap_or(SqlValue::Null),
            };
            columns.push((column.name().to_string(), value));
        }
        Ok(SqlRow::new(columns))
    }
}

#[async_trait]
impl SchemaConnection for PostgresConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let done = sqlx::query(sql).execute(&mut self.conn).await?;
        Ok(done.rows_affected())
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<SqlRow>> {
        let rows = sqlx::query(sql).fetch_all(&mut self.conn).await?;
        rows.iter().map(Self::decode_row).collect()
    }

    async fn begin(&mut self) -> Result<()> {
        self.execute("BEGIN").await.map(drop)
    }

    async fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT").await.map(drop)
    }

    async fn rollback(&mut self) -> Result<()> {
        self.execute("ROLLBACK").await.map(drop)
    }
}

/// Maps a driver error into the inspector failure kind.
pub(crate) fn catalog_error(dialect: Dialect, err: &MigrateError) -> MigrateError {
    MigrateError::CatalogQueryFailed {
        dialect,
        detail: err.to_string(),
    }
}
