//! SQL Server connection backed by tiberius.
//!
//! Available behind the `mssql` cargo feature. The TDS client runs over a
//! tokio `TcpStream` through the tokio-util compatibility layer.

use async_trait::async_trait;
use futures::TryStreamExt;
use tiberius::{Client, ColumnData, Config, QueryItem};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::connection::{SchemaConnection, SqlRow, SqlValue};
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};

type TdsClient = Client<Compat<TcpStream>>;

/// SQL Server connection.
pub struct MssqlConnection {
    client: TdsClient,
}

impl MssqlConnection {
    /// Wraps an existing tiberius client.
    #[must_use]
    pub fn new(client: TdsClient) -> Self {
        Self { client }
    }

    /// Opens a connection from a tiberius configuration.
    pub async fn connect(config: Config) -> Result<Self> {
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| tds_error(&e))?;
        tcp.set_nodelay(true).map_err(|e| tds_error(&e))?;
        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| tds_error(&e))?;
        Ok(Self::new(client))
    }

    /// Returns the wrapped tiberius client.
    #[must_use]
    pub fn into_inner(self) -> TdsClient {
        self.client
    }
}

fn tds_error(err: &dyn std::fmt::Display) -> MigrateError {
    MigrateError::ConnectionFailed {
        dialect: Dialect::SqlServer,
        detail: err.to_string(),
    }
}

fn decode_column(data: ColumnData<'_>) -> SqlValue {
    match data {
        ColumnData::U8(v) => v.map_or(SqlValue::Null, |n| SqlValue::Int(i64::from(n))),
        ColumnData::I16(v) => v.map_or(SqlValue::Null, |n| SqlValue::Int(i64::from(n))),
        ColumnData::I32(v) => v.map_or(SqlValue::Null, |n| SqlValue::Int(i64::from(n))),
        ColumnData::I64(v) => v.map_or(SqlValue::Null, SqlValue::Int),
        ColumnData::F32(v) => v.map_or(SqlValue::Null, |n| SqlValue::Float(f64::from(n))),
        ColumnData::F64(v) => v.map_or(SqlValue::Null, SqlValue::Float),
        ColumnData::Bit(v) => v.map_or(SqlValue::Null, SqlValue::Bool),
        ColumnData::String(v) => {
            v.map_or(SqlValue::Null, |s| SqlValue::Text(s.into_owned()))
        }
        ColumnData::Guid(v) => v.map_or(SqlValue::Null, |g| SqlValue::Text(g.to_string())),
        ColumnData::Binary(v) => {
            v.map_or(SqlValue::Null, |b| SqlValue::Bytes(b.into_owned()))
        }
        ColumnData::Numeric(v) => v.map_or(SqlValue::Null, |n| {
            SqlValue::Float(n.value() as f64 / 10f64.powi(i32::from(n.scale())))
        }),
        // Temporal and other driver-specific types never appear in the
        // catalog queries this engine issues.
        _ => SqlValue::Null,
    }
}

#[async_trait]
impl SchemaConnection for MssqlConnection {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let result = self
            .client
            .execute(sql, &[])
            .await
            .map_err(|e| tds_error(&e))?;
        Ok(result.total())
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<SqlRow>> {
        let mut stream = self
            .client
            .simple_query(sql)
            .await
            .map_err(|e| tds_error(&e))?;

        let mut rows = Vec::new();
        while let Some(item) = stream.try_next().await.map_err(|e| tds_error(&e))? {
            let QueryItem::Row(row) = item else {
                continue;
            };
            let names: Vec<String> = row
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect();
            let values: Vec<SqlValue> = row.into_iter().map(decode_column).collect();
            rows.push(SqlRow::new(names.into_iter().zip(values).collect()));
        }
        Ok(rows)
    }

    async fn begin(&mut self) -> Result<()> {
        self.execute("BEGIN TRANSACTION").await.map(drop)
    }

    async fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT TRANSACTION").await.map(drop)
    }

    async fn rollback(&mut self) -> Result<()> {
        self.execute("ROLLBACK TRANSACTION").await.map(drop)
    }
}
