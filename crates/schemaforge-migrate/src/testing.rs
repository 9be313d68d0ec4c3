//! Test doubles shared by the unit tests.

use async_trait::async_trait;

use crate::connection::{SchemaConnection, SqlRow};
use crate::dialect::Dialect;
use crate::error::{MigrateError, Result};

/// A canned in-memory connection: queries are answered from a substring
/// match against prepared result sets, executed statements are recorded,
/// and execution can be made to fail on a marker.
pub(crate) struct FakeConnection {
    pub dialect: Dialect,
    /// `(needle, rows)`: the first entry whose needle occurs in the query
    /// text answers it. Unmatched queries return no rows.
    pub canned: Vec<(&'static str, Vec<SqlRow>)>,
    /// Every statement passed to `execute`, including BEGIN/COMMIT/ROLLBACK.
    pub executed: Vec<String>,
    /// When set, `execute` fails on any statement containing this marker.
    pub fail_on: Option<&'static str>,
}

impl FakeConnection {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            canned: Vec::new(),
            executed: Vec::new(),
            fail_on: None,
        }
    }

    pub fn with_canned(mut self, needle: &'static str, rows: Vec<SqlRow>) -> Self {
        self.canned.push((needle, rows));
        self
    }
}

#[async_trait]
impl SchemaConnection for FakeConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        if let Some(marker) = self.fail_on {
            if sql.contains(marker) {
                return Err(MigrateError::ConnectionFailed {
                    dialect: self.dialect,
                    detail: format!("injected failure on '{marker}'"),
                });
            }
        }
        self.executed.push(sql.to_string());
        Ok(0)
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<SqlRow>> {
        Ok(self
            .canned
            .iter()
            .find(|(needle, _)| sql.contains(needle))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
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
