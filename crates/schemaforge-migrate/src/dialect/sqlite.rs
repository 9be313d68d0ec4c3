//! SQLite dialect.
//!
//! SQLite resolves column types through storage-class affinity, so declared
//! lengths and precisions live only in the portable model and never appear
//! in generated DDL. ALTER TABLE support is limited: constraints cannot be
//! added after table creation, and those operations come back as `--`
//! statement stubs the runner logs and skips.

use schemaforge_core::schema::{Column, Table};
use schemaforge_core::types::PortableType;

use crate::error::Result;
use crate::operations::MigrationOperation;

use super::{Dialect, SqlDialect};

/// SQLite SQL generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// The single primary-key column an identity can be folded into, when
    /// the table has one. SQLite expresses identity only as
    /// `INTEGER PRIMARY KEY`.
    fn inline_identity_pk(table: &Table) -> Option<&str> {
        let pk = table.primary_key.as_ref()?;
        if pk.columns.len() != 1 {
            return None;
        }
        let column = table.column_named(&pk.columns[0])?;
        (column.identity && column.ty.is_integer()).then(|| column.name.as_str())
    }

    fn create_table_sql(&self, table: &Table) -> Result<String> {
        let inline_pk = Self::inline_identity_pk(table);

        let mut defs = Vec::new();
        for column in &table.columns {
            if Some(column.name.as_str()) == inline_pk {
                let mut parts = vec![
                    self.quote_identifier(&column.name),
                    "INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
                ];
                if let Some(clause) = self.default_clause(column) {
                    parts.push(clause);
                }
                defs.push(parts.join(" "));
            } else {
                defs.push(self.column_definition(column)?);
            }
        }

        if inline_pk.is_none() {
            if let Some(pk) = &table.primary_key {
                defs.push(self.primary_key_clause(pk));
            }
        }
        for uc in &table.unique_constraints {
            defs.push(self.unique_clause(uc));
        }
        for cc in &table.check_constraints {
            defs.push(self.check_clause(cc));
        }
        for fk in &table.foreign_keys {
            defs.push(self.foreign_key_clause(fk));
        }

        Ok(format!(
            "CREATE TABLE {} (\n  {}\n)",
            self.quote_identifier(&table.name),
            defs.join(",\n  ")
        ))
    }

    /// Unique constraints added after creation become unique indexes.
    fn unique_index_name(table: &str, columns: &[String]) -> String {
        format!("uq_{table}_{}", columns.join("_"))
    }
}

/// Advisory texts for identity columns this dialect cannot express. The
/// runner surfaces these as warnings before executing the operation.
pub(crate) fn identity_advisories(operation: &MigrationOperation) -> Vec<String> {
    let advise = |table: &str, column: &Column| {
        format!(
            "identity on '{}.{}' is not expressible in SQLite (only a single-column \
             INTEGER PRIMARY KEY auto-increments); the column is created without it",
            table, column.name
        )
    };
    match operation {
        MigrationOperation::CreateTable { table } => {
            let inline_pk = SqliteDialect::inline_identity_pk(table);
            table
                .columns
                .iter()
                .filter(|c| c.identity && Some(c.name.as_str()) != inline_pk)
                .map(|c| advise(&table.name, c))
                .collect()
        }
        MigrationOperation::AddColumn { table, column, .. } if column.identity => {
            vec![advise(table, column)]
        }
        _ => Vec::new(),
    }
}

impl SqlDialect for SqliteDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn qualified_table(&self, _schema: &str, table: &str) -> String {
        // The namespace is a per-connection concern (ATTACH) in SQLite.
        self.quote_identifier(table)
    }

    fn type_name(&self, ty: &PortableType) -> Result<String> {
        let affinity = match ty {
            PortableType::TinyInt
            | PortableType::SmallInt
            | PortableType::Int
            | PortableType::BigInt
            | PortableType::Boolean => "INTEGER",
            PortableType::Decimal { .. }
            | PortableType::Money
            | PortableType::SmallMoney
            | PortableType::Float
            | PortableType::Double => "REAL",
            PortableType::Char { .. }
            | PortableType::VarChar { .. }
            | PortableType::NChar { .. }
            | PortableType::NVarChar { .. }
            | PortableType::Text
            | PortableType::Date
            | PortableType::Time { .. }
            | PortableType::DateTime { .. }
            | PortableType::DateTimeOffset
            | PortableType::Uuid
            | PortableType::Json
            | PortableType::Xml
            | PortableType::Enum { .. } => "TEXT",
            PortableType::Binary { .. }
            | PortableType::VarBinary { .. }
            | PortableType::Blob
            | PortableType::RowVersion
            | PortableType::Geometry { .. }
            | PortableType::Geography { .. } => "BLOB",
        };
        Ok(affinity.to_string())
    }

    fn identity_clause(&self, _column: &Column) -> Result<Option<String>> {
        // Identity is only expressible as INTEGER PRIMARY KEY, which
        // create_table_sql folds into the column definition itself.
        Ok(None)
    }

    fn computed_definition(&self, column: &Column, expression: &str) -> Result<String> {
        let storage = if column.persisted { "STORED" } else { "VIRTUAL" };
        Ok(format!(
            "{} {} GENERATED ALWAYS AS ({expression}) {storage}",
            self.quote_identifier(&column.name),
            self.type_name(&column.ty)?
        ))
    }

    fn generate(&self, operation: &MigrationOperation) -> Result<Vec<String>> {
        let sql = match operation {
            MigrationOperation::CreateTable { table } => self.create_table_sql(table)?,

            MigrationOperation::DropTable { table_name, .. } => {
                format!("DROP TABLE {}", self.quote_identifier(table_name))
            }

            MigrationOperation::AddColumn { table, column, .. } => format!(
                "ALTER TABLE {} ADD COLUMN {}",
                self.quote_identifier(table),
                self.column_definition(column)?
            ),

            MigrationOperation::DropColumn {
                table, column_name, ..
            } => format!(
                "ALTER TABLE {} DROP COLUMN {}",
                self.quote_identifier(table),
                self.quote_identifier(column_name)
            ),

            MigrationOperation::AlterColumn { table, column, .. } => format!(
                "-- ALTER COLUMN is not supported in SQLite; table recreation \
                 required for: {table}.{}",
                column.name
            ),

            MigrationOperation::CreateIndex {
                schema,
                table,
                index,
            } => self.create_index_sql(schema, table, index),

            MigrationOperation::DropIndex { index_name, .. } => {
                format!("DROP INDEX {}", self.quote_identifier(index_name))
            }

            MigrationOperation::AddForeignKey {
                table, foreign_key, ..
            } => format!(
                "-- Foreign key '{}' on table '{table}' cannot be added after \
                 table creation in SQLite; table recreation required",
                foreign_key.name.as_deref().unwrap_or("<anonymous>")
            ),

            MigrationOperation::DropForeignKey {
                table,
                constraint_name,
                ..
            } => format!(
                "-- Foreign key '{constraint_name}' on table '{table}' cannot \
                 be dropped in SQLite; table recreation required"
            ),

            MigrationOperation::AddUniqueConstraint {
                schema,
                table,
                constraint,
            } => {
                // Unique constraints after creation are unique indexes.
                let name = constraint
                    .name
                    .clone()
                    .unwrap_or_else(|| Self::unique_index_name(table, &constraint.columns));
                let index = schemaforge_core::schema::Index::on_columns(
                    name,
                    constraint.columns.clone(),
                )
                .unique();
                self.create_index_sql(schema, table, &index)
            }

            MigrationOperation::DropUniqueConstraint {
                constraint_name, ..
            } => format!("DROP INDEX {}", self.quote_identifier(constraint_name)),

            MigrationOperation::AddCheckConstraint {
                table, constraint, ..
            } => format!(
                "-- Check constraint '{}' on table '{table}' cannot be added \
                 after table creation in SQLite; table recreation required",
                constraint.name
            ),

            MigrationOperation::DropCheckConstraint {
                table,
                constraint_name,
                ..
            } => format!(
                "-- Check constraint '{constraint_name}' on table '{table}' \
                 cannot be dropped in SQLite; table recreation required"
            ),

            MigrationOperation::AddPrimaryKey { table, .. } => format!(
                "-- A primary key cannot be added to table '{table}' after \
                 creation in SQLite; table recreation required"
            ),

            MigrationOperation::DropPrimaryKey { table, .. } => format!(
                "-- The primary key of table '{table}' cannot be dropped in \
                 SQLite; table recreation required"
            ),
        };
        Ok(vec![sql])
    }
}
