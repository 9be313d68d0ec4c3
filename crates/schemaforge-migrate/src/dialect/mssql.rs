//! SQL Server dialect.
//!
//! Bracket-quoted identifiers, `NVARCHAR` for Unicode strings,
//! `IDENTITY(seed, increment)`, `DATETIME2(p)`. There is no native enum
//! type; plans that declare one fail at generation with `UnsupportedType`,
//! before any SQL reaches the database.

use schemaforge_core::schema::{Column, Table};
use schemaforge_core::types::{PortableType, MAX_LENGTH};

use crate::error::{MigrateError, Result};
use crate::operations::MigrationOperation;

use super::{Dialect, SqlDialect};

/// SQL Server SQL generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl SqlServerDialect {
    fn create_table_sql(&self, table: &Table) -> Result<String> {
        let mut defs = Vec::new();
        for column in &table.columns {
            defs.push(self.column_definition(column)?);
        }
        if let Some(pk) = &table.primary_key {
            defs.push(self.primary_key_clause(pk));
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
            self.qualified_table(&table.schema_namespace, &table.name),
            defs.join(",\n  ")
        ))
    }
}

impl SqlDialect for SqlServerDialect {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn index_filter(&self, filter: &str) -> String {
        format!("WHERE {filter}")
    }

    fn type_name(&self, ty: &PortableType) -> Result<String> {
        let name = match ty {
            PortableType::TinyInt => "TINYINT".to_string(),
            PortableType::SmallInt => "SMALLINT".to_string(),
            PortableType::Int => "INT".to_string(),
            PortableType::BigInt => "BIGINT".to_string(),
            PortableType::Decimal { precision, scale } => {
                format!("DECIMAL({precision}, {scale})")
            }
            PortableType::Money => "MONEY".to_string(),
            PortableType::SmallMoney => "SMALLMONEY".to_string(),
            PortableType::Float => "REAL".to_string(),
            PortableType::Double => "FLOAT".to_string(),
            PortableType::Char { length } => format!("CHAR({length})"),
            PortableType::VarChar { max_length } => {
                if *max_length == MAX_LENGTH {
                    "VARCHAR(MAX)".to_string()
                } else {
                    format!("VARCHAR({max_length})")
                }
            }
            PortableType::NChar { length } => format!("NCHAR({length})"),
            PortableType::NVarChar { max_length } => {
                if *max_length == MAX_LENGTH {
                    "NVARCHAR(MAX)".to_string()
                } else {
                    format!("NVARCHAR({max_length})")
                }
            }
            PortableType::Text => "NVARCHAR(MAX)".to_string(),
            PortableType::Binary { length } => format!("BINARY({length})"),
            PortableType::VarBinary { max_length } => {
                if *max_length == MAX_LENGTH {
                    "VARBINARY(MAX)".to_string()
                } else {
                    format!("VARBINARY({max_length})")
                }
            }
            PortableType::Blob => "VARBINARY(MAX)".to_string(),
            PortableType::Date => "DATE".to_string(),
            PortableType::Time { precision } => format!("TIME({precision})"),
            PortableType::DateTime { precision } => format!("DATETIME2({precision})"),
            PortableType::DateTimeOffset => "DATETIMEOFFSET".to_string(),
            PortableType::RowVersion => "ROWVERSION".to_string(),
            PortableType::Uuid => "UNIQUEIDENTIFIER".to_string(),
            PortableType::Boolean => "BIT".to_string(),
            PortableType::Json => "NVARCHAR(MAX)".to_string(),
            PortableType::Xml => "XML".to_string(),
            PortableType::Geometry { .. } => "GEOMETRY".to_string(),
            PortableType::Geography { .. } => "GEOGRAPHY".to_string(),
            PortableType::Enum { .. } => {
                return Err(MigrateError::UnsupportedType {
                    dialect: Dialect::SqlServer,
                    variant: ty.variant_name().to_string(),
                })
            }
        };
        Ok(name)
    }

    fn identity_clause(&self, column: &Column) -> Result<Option<String>> {
        Ok(Some(format!(
            "IDENTITY({}, {})",
            column.seed, column.increment
        )))
    }

    fn computed_definition(&self, column: &Column, expression: &str) -> Result<String> {
        // Computed columns carry no declared type on SQL Server.
        let mut sql = format!(
            "{} AS ({expression})",
            self.quote_identifier(&column.name)
        );
        if column.persisted {
            sql.push_str(" PERSISTED");
        }
        Ok(sql)
    }

    fn generate(&self, operation: &MigrationOperation) -> Result<Vec<String>> {
        let statements = match operation {
            MigrationOperation::CreateTable { table } => vec![self.create_table_sql(table)?],

            MigrationOperation::DropTable { schema, table_name } => {
                vec![format!(
                    "DROP TABLE {}",
                    self.qualified_table(schema, table_name)
                )]
            }

            MigrationOperation::AddColumn {
                schema,
                table,
                column,
            } => vec![format!(
                "ALTER TABLE {} ADD {}",
                self.qualified_table(schema, table),
                self.column_definition(column)?
            )],

            MigrationOperation::DropColumn {
                schema,
                table,
                column_name,
            } => vec![format!(
                "ALTER TABLE {} DROP COLUMN {}",
                self.qualified_table(schema, table),
                self.quote_identifier(column_name)
            )],

            MigrationOperation::AlterColumn {
                schema,
                table,
                column,
                changes,
            } => {
                let mut statements = Vec::new();
                if changes.ty || changes.nullable {
                    let nullability = if column.is_nullable() {
                        "NULL"
                    } else {
                        "NOT NULL"
                    };
                    statements.push(format!(
                        "ALTER TABLE {} ALTER COLUMN {} {} {nullability}",
                        self.qualified_table(schema, table),
                        self.quote_identifier(&column.name),
                        self.type_name(&column.ty)?
                    ));
                }
                if changes.default {
                    // Defaults are bound constraints with generated names;
                    // rebinding one needs the existing constraint name.
                    statements.push(format!(
                        "-- Default change for '{table}.{}' requires dropping the \
                         bound DEFAULT constraint by name on SQL Server",
                        column.name
                    ));
                }
                statements
            }

            MigrationOperation::CreateIndex {
                schema,
                table,
                index,
            } => vec![self.create_index_sql(schema, table, index)],

            MigrationOperation::DropIndex {
                schema,
                table,
                index_name,
            } => vec![format!(
                "DROP INDEX {} ON {}",
                self.quote_identifier(index_name),
                self.qualified_table(schema, table)
            )],

            MigrationOperation::AddForeignKey {
                schema,
                table,
                foreign_key,
            } => vec![format!(
                "ALTER TABLE {} ADD {}",
                self.qualified_table(schema, table),
                self.foreign_key_clause(foreign_key)
            )],

            MigrationOperation::DropForeignKey {
                schema,
                table,
                constraint_name,
            }
            | MigrationOperation::DropUniqueConstraint {
                schema,
                table,
                constraint_name,
            }
            | MigrationOperation::DropCheckConstraint {
                schema,
                table,
                constraint_name,
            } => vec![format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.qualified_table(schema, table),
                self.quote_identifier(constraint_name)
            )],

            MigrationOperation::AddUniqueConstraint {
                schema,
                table,
                constraint,
            } => vec![format!(
                "ALTER TABLE {} ADD {}",
                self.qualified_table(schema, table),
                self.unique_clause(constraint)
            )],

            MigrationOperation::AddCheckConstraint {
                schema,
                table,
                constraint,
            } => vec![format!(
                "ALTER TABLE {} ADD {}",
                self.qualified_table(schema, table),
                self.check_clause(constraint)
            )],

            MigrationOperation::AddPrimaryKey {
                schema,
                table,
                primary_key,
            } => vec![format!(
                "ALTER TABLE {} ADD {}",
                self.qualified_table(schema, table),
                self.primary_key_clause(primary_key)
            )],

            MigrationOperation::DropPrimaryKey {
                schema,
                table,
                constraint_name,
            } => {
                let Some(name) = constraint_name else {
                    return Err(MigrateError::InvalidSchema {
                        reason: "dropping a primary key on SQL Server requires the \
                                 constraint name"
                            .to_string(),
                        location: format!("{schema}.{table}"),
                    });
                };
                vec![format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    self.qualified_table(schema, table),
                    self.quote_identifier(name)
                )]
            }
        };
        Ok(statements)
    }
}
