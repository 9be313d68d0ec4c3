//! PostgreSQL dialect.
//!
//! Natural type mappings (`UUID`, `JSONB`, `TIMESTAMPTZ`, `BYTEA`). Declared
//! enum types become `CREATE TYPE ... AS ENUM` side statements emitted ahead
//! of the `CREATE TABLE` that first references them.

use std::collections::HashSet;

use schemaforge_core::schema::{Column, Table};
use schemaforge_core::types::{PortableType, MAX_LENGTH};

use crate::error::{MigrateError, Result};
use crate::operations::MigrationOperation;

use super::{escape_string_literal, Dialect, SqlDialect};

/// PostgreSQL SQL generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// `CREATE TYPE` statements for enum columns, deduplicated by type name,
    /// in column declaration order.
    fn enum_type_statements(&self, table: &Table) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut statements = Vec::new();
        for column in &table.columns {
            if let PortableType::Enum { name, values } = &column.ty {
                if !seen.insert(name.to_ascii_lowercase()) {
                    continue;
                }
                let members = values
                    .iter()
                    .map(|v| format!("'{}'", escape_string_literal(v)))
                    .collect::<Vec<_>>()
                    .join(", ");
                statements.push(format!(
                    "CREATE TYPE {} AS ENUM ({members})",
                    self.quote_identifier(name)
                ));
            }
        }
        statements
    }

    fn create_table_sql(&self, table: &Table) -> Result<Vec<String>> {
        let mut statements = self.enum_type_statements(table);

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

        let qualified = self.qualified_table(&table.schema_namespace, &table.name);
        statements.push(format!(
            "CREATE TABLE {qualified} (\n  {}\n)",
            defs.join(",\n  ")
        ));

        if let Some(comment) = &table.comment {
            statements.push(format!(
                "COMMENT ON TABLE {qualified} IS '{}'",
                escape_string_literal(comment)
            ));
        }
        for column in &table.columns {
            if let Some(comment) = &column.comment {
                statements.push(format!(
                    "COMMENT ON COLUMN {qualified}.{} IS '{}'",
                    self.quote_identifier(&column.name),
                    escape_string_literal(comment)
                ));
            }
        }

        Ok(statements)
    }

    fn alter_column_sql(
        &self,
        schema: &str,
        table: &str,
        column: &Column,
        changes: &crate::operations::ColumnChanges,
    ) -> Result<Vec<String>> {
        let qualified = self.qualified_table(schema, table);
        let quoted = self.quote_identifier(&column.name);
        let mut statements = Vec::new();

        if changes.ty {
            statements.push(format!(
                "ALTER TABLE {qualified} ALTER COLUMN {quoted} TYPE {}",
                self.type_name(&column.ty)?
            ));
        }
        if changes.nullable {
            let verb = if column.is_nullable() {
                "DROP NOT NULL"
            } else {
                "SET NOT NULL"
            };
            statements.push(format!(
                "ALTER TABLE {qualified} ALTER COLUMN {quoted} {verb}"
            ));
        }
        if changes.default {
            let statement = match self.default_clause(column) {
                Some(clause) => {
                    // default_clause renders "DEFAULT <expr>".
                    let expr = clause.strip_prefix("DEFAULT ").unwrap_or(&clause);
                    format!("ALTER TABLE {qualified} ALTER COLUMN {quoted} SET DEFAULT {expr}")
                }
                None => format!("ALTER TABLE {qualified} ALTER COLUMN {quoted} DROP DEFAULT"),
            };
            statements.push(statement);
        }
        Ok(statements)
    }
}

impl SqlDialect for PostgresDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn type_name(&self, ty: &PortableType) -> Result<String> {
        let name = match ty {
            PortableType::TinyInt | PortableType::SmallInt => "SMALLINT".to_string(),
            PortableType::Int => "INTEGER".to_string(),
            PortableType::BigInt => "BIGINT".to_string(),
            PortableType::Decimal { precision, scale } => {
                format!("DECIMAL({precision}, {scale})")
            }
            PortableType::Money | PortableType::SmallMoney => "MONEY".to_string(),
            PortableType::Float => "REAL".to_string(),
            PortableType::Double => "DOUBLE PRECISION".to_string(),
            PortableType::Char { length } | PortableType::NChar { length } => {
                format!("CHAR({length})")
            }
            PortableType::VarChar { max_length } | PortableType::NVarChar { max_length } => {
                if *max_length == MAX_LENGTH {
                    "TEXT".to_string()
                } else {
                    format!("VARCHAR({max_length})")
                }
            }
            PortableType::Text => "TEXT".to_string(),
            PortableType::Binary { .. }
            | PortableType::VarBinary { .. }
            | PortableType::Blob
            | PortableType::RowVersion => "BYTEA".to_string(),
            PortableType::Date => "DATE".to_string(),
            PortableType::Time { precision } => format!("TIME({precision})"),
            PortableType::DateTime { precision } => format!("TIMESTAMP({precision})"),
            PortableType::DateTimeOffset => "TIMESTAMPTZ".to_string(),
            PortableType::Uuid => "UUID".to_string(),
            PortableType::Boolean => "BOOLEAN".to_string(),
            PortableType::Json => "JSONB".to_string(),
            PortableType::Xml => "XML".to_string(),
            PortableType::Geometry { srid: None } => "geometry".to_string(),
            PortableType::Geometry { srid: Some(srid) } => {
                format!("geometry(Geometry, {srid})")
            }
            PortableType::Geography { srid } => format!("geography(Geometry, {srid})"),
            PortableType::Enum { name, .. } => self.quote_identifier(name),
        };
        Ok(name)
    }

    fn identity_clause(&self, column: &Column) -> Result<Option<String>> {
        Ok(Some(format!(
            "GENERATED ALWAYS AS IDENTITY (START WITH {} INCREMENT BY {})",
            column.seed, column.increment
        )))
    }

    fn computed_definition(&self, column: &Column, expression: &str) -> Result<String> {
        // PostgreSQL only supports stored generated columns.
        Ok(format!(
            "{} {} GENERATED ALWAYS AS ({expression}) STORED",
            self.quote_identifier(&column.name),
            self.type_name(&column.ty)?
        ))
    }

    fn generate(&self, operation: &MigrationOperation) -> Result<Vec<String>> {
        let statements = match operation {
            MigrationOperation::CreateTable { table } => return self.create_table_sql(table),

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
                "ALTER TABLE {} ADD COLUMN {}",
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
            } => return self.alter_column_sql(schema, table, column, changes),

            MigrationOperation::CreateIndex {
                schema,
                table,
                index,
            } => vec![self.create_index_sql(schema, table, index)],

            MigrationOperation::DropIndex {
                schema, index_name, ..
            } => vec![format!(
                "DROP INDEX {}",
                self.qualified_table(schema, index_name)
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

            MigrationOperation::DropUniqueConstraint {
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
                // PostgreSQL names an unnamed primary key '<table>_pkey'.
                let name = constraint_name
                    .clone()
                    .unwrap_or_else(|| format!("{table}_pkey"));
                vec![format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    self.qualified_table(schema, table),
                    self.quote_identifier(&name)
                )]
            }
        };
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaforge_core::schema::{Index, PrimaryKey};
    use crate::operations::ColumnChanges;

    fn dialect() -> PostgresDialect {
        PostgresDialect
    }

    #[test]
    fn test_create_table_basic() {
        let table = Table::new("users")
            .column(Column::new("id", PortableType::Uuid).not_null())
            .column(
                Column::new("email", PortableType::VarChar { max_length: 255 }).not_null(),
            )
            .primary_key(PrimaryKey::new(vec!["id".to_string()]).named("pk_users"));

        let sql = dialect()
            .generate(&MigrationOperation::create_table(table))
            .unwrap();
        assert_eq!(sql.len(), 1);
        assert!(sql[0].starts_with("CREATE TABLE \"public\".\"users\""));
        assert!(sql[0].contains("\"id\" UUID NOT NULL"));
        assert!(sql[0].contains("\"email\" VARCHAR(255) NOT NULL"));
        assert!(sql[0].contains("CONSTRAINT \"pk_users\" PRIMARY KEY (\"id\")"));
    }

    #[test]
    fn test_enum_create_type_precedes_table() {
        let mood = PortableType::Enum {
            name: "mood".to_string(),
            values: vec!["happy".to_string(), "sad".to_string()],
        };
        let table = Table::new("people")
            .column(Column::new("id", PortableType::BigInt).not_null())
            .column(Column::new("mood", mood.clone()))
            .column(Column::new("yesterday_mood", mood))
            .primary_key(PrimaryKey::new(vec!["id".to_string()]));

        let sql = dialect()
            .generate(&MigrationOperation::create_table(table))
            .unwrap();
        assert_eq!(sql.len(), 2, "one CREATE TYPE, deduplicated, then the table");
        assert_eq!(sql[0], "CREATE TYPE \"mood\" AS ENUM ('happy', 'sad')");
        assert!(sql[1].contains("\"mood\" \"mood\""));
    }

    #[test]
    fn test_boolean_default_stays_boolean() {
        let column = Column::new("enabled", PortableType::Boolean)
            .not_null()
            .default_portable("true");
        let sql = dialect()
            .generate(&MigrationOperation::add_column("public", "settings", column))
            .unwrap();
        assert!(sql[0].contains("BOOLEAN NOT NULL DEFAULT true"));
    }

    #[test]
    fn test_uuid_default() {
        let column = Column::new("id", PortableType::Uuid)
            .not_null()
            .default_portable("gen_uuid()");
        let sql = dialect()
            .generate(&MigrationOperation::add_column("public", "events", column))
            .unwrap();
        assert!(sql[0].contains("DEFAULT gen_random_uuid()"));
    }

    #[test]
    fn test_identity_rendering() {
        let column = Column::new("id", PortableType::BigInt).identity_with(100, 5);
        let def = dialect().column_definition(&column).unwrap();
        assert_eq!(
            def,
            "\"id\" BIGINT GENERATED ALWAYS AS IDENTITY \
             (START WITH 100 INCREMENT BY 5) NOT NULL"
        );
    }

    #[test]
    fn test_identity_on_uuid_rejected() {
        let mut column = Column::new("id", PortableType::Uuid);
        column.identity = true;
        let err = dialect().column_definition(&column).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidSchema { .. }));
    }

    #[test]
    fn test_max_sentinel_renders_text() {
        let d = dialect();
        assert_eq!(
            d.type_name(&PortableType::NVarChar {
                max_length: MAX_LENGTH
            })
            .unwrap(),
            "TEXT"
        );
        assert_eq!(
            d.type_name(&PortableType::NVarChar { max_length: 100 }).unwrap(),
            "VARCHAR(100)"
        );
    }

    #[test]
    fn test_partial_and_expression_index() {
        let index = Index::on_expressions("uq_name_ci", vec!["lower(name)".to_string()])
            .unique()
            .filter("deleted_at IS NULL");
        let sql = dialect()
            .generate(&MigrationOperation::create_index("public", "artists", index))
            .unwrap();
        assert_eq!(
            sql[0],
            "CREATE UNIQUE INDEX \"uq_name_ci\" ON \"public\".\"artists\" \
             ((lower(name))) WHERE (deleted_at IS NULL)"
        );
    }

    #[test]
    fn test_alter_column_statements() {
        let column = Column::new("age", PortableType::BigInt)
            .not_null()
            .default_portable("0");
        let op = MigrationOperation::AlterColumn {
            schema: "public".to_string(),
            table: "users".to_string(),
            column,
            changes: ColumnChanges {
                ty: true,
                nullable: true,
                default: true,
            },
        };
        let sql = dialect().generate(&op).unwrap();
        assert_eq!(sql.len(), 3);
        assert!(sql[0].contains("ALTER COLUMN \"age\" TYPE BIGINT"));
        assert!(sql[1].contains("SET NOT NULL"));
        assert!(sql[2].contains("SET DEFAULT 0"));
    }

    #[test]
    fn test_drop_primary_key_default_name() {
        let op = MigrationOperation::DropPrimaryKey {
            schema: "public".to_string(),
            table: "users".to_string(),
            constraint_name: None,
        };
        let sql = dialect().generate(&op).unwrap();
        assert_eq!(
            sql[0],
            "ALTER TABLE \"public\".\"users\" DROP CONSTRAINT \"users_pkey\""
        );
    }

    #[test]
    fn test_comments_emitted() {
        let table = Table::new("users")
            .column(
                Column::new("id", PortableType::BigInt)
                    .not_null()
                    .comment("surrogate key"),
            )
            .primary_key(PrimaryKey::new(vec!["id".to_string()]))
            .comment("account records");
        let sql = dialect()
            .generate(&MigrationOperation::create_table(table))
            .unwrap();
        assert!(sql
            .iter()
            .any(|s| s == "COMMENT ON TABLE \"public\".\"users\" IS 'account records'"));
        assert!(sql.iter().any(|s| s.contains("COMMENT ON COLUMN")));
    }
}
