//! Database dialect implementations.
//!
//! Each dialect knows how to lower portable types, portable default
//! expressions, and migration operations into SQL specific to that database
//! system.

mod mssql;
mod postgres;
mod sqlite;

pub use mssql::SqlServerDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

pub(crate) use sqlite::identity_advisories as sqlite_identity_advisories;

use std::fmt;

use serde::{Deserialize, Serialize};

use schemaforge_core::schema::{
    CheckConstraint, Column, ForeignKey, ForeignKeyAction, Index, PrimaryKey, UniqueConstraint,
};
use schemaforge_core::types::PortableType;

use crate::defaults::translate_default;
use crate::error::{MigrateError, Result};
use crate::operations::MigrationOperation;

/// A concrete database flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    /// SQLite, with storage-class affinity.
    Sqlite,
    /// PostgreSQL.
    Postgres,
    /// Microsoft SQL Server.
    SqlServer,
}

impl Dialect {
    /// Whether DDL participates in transactions on this dialect.
    #[must_use]
    pub fn supports_transactional_ddl(self) -> bool {
        match self {
            Self::Sqlite | Self::Postgres => true,
            Self::SqlServer => false,
        }
    }

    /// Returns the generator for this dialect.
    #[must_use]
    pub fn generator(self) -> &'static dyn SqlDialect {
        match self {
            Self::Sqlite => &SqliteDialect,
            Self::Postgres => &PostgresDialect,
            Self::SqlServer => &SqlServerDialect,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::SqlServer => "sqlserver",
        })
    }
}

/// Trait for database-specific SQL generation.
///
/// Provided methods implement the parts that are uniform across dialects;
/// implementations override the rest. Statements beginning with `--` mark
/// operations the dialect cannot express after table creation; the runner
/// logs and skips them.
pub trait SqlDialect: Send + Sync {
    /// The dialect this generator targets.
    fn dialect(&self) -> Dialect;

    /// Generates the SQL statement(s) for one migration operation.
    fn generate(&self, operation: &MigrationOperation) -> Result<Vec<String>>;

    /// Returns the column type syntax for a portable type.
    fn type_name(&self, ty: &PortableType) -> Result<String>;

    /// Returns the identity clause for a generated column, or `None` when
    /// the dialect expresses identity elsewhere in the definition.
    fn identity_clause(&self, column: &Column) -> Result<Option<String>>;

    /// Renders a computed column definition.
    fn computed_definition(&self, column: &Column, expression: &str) -> Result<String>;

    /// Quotes an identifier (table name, column name, constraint name).
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Renders a possibly schema-qualified table reference.
    fn qualified_table(&self, schema: &str, table: &str) -> String {
        format!(
            "{}.{}",
            self.quote_identifier(schema),
            self.quote_identifier(table)
        )
    }

    /// Renders the partial-index predicate clause.
    fn index_filter(&self, filter: &str) -> String {
        format!("WHERE ({filter})")
    }

    /// Lowers a column's effective default to literal DDL text.
    fn default_clause(&self, column: &Column) -> Option<String> {
        use schemaforge_core::schema::EffectiveDefault;
        match column.effective_default()? {
            EffectiveDefault::Portable(expr) => Some(format!(
                "DEFAULT {}",
                translate_default(expr, self.dialect())
            )),
            EffectiveDefault::Sql(sql) => Some(format!("DEFAULT {sql}")),
        }
    }

    /// Assembles a column definition: name, type, then the inline
    /// constraints in a fixed order (identity, NOT NULL, DEFAULT, CHECK,
    /// COLLATE).
    fn column_definition(&self, column: &Column) -> Result<String> {
        if let Some(expression) = &column.computed_expression {
            return self.computed_definition(column, expression);
        }

        let mut parts = vec![
            self.quote_identifier(&column.name),
            self.type_name(&column.ty)?,
        ];
        if column.identity {
            if !column.ty.is_integer() {
                return Err(MigrateError::InvalidSchema {
                    reason: format!(
                        "identity requires an integer type, found {}",
                        column.ty.variant_name()
                    ),
                    location: column.name.clone(),
                });
            }
            if let Some(clause) = self.identity_clause(column)? {
                parts.push(clause);
            }
        }
        if !column.is_nullable() {
            parts.push("NOT NULL".to_string());
        }
        if let Some(clause) = self.default_clause(column) {
            parts.push(clause);
        }
        if let Some(check) = &column.check_expression {
            parts.push(format!("CHECK ({check})"));
        }
        if let Some(collation) = &column.collation {
            parts.push(format!("COLLATE {collation}"));
        }
        Ok(parts.join(" "))
    }

    /// Renders the table-level primary-key clause.
    fn primary_key_clause(&self, pk: &PrimaryKey) -> String {
        let columns = self.quoted_list(&pk.columns);
        match &pk.name {
            Some(name) => format!(
                "CONSTRAINT {} PRIMARY KEY ({columns})",
                self.quote_identifier(name)
            ),
            None => format!("PRIMARY KEY ({columns})"),
        }
    }

    /// Renders a table-level unique-constraint clause.
    fn unique_clause(&self, uc: &UniqueConstraint) -> String {
        let columns = self.quoted_list(&uc.columns);
        match &uc.name {
            Some(name) => format!(
                "CONSTRAINT {} UNIQUE ({columns})",
                self.quote_identifier(name)
            ),
            None => format!("UNIQUE ({columns})"),
        }
    }

    /// Renders a table-level check-constraint clause.
    fn check_clause(&self, cc: &CheckConstraint) -> String {
        format!(
            "CONSTRAINT {} CHECK ({})",
            self.quote_identifier(&cc.name),
            cc.expression
        )
    }

    /// Renders a foreign-key clause. `NoAction` is the dialect default and
    /// is omitted.
    fn foreign_key_clause(&self, fk: &ForeignKey) -> String {
        let mut sql = String::new();
        if let Some(name) = &fk.name {
            sql.push_str("CONSTRAINT ");
            sql.push_str(&self.quote_identifier(name));
            sql.push(' ');
        }
        sql.push_str("FOREIGN KEY (");
        sql.push_str(&self.quoted_list(&fk.columns));
        sql.push_str(") REFERENCES ");
        match &fk.referenced_schema {
            Some(schema) => sql.push_str(&self.qualified_table(schema, &fk.referenced_table)),
            None => sql.push_str(&self.quote_identifier(&fk.referenced_table)),
        }
        sql.push_str(" (");
        sql.push_str(&self.quoted_list(&fk.referenced_columns));
        sql.push(')');
        if fk.on_delete != ForeignKeyAction::NoAction {
            sql.push_str(" ON DELETE ");
            sql.push_str(fk.on_delete.to_sql());
        }
        if fk.on_update != ForeignKeyAction::NoAction {
            sql.push_str(" ON UPDATE ");
            sql.push_str(fk.on_update.to_sql());
        }
        sql
    }

    /// Renders the key list of an index: quoted columns, or expressions
    /// verbatim wrapped in parentheses.
    fn index_body(&self, index: &Index) -> String {
        if index.columns.is_empty() {
            index
                .expressions
                .iter()
                .map(|e| format!("({e})"))
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            self.quoted_list(&index.columns)
        }
    }

    /// Renders a `CREATE [UNIQUE] INDEX` statement.
    fn create_index_sql(&self, schema: &str, table: &str, index: &Index) -> String {
        let mut sql = String::from("CREATE ");
        if index.unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        sql.push_str(&self.quote_identifier(&index.name));
        sql.push_str(" ON ");
        sql.push_str(&self.qualified_table(schema, table));
        sql.push_str(" (");
        sql.push_str(&self.index_body(index));
        sql.push(')');
        if let Some(filter) = &index.filter {
            sql.push(' ');
            sql.push_str(&self.index_filter(filter));
        }
        sql
    }

    /// Quotes and comma-joins a column list.
    fn quoted_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.quote_identifier(n))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Escapes a string literal for embedding in DDL.
pub(crate) fn escape_string_literal(s: &str) -> String {
    s.replace('\'', "''")
}

/// True for the statement stubs emitted when a dialect cannot express an
/// operation after table creation. The runner warns and skips these.
#[must_use]
pub fn is_unsupported_stub(sql: &str) -> bool {
    sql.starts_with("--")
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaforge_core::types::all_variants;

    #[test]
    fn test_type_translator_totality() {
        // Every variant either maps to a non-empty type name or reports
        // UnsupportedType; nothing panics, nothing renders empty.
        for dialect in [Dialect::Sqlite, Dialect::Postgres, Dialect::SqlServer] {
            let generator = dialect.generator();
            for ty in all_variants() {
                match generator.type_name(&ty) {
                    Ok(name) => assert!(
                        !name.is_empty(),
                        "{dialect} rendered an empty type for {ty}"
                    ),
                    Err(MigrateError::UnsupportedType { .. }) => {}
                    Err(other) => panic!("unexpected error for {ty} on {dialect}: {other}"),
                }
            }
        }
    }

    #[test]
    fn test_transactional_ddl_flags() {
        assert!(Dialect::Sqlite.supports_transactional_ddl());
        assert!(Dialect::Postgres.supports_transactional_ddl());
        assert!(!Dialect::SqlServer.supports_transactional_ddl());
    }

    #[test]
    fn test_quote_escapes_embedded_quote() {
        let generator = Dialect::Postgres.generator();
        assert_eq!(generator.quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
