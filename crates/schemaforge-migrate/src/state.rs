//! In-memory operation replay.
//!
//! Replays an operation list onto an owned [`Schema`], so a plan can be
//! previewed and its end state compared against the declaration without
//! touching a database. This also backs the additive-idempotence property
//! tests.

use schemaforge_core::schema::Schema;

use crate::error::{MigrateError, Result};
use crate::operations::MigrationOperation;

/// Reconstructs a schema by replaying migration operations.
#[derive(Debug, Default)]
pub struct SchemaState {
    schema: Schema,
}

impl SchemaState {
    /// Starts from an empty schema with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: Schema::new(name),
        }
    }

    /// Starts from an existing snapshot.
    #[must_use]
    pub fn from_schema(schema: Schema) -> Self {
        Self { schema }
    }

    /// Returns the current schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Consumes the state and returns the schema.
    #[must_use]
    pub fn into_schema(self) -> Schema {
        self.schema
    }

    /// Replays a list of operations in order.
    pub fn apply_all(&mut self, operations: &[MigrationOperation]) -> Result<()> {
        for operation in operations {
            self.apply(operation)?;
        }
        Ok(())
    }

    /// Replays a single operation.
    pub fn apply(&mut self, operation: &MigrationOperation) -> Result<()> {
        match operation {
            MigrationOperation::CreateTable { table } => {
                if self.schema.table_named(&table.name).is_some() {
                    return Err(invalid(
                        format!("table '{}' already exists", table.name),
                        &table.name,
                    ));
                }
                self.schema.tables.push(table.clone());
            }

            MigrationOperation::DropTable { table_name, .. } => {
                let position = self
                    .schema
                    .tables
                    .iter()
                    .position(|t| t.name.eq_ignore_ascii_case(table_name))
                    .ok_or_else(|| {
                        invalid(format!("table '{table_name}' does not exist"), table_name)
                    })?;
                self.schema.tables.remove(position);
            }

            MigrationOperation::AddColumn { table, column, .. } => {
                let t = self.table_mut(table)?;
                if t.column_named(&column.name).is_some() {
                    return Err(invalid(
                        format!("column '{}' already exists", column.name),
                        &format!("{table}.{}", column.name),
                    ));
                }
                t.columns.push(column.clone());
            }

            MigrationOperation::DropColumn {
                table, column_name, ..
            } => {
                let t = self.table_mut(table)?;
                let position = t
                    .columns
                    .iter()
                    .position(|c| c.name.eq_ignore_ascii_case(column_name))
                    .ok_or_else(|| {
                        invalid(
                            format!("column '{column_name}' does not exist"),
                            &format!("{table}.{column_name}"),
                        )
                    })?;
                t.columns.remove(position);
            }

            MigrationOperation::AlterColumn { table, column, .. } => {
                let t = self.table_mut(table)?;
                let existing = t
                    .columns
                    .iter_mut()
                    .find(|c| c.name.eq_ignore_ascii_case(&column.name))
                    .ok_or_else(|| {
                        invalid(
                            format!("column '{}' does not exist", column.name),
                            &format!("{table}.{}", column.name),
                        )
                    })?;
                *existing = column.clone();
            }

            MigrationOperation::CreateIndex { table, index, .. } => {
                let t = self.table_mut(table)?;
                if t.indices
                    .iter()
                    .any(|i| i.name.eq_ignore_ascii_case(&index.name))
                {
                    return Err(invalid(
                        format!("index '{}' already exists", index.name),
                        &index.name,
                    ));
                }
                t.indices.push(index.clone());
            }

            MigrationOperation::DropIndex {
                table, index_name, ..
            } => {
                let t = self.table_mut(table)?;
                let position = t
                    .indices
                    .iter()
                    .position(|i| i.name.eq_ignore_ascii_case(index_name))
                    .ok_or_else(|| {
                        invalid(format!("index '{index_name}' does not exist"), index_name)
                    })?;
                t.indices.remove(position);
            }

            MigrationOperation::AddForeignKey {
                table, foreign_key, ..
            } => {
                self.table_mut(table)?.foreign_keys.push(foreign_key.clone());
            }

            MigrationOperation::DropForeignKey {
                table,
                constraint_name,
                ..
            } => {
                let t = self.table_mut(table)?;
                let position = t
                    .foreign_keys
                    .iter()
                    .position(|fk| {
                        fk.name
                            .as_deref()
                            .is_some_and(|n| n.eq_ignore_ascii_case(constraint_name))
                    })
                    .ok_or_else(|| {
                        invalid(
                            format!("foreign key '{constraint_name}' does not exist"),
                            constraint_name,
                        )
                    })?;
                t.foreign_keys.remove(position);
            }

            MigrationOperation::AddUniqueConstraint {
                table, constraint, ..
            } => {
                self.table_mut(table)?
                    .unique_constraints
                    .push(constraint.clone());
            }

            MigrationOperation::DropUniqueConstraint {
                table,
                constraint_name,
                ..
            } => {
                let t = self.table_mut(table)?;
                let position = t
                    .unique_constraints
                    .iter()
                    .position(|uc| {
                        uc.name
                            .as_deref()
                            .is_some_and(|n| n.eq_ignore_ascii_case(constraint_name))
                    })
                    .ok_or_else(|| {
                        invalid(
                            format!("unique constraint '{constraint_name}' does not exist"),
                            constraint_name,
                        )
                    })?;
                t.unique_constraints.remove(position);
            }

            MigrationOperation::AddCheckConstraint {
                table, constraint, ..
            } => {
                self.table_mut(table)?
                    .check_constraints
                    .push(constraint.clone());
            }

            MigrationOperation::DropCheckConstraint {
                table,
                constraint_name,
                ..
            } => {
                let t = self.table_mut(table)?;
                let position = t
                    .check_constraints
                    .iter()
                    .position(|cc| cc.name.eq_ignore_ascii_case(constraint_name))
                    .ok_or_else(|| {
                        invalid(
                            format!("check constraint '{constraint_name}' does not exist"),
                            constraint_name,
                        )
                    })?;
                t.check_constraints.remove(position);
            }

            MigrationOperation::AddPrimaryKey {
                table, primary_key, ..
            } => {
                let t = self.table_mut(table)?;
                if t.primary_key.is_some() {
                    return Err(invalid(
                        format!("table '{table}' already has a primary key"),
                        table,
                    ));
                }
                t.primary_key = Some(primary_key.clone());
            }

            MigrationOperation::DropPrimaryKey { table, .. } => {
                let t = self.table_mut(table)?;
                if t.primary_key.take().is_none() {
                    return Err(invalid(
                        format!("table '{table}' has no primary key"),
                        table,
                    ));
                }
            }
        }
        Ok(())
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut schemaforge_core::schema::Table> {
        self.schema
            .tables
            .iter_mut()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| invalid(format!("table '{name}' does not exist"), name))
    }
}

fn invalid(reason: String, location: &str) -> MigrateError {
    MigrateError::InvalidSchema {
        reason,
        location: location.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DiffOptions, SchemaDiff};
    use schemaforge_core::schema::{Column, Index, PrimaryKey, Table};
    use schemaforge_core::types::PortableType;

    fn library() -> Schema {
        Schema::new("library").table(
            Table::new("books")
                .column(Column::new("id", PortableType::BigInt).identity())
                .column(Column::new("title", PortableType::Text).not_null())
                .primary_key(PrimaryKey::new(vec!["id".to_string()]))
                .index(Index::on_columns("idx_title", vec!["title".to_string()])),
        )
    }

    #[test]
    fn test_replaying_greenfield_plan_reaches_declaration() {
        let desired = library();
        let ops =
            SchemaDiff::calculate(&Schema::new("library"), &desired, DiffOptions::new())
                .unwrap();

        let mut state = SchemaState::new("library");
        state.apply_all(&ops).unwrap();
        assert_eq!(state.schema(), &desired);
    }

    #[test]
    fn test_replay_then_rediff_is_empty() {
        // The in-memory analogue of additive idempotence: once a plan has
        // been applied, diffing the result against the declaration yields
        // nothing.
        let desired = library();
        let ops =
            SchemaDiff::calculate(&Schema::new("library"), &desired, DiffOptions::new())
                .unwrap();

        let mut state = SchemaState::new("library");
        state.apply_all(&ops).unwrap();

        let again =
            SchemaDiff::calculate(state.schema(), &desired, DiffOptions::new()).unwrap();
        assert!(again.is_empty(), "expected empty plan, got {again:?}");
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let mut state = SchemaState::new("db");
        let op = MigrationOperation::create_table(Table::new("t"));
        state.apply(&op).unwrap();
        assert!(state.apply(&op).is_err());
    }

    #[test]
    fn test_drop_missing_column_rejected() {
        let mut state = SchemaState::from_schema(library());
        let op = MigrationOperation::drop_column("public", "books", "missing");
        assert!(state.apply(&op).is_err());
    }

    #[test]
    fn test_drop_table_removes_it() {
        let mut state = SchemaState::from_schema(library());
        state
            .apply(&MigrationOperation::drop_table("public", "books"))
            .unwrap();
        assert!(state.schema().tables.is_empty());
    }
}
