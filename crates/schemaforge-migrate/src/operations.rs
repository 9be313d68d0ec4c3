//! Migration operations.
//!
//! The closed set of schema changes the engine can express. The diff engine
//! emits these, the dialect generators lower them to SQL, and the runner
//! executes them in order.

use serde::{Deserialize, Serialize};

use schemaforge_core::schema::{
    CheckConstraint, Column, ForeignKey, Index, PrimaryKey, Table, UniqueConstraint,
};

/// Which properties of a column an [`MigrationOperation::AlterColumn`]
/// touches. The desired values travel in the operation's `column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ColumnChanges {
    /// The data type changed.
    #[serde(default, skip_serializing_if = "is_false")]
    pub ty: bool,
    /// The nullability changed.
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    /// The default changed (including being dropped).
    #[serde(default, skip_serializing_if = "is_false")]
    pub default: bool,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl ColumnChanges {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.ty || self.nullable || self.default)
    }
}

/// A single migration operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MigrationOperation {
    /// Create a table with its columns, key, and table constraints.
    /// Indices are created by separate [`MigrationOperation::CreateIndex`]
    /// operations that follow in the plan.
    CreateTable {
        /// Full table declaration.
        table: Table,
    },

    /// Drop a table.
    DropTable {
        /// Schema namespace.
        schema: String,
        /// Table name.
        table_name: String,
    },

    /// Add a column to an existing table.
    AddColumn {
        /// Schema namespace.
        schema: String,
        /// Table name.
        table: String,
        /// Column declaration.
        column: Column,
    },

    /// Drop a column.
    DropColumn {
        /// Schema namespace.
        schema: String,
        /// Table name.
        table: String,
        /// Column name.
        column_name: String,
    },

    /// Alter a column's type, nullability, or default.
    AlterColumn {
        /// Schema namespace.
        schema: String,
        /// Table name.
        table: String,
        /// Desired column declaration.
        column: Column,
        /// Which properties differ from the current column.
        changes: ColumnChanges,
    },

    /// Create an index.
    CreateIndex {
        /// Schema namespace.
        schema: String,
        /// Table name.
        table: String,
        /// Index declaration.
        index: Index,
    },

    /// Drop an index.
    DropIndex {
        /// Schema namespace.
        schema: String,
        /// Table name (required by SQL Server's `DROP INDEX ... ON`).
        table: String,
        /// Index name.
        index_name: String,
    },

    /// Add a foreign-key constraint.
    AddForeignKey {
        /// Schema namespace.
        schema: String,
        /// Table name.
        table: String,
        /// Foreign-key declaration.
        foreign_key: ForeignKey,
    },

    /// Drop a foreign-key constraint.
    DropForeignKey {
        /// Schema namespace.
        schema: String,
        /// Table name.
        table: String,
        /// Constraint name.
        constraint_name: String,
    },

    /// Add a unique constraint.
    AddUniqueConstraint {
        /// Schema namespace.
        schema: String,
        /// Table name.
        table: String,
        /// Constraint declaration.
        constraint: UniqueConstraint,
    },

    /// Drop a unique constraint.
    DropUniqueConstraint {
        /// Schema namespace.
        schema: String,
        /// Table name.
        table: String,
        /// Constraint name.
        constraint_name: String,
    },

    /// Add a table-level check constraint.
    AddCheckConstraint {
        /// Schema namespace.
        schema: String,
        /// Table name.
        table: String,
        /// Constraint declaration.
        constraint: CheckConstraint,
    },

    /// Drop a table-level check constraint.
    DropCheckConstraint {
        /// Schema namespace.
        schema: String,
        /// Table name.
        table: String,
        /// Constraint name.
        constraint_name: String,
    },

    /// Add a primary key to a table that has none.
    AddPrimaryKey {
        /// Schema namespace.
        schema: String,
        /// Table name.
        table: String,
        /// Primary-key declaration.
        primary_key: PrimaryKey,
    },

    /// Drop a table's primary key.
    DropPrimaryKey {
        /// Schema namespace.
        schema: String,
        /// Table name.
        table: String,
        /// Constraint name, when the catalog reported one.
        constraint_name: Option<String>,
    },
}

impl MigrationOperation {
    // Convenience constructors, mirroring how the diff engine builds plans.

    /// Creates a `CreateTable` operation.
    #[must_use]
    pub fn create_table(table: Table) -> Self {
        Self::CreateTable { table }
    }

    /// Creates a `DropTable` operation.
    #[must_use]
    pub fn drop_table(schema: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self::DropTable {
            schema: schema.into(),
            table_name: table_name.into(),
        }
    }

    /// Creates an `AddColumn` operation.
    #[must_use]
    pub fn add_column(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: Column,
    ) -> Self {
        Self::AddColumn {
            schema: schema.into(),
            table: table.into(),
            column,
        }
    }

    /// Creates a `DropColumn` operation.
    #[must_use]
    pub fn drop_column(
        schema: impl Into<String>,
        table: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Self {
        Self::DropColumn {
            schema: schema.into(),
            table: table.into(),
            column_name: column_name.into(),
        }
    }

    /// Creates a `CreateIndex` operation.
    #[must_use]
    pub fn create_index(
        schema: impl Into<String>,
        table: impl Into<String>,
        index: Index,
    ) -> Self {
        Self::CreateIndex {
            schema: schema.into(),
            table: table.into(),
            index,
        }
    }

    /// Creates a `DropIndex` operation.
    #[must_use]
    pub fn drop_index(
        schema: impl Into<String>,
        table: impl Into<String>,
        index_name: impl Into<String>,
    ) -> Self {
        Self::DropIndex {
            schema: schema.into(),
            table: table.into(),
            index_name: index_name.into(),
        }
    }

    /// Creates an `AddForeignKey` operation.
    #[must_use]
    pub fn add_foreign_key(
        schema: impl Into<String>,
        table: impl Into<String>,
        foreign_key: ForeignKey,
    ) -> Self {
        Self::AddForeignKey {
            schema: schema.into(),
            table: table.into(),
            foreign_key,
        }
    }

    /// Creates a `DropForeignKey` operation.
    #[must_use]
    pub fn drop_foreign_key(
        schema: impl Into<String>,
        table: impl Into<String>,
        constraint_name: impl Into<String>,
    ) -> Self {
        Self::DropForeignKey {
            schema: schema.into(),
            table: table.into(),
            constraint_name: constraint_name.into(),
        }
    }

    /// Short kind tag for logging.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::CreateTable { .. } => "CreateTable",
            Self::DropTable { .. } => "DropTable",
            Self::AddColumn { .. } => "AddColumn",
            Self::DropColumn { .. } => "DropColumn",
            Self::AlterColumn { .. } => "AlterColumn",
            Self::CreateIndex { .. } => "CreateIndex",
            Self::DropIndex { .. } => "DropIndex",
            Self::AddForeignKey { .. } => "AddForeignKey",
            Self::DropForeignKey { .. } => "DropForeignKey",
            Self::AddUniqueConstraint { .. } => "AddUniqueConstraint",
            Self::DropUniqueConstraint { .. } => "DropUniqueConstraint",
            Self::AddCheckConstraint { .. } => "AddCheckConstraint",
            Self::DropCheckConstraint { .. } => "DropCheckConstraint",
            Self::AddPrimaryKey { .. } => "AddPrimaryKey",
            Self::DropPrimaryKey { .. } => "DropPrimaryKey",
        }
    }

    /// Returns true for operations that remove or rewrite existing schema.
    /// The runner refuses these unless the caller opted in.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Self::DropTable { .. }
                | Self::DropColumn { .. }
                | Self::DropIndex { .. }
                | Self::DropForeignKey { .. }
                | Self::DropUniqueConstraint { .. }
                | Self::DropCheckConstraint { .. }
                | Self::DropPrimaryKey { .. }
                | Self::AlterColumn { .. }
        )
    }

    /// Returns a human-readable description of this operation.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable { table } => format!("Create table '{}'", table.name),
            Self::DropTable { table_name, .. } => format!("Drop table '{table_name}'"),
            Self::AddColumn { table, column, .. } => {
                format!("Add column '{}' to table '{table}'", column.name)
            }
            Self::DropColumn {
                table, column_name, ..
            } => format!("Drop column '{column_name}' from table '{table}'"),
            Self::AlterColumn { table, column, .. } => {
                format!("Alter column '{}' in table '{table}'", column.name)
            }
            Self::CreateIndex { table, index, .. } => {
                format!("Create index '{}' on table '{table}'", index.name)
            }
            Self::DropIndex { index_name, .. } => format!("Drop index '{index_name}'"),
            Self::AddForeignKey {
                table, foreign_key, ..
            } => format!(
                "Add foreign key '{}' to table '{table}'",
                foreign_key.name.as_deref().unwrap_or("<anonymous>")
            ),
            Self::DropForeignKey {
                table,
                constraint_name,
                ..
            } => format!("Drop foreign key '{constraint_name}' from table '{table}'"),
            Self::AddUniqueConstraint {
                table, constraint, ..
            } => format!(
                "Add unique constraint '{}' to table '{table}'",
                constraint.name.as_deref().unwrap_or("<anonymous>")
            ),
            Self::DropUniqueConstraint {
                table,
                constraint_name,
                ..
            } => format!("Drop unique constraint '{constraint_name}' from table '{table}'"),
            Self::AddCheckConstraint {
                table, constraint, ..
            } => format!(
                "Add check constraint '{}' to table '{table}'",
                constraint.name
            ),
            Self::DropCheckConstraint {
                table,
                constraint_name,
                ..
            } => format!("Drop check constraint '{constraint_name}' from table '{table}'"),
            Self::AddPrimaryKey { table, .. } => format!("Add primary key to table '{table}'"),
            Self::DropPrimaryKey { table, .. } => {
                format!("Drop primary key from table '{table}'")
            }
        }
    }
}
