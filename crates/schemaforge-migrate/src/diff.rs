//! Schema diffing.
//!
//! Compares a `current` snapshot (usually from an inspector) against a
//! `desired` declaration and emits the ordered operation list that brings
//! `current` into alignment. Additive by default: nothing is dropped or
//! rewritten unless the caller opts in, so cross-dialect type drift (notably
//! SQLite's lossy affinity) never causes spurious alterations.
//!
//! Matching is by name under case-insensitive comparison; the schema
//! namespace is ignored so a `"public"` declaration compares equal to
//! SQLite's `"main"` catalog.

use schemaforge_core::schema::{Column, Schema, Table};
use schemaforge_core::validate::validate_schema;

use crate::error::Result;
use crate::operations::{ColumnChanges, MigrationOperation};

/// Options controlling what the diff is allowed to emit.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOptions {
    /// Emit drop operations for tables, columns, and constraints present in
    /// `current` but absent from `desired`.
    pub allow_destructive: bool,
    /// Emit `AlterColumn` for type/nullability/default differences on
    /// matched columns. Off by default; differences are tolerated silently.
    pub alter_columns: bool,
}

impl DiffOptions {
    /// Additive-only options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables destructive operations.
    #[must_use]
    pub fn destructive(mut self) -> Self {
        self.allow_destructive = true;
        self
    }

    /// Enables column-alteration inference.
    #[must_use]
    pub fn with_alter_columns(mut self) -> Self {
        self.alter_columns = true;
        self
    }
}

/// Computes ordered operation lists from `(current, desired)` pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaDiff;

impl SchemaDiff {
    /// Compares two schemas and returns the operations that transform
    /// `current` into `desired`, in a stable, deterministic order:
    ///
    /// 1. `CreateTable` for each new table, each followed by its
    ///    `CreateIndex` operations;
    /// 2. column additions (then removals, when destructive) per matched
    ///    table;
    /// 3. constraint/index additions (then removals, when destructive) per
    ///    matched table;
    /// 4. `DropTable` for tables absent from `desired` (when destructive).
    ///
    /// The desired schema is validated first; an invariant violation aborts
    /// the diff.
    pub fn calculate(
        current: &Schema,
        desired: &Schema,
        options: DiffOptions,
    ) -> Result<Vec<MigrationOperation>> {
        validate_schema(desired)?;

        let mut operations = Vec::new();

        // 1. New tables, in desired declaration order. The table travels in
        // the operation without its indices; those follow as explicit
        // CreateIndex operations so the plan replays uniformly.
        for table in &desired.tables {
            if current.table_named(&table.name).is_some() {
                continue;
            }
            let mut created = table.clone();
            created.indices = Vec::new();
            operations.push(MigrationOperation::CreateTable { table: created });
            for index in &table.indices {
                operations.push(MigrationOperation::create_index(
                    table.schema_namespace.clone(),
                    table.name.clone(),
                    index.clone(),
                ));
            }
        }

        // 2. Columns of matched tables.
        for table in &desired.tables {
            let Some(current_table) = current.table_named(&table.name) else {
                continue;
            };
            Self::diff_columns(current_table, table, options, &mut operations);
        }

        // 3. Indices and constraints of matched tables.
        for table in &desired.tables {
            let Some(current_table) = current.table_named(&table.name) else {
                continue;
            };
            Self::diff_constraints(current_table, table, options, &mut operations);
        }

        // 4. Dropped tables, in current declaration order.
        if options.allow_destructive {
            for table in &current.tables {
                if desired.table_named(&table.name).is_none() {
                    operations.push(MigrationOperation::drop_table(
                        table.schema_namespace.clone(),
                        table.name.clone(),
                    ));
                }
            }
        }

        Ok(operations)
    }

    fn diff_columns(
        current: &Table,
        desired: &Table,
        options: DiffOptions,
        operations: &mut Vec<MigrationOperation>,
    ) {
        let schema = desired.schema_namespace.as_str();

        for column in &desired.columns {
            if current.column_named(&column.name).is_none() {
                operations.push(MigrationOperation::add_column(
                    schema,
                    desired.name.clone(),
                    column.clone(),
                ));
            }
        }

        if options.allow_destructive {
            for column in &current.columns {
                if desired.column_named(&column.name).is_none() {
                    operations.push(MigrationOperation::drop_column(
                        schema,
                        desired.name.clone(),
                        column.name.clone(),
                    ));
                }
            }
        }

        if options.alter_columns {
            for column in &desired.columns {
                let Some(current_column) = current.column_named(&column.name) else {
                    continue;
                };
                let changes = Self::column_changes(current_column, column);
                if !changes.is_empty() {
                    operations.push(MigrationOperation::AlterColumn {
                        schema: schema.to_string(),
                        table: desired.name.clone(),
                        column: column.clone(),
                        changes,
                    });
                }
            }
        }
    }

    fn column_changes(current: &Column, desired: &Column) -> ColumnChanges {
        ColumnChanges {
            ty: current.ty != desired.ty,
            nullable: current.is_nullable() != desired.is_nullable(),
            default: current.effective_default() != desired.effective_default(),
        }
    }

    fn diff_constraints(
        current: &Table,
        desired: &Table,
        options: DiffOptions,
        operations: &mut Vec<MigrationOperation>,
    ) {
        let schema = desired.schema_namespace.as_str();
        let table = desired.name.as_str();

        // Additions first, in desired declaration order.
        for index in &desired.indices {
            match find_ci(&current.indices, |i| Some(i.name.as_str()), &index.name) {
                None => operations.push(MigrationOperation::create_index(
                    schema,
                    table,
                    index.clone(),
                )),
                Some(existing) if existing != index && options.allow_destructive => {
                    operations.push(MigrationOperation::drop_index(
                        schema,
                        table,
                        existing.name.clone(),
                    ));
                    operations.push(MigrationOperation::create_index(
                        schema,
                        table,
                        index.clone(),
                    ));
                }
                Some(_) => {}
            }
        }

        for fk in &desired.foreign_keys {
            // Name match first; a structural match also counts, because
            // some catalogs (SQLite's foreign_key_list) drop constraint
            // names on inspection. Anonymous keys only ever match
            // structurally and are additive-only.
            let present = fk
                .name
                .as_deref()
                .is_some_and(|name| {
                    find_ci(&current.foreign_keys, |f| f.name.as_deref(), name).is_some()
                })
                || current.foreign_keys.iter().any(|f| f.same_shape(fk));
            if !present {
                operations.push(MigrationOperation::add_foreign_key(
                    schema,
                    table,
                    fk.clone(),
                ));
            }
        }

        for uc in &desired.unique_constraints {
            let same_columns = |columns: &[String]| {
                columns.len() == uc.columns.len()
                    && columns
                        .iter()
                        .zip(&uc.columns)
                        .all(|(a, b)| a.eq_ignore_ascii_case(b))
            };
            // Catalogs report unique constraints unevenly: SQLite loses the
            // name, and a constraint added after creation lands there as a
            // unique index. Count any of those shapes as present.
            let present = uc
                .name
                .as_deref()
                .is_some_and(|name| {
                    find_ci(&current.unique_constraints, |u| u.name.as_deref(), name).is_some()
                })
                || current
                    .unique_constraints
                    .iter()
                    .any(|u| same_columns(&u.columns))
                || current.indices.iter().any(|i| {
                    i.unique
                        && (same_columns(&i.columns)
                            || uc
                                .name
                                .as_deref()
                                .is_some_and(|n| n.eq_ignore_ascii_case(&i.name)))
                });
            if !present {
                operations.push(MigrationOperation::AddUniqueConstraint {
                    schema: schema.to_string(),
                    table: table.to_string(),
                    constraint: uc.clone(),
                });
            }
        }

        for cc in &desired.check_constraints {
            if find_ci(&current.check_constraints, |c| Some(c.name.as_str()), &cc.name)
                .is_none()
            {
                operations.push(MigrationOperation::AddCheckConstraint {
                    schema: schema.to_string(),
                    table: table.to_string(),
                    constraint: cc.clone(),
                });
            }
        }

        // Removals, when destructive, in current declaration order.
        if !options.allow_destructive {
            return;
        }

        for index in &current.indices {
            if find_ci(&desired.indices, |i| Some(i.name.as_str()), &index.name).is_none() {
                operations.push(MigrationOperation::drop_index(
                    schema,
                    table,
                    index.name.clone(),
                ));
            }
        }

        for fk in &current.foreign_keys {
            let Some(name) = fk.name.as_deref() else {
                // Anonymous keys are never dropped.
                continue;
            };
            if find_ci(&desired.foreign_keys, |f| f.name.as_deref(), name).is_none() {
                operations.push(MigrationOperation::drop_foreign_key(schema, table, name));
            }
        }

        for uc in &current.unique_constraints {
            let Some(name) = uc.name.as_deref() else {
                continue;
            };
            if find_ci(&desired.unique_constraints, |u| u.name.as_deref(), name).is_none() {
                operations.push(MigrationOperation::DropUniqueConstraint {
                    schema: schema.to_string(),
                    table: table.to_string(),
                    constraint_name: name.to_string(),
                });
            }
        }

        for cc in &current.check_constraints {
            if find_ci(&desired.check_constraints, |c| Some(c.name.as_str()), &cc.name)
                .is_none()
            {
                operations.push(MigrationOperation::DropCheckConstraint {
                    schema: schema.to_string(),
                    table: table.to_string(),
                    constraint_name: cc.name.clone(),
                });
            }
        }
    }
}

/// Finds an element whose name matches case-insensitively.
fn find_ci<'a, T>(
    items: &'a [T],
    name_of: impl Fn(&T) -> Option<&str>,
    name: &str,
) -> Option<&'a T> {
    items
        .iter()
        .find(|&item| name_of(item).is_some_and(|n| n.eq_ignore_ascii_case(name)))
}
