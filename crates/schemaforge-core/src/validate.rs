//! Structural invariant checks for declared schemas.
//!
//! A schema that fails these checks would produce DDL that no dialect can
//! execute, so the diff engine validates the desired schema before emitting
//! any operation.

use std::collections::HashSet;

use crate::error::{Result, SchemaError};
use crate::schema::{Column, Schema, Table};

/// Validates every table in the schema. Returns the first violation found.
pub fn validate_schema(schema: &Schema) -> Result<()> {
    for table in &schema.tables {
        validate_table(table)?;
    }
    Ok(())
}

/// Validates a single table against the structural invariants.
pub fn validate_table(table: &Table) -> Result<()> {
    let invalid = |reason: String, location: String| SchemaError::Invalid { reason, location };

    // Column names unique under case-insensitive comparison.
    let mut seen: HashSet<String> = HashSet::new();
    for column in &table.columns {
        if !seen.insert(column.name.to_ascii_lowercase()) {
            return Err(invalid(
                format!("duplicate column name '{}'", column.name),
                format!("{}.{}", table.name, column.name),
            ));
        }
        column.ty.check_params().map_err(|e| {
            invalid(e.to_string(), format!("{}.{}", table.name, column.name))
        })?;

        if column.identity && !column.ty.is_integer() {
            return Err(invalid(
                format!(
                    "identity requires an integer type, found {}",
                    column.ty.variant_name()
                ),
                format!("{}.{}", table.name, column.name),
            ));
        }
        if column.computed_expression.is_some()
            && (column.default_sql.is_some()
                || column.default_portable.is_some()
                || column.identity)
        {
            return Err(invalid(
                "a computed column cannot carry a default or identity".to_string(),
                format!("{}.{}", table.name, column.name),
            ));
        }
    }

    let column_exists = |name: &str| table.column_named(name).is_some();
    let check_columns = |columns: &[String], what: &str, location: &str| -> Result<()> {
        if columns.is_empty() {
            return Err(invalid(
                format!("{what} needs at least one column"),
                location.to_string(),
            ));
        }
        for name in columns {
            if !column_exists(name) {
                return Err(invalid(
                    format!("{what} references unknown column '{name}'"),
                    location.to_string(),
                ));
            }
        }
        Ok(())
    };

    if let Some(pk) = &table.primary_key {
        let location = format!(
            "{}#{}",
            table.name,
            pk.name.as_deref().unwrap_or("primary key")
        );
        check_columns(&pk.columns, "primary key", &location)?;
        for name in &pk.columns {
            if table.column_named(name).is_some_and(Column::is_nullable) {
                return Err(invalid(
                    format!("primary-key column '{name}' must be NOT NULL"),
                    location,
                ));
            }
        }
    }

    for index in &table.indices {
        let location = format!("{}#{}", table.name, index.name);
        match (index.columns.is_empty(), index.expressions.is_empty()) {
            (true, true) => {
                return Err(invalid(
                    "index needs columns or expressions".to_string(),
                    location,
                ))
            }
            (false, false) => {
                return Err(invalid(
                    "index cannot mix columns and expressions".to_string(),
                    location,
                ))
            }
            (false, true) => check_columns(&index.columns, "index", &location)?,
            (true, false) => {}
        }
    }

    for uc in &table.unique_constraints {
        let location = format!(
            "{}#{}",
            table.name,
            uc.name.as_deref().unwrap_or("unique constraint")
        );
        check_columns(&uc.columns, "unique constraint", &location)?;
    }

    for fk in &table.foreign_keys {
        let location = format!(
            "{}#{}",
            table.name,
            fk.name.as_deref().unwrap_or("foreign key")
        );
        check_columns(&fk.columns, "foreign key", &location)?;
        if fk.referenced_columns.is_empty() {
            return Err(invalid(
                "foreign key needs referenced columns".to_string(),
                location,
            ));
        }
        if fk.columns.len() != fk.referenced_columns.len() {
            return Err(invalid(
                format!(
                    "foreign key has {} columns but references {}",
                    fk.columns.len(),
                    fk.referenced_columns.len()
                ),
                location,
            ));
        }
    }

    Ok(())
}
