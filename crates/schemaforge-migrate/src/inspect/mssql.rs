//! SQL Server catalog inspection.
//!
//! Reads the `sys.*` catalog views. `nchar`/`nvarchar` lengths arrive in
//! bytes and are halved; `-1` marks the MAX forms. Referential actions come
//! back as the numeric codes of `sys.foreign_keys`.

use schemaforge_core::schema::{
    CheckConstraint, Column, ForeignKey, ForeignKeyAction, Index, PrimaryKey, Schema, Table,
    UniqueConstraint,
};
use schemaforge_core::types::{PortableType, DEFAULT_GEOGRAPHY_SRID, MAX_LENGTH};

use crate::connection::{catalog_error, SchemaConnection, SqlRow};
use crate::dialect::Dialect;
use crate::error::Result;

pub(crate) async fn inspect(conn: &mut dyn SchemaConnection) -> Result<Schema> {
    let err = |e| catalog_error(Dialect::SqlServer, &e);

    let table_rows = conn
        .query(
            "SELECT s.name AS schema_name, t.name AS table_name \
             FROM sys.tables t \
             INNER JOIN sys.schemas s ON t.schema_id = s.schema_id \
             ORDER BY s.name, t.name",
        )
        .await
        .map_err(err)?;

    let column_rows = conn
        .query(
            "SELECT s.name AS schema_name, t.name AS table_name, c.name AS column_name, \
                    typ.name AS type_name, c.max_length, c.precision, c.scale, \
                    c.is_nullable, c.is_identity, c.collation_name, c.column_id, \
                    CAST(ic.seed_value AS BIGINT) AS seed_value, \
                    CAST(ic.increment_value AS BIGINT) AS increment_value, \
                    df.definition AS default_definition, \
                    cc.definition AS computed_definition, cc.is_persisted \
             FROM sys.columns c \
             INNER JOIN sys.tables t ON c.object_id = t.object_id \
             INNER JOIN sys.schemas s ON t.schema_id = s.schema_id \
             INNER JOIN sys.types typ ON c.user_type_id = typ.user_type_id \
             LEFT JOIN sys.identity_columns ic \
               ON ic.object_id = c.object_id AND ic.column_id = c.column_id \
             LEFT JOIN sys.default_constraints df ON df.object_id = c.default_object_id \
             LEFT JOIN sys.computed_columns cc \
               ON cc.object_id = c.object_id AND cc.column_id = c.column_id \
             ORDER BY s.name, t.name, c.column_id",
        )
        .await
        .map_err(err)?;

    let index_rows = conn
        .query(
            "SELECT s.name AS schema_name, t.name AS table_name, i.name AS index_name, \
                    i.is_unique, i.is_primary_key, i.is_unique_constraint, \
                    i.has_filter, i.filter_definition, \
                    col.name AS column_name, ic.key_ordinal \
             FROM sys.indexes i \
             INNER JOIN sys.index_columns ic \
               ON ic.object_id = i.object_id AND ic.index_id = i.index_id \
             INNER JOIN sys.columns col \
               ON col.object_id = ic.object_id AND col.column_id = ic.column_id \
             INNER JOIN sys.tables t ON i.object_id = t.object_id \
             INNER JOIN sys.schemas s ON t.schema_id = s.schema_id \
             WHERE i.name IS NOT NULL AND ic.key_ordinal > 0 \
             ORDER BY s.name, t.name, i.name, ic.key_ordinal",
        )
        .await
        .map_err(err)?;

    let fk_rows = conn
        .query(
            "SELECT fk.name AS constraint_name, \
                    s.name AS schema_name, parent_table.name AS table_name, \
                    parent_column.name AS column_name, \
                    rs.name AS referenced_schema, \
                    referenced_table.name AS referenced_table, \
                    referenced_column.name AS referenced_column, \
                    fk.delete_referential_action, fk.update_referential_action, \
                    fkc.constraint_column_id \
             FROM sys.foreign_key_columns fkc \
             INNER JOIN sys.foreign_keys fk \
               ON fkc.constraint_object_id = fk.object_id \
             INNER JOIN sys.tables parent_table \
               ON fkc.parent_object_id = parent_table.object_id \
             INNER JOIN sys.schemas s ON parent_table.schema_id = s.schema_id \
             INNER JOIN sys.tables referenced_table \
               ON fkc.referenced_object_id = referenced_table.object_id \
             INNER JOIN sys.schemas rs ON referenced_table.schema_id = rs.schema_id \
             INNER JOIN sys.columns parent_column \
               ON fkc.parent_object_id = parent_column.object_id \
              AND fkc.parent_column_id = parent_column.column_id \
             INNER JOIN sys.columns referenced_column \
               ON fkc.referenced_object_id = referenced_column.object_id \
              AND fkc.referenced_column_id = referenced_column.column_id \
             ORDER BY s.name, parent_table.name, fk.name, fkc.constraint_column_id",
        )
        .await
        .map_err(err)?;

    let check_rows = conn
        .query(
            "SELECT s.name AS schema_name, t.name AS table_name, \
                    cc.name AS constraint_name, cc.definition \
             FROM sys.check_constraints cc \
             INNER JOIN sys.tables t ON cc.parent_object_id = t.object_id \
             INNER JOIN sys.schemas s ON t.schema_id = s.schema_id \
             ORDER BY s.name, t.name, cc.name",
        )
        .await
        .map_err(err)?;

    let mut schema = Schema::new("database");
    for table_row in &table_rows {
        let (Some(namespace), Some(name)) =
            (table_row.text("schema_name"), table_row.text("table_name"))
        else {
            continue;
        };

        let mut table = Table::new(name).namespace(namespace);
        let in_table = |row: &&SqlRow| {
            row.text("schema_name") == Some(namespace) && row.text("table_name") == Some(name)
        };

        for row in column_rows.iter().filter(in_table) {
            table.columns.push(column_from_row(row));
        }
        assemble_indices(&mut table, index_rows.iter().filter(in_table));
        assemble_foreign_keys(&mut table, fk_rows.iter().filter(in_table));
        for row in check_rows.iter().filter(in_table) {
            let (Some(constraint_name), Some(definition)) =
                (row.text("constraint_name"), row.text("definition"))
            else {
                continue;
            };
            table
                .check_constraints
                .push(CheckConstraint::new(constraint_name, definition));
        }

        schema.tables.push(table);
    }
    Ok(schema)
}

fn column_from_row(row: &SqlRow) -> Column {
    let name = row.text("column_name").unwrap_or_default();
    let mut column = Column::new(name, type_from_catalog(row));
    column.nullable = row.boolean("is_nullable").unwrap_or(true);

    if row.boolean("is_identity").unwrap_or(false) {
        column.identity = true;
        column.nullable = false;
        if let Some(seed) = row.int("seed_value") {
            column.seed = seed;
        }
        if let Some(step) = row.int("increment_value") {
            column.increment = step;
        }
    }
    // The raw catalog default expression, parens and all.
    column.default_sql = row.text("default_definition").map(str::to_string);
    if let Some(expression) = row.text("computed_definition") {
        column.computed_expression = Some(expression.to_string());
        column.persisted = row.boolean("is_persisted").unwrap_or(false);
        column.default_sql = None;
    }
    column.collation = row.text("collation_name").map(str::to_string);
    column
}

fn type_from_catalog(row: &SqlRow) -> PortableType {
    let type_name = row.text("type_name").unwrap_or_default();
    let max_length = row.int("max_length").unwrap_or(0);
    let precision = row.int("precision").unwrap_or(18).clamp(1, 38) as u8;
    let scale = row.int("scale").unwrap_or(0).clamp(0, 38) as u8;
    let time_precision = row.int("scale").unwrap_or(7).clamp(0, 7) as u8;

    // nchar/nvarchar report byte lengths; -1 is the MAX form.
    let chars = |bytes: i64| (bytes.max(1)) as u32;
    let wide_chars = |bytes: i64| ((bytes / 2).max(1)) as u32;

    match type_name {
        "tinyint" => PortableType::TinyInt,
        "smallint" => PortableType::SmallInt,
        "int" => PortableType::Int,
        "bigint" => PortableType::BigInt,
        "bit" => PortableType::Boolean,
        "decimal" | "numeric" => PortableType::Decimal {
            precision,
            scale: scale.min(precision),
        },
        "money" => PortableType::Money,
        "smallmoney" => PortableType::SmallMoney,
        "real" => PortableType::Float,
        "float" => PortableType::Double,
        "char" => PortableType::Char {
            length: chars(max_length),
        },
        "varchar" => {
            if max_length == -1 {
                PortableType::VarChar {
                    max_length: MAX_LENGTH,
                }
            } else {
                PortableType::VarChar {
                    max_length: chars(max_length),
                }
            }
        }
        "nchar" => PortableType::NChar {
            length: wide_chars(max_length),
        },
        "nvarchar" => {
            if max_length == -1 {
                PortableType::NVarChar {
                    max_length: MAX_LENGTH,
                }
            } else {
                PortableType::NVarChar {
                    max_length: wide_chars(max_length),
                }
            }
        }
        "text" | "ntext" => PortableType::Text,
        "binary" => PortableType::Binary {
            length: chars(max_length),
        },
        "varbinary" => {
            if max_length == -1 {
                PortableType::VarBinary {
                    max_length: MAX_LENGTH,
                }
            } else {
                PortableType::VarBinary {
                    max_length: chars(max_length),
                }
            }
        }
        "image" => PortableType::Blob,
        "date" => PortableType::Date,
        "time" => PortableType::Time {
            precision: time_precision,
        },
        "datetime2" => PortableType::DateTime {
            precision: time_precision,
        },
        "datetime" => PortableType::DateTime { precision: 3 },
        "smalldatetime" => PortableType::DateTime { precision: 0 },
        "datetimeoffset" => PortableType::DateTimeOffset,
        "timestamp" | "rowversion" => PortableType::RowVersion,
        "uniqueidentifier" => PortableType::Uuid,
        "xml" => PortableType::Xml,
        "geometry" => PortableType::Geometry { srid: None },
        "geography" => PortableType::Geography {
            srid: DEFAULT_GEOGRAPHY_SRID,
        },
        _ => PortableType::Text,
    }
}

fn assemble_indices<'a>(table: &mut Table, rows: impl Iterator<Item = &'a SqlRow>) {
    struct Pending {
        name: String,
        primary: bool,
        unique_constraint: bool,
        unique: bool,
        filter: Option<String>,
        columns: Vec<String>,
    }

    let mut pending: Vec<Pending> = Vec::new();
    for row in rows {
        let (Some(index_name), Some(column)) =
            (row.text("index_name"), row.text("column_name"))
        else {
            continue;
        };
        match pending.last_mut() {
            Some(p) if p.name == index_name => p.columns.push(column.to_string()),
            _ => pending.push(Pending {
                name: index_name.to_string(),
                primary: row.boolean("is_primary_key").unwrap_or(false),
                unique_constraint: row.boolean("is_unique_constraint").unwrap_or(false),
                unique: row.boolean("is_unique").unwrap_or(false),
                filter: row
                    .boolean("has_filter")
                    .unwrap_or(false)
                    .then(|| row.text("filter_definition").map(str::to_string))
                    .flatten(),
                columns: vec![column.to_string()],
            }),
        }
    }

    for p in pending {
        if p.primary {
            // The index backing the primary key is reported only through
            // the primary-key entity.
            table.primary_key = Some(PrimaryKey::new(p.columns).named(p.name));
        } else if p.unique_constraint {
            table
                .unique_constraints
                .push(UniqueConstraint::new(p.columns).named(p.name));
        } else {
            let mut index = Index::on_columns(p.name, p.columns);
            if p.unique {
                index = index.unique();
            }
            index.filter = p.filter;
            table.indices.push(index);
        }
    }
}

fn assemble_foreign_keys<'a>(table: &mut Table, rows: impl Iterator<Item = &'a SqlRow>) {
    for row in rows {
        let (Some(constraint), Some(column), Some(referenced_column)) = (
            row.text("constraint_name"),
            row.text("column_name"),
            row.text("referenced_column"),
        ) else {
            continue;
        };
        let existing = table
            .foreign_keys
            .iter_mut()
            .find(|fk| fk.name.as_deref() == Some(constraint));
        if let Some(fk) = existing {
            fk.columns.push(column.to_string());
            fk.referenced_columns.push(referenced_column.to_string());
            continue;
        }

        let mut fk = ForeignKey::new(
            vec![column.to_string()],
            row.text("referenced_table").unwrap_or_default(),
            vec![referenced_column.to_string()],
        )
        .named(constraint);
        fk.referenced_schema = row.text("referenced_schema").map(str::to_string);
        fk.on_delete = action_from_code(row.int("delete_referential_action").unwrap_or(0));
        fk.on_update = action_from_code(row.int("update_referential_action").unwrap_or(0));
        table.foreign_keys.push(fk);
    }
}

/// `sys.foreign_keys` numeric referential-action codes.
fn action_from_code(code: i64) -> ForeignKeyAction {
    match code {
        1 => ForeignKeyAction::Cascade,
        2 => ForeignKeyAction::SetNull,
        3 => ForeignKeyAction::SetDefault,
        _ => ForeignKeyAction::NoAction,
    }
}
