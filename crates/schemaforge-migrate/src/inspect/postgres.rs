//! PostgreSQL catalog inspection.
//!
//! One pass over `information_schema` for tables and columns, then
//! `pg_constraint`/`pg_index` joins for keys, foreign keys, checks, and
//! indexes. Indexes that merely back a constraint (primary key or unique
//! constraint) are excluded; those surface through their constraint
//! entities instead.

use std::collections::HashMap;

use schemaforge_core::schema::{
    CheckConstraint, Column, ForeignKey, Index, PrimaryKey, Schema, Table, UniqueConstraint,
};
use schemaforge_core::types::{PortableType, DEFAULT_GEOGRAPHY_SRID, MAX_LENGTH};

use crate::connection::{catalog_error, SchemaConnection, SqlRow};
use crate::dialect::Dialect;
use crate::error::Result;

use super::action_from_keyword;

const SYSTEM_SCHEMAS: &str = "('pg_catalog', 'information_schema')";

pub(crate) async fn inspect(conn: &mut dyn SchemaConnection) -> Result<Schema> {
    let err = |e| catalog_error(Dialect::Postgres, &e);

    let enum_rows = conn
        .query(
            "SELECT t.typname AS enum_name, e.enumlabel AS enum_value \
             FROM pg_type t \
             JOIN pg_enum e ON e.enumtypid = t.oid \
             ORDER BY t.typname, e.enumsortorder",
        )
        .await
        .map_err(err)?;
    let enums = collect_enums(&enum_rows);

    let table_rows = conn
        .query(&format!(
            "SELECT table_schema, table_name \
             FROM information_schema.tables \
             WHERE table_type = 'BASE TABLE' \
               AND table_schema NOT IN {SYSTEM_SCHEMAS} \
             ORDER BY table_schema, table_name"
        ))
        .await
        .map_err(err)?;

    let column_rows = conn
        .query(&format!(
            "SELECT table_schema, table_name, column_name, data_type, udt_name, \
                    is_nullable, column_default, is_identity, \
                    identity_start, identity_increment, \
                    character_maximum_length::int4 AS character_maximum_length, \
                    numeric_precision::int4 AS numeric_precision, \
                    numeric_scale::int4 AS numeric_scale, \
                    datetime_precision::int4 AS datetime_precision, \
                    collation_name, is_generated, generation_expression, \
                    ordinal_position::int4 AS ordinal_position \
             FROM information_schema.columns \
             WHERE table_schema NOT IN {SYSTEM_SCHEMAS} \
             ORDER BY table_schema, table_name, ordinal_position"
        ))
        .await
        .map_err(err)?;

    let key_rows = conn
        .query(&format!(
            "SELECT tc.table_schema, tc.table_name, tc.constraint_name, \
                    tc.constraint_type, kcu.column_name, \
                    kcu.ordinal_position::int4 AS ordinal_position \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON kcu.constraint_name = tc.constraint_name \
              AND kcu.table_schema = tc.table_schema \
              AND kcu.table_name = tc.table_name \
             WHERE tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE') \
               AND tc.table_schema NOT IN {SYSTEM_SCHEMAS} \
             ORDER BY tc.table_schema, tc.table_name, tc.constraint_name, \
                      kcu.ordinal_position"
        ))
        .await
        .map_err(err)?;

    let check_rows = conn
        .query(&format!(
            "SELECT n.nspname AS table_schema, t.relname AS table_name, \
                    con.conname AS constraint_name, \
                    pg_get_constraintdef(con.oid) AS definition \
             FROM pg_constraint con \
             JOIN pg_class t ON con.conrelid = t.oid \
             JOIN pg_namespace n ON t.relnamespace = n.oid \
             WHERE con.contype = 'c' \
               AND n.nspname NOT IN {SYSTEM_SCHEMAS} \
             ORDER BY n.nspname, t.relname, con.conname"
        ))
        .await
        .map_err(err)?;

    let fk_rows = conn
        .query(&format!(
            "SELECT con.conname AS constraint_name, \
                    src_ns.nspname AS table_schema, src.relname AS table_name, \
                    att.attname AS column_name, \
                    tgt_ns.nspname AS referenced_schema, \
                    tgt.relname AS referenced_table, \
                    att2.attname AS referenced_column, \
                    con.confdeltype::text AS on_delete, \
                    con.confupdtype::text AS on_update, \
                    k.ord::int4 AS position \
             FROM pg_constraint con \
             JOIN LATERAL unnest(con.conkey, con.confkey) \
                  WITH ORDINALITY AS k(attnum, fattnum, ord) ON true \
             JOIN pg_class src ON src.oid = con.conrelid \
             JOIN pg_namespace src_ns ON src_ns.oid = src.relnamespace \
             JOIN pg_class tgt ON tgt.oid = con.confrelid \
             JOIN pg_namespace tgt_ns ON tgt_ns.oid = tgt.relnamespace \
             JOIN pg_attribute att \
               ON att.attrelid = con.conrelid AND att.attnum = k.attnum \
             JOIN pg_attribute att2 \
               ON att2.attrelid = con.confrelid AND att2.attnum = k.fattnum \
             WHERE con.contype = 'f' \
               AND src_ns.nspname NOT IN {SYSTEM_SCHEMAS} \
             ORDER BY src_ns.nspname, src.relname, con.conname, k.ord"
        ))
        .await
        .map_err(err)?;

    let index_rows = conn
        .query(&format!(
            "SELECT ns.nspname AS table_schema, t.relname AS table_name, \
                    i.relname AS index_name, ix.indisunique AS is_unique, \
                    a.attname AS column_name, k.ord::int4 AS position, \
                    pg_get_expr(ix.indpred, ix.indrelid) AS filter, \
                    pg_get_expr(ix.indexprs, ix.indrelid) AS expressions \
             FROM pg_index ix \
             JOIN pg_class i ON i.oid = ix.indexrelid \
             JOIN pg_class t ON t.oid = ix.indrelid \
             JOIN pg_namespace ns ON ns.oid = t.relnamespace \
             JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord) ON true \
             LEFT JOIN pg_attribute a \
               ON a.attrelid = t.oid AND a.attnum = k.attnum AND k.attnum <> 0 \
             WHERE NOT ix.indisprimary \
               AND ns.nspname NOT IN {SYSTEM_SCHEMAS} \
               AND NOT EXISTS (SELECT 1 FROM pg_constraint c \
                               WHERE c.conindid = ix.indexrelid) \
             ORDER BY ns.nspname, t.relname, i.relname, k.ord"
        ))
        .await
        .map_err(err)?;

    let mut schema = Schema::new("database");
    for table_row in &table_rows {
        let (Some(namespace), Some(name)) =
            (table_row.text("table_schema"), table_row.text("table_name"))
        else {
            continue;
        };

        let mut table = Table::new(name).namespace(namespace);
        let in_table = |row: &&SqlRow| {
            row.text("table_schema") == Some(namespace) && row.text("table_name") == Some(name)
        };

        for row in column_rows.iter().filter(in_table) {
            table.columns.push(column_from_row(row, &enums));
        }
        assemble_keys(&mut table, key_rows.iter().filter(in_table));
        for row in check_rows.iter().filter(in_table) {
            let (Some(constraint_name), Some(definition)) =
                (row.text("constraint_name"), row.text("definition"))
            else {
                continue;
            };
            table.check_constraints.push(CheckConstraint::new(
                constraint_name,
                strip_check_wrapper(definition),
            ));
        }
        assemble_foreign_keys(&mut table, fk_rows.iter().filter(in_table));
        assemble_indices(&mut table, index_rows.iter().filter(in_table));

        schema.tables.push(table);
    }
    Ok(schema)
}

fn collect_enums(rows: &[SqlRow]) -> HashMap<String, Vec<String>> {
    let mut enums: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        let (Some(name), Some(value)) = (row.text("enum_name"), row.text("enum_value")) else {
            continue;
        };
        enums
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
    }
    enums
}

fn column_from_row(row: &SqlRow, enums: &HashMap<String, Vec<String>>) -> Column {
    let name = row.text("column_name").unwrap_or_default();
    let ty = type_from_catalog(row, enums);
    let mut column = Column::new(name, ty);
    column.nullable = row.text("is_nullable") != Some("NO");

    if row.text("is_identity") == Some("YES") {
        column.identity = true;
        column.nullable = false;
        if let Some(seed) = row.text("identity_start").and_then(|s| s.parse().ok()) {
            column.seed = seed;
        }
        if let Some(step) = row.text("identity_increment").and_then(|s| s.parse().ok()) {
            column.increment = step;
        }
    } else if let Some(default) = row.text("column_default") {
        column.default_sql = Some(default.to_string());
    }

    if row.text("is_generated") == Some("ALWAYS") {
        column.computed_expression = row.text("generation_expression").map(str::to_string);
        column.persisted = true;
        column.default_sql = None;
    }
    column.collation = row.text("collation_name").map(str::to_string);
    column
}

fn type_from_catalog(row: &SqlRow, enums: &HashMap<String, Vec<String>>) -> PortableType {
    let data_type = row.text("data_type").unwrap_or_default();
    let udt_name = row.text("udt_name").unwrap_or_default();
    let char_length = row.int("character_maximum_length");
    let dt_precision = row
        .int("datetime_precision")
        .map_or(6, |p| p.clamp(0, 7) as u8);

    match data_type {
        "smallint" => PortableType::SmallInt,
        "integer" => PortableType::Int,
        "bigint" => PortableType::BigInt,
        "numeric" => {
            let precision = row.int("numeric_precision").unwrap_or(38).clamp(1, 38);
            let scale = row
                .int("numeric_scale")
                .unwrap_or(0)
                .clamp(0, precision);
            PortableType::Decimal {
                precision: precision as u8,
                scale: scale as u8,
            }
        }
        "money" => PortableType::Money,
        "real" => PortableType::Float,
        "double precision" => PortableType::Double,
        "character" => PortableType::Char {
            length: char_length.map_or(1, |l| l.max(1) as u32),
        },
        "character varying" => match char_length {
            Some(length) if length > 0 => PortableType::VarChar {
                max_length: length as u32,
            },
            _ => PortableType::VarChar {
                max_length: MAX_LENGTH,
            },
        },
        "text" => PortableType::Text,
        "bytea" => PortableType::Blob,
        "date" => PortableType::Date,
        "time without time zone" | "time with time zone" => PortableType::Time {
            precision: dt_precision,
        },
        "timestamp without time zone" => PortableType::DateTime {
            precision: dt_precision,
        },
        "timestamp with time zone" => PortableType::DateTimeOffset,
        "uuid" => PortableType::Uuid,
        "boolean" => PortableType::Boolean,
        "json" | "jsonb" => PortableType::Json,
        "xml" => PortableType::Xml,
        "USER-DEFINED" => {
            if let Some(values) = enums.get(udt_name) {
                PortableType::Enum {
                    name: udt_name.to_string(),
                    values: values.clone(),
                }
            } else if udt_name == "geometry" {
                PortableType::Geometry { srid: None }
            } else if udt_name == "geography" {
                PortableType::Geography {
                    srid: DEFAULT_GEOGRAPHY_SRID,
                }
            } else {
                PortableType::Text
            }
        }
        _ => PortableType::Text,
    }
}

fn assemble_keys<'a>(table: &mut Table, rows: impl Iterator<Item = &'a SqlRow>) {
    // Rows arrive ordered by constraint then ordinal, so consecutive rows
    // with the same constraint name belong together.
    let mut groups: Vec<(String, String, Vec<String>)> = Vec::new();
    for row in rows {
        let (Some(constraint), Some(kind), Some(column)) = (
            row.text("constraint_name"),
            row.text("constraint_type"),
            row.text("column_name"),
        ) else {
            continue;
        };
        match groups.last_mut() {
            Some((name, _, columns)) if name == constraint => {
                columns.push(column.to_string());
            }
            _ => groups.push((
                constraint.to_string(),
                kind.to_string(),
                vec![column.to_string()],
            )),
        }
    }
    for (name, kind, columns) in groups {
        if kind == "PRIMARY KEY" {
            table.primary_key = Some(PrimaryKey::new(columns).named(name));
        } else {
            table
                .unique_constraints
                .push(UniqueConstraint::new(columns).named(name));
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
        fk.on_delete = action_from_code(row.text("on_delete").unwrap_or(""));
        fk.on_update = action_from_code(row.text("on_update").unwrap_or(""));
        table.foreign_keys.push(fk);
    }
}

fn assemble_indices<'a>(table: &mut Table, rows: impl Iterator<Item = &'a SqlRow>) {
    struct Pending {
        name: String,
        unique: bool,
        columns: Vec<Option<String>>,
        filter: Option<String>,
        expressions: Option<String>,
    }

    let mut pending: Vec<Pending> = Vec::new();
    for row in rows {
        let Some(index_name) = row.text("index_name") else {
            continue;
        };
        let column = row.text("column_name").map(str::to_string);
        match pending.last_mut() {
            Some(p) if p.name == index_name => p.columns.push(column),
            _ => pending.push(Pending {
                name: index_name.to_string(),
                unique: row.boolean("is_unique").unwrap_or(false),
                columns: vec![column],
                filter: row.text("filter").map(str::to_string),
                expressions: row.text("expressions").map(str::to_string),
            }),
        }
    }

    for p in pending {
        let mut index = if p.columns.iter().any(Option::is_none) {
            // Expression elements have no attribute name; pg_get_expr hands
            // back the full comma-separated expression list.
            let expressions = p
                .expressions
                .map(|text| {
                    split_top_level(&text)
                        .into_iter()
                        .map(|e| e.trim().to_string())
                        .collect()
                })
                .unwrap_or_default();
            Index::on_expressions(p.name, expressions)
        } else {
            Index::on_columns(p.name, p.columns.into_iter().flatten().collect())
        };
        if p.unique {
            index = index.unique();
        }
        index.filter = p.filter;
        table.indices.push(index);
    }
}

/// `pg_constraint.confdeltype` / `confupdtype` single-letter codes.
fn action_from_code(code: &str) -> schemaforge_core::schema::ForeignKeyAction {
    use schemaforge_core::schema::ForeignKeyAction;
    match code {
        "c" => ForeignKeyAction::Cascade,
        "n" => ForeignKeyAction::SetNull,
        "d" => ForeignKeyAction::SetDefault,
        "r" => ForeignKeyAction::Restrict,
        _ => action_from_keyword(code),
    }
}

/// `pg_get_constraintdef` renders `CHECK ((expr))`; keep just the expr.
fn strip_check_wrapper(definition: &str) -> String {
    let trimmed = definition.trim();
    let body = trimmed
        .strip_prefix("CHECK")
        .map_or(trimmed, str::trim_start);
    let mut inner = body;
    while let Some(stripped) = inner
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        if !balanced(stripped) {
            break;
        }
        inner = stripped.trim();
    }
    inner.to_string()
}

fn balanced(s: &str) -> bool {
    let mut depth = 0i64;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return false;
        }
    }
    depth == 0
}

fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut start = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => depth = depth.saturating_sub(1),
            ',' if !in_string && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::SqlValue;

    fn text(v: &str) -> SqlValue {
        SqlValue::Text(v.to_string())
    }

    fn column_row(pairs: Vec<(&str, SqlValue)>) -> SqlRow {
        SqlRow::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_type_reconstruction() {
        let enums = HashMap::new();
        let row = column_row(vec![
            ("data_type", text("numeric")),
            ("numeric_precision", SqlValue::Int(18)),
            ("numeric_scale", SqlValue::Int(2)),
        ]);
        assert_eq!(
            type_from_catalog(&row, &enums),
            PortableType::Decimal {
                precision: 18,
                scale: 2
            }
        );

        let row = column_row(vec![
            ("data_type", text("character varying")),
            ("character_maximum_length", SqlValue::Int(255)),
        ]);
        assert_eq!(
            type_from_catalog(&row, &enums),
            PortableType::VarChar { max_length: 255 }
        );

        let row = column_row(vec![("data_type", text("character varying"))]);
        assert_eq!(
            type_from_catalog(&row, &enums),
            PortableType::VarChar {
                max_length: MAX_LENGTH
            }
        );

        let row = column_row(vec![("data_type", text("timestamp with time zone"))]);
        assert_eq!(type_from_catalog(&row, &enums), PortableType::DateTimeOffset);
    }

    #[test]
    fn test_enum_reconstruction() {
        let mut enums = HashMap::new();
        enums.insert(
            "mood".to_string(),
            vec!["happy".to_string(), "sad".to_string()],
        );
        let row = column_row(vec![
            ("data_type", text("USER-DEFINED")),
            ("udt_name", text("mood")),
        ]);
        let PortableType::Enum { name, values } = type_from_catalog(&row, &enums) else {
            panic!("expected Enum");
        };
        assert_eq!(name, "mood");
        assert_eq!(values, vec!["happy".to_string(), "sad".to_string()]);
    }

    #[test]
    fn test_identity_column() {
        let enums = HashMap::new();
        let row = column_row(vec![
            ("column_name", text("id")),
            ("data_type", text("bigint")),
            ("is_nullable", text("NO")),
            ("is_identity", text("YES")),
            ("identity_start", text("100")),
            ("identity_increment", text("5")),
        ]);
        let column = column_from_row(&row, &enums);
        assert!(column.identity);
        assert!(!column.is_nullable());
        assert_eq!((column.seed, column.increment), (100, 5));
        assert_eq!(column.default_sql, None);
    }

    #[test]
    fn test_check_wrapper_stripped() {
        assert_eq!(strip_check_wrapper("CHECK ((price > 0))"), "price > 0");
        assert_eq!(
            strip_check_wrapper("CHECK (((a > 0) AND (b > 0)))"),
            "(a > 0) AND (b > 0)"
        );
    }

    #[test]
    fn test_action_codes() {
        use schemaforge_core::schema::ForeignKeyAction;
        assert_eq!(action_from_code("c"), ForeignKeyAction::Cascade);
        assert_eq!(action_from_code("n"), ForeignKeyAction::SetNull);
        assert_eq!(action_from_code("d"), ForeignKeyAction::SetDefault);
        assert_eq!(action_from_code("r"), ForeignKeyAction::Restrict);
        assert_eq!(action_from_code("a"), ForeignKeyAction::NoAction);
    }

    #[test]
    fn test_assemble_keys_orders_columns() {
        let mut table = Table::new("t");
        let rows = vec![
            column_row(vec![
                ("constraint_name", text("pk_t")),
                ("constraint_type", text("PRIMARY KEY")),
                ("column_name", text("a")),
            ]),
            column_row(vec![
                ("constraint_name", text("pk_t")),
                ("constraint_type", text("PRIMARY KEY")),
                ("column_name", text("b")),
            ]),
            column_row(vec![
                ("constraint_name", text("uq_t_c")),
                ("constraint_type", text("UNIQUE")),
                ("column_name", text("c")),
            ]),
        ];
        assemble_keys(&mut table, rows.iter());
        assert_eq!(
            table.primary_key.as_ref().unwrap().columns,
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(table.unique_constraints.len(), 1);
    }

    #[test]
    fn test_assemble_composite_foreign_key() {
        let mut table = Table::new("t");
        let rows = vec![
            column_row(vec![
                ("constraint_name", text("fk_t")),
                ("column_name", text("a1")),
                ("referenced_table", text("other")),
                ("referenced_schema", text("public")),
                ("referenced_column", text("b1")),
                ("on_delete", text("c")),
                ("on_update", text("a")),
            ]),
            column_row(vec![
                ("constraint_name", text("fk_t")),
                ("column_name", text("a2")),
                ("referenced_column", text("b2")),
            ]),
        ];
        assemble_foreign_keys(&mut table, rows.iter());
        assert_eq!(table.foreign_keys.len(), 1);
        let fk = &table.foreign_keys[0];
        assert_eq!(fk.columns, vec!["a1".to_string(), "a2".to_string()]);
        assert_eq!(
            fk.referenced_columns,
            vec!["b1".to_string(), "b2".to_string()]
        );
        assert_eq!(
            fk.on_delete,
            schemaforge_core::schema::ForeignKeyAction::Cascade
        );
    }

    #[test]
    fn test_assemble_expression_index() {
        let mut table = Table::new("t");
        let rows = vec![column_row(vec![
            ("index_name", text("uq_name_ci")),
            ("is_unique", SqlValue::Bool(true)),
            ("column_name", SqlValue::Null),
            ("expressions", text("lower(name)")),
            ("filter", SqlValue::Null),
        ])];
        assemble_indices(&mut table, rows.iter());
        assert_eq!(table.indices.len(), 1);
        assert!(table.indices[0].unique);
        assert_eq!(
            table.indices[0].expressions,
            vec!["lower(name)".to_string()]
        );
    }
}
