//! SQLite catalog inspection.
//!
//! Built on `sqlite_master` plus the `table_info` / `index_list` /
//! `index_info` / `foreign_key_list` pragmas. Declared types are folded
//! through the affinity rules, so the reconstruction is intentionally
//! lossy: a `Decimal(18,2)` comes back as `Double`, a `VarChar(255)` as
//! `Text`. The catalog namespace `"main"` is reported as `"public"` so a
//! default declaration diffs clean.

use schemaforge_core::schema::{
    Column, ForeignKey, Index, PrimaryKey, Schema, Table, UniqueConstraint,
};
use schemaforge_core::types::PortableType;

use crate::connection::{catalog_error, SchemaConnection, SqlRow};
use crate::dialect::Dialect;
use crate::error::Result;

use super::action_from_keyword;

pub(crate) async fn inspect(conn: &mut dyn SchemaConnection) -> Result<Schema> {
    let err = |e| catalog_error(Dialect::Sqlite, &e);

    let table_rows = conn
        .query(
            "SELECT name, sql FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .await
        .map_err(err)?;

    let mut schema = Schema::new("database");
    for table_row in &table_rows {
        let Some(table_name) = table_row.text("name") else {
            continue;
        };
        let create_sql = table_row.text("sql").unwrap_or_default().to_string();
        let table = inspect_table(conn, table_name, &create_sql).await?;
        schema.tables.push(table);
    }
    Ok(schema)
}

async fn inspect_table(
    conn: &mut dyn SchemaConnection,
    table_name: &str,
    create_sql: &str,
) -> Result<Table> {
    let err = |e| catalog_error(Dialect::Sqlite, &e);
    let quoted = quote(table_name);

    // The namespace "main" is reported as "public"; Table::new defaults it.
    let mut table = Table::new(table_name);

    // Columns, ordered by cid; pk holds the 1-based position within the key.
    let column_rows = conn
        .query(&format!("PRAGMA table_info({quoted})"))
        .await
        .map_err(err)?;

    let mut pk_members: Vec<(i64, String)> = Vec::new();
    for row in &column_rows {
        let Some(name) = row.text("name") else {
            continue;
        };
        let declared = row.text("type").unwrap_or_default();
        let mut column = Column::new(name, type_from_declared(declared));
        column.nullable = row.int("notnull").unwrap_or(0) == 0;
        if let Some(default) = row.get("dflt_value") {
            if !default.is_null() {
                column.default_sql = default.as_str().map(str::to_string).or_else(|| {
                    default.as_i64().map(|v| v.to_string())
                });
            }
        }
        let pk_position = row.int("pk").unwrap_or(0);
        if pk_position > 0 {
            pk_members.push((pk_position, name.to_string()));
        }
        table.columns.push(column);
    }

    if !pk_members.is_empty() {
        pk_members.sort_by_key(|(position, _)| *position);
        let columns: Vec<String> = pk_members.into_iter().map(|(_, name)| name).collect();

        // A lone INTEGER PRIMARY KEY with AUTOINCREMENT is this dialect's
        // identity idiom.
        if columns.len() == 1 && create_sql.to_ascii_uppercase().contains("AUTOINCREMENT") {
            if let Some(column) = table
                .columns
                .iter_mut()
                .find(|c| c.name.eq_ignore_ascii_case(&columns[0]))
            {
                if column.ty.is_integer() {
                    column.identity = true;
                    column.nullable = false;
                }
            }
        }
        table.primary_key = Some(PrimaryKey::new(columns));
    }

    // Index DDL text, for expression lists and partial-index predicates the
    // pragmas do not expose.
    let index_sql_rows = conn
        .query(&format!(
            "SELECT name, sql FROM sqlite_master \
             WHERE type = 'index' AND tbl_name = '{}'",
            table_name.replace('\'', "''")
        ))
        .await
        .map_err(err)?;
    let index_sql = |name: &str| -> Option<&str> {
        index_sql_rows
            .iter()
            .find(|r| r.text("name").is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .and_then(|r| r.text("sql"))
    };

    let index_rows = conn
        .query(&format!("PRAGMA index_list({quoted})"))
        .await
        .map_err(err)?;
    for row in &index_rows {
        let Some(index_name) = row.text("name") else {
            continue;
        };
        let origin = row.text("origin").unwrap_or("c");
        match origin {
            // The implicit index backing the primary key is reported only
            // through the primary-key entity.
            "pk" => continue,
            // Inline UNIQUE constraints surface as auto-indexes; sqlite does
            // not retain their constraint names.
            "u" => {
                let columns = index_columns(conn, index_name).await?;
                let names: Vec<String> = columns.into_iter().flatten().collect();
                if !names.is_empty() {
                    table.unique_constraints.push(UniqueConstraint::new(names));
                }
                continue;
            }
            _ => {}
        }

        let unique = row.boolean("unique").unwrap_or(false);
        let columns = index_columns(conn, index_name).await?;
        let ddl = index_sql(index_name);
        let (expressions, filter) = ddl.map_or((None, None), parse_index_ddl);

        let mut index = if columns.iter().any(Option::is_none) {
            // An expression element has no column name; fall back to the
            // parenthesized list from the CREATE INDEX text.
            Index::on_expressions(index_name, expressions.unwrap_or_default())
        } else {
            Index::on_columns(index_name, columns.into_iter().flatten().collect())
        };
        if unique {
            index = index.unique();
        }
        index.filter = filter;
        table.indices.push(index);
    }

    // Foreign keys, grouped by id, columns in seq order. The pragma does
    // not expose constraint names, so these come back anonymous.
    let fk_rows = conn
        .query(&format!("PRAGMA foreign_key_list({quoted})"))
        .await
        .map_err(err)?;
    table.foreign_keys = group_foreign_keys(&fk_rows);

    Ok(table)
}

async fn index_columns(
    conn: &mut dyn SchemaConnection,
    index_name: &str,
) -> Result<Vec<Option<String>>> {
    let rows = conn
        .query(&format!("PRAGMA index_info({})", quote(index_name)))
        .await
        .map_err(|e| catalog_error(Dialect::Sqlite, &e))?;
    let mut ordered: Vec<(i64, Option<String>)> = rows
        .iter()
        .map(|row| {
            (
                row.int("seqno").unwrap_or(0),
                row.text("name").map(str::to_string),
            )
        })
        .collect();
    ordered.sort_by_key(|(seqno, _)| *seqno);
    Ok(ordered.into_iter().map(|(_, name)| name).collect())
}

fn group_foreign_keys(rows: &[SqlRow]) -> Vec<ForeignKey> {
    let mut keys: Vec<(i64, ForeignKey)> = Vec::new();
    for row in rows {
        let Some(id) = row.int("id") else { continue };
        let Some(from) = row.text("from") else {
            continue;
        };
        let referenced_table = row.text("table").unwrap_or_default().to_string();

        let position = match keys.iter().position(|(key_id, _)| *key_id == id) {
            Some(position) => position,
            None => {
                let mut fk = ForeignKey::new(Vec::new(), referenced_table, Vec::new());
                fk.on_delete = action_from_keyword(row.text("on_delete").unwrap_or(""));
                fk.on_update = action_from_keyword(row.text("on_update").unwrap_or(""));
                keys.push((id, fk));
                keys.len() - 1
            }
        };
        let entry = &mut keys[position].1;
        entry.columns.push(from.to_string());
        if let Some(to) = row.text("to") {
            entry.referenced_columns.push(to.to_string());
        }
    }
    keys.sort_by_key(|(id, _)| *id);
    keys.into_iter().map(|(_, fk)| fk).collect()
}

/// Affinity-driven best-effort type reconstruction, following the order of
/// SQLite's own affinity rules.
fn type_from_declared(declared: &str) -> PortableType {
    let upper = declared.to_ascii_uppercase();
    if upper.is_empty() {
        return PortableType::Blob;
    }
    if upper.contains("INT") {
        return PortableType::BigInt;
    }
    if upper.contains("BOOL") {
        return PortableType::Boolean;
    }
    if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        return PortableType::Text;
    }
    if upper.contains("BLOB") {
        return PortableType::Blob;
    }
    PortableType::Double
}

/// Pulls the parenthesized key list and the partial-index predicate out of
/// a `CREATE INDEX` statement.
fn parse_index_ddl(sql: &str) -> (Option<Vec<String>>, Option<String>) {
    let Some(open) = sql.find('(') else {
        return (None, None);
    };
    let mut depth = 0usize;
    let mut in_string = false;
    let mut close = None;
    for (i, c) in sql[open..].char_indices() {
        match c {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + i);
                    break;
                }
            }
            _ => {}
        }
    }
    let Some(close) = close else {
        return (None, None);
    };

    let inner = &sql[open + 1..close];
    let expressions = split_top_level(inner)
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect::<Vec<_>>();

    let rest = sql[close + 1..].trim();
    let filter = rest
        .get(..5)
        .filter(|prefix| prefix.eq_ignore_ascii_case("WHERE"))
        .map(|_| strip_outer_parens(rest[5..].trim()).to_string());

    (Some(expressions), filter)
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

fn strip_outer_parens(s: &str) -> &str {
    let trimmed = s.trim();
    if let Some(inner) = trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        // Only strip when the parens actually wrap the whole predicate.
        let mut depth = 0i64;
        for c in inner.chars() {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return trimmed;
            }
        }
        return inner.trim();
    }
    trimmed
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::SqliteConnection;
    use crate::diff::{DiffOptions, SchemaDiff};
    use crate::dialect::SqlDialect;
    use schemaforge_core::schema::ForeignKeyAction;

    async fn memory_conn() -> SqliteConnection {
        SqliteConnection::connect("sqlite::memory:").await.unwrap()
    }

    async fn apply_ddl(conn: &mut SqliteConnection, statements: &[&str]) {
        for sql in statements {
            conn.execute(sql).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_inspect_basic_table() {
        let mut conn = memory_conn().await;
        apply_ddl(
            &mut conn,
            &[
                "CREATE TABLE \"users\" (
                   \"id\" INTEGER PRIMARY KEY AUTOINCREMENT,
                   \"email\" TEXT NOT NULL,
                   \"age\" INTEGER DEFAULT 21
                 )",
                "CREATE UNIQUE INDEX \"idx_users_email\" ON \"users\" (\"email\")",
            ],
        )
        .await;

        let schema = inspect(&mut conn).await.unwrap();
        assert_eq!(schema.tables.len(), 1);

        let table = &schema.tables[0];
        assert_eq!(table.name, "users");
        assert_eq!(table.schema_namespace, "public");
        assert_eq!(table.columns.len(), 3);

        let id = table.column_named("id").unwrap();
        assert!(id.identity);
        assert!(!id.is_nullable());
        assert_eq!(id.ty, PortableType::BigInt);

        let email = table.column_named("email").unwrap();
        assert!(!email.is_nullable());
        assert_eq!(email.ty, PortableType::Text);

        let age = table.column_named("age").unwrap();
        assert_eq!(age.default_sql.as_deref(), Some("21"));

        assert_eq!(
            table.primary_key.as_ref().unwrap().columns,
            vec!["id".to_string()]
        );
        assert_eq!(table.indices.len(), 1);
        assert!(table.indices[0].unique);
        assert_eq!(table.indices[0].columns, vec!["email".to_string()]);
    }

    #[tokio::test]
    async fn test_pk_backing_index_omitted() {
        let mut conn = memory_conn().await;
        apply_ddl(
            &mut conn,
            &["CREATE TABLE t (a TEXT NOT NULL, b TEXT NOT NULL, PRIMARY KEY (a, b))"],
        )
        .await;

        let schema = inspect(&mut conn).await.unwrap();
        let table = &schema.tables[0];
        assert!(table.indices.is_empty());
        assert_eq!(
            table.primary_key.as_ref().unwrap().columns,
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[tokio::test]
    async fn test_inline_unique_becomes_constraint() {
        let mut conn = memory_conn().await;
        apply_ddl(
            &mut conn,
            &["CREATE TABLE t (id INTEGER PRIMARY KEY, code TEXT, UNIQUE (code))"],
        )
        .await;

        let schema = inspect(&mut conn).await.unwrap();
        let table = &schema.tables[0];
        assert_eq!(table.unique_constraints.len(), 1);
        assert_eq!(table.unique_constraints[0].columns, vec!["code".to_string()]);
        assert!(table.indices.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_keys_grouped_and_mapped() {
        let mut conn = memory_conn().await;
        apply_ddl(
            &mut conn,
            &[
                "CREATE TABLE orgs (id INTEGER PRIMARY KEY)",
                "CREATE TABLE users (
                   id INTEGER PRIMARY KEY,
                   org_id INTEGER,
                   FOREIGN KEY (org_id) REFERENCES orgs (id) ON DELETE CASCADE
                 )",
            ],
        )
        .await;

        let schema = inspect(&mut conn).await.unwrap();
        let users = schema.table_named("users").unwrap();
        assert_eq!(users.foreign_keys.len(), 1);
        let fk = &users.foreign_keys[0];
        assert_eq!(fk.name, None);
        assert_eq!(fk.columns, vec!["org_id".to_string()]);
        assert_eq!(fk.referenced_table, "orgs");
        assert_eq!(fk.referenced_columns, vec!["id".to_string()]);
        assert_eq!(fk.on_delete, ForeignKeyAction::Cascade);
        assert_eq!(fk.on_update, ForeignKeyAction::NoAction);
    }

    #[tokio::test]
    async fn test_expression_and_partial_index() {
        let mut conn = memory_conn().await;
        apply_ddl(
            &mut conn,
            &[
                "CREATE TABLE artists (id INTEGER PRIMARY KEY, name TEXT)",
                "CREATE UNIQUE INDEX uq_artists_name_ci ON artists (lower(name))",
                "CREATE INDEX idx_named ON artists (name) WHERE (name IS NOT NULL)",
            ],
        )
        .await;

        let schema = inspect(&mut conn).await.unwrap();
        let artists = schema.table_named("artists").unwrap();
        assert_eq!(artists.indices.len(), 2);

        let ci = artists
            .indices
            .iter()
            .find(|i| i.name == "uq_artists_name_ci")
            .unwrap();
        assert!(ci.unique);
        assert!(ci.columns.is_empty());
        assert_eq!(ci.expressions, vec!["lower(name)".to_string()]);

        let partial = artists.indices.iter().find(|i| i.name == "idx_named").unwrap();
        assert_eq!(partial.columns, vec!["name".to_string()]);
        assert_eq!(partial.filter.as_deref(), Some("name IS NOT NULL"));
    }

    #[tokio::test]
    async fn test_additive_idempotence_through_database() {
        // Apply a generated plan, inspect, and diff again: the second plan
        // must be empty.
        let desired = Schema::new("database").table(
            Table::new("settings")
                .column(Column::new("id", PortableType::BigInt).identity())
                .column(
                    Column::new("enabled", PortableType::Boolean)
                        .not_null()
                        .default_portable("true"),
                )
                .column(Column::new("label", PortableType::VarChar { max_length: 100 }))
                .primary_key(PrimaryKey::new(vec!["id".to_string()]))
                .index(Index::on_columns("idx_label", vec!["label".to_string()])),
        );

        let mut conn = memory_conn().await;
        let generator = Dialect::Sqlite.generator();
        let plan =
            SchemaDiff::calculate(&Schema::new("database"), &desired, DiffOptions::new())
                .unwrap();
        for op in &plan {
            for sql in generator.generate(op).unwrap() {
                conn.execute(&sql).await.unwrap();
            }
        }

        let current = inspect(&mut conn).await.unwrap();
        let again = SchemaDiff::calculate(&current, &desired, DiffOptions::new()).unwrap();
        assert!(again.is_empty(), "expected empty plan, got {again:?}");
    }

    #[test]
    fn test_type_reconstruction_affinities() {
        assert_eq!(type_from_declared("INTEGER"), PortableType::BigInt);
        assert_eq!(type_from_declared("VARCHAR(40)"), PortableType::Text);
        assert_eq!(type_from_declared("REAL"), PortableType::Double);
        assert_eq!(type_from_declared("NUMERIC(10,2)"), PortableType::Double);
        assert_eq!(type_from_declared("BLOB"), PortableType::Blob);
        assert_eq!(type_from_declared("BOOLEAN"), PortableType::Boolean);
        assert_eq!(type_from_declared(""), PortableType::Blob);
    }

    #[test]
    fn test_parse_index_ddl() {
        let (exprs, filter) = parse_index_ddl(
            "CREATE UNIQUE INDEX uq ON t (lower(name), other) WHERE (x > 1)",
        );
        assert_eq!(
            exprs.unwrap(),
            vec!["lower(name)".to_string(), "other".to_string()]
        );
        assert_eq!(filter.as_deref(), Some("x > 1"));

        let (exprs, filter) = parse_index_ddl("CREATE INDEX i ON t (a)");
        assert_eq!(exprs.unwrap(), vec!["a".to_string()]);
        assert_eq!(filter, None);
    }
}
