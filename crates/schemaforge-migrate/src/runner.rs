//! Migration runner.
//!
//! Applies an ordered operation list to a borrowed connection: policy
//! validation first, then SQL generation for the whole plan (a plan the
//! dialect cannot express fails before anything executes), then the
//! execution loop, wrapped in a transaction where the dialect supports
//! transactional DDL. Any transaction the runner opens is released exactly
//! once, on every exit path.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::connection::SchemaConnection;
use crate::dialect::{is_unsupported_stub, sqlite_identity_advisories, Dialect, SqlDialect};
use crate::error::{MigrateError, Result};
use crate::operations::MigrationOperation;

/// Policy and behavior switches for one `apply` call.
#[derive(Debug, Clone, Copy)]
pub struct RunnerOptions {
    /// Permit drop/alter operations. Off by default; a plan containing any
    /// destructive operation is rejected before execution.
    pub allow_destructive: bool,
    /// Wrap execution in a transaction when the dialect supports
    /// transactional DDL (SQLite and PostgreSQL do; SQL Server runs
    /// per-statement).
    pub use_transaction: bool,
    /// Log failures and keep going instead of aborting.
    pub continue_on_error: bool,
    /// Generate and log SQL without executing anything.
    pub dry_run: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            allow_destructive: false,
            use_transaction: true,
            continue_on_error: false,
            dry_run: false,
        }
    }
}

/// Outcome of a runner invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    /// Operations fully applied (or fully logged, in a dry run).
    pub applied: usize,
    /// Statements skipped because the dialect cannot express them.
    pub skipped: usize,
    /// Advisory warnings surfaced during the run.
    pub warnings: Vec<String>,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

/// Applies operation lists to live databases.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationRunner;

impl MigrationRunner {
    /// Applies `operations` in order against `conn`, generating SQL with
    /// `generator`. `cancel` is checked between operations; a cancellation
    /// observed mid-transaction rolls back.
    pub async fn apply(
        conn: &mut dyn SchemaConnection,
        operations: &[MigrationOperation],
        generator: &dyn SqlDialect,
        options: &RunnerOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<MigrationSummary> {
        // Policy: reject destructive plans up front, reporting the full
        // offending list so the caller can prompt or opt in selectively.
        if !options.allow_destructive {
            let offending: Vec<MigrationOperation> = operations
                .iter()
                .filter(|op| op.is_destructive())
                .cloned()
                .collect();
            if !offending.is_empty() {
                return Err(MigrateError::DestructiveDenied {
                    operations: offending,
                });
            }
        }

        let mut summary = MigrationSummary {
            dry_run: options.dry_run,
            ..MigrationSummary::default()
        };
        if operations.is_empty() {
            return Ok(summary);
        }

        // Generate the whole plan before touching the database; a plan the
        // dialect cannot express must fail before execution.
        let statements: Vec<Vec<String>> = operations
            .iter()
            .map(|op| generator.generate(op))
            .collect::<Result<_>>()?;

        let dialect = generator.dialect();
        if dialect == Dialect::Sqlite && !options.dry_run && declares_foreign_keys(operations) {
            conn.execute("PRAGMA foreign_keys = ON").await?;
        }

        let use_transaction = options.use_transaction
            && dialect.supports_transactional_ddl()
            && !options.dry_run;
        if use_transaction {
            conn.begin().await?;
        }

        let result = Self::run(
            conn,
            operations,
            &statements,
            dialect,
            options,
            cancel,
            &mut summary,
        )
        .await;

        match result {
            Ok(()) => {
                if use_transaction {
                    conn.commit().await?;
                }
                info!(
                    applied = summary.applied,
                    skipped = summary.skipped,
                    dry_run = summary.dry_run,
                    "migration complete"
                );
                Ok(summary)
            }
            Err(err) => {
                error!(error = %err, "migration failed");
                if use_transaction {
                    if let Err(rollback_err) = conn.rollback().await {
                        warn!(error = %rollback_err, "rollback failed");
                    }
                }
                Err(err)
            }
        }
    }

    async fn run(
        conn: &mut dyn SchemaConnection,
        operations: &[MigrationOperation],
        statements: &[Vec<String>],
        dialect: Dialect,
        options: &RunnerOptions,
        cancel: Option<&CancellationToken>,
        summary: &mut MigrationSummary,
    ) -> Result<()> {
        for (index, (operation, plan)) in operations.iter().zip(statements).enumerate() {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(MigrateError::Cancelled);
            }

            info!(
                operation = operation.kind_name(),
                description = %operation.description(),
                "applying operation"
            );

            if dialect == Dialect::Sqlite {
                for advisory in sqlite_identity_advisories(operation) {
                    warn!(advisory = %advisory, "identity not expressible");
                    summary.warnings.push(advisory);
                }
            }

            let mut failed = false;
            for sql in plan {
                debug!(sql = %sql, "generated DDL");

                if is_unsupported_stub(sql) {
                    warn!(stub = %sql, "skipping operation the dialect cannot express");
                    summary.skipped += 1;
                    continue;
                }
                if options.dry_run {
                    continue;
                }

                if let Err(err) = conn.execute(sql).await {
                    if options.continue_on_error {
                        warn!(
                            operation_index = index,
                            error = %err,
                            "statement failed, continuing"
                        );
                        failed = true;
                        break;
                    }
                    return Err(MigrateError::ExecutionFailed {
                        operation_index: index,
                        ddl_text: sql.clone(),
                        detail: err.to_string(),
                    });
                }
            }
            if !failed {
                summary.applied += 1;
            }
        }
        Ok(())
    }
}

fn declares_foreign_keys(operations: &[MigrationOperation]) -> bool {
    operations.iter().any(|op| match op {
        MigrationOperation::CreateTable { table } => !table.foreign_keys.is_empty(),
        MigrationOperation::AddForeignKey { .. } => true,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::SqliteConnection;
    use crate::diff::{DiffOptions, SchemaDiff};
    use crate::inspect::SchemaInspector;
    use crate::testing::FakeConnection;
    use schemaforge_core::schema::{Column, ForeignKey, PrimaryKey, Schema, Table};
    use schemaforge_core::types::PortableType;

    /// Routes the runner's tracing output through the test harness so
    /// `cargo test -- --nocapture` shows what each operation logged.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn users_table() -> Table {
        Table::new("users")
            .column(Column::new("id", PortableType::BigInt).identity())
            .column(Column::new("email", PortableType::Text).not_null())
            .primary_key(PrimaryKey::new(vec!["id".to_string()]))
    }

    fn create_users_op() -> MigrationOperation {
        MigrationOperation::create_table(users_table())
    }

    #[tokio::test]
    async fn test_destructive_denied_before_any_ddl() {
        let mut conn = FakeConnection::new(Dialect::Sqlite);
        let ops = vec![
            create_users_op(),
            MigrationOperation::drop_table("public", "legacy"),
        ];

        let err = MigrationRunner::apply(
            &mut conn,
            &ops,
            Dialect::Sqlite.generator(),
            &RunnerOptions::default(),
            None,
        )
        .await
        .unwrap_err();

        let MigrateError::DestructiveDenied { operations } = err else {
            panic!("expected DestructiveDenied");
        };
        assert_eq!(operations.len(), 1);
        assert!(matches!(operations[0], MigrationOperation::DropTable { .. }));
        assert!(conn.executed.is_empty(), "no DDL may run: {:?}", conn.executed);
    }

    #[tokio::test]
    async fn test_empty_plan_short_circuits() {
        let mut conn = FakeConnection::new(Dialect::Postgres);
        let summary = MigrationRunner::apply(
            &mut conn,
            &[],
            Dialect::Postgres.generator(),
            &RunnerOptions::default(),
            None,
        )
        .await
        .unwrap();
        assert_eq!(summary.applied, 0);
        assert!(conn.executed.is_empty());
    }

    #[tokio::test]
    async fn test_transaction_wraps_postgres_plan() {
        let mut conn = FakeConnection::new(Dialect::Postgres);
        let ops = vec![create_users_op()];
        MigrationRunner::apply(
            &mut conn,
            &ops,
            Dialect::Postgres.generator(),
            &RunnerOptions::default(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(conn.executed.first().map(String::as_str), Some("BEGIN"));
        assert_eq!(conn.executed.last().map(String::as_str), Some("COMMIT"));
        assert!(conn.executed.iter().any(|s| s.starts_with("CREATE TABLE")));
    }

    #[tokio::test]
    async fn test_sql_server_runs_without_transaction() {
        let mut conn = FakeConnection::new(Dialect::SqlServer);
        let ops = vec![create_users_op()];
        MigrationRunner::apply(
            &mut conn,
            &ops,
            Dialect::SqlServer.generator(),
            &RunnerOptions::default(),
            None,
        )
        .await
        .unwrap();

        assert!(!conn.executed.iter().any(|s| s == "BEGIN"));
        assert!(!conn.executed.iter().any(|s| s == "COMMIT"));
    }

    #[tokio::test]
    async fn test_failure_rolls_back_and_reports_index() {
        init_tracing();
        let mut conn = FakeConnection::new(Dialect::Postgres);
        conn.fail_on = Some("\"second\"");
        let ops = vec![
            create_users_op(),
            MigrationOperation::create_table(
                Table::new("second")
                    .column(Column::new("id", PortableType::BigInt).not_null())
                    .primary_key(PrimaryKey::new(vec!["id".to_string()])),
            ),
        ];

        let err = MigrationRunner::apply(
            &mut conn,
            &ops,
            Dialect::Postgres.generator(),
            &RunnerOptions::default(),
            None,
        )
        .await
        .unwrap_err();

        let MigrateError::ExecutionFailed {
            operation_index,
            ddl_text,
            ..
        } = err
        else {
            panic!("expected ExecutionFailed");
        };
        assert_eq!(operation_index, 1);
        assert!(ddl_text.contains("\"second\""));
        assert_eq!(conn.executed.last().map(String::as_str), Some("ROLLBACK"));
        assert!(!conn.executed.iter().any(|s| s == "COMMIT"));
    }

    #[tokio::test]
    async fn test_continue_on_error_advances() {
        init_tracing();
        let mut conn = FakeConnection::new(Dialect::Postgres);
        conn.fail_on = Some("\"second\"");
        let ops = vec![
            MigrationOperation::create_table(
                Table::new("second")
                    .column(Column::new("id", PortableType::BigInt).not_null())
                    .primary_key(PrimaryKey::new(vec!["id".to_string()])),
            ),
            create_users_op(),
        ];

        let options = RunnerOptions {
            continue_on_error: true,
            ..RunnerOptions::default()
        };
        let summary = MigrationRunner::apply(
            &mut conn,
            &ops,
            Dialect::Postgres.generator(),
            &options,
            None,
        )
        .await
        .unwrap();

        assert_eq!(summary.applied, 1);
        assert!(conn.executed.iter().any(|s| s.contains("\"users\"")));
        assert_eq!(conn.executed.last().map(String::as_str), Some("COMMIT"));
    }

    #[tokio::test]
    async fn test_dry_run_executes_nothing() {
        let mut conn = FakeConnection::new(Dialect::Sqlite);
        let ops = vec![create_users_op()];
        let options = RunnerOptions {
            dry_run: true,
            ..RunnerOptions::default()
        };
        let summary = MigrationRunner::apply(
            &mut conn,
            &ops,
            Dialect::Sqlite.generator(),
            &options,
            None,
        )
        .await
        .unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.applied, 1);
        assert!(conn.executed.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_rolls_back() {
        let mut conn = FakeConnection::new(Dialect::Sqlite);
        let token = CancellationToken::new();
        token.cancel();

        let err = MigrationRunner::apply(
            &mut conn,
            &[create_users_op()],
            Dialect::Sqlite.generator(),
            &RunnerOptions::default(),
            Some(&token),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MigrateError::Cancelled));
        assert_eq!(conn.executed.last().map(String::as_str), Some("ROLLBACK"));
        assert!(!conn.executed.iter().any(|s| s.starts_with("CREATE")));
    }

    #[tokio::test]
    async fn test_unexpressible_statement_skipped_with_warning() {
        init_tracing();
        let mut conn = FakeConnection::new(Dialect::Sqlite);
        let ops = vec![MigrationOperation::add_foreign_key(
            "public",
            "posts",
            ForeignKey::new(vec!["a".to_string()], "users", vec!["id".to_string()])
                .named("fk_posts_users"),
        )];

        let summary = MigrationRunner::apply(
            &mut conn,
            &ops,
            Dialect::Sqlite.generator(),
            &RunnerOptions::default(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(summary.skipped, 1);
        // The pragma runs, but the stub itself must not reach the database.
        assert!(!conn.executed.iter().any(|s| s.starts_with("--")));
    }

    #[tokio::test]
    async fn test_identity_advisory_surfaces() {
        init_tracing();
        let mut conn = FakeConnection::new(Dialect::Sqlite);
        let table = Table::new("t")
            .column(Column::new("id", PortableType::Uuid).not_null())
            .column(Column::new("seq", PortableType::BigInt).identity())
            .primary_key(PrimaryKey::new(vec!["id".to_string()]));

        let summary = MigrationRunner::apply(
            &mut conn,
            &[MigrationOperation::create_table(table)],
            Dialect::Sqlite.generator(),
            &RunnerOptions::default(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(summary.warnings.len(), 1);
        assert!(summary.warnings[0].contains("t.seq"));
    }

    #[tokio::test]
    async fn test_unsupported_plan_fails_before_execution() {
        // Enum has no SQL Server mapping; nothing may execute.
        let mut conn = FakeConnection::new(Dialect::SqlServer);
        let table = Table::new("people").column(Column::new(
            "mood",
            PortableType::Enum {
                name: "mood".to_string(),
                values: vec!["ok".to_string()],
            },
        ));

        let err = MigrationRunner::apply(
            &mut conn,
            &[MigrationOperation::create_table(table)],
            Dialect::SqlServer.generator(),
            &RunnerOptions::default(),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MigrateError::UnsupportedType { .. }));
        assert!(conn.executed.is_empty());
    }

    #[tokio::test]
    async fn test_greenfield_then_upgrade_against_sqlite() {
        // Scenario: create v1 on an empty database, then upgrade to v2 and
        // confirm exactly two AddColumn operations and a 4-column table.
        let v1 = Schema::new("database").table(
            Table::new("Users")
                .column(Column::new("Id", PortableType::Uuid).not_null())
                .column(
                    Column::new("Email", PortableType::VarChar { max_length: 255 })
                        .not_null(),
                )
                .primary_key(PrimaryKey::new(vec!["Id".to_string()])),
        );
        let v2 = Schema::new("database").table(
            v1.tables[0]
                .clone()
                .column(Column::new("Name", PortableType::VarChar { max_length: 100 }))
                .column(Column::new(
                    "CreatedAt",
                    PortableType::DateTime { precision: 0 },
                )),
        );

        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        let generator = Dialect::Sqlite.generator();

        let plan = SchemaDiff::calculate(&Schema::new("database"), &v1, DiffOptions::new())
            .unwrap();
        MigrationRunner::apply(&mut conn, &plan, generator, &RunnerOptions::default(), None)
            .await
            .unwrap();

        let current = SchemaInspector::inspect(&mut conn).await.unwrap();
        let upgrade = SchemaDiff::calculate(&current, &v2, DiffOptions::new()).unwrap();
        assert_eq!(upgrade.len(), 2);
        assert!(upgrade
            .iter()
            .all(|op| matches!(op, MigrationOperation::AddColumn { .. })));

        MigrationRunner::apply(
            &mut conn,
            &upgrade,
            generator,
            &RunnerOptions::default(),
            None,
        )
        .await
        .unwrap();

        let after = SchemaInspector::inspect(&mut conn).await.unwrap();
        assert_eq!(after.tables[0].columns.len(), 4);
    }

    #[tokio::test]
    async fn test_boolean_default_round_trip_on_sqlite() {
        // Scenario: enabled BOOLEAN default true; inserting without the
        // column yields integer 1 on SQLite.
        let desired = Schema::new("database").table(
            Table::new("settings")
                .column(Column::new("id", PortableType::Int).not_null())
                .column(
                    Column::new("enabled", PortableType::Boolean)
                        .not_null()
                        .default_portable("true"),
                )
                .primary_key(PrimaryKey::new(vec!["id".to_string()])),
        );

        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        let plan = SchemaDiff::calculate(&Schema::new("database"), &desired, DiffOptions::new())
            .unwrap();
        MigrationRunner::apply(
            &mut conn,
            &plan,
            Dialect::Sqlite.generator(),
            &RunnerOptions::default(),
            None,
        )
        .await
        .unwrap();

        conn.execute("INSERT INTO \"settings\" (\"id\") VALUES (1)")
            .await
            .unwrap();
        let rows = conn
            .query("SELECT \"enabled\" FROM \"settings\" WHERE \"id\" = 1")
            .await
            .unwrap();
        assert_eq!(rows[0].int("enabled"), Some(1));
    }

    #[tokio::test]
    async fn test_uuid_default_produces_distinct_values_on_sqlite() {
        // Scenario: ten inserts without ids yield ten distinct
        // UUID-formatted values.
        let desired = Schema::new("database").table(
            Table::new("events")
                .column(
                    Column::new("id", PortableType::Uuid)
                        .not_null()
                        .default_portable("gen_uuid()"),
                )
                .column(Column::new("note", PortableType::Text))
                .primary_key(PrimaryKey::new(vec!["id".to_string()])),
        );

        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        let plan = SchemaDiff::calculate(&Schema::new("database"), &desired, DiffOptions::new())
            .unwrap();
        MigrationRunner::apply(
            &mut conn,
            &plan,
            Dialect::Sqlite.generator(),
            &RunnerOptions::default(),
            None,
        )
        .await
        .unwrap();

        for i in 0..10 {
            conn.execute(&format!(
                "INSERT INTO \"events\" (\"note\") VALUES ('row {i}')"
            ))
            .await
            .unwrap();
        }
        let rows = conn
            .query("SELECT DISTINCT \"id\" AS id FROM \"events\"")
            .await
            .unwrap();
        assert_eq!(rows.len(), 10);
        for row in &rows {
            let id = row.text("id").unwrap();
            assert_eq!(id.len(), 36, "not a UUID shape: {id}");
            assert_eq!(id.matches('-').count(), 4);
        }
    }

    #[tokio::test]
    async fn test_additive_apply_leaves_undeclared_table_untouched() {
        // Scenario: the database has Products, the declaration omits it;
        // additive apply leaves it alone, destructive drops it.
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        conn.execute("CREATE TABLE \"Products\" (\"Id\" INTEGER PRIMARY KEY)")
            .await
            .unwrap();

        let desired = Schema::new("database");
        let current = SchemaInspector::inspect(&mut conn).await.unwrap();

        let additive = SchemaDiff::calculate(&current, &desired, DiffOptions::new()).unwrap();
        assert!(additive.is_empty());

        let destructive =
            SchemaDiff::calculate(&current, &desired, DiffOptions::new().destructive())
                .unwrap();
        assert_eq!(destructive.len(), 1);
        let options = RunnerOptions {
            allow_destructive: true,
            ..RunnerOptions::default()
        };
        MigrationRunner::apply(
            &mut conn,
            &destructive,
            Dialect::Sqlite.generator(),
            &options,
            None,
        )
        .await
        .unwrap();

        let after = SchemaInspector::inspect(&mut conn).await.unwrap();
        assert!(after.tables.is_empty());
    }
}
