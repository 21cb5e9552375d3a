//! Single-migration execution.
//!
//! Drives one script through its states: validate preconditions, ensure the
//! tracking table, decide whether to skip, load and validate the script,
//! execute the requested direction and update the tracking row inside one
//! transaction, then optionally refresh the schema snapshot.

use std::path::Path;

use sqlx::SqliteConnection;

use crate::error::{MigrateError, Result};
use crate::executor::TransactionalExecutor;
use crate::logging::Logger;
use crate::script::{Direction, MigrationScript};
use crate::snapshot::SchemaSnapshotter;
use crate::tracker;

/// Runs a single migration script in either direction.
#[derive(Debug, Clone)]
pub struct MigrationRunner {
    executor: TransactionalExecutor,
    snapshotter: SchemaSnapshotter,
    logger: Logger,
}

impl MigrationRunner {
    /// Creates a runner reporting through `logger`.
    #[must_use]
    pub fn new(logger: Logger) -> Self {
        Self {
            executor: TransactionalExecutor::new(logger.clone()),
            snapshotter: SchemaSnapshotter::new(logger.clone()),
            logger,
        }
    }

    /// Runs `script_path` in `direction` on `conn`.
    ///
    /// Re-running the same direction is a no-op: `up` skips when the
    /// timestamp is already recorded, `down` skips when it is not. The
    /// migration body and the tracking update commit in one transaction, so
    /// a failure anywhere leaves both untouched. When `update_schema` is
    /// set, a snapshot failure is logged as a warning and does not fail the
    /// migration - the schema change itself has already committed.
    pub async fn run(
        &self,
        direction: Direction,
        conn: &mut SqliteConnection,
        db_path: &Path,
        script_path: &Path,
        update_schema: bool,
    ) -> Result<()> {
        if !script_path.is_file() {
            return Err(MigrateError::Precondition(format!(
                "migration file not found: {}",
                script_path.display()
            )));
        }

        tracker::ensure_table(conn).await?;

        let file_name = script_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let timestamp = tracker::extract_timestamp(&file_name)?;

        let applied = tracker::is_applied(conn, &timestamp).await?;
        let skip = match direction {
            Direction::Up => applied,
            Direction::Down => !applied,
        };
        if skip {
            self.logger.info(format!(
                "{file_name}: already {}, skipping",
                match direction {
                    Direction::Up => "applied",
                    Direction::Down => "reverted",
                }
            ));
            return Ok(());
        }

        // Both sections are validated here even though only one runs.
        let script = MigrationScript::load(script_path)?;

        let statements = script.statements(direction).to_vec();
        let tracked = timestamp.clone();
        self.executor
            .run_in_transaction(conn, move |tx| {
                Box::pin(async move {
                    for (index, sql) in statements.iter().enumerate() {
                        sqlx::query(sql)
                            .execute(&mut *tx)
                            .await
                            .map_err(|source| MigrateError::Statement { index, source })?;
                    }
                    match direction {
                        Direction::Up => tracker::record(tx, &tracked).await,
                        Direction::Down => tracker::remove(tx, &tracked).await,
                    }
                })
            })
            .await?;

        self.logger
            .info(format!("{file_name}: {direction} migration complete"));

        if update_schema {
            match self.snapshotter.snapshot(db_path).await {
                Ok(schema_path) => self
                    .logger
                    .info(format!("schema written to {}", schema_path.display())),
                Err(err) => self.logger.warn(format!("schema snapshot skipped: {err}")),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogMode, Logger};
    use std::path::PathBuf;

    struct Harness {
        _dir: tempfile::TempDir,
        db_path: PathBuf,
        scripts: PathBuf,
        conn: SqliteConnection,
        logger: Logger,
        runner: MigrationRunner,
    }

    async fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("app.sqlite");
        let scripts = dir.path().join("migrations");
        std::fs::create_dir_all(&scripts).unwrap();
        let conn = TransactionalExecutor::connect(&db_path, true).await.unwrap();
        let logger = Logger::new(LogMode::Buffer);
        let runner = MigrationRunner::new(logger.clone());
        Harness {
            _dir: dir,
            db_path,
            scripts,
            conn,
            logger,
            runner,
        }
    }

    fn write_script(h: &Harness, name: &str, body: &str) -> PathBuf {
        let path = h.scripts.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn users_script(h: &Harness) -> PathBuf {
        write_script(
            h,
            "20240101000000_create_users.sql",
            "-- migrate:up\nCREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);\n\
             -- migrate:down\nDROP TABLE users;\n",
        )
    }

    async fn table_exists(conn: &mut SqliteConnection, name: &str) -> bool {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
                .bind(name)
                .fetch_optional(conn)
                .await
                .unwrap();
        row.is_some()
    }

    #[tokio::test]
    async fn up_applies_and_records() {
        let mut h = harness().await;
        let script = users_script(&h);

        h.runner
            .run(Direction::Up, &mut h.conn, &h.db_path, &script, false)
            .await
            .unwrap();

        assert!(table_exists(&mut h.conn, "users").await);
        assert!(tracker::is_applied(&mut h.conn, "20240101000000")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn up_twice_is_a_noop() {
        let mut h = harness().await;
        let script = users_script(&h);

        h.runner
            .run(Direction::Up, &mut h.conn, &h.db_path, &script, false)
            .await
            .unwrap();
        h.logger.clear();

        // A second run must not re-execute the body (CREATE TABLE would
        // fail) and must not touch the tracking table.
        h.runner
            .run(Direction::Up, &mut h.conn, &h.db_path, &script, false)
            .await
            .unwrap();

        assert_eq!(tracker::count_applied(&mut h.conn).await.unwrap(), 1);
        let lines = h.logger.buffered();
        assert!(lines.iter().any(|l| l.contains("already applied")));
    }

    #[tokio::test]
    async fn down_on_unapplied_is_a_noop() {
        let mut h = harness().await;
        let script = users_script(&h);

        h.runner
            .run(Direction::Down, &mut h.conn, &h.db_path, &script, false)
            .await
            .unwrap();

        assert!(!table_exists(&mut h.conn, "users").await);
        let lines = h.logger.buffered();
        assert!(lines.iter().any(|l| l.contains("already reverted")));
    }

    #[tokio::test]
    async fn up_then_down_round_trips() {
        let mut h = harness().await;
        let script = users_script(&h);

        h.runner
            .run(Direction::Up, &mut h.conn, &h.db_path, &script, false)
            .await
            .unwrap();
        h.runner
            .run(Direction::Down, &mut h.conn, &h.db_path, &script, false)
            .await
            .unwrap();

        assert!(!table_exists(&mut h.conn, "users").await);
        assert!(!tracker::is_applied(&mut h.conn, "20240101000000")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn missing_file_is_a_precondition_error() {
        let mut h = harness().await;
        let missing = h.scripts.join("20240101000000_absent.sql");

        let result = h
            .runner
            .run(Direction::Up, &mut h.conn, &h.db_path, &missing, false)
            .await;
        assert!(matches!(result, Err(MigrateError::Precondition(_))));
    }

    #[tokio::test]
    async fn missing_down_section_fails_even_for_up() {
        let mut h = harness().await;
        let script = write_script(
            &h,
            "20240101000000_one_way.sql",
            "-- migrate:up\nCREATE TABLE half (id INTEGER);\n",
        );

        let result = h
            .runner
            .run(Direction::Up, &mut h.conn, &h.db_path, &script, false)
            .await;
        assert!(matches!(
            result,
            Err(MigrateError::MissingDirection { .. })
        ));
        // Nothing may have been written.
        assert!(!table_exists(&mut h.conn, "half").await);
        assert_eq!(tracker::count_applied(&mut h.conn).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn partial_failure_leaves_no_trace() {
        let mut h = harness().await;
        let script = write_script(
            &h,
            "20240102000000_multi.sql",
            "-- migrate:up\n\
             CREATE TABLE first (id INTEGER);\n\
             INSERT INTO missing_table (id) VALUES (1);\n\
             -- migrate:down\n\
             DROP TABLE first;\n",
        );

        let result = h
            .runner
            .run(Direction::Up, &mut h.conn, &h.db_path, &script, false)
            .await;
        match result {
            Err(MigrateError::Statement { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected statement error, got {other:?}"),
        }

        assert!(!table_exists(&mut h.conn, "first").await);
        assert!(!tracker::is_applied(&mut h.conn, "20240102000000")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn snapshot_refreshes_after_up() {
        let mut h = harness().await;
        let script = users_script(&h);

        h.runner
            .run(Direction::Up, &mut h.conn, &h.db_path, &script, true)
            .await
            .unwrap();

        let schema_path = h._dir.path().join("app_schema.sql");
        let content = std::fs::read_to_string(&schema_path).unwrap();
        assert!(content.contains("CREATE TABLE users"));
    }

    #[tokio::test]
    async fn snapshot_failure_is_only_a_warning() {
        let mut h = harness().await;
        let script = users_script(&h);

        // Point the snapshot at a database path that cannot be opened.
        let bogus_db = h._dir.path().join("not-a-dir").join("app.sqlite");
        h.runner
            .run(Direction::Up, &mut h.conn, &bogus_db, &script, true)
            .await
            .unwrap();

        assert!(tracker::is_applied(&mut h.conn, "20240101000000")
            .await
            .unwrap());
        let lines = h.logger.buffered();
        assert!(lines
            .iter()
            .any(|l| l.contains("warning: schema snapshot skipped")));
    }

    #[tokio::test]
    async fn invalid_filename_is_fatal() {
        let mut h = harness().await;
        let script = write_script(
            &h,
            "not_a_timestamp.sql",
            "-- migrate:up\n-- migrate:down\n",
        );

        let result = h
            .runner
            .run(Direction::Up, &mut h.conn, &h.db_path, &script, false)
            .await;
        assert!(matches!(result, Err(MigrateError::InvalidFilename(_))));
    }
}
