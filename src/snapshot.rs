//! Schema snapshots.
//!
//! Introspects the live catalog and serializes every CREATE statement to a
//! diffable `<dbname>_schema.sql` sibling of the database file. The file is
//! regenerated wholesale after each successful migration when
//! snapshot-on-write is enabled; it is documentation, so callers treat a
//! snapshot failure as a warning rather than a migration failure.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{MigrateError, Result};
use crate::executor::TransactionalExecutor;
use crate::logging::Logger;

/// Suffix of the snapshot artifact next to the database file.
pub const SCHEMA_FILE_SUFFIX: &str = "_schema.sql";

/// Writes schema snapshots for SQLite databases.
#[derive(Debug, Clone)]
pub struct SchemaSnapshotter {
    executor: TransactionalExecutor,
}

impl SchemaSnapshotter {
    /// Creates a snapshotter reporting through `logger`.
    #[must_use]
    pub fn new(logger: Logger) -> Self {
        Self {
            executor: TransactionalExecutor::new(logger),
        }
    }

    /// Snapshots the database at `db_path`, returning the snapshot path.
    ///
    /// Opens and closes its own connection: snapshots run after the
    /// migration's transaction has already committed.
    pub async fn snapshot(&self, db_path: &Path) -> Result<PathBuf> {
        self.snapshot_inner(db_path)
            .await
            .map_err(|err| MigrateError::Snapshot(err.to_string()))
    }

    async fn snapshot_inner(&self, db_path: &Path) -> Result<PathBuf> {
        let mut conn = TransactionalExecutor::connect(db_path, false).await?;
        // Internal bookkeeping objects (sqlite_sequence and friends) carry
        // no replayable DDL and are excluded.
        let rows: std::result::Result<Vec<(String, String)>, sqlx::Error> = sqlx::query_as(
            "SELECT type, sql FROM sqlite_master \
             WHERE sql IS NOT NULL AND sql != '' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&mut conn)
        .await;
        self.executor.close(conn).await;
        let rows = rows?;

        let path = schema_file_path(db_path);
        let db_name = db_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        std::fs::write(&path, render(&db_name, &rows))?;
        Ok(path)
    }
}

/// Snapshot location for a database path.
#[must_use]
pub fn schema_file_path(db_path: &Path) -> PathBuf {
    let stem = db_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    db_path.with_file_name(format!("{stem}{SCHEMA_FILE_SUFFIX}"))
}

/// Renders catalog rows as the snapshot text.
///
/// Tables come before all other object kinds, each group in catalog order,
/// so indexes and triggers replay after the tables they reference.
fn render(db_name: &str, rows: &[(String, String)]) -> String {
    let tables = rows.iter().filter(|(kind, _)| kind == "table");
    let others = rows.iter().filter(|(kind, _)| kind != "table");

    let statements: Vec<String> = tables
        .chain(others)
        .map(|(_, sql)| format!("{};", sql.trim()))
        .collect();

    format!(
        "-- Database Schema for {db_name}\n-- Generated at {}\n\n{}\n",
        Utc::now().to_rfc3339(),
        statements.join("\n\n")
    )
}
