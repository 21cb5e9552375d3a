//! Migration bookkeeping.
//!
//! Owns the `migrations` table inside the target database: one row per
//! applied migration, keyed by the unique 14-digit timestamp lifted from the
//! script filename. Every operation takes a live connection so it composes
//! inside the executor's transaction.

use std::sync::LazyLock;

use regex::Regex;
use sqlx::SqliteConnection;

use crate::error::{MigrateError, Result};

/// SQL to create the tracking table. Safe to run unconditionally.
pub const CREATE_MIGRATIONS_TABLE_SQL: &str = "\
CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
)";

static TIMESTAMP_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{14})_").expect("timestamp prefix pattern"));

/// A row of the tracking table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    /// The 14-digit timestamp key.
    pub timestamp: String,
    /// When the migration was recorded.
    pub created_at: String,
}

/// Extracts the leading 14-digit timestamp from a migration filename.
///
/// This is a hard precondition for every other tracker operation: a
/// filename without the `^\d{14}_` prefix cannot be tracked.
pub fn extract_timestamp(file_name: &str) -> Result<String> {
    TIMESTAMP_PREFIX
        .captures(file_name)
        .map(|captures| captures[1].to_string())
        .ok_or_else(|| MigrateError::InvalidFilename(file_name.to_string()))
}

/// Ensures the tracking table exists. Idempotent.
pub async fn ensure_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(CREATE_MIGRATIONS_TABLE_SQL)
        .execute(conn)
        .await?;
    Ok(())
}

/// Checks whether a timestamp is currently recorded as applied.
pub async fn is_applied(conn: &mut SqliteConnection, timestamp: &str) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM migrations WHERE timestamp = ?")
        .bind(timestamp)
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

/// Records a migration as applied.
///
/// A second call with the same timestamp fails with a uniqueness violation.
/// That is intentional: the constraint is the mechanism that prevents
/// double-apply.
pub async fn record(conn: &mut SqliteConnection, timestamp: &str) -> Result<()> {
    sqlx::query("INSERT INTO migrations (timestamp) VALUES (?)")
        .bind(timestamp)
        .execute(conn)
        .await?;
    Ok(())
}

/// Removes a migration record after a revert. A missing row is a no-op.
pub async fn remove(conn: &mut SqliteConnection, timestamp: &str) -> Result<()> {
    sqlx::query("DELETE FROM migrations WHERE timestamp = ?")
        .bind(timestamp)
        .execute(conn)
        .await?;
    Ok(())
}

/// Lists applied timestamps in ascending order.
pub async fn list_applied(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT timestamp FROM migrations ORDER BY timestamp ASC")
            .fetch_all(conn)
            .await?;
    Ok(rows.into_iter().map(|(timestamp,)| timestamp).collect())
}

/// Lists applied rows with their recording instants, ascending by timestamp.
pub async fn applied_records(conn: &mut SqliteConnection) -> Result<Vec<AppliedMigration>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT timestamp, created_at FROM migrations ORDER BY timestamp ASC",
    )
    .fetch_all(conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(timestamp, created_at)| AppliedMigration {
            timestamp,
            created_at,
        })
        .collect())
}

/// Counts applied migrations.
pub async fn count_applied(conn: &mut SqliteConnection) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM migrations")
        .fetch_one(conn)
        .await?;
    Ok(row.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Connection;

    async fn memory_conn() -> SqliteConnection {
        SqliteConnection::connect("sqlite::memory:")
            .await
            .expect("in-memory SQLite connection")
    }

    #[test]
    fn extracts_leading_timestamp() {
        let timestamp = extract_timestamp("20240101123045_add_users.sql").unwrap();
        assert_eq!(timestamp, "20240101123045");
    }

    #[test]
    fn rejects_malformed_filenames() {
        for name in [
            "add_users.sql",
            "2024_add_users.sql",
            "20240101123045add_users.sql",
            "",
        ] {
            assert!(
                matches!(
                    extract_timestamp(name),
                    Err(MigrateError::InvalidFilename(_))
                ),
                "{name:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn ensure_table_is_idempotent() {
        let mut conn = memory_conn().await;
        ensure_table(&mut conn).await.unwrap();
        ensure_table(&mut conn).await.unwrap();
    }

    #[tokio::test]
    async fn record_then_query_roundtrip() {
        let mut conn = memory_conn().await;
        ensure_table(&mut conn).await.unwrap();

        assert!(!is_applied(&mut conn, "20240101000000").await.unwrap());
        record(&mut conn, "20240101000000").await.unwrap();
        assert!(is_applied(&mut conn, "20240101000000").await.unwrap());
        assert_eq!(count_applied(&mut conn).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn double_record_violates_uniqueness() {
        let mut conn = memory_conn().await;
        ensure_table(&mut conn).await.unwrap();

        record(&mut conn, "20240101000000").await.unwrap();
        let result = record(&mut conn, "20240101000000").await;
        assert!(matches!(result, Err(MigrateError::Database(_))));
    }

    #[tokio::test]
    async fn remove_missing_row_is_a_noop() {
        let mut conn = memory_conn().await;
        ensure_table(&mut conn).await.unwrap();
        remove(&mut conn, "20240101000000").await.unwrap();
    }

    #[tokio::test]
    async fn list_applied_is_ascending() {
        let mut conn = memory_conn().await;
        ensure_table(&mut conn).await.unwrap();

        // Insert out of order; listing must sort by timestamp.
        record(&mut conn, "20240103000000").await.unwrap();
        record(&mut conn, "20240101000000").await.unwrap();
        record(&mut conn, "20240102000000").await.unwrap();

        let applied = list_applied(&mut conn).await.unwrap();
        assert_eq!(
            applied,
            vec![
                "20240101000000".to_string(),
                "20240102000000".to_string(),
                "20240103000000".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn applied_records_carry_created_at() {
        let mut conn = memory_conn().await;
        ensure_table(&mut conn).await.unwrap();
        record(&mut conn, "20240101000000").await.unwrap();

        let rows = applied_records(&mut conn).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, "20240101000000");
        assert!(!rows[0].created_at.is_empty());
    }
}
