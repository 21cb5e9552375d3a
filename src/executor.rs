//! Transactional SQL execution.
//!
//! Every write funnels through here: one connection per unit of work,
//! opened immediately before use and closed on every exit path, with
//! BEGIN/COMMIT around the work and ROLLBACK on any failure. A rollback
//! failure is logged but never masks the error that triggered it.

use std::path::Path;

use futures::future::BoxFuture;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;

use crate::error::{MigrateError, Result};
use crate::logging::Logger;

/// Runs SQL against SQLite databases with scoped connections and
/// all-or-nothing batches.
#[derive(Debug, Clone)]
pub struct TransactionalExecutor {
    logger: Logger,
}

impl TransactionalExecutor {
    /// Creates an executor reporting through `logger`.
    #[must_use]
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Opens a connection to the database file.
    ///
    /// With `create_if_missing` unset, a missing file is a
    /// [`MigrateError::Connection`].
    pub async fn connect(path: &Path, create_if_missing: bool) -> Result<SqliteConnection> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create_if_missing);
        SqliteConnection::connect_with(&options)
            .await
            .map_err(|source| MigrateError::Connection {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Executes one statement against the database at `path`, opening and
    /// closing the connection around it.
    pub async fn run(&self, path: &Path, sql: &str) -> Result<()> {
        let mut conn = Self::connect(path, false).await?;
        let result = sqlx::query(sql).execute(&mut conn).await;
        self.close(conn).await;
        result?;
        Ok(())
    }

    /// Runs `work` inside a transaction on `conn`.
    ///
    /// Commits on success; on failure rolls back, logs any rollback error,
    /// and re-raises the original failure so the caller sees what actually
    /// went wrong.
    pub async fn run_in_transaction<T, F>(&self, conn: &mut SqliteConnection, work: F) -> Result<T>
    where
        F: for<'t> FnOnce(&'t mut SqliteConnection) -> BoxFuture<'t, Result<T>>,
    {
        let mut tx = conn.begin().await?;
        match work(&mut *tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(original) => {
                if let Err(rollback_err) = tx.rollback().await {
                    self.logger.warn(format!("rollback failed: {rollback_err}"));
                }
                Err(original)
            }
        }
    }

    /// Executes an ordered list of statements inside a single transaction.
    ///
    /// A failure at statement *k* rolls back everything before it, leaving
    /// the database exactly as it was, and reports *k* in the error.
    pub async fn run_commands(
        &self,
        conn: &mut SqliteConnection,
        statements: &[String],
    ) -> Result<()> {
        let owned = statements.to_vec();
        self.run_in_transaction(conn, move |tx| {
            Box::pin(async move {
                for (index, sql) in owned.iter().enumerate() {
                    sqlx::query(sql)
                        .execute(&mut *tx)
                        .await
                        .map_err(|source| MigrateError::Statement { index, source })?;
                }
                Ok(())
            })
        })
        .await
    }

    /// Closes a connection, logging (not raising) any failure.
    pub async fn close(&self, conn: SqliteConnection) {
        if let Err(err) = conn.close().await {
            self.logger.warn(format!("failed to close connection: {err}"));
        }
    }
}
