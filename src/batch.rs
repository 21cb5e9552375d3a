//! Batch migration execution.
//!
//! Discovers every `.sql` script in a migrations directory, orders them by
//! their timestamp-prefixed filenames, and drives the single-migration
//! runner across the set. Reverts are gated twice: an explicit step count
//! is required, and the countdown guard runs before the first destructive
//! statement unless `--force` skips it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::confirm::ConfirmPolicy;
use crate::error::{MigrateError, Result};
use crate::executor::TransactionalExecutor;
use crate::logging::Logger;
use crate::paths::{self, Environment, ResolveOptions};
use crate::runner::MigrationRunner;
use crate::script::Direction;
use crate::tracker;

/// Options for a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Migrations directory; defaults to `migrations/<first path segment of
    /// the database name>`.
    pub migrations_dir: Option<PathBuf>,
    /// Refresh the schema snapshot after each migration.
    pub update_schema: bool,
    /// Number of migrations to revert. Required (and must be positive) for
    /// down runs; ignored for up runs.
    pub step: Option<usize>,
    /// Environment override for database path resolution.
    pub environment: Option<Environment>,
}

/// Runs ordered sets of migrations against one database.
#[derive(Debug, Clone)]
pub struct BatchMigrationRunner {
    runner: MigrationRunner,
    executor: TransactionalExecutor,
    confirm: ConfirmPolicy,
    logger: Logger,
}

impl BatchMigrationRunner {
    /// Creates a batch runner with the given confirmation policy for
    /// destructive runs.
    #[must_use]
    pub fn new(logger: Logger, confirm: ConfirmPolicy) -> Self {
        Self {
            runner: MigrationRunner::new(logger.clone()),
            executor: TransactionalExecutor::new(logger.clone()),
            confirm,
            logger,
        }
    }

    /// Runs all eligible migrations for `db_name` in `direction`.
    ///
    /// Up runs the full sorted list and halts on the first failure, leaving
    /// earlier migrations in place (each committed independently). Down
    /// refuses to run without a positive `step`, then reverts the `step`
    /// most recent applied migrations, newest first.
    pub async fn run_all(
        &self,
        direction: Direction,
        db_name: &str,
        options: &BatchOptions,
    ) -> Result<()> {
        let db_path = paths::resolve(
            db_name,
            &ResolveOptions {
                environment: options.environment.clone(),
                directory: None,
            },
        );
        if !db_path.is_file() {
            return Err(MigrateError::Precondition(format!(
                "database not found: {}",
                db_path.display()
            )));
        }

        let migrations_dir = options
            .migrations_dir
            .clone()
            .unwrap_or_else(|| default_migrations_dir(db_name));
        if !migrations_dir.is_dir() {
            return Err(MigrateError::Precondition(format!(
                "migrations directory not found: {}",
                migrations_dir.display()
            )));
        }

        let files = list_migration_files(&migrations_dir)?;
        if files.is_empty() {
            self.logger.info(format!(
                "no migration files in {}",
                migrations_dir.display()
            ));
            return Ok(());
        }

        let mut conn = TransactionalExecutor::connect(&db_path, false).await?;
        let result = self
            .run_files(direction, &mut conn, &db_path, files, options)
            .await;
        self.executor.close(conn).await;
        result
    }

    async fn run_files(
        &self,
        direction: Direction,
        conn: &mut sqlx::SqliteConnection,
        db_path: &Path,
        mut files: Vec<PathBuf>,
        options: &BatchOptions,
    ) -> Result<()> {
        match direction {
            Direction::Up => {
                for file in &files {
                    self.runner
                        .run(Direction::Up, conn, db_path, file, options.update_schema)
                        .await?;
                }
                Ok(())
            }
            Direction::Down => {
                let step = match options.step {
                    Some(step) if step > 0 => step,
                    _ => return Err(MigrateError::MissingStep),
                };

                tracker::ensure_table(conn).await?;
                let applied: HashSet<String> =
                    tracker::list_applied(conn).await?.into_iter().collect();

                // Newest first, then keep only what is actually applied.
                files.reverse();
                let mut selected = Vec::new();
                for file in files {
                    let file_name = file
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    let timestamp = tracker::extract_timestamp(&file_name)?;
                    if applied.contains(&timestamp) {
                        selected.push(file);
                    }
                    if selected.len() == step {
                        break;
                    }
                }

                if selected.is_empty() {
                    self.logger.info("no applied migrations to revert");
                    return Ok(());
                }

                let action = format!(
                    "reverting {} migration(s) on {}",
                    selected.len(),
                    db_path.display()
                );
                if !self.confirm.confirm(&self.logger, &action).await {
                    return Err(MigrateError::Aborted);
                }

                for file in &selected {
                    self.runner
                        .run(Direction::Down, conn, db_path, file, options.update_schema)
                        .await?;
                }
                Ok(())
            }
        }
    }
}

/// Default migrations directory for a logical database name: the first
/// path segment keys a sub-directory under `migrations/`.
#[must_use]
pub fn default_migrations_dir(db_name: &str) -> PathBuf {
    let first = db_name.split('/').next().unwrap_or(db_name);
    let first = first.trim_end_matches(paths::DB_EXTENSION);
    Path::new("migrations").join(first)
}

/// Lists migration scripts in `dir`, sorted ascending by filename (and so
/// by timestamp, since the prefix is fixed-width).
pub fn list_migration_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext == "sql")
        })
        .collect();
    files.sort();
    Ok(files)
}
