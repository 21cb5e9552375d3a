//! Database creation and removal.
//!
//! Creating a database materializes an empty SQLite file at the resolved
//! path. Dropping one is destructive and passes through the confirmation
//! guard; the sibling schema snapshot goes with it, and a directory left
//! empty by earlier drops can be cleaned up on request.

use std::path::{Path, PathBuf};

use crate::confirm::ConfirmPolicy;
use crate::error::{MigrateError, Result};
use crate::executor::TransactionalExecutor;
use crate::logging::Logger;
use crate::paths::{self, Environment, ResolveOptions};
use crate::snapshot;

/// Creates and drops SQLite database files.
#[derive(Debug, Clone)]
pub struct DatabaseLifecycle {
    executor: TransactionalExecutor,
    confirm: ConfirmPolicy,
    logger: Logger,
}

impl DatabaseLifecycle {
    /// Creates a lifecycle manager with the given confirmation policy for
    /// drops.
    #[must_use]
    pub fn new(logger: Logger, confirm: ConfirmPolicy) -> Self {
        Self {
            executor: TransactionalExecutor::new(logger.clone()),
            confirm,
            logger,
        }
    }

    /// Creates an empty database for `name`, returning its path.
    ///
    /// Parent directories are created as needed; a file already at the
    /// target is [`MigrateError::AlreadyExists`].
    pub async fn create_database(
        &self,
        name: &str,
        environment: Option<Environment>,
        directory: Option<PathBuf>,
    ) -> Result<PathBuf> {
        let resolved = paths::resolve_with_details(
            name,
            &ResolveOptions {
                environment,
                directory,
            },
        );
        if resolved.path.exists() {
            return Err(MigrateError::AlreadyExists(resolved.path));
        }

        std::fs::create_dir_all(&resolved.directory)?;
        // Opening with create-if-missing materializes the empty file.
        let conn = TransactionalExecutor::connect(&resolved.path, true).await?;
        self.executor.close(conn).await;

        self.logger
            .info(format!("created database {}", resolved.path.display()));
        Ok(resolved.path)
    }

    /// Drops the database at `target` (a path or logical name).
    ///
    /// A missing target with an empty parent directory offers to remove the
    /// directory; a non-empty parent is left untouched and reported. An
    /// existing target is deleted after the confirmation guard, together
    /// with its sibling schema snapshot.
    pub async fn drop_database(&self, target: &str) -> Result<()> {
        let path = paths::resolve(target, &ResolveOptions::default());

        if !path.exists() {
            return self.clean_parent(&path).await;
        }

        let kind = if path.is_dir() { "directory" } else { "file" };
        let action = format!("about to delete {kind} {}", path.display());
        if !self.confirm.confirm(&self.logger, &action).await {
            return Err(MigrateError::Aborted);
        }

        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
            let schema = snapshot::schema_file_path(&path);
            if schema.is_file() {
                std::fs::remove_file(&schema)?;
                self.logger
                    .info(format!("removed schema snapshot {}", schema.display()));
            }
        }
        self.logger.info(format!("dropped {}", path.display()));
        Ok(())
    }

    /// Handles a drop whose target is already gone: an empty parent
    /// directory is useless, so offer to remove it.
    async fn clean_parent(&self, path: &Path) -> Result<()> {
        let Some(parent) = path.parent().filter(|p| p.is_dir()) else {
            self.logger
                .info(format!("nothing to drop at {}", path.display()));
            return Ok(());
        };

        if std::fs::read_dir(parent)?.next().is_some() {
            self.logger.info(format!(
                "{} does not exist; {} still holds other files, leaving it",
                path.display(),
                parent.display()
            ));
            return Ok(());
        }

        let action = format!("removing empty directory {}", parent.display());
        if self.confirm.confirm(&self.logger, &action).await {
            std::fs::remove_dir(parent)?;
            self.logger
                .info(format!("removed empty directory {}", parent.display()));
        } else {
            self.logger
                .info(format!("left empty directory {} in place", parent.display()));
        }
        Ok(())
    }
}
