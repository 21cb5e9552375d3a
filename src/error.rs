//! Error types for the migration engine.

use std::path::PathBuf;

/// Errors that can occur during migration operations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A required file, directory or argument is missing before any work starts.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// A migration filename does not carry the 14-digit timestamp prefix.
    #[error("Invalid migration filename '{0}': expected <YYYYMMDDHHMMSS>_<snake_case_name>.sql")]
    InvalidFilename(String),

    /// A migration script is missing one of its two required sections.
    #[error("Migration '{file}' has no '-- migrate:{direction}' section")]
    MissingDirection {
        /// Path to the malformed script.
        file: PathBuf,
        /// The missing direction marker (`up` or `down`).
        direction: &'static str,
    },

    /// The database file could not be opened.
    #[error("Cannot open database '{path}': {source}")]
    Connection {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// A statement inside a transactional batch failed. Everything before it
    /// has been rolled back.
    #[error("Statement {index} failed: {source}")]
    Statement {
        /// Zero-based index of the offending statement in the batch.
        index: usize,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// Database error outside a counted batch.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (reading/writing migration or snapshot files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema snapshot failure. Callers treat this as best-effort: it is
    /// logged as a warning and never fails the migration that triggered it.
    #[error("Schema snapshot failed: {0}")]
    Snapshot(String),

    /// The target of a create operation already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(PathBuf),

    /// Down-migrations were requested without an explicit step count.
    #[error("Down migrations require an explicit step count; pass --step or set STEP to the number of migrations to revert")]
    MissingStep,

    /// A destructive operation was declined by the confirmation policy.
    #[error("Operation aborted before any destructive change")]
    Aborted,
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
