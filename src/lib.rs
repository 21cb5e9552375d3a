//! Timestamped, transactional schema migrations for SQLite.
//!
//! `mirgator-migrate` versions a SQLite database's schema over time:
//! ordered migration scripts are applied and reverted transactionally, a
//! `migrations` table tracks what has run, and the resulting schema is
//! snapshotted to a diffable text artifact.
//!
//! # Architecture
//!
//! - **paths** - resolves logical database names to file-system locations
//!   per environment
//! - **script** - the migration contract: `.sql` files with validated
//!   `up`/`down` sections
//! - **executor** - scoped connections, BEGIN/COMMIT/ROLLBACK discipline,
//!   all-or-nothing batches
//! - **tracker** - the `migrations` bookkeeping table
//! - **runner** / **batch** - drive one script, or a whole ordered
//!   directory of them
//! - **snapshot** - serializes the live catalog to `<db>_schema.sql`
//! - **factory** - authors new timestamp-prefixed migration stubs
//! - **lifecycle** - creates and (countdown-guarded) drops database files
//!
//! # Example
//!
//! ```rust,ignore
//! use mirgator_migrate::prelude::*;
//!
//! let logger = Logger::from_env();
//! let batch = BatchMigrationRunner::new(logger, ConfirmPolicy::default());
//! batch
//!     .run_all(Direction::Up, "tenant/users", &BatchOptions::default())
//!     .await?;
//! ```

pub mod batch;
pub mod confirm;
pub mod error;
pub mod executor;
pub mod factory;
pub mod lifecycle;
pub mod logging;
pub mod paths;
pub mod runner;
pub mod script;
pub mod snapshot;
pub mod tracker;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::batch::{BatchMigrationRunner, BatchOptions};
    pub use crate::confirm::ConfirmPolicy;
    pub use crate::error::{MigrateError, Result};
    pub use crate::executor::TransactionalExecutor;
    pub use crate::factory::create_migration_file;
    pub use crate::lifecycle::DatabaseLifecycle;
    pub use crate::logging::{LogMode, Logger};
    pub use crate::paths::{Environment, ResolveOptions};
    pub use crate::runner::MigrationRunner;
    pub use crate::script::{Direction, MigrationScript};
    pub use crate::snapshot::SchemaSnapshotter;
}
