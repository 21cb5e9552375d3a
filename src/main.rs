//! mirgator-migrate CLI
//!
//! Command-line surface over the migration engine: author migration stubs,
//! run them up or down, inspect status, and manage database files.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use mirgator_migrate::prelude::*;
use mirgator_migrate::{paths, tracker};

/// Timestamped, transactional SQLite schema migrations.
#[derive(Parser)]
#[command(name = "mirgator-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Author a new timestamp-prefixed migration stub.
    CreateMigration {
        /// Human-readable migration name (snake_cased into the filename).
        name: String,

        /// Directory to create the stub in.
        #[arg(short, long, default_value = "migrations")]
        dir: PathBuf,
    },

    /// Apply or revert migrations for a database.
    Migrate {
        /// Direction to run.
        direction: Direction,

        /// Logical database name (or path) to migrate.
        db_name: String,

        /// Migrations directory (defaults from the database name).
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Refresh the schema snapshot after each migration.
        #[arg(long)]
        update_schema: bool,

        /// Number of migrations to revert (down only).
        #[arg(long, env = "STEP")]
        step: Option<usize>,

        /// Skip the countdown before reverts.
        #[arg(long)]
        force: bool,
    },

    /// Show applied migrations for a database.
    Status {
        /// Logical database name (or path) to inspect.
        db_name: String,
    },

    /// Create a new empty database file.
    CreateDb {
        /// Logical database name, optionally scoped (`tenant/users`).
        name: String,

        /// Environment partition (overrides APP_ENV).
        #[arg(short, long)]
        scope: Option<String>,

        /// Explicit root directory (overrides the environment root).
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Delete a database file or directory.
    DropDb {
        /// Path or logical name to delete.
        target: String,

        /// Skip the countdown.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing or malformed arguments exit 1 after the usage text, like any
    // other failure; --help and --version stay successful.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                clap::error::ErrorKind::DisplayHelp
                | clap::error::ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            err.print()?;
            std::process::exit(code);
        }
    };

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let logger = Logger::from_env();

    match cli.command {
        Commands::CreateMigration { name, dir } => {
            let path = create_migration_file(&dir, &name)?;
            logger.info(format!("created migration {}", path.display()));
        }

        Commands::Migrate {
            direction,
            db_name,
            dir,
            update_schema,
            step,
            force,
        } => {
            let runner =
                BatchMigrationRunner::new(logger, ConfirmPolicy::from_force_flag(force));
            let options = BatchOptions {
                migrations_dir: dir,
                update_schema,
                step,
                environment: None,
            };
            runner.run_all(direction, &db_name, &options).await?;
        }

        Commands::Status { db_name } => {
            let db_path = paths::resolve(&db_name, &ResolveOptions::default());
            let mut conn = TransactionalExecutor::connect(&db_path, false).await?;
            tracker::ensure_table(&mut conn).await?;
            let applied = tracker::applied_records(&mut conn).await?;
            TransactionalExecutor::new(logger).close(conn).await;

            if applied.is_empty() {
                println!("No migrations applied to {}.", db_path.display());
            } else {
                println!("\nApplied migrations for {}:", db_path.display());
                println!("{:-<60}", "");
                for row in &applied {
                    println!(" [X] {} (recorded {})", row.timestamp, row.created_at);
                }
                println!();
            }
        }

        Commands::CreateDb { name, scope, dir } => {
            let lifecycle = DatabaseLifecycle::new(logger.clone(), ConfirmPolicy::default());
            let environment = scope.as_deref().map(Environment::from);
            let path = lifecycle.create_database(&name, environment, dir).await?;
            println!("Created {}", path.display());
        }

        Commands::DropDb { target, force } => {
            let lifecycle =
                DatabaseLifecycle::new(logger, ConfirmPolicy::from_force_flag(force));
            lifecycle.drop_database(&target).await?;
        }
    }

    Ok(())
}