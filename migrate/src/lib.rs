//! SQL migrations for D1 databases.
//!
//! Migrations are annotated SQL files (see [`parse_migration`]) gathered by a
//! [`MigrationSource`] and applied through any [`d1_core::Transport`]. Applied
//! migrations are recorded in a ledger table inside the database itself.
//!
//! # Architecture
//!
//! - **`migration`**: the [`Migration`] model and the id ordering rule
//! - **`parser`**: directive-based parsing of migration text
//! - **`source`**: in-memory, directory, and embedded migration sources
//! - **`plan`**: selecting migrations for a direction
//! - **`executor`**: [`Migrator`], which runs plans and maintains the ledger
//!
//! # Quick start
//!
//! ```no_run
//! use d1_client::LocalTransport;
//! use d1_migrate::{DirSource, Direction, MigrateConfig, Migrator};
//!
//! let config = MigrateConfig::load("migrate.yaml").unwrap();
//! let migrator = Migrator::from_config(&config).unwrap();
//! let db = LocalTransport::open("app.sqlite").unwrap();
//!
//! let source = DirSource::new(&config.dir);
//! for planned in migrator.plan(&db, &source, Direction::Up, config.max).unwrap() {
//!     println!("pending: {}", planned.id());
//! }
//! migrator.exec(&db, &source, Direction::Up).unwrap();
//! ```
//!
//! # Ledger table
//!
//! The ledger name defaults to `d1_migrations` and must contain only ASCII
//! alphanumerics and underscores. Only one migration run should be active
//! per database at a time; the ledger is not locked.

mod config;
mod error;
mod executor;
mod ledger;
mod migration;
mod parser;
mod plan;
mod source;

pub use config::MigrateConfig;
pub use error::{MigrateError, Result};
pub use executor::{MigrationState, MigrationStatus, Migrator};
pub use ledger::{DEFAULT_TABLE, LedgerRecord};
pub use migration::{Direction, Migration, compare_ids, sort_migrations};
pub use parser::parse_migration;
pub use plan::{PlannedMigration, plan_migrations};
pub use source::{DirSource, EmbeddedSource, MemorySource, MigrationSource};
