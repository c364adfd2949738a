//! Applying and reverting migrations against a database.
//!
//! [`Migrator`] runs one migration at a time: every statement in order,
//! then the ledger update. A failing statement stops the run and reports how
//! many migrations had completed. Nothing is rolled back; statements that
//! ran before the failure stay applied and the failing migration is not
//! recorded.
//!
//! Two migrators running against the same ledger race with each other.
//! Callers must make sure only one run is in flight per database.
//!
//! # Example
//!
//! ```no_run
//! use d1_client::LocalTransport;
//! use d1_migrate::{DirSource, Direction, Migrator};
//!
//! let db = LocalTransport::open("app.sqlite").unwrap();
//! let applied = Migrator::new()
//!     .exec(&db, &DirSource::new("migrations"), Direction::Up)
//!     .unwrap();
//! println!("applied {applied} migrations");
//! ```

use std::collections::{HashMap, HashSet};

use d1_core::{QueryExt, Transport};
use tracing::{debug, info, warn};

use crate::config::MigrateConfig;
use crate::error::{MigrateError, Result};
use crate::ledger::{self, DEFAULT_TABLE, LedgerRecord, validate_table_name};
use crate::migration::Direction;
use crate::plan::{PlannedMigration, plan_migrations};
use crate::source::MigrationSource;

/// A known migration and when it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationState {
    pub id: String,
    pub applied_at: Option<String>,
}

impl MigrationState {
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// Result of [`Migrator::status`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Every known migration, in id order.
    pub migrations: Vec<MigrationState>,
    /// Ledger entries with no matching migration in the source.
    pub unknown: Vec<LedgerRecord>,
}

impl MigrationStatus {
    pub fn applied_count(&self) -> usize {
        self.migrations.iter().filter(|m| m.is_applied()).count()
    }

    pub fn pending(&self) -> impl Iterator<Item = &MigrationState> {
        self.migrations.iter().filter(|m| !m.is_applied())
    }
}

/// Plans and executes migrations, tracking them in a ledger table.
#[derive(Debug, Clone)]
pub struct Migrator {
    table: String,
    max: Option<usize>,
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Migrator {
    /// Creates a migrator using the `d1_migrations` ledger table.
    pub fn new() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            max: None,
        }
    }

    /// Creates a migrator using a custom ledger table.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::InvalidTableName`] unless the name is made of
    /// ASCII alphanumerics and underscores.
    pub fn with_table(table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { table, max: None })
    }

    /// Creates a migrator from configuration.
    pub fn from_config(config: &MigrateConfig) -> Result<Self> {
        let mut migrator = Self::with_table(config.table.clone())?;
        migrator.max = config.max;
        Ok(migrator)
    }

    /// Sets the default cap used by [`exec`](Self::exec).
    pub fn with_max(mut self, max: Option<usize>) -> Self {
        self.max = max;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Runs every planned migration in `direction`, up to the configured
    /// cap, and returns how many were applied.
    pub fn exec<T, S>(&self, db: &T, source: &S, direction: Direction) -> Result<usize>
    where
        T: Transport + ?Sized,
        S: MigrationSource + ?Sized,
    {
        self.exec_max(db, source, direction, self.max)
    }

    /// Like [`exec`](Self::exec) but with an explicit cap.
    ///
    /// # Errors
    ///
    /// - [`MigrateError::Ledger`] if the ledger cannot be created or read.
    /// - Any error from the source.
    /// - [`MigrateError::Execution`] on the first failing statement or ledger
    ///   update, carrying the number of migrations completed before it.
    pub fn exec_max<T, S>(
        &self,
        db: &T,
        source: &S,
        direction: Direction,
        max: Option<usize>,
    ) -> Result<usize>
    where
        T: Transport + ?Sized,
        S: MigrationSource + ?Sized,
    {
        let plan = self.plan(db, source, direction, max)?;
        info!(
            table = %self.table,
            %direction,
            planned = plan.len(),
            "running migrations"
        );

        let mut applied = 0;
        for planned in &plan {
            self.apply(db, planned)
                .map_err(|source| MigrateError::Execution {
                    id: planned.id().to_string(),
                    direction,
                    applied,
                    source,
                })?;
            applied += 1;
        }

        info!(applied, %direction, "migrations complete");
        Ok(applied)
    }

    /// Returns the plan [`exec_max`](Self::exec_max) would run, without
    /// running it. The ledger table is created if missing.
    pub fn plan<T, S>(
        &self,
        db: &T,
        source: &S,
        direction: Direction,
        max: Option<usize>,
    ) -> Result<Vec<PlannedMigration>>
    where
        T: Transport + ?Sized,
        S: MigrationSource + ?Sized,
    {
        let applied: Vec<String> = self.applied(db)?.into_iter().map(|r| r.id).collect();
        let known = source.find_migrations()?;
        Ok(plan_migrations(&known, &applied, direction, max))
    }

    /// Returns the ledger in application order, creating the table if
    /// missing.
    pub fn applied<T: Transport + ?Sized>(&self, db: &T) -> Result<Vec<LedgerRecord>> {
        self.ensure_table(db)?;
        let mut cursor = db
            .query_rows(&ledger::select_sql(&self.table), &[])
            .map_err(MigrateError::Ledger)?;
        let records = cursor.scan_all().map_err(MigrateError::Ledger)?;
        cursor.close();
        Ok(records)
    }

    /// Pairs every known migration with its ledger entry.
    pub fn status<T, S>(&self, db: &T, source: &S) -> Result<MigrationStatus>
    where
        T: Transport + ?Sized,
        S: MigrationSource + ?Sized,
    {
        let records = self.applied(db)?;
        let known = source.find_migrations()?;

        let applied_at: HashMap<&str, &str> = records
            .iter()
            .map(|record| (record.id.as_str(), record.applied_at.as_str()))
            .collect();
        let migrations = known
            .iter()
            .map(|m| MigrationState {
                id: m.id.clone(),
                applied_at: applied_at.get(m.id.as_str()).map(|at| at.to_string()),
            })
            .collect();

        let known_ids: HashSet<&str> = known.iter().map(|m| m.id.as_str()).collect();
        let unknown: Vec<LedgerRecord> = records
            .iter()
            .filter(|record| !known_ids.contains(record.id.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            warn!(count = unknown.len(), "ledger has entries with no known migration");
        }

        Ok(MigrationStatus {
            migrations,
            unknown,
        })
    }

    fn ensure_table<T: Transport + ?Sized>(&self, db: &T) -> Result<()> {
        db.exec(&ledger::create_table_sql(&self.table), &[])
            .map_err(MigrateError::Ledger)?;
        Ok(())
    }

    /// Runs one migration's statements, then records it in the ledger.
    fn apply<T: Transport + ?Sized>(&self, db: &T, planned: &PlannedMigration) -> d1_core::Result<()> {
        info!(id = planned.id(), direction = %planned.direction, "applying migration");
        if planned.disable_transaction {
            debug!(id = planned.id(), "notransaction set; statements already run individually");
        }

        for (index, query) in planned.queries.iter().enumerate() {
            debug!(id = planned.id(), statement = index, "executing statement");
            db.execute(query, &[])?;
        }

        let id = planned.id();
        match planned.direction {
            Direction::Up => {
                let applied_at = ledger::now();
                db.exec(&ledger::insert_sql(&self.table), &[&id, &applied_at])?;
            }
            Direction::Down => {
                db.exec(&ledger::delete_sql(&self.table), &[&id])?;
            }
        }
        Ok(())
    }
}
