//! Where migrations come from.
//!
//! A [`MigrationSource`] returns every migration it knows about, sorted by
//! [`compare_ids`](crate::compare_ids). Three providers are included: a
//! fixed in-memory list, a directory of `.sql` files read at runtime, and a
//! directory bundled into the binary with [`include_dir`].

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use include_dir::Dir;
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::migration::{Migration, sort_migrations};
use crate::parser::parse_migration;

const MIGRATION_EXTENSION: &str = "sql";

/// Provides the set of known migrations.
pub trait MigrationSource {
    /// Returns all migrations, sorted by id.
    fn find_migrations(&self) -> Result<Vec<Migration>>;
}

impl<T: MigrationSource + ?Sized> MigrationSource for &T {
    fn find_migrations(&self) -> Result<Vec<Migration>> {
        (**self).find_migrations()
    }
}

/// A fixed list of migrations held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    migrations: Vec<Migration>,
}

impl MemorySource {
    pub fn new(migrations: Vec<Migration>) -> Self {
        Self { migrations }
    }

    pub fn push(&mut self, migration: Migration) {
        self.migrations.push(migration);
    }
}

impl From<Vec<Migration>> for MemorySource {
    fn from(migrations: Vec<Migration>) -> Self {
        Self::new(migrations)
    }
}

impl MigrationSource for MemorySource {
    fn find_migrations(&self) -> Result<Vec<Migration>> {
        let mut migrations = self.migrations.clone();
        sort_migrations(&mut migrations);
        Ok(migrations)
    }
}

/// Loads every `*.sql` file in a directory, using the file name as the id.
///
/// Sub-directories are not searched.
#[derive(Debug, Clone)]
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl MigrationSource for DirSource {
    fn find_migrations(&self) -> Result<Vec<Migration>> {
        let mut migrations = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type()?.is_file() || !has_migration_extension(&path) {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            let file = File::open(&path).map_err(|source| MigrateError::Parse {
                id: id.clone(),
                source,
            })?;
            migrations.push(parse_migration(id, BufReader::new(file))?);
        }
        sort_migrations(&mut migrations);
        debug!(dir = %self.dir.display(), count = migrations.len(), "loaded migrations");
        Ok(migrations)
    }
}

/// Loads `*.sql` files from a directory embedded at compile time.
///
/// ```ignore
/// use d1_migrate::EmbeddedSource;
/// use include_dir::{Dir, include_dir};
///
/// static MIGRATIONS: Dir = include_dir!("$CARGO_MANIFEST_DIR/migrations");
///
/// let source = EmbeddedSource::new(&MIGRATIONS);
/// ```
#[derive(Debug, Clone)]
pub struct EmbeddedSource {
    dir: &'static Dir<'static>,
    root: Option<PathBuf>,
}

impl EmbeddedSource {
    pub fn new(dir: &'static Dir<'static>) -> Self {
        Self { dir, root: None }
    }

    /// Reads migrations from a sub-directory of the embedded tree instead of
    /// its top level.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }
}

impl MigrationSource for EmbeddedSource {
    fn find_migrations(&self) -> Result<Vec<Migration>> {
        let dir = match &self.root {
            Some(root) => self.dir.get_dir(root).ok_or_else(|| {
                MigrateError::Source(format!(
                    "embedded directory '{}' not found",
                    root.display()
                ))
            })?,
            None => self.dir,
        };

        let mut migrations = Vec::new();
        for file in dir.files() {
            let path = file.path();
            if !has_migration_extension(path) {
                continue;
            }
            let Some(name) = path.file_name() else {
                continue;
            };
            let id = name.to_string_lossy().into_owned();
            migrations.push(parse_migration(id, file.contents())?);
        }
        sort_migrations(&mut migrations);
        Ok(migrations)
    }
}

fn has_migration_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == MIGRATION_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_sorts() {
        let source = MemorySource::new(vec![
            Migration::new("alpha"),
            Migration::new("10_x"),
            Migration::new("2_y"),
        ]);
        let ids: Vec<String> = source
            .find_migrations()
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, ["2_y", "10_x", "alpha"]);
    }

    #[test]
    fn test_dir_source_reads_sql_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2_b.sql"), "-- +migrate Up\nB;").unwrap();
        std::fs::write(dir.path().join("1_a.sql"), "-- +migrate Up\nA;\n-- +migrate Down\nUNDO A;").unwrap();
        std::fs::write(dir.path().join("README.md"), "not a migration").unwrap();
        std::fs::create_dir(dir.path().join("3_dir.sql")).unwrap();

        let migrations = DirSource::new(dir.path()).find_migrations().unwrap();
        let ids: Vec<&str> = migrations.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["1_a.sql", "2_b.sql"]);
        assert_eq!(migrations[0].down, ["UNDO A"]);
    }

    #[test]
    fn test_dir_source_missing_directory() {
        let err = DirSource::new("/definitely/not/here").find_migrations().unwrap_err();
        assert!(matches!(err, MigrateError::Io(_)));
    }
}
