//! Migration configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! table: schema_migrations
//! dir: db/migrations
//! max: 1
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ledger::DEFAULT_TABLE;

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_dir() -> PathBuf {
    PathBuf::from("migrations")
}

/// Settings for a [`Migrator`](crate::Migrator).
///
/// # Examples
///
/// ```
/// # use d1_migrate::MigrateConfig;
/// let config: MigrateConfig = serde_yaml::from_str("max: 2").unwrap();
/// assert_eq!(config.table, "d1_migrations");
/// assert_eq!(config.dir.to_str(), Some("migrations"));
/// assert_eq!(config.max, Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrateConfig {
    /// Name of the ledger table.
    #[serde(default = "default_table")]
    pub table: String,
    /// Directory holding `*.sql` migration files.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
    /// Maximum number of migrations to run per invocation. Unlimited when
    /// absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            dir: default_dir(),
            max: None,
        }
    }
}

impl MigrateConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::MigrateError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::MigrateError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}
