//! Client configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! max_cache_age_secs: 3600
//! default_database: app
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

const DEFAULT_MAX_CACHE_AGE_SECS: u64 = 24 * 60 * 60;

fn default_max_cache_age_secs() -> u64 {
    DEFAULT_MAX_CACHE_AGE_SECS
}

/// Settings for a [`ConnectionPool`](crate::ConnectionPool).
///
/// # Examples
///
/// ```
/// # use d1_client::ClientConfig;
/// let config: ClientConfig = serde_yaml::from_str("default_database: app").unwrap();
/// assert_eq!(config.max_cache_age().as_secs(), 86_400);
/// assert_eq!(config.default_database.as_deref(), Some("app"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// How long a resolved database identifier stays valid. Zero disables
    /// caching.
    #[serde(default = "default_max_cache_age_secs")]
    pub max_cache_age_secs: u64,
    /// Database to select when the pool is built from this config.
    #[serde(default)]
    pub default_database: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_cache_age_secs: DEFAULT_MAX_CACHE_AGE_SECS,
            default_database: None,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::ClientError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::ClientError::Yaml) if parsing fails.
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

    pub fn max_cache_age(&self) -> Duration {
        Duration::from_secs(self.max_cache_age_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_complete() {
        let config: ClientConfig =
            serde_yaml::from_str("max_cache_age_secs: 60\ndefault_database: prod\n").unwrap();
        assert_eq!(config.max_cache_age(), Duration::from_secs(60));
        assert_eq!(config.default_database.as_deref(), Some("prod"));
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: ClientConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.yml");
        let original = ClientConfig {
            max_cache_age_secs: 5,
            default_database: Some("app".into()),
        };
        original.save(&path).unwrap();
        assert_eq!(ClientConfig::load(&path).unwrap(), original);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ClientConfig::load(dir.path().join("nope.yml")).is_err());
    }
}
