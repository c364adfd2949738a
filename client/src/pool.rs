//! Connection cache keyed by database name.
//!
//! Resolving a database name to its identifier costs a round trip, so
//! [`ConnectionPool`] caches the result. Entries expire lazily: each lookup
//! compares the entry's age against the configured maximum, and there is no
//! background eviction. A single reader/writer lock guards the whole cache
//! together with the current-database selection.
//!
//! The pool is itself a [`Transport`] that routes statements to the current
//! database, so the typed helpers from [`QueryExt`](d1_core::QueryExt) work
//! on it directly.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use d1_core::{D1Error, Envelope, Transport};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Resolves database names and opens transports to them.
pub trait Connector {
    type Transport: Transport;

    /// Looks up the identifier of the database called `name`.
    fn resolve(&self, name: &str) -> d1_core::Result<String>;

    /// Opens a transport bound to `database_id`.
    fn open(&self, database_id: &str) -> d1_core::Result<Self::Transport>;
}

/// A cached name-to-identifier resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub database_id: String,
    pub name: String,
    pub cached_at: Instant,
}

impl ConnectionInfo {
    fn new(name: &str, database_id: String) -> Self {
        Self {
            database_id,
            name: name.to_string(),
            cached_at: Instant::now(),
        }
    }

    fn is_fresh(&self, max_age: Duration) -> bool {
        self.cached_at.elapsed() < max_age
    }
}

#[derive(Debug)]
struct PoolState {
    connections: HashMap<String, ConnectionInfo>,
    current: Option<String>,
    max_age: Duration,
}

/// Caches database identifiers and tracks the current database.
///
/// # Examples
///
/// ```no_run
/// use d1_client::{ConnectionPool, LocalConnector};
/// use d1_core::QueryExt;
///
/// let pool = ConnectionPool::new(LocalConnector::new("./.d1"));
/// pool.connect("app").unwrap();
/// let summary = pool.exec("DELETE FROM sessions WHERE expired = ?", &[&true]).unwrap();
/// println!("removed {} sessions", summary.rows_affected);
/// ```
#[derive(Debug)]
pub struct ConnectionPool<C> {
    connector: C,
    state: RwLock<PoolState>,
}

impl<C: Connector> ConnectionPool<C> {
    /// Creates a pool with the default 24 hour cache age.
    pub fn new(connector: C) -> Self {
        Self::with_max_age(connector, ClientConfig::default().max_cache_age())
    }

    pub fn with_max_age(connector: C, max_age: Duration) -> Self {
        Self {
            connector,
            state: RwLock::new(PoolState {
                connections: HashMap::new(),
                current: None,
                max_age,
            }),
        }
    }

    /// Builds a pool from configuration, connecting to the default database
    /// if one is set.
    pub fn from_config(connector: C, config: &ClientConfig) -> Result<Self> {
        let pool = Self::with_max_age(connector, config.max_cache_age());
        if let Some(name) = &config.default_database {
            pool.connect(name)?;
        }
        Ok(pool)
    }

    fn read(&self) -> RwLockReadGuard<'_, PoolState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PoolState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Selects `name` as the current database, resolving it unless a fresh
    /// cache entry exists.
    pub fn connect(&self, name: &str) -> Result<()> {
        let mut state = self.write();
        let max_age = state.max_age;
        if state
            .connections
            .get(name)
            .is_some_and(|info| info.is_fresh(max_age))
        {
            debug!(database = name, "connection cache hit");
            state.current = Some(name.to_string());
            return Ok(());
        }

        debug!(database = name, "connection cache miss, resolving");
        let database_id = self
            .connector
            .resolve(name)
            .map_err(|source| ClientError::Connect {
                name: name.to_string(),
                source,
            })?;
        state
            .connections
            .insert(name.to_string(), ConnectionInfo::new(name, database_id));
        state.current = Some(name.to_string());
        Ok(())
    }

    /// Caches a known identifier and selects it without resolving.
    pub fn connect_with_id(&self, name: &str, database_id: impl Into<String>) {
        let mut state = self.write();
        state
            .connections
            .insert(name.to_string(), ConnectionInfo::new(name, database_id.into()));
        state.current = Some(name.to_string());
    }

    /// Returns the name of the current database.
    pub fn current_database(&self) -> Option<String> {
        self.read().current.clone()
    }

    /// Returns the cached identifier for `name`, fresh or not.
    pub fn database_id(&self, name: &str) -> Option<String> {
        self.read()
            .connections
            .get(name)
            .map(|info| info.database_id.clone())
    }

    /// Returns `true` if `name` has an unexpired cache entry.
    pub fn is_cached(&self, name: &str) -> bool {
        let state = self.read();
        state
            .connections
            .get(name)
            .is_some_and(|info| info.is_fresh(state.max_age))
    }

    /// Returns a copy of the cache entry for `name`.
    pub fn cache_info(&self, name: &str) -> Option<ConnectionInfo> {
        self.read().connections.get(name).cloned()
    }

    /// Returns the names of all cached databases, sorted.
    pub fn cached_databases(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().connections.keys().cloned().collect();
        names.sort();
        names
    }

    /// Forgets `name`, forcing the next [`connect`](Self::connect) to resolve.
    pub fn clear(&self, name: &str) {
        self.write().connections.remove(name);
    }

    /// Forgets every entry and the current selection.
    pub fn clear_all(&self) {
        let mut state = self.write();
        state.connections.clear();
        state.current = None;
    }

    /// Sets the maximum entry age. Zero disables caching.
    pub fn set_max_age(&self, max_age: Duration) {
        self.write().max_age = max_age;
    }

    pub fn max_age(&self) -> Duration {
        self.read().max_age
    }

    fn cached_id(&self, name: &str) -> Result<String> {
        self.database_id(name)
            .ok_or_else(|| ClientError::DatabaseNotConnected(name.to_string()))
    }

    /// Opens a transport to the current database.
    pub fn transport(&self) -> Result<C::Transport> {
        let name = self.current_database().ok_or(ClientError::NotConnected)?;
        let id = self.cached_id(&name)?;
        Ok(self.connector.open(&id)?)
    }

    /// Opens a transport to a specific cached database.
    pub fn transport_for(&self, name: &str) -> Result<C::Transport> {
        let id = self.cached_id(name)?;
        Ok(self.connector.open(&id)?)
    }

    /// Runs a statement on a specific cached database.
    pub fn query_database(
        &self,
        name: &str,
        sql: &str,
        params: &[String],
    ) -> d1_core::Result<Envelope> {
        self.transport_for(name)
            .map_err(D1Error::transport)?
            .query(sql, params)
    }
}

impl<C: Connector> Transport for ConnectionPool<C> {
    fn query(&self, sql: &str, params: &[String]) -> d1_core::Result<Envelope> {
        self.transport()
            .map_err(D1Error::transport)?
            .query(sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Resolves every name to `id-<name>` and counts lookups.
    struct Counting {
        lookups: Cell<usize>,
    }

    struct Echo(String);

    impl Transport for Echo {
        fn query(&self, sql: &str, _params: &[String]) -> d1_core::Result<Envelope> {
            Ok(Envelope::ok(serde_json::json!({
                "results": {"columns": ["db", "sql"], "rows": [[self.0, sql]]}
            })))
        }
    }

    impl Connector for Counting {
        type Transport = Echo;

        fn resolve(&self, name: &str) -> d1_core::Result<String> {
            self.lookups.set(self.lookups.get() + 1);
            if name == "missing" {
                return Err(D1Error::Api(format!("database with name {name} not found")));
            }
            Ok(format!("id-{name}"))
        }

        fn open(&self, database_id: &str) -> d1_core::Result<Echo> {
            Ok(Echo(database_id.to_string()))
        }
    }

    fn pool() -> ConnectionPool<Counting> {
        ConnectionPool::new(Counting {
            lookups: Cell::new(0),
        })
    }

    #[test]
    fn test_connect_caches_resolution() {
        let pool = pool();
        pool.connect("app").unwrap();
        pool.connect("app").unwrap();
        assert_eq!(pool.connector.lookups.get(), 1);
        assert_eq!(pool.current_database().as_deref(), Some("app"));
        assert_eq!(pool.database_id("app").as_deref(), Some("id-app"));
        assert!(pool.is_cached("app"));
    }

    #[test]
    fn test_zero_max_age_always_resolves() {
        let pool = pool();
        pool.set_max_age(Duration::ZERO);
        pool.connect("app").unwrap();
        pool.connect("app").unwrap();
        assert_eq!(pool.connector.lookups.get(), 2);
        assert!(!pool.is_cached("app"));
    }

    #[test]
    fn test_connect_failure() {
        let pool = pool();
        let err = pool.connect("missing").unwrap_err();
        assert!(matches!(err, ClientError::Connect { ref name, .. } if name == "missing"));
        assert!(pool.current_database().is_none());
    }

    #[test]
    fn test_query_routes_to_current_database() {
        let pool = pool();
        assert!(matches!(
            pool.query("SELECT 1", &[]),
            Err(D1Error::Transport(_))
        ));

        pool.connect("a").unwrap();
        pool.connect_with_id("b", "explicit-b");
        let set = pool.query("SELECT 1", &[]).unwrap().normalize().unwrap();
        assert_eq!(set.rows[0]["db"], "explicit-b");

        let set = pool
            .query_database("a", "SELECT 2", &[])
            .unwrap()
            .normalize()
            .unwrap();
        assert_eq!(set.rows[0]["db"], "id-a");
        assert!(pool.query_database("zzz", "SELECT 3", &[]).is_err());
    }

    #[test]
    fn test_clear_and_listing() {
        let pool = pool();
        pool.connect("b").unwrap();
        pool.connect("a").unwrap();
        assert_eq!(pool.cached_databases(), ["a", "b"]);
        assert_eq!(pool.cache_info("a").unwrap().database_id, "id-a");

        pool.clear("a");
        assert!(pool.cache_info("a").is_none());
        assert!(matches!(
            pool.transport(),
            Err(ClientError::DatabaseNotConnected(name)) if name == "a"
        ));

        pool.clear_all();
        assert!(pool.cached_databases().is_empty());
        assert!(matches!(pool.transport(), Err(ClientError::NotConnected)));
    }
}
