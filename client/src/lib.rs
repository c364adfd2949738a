//! Connection management for D1 databases.
//!
//! This crate sits between the row engine in [`d1_core`] and whatever
//! actually carries statements to a database:
//!
//! - **`pool`**: [`ConnectionPool`] caches name-to-identifier resolutions
//!   with lazy expiry and routes queries to the current database.
//! - **`local`**: [`LocalTransport`] runs statements against a SQLite file
//!   and answers with D1-shaped envelopes, which makes it usable for local
//!   development and for tests.
//! - **`config`**: [`ClientConfig`], loaded from YAML.
//!
//! # Quick start
//!
//! ```no_run
//! use d1_client::{ClientConfig, ConnectionPool, LocalConnector};
//! use d1_core::QueryExt;
//!
//! #[derive(Debug, Default)]
//! struct Count {
//!     n: i64,
//! }
//! d1_core::record!(Count { n });
//!
//! let config = ClientConfig::load("d1.yaml").unwrap();
//! let pool = ConnectionPool::from_config(LocalConnector::new(".d1"), &config).unwrap();
//! let count: Count = pool.get("SELECT COUNT(*) AS n FROM users", &[]).unwrap();
//! println!("{} users", count.n);
//! ```

mod config;
mod error;
mod local;
mod pool;

pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use local::{LocalConnector, LocalTransport};
pub use pool::{ConnectionInfo, ConnectionPool, Connector};
