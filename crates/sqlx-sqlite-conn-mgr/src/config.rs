//! Configuration for a named SQLite connection and its pools

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Database engine a connection talks to.
///
/// Accepts the common client aliases used by configuration files
/// (`sqlite3`, `better-sqlite3`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
   #[default]
   #[serde(alias = "sqlite3", alias = "better-sqlite3")]
   Sqlite,
}

impl std::fmt::Display for ClientType {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      match self {
         ClientType::Sqlite => write!(f, "sqlite"),
      }
   }
}

/// Location of one database endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
   /// Path to the database file
   pub filename: PathBuf,

   /// Create the file when it does not exist. Ignored for read endpoints,
   /// which are always opened read-only.
   ///
   /// Default: true
   #[serde(default = "default_true")]
   pub create_if_missing: bool,
}

impl EndpointConfig {
   pub fn new(filename: impl Into<PathBuf>) -> Self {
      Self {
         filename: filename.into(),
         create_if_missing: true,
      }
   }
}

/// A distinct read endpoint used instead of the write endpoint for reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaConfig {
   /// The read endpoint
   pub read: EndpointConfig,

   /// Pool bounds for the read endpoint. Falls back to the connection's
   /// `pool` settings when absent.
   #[serde(default)]
   pub pool: Option<PoolConfig>,
}

/// Connection pool bounds and timeouts
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_conn_mgr::PoolConfig;
/// use std::time::Duration;
///
/// let pool = PoolConfig {
///     max_connections: 2,
///     acquire_timeout: Duration::from_secs(5),
///     ..Default::default()
/// };
/// assert_eq!(pool.min_connections, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
   /// Connections kept open even when idle
   ///
   /// Default: 0
   pub min_connections: u32,

   /// Maximum number of concurrent connections in the pool
   ///
   /// Default: 6
   pub max_connections: u32,

   /// Connections that remain idle for this duration are closed automatically.
   ///
   /// Default: 30 seconds
   #[serde(rename = "idle_timeout_ms", with = "millis")]
   pub idle_timeout: Duration,

   /// How long an operation waits for a free pooled connection before failing
   ///
   /// Default: 30 seconds
   #[serde(rename = "acquire_timeout_ms", with = "millis")]
   pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
   fn default() -> Self {
      Self {
         min_connections: 0,
         max_connections: 6,
         idle_timeout: Duration::from_secs(30),
         acquire_timeout: Duration::from_secs(30),
      }
   }
}

/// Configuration for one logical connection.
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_conn_mgr::{ConnectionConfig, EndpointConfig, ReplicaConfig};
///
/// // Write endpoint only: reads are served by the write pool
/// let config = ConnectionConfig::sqlite("app.db");
/// assert!(config.replicas.is_none());
///
/// // Separate read endpoint
/// let config = ConnectionConfig {
///     replicas: Some(ReplicaConfig {
///         read: EndpointConfig::new("replica.db"),
///         pool: None,
///     }),
///     ..ConnectionConfig::sqlite("app.db")
/// };
/// assert!(config.replicas.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
   /// Engine for this connection
   #[serde(default)]
   pub client: ClientType,

   /// Write endpoint
   pub connection: EndpointConfig,

   /// Optional distinct read endpoint
   #[serde(default)]
   pub replicas: Option<ReplicaConfig>,

   /// Pool bounds for the write endpoint
   #[serde(default)]
   pub pool: PoolConfig,

   /// How long a statement waits on a locked database before failing
   ///
   /// Default: 5 seconds
   #[serde(
      rename = "busy_timeout_ms",
      with = "millis",
      default = "default_busy_timeout"
   )]
   pub busy_timeout: Duration,

   /// Upper bound on how long `disconnect()` waits for one pool to close.
   /// Pools wait for leased connections to be returned before closing.
   ///
   /// Default: 5 seconds
   #[serde(
      rename = "close_timeout_ms",
      with = "millis",
      default = "default_close_timeout"
   )]
   pub close_timeout: Duration,

   /// Log every statement at `debug` level instead of `trace`
   ///
   /// Default: false
   #[serde(default)]
   pub debug: bool,
}

impl ConnectionConfig {
   /// SQLite connection with defaults for everything but the file name
   pub fn sqlite(filename: impl Into<PathBuf>) -> Self {
      Self {
         client: ClientType::Sqlite,
         connection: EndpointConfig::new(filename),
         replicas: None,
         pool: PoolConfig::default(),
         busy_timeout: default_busy_timeout(),
         close_timeout: default_close_timeout(),
         debug: false,
      }
   }

   /// Pool settings used for the read endpoint
   pub fn read_pool(&self) -> &PoolConfig {
      self
         .replicas
         .as_ref()
         .and_then(|replicas| replicas.pool.as_ref())
         .unwrap_or(&self.pool)
   }
}

fn default_true() -> bool {
   true
}

fn default_busy_timeout() -> Duration {
   Duration::from_secs(5)
}

fn default_close_timeout() -> Duration {
   Duration::from_secs(5)
}

mod millis {
   use std::time::Duration;

   use serde::{Deserialize, Deserializer, Serializer};

   pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
      serializer.serialize_u64(value.as_millis() as u64)
   }

   pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
      u64::deserialize(deserializer).map(Duration::from_millis)
   }
}
