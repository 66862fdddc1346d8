//! Configuration for a set of named connections

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlx_sqlite_conn_mgr::ConnectionConfig;

/// Named connections plus the one used by the [`Database`](crate::Database)
/// shortcuts.
///
/// ```
/// use sqlx_sqlite_db::DatabaseConfig;
///
/// let config: DatabaseConfig = serde_json::from_value(serde_json::json!({
///    "connection": "primary",
///    "connections": {
///       "primary": { "connection": { "filename": "app.db" } }
///    }
/// }))
/// .unwrap();
/// assert_eq!(config.connection, "primary");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
   /// Name of the default connection
   pub connection: String,

   /// Every connection, in registration order
   #[serde(default)]
   pub connections: IndexMap<String, ConnectionConfig>,
}

impl DatabaseConfig {
   /// Config with a single connection that is also the default
   pub fn single(name: impl Into<String>, config: ConnectionConfig) -> Self {
      let name = name.into();
      let mut connections = IndexMap::new();
      connections.insert(name.clone(), config);
      Self {
         connection: name,
         connections,
      }
   }

   pub fn with_connection(mut self, name: impl Into<String>, config: ConnectionConfig) -> Self {
      self.connections.insert(name.into(), config);
      self
   }
}
