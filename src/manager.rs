//! Registry of named connections

use std::sync::Arc;

use indexmap::IndexMap;
use sqlx_sqlite_conn_mgr::{Connection, ConnectionConfig, ConnectionState};
use sqlx_sqlite_toolkit::{ClientMode, ConnectionExt, QueryClient};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Named connections managed together.
///
/// The map lock is only held for lookups and inserts; lifecycle calls run on
/// a cloned `Arc<Connection>` so one slow connect never blocks other names.
#[derive(Debug, Default)]
pub struct ConnectionManager {
   connections: RwLock<IndexMap<String, Arc<Connection>>>,
}

impl ConnectionManager {
   pub fn new() -> Self {
      Self::default()
   }

   /// Manager pre-populated with unconnected connections
   pub fn with_connections<I, S>(connections: I) -> Self
   where
      I: IntoIterator<Item = (S, ConnectionConfig)>,
      S: Into<String>,
   {
      let connections = connections
         .into_iter()
         .map(|(name, config)| {
            let name = name.into();
            let connection = Arc::new(Connection::new(name.clone(), config));
            (name, connection)
         })
         .collect();

      Self {
         connections: RwLock::new(connections),
      }
   }

   /// Register a connection without connecting it.
   ///
   /// An existing entry with the same name is replaced only when it is not
   /// connected, connecting or closing.
   pub async fn add(&self, name: impl Into<String>, config: ConnectionConfig) -> Result<Arc<Connection>> {
      let name = name.into();
      let mut connections = self.connections.write().await;

      if let Some(existing) = connections.get(&name)
         && is_live(existing.state())
      {
         return Err(Error::DuplicateConnection(name));
      }

      let connection = Arc::new(Connection::new(name.clone(), config));
      connections.insert(name.clone(), Arc::clone(&connection));
      debug!(connection = %name, "Connection registered");

      Ok(connection)
   }

   pub async fn has(&self, name: &str) -> bool {
      self.connections.read().await.contains_key(name)
   }

   /// Registered names, in registration order
   pub async fn names(&self) -> Vec<String> {
      self.connections.read().await.keys().cloned().collect()
   }

   pub async fn get(&self, name: &str) -> Result<Arc<Connection>> {
      self
         .connections
         .read()
         .await
         .get(name)
         .cloned()
         .ok_or_else(|| Error::UnknownConnection(name.to_string()))
   }

   /// Connect a registered connection. Already connected is a no-op.
   pub async fn connect(&self, name: &str) -> Result<Arc<Connection>> {
      let connection = self.get(name).await?;
      connection.connect().await?;
      Ok(connection)
   }

   pub async fn is_connected(&self, name: &str) -> bool {
      match self.get(name).await {
         Ok(connection) => connection.is_connected(),
         Err(_) => false,
      }
   }

   /// Client for `mode`, connecting first when needed
   pub async fn client(&self, name: &str, mode: ClientMode) -> Result<QueryClient> {
      let connection = self.connect(name).await?;
      Ok(connection.get_client(mode)?)
   }

   /// Disconnect a connection and keep it registered
   pub async fn close(&self, name: &str) -> Result<()> {
      let connection = self.get(name).await?;
      connection.disconnect().await?;
      Ok(())
   }

   /// Disconnect every connection.
   ///
   /// All connections are attempted; the first failure is returned.
   pub async fn close_all(&self) -> Result<()> {
      let connections: Vec<Arc<Connection>> =
         self.connections.read().await.values().cloned().collect();

      let mut first_error = None;
      for connection in connections {
         if let Err(e) = connection.disconnect().await {
            warn!(connection = %connection.name(), error = %e, "Failed to close connection");
            first_error.get_or_insert(Error::from(e));
         }
      }

      match first_error {
         Some(e) => Err(e),
         None => Ok(()),
      }
   }

   /// Disconnect a connection and remove it from the registry.
   ///
   /// The entry is removed even when closing fails.
   pub async fn release(&self, name: &str) -> Result<()> {
      let connection = self
         .connections
         .write()
         .await
         .shift_remove(name)
         .ok_or_else(|| Error::UnknownConnection(name.to_string()))?;

      debug!(connection = %name, "Connection released");
      connection.disconnect().await?;
      Ok(())
   }
}

fn is_live(state: ConnectionState) -> bool {
   matches!(
      state,
      ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Closing
   )
}
