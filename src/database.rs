//! Facade over the default connection

use sqlx_sqlite_toolkit::{ClientMode, InsertQuery, QueryClient, RawQuery, SelectQuery, Transaction};

use crate::{ConnectionManager, DatabaseConfig, Error, Result};

/// Entry point holding every configured connection.
///
/// Connections are opened lazily on first use. The shortcut methods run on
/// the default connection in [`ClientMode::Dual`].
#[derive(Debug)]
pub struct Database {
   primary: String,
   manager: ConnectionManager,
}

impl Database {
   /// Register every configured connection. Nothing is opened yet.
   ///
   /// Fails when the default connection is not among the configured ones.
   pub fn new(config: DatabaseConfig) -> Result<Self> {
      if !config.connections.contains_key(&config.connection) {
         return Err(Error::UnknownConnection(config.connection));
      }

      Ok(Self {
         primary: config.connection,
         manager: ConnectionManager::with_connections(config.connections),
      })
   }

   pub fn primary_name(&self) -> &str {
      &self.primary
   }

   pub fn manager(&self) -> &ConnectionManager {
      &self.manager
   }

   /// Client for a named connection, connecting it when needed
   pub async fn connection(&self, name: &str, mode: ClientMode) -> Result<QueryClient> {
      self.manager.client(name, mode).await
   }

   /// Client for the default connection
   pub async fn client(&self, mode: ClientMode) -> Result<QueryClient> {
      self.connection(&self.primary, mode).await
   }

   pub async fn query(&self) -> Result<SelectQuery<'static>> {
      Ok(self.client(ClientMode::Dual).await?.query())
   }

   pub async fn from(&self, table: impl Into<String>) -> Result<SelectQuery<'static>> {
      Ok(self.query().await?.from(table))
   }

   pub async fn insert_query(&self) -> Result<InsertQuery<'static>> {
      Ok(self.client(ClientMode::Dual).await?.insert_query()?)
   }

   pub async fn raw(&self, sql: impl Into<String>) -> Result<RawQuery<'static>> {
      Ok(self.client(ClientMode::Dual).await?.raw(sql))
   }

   pub async fn transaction(&self) -> Result<Transaction<'static>> {
      Ok(self.client(ClientMode::Dual).await?.transaction().await?)
   }

   /// Disconnect every connection
   pub async fn close(&self) -> Result<()> {
      self.manager.close_all().await
   }
}
