//! Mode-gated query client over a connection's handles

use serde_json::Value as JsonValue;
use sqlx_sqlite_conn_mgr::{Connection, HandleLease};
use tracing::debug;

use crate::builders::{
   ExecuteBuilder, FetchAllBuilder, FetchOneBuilder, InsertQuery, RawQuery, SelectQuery,
};
use crate::error::WRITE_UNAVAILABLE;
use crate::executor::Target;
use crate::mode::{ClientHandles, ClientMode, Intent, select_handle};
use crate::transaction::Transaction;
use crate::{Error, Result};

/// Query client bound to the handles of one connection.
///
/// The client borrows leases from the connection and never closes them.
/// It is cheap to clone, and many clients can be used concurrently against
/// the same connection; each statement borrows a pooled connection for its
/// own duration.
#[derive(Debug, Clone)]
pub struct QueryClient {
   connection_name: String,
   handles: ClientHandles,
}

impl QueryClient {
   /// Build a client for `mode` from the connection's current handles.
   ///
   /// Fails with `NotConnected` when the connection has not been connected.
   pub fn new(connection: &Connection, mode: ClientMode) -> Result<Self> {
      Ok(Self {
         connection_name: connection.name().to_string(),
         handles: ClientHandles::for_mode(connection, mode)?,
      })
   }

   pub fn mode(&self) -> ClientMode {
      self.handles.mode()
   }

   pub fn connection_name(&self) -> &str {
      &self.connection_name
   }

   /// The write lease; `None` in read mode
   pub fn write_handle(&self) -> Option<&HandleLease> {
      self.handles.write()
   }

   /// The read lease; `None` in write mode
   pub fn read_handle(&self) -> Option<&HandleLease> {
      self.handles.read()
   }

   fn reader(&self) -> Target<'static> {
      Target::Lease(self.handles.reader().clone())
   }

   fn writer(&self) -> Result<Target<'static>> {
      Ok(Target::Lease(
         select_handle(&self.handles, Intent::Write)?.clone(),
      ))
   }

   /// SELECT builder on the read route
   pub fn query(&self) -> SelectQuery<'static> {
      SelectQuery::new(self.reader())
   }

   /// Shortcut for `query().from(table)`
   pub fn from(&self, table: impl Into<String>) -> SelectQuery<'static> {
      self.query().from(table)
   }

   /// INSERT builder on the write route.
   ///
   /// Fails immediately with [`Error::WriteUnavailable`] in read mode.
   pub fn insert_query(&self) -> Result<InsertQuery<'static>> {
      Ok(InsertQuery::new(self.writer()?))
   }

   /// Write statement on the write route. Fails immediately in read mode.
   pub fn execute(&self, query: String, values: Vec<JsonValue>) -> Result<ExecuteBuilder<'static>> {
      Ok(ExecuteBuilder::new(self.writer()?, query, values))
   }

   /// SELECT statement returning every row, on the read route
   pub fn fetch_all(&self, query: String, values: Vec<JsonValue>) -> FetchAllBuilder<'static> {
      FetchAllBuilder::new(self.reader(), query, values)
   }

   /// SELECT statement returning zero or one row, on the read route
   pub fn fetch_one(&self, query: String, values: Vec<JsonValue>) -> FetchOneBuilder<'static> {
      FetchOneBuilder::new(self.reader(), query, values)
   }

   /// Raw statement on the read route (read handle if present, else write).
   ///
   /// Raw SQL is not classified, so a read client can run any statement
   /// through it.
   pub fn raw(&self, sql: impl Into<String>) -> RawQuery<'static> {
      RawQuery::new(self.reader(), sql.into())
   }

   /// Begin a transaction on the write handle.
   ///
   /// Fails with [`Error::Runtime`] in read mode and with
   /// [`Error::TransactionStart`] when the driver cannot begin.
   pub async fn transaction(&self) -> Result<Transaction<'static>> {
      let write = match select_handle(&self.handles, Intent::Write) {
         Ok(write) => write,
         Err(Error::WriteUnavailable) => return Err(Error::Runtime(WRITE_UNAVAILABLE.to_string())),
         Err(e) => return Err(e),
      };

      let tx = write.begin().await.map_err(Error::from_begin)?;
      debug!(connection = %self.connection_name, handle = %write.id(), "Transaction started");

      Ok(Transaction::new(tx, write.clone(), self.connection_name.clone()))
   }
}

/// Query client constructors on [`Connection`]
pub trait ConnectionExt {
   /// Client for `mode` over this connection's handles
   fn get_client(&self, mode: ClientMode) -> Result<QueryClient>;

   /// Client in [`ClientMode::Dual`]
   fn get_default_client(&self) -> Result<QueryClient> {
      self.get_client(ClientMode::default())
   }
}

impl ConnectionExt for Connection {
   fn get_client(&self, mode: ClientMode) -> Result<QueryClient> {
      QueryClient::new(self, mode)
   }
}
