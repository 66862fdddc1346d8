//! Finalize-once transactions on a leased write connection

use serde_json::Value as JsonValue;
use sqlx::Sqlite;
use sqlx::sqlite::SqliteConnection;
use sqlx_sqlite_conn_mgr::{HandleId, HandleLease};
use tracing::{debug, warn};

use crate::builders::{
   ExecuteBuilder, FetchAllBuilder, FetchOneBuilder, InsertQuery, RawQuery, SelectQuery,
};
use crate::executor::Target;
use crate::{Error, Result};

/// An open transaction.
///
/// Holds one pooled write connection until [`commit`](Self::commit) or
/// [`rollback`](Self::rollback) runs. Statement builders borrow the
/// transaction mutably, so statements execute in the order they are
/// awaited. [`transaction`](Self::transaction) opens a nested savepoint on
/// the same connection.
///
/// Either finalizer completes the transaction, also when the driver call
/// fails; every later operation fails with [`Error::TransactionClosed`].
/// Dropping an unfinalized transaction rolls it back.
///
/// The transaction keeps a lease on its write handle. Once the owning
/// connection closes that handle, the next operation rolls the transaction
/// back and fails with `ConnectionClosed`.
#[must_use = "if unused, the transaction is immediately rolled back"]
pub struct Transaction<'c> {
   inner: Option<sqlx::Transaction<'c, Sqlite>>,
   lease: HandleLease,
   connection_name: String,
   depth: usize,
}

impl<'c> Transaction<'c> {
   pub(crate) fn new(
      inner: sqlx::Transaction<'c, Sqlite>,
      lease: HandleLease,
      connection_name: String,
   ) -> Self {
      Self {
         inner: Some(inner),
         lease,
         connection_name,
         depth: 0,
      }
   }

   pub fn is_completed(&self) -> bool {
      self.inner.is_none()
   }

   /// 0 for a top-level transaction, n for the n-th nested savepoint
   pub fn depth(&self) -> usize {
      self.depth
   }

   /// The write handle this transaction runs on
   pub fn handle_id(&self) -> HandleId {
      self.lease.id()
   }

   /// Roll back and fail when the write handle was closed under us
   fn ensure_handle_open(&mut self) -> Result<()> {
      if self.inner.is_some() && self.lease.is_closed() {
         // Dropping the inner transaction queues its rollback
         self.inner = None;
         warn!(
            connection = %self.connection_name,
            depth = self.depth,
            "Write handle closed under an open transaction; rolled back"
         );
         return Err(Error::ConnectionManager(
            sqlx_sqlite_conn_mgr::Error::ConnectionClosed,
         ));
      }
      Ok(())
   }

   fn conn(&mut self) -> Result<&mut SqliteConnection> {
      self.ensure_handle_open()?;
      self.inner.as_deref_mut().ok_or(Error::TransactionClosed)
   }

   /// SELECT builder on the transaction's connection
   pub fn query(&mut self) -> Result<SelectQuery<'_>> {
      Ok(SelectQuery::new(Target::Connection(self.conn()?)))
   }

   /// Shortcut for `query()?.from(table)`
   pub fn from(&mut self, table: impl Into<String>) -> Result<SelectQuery<'_>> {
      Ok(self.query()?.from(table))
   }

   /// INSERT builder on the transaction's connection
   pub fn insert_query(&mut self) -> Result<InsertQuery<'_>> {
      Ok(InsertQuery::new(Target::Connection(self.conn()?)))
   }

   pub fn execute(&mut self, query: String, values: Vec<JsonValue>) -> Result<ExecuteBuilder<'_>> {
      Ok(ExecuteBuilder::new(Target::Connection(self.conn()?), query, values))
   }

   pub fn fetch_all(&mut self, query: String, values: Vec<JsonValue>) -> Result<FetchAllBuilder<'_>> {
      Ok(FetchAllBuilder::new(Target::Connection(self.conn()?), query, values))
   }

   pub fn fetch_one(&mut self, query: String, values: Vec<JsonValue>) -> Result<FetchOneBuilder<'_>> {
      Ok(FetchOneBuilder::new(Target::Connection(self.conn()?), query, values))
   }

   /// Raw statement on the transaction's connection
   pub fn raw(&mut self, sql: impl Into<String>) -> Result<RawQuery<'_>> {
      Ok(RawQuery::new(Target::Connection(self.conn()?), sql.into()))
   }

   /// Open a savepoint. The outer transaction cannot be used until the
   /// nested one is finalized or dropped.
   pub async fn transaction(&mut self) -> Result<Transaction<'_>> {
      self.ensure_handle_open()?;

      let connection_name = self.connection_name.clone();
      let lease = self.lease.clone();
      let depth = self.depth + 1;

      let tx = self.inner.as_mut().ok_or(Error::TransactionClosed)?;
      let nested = sqlx::Acquire::begin(tx)
         .await
         .map_err(Error::TransactionStart)?;

      debug!(connection = %connection_name, depth, "Savepoint started");

      Ok(Transaction {
         inner: Some(nested),
         lease,
         connection_name,
         depth,
      })
   }

   /// Commit this transaction (or release the savepoint)
   pub async fn commit(&mut self) -> Result<()> {
      self.ensure_handle_open()?;
      let tx = self.inner.take().ok_or(Error::TransactionClosed)?;
      tx.commit().await.map_err(Error::Commit)?;
      debug!(connection = %self.connection_name, depth = self.depth, "Transaction committed");
      Ok(())
   }

   /// Roll back this transaction (or roll back to the savepoint)
   pub async fn rollback(&mut self) -> Result<()> {
      self.ensure_handle_open()?;
      let tx = self.inner.take().ok_or(Error::TransactionClosed)?;
      tx.rollback().await.map_err(Error::Rollback)?;
      debug!(connection = %self.connection_name, depth = self.depth, "Transaction rolled back");
      Ok(())
   }
}

impl Drop for Transaction<'_> {
   fn drop(&mut self) {
      // sqlx rolls the transaction back when its connection is dropped
      if self.inner.is_some() {
         debug!(
            connection = %self.connection_name,
            depth = self.depth,
            "Dropping unfinalized transaction (will auto-rollback)"
         );
      }
   }
}
