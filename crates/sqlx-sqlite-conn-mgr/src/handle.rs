//! Native connection handles and the leases handed out to query clients

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, Pool, Sqlite};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::{ConnectionConfig, EndpointConfig, PoolConfig};
use crate::{Error, Result};

/// Stable identity of one opened handle. A new id is minted every time a
/// handle is opened, so two leases with equal ids point at the same pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(Uuid);

impl std::fmt::Display for HandleId {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      self.0.fmt(f)
   }
}

/// Which endpoint a handle was opened against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleRole {
   Write,
   Read,
}

impl std::fmt::Display for HandleRole {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      match self {
         HandleRole::Write => write!(f, "write"),
         HandleRole::Read => write!(f, "read"),
      }
   }
}

/// A pool for one endpoint. Only [`Connection`](crate::Connection) can open
/// or close one; everything else sees it through a [`HandleLease`].
#[derive(Debug)]
pub(crate) struct NativeHandle {
   id: HandleId,
   role: HandleRole,
   pool: Pool<Sqlite>,
   closed: AtomicBool,
}

impl NativeHandle {
   pub(crate) async fn open(
      role: HandleRole,
      endpoint: &EndpointConfig,
      pool_config: &PoolConfig,
      config: &ConnectionConfig,
   ) -> Result<Arc<Self>> {
      let options = SqliteConnectOptions::new()
         .filename(&endpoint.filename)
         .busy_timeout(config.busy_timeout);

      // Read endpoints never create files and never accept writes
      let options = match role {
         HandleRole::Write => options.create_if_missing(endpoint.create_if_missing),
         HandleRole::Read => options.read_only(true),
      };

      let options = options.log_statements(if config.debug {
         log::LevelFilter::Debug
      } else {
         log::LevelFilter::Trace
      });

      let pool = SqlitePoolOptions::new()
         .min_connections(pool_config.min_connections)
         .max_connections(pool_config.max_connections)
         .idle_timeout(pool_config.idle_timeout)
         .acquire_timeout(pool_config.acquire_timeout)
         .connect_with(options)
         .await?;

      let handle = Self {
         id: HandleId(Uuid::new_v4()),
         role,
         pool,
         closed: AtomicBool::new(false),
      };

      debug!(
         handle = %handle.id,
         role = %role,
         path = %endpoint.filename.display(),
         "Opened connection handle"
      );

      Ok(Arc::new(handle))
   }

   pub(crate) fn id(&self) -> HandleId {
      self.id
   }

   /// Close the pool, bounded by `timeout`. Closing twice is a no-op.
   ///
   /// Leases see the handle as closed before the pool finishes closing, so
   /// connections still checked out (including open transactions) refuse
   /// further work through their lease.
   pub(crate) async fn close(&self, timeout: Duration) -> Result<()> {
      if self.closed.swap(true, Ordering::SeqCst) {
         trace!(handle = %self.id, "Handle already closed");
         return Ok(());
      }

      debug!(handle = %self.id, role = %self.role, "Closing connection handle");

      tokio::time::timeout(timeout, self.pool.close())
         .await
         .map_err(|_| Error::CloseTimedOut {
            role: self.role.to_string(),
            handle: self.id.to_string(),
         })
   }
}

/// Non-owning access to one native handle.
///
/// Leases are cheap to clone and are what query clients and transactions
/// hold. A lease can borrow pooled connections but can never close the
/// pool; once the owning connection closes the handle, every lease
/// operation fails with [`Error::ConnectionClosed`].
#[derive(Debug, Clone)]
pub struct HandleLease {
   handle: Arc<NativeHandle>,
}

impl HandleLease {
   pub(crate) fn new(handle: &Arc<NativeHandle>) -> Self {
      Self {
         handle: Arc::clone(handle),
      }
   }

   pub fn id(&self) -> HandleId {
      self.handle.id
   }

   pub fn role(&self) -> HandleRole {
      self.handle.role
   }

   pub fn is_closed(&self) -> bool {
      self.handle.closed.load(Ordering::SeqCst)
   }

   /// Borrow one pooled connection for the duration of an operation
   pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
      self.ensure_open()?;
      Ok(self.handle.pool.acquire().await?)
   }

   /// Begin a transaction on a pooled connection. The connection stays
   /// leased until the transaction is committed, rolled back, or dropped.
   pub async fn begin(&self) -> Result<sqlx::Transaction<'static, Sqlite>> {
      self.ensure_open()?;
      Ok(self.handle.pool.begin().await?)
   }

   fn ensure_open(&self) -> Result<()> {
      if self.is_closed() {
         return Err(Error::ConnectionClosed);
      }
      Ok(())
   }
}
