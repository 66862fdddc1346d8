//! A named connection owning a write pool and an optional read pool

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, trace, warn};

use crate::config::ConnectionConfig;
use crate::events::{ConnectionEvent, ConnectionEventStream, EVENT_CHANNEL_CAPACITY};
use crate::handle::{HandleId, HandleLease, HandleRole, NativeHandle};
use crate::state::ConnectionState;
use crate::{Error, Result};

/// Handles owned by a connected [`Connection`]
#[derive(Debug)]
struct HandleSet {
   write: Arc<NativeHandle>,
   /// Present only when a distinct read endpoint is configured
   read: Option<Arc<NativeHandle>>,
}

/// One logical database connection.
///
/// ## Architecture
///
/// The connection owns up to two pools:
/// - **write**: always opened, against the write endpoint
/// - **read**: opened read-only against `replicas.read` when configured;
///   otherwise the read role is served by the write pool
///
/// ## Usage Pattern
///
/// ```text
/// 1. Connection::new(name, config)   (no I/O)
/// 2. connect()                       opens the pool(s)
/// 3. write_lease() / read_lease()    hand out non-owning leases
/// 4. disconnect()                    closes every pool
/// ```
///
/// Lifecycle calls are serialized; lease lookups never wait on them.
#[derive(Debug)]
pub struct Connection {
   name: String,
   config: ConnectionConfig,
   state: RwLock<ConnectionState>,
   handles: RwLock<Option<HandleSet>>,
   lifecycle: Mutex<()>,
   events: broadcast::Sender<ConnectionEvent>,
}

impl Connection {
   /// Create a connection. No handles are opened until [`connect`](Self::connect).
   pub fn new(name: impl Into<String>, config: ConnectionConfig) -> Self {
      let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
      Self {
         name: name.into(),
         config,
         state: RwLock::new(ConnectionState::Disconnected),
         handles: RwLock::new(None),
         lifecycle: Mutex::new(()),
         events,
      }
   }

   pub fn name(&self) -> &str {
      &self.name
   }

   pub fn config(&self) -> &ConnectionConfig {
      &self.config
   }

   pub fn state(&self) -> ConnectionState {
      *self.state.read()
   }

   pub fn is_connected(&self) -> bool {
      self.handles.read().is_some()
   }

   /// True when reads are served by a distinct read pool
   pub fn has_read_replica(&self) -> bool {
      self
         .handles
         .read()
         .as_ref()
         .is_some_and(|handles| handles.read.is_some())
   }

   /// Open the write pool and, when configured, the read pool.
   ///
   /// Calling this on a connected connection is a no-op and keeps the
   /// existing handles.
   pub async fn connect(&self) -> Result<()> {
      let _lifecycle = self.lifecycle.lock().await;

      if self.is_connected() {
         trace!(connection = %self.name, "Already connected");
         return Ok(());
      }

      self.state.write().transition(ConnectionState::Connecting)?;

      match self.open_handles().await {
         Ok(handles) => {
            *self.handles.write() = Some(handles);
            self.state.write().transition(ConnectionState::Connected)?;
            debug!(connection = %self.name, "Connected");
            self.emit(ConnectionEvent::Connect {
               connection: self.name.clone(),
            });
            Ok(())
         }
         Err(e) => {
            self.state.write().transition(ConnectionState::Disconnected)?;
            warn!(connection = %self.name, error = %e, "Failed to connect");
            self.emit(ConnectionEvent::Error {
               connection: self.name.clone(),
               message: e.to_string(),
            });
            Err(e)
         }
      }
   }

   async fn open_handles(&self) -> Result<HandleSet> {
      let write = NativeHandle::open(
         HandleRole::Write,
         &self.config.connection,
         &self.config.pool,
         &self.config,
      )
      .await?;

      let read = match &self.config.replicas {
         Some(replicas) => {
            let opened = NativeHandle::open(
               HandleRole::Read,
               &replicas.read,
               self.config.read_pool(),
               &self.config,
            )
            .await;

            match opened {
               Ok(read) => Some(read),
               Err(e) => {
                  // Do not leak the write pool when the read pool cannot open
                  if let Err(close_err) = write.close(self.config.close_timeout).await {
                     warn!(connection = %self.name, error = %close_err, "Failed to close write handle");
                  }
                  return Err(e);
               }
            }
         }
         None => None,
      };

      Ok(HandleSet { write, read })
   }

   /// Close every handle.
   ///
   /// Both pools always get their close attempt, even when the other one
   /// fails. The state ends `Closed` either way. Without handles nothing is
   /// closed; a never-connected connection still moves to `Closed`.
   pub async fn disconnect(&self) -> Result<()> {
      let _lifecycle = self.lifecycle.lock().await;

      let Some(handles) = self.handles.write().take() else {
         let mut state = self.state.write();
         if *state == ConnectionState::Disconnected {
            state.transition(ConnectionState::Closed)?;
         }
         trace!(connection = %self.name, "Already disconnected");
         return Ok(());
      };

      self.state.write().transition(ConnectionState::Closing)?;

      let timeout = self.config.close_timeout;
      let (write_result, read_result) = tokio::join!(handles.write.close(timeout), async {
         match &handles.read {
            Some(read) => read.close(timeout).await,
            None => Ok(()),
         }
      });

      self.state.write().transition(ConnectionState::Closed)?;

      let errors: Vec<String> = [write_result, read_result]
         .into_iter()
         .filter_map(|result| result.err())
         .map(|e| e.to_string())
         .collect();

      self.emit(ConnectionEvent::Disconnect {
         connection: self.name.clone(),
      });

      if errors.is_empty() {
         debug!(connection = %self.name, "Disconnected");
         return Ok(());
      }

      for error in &errors {
         warn!(connection = %self.name, error = %error, "Failed to close handle");
         self.emit(ConnectionEvent::Error {
            connection: self.name.clone(),
            message: error.clone(),
         });
      }

      Err(Error::CloseFailed {
         name: self.name.clone(),
         errors,
      })
   }

   /// Lease on the write handle
   pub fn write_lease(&self) -> Result<HandleLease> {
      self
         .handles
         .read()
         .as_ref()
         .map(|handles| HandleLease::new(&handles.write))
         .ok_or_else(|| Error::NotConnected(self.name.clone()))
   }

   /// Lease on the read handle, which is the write handle when no read
   /// endpoint is configured
   pub fn read_lease(&self) -> Result<HandleLease> {
      self
         .handles
         .read()
         .as_ref()
         .map(|handles| HandleLease::new(handles.read.as_ref().unwrap_or(&handles.write)))
         .ok_or_else(|| Error::NotConnected(self.name.clone()))
   }

   /// Ids of the currently open handles as `(write, read)`
   pub fn handle_ids(&self) -> Option<(HandleId, HandleId)> {
      self.handles.read().as_ref().map(|handles| {
         let read = handles.read.as_ref().unwrap_or(&handles.write);
         (handles.write.id(), read.id())
      })
   }

   /// Subscribe to lifecycle events. Events sent before subscribing are not
   /// replayed.
   pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
      self.events.subscribe()
   }

   /// Subscribe and get a `Stream` of lifecycle events
   pub fn subscribe_stream(&self) -> ConnectionEventStream {
      ConnectionEventStream::new(self.events.subscribe())
   }

   fn emit(&self, event: ConnectionEvent) {
      // No subscribers is not an error
      let _ = self.events.send(event);
   }
}
