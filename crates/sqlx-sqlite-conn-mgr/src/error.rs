//! Error types for sqlx-sqlite-conn-mgr

use thiserror::Error;

use crate::state::ConnectionState;

/// Errors that may occur when working with sqlx-sqlite-conn-mgr
#[derive(Error, Debug)]
pub enum Error {
   /// IO error when accessing database files. Standard library IO errors
   /// are converted to this variant.
   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   /// Error from the sqlx library. Standard sqlx errors are converted to this variant
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),

   /// The connection has no handles yet; `connect()` has not completed
   #[error("connection '{0}' is not connected; call connect() first")]
   NotConnected(String),

   /// The handle behind a lease has been closed by its connection
   #[error("connection handle has been closed")]
   ConnectionClosed,

   /// A lifecycle transition that the state machine does not allow
   #[error("invalid connection state: expected {expected}, got {actual}")]
   InvalidState {
      expected: String,
      actual: ConnectionState,
   },

   /// Closing a handle did not finish within the configured close timeout
   #[error("closing {role} handle {handle} timed out")]
   CloseTimedOut { role: String, handle: String },

   /// One or more handles failed to close during disconnect. Every handle
   /// was still given its close attempt.
   #[error("failed to close connection '{name}': {}", errors.join("; "))]
   CloseFailed { name: String, errors: Vec<String> },
}

/// A type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
