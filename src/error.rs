//! Error types for the database facade

/// Result type alias for facade operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by [`ConnectionManager`](crate::ConnectionManager) and
/// [`Database`](crate::Database).
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from a query client, builder or transaction.
   #[error(transparent)]
   Toolkit(#[from] sqlx_sqlite_toolkit::Error),

   /// Error from a connection's lifecycle.
   #[error(transparent)]
   ConnectionManager(#[from] sqlx_sqlite_conn_mgr::Error),

   /// No connection is registered under this name.
   #[error("connection '{0}' is not registered")]
   UnknownConnection(String),

   /// A live connection is already registered under this name.
   #[error("connection '{0}' is already registered")]
   DuplicateConnection(String),
}

impl Error {
   /// Machine-readable code, delegating to the toolkit for query errors
   pub fn error_code(&self) -> String {
      match self {
         Error::Toolkit(e) => e.error_code(),
         Error::ConnectionManager(sqlx_sqlite_conn_mgr::Error::NotConnected(_)) => {
            "NOT_CONNECTED".to_string()
         }
         Error::ConnectionManager(sqlx_sqlite_conn_mgr::Error::CloseFailed { .. }) => {
            "CLOSE_FAILED".to_string()
         }
         Error::ConnectionManager(_) => "CONNECTION_ERROR".to_string(),
         Error::UnknownConnection(_) => "UNKNOWN_CONNECTION".to_string(),
         Error::DuplicateConnection(_) => "DUPLICATE_CONNECTION".to_string(),
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_error_codes() {
      assert_eq!(
         Error::UnknownConnection("x".into()).error_code(),
         "UNKNOWN_CONNECTION"
      );
      assert_eq!(
         Error::DuplicateConnection("x".into()).error_code(),
         "DUPLICATE_CONNECTION"
      );
      assert_eq!(
         Error::from(sqlx_sqlite_toolkit::Error::WriteUnavailable).error_code(),
         "WRITE_UNAVAILABLE"
      );
      assert_eq!(
         Error::from(sqlx_sqlite_conn_mgr::Error::NotConnected("x".into())).error_code(),
         "NOT_CONNECTED"
      );
   }

   #[test]
   fn test_toolkit_message_is_transparent() {
      let err = Error::from(sqlx_sqlite_toolkit::Error::WriteUnavailable);
      assert_eq!(err.to_string(), sqlx_sqlite_toolkit::WRITE_UNAVAILABLE);
   }
}
