/// Result type alias for toolkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Message carried by every write-on-read-client failure.
pub const WRITE_UNAVAILABLE: &str =
   "Write client is not available for query client instantiated in read mode";

/// Error types for query client operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from SQLx while running a statement. The driver's message and
   /// SQLite code are preserved.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// Error from the connection manager (not connected, closed handle, ...).
   #[error(transparent)]
   ConnectionManager(#[from] sqlx_sqlite_conn_mgr::Error),

   /// A write builder was requested from a client in read mode.
   #[error("Write client is not available for query client instantiated in read mode")]
   WriteUnavailable,

   /// Runtime misuse detected while starting an asynchronous operation.
   #[error("E_RUNTIME_EXCEPTION: {0}")]
   Runtime(String),

   /// The driver failed to begin a transaction or savepoint.
   #[error("failed to begin transaction: {0}")]
   TransactionStart(#[source] sqlx::Error),

   /// The driver failed to commit. The transaction outcome is unknown.
   #[error("failed to commit transaction: {0}")]
   Commit(#[source] sqlx::Error),

   /// The driver failed to roll back.
   #[error("failed to roll back transaction: {0}")]
   Rollback(#[source] sqlx::Error),

   /// Transaction has already been committed or rolled back.
   #[error("transaction has already been finalized (committed or rolled back)")]
   TransactionClosed,

   /// SQLite type that cannot be mapped to JSON.
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),

   /// Multiple rows returned from fetchOne query.
   #[error("fetchOne() query returned {0} rows, expected 0 or 1")]
   MultipleRowsReturned(usize),

   /// A builder was executed without a table.
   #[error("query has no table; call from() or table() first")]
   MissingTable,

   /// Insert called without any row or with rows that have no columns.
   #[error("insert requires at least one row with at least one column")]
   EmptyInsert,

   /// Insert rows must serialize to JSON objects.
   #[error("insert rows must be JSON objects: {0}")]
   InvalidInsertRow(String),

   /// Unknown client mode name.
   #[error("invalid client mode '{0}', expected one of: dual, read, write")]
   InvalidMode(String),
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::Sqlx(e) => sqlx_code(e).unwrap_or_else(|| "SQLX_ERROR".to_string()),
         Error::ConnectionManager(e) => match e {
            sqlx_sqlite_conn_mgr::Error::NotConnected(_) => "NOT_CONNECTED".to_string(),
            sqlx_sqlite_conn_mgr::Error::ConnectionClosed => "CONNECTION_CLOSED".to_string(),
            _ => "CONNECTION_ERROR".to_string(),
         },
         Error::WriteUnavailable => "WRITE_UNAVAILABLE".to_string(),
         Error::Runtime(_) => "E_RUNTIME_EXCEPTION".to_string(),
         Error::TransactionStart(_) => "TRANSACTION_START_FAILED".to_string(),
         Error::Commit(_) => "COMMIT_FAILED".to_string(),
         Error::Rollback(_) => "ROLLBACK_FAILED".to_string(),
         Error::TransactionClosed => "TRANSACTION_CLOSED".to_string(),
         Error::UnsupportedDatatype(_) => "UNSUPPORTED_DATATYPE".to_string(),
         Error::MultipleRowsReturned(_) => "MULTIPLE_ROWS_RETURNED".to_string(),
         Error::MissingTable => "MISSING_TABLE".to_string(),
         Error::EmptyInsert => "EMPTY_INSERT".to_string(),
         Error::InvalidInsertRow(_) => "INVALID_INSERT_ROW".to_string(),
         Error::InvalidMode(_) => "INVALID_MODE".to_string(),
      }
   }

   /// Split connection-manager failures so driver errors surface as
   /// [`Error::Sqlx`] rather than being nested.
   pub(crate) fn from_conn_mgr(e: sqlx_sqlite_conn_mgr::Error) -> Self {
      match e {
         sqlx_sqlite_conn_mgr::Error::Sqlx(e) => Error::Sqlx(e),
         other => Error::ConnectionManager(other),
      }
   }

   /// Like [`Error::from_conn_mgr`], tagging driver errors as a failed begin.
   pub(crate) fn from_begin(e: sqlx_sqlite_conn_mgr::Error) -> Self {
      match e {
         sqlx_sqlite_conn_mgr::Error::Sqlx(e) => Error::TransactionStart(e),
         other => Error::ConnectionManager(other),
      }
   }
}

fn sqlx_code(e: &sqlx::Error) -> Option<String> {
   e.as_database_error()
      .and_then(|db_err| db_err.code())
      .map(|code| format!("SQLITE_{}", code))
}
