//! Where a statement runs: a pooled lease or a borrowed transaction connection

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx_sqlite_conn_mgr::HandleLease;
use tracing::trace;

use crate::{Error, Result};

/// Result returned from write operations (e.g. INSERT, UPDATE, DELETE).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteQueryResult {
   /// The number of rows affected by the write operation.
   pub rows_affected: u64,
   /// The last inserted row ID (SQLite ROWID).
   ///
   /// Only set for INSERT operations on tables with a ROWID.
   /// Tables created with `WITHOUT ROWID` will not set this value (returns 0).
   pub last_insert_id: i64,
}

/// Execution target of a builder.
///
/// Pooled targets borrow a connection per statement; transaction targets
/// reuse the transaction's connection, which the builder borrows mutably so
/// statements on one transaction run in submission order.
pub(crate) enum Target<'a> {
   Lease(HandleLease),
   Connection(&'a mut SqliteConnection),
}

impl Target<'_> {
   pub(crate) async fn fetch_all(self, sql: &str, values: Vec<JsonValue>) -> Result<Vec<SqliteRow>> {
      trace!(sql, binds = values.len(), "fetch_all");

      let mut q = sqlx::query(sql);
      for value in values {
         q = bind_value(q, value);
      }

      match self {
         Target::Lease(lease) => {
            let mut conn = lease.acquire().await.map_err(Error::from_conn_mgr)?;
            Ok(q.fetch_all(&mut *conn).await?)
         }
         Target::Connection(conn) => Ok(q.fetch_all(conn).await?),
      }
   }

   pub(crate) async fn execute(self, sql: &str, values: Vec<JsonValue>) -> Result<WriteQueryResult> {
      trace!(sql, binds = values.len(), "execute");

      let mut q = sqlx::query(sql);
      for value in values {
         q = bind_value(q, value);
      }

      let result = match self {
         Target::Lease(lease) => {
            let mut conn = lease.acquire().await.map_err(Error::from_conn_mgr)?;
            q.execute(&mut *conn).await?
         }
         Target::Connection(conn) => q.execute(conn).await?,
      };

      Ok(WriteQueryResult {
         rows_affected: result.rows_affected(),
         last_insert_id: result.last_insert_rowid(),
      })
   }
}

/// Helper function to bind a JSON value to a SQLx query
pub fn bind_value<'a>(
   query: sqlx::query::Query<'a, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'a>>,
   value: JsonValue,
) -> sqlx::query::Query<'a, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'a>> {
   match value {
      JsonValue::Null => query.bind(None::<JsonValue>),
      JsonValue::String(s) => query.bind(s),
      JsonValue::Bool(b) => query.bind(b),
      JsonValue::Number(number) => {
         // Preserve integer precision by binding as i64 when possible
         if let Some(int_val) = number.as_i64() {
            query.bind(int_val)
         } else if let Some(uint_val) = number.as_u64() {
            // u64 beyond i64::MAX does not fit SQLite's INTEGER; bind as f64
            query.bind(uint_val as f64)
         } else {
            query.bind(number.as_f64().unwrap_or_default())
         }
      }
      // Arrays and objects are stored as JSON text
      other => query.bind(other),
   }
}
