//! Transaction lifecycle: commit/rollback laws, finalize-once, savepoints.

mod common;

use std::time::Duration;

use common::{setup_short_close_db, setup_test_db, virk};
use serde_json::json;
use sqlx_sqlite_toolkit::{
   ClientMode, Connection, ConnectionConfig, ConnectionExt, ConnectionState, Error, PoolConfig,
};
use tempfile::TempDir;

// ============================================================================
// Commit / rollback laws
// ============================================================================

#[tokio::test]
async fn test_commit_keeps_rows_and_rejects_later_rollback() {
   let db = setup_test_db().await;
   let client = db.client(ClientMode::Dual);

   let mut trx = client.transaction().await.unwrap();
   assert!(!trx.is_completed());
   assert_eq!(trx.depth(), 0);
   assert_eq!(Some(trx.handle_id()), client.write_handle().map(|h| h.id()));

   trx.insert_query()
      .unwrap()
      .table("users")
      .insert(virk())
      .await
      .unwrap();
   trx.commit().await.unwrap();
   assert!(trx.is_completed());

   let rows = client.query().from("users").await.unwrap();
   assert_eq!(rows.len(), 1);
   assert_eq!(rows[0]["username"], json!("virk"));

   let err = trx.rollback().await.unwrap_err();
   assert!(matches!(err, Error::TransactionClosed));
   assert!(matches!(trx.commit().await, Err(Error::TransactionClosed)));

   db.connection.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_rollback_restores_row_count() {
   let db = setup_test_db().await;

   for mode in [ClientMode::Dual, ClientMode::Write] {
      let client = db.client(mode);
      let before = db.users_count().await;

      let mut trx = client.transaction().await.unwrap();
      trx.insert_query()
         .unwrap()
         .table("users")
         .insert(virk())
         .await
         .unwrap();
      trx.rollback().await.unwrap();

      assert_eq!(db.users_count().await, before, "mode {mode}");
   }

   db.connection.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_commit_increases_row_count_by_inserted_rows() {
   let db = setup_test_db().await;

   for mode in [ClientMode::Dual, ClientMode::Write] {
      let client = db.client(mode);
      let before = db.users_count().await;

      let mut trx = client.transaction().await.unwrap();
      trx.insert_query()
         .unwrap()
         .table("users")
         .multi_insert(vec![
            json!({ "username": "a" }),
            json!({ "username": "b" }),
            json!({ "username": "c" }),
         ])
         .await
         .unwrap();
      trx.commit().await.unwrap();

      let rows = client.query().from("users").await.unwrap();
      assert_eq!(rows.len() as i64, before + 3, "mode {mode}");
   }

   db.connection.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_rollback_without_writes_still_finalizes() {
   let db = setup_test_db().await;
   let client = db.client(ClientMode::Write);

   let mut trx = client.transaction().await.unwrap();
   trx.rollback().await.unwrap();

   assert!(trx.is_completed());
   assert!(matches!(trx.query(), Err(Error::TransactionClosed)));

   db.connection.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_operations_after_completion_fail() {
   let db = setup_test_db().await;
   let client = db.client(ClientMode::Dual);

   let mut trx = client.transaction().await.unwrap();
   trx.commit().await.unwrap();

   assert!(matches!(trx.insert_query(), Err(Error::TransactionClosed)));
   assert!(matches!(trx.from("users"), Err(Error::TransactionClosed)));
   assert!(matches!(trx.raw("SELECT 1"), Err(Error::TransactionClosed)));
   assert!(matches!(
      trx.execute("DELETE FROM users".into(), vec![]),
      Err(Error::TransactionClosed)
   ));
   assert!(matches!(
      trx.fetch_all("SELECT 1".into(), vec![]),
      Err(Error::TransactionClosed)
   ));
   assert!(matches!(
      trx.fetch_one("SELECT 1".into(), vec![]),
      Err(Error::TransactionClosed)
   ));
   assert!(matches!(
      trx.transaction().await,
      Err(Error::TransactionClosed)
   ));

   db.connection.disconnect().await.unwrap();
}

// ============================================================================
// Statements inside a transaction
// ============================================================================

#[tokio::test]
async fn test_statements_see_uncommitted_writes_in_order() {
   let db = setup_test_db().await;
   let client = db.client(ClientMode::Dual);

   let mut trx = client.transaction().await.unwrap();
   trx.insert_query()
      .unwrap()
      .table("users")
      .insert(virk())
      .await
      .unwrap();
   trx.execute(
      "UPDATE users SET email = $1 WHERE username = $2".into(),
      vec![json!("virk@example.com"), json!("virk")],
   )
   .unwrap()
   .await
   .unwrap();

   let row = trx
      .from("users")
      .unwrap()
      .first()
      .await
      .unwrap()
      .unwrap();
   assert_eq!(row["email"], json!("virk@example.com"));

   let raw = trx.raw("SELECT COUNT(*) AS count FROM users").unwrap().await.unwrap();
   assert_eq!(raw[0]["count"], json!(1));

   // Not visible outside before commit
   assert_eq!(db.users_count().await, 0);

   trx.commit().await.unwrap();
   assert_eq!(db.users_count().await, 1);

   db.connection.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_dropping_unfinalized_transaction_rolls_back() {
   let db = setup_test_db().await;
   let client = db.client(ClientMode::Dual);

   {
      let mut trx = client.transaction().await.unwrap();
      trx.insert_query()
         .unwrap()
         .table("users")
         .insert(virk())
         .await
         .unwrap();
   }

   assert_eq!(db.users_count().await, 0);

   db.connection.disconnect().await.unwrap();
}

// ============================================================================
// Savepoints
// ============================================================================

#[tokio::test]
async fn test_savepoint_rollback_keeps_outer_writes() {
   let db = setup_test_db().await;
   let client = db.client(ClientMode::Dual);

   let mut trx = client.transaction().await.unwrap();
   trx.insert_query()
      .unwrap()
      .table("users")
      .insert(json!({ "username": "outer" }))
      .await
      .unwrap();

   {
      let mut savepoint = trx.transaction().await.unwrap();
      assert_eq!(savepoint.depth(), 1);
      savepoint
         .insert_query()
         .unwrap()
         .table("users")
         .insert(json!({ "username": "inner" }))
         .await
         .unwrap();
      savepoint.rollback().await.unwrap();
      assert!(savepoint.is_completed());
   }

   assert!(!trx.is_completed());
   trx.commit().await.unwrap();

   let rows = client.query().from("users").await.unwrap();
   assert_eq!(rows.len(), 1);
   assert_eq!(rows[0]["username"], json!("outer"));

   db.connection.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_outer_rollback_discards_released_savepoint() {
   let db = setup_test_db().await;
   let client = db.client(ClientMode::Dual);

   let mut trx = client.transaction().await.unwrap();
   {
      let mut savepoint = trx.transaction().await.unwrap();
      savepoint
         .insert_query()
         .unwrap()
         .table("users")
         .insert(virk())
         .await
         .unwrap();
      savepoint.commit().await.unwrap();
   }
   trx.rollback().await.unwrap();

   assert_eq!(db.users_count().await, 0);

   db.connection.disconnect().await.unwrap();
}

// ============================================================================
// Driver failures
// ============================================================================

#[tokio::test]
async fn test_commit_failure_is_reported_and_finalizes() {
   let db = setup_test_db().await;
   let client = db.client(ClientMode::Dual);

   // The foreign key is deferred, so the violation surfaces at COMMIT
   let mut trx = client.transaction().await.unwrap();
   trx.insert_query()
      .unwrap()
      .table("posts")
      .insert(json!({ "user_id": 999, "title": "orphan" }))
      .await
      .unwrap();

   let err = trx.commit().await.unwrap_err();
   assert!(matches!(err, Error::Commit(_)));
   assert_eq!(err.error_code(), "COMMIT_FAILED");
   assert!(trx.is_completed());
   assert!(matches!(trx.rollback().await, Err(Error::TransactionClosed)));
   drop(trx);

   let row = client
      .fetch_one("SELECT COUNT(*) AS count FROM posts".into(), vec![])
      .await
      .unwrap()
      .unwrap();
   assert_eq!(row["count"], json!(0));

   db.connection.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_begin_failure_is_transaction_start_error() {
   let temp = TempDir::new().unwrap();
   let config = ConnectionConfig {
      pool: PoolConfig {
         max_connections: 1,
         acquire_timeout: Duration::from_millis(100),
         ..Default::default()
      },
      ..ConnectionConfig::sqlite(temp.path().join("test.db"))
   };
   let connection = Connection::new("primary", config);
   connection.connect().await.unwrap();
   let client = connection.get_client(ClientMode::Write).unwrap();

   // The only pooled connection is held by the first transaction
   let mut first = client.transaction().await.unwrap();

   let err = client.transaction().await.err().unwrap();
   assert!(matches!(err, Error::TransactionStart(sqlx::Error::PoolTimedOut)));
   assert_eq!(err.error_code(), "TRANSACTION_START_FAILED");

   first.rollback().await.unwrap();
   connection.disconnect().await.unwrap();
}

// ============================================================================
// Connection closed under an open transaction
// ============================================================================

fn is_connection_closed(err: &Error) -> bool {
   matches!(
      err,
      Error::ConnectionManager(sqlx_sqlite_conn_mgr::Error::ConnectionClosed)
   )
}

#[tokio::test]
async fn test_transaction_fails_after_disconnect() {
   for with_replica in [false, true] {
      let db = setup_short_close_db(with_replica).await;
      let client = db.client(ClientMode::Dual);

      let mut trx = client.transaction().await.unwrap();
      trx.insert_query()
         .unwrap()
         .table("users")
         .insert(virk())
         .await
         .unwrap();

      // Whether or not the pool waited for the checked-out connection,
      // the connection ends closed
      let result = db.connection.disconnect().await;
      assert!(
         matches!(result, Ok(()) | Err(sqlx_sqlite_conn_mgr::Error::CloseFailed { .. })),
         "replica {with_replica}"
      );
      assert_eq!(db.connection.state(), ConnectionState::Closed);

      let err = trx.insert_query().err().unwrap();
      assert!(is_connection_closed(&err), "replica {with_replica}: {err}");
      assert_eq!(err.error_code(), "CONNECTION_CLOSED");
      assert!(trx.is_completed());

      assert!(matches!(trx.commit().await, Err(Error::TransactionClosed)));
      drop(trx);

      // The insert made before the close was never committed
      db.connection.connect().await.unwrap();
      assert_eq!(db.users_count().await, 0, "replica {with_replica}");
      db.connection.disconnect().await.unwrap();
   }
}

#[tokio::test]
async fn test_commit_after_disconnect_rolls_back() {
   let db = setup_short_close_db(false).await;
   let client = db.client(ClientMode::Write);

   let mut trx = client.transaction().await.unwrap();
   trx.insert_query()
      .unwrap()
      .table("users")
      .insert(virk())
      .await
      .unwrap();

   let _ = db.connection.disconnect().await;

   let err = trx.commit().await.unwrap_err();
   assert!(is_connection_closed(&err));
   assert!(trx.is_completed());
   assert!(matches!(trx.rollback().await, Err(Error::TransactionClosed)));
   drop(trx);

   db.connection.connect().await.unwrap();
   assert_eq!(db.users_count().await, 0);
   db.connection.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_rollback_after_disconnect_reports_closed_handle() {
   let db = setup_short_close_db(false).await;
   let client = db.client(ClientMode::Dual);

   let mut trx = client.transaction().await.unwrap();
   let _ = db.connection.disconnect().await;

   let err = trx.rollback().await.unwrap_err();
   assert!(is_connection_closed(&err));
   assert!(trx.is_completed());
}

#[tokio::test]
async fn test_savepoint_after_disconnect_fails() {
   let db = setup_short_close_db(false).await;
   let client = db.client(ClientMode::Dual);

   let mut trx = client.transaction().await.unwrap();
   {
      let mut savepoint = trx.transaction().await.unwrap();
      let _ = db.connection.disconnect().await;

      let err = savepoint.raw("SELECT 1").err().unwrap();
      assert!(is_connection_closed(&err));
      assert!(savepoint.is_completed());
   }

   let err = trx.transaction().await.err().unwrap();
   assert!(is_connection_closed(&err));
   assert!(trx.is_completed());
}
