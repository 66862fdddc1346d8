#![allow(dead_code)]

use std::time::Duration;

use serde_json::json;
use sqlx_sqlite_toolkit::{
   ClientHandles, ClientMode, Connection, ConnectionConfig, ConnectionExt, EndpointConfig, QueryClient,
   ReplicaConfig,
};
use tempfile::TempDir;

pub struct TestDb {
   pub connection: Connection,
   _temp_dir: TempDir,
}

impl TestDb {
   pub fn client(&self, mode: ClientMode) -> QueryClient {
      self.connection.get_client(mode).unwrap()
   }

   pub fn connection_handles(&self, mode: ClientMode) -> ClientHandles {
      ClientHandles::for_mode(&self.connection, mode).unwrap()
   }

   pub async fn users_count(&self) -> i64 {
      let row = self
         .client(ClientMode::Write)
         .fetch_one("SELECT COUNT(*) AS count FROM users".into(), vec![])
         .await
         .unwrap()
         .unwrap();
      row["count"].as_i64().unwrap()
   }
}

async fn setup(temp_dir: TempDir, config: ConnectionConfig) -> TestDb {
   let connection = Connection::new("primary", config);
   connection.connect().await.unwrap();

   let writer = connection.get_client(ClientMode::Write).unwrap();
   writer
      .execute(
         "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, username TEXT NOT NULL, email TEXT)"
            .into(),
         vec![],
      )
      .unwrap()
      .await
      .unwrap();

   writer
      .execute(
         "CREATE TABLE posts (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) DEFERRABLE INITIALLY DEFERRED,
            title TEXT NOT NULL
         )"
         .into(),
         vec![],
      )
      .unwrap()
      .await
      .unwrap();

   TestDb {
      connection,
      _temp_dir: temp_dir,
   }
}

/// Connected database without a read endpoint
pub async fn setup_test_db() -> TestDb {
   let temp_dir = TempDir::new().expect("Failed to create temp directory");
   let config = ConnectionConfig::sqlite(temp_dir.path().join("test.db"));
   setup(temp_dir, config).await
}

/// Connected database whose read endpoint is the same file opened read-only
pub async fn setup_replica_db() -> TestDb {
   let temp_dir = TempDir::new().expect("Failed to create temp directory");
   let path = temp_dir.path().join("test.db");
   let config = ConnectionConfig {
      replicas: Some(ReplicaConfig {
         read: EndpointConfig::new(&path),
         pool: None,
      }),
      ..ConnectionConfig::sqlite(&path)
   };
   setup(temp_dir, config).await
}

/// Connected database whose pools give up closing after 100ms
pub async fn setup_short_close_db(with_replica: bool) -> TestDb {
   let temp_dir = TempDir::new().expect("Failed to create temp directory");
   let path = temp_dir.path().join("test.db");
   let replicas = with_replica.then(|| ReplicaConfig {
      read: EndpointConfig::new(&path),
      pool: None,
   });
   let config = ConnectionConfig {
      replicas,
      close_timeout: Duration::from_millis(100),
      ..ConnectionConfig::sqlite(&path)
   };
   setup(temp_dir, config).await
}

pub fn virk() -> serde_json::Value {
   json!({ "username": "virk" })
}
