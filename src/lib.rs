//! Named SQLite connections with mode-gated query clients.
//!
//! [`Database`] registers the connections of a [`DatabaseConfig`] in a
//! [`ConnectionManager`] and hands out [`QueryClient`]s, connecting lazily.
//! Clients route reads to a connection's read pool (or its write pool when
//! no read endpoint is configured) and writes to its write pool.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use sqlx_sqlite_db::{ClientMode, ConnectionConfig, Database, DatabaseConfig};
//!
//! # async fn example() -> sqlx_sqlite_db::Result<()> {
//! let db = Database::new(DatabaseConfig::single(
//!    "primary",
//!    ConnectionConfig::sqlite("app.db"),
//! ))?;
//!
//! db.insert_query().await?.table("users").insert(json!({ "username": "virk" })).await?;
//! let rows = db.from("users").await?.await?;
//!
//! let reader = db.client(ClientMode::Read).await?;
//! assert!(reader.insert_query().is_err());
//!
//! db.close().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod database;
mod error;
mod manager;

pub use config::DatabaseConfig;
pub use database::Database;
pub use error::{Error, Result};
pub use manager::ConnectionManager;

pub use sqlx_sqlite_conn_mgr::{
   Connection, ConnectionConfig, ConnectionEvent, ConnectionState, EndpointConfig, PoolConfig,
   ReplicaConfig,
};
pub use sqlx_sqlite_toolkit::{ClientMode, ConnectionExt, QueryClient, Transaction, WriteQueryResult};
