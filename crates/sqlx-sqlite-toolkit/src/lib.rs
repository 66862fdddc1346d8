//! Mode-gated query clients over `sqlx-sqlite-conn-mgr` connections.
//!
//! This crate sits between the connection manager (`sqlx-sqlite-conn-mgr`),
//! which owns the pools, and application code. It provides:
//!
//! - [`QueryClient`]: client in `dual`, `read` or `write` mode ([`ClientMode`])
//! - [`select_handle`]: the routing rule deciding which lease a statement uses
//! - Builder-pattern APIs for queries ([`SelectQuery`], [`InsertQuery`],
//!   [`ExecuteBuilder`], [`FetchAllBuilder`], [`FetchOneBuilder`], [`RawQuery`])
//! - [`Transaction`]: finalize-once transactions with nested savepoints
//! - JSON type decoding for SQLite values
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use sqlx_sqlite_conn_mgr::{Connection, ConnectionConfig};
//! use sqlx_sqlite_toolkit::{ClientMode, ConnectionExt};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let connection = Connection::new("primary", ConnectionConfig::sqlite("app.db"));
//! connection.connect().await?;
//!
//! let client = connection.get_client(ClientMode::Dual)?;
//!
//! // Write
//! client.insert_query()?.table("users").insert(json!({ "username": "virk" })).await?;
//!
//! // Read
//! let rows = client.query().from("users").await?;
//!
//! // Transaction
//! let mut trx = client.transaction().await?;
//! trx.insert_query()?.table("users").insert(json!({ "username": "romain" })).await?;
//! trx.commit().await?;
//!
//! connection.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod builders;
pub mod client;
pub mod decode;
pub mod error;
pub mod executor;
pub mod mode;
pub mod transaction;

pub use builders::{
   ExecuteBuilder, FetchAllBuilder, FetchOneBuilder, InsertQuery, RawQuery, SelectQuery,
   SortDirection,
};
pub use client::{ConnectionExt, QueryClient};
pub use error::{Error, Result, WRITE_UNAVAILABLE};
pub use executor::{WriteQueryResult, bind_value};
pub use mode::{ClientHandles, ClientMode, Intent, select_handle};
pub use transaction::Transaction;

// Re-export commonly used types from dependencies
pub use sqlx_sqlite_conn_mgr::{
   Connection, ConnectionConfig, ConnectionState, EndpointConfig, HandleLease, PoolConfig,
   ReplicaConfig,
};
