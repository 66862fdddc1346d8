//! # sqlx-sqlite-conn-mgr
//!
//! Owns the physical pools behind one named SQLite connection.
//!
//! ## Core Types
//!
//! - **[`Connection`]**: named connection with a write pool and an optional read pool
//! - **[`ConnectionConfig`]**: endpoints, pool bounds and timeouts
//! - **[`HandleLease`]**: non-owning access to one pool; cannot close it
//! - **[`ConnectionEvent`]**: lifecycle notifications (`connect`, `disconnect`, `error`)
//! - **[`Error`]**: Error type for connection operations
//!
//! ## Architecture
//!
//! - **Write pool**: always opened against the write endpoint
//! - **Read pool**: opened read-only against `replicas.read` when configured,
//!   otherwise reads share the write pool
//! - **Exclusive ownership**: only [`Connection::disconnect`] closes pools; leases
//!   held elsewhere start failing with [`Error::ConnectionClosed`] afterwards
//!
//! # Example
//!
//! ```no_run
//! use sqlx_sqlite_conn_mgr::{Connection, ConnectionConfig};
//!
//! # async fn example() -> sqlx_sqlite_conn_mgr::Result<()> {
//! let connection = Connection::new("primary", ConnectionConfig::sqlite("app.db"));
//! connection.connect().await?;
//!
//! let mut conn = connection.read_lease()?.acquire().await?;
//! sqlx::query("SELECT 1").execute(&mut *conn).await?;
//! drop(conn);
//!
//! connection.disconnect().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod error;
mod events;
mod handle;
mod state;

// Re-export public types
pub use config::{ClientType, ConnectionConfig, EndpointConfig, PoolConfig, ReplicaConfig};
pub use connection::Connection;
pub use error::{Error, Result};
pub use events::{ConnectionEvent, ConnectionEventItem, ConnectionEventStream};
pub use handle::{HandleId, HandleLease, HandleRole};
pub use state::ConnectionState;
