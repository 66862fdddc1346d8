//! Client modes and read/write handle routing
//!
//! | mode  | write handle | read handle | reads use | writes use |
//! |-------|--------------|-------------|-----------|------------|
//! | dual  | present      | present     | read      | write      |
//! | read  | absent       | present     | read      | forbidden  |
//! | write | present      | absent      | write     | write      |

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx_sqlite_conn_mgr::{Connection, HandleLease};

use crate::{Error, Result};

/// Access mode of a [`QueryClient`](crate::QueryClient)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientMode {
   /// Reads go to the read handle, writes to the write handle
   #[default]
   Dual,
   /// Read handle only; write builders and transactions are rejected
   Read,
   /// Write handle only; reads also go through it
   Write,
}

impl std::fmt::Display for ClientMode {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      match self {
         ClientMode::Dual => write!(f, "dual"),
         ClientMode::Read => write!(f, "read"),
         ClientMode::Write => write!(f, "write"),
      }
   }
}

impl FromStr for ClientMode {
   type Err = Error;

   fn from_str(s: &str) -> Result<Self> {
      match s {
         "dual" => Ok(ClientMode::Dual),
         "read" => Ok(ClientMode::Read),
         "write" => Ok(ClientMode::Write),
         other => Err(Error::InvalidMode(other.to_string())),
      }
   }
}

/// What an operation is going to do with the handle it asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
   Read,
   Write,
}

/// The handles a client holds. Each variant carries exactly the leases its
/// mode allows, so a read client has no write lease to misuse.
#[derive(Debug, Clone)]
pub enum ClientHandles {
   Dual {
      write: HandleLease,
      read: HandleLease,
   },
   Read {
      read: HandleLease,
   },
   Write {
      write: HandleLease,
   },
}

impl ClientHandles {
   pub fn dual(connection: &Connection) -> Result<Self> {
      Ok(ClientHandles::Dual {
         write: connection.write_lease()?,
         read: connection.read_lease()?,
      })
   }

   pub fn read_only(connection: &Connection) -> Result<Self> {
      Ok(ClientHandles::Read {
         read: connection.read_lease()?,
      })
   }

   pub fn write_only(connection: &Connection) -> Result<Self> {
      Ok(ClientHandles::Write {
         write: connection.write_lease()?,
      })
   }

   pub fn for_mode(connection: &Connection, mode: ClientMode) -> Result<Self> {
      match mode {
         ClientMode::Dual => Self::dual(connection),
         ClientMode::Read => Self::read_only(connection),
         ClientMode::Write => Self::write_only(connection),
      }
   }

   pub fn mode(&self) -> ClientMode {
      match self {
         ClientHandles::Dual { .. } => ClientMode::Dual,
         ClientHandles::Read { .. } => ClientMode::Read,
         ClientHandles::Write { .. } => ClientMode::Write,
      }
   }

   /// The write lease, absent in read mode
   pub fn write(&self) -> Option<&HandleLease> {
      match self {
         ClientHandles::Dual { write, .. } | ClientHandles::Write { write } => Some(write),
         ClientHandles::Read { .. } => None,
      }
   }

   /// The read lease, absent in write mode
   pub fn read(&self) -> Option<&HandleLease> {
      match self {
         ClientHandles::Dual { read, .. } | ClientHandles::Read { read } => Some(read),
         ClientHandles::Write { .. } => None,
      }
   }

   /// Lease used for reads: the read lease if present, else the write lease
   pub fn reader(&self) -> &HandleLease {
      match self {
         ClientHandles::Dual { read, .. } | ClientHandles::Read { read } => read,
         ClientHandles::Write { write } => write,
      }
   }
}

/// Pick the lease an operation with `intent` runs on.
///
/// Fails only for write intent on a read client.
pub fn select_handle(handles: &ClientHandles, intent: Intent) -> Result<&HandleLease> {
   match intent {
      Intent::Read => Ok(handles.reader()),
      Intent::Write => handles.write().ok_or(Error::WriteUnavailable),
   }
}
