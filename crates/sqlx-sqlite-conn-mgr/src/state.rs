//! Connection lifecycle state machine

use crate::{Error, Result};

/// Lifecycle state of a [`Connection`](crate::Connection)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
   /// Created, no handles yet
   #[default]
   Disconnected,

   /// Handles are being opened
   Connecting,

   /// Handles are open
   Connected,

   /// Handles are being closed
   Closing,

   /// Handles were closed; the connection may be connected again
   Closed,
}

impl ConnectionState {
   /// Check if transition is valid
   pub fn can_transition_to(&self, next: ConnectionState) -> bool {
      use ConnectionState::*;

      matches!(
         (self, next),
         (Disconnected, Connecting)
            | (Disconnected, Closed)
            | (Closed, Connecting)
            | (Connecting, Connected)
            | (Connecting, Disconnected)
            | (Connected, Closing)
            | (Closing, Closed)
      )
   }

   /// Transition to new state
   pub fn transition(&mut self, next: ConnectionState) -> Result<()> {
      if !self.can_transition_to(next) {
         return Err(Error::InvalidState {
            expected: format!("valid transition from {}", self),
            actual: next,
         });
      }
      *self = next;
      Ok(())
   }
}

impl std::fmt::Display for ConnectionState {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      match self {
         Self::Disconnected => write!(f, "disconnected"),
         Self::Connecting => write!(f, "connecting"),
         Self::Connected => write!(f, "connected"),
         Self::Closing => write!(f, "closing"),
         Self::Closed => write!(f, "closed"),
      }
   }
}
