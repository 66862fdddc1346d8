//! Lifecycle notifications emitted by a connection

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::broadcast;
use tokio_stream::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

/// Buffered events per subscriber before slow subscribers start lagging
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Something that happened to a connection's handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
   /// Handles were opened
   Connect { connection: String },

   /// Handles were closed
   Disconnect { connection: String },

   /// Opening or closing handles failed
   Error { connection: String, message: String },
}

impl ConnectionEvent {
   /// Name of the connection the event belongs to
   pub fn connection(&self) -> &str {
      match self {
         ConnectionEvent::Connect { connection }
         | ConnectionEvent::Disconnect { connection }
         | ConnectionEvent::Error { connection, .. } => connection,
      }
   }
}

/// Item yielded by [`ConnectionEventStream`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEventItem {
   Event(ConnectionEvent),
   /// The subscriber fell behind and missed this many events
   Lagged(u64),
}

/// Stream of connection lifecycle events.
///
/// Wraps a `BroadcastStream` so subscribers can use stream combinators
/// instead of polling the receiver.
pub struct ConnectionEventStream {
   inner: BroadcastStream<ConnectionEvent>,
}

impl ConnectionEventStream {
   pub fn new(rx: broadcast::Receiver<ConnectionEvent>) -> Self {
      Self {
         inner: BroadcastStream::new(rx),
      }
   }
}

impl Stream for ConnectionEventStream {
   type Item = ConnectionEventItem;

   fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
      // BroadcastStream is Unpin, so we can safely create a pinned reference
      let inner = Pin::new(&mut self.inner);

      match inner.poll_next(cx) {
         Poll::Ready(Some(Ok(event))) => Poll::Ready(Some(ConnectionEventItem::Event(event))),
         Poll::Ready(Some(Err(
            tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(count),
         ))) => {
            warn!(missed = count, "Connection event stream lagged");
            Poll::Ready(Some(ConnectionEventItem::Lagged(count)))
         }
         Poll::Ready(None) => Poll::Ready(None),
         Poll::Pending => Poll::Pending,
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_event_connection_name() {
      let event = ConnectionEvent::Error {
         connection: "primary".into(),
         message: "boom".into(),
      };
      assert_eq!(event.connection(), "primary");
   }
}
