//! Transport layer for Warren.
//!
//! Provides the [`Connection`] trait that the session layer talks to, the
//! [`ConnectionCounter`] capacity gate, and the admission-checked
//! WebSocket transport that turns inbound HTTP upgrade requests into live
//! connections.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport and admission via
//!   `tokio-tungstenite`

#![allow(async_fn_in_trait)]

#[cfg(feature = "websocket")]
mod admission;
mod counter;
mod error;
#[cfg(feature = "websocket")]
mod websocket;

#[cfg(feature = "websocket")]
pub use admission::{Admission, ConnectCallback, OriginPolicy};
pub use counter::{ConnectionCounter, ConnectionSlot};
pub use error::{AdmissionError, TransportError};
#[cfg(feature = "websocket")]
pub use tokio_tungstenite::tungstenite::handshake::server::Request as UpgradeRequest;
#[cfg(feature = "websocket")]
pub use websocket::{Incoming, WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A single live connection that can send and receive framed messages.
///
/// Methods take `&self` so one connection can be shared (behind an `Arc`)
/// between its own worker and other tasks that push messages to it.
pub trait Connection: Send + Sync + 'static {
    /// Sends one message to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Sends a close frame and shuts the connection down.
    async fn close(&self) -> Result<(), TransportError>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "alice");
        map.insert(ConnectionId::new(2), "bob");
        assert_eq!(map[&ConnectionId::new(1)], "alice");
    }
}
