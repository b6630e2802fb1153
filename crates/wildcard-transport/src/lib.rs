//! Transport layer for Wildcard clients.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over
//! the duplex link to the game authority, a WebSocket implementation of
//! both, and the [`ConnectionManager`] that owns the single live connection
//! and drives connect / reconnect / close.
//!
//! ```text
//! ConnectionManager ──connect()──→ Connector ──→ Connection (send/recv)
//!        │                                           │
//!        └──── inbound frames (mpsc) ←───────────────┘
//! ```
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket client via `tokio-tungstenite`

mod error;
mod manager;
mod policy;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use manager::{ConnectionManager, ConnectionState};
pub use policy::ReconnectPolicy;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection.
///
/// Every successful [`Connector::connect`] produces a fresh id, so log lines
/// from before and after a reconnect can be told apart.
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

/// Opens new connections to a single configured endpoint.
///
/// The connection manager calls [`connect`](Self::connect) once at start-up
/// and again after every drop, so implementations must be reusable.
///
/// The returned futures are `Send` because the manager drives them from a
/// spawned Tokio task. Implementors can still write `async fn`.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Opens a new connection to the endpoint.
    fn connect(
        &self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;

    /// Human-readable endpoint, used in logs.
    fn endpoint(&self) -> &str;
}

/// A single duplex connection that carries text frames.
pub trait Connection: Send + Sync + 'static {
    /// Sends one frame to the remote authority.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next frame from the remote authority.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
