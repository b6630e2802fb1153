//! Unified error types for the Wildcard client.

use wildcard_protocol::ProtocolError;
use wildcard_table::TableError;
use wildcard_transport::TransportError;

/// Why the client refused a user command.
///
/// Reported through [`ClientEvent::Rejected`](crate::ClientEvent::Rejected)
/// or returned from [`GameClient`](crate::GameClient) methods. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The command needs a game, and we haven't joined one.
    #[error("not in a game")]
    NotInGame,

    /// The move was refused locally.
    #[error(transparent)]
    Table(#[from] TableError),

    /// The action couldn't leave because the connection is down.
    #[error("not connected to the authority")]
    NotConnected,

    /// The client task has stopped; the handle is dead.
    #[error("client has shut down")]
    Stopped,
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates `From` impls, so `?`
/// converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum WildcardError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A move refused by local validation.
    #[error(transparent)]
    Table(#[from] TableError),

    /// A client-level error.
    #[error(transparent)]
    Client(#[from] ClientError),
}
