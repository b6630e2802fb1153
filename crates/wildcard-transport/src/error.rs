/// Errors that can occur in the transport layer.
///
/// None of these are fatal to a client: the
/// [`ConnectionManager`](crate::ConnectionManager) treats every one of them
/// as "this connection is gone" and hands control to its reconnect policy.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening a connection to the endpoint failed.
    #[error("connect to {endpoint} failed: {source}")]
    ConnectFailed {
        /// The endpoint we tried to reach.
        endpoint: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
