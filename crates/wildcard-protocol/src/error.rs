//! Error types for the protocol layer.
//!
//! Each crate in Wildcard defines its own error enum. A `ProtocolError`
//! always means "these bytes did not describe a message we understand",
//! never a networking or game-rule problem.

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The outer envelope could not be parsed.
    ///
    /// Common causes: malformed JSON, a missing `sv` tag, or a truncated
    /// frame.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The envelope parsed, but its `data` does not fit the tag.
    #[error("bad payload for `{tag}`: {source}")]
    Payload {
        /// The envelope tag whose payload was rejected.
        tag: String,
        /// The underlying serde failure.
        #[source]
        source: serde_json::Error,
    },

    /// The message is well-formed JSON but violates protocol rules, e.g.
    /// a card value of `12` or a direction of `0`.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
