//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while decoding or encoding a text frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds the maximum allowed size.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Empty frame received.
    #[error("empty message")]
    EmptyMessage,

    /// Frame is not a JSON envelope.
    #[error("malformed envelope: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Known message type whose payload has the wrong shape.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Date field is not `YYYY-MM-DD`.
    #[error("invalid date {value:?} in {field}")]
    InvalidDate { field: &'static str, value: String },
}
