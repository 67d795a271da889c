//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or interpreting a
/// wire message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing required field,
    /// or a field of the wrong type.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded but breaks a protocol rule, e.g. a handshake
    /// opcode arriving out of order.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
