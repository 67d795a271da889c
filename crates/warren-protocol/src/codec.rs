//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The session layer never calls `serde_json` directly; it goes through a
//! [`Codec`] so the framing format is decided in one place. Clients speak
//! JSON today, which [`JsonCodec`] provides.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a single codec is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use warren_protocol::{ClientAction, Codec, JsonCodec};
///
/// let codec = JsonCodec;
///
/// let action: ClientAction = codec.decode(br#"{"A":"echo","P":"hi"}"#).unwrap();
/// assert_eq!(action.action, "echo");
///
/// let bytes = codec.encode(&action).unwrap();
/// let again: ClientAction = codec.decode(&bytes).unwrap();
/// assert_eq!(action, again);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientAction, ServerMessage};

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let result: Result<ClientAction, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_server_message_is_utf8_json() {
        let bytes = JsonCodec
            .encode(&ServerMessage::SetAutoLoginPass("p".into()))
            .unwrap();
        assert_eq!(std::str::from_utf8(&bytes).unwrap(), r#"{"sp":"p"}"#);
    }
}
