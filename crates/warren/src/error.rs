//! Unified error type for the Warren framework.

use warren_protocol::ProtocolError;
use warren_session::SessionError;
use warren_transport::{AdmissionError, TransportError};

/// Top-level error that wraps all crate-specific errors.
///
/// Inside a connection worker every variant means the same thing: the
/// connection is over and goes through teardown. The variant only says
/// why, for the logs.
#[derive(Debug, thiserror::Error)]
pub enum WarrenError {
    /// A transport-level error (bind, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The connection request was turned away before upgrade.
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    /// A frame failed to encode/decode, or broke the handshake protocol.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (token generation, unknown user).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The configuration is unreadable or inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The client closed the socket or sent the disconnect action.
    #[error("client disconnected")]
    Disconnected,
}

impl WarrenError {
    /// Shorthand for a handshake protocol violation.
    pub(crate) fn violation(reason: impl Into<String>) -> Self {
        Self::Protocol(ProtocolError::InvalidMessage(reason.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let warren_err: WarrenError = err.into();
        assert!(matches!(warren_err, WarrenError::Transport(_)));
        assert!(warren_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_admission_error() {
        let err: WarrenError = AdmissionError::ServerFull(2).into();
        assert!(matches!(err, WarrenError::Admission(AdmissionError::ServerFull(2))));
    }

    #[test]
    fn test_from_session_error() {
        let err: WarrenError = SessionError::TokenGeneration("rng".into()).into();
        assert!(matches!(err, WarrenError::Session(_)));
    }

    #[test]
    fn test_violation_is_protocol_error() {
        let err = WarrenError::violation("confirm out of order");
        assert!(matches!(
            err,
            WarrenError::Protocol(ProtocolError::InvalidMessage(ref m)) if m == "confirm out of order"
        ));
    }
}
