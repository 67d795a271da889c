//! Error types for the session layer.

/// Errors that can occur while managing client sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The secure random source failed to produce a token.
    #[error("token generation failed: {0}")]
    TokenGeneration(String),

    /// No user is registered under the given ID.
    #[error("unknown user {0}")]
    UnknownUser(u64),

    /// A user with this name is already registered.
    #[error("user name {0:?} is taken")]
    NameTaken(String),
}
