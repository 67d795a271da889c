/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}

/// Reasons an inbound connection request is turned away before it becomes
/// a live connection.
///
/// Each variant maps to the HTTP status written on the upgrade response
/// (see [`AdmissionError::status_code`]). None of them leave a slot
/// reserved on the connection counter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// The `Origin` header did not match the configured host or alias.
    #[error("origin not allowed: {0:?}")]
    OriginNotAllowed(Option<String>),

    /// The connection counter is at its configured maximum.
    #[error("server is full ({0} connections)")]
    ServerFull(usize),

    /// The connect callback vetoed the request.
    #[error("connection refused by connect callback")]
    Refused,

    /// The WebSocket upgrade itself failed.
    #[error("upgrade failed: {0}")]
    UpgradeFailed(String),
}

impl AdmissionError {
    /// The HTTP status code this rejection is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ServerFull(_) => 413,
            Self::OriginNotAllowed(_) | Self::Refused | Self::UpgradeFailed(_) => 403,
        }
    }

    /// The body text sent alongside the status code.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::OriginNotAllowed(_) => "Origin not allowed.",
            Self::ServerFull(_) => "Server is full.",
            Self::Refused | Self::UpgradeFailed(_) => "Could not establish a connection.",
        }
    }
}
