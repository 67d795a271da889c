//! Wire types exchanged between clients and the session layer.
//!
//! Everything here is a JSON object on the wire:
//!
//! ```text
//! Client → Server   { "A": "<action>", "P": <any> }
//! Server → Client   { "action": "<action>", "value": <any>, "error": null | { "m", "id" } }
//! Server → Client   { "<opcode>": <payload> }      (remember-me handshake)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// ClientAction
// ---------------------------------------------------------------------------

/// One request from a client.
///
/// Missing fields decode to their empty defaults, so `{}` is an action with
/// an empty name, which signals disconnect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientAction {
    /// The action name. Empty means the client is going away.
    #[serde(rename = "A", default)]
    pub action: String,

    /// Action parameters, left undecoded until the router knows which
    /// shape the action expects.
    #[serde(rename = "P", default)]
    pub params: Value,
}

impl ClientAction {
    /// Creates an action with the given name and parameters.
    pub fn new(action: impl Into<String>, params: Value) -> Self {
        Self {
            action: action.into(),
            params,
        }
    }

    /// Returns `true` if this action is the end-of-stream signal.
    pub fn is_disconnect(&self) -> bool {
        self.action.is_empty()
    }

    /// Reads the params as a single device tag string.
    pub fn device_tag_param(&self) -> Result<&str, ProtocolError> {
        self.params
            .as_str()
            .ok_or_else(|| ProtocolError::InvalidMessage("device tag must be a string".into()))
    }

    /// Reads the params as a stored device credential.
    pub fn credential_params(&self) -> Result<CredentialParams, ProtocolError> {
        CredentialParams::deserialize(&self.params).map_err(ProtocolError::Decode)
    }
}

/// The credential a returning client presents during the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialParams {
    /// Device tag the credential was filed under.
    #[serde(rename = "dt")]
    pub device_tag: String,

    /// The one-time pass issued on the previous successful login.
    #[serde(rename = "da")]
    pub pass: String,

    /// The user ID, sent as a decimal string.
    #[serde(rename = "di")]
    pub user_id: String,
}

impl CredentialParams {
    /// Parses the decimal user ID.
    pub fn user_id(&self) -> Result<u64, ProtocolError> {
        self.user_id
            .parse()
            .map_err(|_| ProtocolError::InvalidMessage(format!("bad device user id {:?}", self.user_id)))
    }
}

/// Client opcodes accepted while the remember-me handshake is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeAction {
    /// `"0"`: the client has never been tagged.
    NoTag,
    /// `"1"`: the client has a tag but no stored credential.
    HasTag,
    /// `"2"`: the client presents a stored credential.
    HasCredential,
    /// `"3"`: the client has saved the new pass; log it in.
    Confirm,
}

impl HandshakeAction {
    /// Maps an action name to a handshake opcode.
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "0" => Some(Self::NoTag),
            "1" => Some(Self::HasTag),
            "2" => Some(Self::HasCredential),
            "3" => Some(Self::Confirm),
            _ => None,
        }
    }

    /// The action name clients send for this opcode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoTag => "0",
            Self::HasTag => "1",
            Self::HasCredential => "2",
            Self::Confirm => "3",
        }
    }
}

// ---------------------------------------------------------------------------
// Errors and responses
// ---------------------------------------------------------------------------

/// An error reported to a client: a message plus a numeric kind from
/// [`error_codes`](crate::error_codes). Kind `0` means "no error".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Human-readable description.
    #[serde(rename = "m")]
    pub message: String,

    /// Numeric error kind.
    #[serde(rename = "id")]
    pub kind: u32,
}

impl ErrorRecord {
    /// Creates an error record.
    pub fn new(message: impl Into<String>, kind: u32) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// The "no error" record.
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns `true` unless the kind is `0`.
    pub fn is_error(&self) -> bool {
        self.kind != 0
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.message, self.kind)
    }
}

/// The answer to a [`ClientAction`] in the standard loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse {
    /// The action name being answered.
    pub action: String,
    /// Result value; `null` when there is nothing to return.
    pub value: Value,
    /// `None` (`null` on the wire) when the action succeeded.
    pub error: Option<ErrorRecord>,
}

impl ServerResponse {
    /// Builds a response, collapsing a kind-0 error to `null`.
    pub fn new(action: impl Into<String>, value: Value, error: ErrorRecord) -> Self {
        Self {
            action: action.into(),
            value,
            error: error.is_error().then_some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerMessage: remember-me handshake
// ---------------------------------------------------------------------------

/// Control messages the server sends during the remember-me handshake.
///
/// Each serializes as a single-key object, e.g. `{"ts": "<tag>"}` or
/// `{"anf": null}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Asks the client which device state it has.
    #[serde(rename = "tr")]
    RequestDeviceTag(()),

    /// Issues a new device tag.
    #[serde(rename = "ts")]
    SetDeviceTag(String),

    /// No credential is filed for this device; continue without auto-login.
    #[serde(rename = "anf")]
    AutoLoginNotFiled(()),

    /// The pass to store for the next auto-login.
    #[serde(rename = "sp")]
    SetAutoLoginPass(String),

    /// Auto-login was rejected; the client must replace its tag.
    #[serde(rename = "af")]
    AutoLoginFailed(AutoLoginFailure),
}

/// Payload of [`ServerMessage::AutoLoginFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoLoginFailure {
    /// Replacement device tag.
    #[serde(rename = "dt")]
    pub device_tag: String,
    /// Why the store refused the login.
    #[serde(rename = "e")]
    pub error: ErrorRecord,
}
