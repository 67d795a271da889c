//! Wire protocol for Warren.
//!
//! This crate defines what clients and the session layer say to each
//! other:
//!
//! - **Types** ([`ClientAction`], [`ServerResponse`], [`ServerMessage`],
//!   [`ErrorRecord`]): the JSON objects that travel on the wire.
//! - **Error codes** ([`error_codes`]): the numeric kinds clients switch on.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong along the way.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientAction) → Session (user context)
//! ```

mod codec;
mod error;
pub mod error_codes;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AutoLoginFailure, ClientAction, CredentialParams, ErrorRecord, HandshakeAction,
    ServerMessage, ServerResponse,
};
