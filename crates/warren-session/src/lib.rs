//! Client session state for Warren.
//!
//! This crate holds everything the session layer knows about a connected
//! client, independent of how the connection got there:
//!
//! 1. **Client state**: [`ClientHandle`] pairs a connection with the
//!    private mutex over its logged-in user; [`DeviceState`] carries the
//!    remember-me scratch values.
//! 2. **Tokens**: [`TokenSource`] issues device tags and one-time passes.
//! 3. **Session store**: the [`SessionStore`] contract for auto-login and
//!    logout, with [`MemorySessionStore`] as a ready-made implementation.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)  ← handshake, dispatch loop, teardown
//!     ↕
//! Session Layer (this crate)  ← who is logged in on which connection
//!     ↕
//! Protocol + Transport (below)  ← wire types, Connection trait
//! ```

mod client;
mod error;
mod memory;
mod store;
mod token;

pub use client::{Binding, ClientHandle, DeviceState, SessionId, SignedIn};
pub use error::SessionError;
pub use memory::{DeviceCredential, MemorySessionStore, MemoryUser};
pub use store::{AutoLogin, SessionStore};
pub use token::{OsTokenSource, TOKEN_BYTES, TokenSource};
