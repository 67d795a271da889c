//! # Warren
//!
//! Session layer for realtime multiplayer servers.
//!
//! Warren sits between the WebSocket listener and your application. It
//! decides which upgrade requests become connections (origin check,
//! capacity limit, connect callback), optionally runs a rotating-credential
//! "remember me" handshake so returning devices log in without a password,
//! then hands every client action to your [`ActionRouter`]. When a
//! connection ends for any reason it logs the user out and frees the
//! capacity slot.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use warren::prelude::*;
//!
//! // Implement ActionRouter for your application, then:
//! // let server = WarrenServer::builder()
//! //     .bind("0.0.0.0:8080")
//! //     .config(ServerConfig::from_file("warren.json")?)
//! //     .build(MemorySessionStore::new(), MyRouter)
//! //     .await?;
//! // server.run().await
//! ```

mod config;
mod dispatch;
mod error;
mod handler;
mod handshake;
mod server;
mod teardown;
#[cfg(test)]
mod testing;

pub use config::ServerConfig;
pub use dispatch::{ActionReply, ActionRouter};
pub use error::WarrenError;
pub use server::{WarrenServer, WarrenServerBuilder};

pub use warren_protocol::{ClientAction, ErrorRecord, error_codes};
pub use warren_session::{
    AutoLogin, ClientHandle, DeviceState, MemorySessionStore, MemoryUser, OsTokenSource, SessionId,
    SessionStore, SignedIn, TokenSource,
};
pub use warren_transport::{Connection, ConnectionCounter, UpgradeRequest, WebSocketConnection};

/// Everything needed to write a router and start a server.
pub mod prelude {
    pub use crate::{
        ActionReply, ActionRouter, ClientAction, ClientHandle, Connection, DeviceState,
        ErrorRecord, MemorySessionStore, MemoryUser, ServerConfig, SessionStore, SignedIn,
        WarrenError, WarrenServer, WarrenServerBuilder, error_codes,
    };
}
