//! Per-connection client state.
//!
//! Every live connection gets one [`ClientHandle`]: the socket plus a
//! private mutex over who (if anyone) is logged in on it. The handle is
//! cheap to clone, so the session store and router can keep a copy to
//! push messages or force a logout from another task.
//!
//! Lock discipline: any read or write of the bound user goes through
//! [`ClientHandle::lock`]. Never hold the guard while calling into code
//! that may lock the same handle again (logout in particular).

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use warren_transport::{Connection, ConnectionId};

/// Identifies one login of a user on one connection.
///
/// A user logged in from several connections has one session ID per
/// connection; logout takes the ID so only that connection is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A successful login: the user and the session it opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn<U> {
    pub user: U,
    pub session_id: SessionId,
}

/// The state guarded by a connection's mutex.
#[derive(Debug)]
pub struct Binding<U> {
    signed_in: Option<SignedIn<U>>,
}

impl<U> Binding<U> {
    /// The logged-in user, if any.
    pub fn user(&self) -> Option<&U> {
        self.signed_in.as_ref().map(|s| &s.user)
    }

    /// The current session ID, if logged in.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.signed_in.as_ref().map(|s| &s.session_id)
    }

    pub fn is_logged_in(&self) -> bool {
        self.signed_in.is_some()
    }

    /// Binds a user to the connection, returning any previous login.
    pub fn bind(&mut self, signed_in: SignedIn<U>) -> Option<SignedIn<U>> {
        self.signed_in.replace(signed_in)
    }

    /// Unbinds and returns the current login.
    pub fn take(&mut self) -> Option<SignedIn<U>> {
        self.signed_in.take()
    }
}

impl<U> Default for Binding<U> {
    fn default() -> Self {
        Self { signed_in: None }
    }
}

/// Shared handle to one live connection and its login state.
pub struct ClientHandle<C, U> {
    connection: Arc<C>,
    binding: Arc<Mutex<Binding<U>>>,
}

impl<C: Connection, U> ClientHandle<C, U> {
    /// Wraps a freshly upgraded connection. Nobody is logged in yet.
    pub fn new(connection: Arc<C>) -> Self {
        Self {
            connection,
            binding: Arc::new(Mutex::new(Binding::default())),
        }
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Arc<C> {
        &self.connection
    }

    /// The connection's transport-level ID.
    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    /// Acquires the connection's private mutex.
    pub async fn lock(&self) -> MutexGuard<'_, Binding<U>> {
        self.binding.lock().await
    }

    /// Returns `true` if a user is currently bound.
    pub async fn is_logged_in(&self) -> bool {
        self.binding.lock().await.is_logged_in()
    }
}

impl<C, U> Clone for ClientHandle<C, U> {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            binding: Arc::clone(&self.binding),
        }
    }
}

/// Device credential scratch state for one connection.
///
/// Filled in by the remember-me handshake and handed to the router, which
/// may use it to file a credential when the user logs in with
/// "remember me".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceState {
    /// The device tag issued to or presented by the client.
    pub tag: Option<String>,
    /// The pending (or most recently issued) one-time pass.
    pub pass: Option<String>,
    /// The user the presented credential belongs to.
    pub user_id: Option<u64>,
}

impl DeviceState {
    /// Drops the credential fields, keeping nothing but a new tag.
    pub fn reset(&mut self, tag: String) {
        *self = Self {
            tag: Some(tag),
            pass: None,
            user_id: None,
        };
    }
}
