//! The session store contract.
//!
//! Warren doesn't persist users or device credentials itself. The store
//! is the collaborator that knows which credentials are filed, checks
//! them during auto-login, and tears sessions down on logout. Implement
//! [`SessionStore`] over your database; [`MemorySessionStore`] is the
//! in-process reference implementation.
//!
//! [`MemorySessionStore`]: crate::MemorySessionStore

use std::future::Future;

use warren_protocol::ErrorRecord;
use warren_transport::Connection;

use crate::{ClientHandle, SignedIn};

/// One auto-login attempt, as confirmed by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoLogin {
    /// Device tag the credential is filed under.
    pub device_tag: String,
    /// The pass the client presented; must equal the stored current pass.
    pub old_pass: String,
    /// The pass that replaces it when the login succeeds.
    pub new_pass: String,
    /// The user the credential claims to belong to.
    pub user_id: u64,
}

/// Checks device credentials and owns logged-in sessions.
///
/// # Contract
///
/// - `auto_log_in` must serialize concurrent attempts against the same
///   device tag so at most one succeeds per `(device_tag, old_pass)`. On
///   success the stored pass becomes `new_pass`.
/// - The handler binds the returned [`SignedIn`] to the client under its
///   mutex; the store must not hold that mutex when it returns.
/// - `logout` is called with the client's mutex released, so it may lock
///   the client itself.
pub trait SessionStore<C: Connection>: Send + Sync + 'static {
    /// The user type bound to a connection after login.
    type User: Send + Sync + 'static;

    /// Attempts an auto-login with a rotating device credential.
    fn auto_log_in(
        &self,
        request: &AutoLogin,
        client: &ClientHandle<C, Self::User>,
    ) -> impl Future<Output = Result<SignedIn<Self::User>, ErrorRecord>> + Send;

    /// Ends one session of a user.
    fn logout(&self, signed_in: SignedIn<Self::User>) -> impl Future<Output = ()> + Send;
}
