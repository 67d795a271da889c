//! In-memory [`SessionStore`]: users, device credentials, and open
//! sessions held in a single mutex-protected registry.
//!
//! Suitable for development, tests, and single-process deployments that
//! don't need credentials to survive a restart.
//!
//! # Concurrency
//!
//! One `tokio::sync::Mutex` guards the whole registry. Every auto-login
//! runs its check-and-rotate under that lock, which is what guarantees
//! that two connections racing with the same `(tag, pass)` can't both
//! succeed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use warren_protocol::{ErrorRecord, error_codes};
use warren_transport::Connection;

use crate::{AutoLogin, ClientHandle, SessionError, SessionId, SessionStore, SignedIn};

/// A user known to the [`MemorySessionStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryUser {
    pub id: u64,
    pub name: String,
}

/// A filed remember-me credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCredential {
    pub device_tag: String,
    /// The pass the device must present next time. Rotated on every
    /// successful auto-login.
    pub pass: String,
    pub user_id: u64,
}

#[derive(Debug, Default)]
struct Registry {
    users: HashMap<u64, MemoryUser>,
    names: HashMap<String, u64>,
    /// Credentials keyed by device tag.
    credentials: HashMap<String, DeviceCredential>,
    /// Open sessions per user.
    sessions: HashMap<u64, HashSet<SessionId>>,
    next_user_id: u64,
    next_session: u64,
}

impl Registry {
    fn open_session(&mut self, user_id: u64) -> SessionId {
        self.next_session += 1;
        let session_id = SessionId::new(format!("{user_id}-{}", self.next_session));
        self.sessions
            .entry(user_id)
            .or_default()
            .insert(session_id.clone());
        session_id
    }
}

/// Reference [`SessionStore`] implementation. Clones share one registry.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<Mutex<Registry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new user under a unique name.
    pub async fn register_user(&self, name: &str) -> Result<MemoryUser, SessionError> {
        let mut reg = self.inner.lock().await;
        if reg.names.contains_key(name) {
            return Err(SessionError::NameTaken(name.to_string()));
        }
        reg.next_user_id += 1;
        let user = MemoryUser {
            id: reg.next_user_id,
            name: name.to_string(),
        };
        reg.names.insert(user.name.clone(), user.id);
        reg.users.insert(user.id, user.clone());
        tracing::debug!(user_id = user.id, name, "user registered");
        Ok(user)
    }

    /// Looks up a user by name.
    pub async fn find_user(&self, name: &str) -> Option<MemoryUser> {
        let reg = self.inner.lock().await;
        reg.names.get(name).and_then(|id| reg.users.get(id)).cloned()
    }

    /// Opens a session for an interactive (non-device) login.
    pub async fn log_in(&self, user_id: u64) -> Result<SignedIn<MemoryUser>, SessionError> {
        let mut reg = self.inner.lock().await;
        let user = reg
            .users
            .get(&user_id)
            .cloned()
            .ok_or(SessionError::UnknownUser(user_id))?;
        let session_id = reg.open_session(user_id);
        tracing::info!(user_id, %session_id, "user logged in");
        Ok(SignedIn { user, session_id })
    }

    /// Files (or replaces) the remember-me credential for a device.
    pub async fn file_credential(
        &self,
        device_tag: &str,
        pass: &str,
        user_id: u64,
    ) -> Result<(), SessionError> {
        let mut reg = self.inner.lock().await;
        if !reg.users.contains_key(&user_id) {
            return Err(SessionError::UnknownUser(user_id));
        }
        reg.credentials.insert(
            device_tag.to_string(),
            DeviceCredential {
                device_tag: device_tag.to_string(),
                pass: pass.to_string(),
                user_id,
            },
        );
        tracing::debug!(user_id, "device credential filed");
        Ok(())
    }

    /// Returns the credential filed under a device tag.
    pub async fn credential(&self, device_tag: &str) -> Option<DeviceCredential> {
        self.inner.lock().await.credentials.get(device_tag).cloned()
    }

    /// Number of open sessions for a user.
    pub async fn active_sessions(&self, user_id: u64) -> usize {
        self.inner
            .lock()
            .await
            .sessions
            .get(&user_id)
            .map_or(0, HashSet::len)
    }
}

impl<C: Connection> SessionStore<C> for MemorySessionStore {
    type User = MemoryUser;

    async fn auto_log_in(
        &self,
        request: &AutoLogin,
        client: &ClientHandle<C, MemoryUser>,
    ) -> Result<SignedIn<MemoryUser>, ErrorRecord> {
        // One message for every failure so a probe can't tell an unknown
        // tag from a wrong pass.
        let rejected = || ErrorRecord::new("Auto-login failed.", error_codes::LOGIN);
        let conn_id = client.id();

        let mut reg = self.inner.lock().await;
        let matches = match reg.credentials.get(&request.device_tag) {
            Some(cred) => {
                cred.user_id == request.user_id && safe_equal(&cred.pass, &request.old_pass)
            }
            None => {
                tracing::debug!(%conn_id, "auto-login with unknown device tag");
                return Err(rejected());
            }
        };

        if !matches {
            // A stale pass means the credential may have been copied;
            // nobody gets to use it again.
            reg.credentials.remove(&request.device_tag);
            tracing::info!(%conn_id, user_id = request.user_id, "auto-login rejected, credential revoked");
            return Err(rejected());
        }

        let Some(user) = reg.users.get(&request.user_id).cloned() else {
            reg.credentials.remove(&request.device_tag);
            return Err(rejected());
        };

        if let Some(cred) = reg.credentials.get_mut(&request.device_tag) {
            cred.pass = request.new_pass.clone();
        }
        let session_id = reg.open_session(user.id);
        tracing::info!(%conn_id, user_id = user.id, %session_id, "auto-login succeeded");
        Ok(SignedIn { user, session_id })
    }

    async fn logout(&self, signed_in: SignedIn<MemoryUser>) {
        let mut reg = self.inner.lock().await;
        let user_id = signed_in.user.id;
        let removed = reg
            .sessions
            .get_mut(&user_id)
            .is_some_and(|open| open.remove(&signed_in.session_id));
        if reg.sessions.get(&user_id).is_some_and(HashSet::is_empty) {
            reg.sessions.remove(&user_id);
        }
        if removed {
            tracing::info!(user_id, session_id = %signed_in.session_id, "user logged out");
        } else {
            tracing::debug!(user_id, session_id = %signed_in.session_id, "logout for unknown session");
        }
    }
}

/// Constant-time string comparison (prevents timing attacks).
fn safe_equal(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}
