//! Connection teardown.
//!
//! Every worker ends here exactly once, whatever ended the connection.
//! The bound login is snapshotted under the client's mutex and the mutex
//! is released before the store is called, because logout may lock the
//! same client again.

use warren_session::{ClientHandle, SessionStore};
use warren_transport::{Connection, ConnectionSlot};

pub(crate) async fn teardown<C, S>(
    client: &ClientHandle<C, S::User>,
    store: &S,
    slot: ConnectionSlot,
) where
    C: Connection,
    S: SessionStore<C>,
{
    let conn_id = client.id();

    // Phase 1: take the login out while holding the lock.
    let signed_in = {
        let mut binding = client.lock().await;
        binding.take()
    };

    // Phase 2: lock released.
    if let Some(signed_in) = signed_in {
        tracing::debug!(%conn_id, session_id = %signed_in.session_id, "logging out");
        store.logout(signed_in).await;
    }

    drop(slot);

    if let Err(e) = client.connection().close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use warren_session::{MemoryUser, SessionStore};
    use warren_transport::ConnectionCounter;

    use super::*;
    use crate::testing::{CountingStore, MockConnection, pair};

    fn client() -> ClientHandle<MockConnection, MemoryUser> {
        let (conn, _peer) = pair();
        ClientHandle::new(Arc::new(conn))
    }

    #[tokio::test]
    async fn test_guest_teardown_releases_slot_without_logout() {
        let counter = Arc::new(ConnectionCounter::new(1));
        let slot = counter.try_admit().unwrap();
        let store = CountingStore::default();
        let client = client();

        teardown(&client, &store, slot).await;

        assert_eq!(counter.current(), 0);
        assert_eq!(store.logouts(), 0);
        assert!(client.connection().is_closed());
    }

    #[tokio::test]
    async fn test_bound_user_logged_out_once() {
        let counter = Arc::new(ConnectionCounter::new(0));
        let slot = counter.try_admit().unwrap();
        let store = CountingStore::default();
        let user = store.inner.register_user("ana").await.unwrap();
        let client = client();
        client.lock().await.bind(store.inner.log_in(user.id).await.unwrap());

        teardown(&client, &store, slot).await;

        assert_eq!(store.logouts(), 1);
        assert_eq!(store.inner.active_sessions(user.id).await, 0);
        assert!(!client.is_logged_in().await);
        assert_eq!(counter.current(), 0);
    }

    /// A store whose logout locks the client it is logging out.
    struct ReentrantStore {
        client: ClientHandle<MockConnection, MemoryUser>,
    }

    impl SessionStore<MockConnection> for ReentrantStore {
        type User = MemoryUser;

        async fn auto_log_in(
            &self,
            _request: &warren_session::AutoLogin,
            _client: &ClientHandle<MockConnection, MemoryUser>,
        ) -> Result<warren_session::SignedIn<MemoryUser>, warren_protocol::ErrorRecord> {
            unreachable!("teardown never logs in")
        }

        async fn logout(&self, _signed_in: warren_session::SignedIn<MemoryUser>) {
            assert!(!self.client.lock().await.is_logged_in());
        }
    }

    #[tokio::test]
    async fn test_logout_runs_with_client_unlocked() {
        let counter = Arc::new(ConnectionCounter::new(0));
        let client = client();
        client.lock().await.bind(warren_session::SignedIn {
            user: MemoryUser {
                id: 1,
                name: "ana".into(),
            },
            session_id: warren_session::SessionId::new("s-1"),
        });
        let store = ReentrantStore {
            client: client.clone(),
        };

        let finished = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            teardown(&client, &store, counter.try_admit().unwrap()),
        )
        .await;

        assert!(finished.is_ok(), "logout must not deadlock on the client mutex");
    }
}
