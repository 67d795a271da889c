//! Per-connection worker: handshake, action loop, teardown.
//!
//! Each admitted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!   1. Remember-me handshake, if enabled → maybe a bound user
//!   2. Loop: receive actions → route → reply
//!   3. Teardown: logout (if bound), release the slot, close

use std::sync::Arc;

use serde::Serialize;
use warren_protocol::{ClientAction, Codec};
use warren_session::{ClientHandle, DeviceState, SessionStore};
use warren_transport::{Connection, ConnectionSlot};

use crate::WarrenError;
use crate::dispatch::{self, ActionRouter};
use crate::handshake::{Handshake, HandshakeOutcome};
use crate::server::ServerState;
use crate::teardown::teardown;

/// Handles a single connection from upgrade to close.
///
/// Owns the connection's counter slot; it is released during teardown no
/// matter how the connection ended.
pub(crate) async fn handle_connection<C, S, R>(
    conn: C,
    slot: ConnectionSlot,
    state: Arc<ServerState<S, R>>,
) where
    C: Connection,
    S: SessionStore<C>,
    R: ActionRouter<C, S::User>,
{
    let conn_id = conn.id();
    let client: ClientHandle<C, S::User> = ClientHandle::new(Arc::new(conn));
    let mut device = DeviceState::default();

    match serve(&client, &mut device, &state).await {
        Err(WarrenError::Disconnected) => tracing::info!(%conn_id, "client disconnected"),
        Err(WarrenError::Protocol(e)) => {
            tracing::debug!(%conn_id, error = %e, "protocol violation, dropping connection")
        }
        Err(e) => tracing::debug!(%conn_id, error = %e, "connection failed"),
        Ok(()) => {}
    }

    teardown(&client, &state.store, slot).await;
}

async fn serve<C, S, R>(
    client: &ClientHandle<C, S::User>,
    device: &mut DeviceState,
    state: &ServerState<S, R>,
) -> Result<(), WarrenError>
where
    C: Connection,
    S: SessionStore<C>,
    R: ActionRouter<C, S::User>,
{
    if state.config.remember_me {
        let outcome =
            Handshake::new(client, device, &state.store, state.tokens.as_ref(), &state.codec)
                .run()
                .await?;
        if outcome == HandshakeOutcome::Unauthenticated {
            tracing::debug!(conn_id = %client.id(), "continuing as guest");
        }
    }

    dispatch::run(client, device, &state.router, &state.codec).await
}

/// Reads the next action.
///
/// A closed socket and the empty action both come back as
/// [`WarrenError::Disconnected`].
pub(crate) async fn read_action<C, K>(conn: &C, codec: &K) -> Result<ClientAction, WarrenError>
where
    C: Connection,
    K: Codec,
{
    let data = conn.recv().await?.ok_or(WarrenError::Disconnected)?;
    let action: ClientAction = codec.decode(&data)?;
    if action.is_disconnect() {
        return Err(WarrenError::Disconnected);
    }
    Ok(action)
}

/// Encodes and writes one message.
pub(crate) async fn send_message<C, K, T>(conn: &C, codec: &K, message: &T) -> Result<(), WarrenError>
where
    C: Connection,
    K: Codec,
    T: Serialize,
{
    let bytes = codec.encode(message)?;
    conn.send(&bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use warren_protocol::JsonCodec;
    use warren_session::{MemoryUser, OsTokenSource};
    use warren_transport::ConnectionCounter;

    use super::*;
    use crate::ServerConfig;
    use crate::testing::{CountingStore, Peer, TestRouter, pair};

    struct Harness {
        peer: Peer,
        store: CountingStore,
        counter: Arc<ConnectionCounter>,
        worker: tokio::task::JoinHandle<()>,
    }

    fn start(remember_me: bool, store: CountingStore) -> Harness {
        let (conn, peer) = pair();
        let counter = Arc::new(ConnectionCounter::new(0));
        let slot = counter.try_admit().unwrap();
        let state = Arc::new(ServerState {
            config: ServerConfig {
                remember_me,
                ..ServerConfig::default()
            },
            store: store.clone(),
            router: TestRouter::new(store.inner.clone()),
            tokens: Arc::new(OsTokenSource),
            codec: JsonCodec,
        });
        let worker = tokio::spawn(handle_connection(conn, slot, state));
        Harness {
            peer,
            store,
            counter,
            worker,
        }
    }

    async fn filed(store: &CountingStore) -> MemoryUser {
        let user = store.inner.register_user("ana").await.unwrap();
        store.inner.file_credential("tag-1", "pass-1", user.id).await.unwrap();
        user
    }

    #[tokio::test]
    async fn test_remember_me_disabled_goes_straight_to_actions() {
        let mut h = start(false, CountingStore::default());

        h.peer.send_json(json!({"A": "echo", "P": 5}));

        assert_eq!(h.peer.recv_json().await["value"], json!(5));
    }

    #[tokio::test]
    async fn test_auto_login_then_disconnect_logs_out_once() {
        let store = CountingStore::default();
        let user = filed(&store).await;
        let mut h = start(true, store);

        assert_eq!(h.peer.recv_json().await, json!({"tr": null}));
        h.peer.send_json(json!({"A": "2", "P": {"dt": "tag-1", "da": "pass-1", "di": user.id.to_string()}}));
        h.peer.recv_json().await;
        h.peer.send_json(json!({"A": "3", "P": null}));

        h.peer.send_json(json!({"A": "whoami", "P": null}));
        assert_eq!(h.peer.recv_json().await["value"], json!("ana"));

        h.peer.hang_up();
        h.worker.await.unwrap();

        assert_eq!(h.store.logouts(), 1);
        assert_eq!(h.store.inner.active_sessions(user.id).await, 0);
        assert_eq!(h.counter.current(), 0);
    }

    #[tokio::test]
    async fn test_failed_auto_login_keeps_connection_as_guest() {
        let store = CountingStore::default();
        let user = filed(&store).await;
        let mut h = start(true, store);

        h.peer.recv_json().await;
        h.peer.send_json(json!({"A": "2", "P": {"dt": "tag-1", "da": "wrong", "di": user.id.to_string()}}));
        h.peer.recv_json().await;
        h.peer.send_json(json!({"A": "3", "P": null}));
        assert!(h.peer.recv_json().await.get("af").is_some());

        h.peer.send_json(json!({"A": "whoami", "P": null}));
        let reply = h.peer.recv_json().await;
        assert!(reply["error"].is_object(), "still a guest: {reply}");

        h.peer.send_json(json!({"A": "", "P": null}));
        h.worker.await.unwrap();
        assert_eq!(h.store.logouts(), 0);
        assert_eq!(h.counter.current(), 0);
    }

    #[tokio::test]
    async fn test_mid_handshake_disconnect_releases_slot_without_logout() {
        let mut h = start(true, CountingStore::default());

        h.peer.recv_json().await;
        h.peer.send_json(json!({"A": "0", "P": null}));
        h.peer.recv_json().await;
        h.peer.hang_up();
        h.worker.await.unwrap();

        assert_eq!(h.counter.current(), 0);
        assert_eq!(h.store.logouts(), 0);
    }

    #[tokio::test]
    async fn test_violation_closes_connection() {
        let mut h = start(true, CountingStore::default());

        h.peer.recv_json().await;
        h.peer.send_json(json!({"A": "0", "P": null}));
        h.peer.recv_json().await;
        h.peer.send_json(json!({"A": "1", "P": "never-issued"}));
        h.worker.await.unwrap();

        assert!(h.peer.next_frame().await.is_none(), "no reply after a violation");
        assert_eq!(h.counter.current(), 0);
    }

    #[tokio::test]
    async fn test_router_login_is_logged_out_on_disconnect() {
        let store = CountingStore::default();
        store.inner.register_user("bo").await.unwrap();
        let mut h = start(false, store);

        h.peer.send_json(json!({"A": "login", "P": {"n": "bo"}}));
        assert_eq!(h.peer.recv_json().await["value"], json!("bo"));

        h.peer.hang_up();
        h.worker.await.unwrap();
        assert_eq!(h.store.logouts(), 1);
    }
}
