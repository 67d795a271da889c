//! In-memory doubles for worker tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc};
use warren_protocol::{ClientAction, ErrorRecord, error_codes};
use warren_session::{
    AutoLogin, ClientHandle, DeviceState, MemorySessionStore, MemoryUser, SessionError,
    SessionStore, SignedIn, TokenSource,
};
use warren_transport::{Connection, ConnectionId, TransportError};

use crate::{ActionReply, ActionRouter};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Channel-backed [`Connection`].
pub(crate) struct MockConnection {
    id: ConnectionId,
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    closed: AtomicBool,
}

impl MockConnection {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Connection for MockConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed("closed locally".into()));
        }
        self.outbound
            .send(data.to_vec())
            .map_err(|_| TransportError::ConnectionClosed("peer gone".into()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.is_closed() {
            return Ok(None);
        }
        Ok(self.inbound.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// The client end of a [`MockConnection`].
pub(crate) struct Peer {
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl Peer {
    pub(crate) fn send_json(&self, value: Value) {
        self.send_raw(value.to_string().as_bytes());
    }

    pub(crate) fn send_raw(&self, data: &[u8]) {
        self.tx
            .as_ref()
            .expect("peer already hung up")
            .send(data.to_vec())
            .expect("worker gone");
    }

    /// Closes the client side; the worker's next read sees end-of-stream.
    pub(crate) fn hang_up(&mut self) {
        self.tx = None;
    }

    /// Next frame from the server, or `None` once the server side is gone.
    pub(crate) async fn next_frame(&mut self) -> Option<Vec<u8>> {
        tokio::time::timeout(Duration::from_secs(2), self.rx.recv())
            .await
            .expect("timed out waiting for the server")
    }

    pub(crate) async fn recv_json(&mut self) -> Value {
        let frame = self.next_frame().await.expect("connection dropped");
        serde_json::from_slice(&frame).expect("server sent invalid JSON")
    }
}

pub(crate) fn pair() -> (MockConnection, Peer) {
    let (client_tx, server_rx) = mpsc::unbounded_channel();
    let (server_tx, client_rx) = mpsc::unbounded_channel();
    let conn = MockConnection {
        id: ConnectionId::new(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
        inbound: Mutex::new(server_rx),
        outbound: server_tx,
        closed: AtomicBool::new(false),
    };
    let peer = Peer {
        tx: Some(client_tx),
        rx: client_rx,
    };
    (conn, peer)
}

/// A token source whose RNG is always unavailable.
pub(crate) struct FailingTokens;

impl TokenSource for FailingTokens {
    fn generate(&self) -> Result<String, SessionError> {
        Err(SessionError::TokenGeneration("rng unavailable".into()))
    }
}

/// [`MemorySessionStore`] that counts logouts.
#[derive(Clone, Default)]
pub(crate) struct CountingStore {
    pub(crate) inner: MemorySessionStore,
    logouts: Arc<AtomicUsize>,
}

impl CountingStore {
    pub(crate) fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

impl<C: Connection> SessionStore<C> for CountingStore {
    type User = MemoryUser;

    async fn auto_log_in(
        &self,
        request: &AutoLogin,
        client: &ClientHandle<C, MemoryUser>,
    ) -> Result<SignedIn<MemoryUser>, ErrorRecord> {
        SessionStore::<C>::auto_log_in(&self.inner, request, client).await
    }

    async fn logout(&self, signed_in: SignedIn<MemoryUser>) {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        SessionStore::<C>::logout(&self.inner, signed_in).await;
    }
}

/// Router with a handful of actions:
///
/// - `echo`: replies with its params
/// - `silent`: no reply
/// - `whoami`: the bound user's name
/// - `login` `{n}`: binds a registered user by name
#[derive(Default)]
pub(crate) struct TestRouter {
    store: MemorySessionStore,
}

impl TestRouter {
    pub(crate) fn new(store: MemorySessionStore) -> Self {
        Self { store }
    }
}

impl<C: Connection> ActionRouter<C, MemoryUser> for TestRouter {
    async fn dispatch(
        &self,
        action: ClientAction,
        client: &ClientHandle<C, MemoryUser>,
        _device: &mut DeviceState,
    ) -> Option<ActionReply> {
        match action.action.as_str() {
            "echo" => Some(ActionReply::ok(action.params)),
            "silent" => None,
            "whoami" => Some(match client.lock().await.user() {
                Some(user) => ActionReply::ok(json!(user.name)),
                None => ActionReply::err(ErrorRecord::new("Not logged in.", error_codes::NOT_LOGGED_IN)),
            }),
            "login" => {
                let name = action.params["n"].as_str().unwrap_or_default();
                let Some(user) = self.store.find_user(name).await else {
                    return Some(ActionReply::err(ErrorRecord::new("Unknown user.", error_codes::LOGIN)));
                };
                let signed_in = self.store.log_in(user.id).await.ok()?;
                let mut binding = client.lock().await;
                if binding.is_logged_in() {
                    return Some(ActionReply::err(ErrorRecord::new("Already logged in.", error_codes::LOGGED_IN)));
                }
                binding.bind(signed_in);
                Some(ActionReply::ok(json!(user.name)))
            }
            _ => Some(ActionReply::err(ErrorRecord::new("Invalid action.", error_codes::INVALID_ACTION))),
        }
    }
}
