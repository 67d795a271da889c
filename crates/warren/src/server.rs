//! Server builder and accept loop.

use std::net::SocketAddr;
use std::sync::Arc;

use warren_protocol::JsonCodec;
use warren_session::{OsTokenSource, SessionStore, TokenSource};
use warren_transport::{
    Admission, ConnectCallback, Connection, ConnectionCounter, UpgradeRequest,
    WebSocketConnection, WebSocketTransport,
};

use crate::handler::handle_connection;
use crate::{ActionRouter, ServerConfig, WarrenError};

/// Shared state every connection worker reads.
pub(crate) struct ServerState<S, R> {
    pub(crate) config: ServerConfig,
    pub(crate) store: S,
    pub(crate) router: R,
    pub(crate) tokens: Arc<dyn TokenSource>,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a Warren server.
///
/// # Example
///
/// ```rust,no_run
/// use warren::prelude::*;
///
/// # struct Lobby;
/// # impl<C: Connection> ActionRouter<C, MemoryUser> for Lobby {
/// #     async fn dispatch(&self, _: ClientAction, _: &ClientHandle<C, MemoryUser>, _: &mut DeviceState) -> Option<ActionReply> { None }
/// # }
/// # async fn run() -> Result<(), WarrenError> {
/// let server = WarrenServer::builder()
///     .bind("0.0.0.0:8080")
///     .config(ServerConfig {
///         remember_me: true,
///         max_connections: 500,
///         ..ServerConfig::default()
///     })
///     .build(MemorySessionStore::new(), Lobby)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct WarrenServerBuilder {
    bind_addr: String,
    config: ServerConfig,
    on_connect: Option<ConnectCallback>,
    tokens: Arc<dyn TokenSource>,
}

impl WarrenServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            config: ServerConfig::default(),
            on_connect: None,
            tokens: Arc::new(OsTokenSource),
        }
    }

    /// Sets the address to bind to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Replaces the server configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a callback that can veto upgrade requests.
    ///
    /// Runs after the origin and capacity checks. Returning `false` rejects
    /// the request with 403.
    pub fn on_connect<F>(mut self, callback: F) -> Self
    where
        F: Fn(&UpgradeRequest) -> bool + Send + Sync + 'static,
    {
        self.on_connect = Some(Arc::new(callback));
        self
    }

    /// Replaces the source of device tags and one-time passes.
    pub fn token_source<T: TokenSource>(mut self, tokens: T) -> Self {
        self.tokens = Arc::new(tokens);
        self
    }

    /// Validates the config, binds the listener and assembles the server.
    pub async fn build<S, R>(self, store: S, router: R) -> Result<WarrenServer<S, R>, WarrenError>
    where
        S: SessionStore<WebSocketConnection>,
        R: ActionRouter<WebSocketConnection, S::User>,
    {
        self.config.validate()?;

        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let counter = Arc::new(ConnectionCounter::new(self.config.max_connections));
        let mut admission = Admission::new(self.config.origin_policy(), Arc::clone(&counter));
        if let Some(callback) = self.on_connect {
            admission = admission.with_connect_callback(callback);
        }

        Ok(WarrenServer {
            transport,
            admission: Arc::new(admission),
            state: Arc::new(ServerState {
                config: self.config,
                store,
                router,
                tokens: self.tokens,
                codec: JsonCodec,
            }),
        })
    }
}

impl Default for WarrenServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Warren server.
pub struct WarrenServer<S, R> {
    transport: WebSocketTransport,
    admission: Arc<Admission>,
    state: Arc<ServerState<S, R>>,
}

impl WarrenServer<(), ()> {
    /// Creates a new server builder.
    pub fn builder() -> WarrenServerBuilder {
        WarrenServerBuilder::new()
    }
}

impl<S, R> WarrenServer<S, R>
where
    S: SessionStore<WebSocketConnection>,
    R: ActionRouter<WebSocketConnection, S::User>,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The admission counter, shared with every connection worker.
    pub fn counter(&self) -> Arc<ConnectionCounter> {
        Arc::clone(self.admission.counter())
    }

    /// Number of currently admitted connections.
    pub fn clients_connected(&self) -> usize {
        self.admission.counter().current()
    }

    /// The configuration the server was built with.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Runs the accept loop until the process exits.
    ///
    /// Each TCP connection is upgraded on its own task, so a slow client
    /// can't hold up the listener.
    pub async fn run(self) -> Result<(), WarrenError> {
        tracing::info!(
            addr = ?self.transport.local_addr().ok(),
            max_connections = self.state.config.max_connections,
            remember_me = self.state.config.remember_me,
            "Warren server running"
        );

        loop {
            let incoming = match self.transport.accept().await {
                Ok(incoming) => incoming,
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                    continue;
                }
            };

            let admission = Arc::clone(&self.admission);
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                let addr = incoming.peer_addr();
                match incoming.upgrade(&admission).await {
                    Ok((conn, slot)) => {
                        tracing::info!(
                            conn_id = %conn.id(),
                            %addr,
                            clients = admission.counter().current(),
                            "client admitted"
                        );
                        handle_connection(conn, slot, state).await;
                    }
                    Err(e) => {
                        tracing::debug!(%addr, status = e.status_code(), error = %e, "connection rejected");
                    }
                }
            });
        }
    }
}
