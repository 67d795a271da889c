//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

use crate::{Admission, AdmissionError, Connection, ConnectionId, ConnectionSlot, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// How long a close frame may take before the socket is dropped anyway.
const CLOSE_DEADLINE: Duration = Duration::from_secs(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// Listens for TCP connections that may become WebSocket connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for the next TCP connection.
    ///
    /// No HTTP has been read yet; call [`Incoming::upgrade`] (usually on a
    /// spawned task) to run admission and the WebSocket handshake.
    pub async fn accept(&self) -> Result<Incoming, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%addr, error = %e, "failed to set TCP_NODELAY");
        }
        Ok(Incoming { stream, addr })
    }
}

/// A TCP connection that has not yet been admitted or upgraded.
pub struct Incoming {
    stream: TcpStream,
    addr: SocketAddr,
}

impl Incoming {
    /// The remote address of the pending connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs admission inside the HTTP upgrade and completes the WebSocket
    /// handshake.
    ///
    /// Rejections are written as HTTP responses (403 or 413) by the
    /// handshake itself. On success the caller receives the live
    /// connection and the counter slot it holds.
    pub async fn upgrade(
        self,
        admission: &Admission,
    ) -> Result<(WebSocketConnection, ConnectionSlot), AdmissionError> {
        let addr = self.addr;
        let mut reserved: Option<ConnectionSlot> = None;
        let mut rejection: Option<AdmissionError> = None;

        let gate = |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
            match admission.admit(req) {
                Ok(slot) => {
                    reserved = Some(slot);
                    Ok(response)
                }
                Err(e) => {
                    let reply = error_response(&e);
                    rejection = Some(e);
                    Err(reply)
                }
            }
        };

        let upgraded = tokio_tungstenite::accept_hdr_async(self.stream, gate).await;

        match (upgraded, reserved) {
            (Ok(ws), Some(slot)) => {
                let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
                tracing::debug!(%id, %addr, "accepted WebSocket connection");
                let (sink, stream) = ws.split();
                Ok((
                    WebSocketConnection {
                        id,
                        addr,
                        sink: Mutex::new(sink),
                        stream: Mutex::new(stream),
                    },
                    slot,
                ))
            }
            (Ok(_), None) => Err(AdmissionError::UpgradeFailed(
                "handshake completed without admission".into(),
            )),
            // Any slot reserved before the failure is dropped with `reserved`.
            (Err(e), _) => Err(rejection.unwrap_or_else(|| AdmissionError::UpgradeFailed(e.to_string()))),
        }
    }
}

fn error_response(rejection: &AdmissionError) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(rejection.reason().to_string()));
    *response.status_mut() =
        StatusCode::from_u16(rejection.status_code()).unwrap_or(StatusCode::FORBIDDEN);
    response
}

/// A single WebSocket connection.
///
/// Reads and writes use separate locks so a task blocked in
/// [`recv`](Connection::recv) never holds up a push from another task.
pub struct WebSocketConnection {
    id: ConnectionId,
    addr: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    /// The remote address of this connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Connection for WebSocketConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        // JSON frames go out as text so browser clients get strings.
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::Text(text.to_owned().into()),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        match tokio::time::timeout(CLOSE_DEADLINE, sink.close()).await {
            Ok(result) => result.map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
            }),
            Err(_) => Err(TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "close frame deadline elapsed",
            ))),
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
