//! Action routing: the application's half of the action loop.

use std::future::Future;

use serde_json::Value;
use warren_protocol::{ClientAction, Codec, ErrorRecord, ServerResponse};
use warren_session::{ClientHandle, DeviceState};
use warren_transport::Connection;

use crate::WarrenError;
use crate::handler::{read_action, send_message};

/// What a handled action sends back to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionReply {
    pub value: Value,
    pub error: ErrorRecord,
}

impl ActionReply {
    /// A successful reply carrying `value`.
    pub fn ok(value: Value) -> Self {
        Self {
            value,
            error: ErrorRecord::none(),
        }
    }

    /// A failed reply with no value.
    pub fn err(error: ErrorRecord) -> Self {
        Self {
            value: Value::Null,
            error,
        }
    }
}

/// Handles actions once the handshake (if any) is over.
///
/// Implement this trait to give the server its application behavior.
///
/// # Example
///
/// ```rust
/// use warren::prelude::*;
///
/// struct Ping;
///
/// impl<C: Connection, U: Send + Sync + 'static> ActionRouter<C, U> for Ping {
///     async fn dispatch(
///         &self,
///         action: ClientAction,
///         _client: &ClientHandle<C, U>,
///         _device: &mut DeviceState,
///     ) -> Option<ActionReply> {
///         (action.action == "ping").then(|| ActionReply::ok("pong".into()))
///     }
/// }
/// ```
pub trait ActionRouter<C: Connection, U>: Send + Sync + 'static {
    /// Handles one action.
    ///
    /// Returns `None` when the action gets no response. The client's mutex
    /// is not held during the call; lock it through `client` for any
    /// read or change of the bound user.
    fn dispatch(
        &self,
        action: ClientAction,
        client: &ClientHandle<C, U>,
        device: &mut DeviceState,
    ) -> impl Future<Output = Option<ActionReply>> + Send;
}

/// Reads and dispatches actions until the connection ends.
///
/// Only returns with the reason the connection is over.
pub(crate) async fn run<C, U, R, K>(
    client: &ClientHandle<C, U>,
    device: &mut DeviceState,
    router: &R,
    codec: &K,
) -> Result<(), WarrenError>
where
    C: Connection,
    U: Send + Sync + 'static,
    R: ActionRouter<C, U>,
    K: Codec,
{
    let conn: &C = client.connection();
    loop {
        let action = read_action(conn, codec).await?;
        let name = action.action.clone();
        tracing::trace!(conn_id = %client.id(), action = %name, "dispatching action");

        if let Some(reply) = router.dispatch(action, client, device).await {
            let response = ServerResponse::new(name, reply.value, reply.error);
            send_message(conn, codec, &response).await?;
        }
    }
}
