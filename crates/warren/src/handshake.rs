//! Rotating-credential ("remember me") handshake.
//!
//! Runs once per connection, before the action loop, when
//! [`ServerConfig::remember_me`](crate::ServerConfig::remember_me) is set.
//!
//! ```text
//! server: {"tr":null}
//!   ├─ "0" no tag      → {"ts":tag}           (loop)
//!   ├─ "1" tag only    → {"anf":null}         → unauthenticated
//!   ├─ "2" credential  → {"sp":newPass}       (loop)
//!   └─ "3" confirm     → store.auto_log_in
//!          ├─ ok       → user bound           → authenticated
//!          └─ err      → {"af":{dt,e}}        → unauthenticated
//! ```
//!
//! Anything else the client sends while the handshake is waiting ends the
//! connection.

use warren_protocol::{
    AutoLoginFailure, ClientAction, Codec, HandshakeAction, ServerMessage,
};
use warren_session::{AutoLogin, ClientHandle, DeviceState, SessionStore, TokenSource};
use warren_transport::Connection;

use crate::WarrenError;
use crate::handler::{read_action, send_message};

/// How the handshake left the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandshakeOutcome {
    /// A user is bound to the connection.
    Authenticated,
    /// The client continues as a guest.
    Unauthenticated,
}

/// State for one handshake run.
pub(crate) struct Handshake<'a, C, S, K>
where
    C: Connection,
    S: SessionStore<C>,
{
    client: &'a ClientHandle<C, S::User>,
    device: &'a mut DeviceState,
    store: &'a S,
    tokens: &'a dyn TokenSource,
    codec: &'a K,
    /// The pass presented with "has credential", kept until confirm.
    presented_pass: Option<String>,
}

impl<'a, C, S, K> Handshake<'a, C, S, K>
where
    C: Connection,
    S: SessionStore<C>,
    K: Codec,
{
    pub(crate) fn new(
        client: &'a ClientHandle<C, S::User>,
        device: &'a mut DeviceState,
        store: &'a S,
        tokens: &'a dyn TokenSource,
        codec: &'a K,
    ) -> Self {
        Self {
            client,
            device,
            store,
            tokens,
            codec,
            presented_pass: None,
        }
    }

    /// Drives the handshake to completion.
    ///
    /// An `Err` means the connection must be torn down; no user is bound
    /// in that case.
    pub(crate) async fn run(mut self) -> Result<HandshakeOutcome, WarrenError> {
        self.send(&ServerMessage::RequestDeviceTag(())).await?;

        loop {
            let action = read_action(self.conn(), self.codec).await?;
            let step = HandshakeAction::parse(&action.action).ok_or_else(|| {
                WarrenError::violation(format!("unexpected action {:?} during handshake", action.action))
            })?;

            match step {
                HandshakeAction::NoTag => self.issue_tag().await?,
                HandshakeAction::HasTag => return self.accept_tag(&action).await,
                HandshakeAction::HasCredential => self.offer_pass(&action).await?,
                HandshakeAction::Confirm => return self.confirm().await,
            }
        }
    }

    async fn issue_tag(&mut self) -> Result<(), WarrenError> {
        let tag = self.tokens.generate()?;
        self.device.tag = Some(tag.clone());
        self.send(&ServerMessage::SetDeviceTag(tag)).await
    }

    async fn accept_tag(&mut self, action: &ClientAction) -> Result<HandshakeOutcome, WarrenError> {
        let presented = action.device_tag_param()?;
        if presented.is_empty() {
            return Err(WarrenError::violation("empty device tag"));
        }
        // Only the tag this session issued (or recorded) may be echoed back.
        if let Some(known) = self.device.tag.as_deref() {
            if known != presented {
                return Err(WarrenError::violation("device tag does not match the issued tag"));
            }
        }
        self.device.tag = Some(presented.to_string());

        self.send(&ServerMessage::AutoLoginNotFiled(())).await?;
        tracing::debug!(conn_id = %self.client.id(), "no credential filed for device");
        Ok(HandshakeOutcome::Unauthenticated)
    }

    async fn offer_pass(&mut self, action: &ClientAction) -> Result<(), WarrenError> {
        let credential = action.credential_params()?;
        if credential.device_tag.is_empty() || credential.pass.is_empty() {
            return Err(WarrenError::violation("incomplete device credential"));
        }
        let user_id = credential.user_id()?;

        let new_pass = self.tokens.generate()?;
        self.device.tag = Some(credential.device_tag);
        self.device.user_id = Some(user_id);
        self.device.pass = Some(new_pass.clone());
        self.presented_pass = Some(credential.pass);

        self.send(&ServerMessage::SetAutoLoginPass(new_pass)).await
    }

    async fn confirm(&mut self) -> Result<HandshakeOutcome, WarrenError> {
        let (Some(device_tag), Some(old_pass), Some(new_pass), Some(user_id)) = (
            self.device.tag.clone(),
            self.presented_pass.take(),
            self.device.pass.clone(),
            self.device.user_id,
        ) else {
            return Err(WarrenError::violation("confirm before a credential was presented"));
        };

        let request = AutoLogin {
            device_tag,
            old_pass,
            new_pass,
            user_id,
        };

        match self.store.auto_log_in(&request, self.client).await {
            Ok(signed_in) => {
                let session_id = signed_in.session_id.clone();
                let previous = self.client.lock().await.bind(signed_in);
                if let Some(previous) = previous {
                    // A fresh connection has nobody bound; keep the store
                    // consistent anyway.
                    self.store.logout(previous).await;
                }
                tracing::info!(conn_id = %self.client.id(), user_id, %session_id, "auto-login succeeded");
                Ok(HandshakeOutcome::Authenticated)
            }
            Err(error) => {
                let tag = self.tokens.generate()?;
                self.device.reset(tag.clone());
                tracing::debug!(conn_id = %self.client.id(), user_id, %error, "auto-login refused");
                self.send(&ServerMessage::AutoLoginFailed(AutoLoginFailure {
                    device_tag: tag,
                    error,
                }))
                .await?;
                Ok(HandshakeOutcome::Unauthenticated)
            }
        }
    }

    fn conn(&self) -> &'a C {
        self.client.connection()
    }

    async fn send(&self, message: &ServerMessage) -> Result<(), WarrenError> {
        send_message(self.conn(), self.codec, message).await
    }
}
