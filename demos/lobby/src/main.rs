use serde::Deserialize;
use serde_json::{Value, json};
use warren::prelude::*;
use warren::{OsTokenSource, TokenSource};

// ---------------------------------------------------------------------------
// Action params
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct Credentials {
    #[serde(rename = "n")]
    name: String,
    /// Remember this device.
    #[serde(rename = "r", default)]
    remember: bool,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// A minimal lobby: sign up or log in by name, ask who you are, log out.
struct Lobby {
    store: MemorySessionStore,
    tokens: OsTokenSource,
}

impl Lobby {
    async fn enter<C: Connection>(
        &self,
        params: Value,
        client: &ClientHandle<C, MemoryUser>,
        device: &mut DeviceState,
        sign_up: bool,
    ) -> ActionReply {
        let kind = if sign_up { error_codes::SIGN_UP } else { error_codes::LOGIN };
        let Ok(creds) = serde_json::from_value::<Credentials>(params) else {
            return ActionReply::err(ErrorRecord::new("Expected {n, r}.", error_codes::INCORRECT_FORMAT));
        };
        if client.is_logged_in().await {
            return ActionReply::err(ErrorRecord::new("Already logged in.", error_codes::LOGGED_IN));
        }

        let user = if sign_up {
            match self.store.register_user(&creds.name).await {
                Ok(user) => user,
                Err(e) => return ActionReply::err(ErrorRecord::new(e.to_string(), kind)),
            }
        } else {
            match self.store.find_user(&creds.name).await {
                Some(user) => user,
                None => return ActionReply::err(ErrorRecord::new("Unknown user.", kind)),
            }
        };

        let signed_in = match self.store.log_in(user.id).await {
            Ok(signed_in) => signed_in,
            Err(e) => return ActionReply::err(ErrorRecord::new(e.to_string(), kind)),
        };
        let previous = client.lock().await.bind(signed_in);
        if let Some(previous) = previous {
            SessionStore::<C>::logout(&self.store, previous).await;
        }

        let mut value = json!({"id": user.id, "n": user.name});
        if creds.remember {
            if let Some(pass) = self.remember_device(device, user.id).await {
                value["sp"] = json!(pass);
            }
        }
        ActionReply::ok(value)
    }

    /// Files a credential for the device's tag, if it has one.
    async fn remember_device(&self, device: &mut DeviceState, user_id: u64) -> Option<String> {
        let tag = device.tag.clone()?;
        let pass = match self.tokens.generate() {
            Ok(pass) => pass,
            Err(e) => {
                tracing::warn!(error = %e, "could not generate device pass");
                return None;
            }
        };
        if let Err(e) = self.store.file_credential(&tag, &pass, user_id).await {
            tracing::warn!(error = %e, "could not file device credential");
            return None;
        }
        device.pass = Some(pass.clone());
        device.user_id = Some(user_id);
        Some(pass)
    }
}

impl<C: Connection> ActionRouter<C, MemoryUser> for Lobby {
    async fn dispatch(
        &self,
        action: ClientAction,
        client: &ClientHandle<C, MemoryUser>,
        device: &mut DeviceState,
    ) -> Option<ActionReply> {
        let reply = match action.action.as_str() {
            "signup" => self.enter(action.params, client, device, true).await,
            "login" => self.enter(action.params, client, device, false).await,
            "whoami" => match client.lock().await.user() {
                Some(user) => ActionReply::ok(json!({"id": user.id, "n": user.name})),
                None => ActionReply::err(ErrorRecord::new("Not logged in.", error_codes::NOT_LOGGED_IN)),
            },
            "logout" => {
                let signed_in = client.lock().await.take();
                match signed_in {
                    Some(signed_in) => {
                        SessionStore::<C>::logout(&self.store, signed_in).await;
                        ActionReply::ok(Value::Null)
                    }
                    None => ActionReply::err(ErrorRecord::new("Not logged in.", error_codes::NOT_LOGGED_IN)),
                }
            }
            "echo" => ActionReply::ok(action.params),
            _ => ActionReply::err(ErrorRecord::new("Invalid action.", error_codes::INVALID_ACTION)),
        };
        Some(reply)
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Usage: lobby [config.json]
    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig {
            remember_me: true,
            ..ServerConfig::default()
        },
    };
    let bind = format!("0.0.0.0:{}", config.port);

    let store = MemorySessionStore::new();
    let server = WarrenServerBuilder::new()
        .bind(&bind)
        .config(config)
        .build(
            store.clone(),
            Lobby {
                store,
                tokens: OsTokenSource,
            },
        )
        .await?;

    server.run().await?;
    Ok(())
}
