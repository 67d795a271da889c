//! Admission control: the gate between an HTTP upgrade request and a live
//! connection.
//!
//! Checks run in a fixed order, and only the first failing check decides
//! the rejection:
//!
//! 1. **Origin**: when enabled, the request's `Origin` must match the
//!    configured host name or alias (403).
//! 2. **Capacity**: a slot is reserved on the [`ConnectionCounter`] (413).
//! 3. **Connect callback**: an optional user hook can veto the request
//!    (403). The reserved slot is released on veto.
//!
//! The upgrade itself happens afterwards in
//! [`Incoming::upgrade`](crate::Incoming::upgrade).

use std::fmt;
use std::sync::Arc;

use tokio_tungstenite::tungstenite::handshake::server::Request;

use crate::{AdmissionError, ConnectionCounter, ConnectionSlot};

/// Hook invoked with the upgrade request after a slot is reserved.
/// Returning `false` refuses the connection.
pub type ConnectCallback = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// Which browser origins may open a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginPolicy {
    /// When `false`, every origin (including none) is accepted.
    pub origin_only: bool,
    /// Primary host, written the way browsers send it in `Origin`
    /// (e.g. `https://play.example.com`).
    pub host_name: String,
    /// Optional second accepted host. Empty means no alias.
    pub host_alias: String,
    /// Port appended to both sides of the comparison.
    pub port: u16,
}

impl OriginPolicy {
    /// The full set of `"{host}:{port}"` strings an origin may match.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut allowed = vec![format!("{}:{}", self.host_name, self.port)];
        if !self.host_alias.is_empty() {
            allowed.push(format!("{}:{}", self.host_alias, self.port));
        }
        allowed
    }

    /// Returns `true` if a request carrying `origin` may connect.
    pub fn permits(&self, origin: Option<&str>) -> bool {
        if !self.origin_only {
            return true;
        }
        let Some(origin) = origin else {
            return false;
        };
        let candidate = format!("{origin}:{}", self.port);
        self.allowed_origins().iter().any(|a| *a == candidate)
    }
}

/// The admission gate shared by every accept.
pub struct Admission {
    policy: OriginPolicy,
    counter: Arc<ConnectionCounter>,
    on_connect: Option<ConnectCallback>,
}

impl Admission {
    /// Creates a gate over the given origin policy and counter.
    pub fn new(policy: OriginPolicy, counter: Arc<ConnectionCounter>) -> Self {
        Self {
            policy,
            counter,
            on_connect: None,
        }
    }

    /// Installs the connect callback.
    pub fn with_connect_callback(mut self, callback: ConnectCallback) -> Self {
        self.on_connect = Some(callback);
        self
    }

    /// The counter slots are reserved on.
    pub fn counter(&self) -> &Arc<ConnectionCounter> {
        &self.counter
    }

    /// Runs the origin, capacity, and callback checks for one request.
    ///
    /// On success the caller owns the reserved slot. Every error path
    /// leaves the counter exactly as it found it.
    pub fn admit(&self, request: &Request) -> Result<ConnectionSlot, AdmissionError> {
        let origin = request
            .headers()
            .get("origin")
            .and_then(|v| v.to_str().ok());
        if !self.policy.permits(origin) {
            return Err(AdmissionError::OriginNotAllowed(origin.map(str::to_string)));
        }

        let slot = self
            .counter
            .try_admit()
            .ok_or(AdmissionError::ServerFull(self.counter.max()))?;

        if let Some(callback) = &self.on_connect {
            if !callback(request) {
                // `slot` drops here, releasing the reservation.
                return Err(AdmissionError::Refused);
            }
        }

        Ok(slot)
    }
}

impl fmt::Debug for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Admission")
            .field("policy", &self.policy)
            .field("counter", &self.counter)
            .field("on_connect", &self.on_connect.is_some())
            .finish()
    }
}
