//! Server configuration.
//!
//! Set once before the server starts accepting; nothing here changes while
//! connections are live.

use std::path::Path;

use serde::{Deserialize, Serialize};
use warren_transport::OriginPolicy;

use crate::WarrenError;

/// Settings consumed by admission and the connection workers.
///
/// Every field has a default, so a config file only needs the values it
/// changes:
///
/// ```json
/// { "origin_only": true, "host_name": "https://play.example.com", "max_connections": 500 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Reject upgrade requests whose `Origin` isn't the host or alias.
    pub origin_only: bool,

    /// Primary host, as browsers send it in the `Origin` header.
    pub host_name: String,

    /// Secondary accepted host. Empty disables the alias.
    pub host_alias: String,

    /// Port appended to origins before comparison.
    pub port: u16,

    /// Maximum simultaneous connections. 0 means unlimited.
    pub max_connections: usize,

    /// Run the remember-me device handshake before the action loop.
    pub remember_me: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            origin_only: false,
            host_name: "localhost".to_string(),
            host_alias: String::new(),
            port: 8080,
            max_connections: 0,
            remember_me: false,
        }
    }
}

impl ServerConfig {
    /// Loads and validates a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WarrenError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| WarrenError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| WarrenError::Config(format!("failed to parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks settings that are individually valid but don't fit together.
    pub fn validate(&self) -> Result<(), WarrenError> {
        if self.origin_only && self.host_name.is_empty() {
            return Err(WarrenError::Config(
                "origin_only requires a host_name".into(),
            ));
        }
        Ok(())
    }

    /// The origin rules admission enforces.
    pub fn origin_policy(&self) -> OriginPolicy {
        OriginPolicy {
            origin_only: self.origin_only,
            host_name: self.host_name.clone(),
            host_alias: self.host_alias.clone(),
            port: self.port,
        }
    }
}
