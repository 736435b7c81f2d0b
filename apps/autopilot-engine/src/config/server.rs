//! Control API listener settings.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// `server` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port of the control API (`/health`, `/api/v1/*`).
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Interface the control API listens on.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            bind_address: default_bind_address(),
        }
    }
}

impl ServerConfig {
    /// Listener address.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `bind_address` is not an IP
    /// address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_address.trim(), self.http_port)
            .parse()
            .map_err(|_| {
                ConfigError::ValidationError(format!(
                    "server.bind_address '{}' is not an IP address",
                    self.bind_address
                ))
            })
    }
}

const fn default_http_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}
