//! Decision oracle client configuration.

use serde::{Deserialize, Serialize};

/// Oracle section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSettings {
    /// Decision endpoint URL. Empty runs without an oracle (every cycle aborts).
    #[serde(default)]
    pub endpoint: String,
    /// Bearer token sent with each request.
    #[serde(default)]
    pub api_key: String,
    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

const fn default_timeout_secs() -> u64 {
    45
}
