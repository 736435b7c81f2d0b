//! Logging and metrics settings.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// `observability` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Prometheus exporter.
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level for `autopilot_engine` targets when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `json` for one object per line, `pretty` for terminals.
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Attach the enclosing spans (e.g. `decision_cycle`) to JSON lines.
    #[serde(default = "default_include_spans")]
    pub include_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            include_spans: default_include_spans(),
        }
    }
}

impl LoggingConfig {
    /// Whether JSON output is selected.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Listener address, e.g. `0.0.0.0:9090`. Empty disables the exporter.
    #[serde(default)]
    pub listen_addr: String,
}

impl MetricsSettings {
    /// Exporter address, `None` when the exporter is disabled.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `listen_addr` is set but is
    /// not a socket address.
    pub fn socket_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        let raw = self.listen_addr.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(|_| {
            ConfigError::ValidationError(format!(
                "observability.metrics.listen_addr '{raw}' is not a socket address"
            ))
        })
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

const fn default_include_spans() -> bool {
    true
}
