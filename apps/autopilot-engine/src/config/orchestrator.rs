//! Decision loop configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::services::OrchestratorConfig;
use crate::domain::shared::Symbol;

/// Orchestrator section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    /// Initial mode: `shadow`, `pilot` or `full`.
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Seconds between cycle starts.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Deadline, in seconds, of each oracle, context and persistence call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// How far back news is read, in seconds.
    #[serde(default = "default_news_window_secs")]
    pub news_window_secs: u64,
    /// Asset market conditions are read from.
    #[serde(default = "default_reference_symbol")]
    pub reference_symbol: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            interval_secs: default_interval_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            news_window_secs: default_news_window_secs(),
            reference_symbol: default_reference_symbol(),
        }
    }
}

impl OrchestratorSettings {
    /// Runtime configuration of the orchestrator.
    #[must_use]
    pub fn to_runtime(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            interval: Duration::from_secs(self.interval_secs),
            call_timeout: Duration::from_secs(self.call_timeout_secs),
            news_window: Duration::from_secs(self.news_window_secs),
            reference_symbol: Symbol::new(&self.reference_symbol),
        }
    }
}

fn default_mode() -> String {
    "shadow".to_string()
}

const fn default_interval_secs() -> u64 {
    15 * 60
}

const fn default_call_timeout_secs() -> u64 {
    60
}

const fn default_news_window_secs() -> u64 {
    60 * 60
}

fn default_reference_symbol() -> String {
    "BTCUSDT".to_string()
}
