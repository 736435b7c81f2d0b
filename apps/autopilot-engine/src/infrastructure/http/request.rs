//! HTTP request DTOs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request to change the orchestrator mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetModeRequest {
    /// `shadow`, `pilot` or `full`.
    pub mode: String,
}

/// Request to engage the kill switch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivateKillSwitchRequest {
    /// Why execution is being stopped.
    #[serde(default)]
    pub reason: Option<String>,
}

impl ActivateKillSwitchRequest {
    /// Reason to record, with a default for empty requests.
    #[must_use]
    pub fn reason_or_default(&self) -> String {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or("manual activation via control API")
            .to_string()
    }
}

/// Request to change the slippage threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSlippageThresholdRequest {
    /// New threshold, in percent.
    pub threshold: Decimal,
}
