//! HTTP response DTOs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::decision::Mode;
use crate::domain::policy::{CircuitBreakerEvent, RiskMetrics};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status.
    pub status: String,
    /// Application version.
    pub version: String,
    /// Whether the run loop is active.
    pub orchestrator_running: bool,
    /// Whether the kill switch is engaged.
    pub kill_switch_active: bool,
}

/// Current mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeResponse {
    /// Mode in force for the next cycle.
    pub mode: Mode,
    /// Whether the run loop is active.
    pub running: bool,
}

/// Latest risk metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    /// Metrics from the most recent validation pass.
    pub metrics: RiskMetrics,
    /// Composite risk score in `[0, 1]`.
    pub risk_score: f64,
}

/// Circuit breaker state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerResponse {
    /// Whether cycles are currently paused.
    pub active: bool,
    /// Last tripped event still awaiting resume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<CircuitBreakerEvent>,
}

/// Slippage threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlippageThresholdResponse {
    /// Threshold in percent.
    pub threshold: Decimal,
}
