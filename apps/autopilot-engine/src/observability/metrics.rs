//! Prometheus metrics for the autopilot engine.
//!
//! Thin wrappers over the `metrics` facade so metric names and labels live
//! in one place. Without an installed recorder every call is a no-op.
//!
//! # Example
//!
//! ```ignore
//! use autopilot_engine::observability::{init_metrics, MetricsConfig};
//!
//! let config = MetricsConfig::with_addr("127.0.0.1:9090".parse()?);
//! init_metrics(&config)?;
//!
//! record_cycle("completed", 4.2);
//! ```

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for cycle durations (in seconds).
    pub cycle_buckets: Vec<f64>,
}

impl MetricsConfig {
    /// Create a metrics configuration listening on `addr`.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            // Cycles take seconds to a couple of minutes (oracle round trip).
            cycle_buckets: vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0],
        }
    }
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

/// Install the Prometheus exporter and its HTTP listener.
///
/// # Errors
///
/// Returns an error if the exporter cannot be configured or installed
/// (e.g., port already in use, recorder already set).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.cycle_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(addr = %config.listen_addr, "Prometheus metrics exporter started");
    Ok(())
}

// ============================================================================
// Decision Cycle Metrics
// ============================================================================

/// Record a finished decision cycle.
///
/// # Arguments
///
/// * `status` - `completed`, `skipped_circuit_breaker`, `aborted` or `panicked`
/// * `duration_seconds` - Wall time of the cycle
pub fn record_cycle(status: &str, duration_seconds: f64) {
    counter!("autopilot_cycles_total", "status" => status.to_string()).increment(1);
    histogram!("autopilot_cycle_duration_seconds").record(duration_seconds);
}

/// Record what happened to one proposed action.
///
/// `outcome` is one of `executed`, `failed`, `rejected`, `shadow`.
pub fn record_action_outcome(outcome: &str) {
    counter!("autopilot_actions_total", "outcome" => outcome.to_string()).increment(1);
}

// ============================================================================
// Policy Metrics
// ============================================================================

/// Record a policy violation.
pub fn record_policy_violation(kind: &str, severity: &str) {
    counter!(
        "autopilot_policy_violations_total",
        "kind" => kind.to_string(),
        "severity" => severity.to_string()
    )
    .increment(1);
}

/// Record a circuit breaker trip.
pub fn record_circuit_breaker_trip(kind: &str) {
    counter!("autopilot_circuit_breaker_trips_total", "kind" => kind.to_string()).increment(1);
}

/// Update the composite risk score gauge.
pub fn set_risk_score(score: f64) {
    gauge!("autopilot_risk_score").set(score);
}

// ============================================================================
// Execution Metrics
// ============================================================================

/// Record where a price came from.
///
/// `source` is one of `primary`, `fallback`, `cache`, `unavailable`.
pub fn record_price_source(source: &str) {
    counter!("autopilot_price_source_total", "source" => source.to_string()).increment(1);
}

/// Record an execution attempt.
///
/// # Arguments
///
/// * `kind` - Action kind (e.g., "buy", "sell")
/// * `status` - `success`, `blocked` (safety gate) or `failed`
pub fn record_execution(kind: &str, status: &str) {
    counter!(
        "autopilot_executions_total",
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Update the kill switch gauge (1 = active).
pub fn set_kill_switch_active(active: bool) {
    gauge!("autopilot_kill_switch_active").set(if active { 1.0 } else { 0.0 });
}

/// Record a best-effort write that failed.
pub fn record_persistence_failure(record: &str) {
    counter!("autopilot_persistence_failures_total", "record" => record.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_with_addr_sets_port() {
        let addr: SocketAddr = "127.0.0.1:9464".parse().unwrap();
        let config = MetricsConfig::with_addr(addr);
        assert_eq!(config.listen_addr.port(), 9464);
        assert!(config.cycle_buckets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        record_cycle("completed", 1.5);
        record_action_outcome("shadow");
        record_policy_violation("order_size", "critical");
        record_circuit_breaker_trip("drawdown");
        set_risk_score(0.42);
        record_price_source("fallback");
        record_execution("buy", "blocked");
        set_kill_switch_active(true);
        record_persistence_failure("decision");
    }
}
