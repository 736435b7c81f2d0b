//! Observability: structured logging and Prometheus metrics.

mod logging;
mod metrics;

pub use logging::init_logging;
pub use metrics::{
    MetricsConfig, MetricsError, init_metrics, record_action_outcome, record_circuit_breaker_trip,
    record_cycle, record_execution, record_persistence_failure, record_policy_violation,
    record_price_source, set_kill_switch_active, set_risk_score,
};
