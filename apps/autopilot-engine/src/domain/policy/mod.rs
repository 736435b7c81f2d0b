//! Policy Bounded Context
//!
//! Validates proposed actions against the active risk profile.
//!
//! # Key Concepts
//!
//! - **Policy**: immutable risk profile (order, position, exposure and
//!   daily-loss limits, trade rate, slippage threshold, breaker rules)
//! - **Risk Metrics**: derived fresh from balances and trades on every pass
//! - **Circuit Breakers**: cycle-level pauses evaluated before any other check
//! - **Violations**: warnings are recorded, critical ones block

pub mod circuit_breaker;
pub mod errors;
pub mod metrics;
pub mod profile;
pub mod rules;
pub mod violation;

pub use circuit_breaker::{
    BreakerAction, CircuitBreakerEvent, CircuitBreakerKind, CircuitBreakerRule,
    evaluate_circuit_breakers,
};
pub use errors::PolicyError;
pub use metrics::{RiskMetrics, risk_score, trailing_window};
pub use profile::{Policy, PolicyLimits};
pub use rules::PolicyRules;
pub use violation::{Severity, ValidationResult, Violation, ViolationKind};
