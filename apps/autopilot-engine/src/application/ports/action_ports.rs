//! Action Ports
//!
//! Seams between the orchestrator and the components that judge and carry
//! out actions. The policy engine and executor implement these; tests
//! substitute spies.

use async_trait::async_trait;

use crate::domain::decision::ActionRequest;
use crate::domain::policy::{CircuitBreakerEvent, Policy, PolicyError, RiskMetrics, ValidationResult};
use crate::domain::shared::DecisionId;
use crate::execution::{ExecutionRequest, ExecutionResult};

/// Validates actions against the active policy.
#[async_trait]
pub trait ActionValidator: Send + Sync {
    /// Validate one action against freshly derived metrics.
    ///
    /// `decision_id` is attached to any violation the validator persists.
    async fn validate_action(
        &self,
        action: &ActionRequest,
        decision_id: Option<&DecisionId>,
    ) -> Result<ValidationResult, PolicyError>;

    /// Evaluate circuit breakers without validating any action.
    ///
    /// Persists nothing; the caller decides what a tripped breaker means.
    async fn check_circuit_breakers(&self) -> Result<Option<CircuitBreakerEvent>, PolicyError>;

    /// The active policy.
    fn policy(&self) -> &Policy;

    /// Metrics from the most recent validation pass.
    fn metrics(&self) -> RiskMetrics;
}

/// Executes approved actions.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Run one action through every gate and, if all pass, the exchange.
    async fn execute(&self, request: ExecutionRequest) -> ExecutionResult;
}
