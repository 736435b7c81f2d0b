//! Execution request and result.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::error::ExecutionError;
use crate::domain::decision::ActionRequest;
use crate::domain::shared::{DecisionId, OrderId};

/// An action handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// The action to execute.
    pub action: ActionRequest,
    /// Decision the action came from, if any.
    pub decision_id: Option<DecisionId>,
}

impl ExecutionRequest {
    /// Request for a stand-alone action.
    #[must_use]
    pub const fn new(action: ActionRequest) -> Self {
        Self {
            action,
            decision_id: None,
        }
    }

    /// Attach the originating decision.
    #[must_use]
    pub fn with_decision(mut self, decision_id: DecisionId) -> Self {
        self.decision_id = Some(decision_id);
        self
    }
}

/// Outcome of one execution attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// Whether an order was placed.
    pub success: bool,
    /// Exchange order ID.
    pub order_id: Option<OrderId>,
    /// When the attempt finished.
    pub executed_at: DateTime<Utc>,
    /// Price used for sizing.
    pub actual_price: Option<Decimal>,
    /// Base quantity ordered.
    pub quantity: Option<Decimal>,
    /// Quote value of the order.
    pub actual_amount: Option<Decimal>,
    /// Slippage against the expected price, in percent.
    pub slippage: Option<Decimal>,
    /// Failure cause.
    pub error: Option<ExecutionError>,
}

impl ExecutionResult {
    /// A placed order.
    #[must_use]
    pub fn filled(order_id: OrderId, price: Decimal, quantity: Decimal) -> Self {
        Self {
            success: true,
            order_id: Some(order_id),
            executed_at: Utc::now(),
            actual_price: Some(price),
            quantity: Some(quantity),
            actual_amount: Some(quantity * price),
            slippage: None,
            error: None,
        }
    }

    /// A failed or blocked attempt.
    #[must_use]
    pub fn failed(error: ExecutionError) -> Self {
        Self {
            success: false,
            order_id: None,
            executed_at: Utc::now(),
            actual_price: None,
            quantity: None,
            actual_amount: None,
            slippage: None,
            error: Some(error),
        }
    }

    /// Attach the measured slippage.
    #[must_use]
    pub fn with_slippage(mut self, slippage: Option<Decimal>) -> Self {
        self.slippage = slippage;
        self
    }

    /// Convert into a `Result`, keeping the error on failure.
    pub fn into_result(self) -> Result<Self, ExecutionError> {
        match self.error.clone() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}
