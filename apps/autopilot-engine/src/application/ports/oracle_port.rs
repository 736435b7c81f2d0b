//! Decision Oracle Port (Driven Port)
//!
//! The reasoning service that turns a cycle's context into a decision.
//! The oracle guarantees that a confidence below 0.6 comes with no actions;
//! the core consumes decisions as returned.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::decision::{AiDecision, DecisionRequest};

/// Oracle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// Transport failure or non-success status.
    #[error("oracle request failed: {0}")]
    Request(String),

    /// Request exceeded its deadline.
    #[error("oracle request timed out after {seconds}s")]
    Timeout {
        /// Deadline in seconds.
        seconds: u64,
    },

    /// Response could not be turned into a decision.
    #[error("invalid oracle response: {0}")]
    InvalidResponse(String),
}

/// Port for requesting decisions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DecisionOraclePort: Send + Sync {
    /// Request a decision for `request`.
    async fn request_decision(&self, request: &DecisionRequest) -> Result<AiDecision, OracleError>;
}
