//! Storage Port (Driven Port)
//!
//! Persistence the core reads portfolio state from and appends history to.
//! Schema and queries belong to the adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::decision::{ActionKind, AiDecision};
use crate::domain::policy::{CircuitBreakerEvent, Violation};
use crate::domain::portfolio::{Balance, TradeRecord};
use crate::domain::shared::{DecisionId, Symbol, ViolationRecordId};

/// Storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Backend unreachable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Query or write failed.
    #[error("storage query failed: {0}")]
    Query(String),
}

/// A persisted policy violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyViolationRecord {
    /// Record identifier.
    pub id: ViolationRecordId,
    /// Decision the action came from, when known.
    pub decision_id: Option<DecisionId>,
    /// Kind of the rejected action.
    pub action_kind: ActionKind,
    /// Symbol of the rejected action.
    pub symbol: Symbol,
    /// The violation.
    pub violation: Violation,
    /// When it was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl PolicyViolationRecord {
    /// Record `violation` for an action.
    #[must_use]
    pub fn new(
        decision_id: Option<DecisionId>,
        action_kind: ActionKind,
        symbol: Symbol,
        violation: Violation,
    ) -> Self {
        Self {
            id: ViolationRecordId::generate(),
            decision_id,
            action_kind,
            symbol,
            violation,
            recorded_at: Utc::now(),
        }
    }
}

/// Port for persistence.
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// All tracked balances.
    async fn balances(&self) -> Result<Vec<Balance>, StorageError>;

    /// Trades executed at or after `since`.
    async fn recent_trades(&self, since: DateTime<Utc>) -> Result<Vec<TradeRecord>, StorageError>;

    /// Symbols enabled for trading.
    async fn enabled_assets(&self) -> Result<Vec<Symbol>, StorageError>;

    /// Append an oracle decision.
    async fn save_decision(&self, decision: &AiDecision) -> Result<(), StorageError>;

    /// Append a policy violation.
    async fn save_policy_violation(&self, record: &PolicyViolationRecord)
    -> Result<(), StorageError>;

    /// Insert a circuit breaker event, or update it by id (on resume).
    async fn save_circuit_breaker_event(
        &self,
        event: &CircuitBreakerEvent,
    ) -> Result<(), StorageError>;
}
