//! In-memory storage for testing and paper trading.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::application::ports::{PolicyViolationRecord, StorageError, StoragePort};
use crate::domain::decision::AiDecision;
use crate::domain::policy::CircuitBreakerEvent;
use crate::domain::portfolio::{Balance, TradeRecord};
use crate::domain::shared::Symbol;

#[derive(Debug, Default)]
struct Tables {
    balances: Vec<Balance>,
    trades: Vec<TradeRecord>,
    enabled_assets: Option<Vec<Symbol>>,
    decisions: Vec<AiDecision>,
    violations: Vec<PolicyViolationRecord>,
    breaker_events: Vec<CircuitBreakerEvent>,
}

/// In-memory implementation of `StoragePort`.
///
/// Suitable for testing and development. Not for production use.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryStorage {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all balances.
    pub fn set_balances(&self, balances: Vec<Balance>) {
        self.tables.write().balances = balances;
    }

    /// Insert or replace the balance of one symbol.
    pub fn upsert_balance(&self, balance: Balance) {
        let mut tables = self.tables.write();
        match tables.balances.iter_mut().find(|b| b.symbol == balance.symbol) {
            Some(existing) => *existing = balance,
            None => tables.balances.push(balance),
        }
    }

    /// Append a trade.
    pub fn record_trade(&self, trade: TradeRecord) {
        self.tables.write().trades.push(trade);
    }

    /// Restrict the enabled assets. Until set, every held symbol is enabled.
    pub fn set_enabled_assets(&self, symbols: Vec<Symbol>) {
        self.tables.write().enabled_assets = Some(symbols);
    }

    /// Make every call fail with `StorageError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Stored decisions, oldest first.
    #[must_use]
    pub fn decisions(&self) -> Vec<AiDecision> {
        self.tables.read().decisions.clone()
    }

    /// Stored policy violations, oldest first.
    #[must_use]
    pub fn violations(&self) -> Vec<PolicyViolationRecord> {
        self.tables.read().violations.clone()
    }

    /// Stored circuit breaker events, in trip order.
    #[must_use]
    pub fn circuit_breaker_events(&self) -> Vec<CircuitBreakerEvent> {
        self.tables.read().breaker_events.clone()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("in-memory store disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl StoragePort for InMemoryStorage {
    async fn balances(&self) -> Result<Vec<Balance>, StorageError> {
        self.check_available()?;
        Ok(self.tables.read().balances.clone())
    }

    async fn recent_trades(&self, since: DateTime<Utc>) -> Result<Vec<TradeRecord>, StorageError> {
        self.check_available()?;
        Ok(self
            .tables
            .read()
            .trades
            .iter()
            .filter(|t| t.executed_at >= since)
            .cloned()
            .collect())
    }

    async fn enabled_assets(&self) -> Result<Vec<Symbol>, StorageError> {
        self.check_available()?;
        let tables = self.tables.read();
        Ok(tables.enabled_assets.clone().unwrap_or_else(|| {
            tables.balances.iter().map(|b| b.symbol.clone()).collect()
        }))
    }

    async fn save_decision(&self, decision: &AiDecision) -> Result<(), StorageError> {
        self.check_available()?;
        self.tables.write().decisions.push(decision.clone());
        Ok(())
    }

    async fn save_policy_violation(
        &self,
        record: &PolicyViolationRecord,
    ) -> Result<(), StorageError> {
        self.check_available()?;
        self.tables.write().violations.push(record.clone());
        Ok(())
    }

    async fn save_circuit_breaker_event(
        &self,
        event: &CircuitBreakerEvent,
    ) -> Result<(), StorageError> {
        self.check_available()?;
        let mut tables = self.tables.write();
        match tables.breaker_events.iter_mut().find(|e| e.id == event.id) {
            Some(existing) => *existing = event.clone(),
            None => tables.breaker_events.push(event.clone()),
        }
        Ok(())
    }
}
