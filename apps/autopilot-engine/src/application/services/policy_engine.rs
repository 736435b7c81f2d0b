//! Policy Engine Service
//!
//! Validates proposed actions against the loaded [`Policy`]. Each call
//! derives fresh [`RiskMetrics`] from storage, evaluates circuit breakers
//! first and short-circuits if one trips, then runs the per-kind and global
//! rules. Critical violations are persisted best-effort.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::application::ports::{ActionValidator, MarketDataPort, PolicyViolationRecord, StoragePort};
use crate::domain::decision::ActionRequest;
use crate::domain::policy::{
    CircuitBreakerEvent, Policy, PolicyError, PolicyRules, RiskMetrics, ValidationResult,
    evaluate_circuit_breakers, risk_score, trailing_window,
};
use crate::domain::shared::DecisionId;
use crate::observability;

/// Risk policy engine.
pub struct PolicyEngine<S: StoragePort, M: MarketDataPort> {
    policy: Policy,
    storage: Arc<S>,
    market_data: Arc<M>,
    /// Metrics of the last validation pass, for display only.
    last_metrics: RwLock<RiskMetrics>,
}

impl<S: StoragePort, M: MarketDataPort> PolicyEngine<S, M> {
    /// Create an engine for `policy`.
    #[must_use]
    pub fn new(policy: Policy, storage: Arc<S>, market_data: Arc<M>) -> Self {
        tracing::info!(
            profile = policy.profile_name(),
            max_order_usdt = %policy.max_order_usdt(),
            max_total_exposure = %policy.max_total_exposure(),
            breakers = policy.circuit_breakers().len(),
            "Policy loaded"
        );
        Self {
            policy,
            storage,
            market_data,
            last_metrics: RwLock::new(RiskMetrics::empty(Utc::now())),
        }
    }

    /// Derive metrics from current balances, trailing trades and volatility.
    ///
    /// Storage failures are fatal to the pass. Market data failures only
    /// zero the volatility reading.
    pub async fn refresh_metrics(&self) -> Result<RiskMetrics, PolicyError> {
        let now = Utc::now();
        let balances = self
            .storage
            .balances()
            .await
            .map_err(|e| PolicyError::MetricsUnavailable(e.to_string()))?;
        let trades = self
            .storage
            .recent_trades(now - trailing_window())
            .await
            .map_err(|e| PolicyError::MetricsUnavailable(e.to_string()))?;

        let volatility = match self.market_data.market_conditions().await {
            Ok(conditions) => conditions.volatility,
            Err(e) => {
                tracing::warn!(error = %e, "Volatility unavailable, assuming zero");
                Decimal::ZERO
            }
        };

        let metrics = RiskMetrics::derive(&balances, &trades, volatility, now);
        observability::set_risk_score(self.calculate_risk_score(&metrics));
        *self.last_metrics.write() = metrics.clone();
        Ok(metrics)
    }

    /// Evaluate the breaker rules against `metrics`.
    #[must_use]
    pub fn evaluate_breakers(&self, metrics: &RiskMetrics, now: DateTime<Utc>) -> Option<CircuitBreakerEvent> {
        evaluate_circuit_breakers(self.policy.circuit_breakers(), metrics, now)
    }

    /// Composite risk score of `metrics` under this policy.
    #[must_use]
    pub fn calculate_risk_score(&self, metrics: &RiskMetrics) -> f64 {
        risk_score(
            metrics.total_exposure,
            self.policy.max_total_exposure(),
            metrics.current_drawdown,
            metrics.daily_loss,
            self.policy.max_daily_loss_usdt(),
        )
    }

    async fn persist_critical(&self, action: &ActionRequest, decision_id: Option<&DecisionId>, result: &ValidationResult) {
        for violation in result.critical_violations() {
            let record = PolicyViolationRecord::new(
                decision_id.cloned(),
                action.kind(),
                action.symbol().clone(),
                violation.clone(),
            );
            if let Err(e) = self.storage.save_policy_violation(&record).await {
                observability::record_persistence_failure("policy_violation");
                tracing::error!(
                    error = %e,
                    kind = %violation.kind,
                    symbol = %action.symbol(),
                    "Failed to persist policy violation"
                );
            }
        }
    }
}

#[async_trait]
impl<S: StoragePort, M: MarketDataPort> ActionValidator for PolicyEngine<S, M> {
    async fn validate_action(
        &self,
        action: &ActionRequest,
        decision_id: Option<&DecisionId>,
    ) -> Result<ValidationResult, PolicyError> {
        let metrics = self.refresh_metrics().await?;
        let now = Utc::now();
        let score = self.calculate_risk_score(&metrics);

        let result = match self.evaluate_breakers(&metrics, now) {
            Some(event) => {
                tracing::warn!(
                    breaker = event.kind.as_str(),
                    reason = %event.reason,
                    paused_until = %event.paused_until,
                    "Circuit breaker tripped"
                );
                ValidationResult::circuit_breaker(event, score)
            }
            None => {
                let violations = PolicyRules::new(&self.policy).check(action, &metrics);
                ValidationResult::from_violations(violations, score, now)
            }
        };

        for violation in &result.violations {
            observability::record_policy_violation(violation.kind.as_str(), &violation.severity.to_string());
        }

        if result.approved {
            tracing::debug!(action = %action, risk_score = score, "Action approved");
        } else {
            tracing::warn!(
                action = %action,
                risk_score = score,
                violations = %result.violation_summary(),
                "Action rejected by policy"
            );
            self.persist_critical(action, decision_id, &result).await;
        }

        Ok(result)
    }

    async fn check_circuit_breakers(&self) -> Result<Option<CircuitBreakerEvent>, PolicyError> {
        let metrics = self.refresh_metrics().await?;
        Ok(self.evaluate_breakers(&metrics, Utc::now()))
    }

    fn policy(&self) -> &Policy {
        &self.policy
    }

    fn metrics(&self) -> RiskMetrics {
        self.last_metrics.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision::{ActionParams, BuyParams, GridParams, MarketConditions};
    use crate::domain::policy::{PolicyLimits, Severity, ViolationKind};
    use crate::domain::portfolio::{Balance, TradeRecord};
    use crate::domain::shared::{OrderSide, Symbol};
    use crate::infrastructure::market_data::StaticMarketData;
    use crate::infrastructure::persistence::InMemoryStorage;
    use rust_decimal_macros::dec;

    fn engine(storage: Arc<InMemoryStorage>, market: Arc<StaticMarketData>) -> PolicyEngine<InMemoryStorage, StaticMarketData> {
        let policy = Policy::new("balanced", PolicyLimits::balanced()).unwrap();
        PolicyEngine::new(policy, storage, market)
    }

    fn calm_market() -> Arc<StaticMarketData> {
        Arc::new(StaticMarketData::new(MarketConditions::unavailable(Symbol::new("BTCUSDT"))))
    }

    fn periodic_buy(quote: Decimal) -> ActionRequest {
        ActionRequest::new(
            "BTCUSDT",
            ActionParams::PeriodicBuy(BuyParams {
                quote_usdt: quote,
                expected_price: None,
                interval_minutes: Some(60),
            }),
        )
    }

    #[tokio::test]
    async fn oversized_order_is_rejected_with_limit_and_attempt() {
        let storage = Arc::new(InMemoryStorage::new());
        let engine = engine(storage.clone(), calm_market());

        let result = engine.validate_action(&periodic_buy(dec!(150)), None).await.unwrap();

        assert!(!result.approved);
        let violation = result
            .violations
            .iter()
            .find(|v| v.kind == ViolationKind::OrderSize)
            .unwrap();
        assert_eq!(violation.limit_value, dec!(100));
        assert_eq!(violation.attempted_value, dec!(150));
        assert_eq!(violation.severity, Severity::Critical);
        assert_eq!(storage.violations().len(), 1);
    }

    #[tokio::test]
    async fn order_within_limits_is_approved() {
        let engine = engine(Arc::new(InMemoryStorage::new()), calm_market());

        let result = engine.validate_action(&periodic_buy(dec!(80)), None).await.unwrap();

        assert!(result.approved);
        assert!(result.violations.is_empty());
    }

    #[tokio::test]
    async fn tripped_breaker_short_circuits_other_checks() {
        let storage = Arc::new(InMemoryStorage::new());
        // 20% drawdown against a 10% breaker.
        storage.set_balances(vec![
            Balance::new("BTCUSDT", dec!(0.02), dec!(50000)).with_unrealized_pnl(dec!(-200)),
        ]);
        let engine = engine(storage, calm_market());

        let result = engine.validate_action(&periodic_buy(dec!(500)), None).await.unwrap();

        assert!(!result.approved);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].kind, ViolationKind::CircuitBreaker);
        assert!(result.circuit_breaker.is_some());
    }

    #[tokio::test]
    async fn oversized_grid_is_a_warning_only() {
        let engine = engine(Arc::new(InMemoryStorage::new()), calm_market());
        let grid = ActionRequest::new(
            "ETHUSDT",
            ActionParams::Grid(GridParams {
                levels: 20,
                order_size_quote: dec!(100),
                lower_price: None,
                upper_price: None,
            }),
        );

        let result = engine.validate_action(&grid, None).await.unwrap();

        assert!(result.approved);
        assert_eq!(result.warnings().count(), 1);
    }

    #[tokio::test]
    async fn metrics_reflect_trailing_trades_and_realized_loss() {
        let storage = Arc::new(InMemoryStorage::new());
        let now = Utc::now();
        storage.record_trade(TradeRecord {
            symbol: Symbol::new("BTCUSDT"),
            side: OrderSide::Sell,
            quantity: dec!(0.001),
            price: dec!(40000),
            realized_pnl: dec!(-30),
            executed_at: now - chrono::Duration::hours(2),
        });
        storage.record_trade(TradeRecord {
            symbol: Symbol::new("BTCUSDT"),
            side: OrderSide::Sell,
            quantity: dec!(0.001),
            price: dec!(40000),
            realized_pnl: dec!(-500),
            executed_at: now - chrono::Duration::hours(30),
        });
        let engine = engine(storage, calm_market());

        let metrics = engine.refresh_metrics().await.unwrap();

        assert_eq!(metrics.daily_trade_count, 1);
        assert_eq!(metrics.daily_loss, dec!(30));
        assert_eq!(engine.metrics(), metrics);
    }

    #[tokio::test]
    async fn storage_outage_fails_validation() {
        let storage = Arc::new(InMemoryStorage::new());
        storage.set_unavailable(true);
        let engine = engine(storage, calm_market());

        let err = engine.validate_action(&periodic_buy(dec!(10)), None).await.unwrap_err();

        assert!(matches!(err, PolicyError::MetricsUnavailable(_)));
    }

    #[tokio::test]
    async fn check_circuit_breakers_does_not_persist() {
        let storage = Arc::new(InMemoryStorage::new());
        let market = Arc::new(StaticMarketData::new(MarketConditions {
            volatility: dec!(9),
            ..MarketConditions::unavailable(Symbol::new("BTCUSDT"))
        }));
        let engine = engine(storage.clone(), market);

        let event = engine.check_circuit_breakers().await.unwrap().unwrap();

        assert_eq!(event.kind.as_str(), "volatility");
        assert!(storage.circuit_breaker_events().is_empty());
        assert!(storage.violations().is_empty());
    }
}
