//! Action executor.
//!
//! Every action passes the same gates, in order, before it can reach the
//! exchange:
//!
//! 1. kill switch
//! 2. policy validation
//! 3. price resolution through [`PriceFailover`]
//! 4. slippage, for buys that carry an expected price
//! 5. dispatch by action kind
//!
//! The first failing gate ends the attempt. Nothing is sent to the exchange
//! unless all gates pass. Orders are never wrapped in a timeout: once
//! submitted, an order is left to the adapter to complete.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};

use super::error::ExecutionError;
use super::price_failover::PriceFailover;
use super::slippage_guard::SlippageGuard;
use super::types::{ExecutionRequest, ExecutionResult};
use crate::application::ports::{ActionExecutor, ActionValidator, ExchangeError, ExchangePort};
use crate::domain::decision::{ActionParams, ActionRequest};
use crate::domain::shared::{DecisionId, OrderSide, QUOTE_ASSET, Symbol};
use crate::observability;
use crate::safety::KillSwitch;

/// Decimal places kept when sizing base quantities. Rounded toward zero so
/// an order never spends more than asked.
const QUANTITY_SCALE: u32 = 8;

/// Runs actions through the safety gates and onto the exchange.
pub struct Executor<X: ExchangePort, V: ActionValidator> {
    exchange: Arc<X>,
    validator: Arc<V>,
    kill_switch: Arc<KillSwitch>,
    prices: Arc<PriceFailover>,
    slippage: Arc<SlippageGuard>,
}

impl<X: ExchangePort, V: ActionValidator> Executor<X, V> {
    /// Create an executor.
    ///
    /// # Arguments
    ///
    /// * `exchange` - Exchange used for balances and orders
    /// * `validator` - Policy validator consulted on every action
    /// * `kill_switch` - Shared kill switch
    /// * `prices` - Price resolution chain
    /// * `slippage` - Shared slippage guard
    #[must_use]
    pub const fn new(
        exchange: Arc<X>,
        validator: Arc<V>,
        kill_switch: Arc<KillSwitch>,
        prices: Arc<PriceFailover>,
        slippage: Arc<SlippageGuard>,
    ) -> Self {
        Self {
            exchange,
            validator,
            kill_switch,
            prices,
            slippage,
        }
    }

    /// The shared slippage guard.
    #[must_use]
    pub fn slippage_guard(&self) -> &Arc<SlippageGuard> {
        &self.slippage
    }

    async fn run_gates(
        &self,
        action: &ActionRequest,
        decision_id: Option<&DecisionId>,
    ) -> Result<ExecutionResult, ExecutionError> {
        let status = self.kill_switch.status();
        if status.active {
            return Err(ExecutionError::KillSwitchActive {
                reason: status.reason.unwrap_or_default(),
            });
        }

        let validation = self
            .validator
            .validate_action(action, decision_id)
            .await?;
        if !validation.approved {
            return Err(ExecutionError::PolicyViolation {
                violations: validation.critical_violations().cloned().collect(),
            });
        }

        let symbol = action.symbol();
        let price = self.prices.get_price(symbol).await?;

        let slippage = match action.expected_buy_price() {
            Some(expected) => Some(self.slippage.check_slippage(price, expected)?),
            None => None,
        };

        let result = match action.params() {
            ActionParams::Buy(p) | ActionParams::PeriodicBuy(p) => {
                self.buy(symbol, p.quote_usdt, price).await?
            }
            ActionParams::Sell(p) => self.sell(symbol, p.effective_percent(), price).await?,
            ActionParams::Grid(_) => return Err(ExecutionError::GridRequiresStrategy),
            ActionParams::AutoSell(_) | ActionParams::Rebalance(_) | ActionParams::PauseStrategy(_) => {
                return Err(ExecutionError::UnsupportedAction { kind: action.kind() });
            }
        };
        Ok(result.with_slippage(slippage))
    }

    async fn buy(&self, symbol: &Symbol, quote: Decimal, price: Decimal) -> Result<ExecutionResult, ExecutionError> {
        let available = self.exchange.get_balance(QUOTE_ASSET).await?;
        if available < quote {
            return Err(ExecutionError::InsufficientFunds {
                asset: QUOTE_ASSET.to_string(),
                required: quote,
                available,
            });
        }

        let quantity = quote
            .checked_div(price)
            .ok_or_else(|| ExchangeError::OrderRejected {
                reason: format!("quantity for {quote} {QUOTE_ASSET} at {price} overflows"),
            })?
            .round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::ToZero);
        let order_id = self
            .exchange
            .place_market_order(symbol, OrderSide::Buy, quantity)
            .await?;
        Ok(ExecutionResult::filled(order_id, price, quantity))
    }

    async fn sell(&self, symbol: &Symbol, percent: Decimal, price: Decimal) -> Result<ExecutionResult, ExecutionError> {
        let asset = symbol.base_asset();
        let held = self.exchange.get_balance(asset).await?;
        let quantity = (held * percent / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::ToZero);
        if held <= Decimal::ZERO || quantity <= Decimal::ZERO {
            return Err(ExecutionError::InsufficientFunds {
                asset: asset.to_string(),
                required: quantity.max(Decimal::ZERO),
                available: held,
            });
        }

        let order_id = self
            .exchange
            .place_market_order(symbol, OrderSide::Sell, quantity)
            .await?;
        Ok(ExecutionResult::filled(order_id, price, quantity))
    }
}

#[async_trait]
impl<X: ExchangePort, V: ActionValidator> ActionExecutor for Executor<X, V> {
    async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        let action = &request.action;
        let kind = action.kind();

        match self.run_gates(action, request.decision_id.as_ref()).await {
            Ok(result) => {
                observability::record_execution(kind.as_str(), "success");
                tracing::info!(
                    action = %kind,
                    symbol = %action.symbol(),
                    order_id = result.order_id.as_ref().map(ToString::to_string).unwrap_or_default(),
                    price = ?result.actual_price,
                    quantity = ?result.quantity,
                    "Action executed"
                );
                result
            }
            Err(err) => {
                let status = if err.is_blocked() { "blocked" } else { "failed" };
                observability::record_execution(kind.as_str(), status);
                tracing::warn!(
                    action = %kind,
                    symbol = %action.symbol(),
                    code = ?err.code(),
                    error = %err,
                    "Action not executed"
                );
                ExecutionResult::failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{PriceSourceError, PriceSourcePort};
    use crate::domain::decision::{BuyParams, GridParams, PauseParams, SellParams};
    use crate::domain::policy::{
        CircuitBreakerEvent, Policy, PolicyError, PolicyLimits, RiskMetrics, ValidationResult,
        Violation, ViolationKind,
    };
    use crate::domain::shared::OrderId;
    use crate::error::ErrorCode;
    use chrono::Utc;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct StubExchange {
        balances: HashMap<String, Decimal>,
        orders: Mutex<Vec<(Symbol, OrderSide, Decimal)>>,
        order_calls: AtomicU32,
    }

    impl StubExchange {
        fn with_balance(mut self, asset: &str, amount: Decimal) -> Self {
            self.balances.insert(asset.to_string(), amount);
            self
        }

        fn order_calls(&self) -> u32 {
            self.order_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExchangePort for StubExchange {
        async fn get_price(&self, symbol: &Symbol) -> Result<Decimal, ExchangeError> {
            Err(ExchangeError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
        }

        async fn get_balance(&self, asset: &str) -> Result<Decimal, ExchangeError> {
            Ok(self.balances.get(asset).copied().unwrap_or_default())
        }

        async fn place_market_order(
            &self,
            symbol: &Symbol,
            side: OrderSide,
            quantity: Decimal,
        ) -> Result<OrderId, ExchangeError> {
            self.order_calls.fetch_add(1, Ordering::SeqCst);
            self.orders.lock().push((symbol.clone(), side, quantity));
            Ok(OrderId::new("order-1"))
        }
    }

    struct FixedPrice(Decimal);

    #[async_trait]
    impl PriceSourcePort for FixedPrice {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn get_price(&self, _symbol: &Symbol) -> Result<Decimal, PriceSourceError> {
            Ok(self.0)
        }
    }

    struct StubValidator {
        policy: Policy,
        reject: bool,
        calls: AtomicU32,
    }

    impl StubValidator {
        fn approving() -> Self {
            Self {
                policy: Policy::new("balanced", PolicyLimits::balanced()).unwrap(),
                reject: false,
                calls: AtomicU32::new(0),
            }
        }

        fn rejecting() -> Self {
            Self {
                reject: true,
                ..Self::approving()
            }
        }
    }

    #[async_trait]
    impl ActionValidator for StubValidator {
        async fn validate_action(
            &self,
            _action: &ActionRequest,
            _decision_id: Option<&DecisionId>,
        ) -> Result<ValidationResult, PolicyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let violations = if self.reject {
                vec![Violation::critical(ViolationKind::OrderSize, "Order size 150.00 exceeds limit 100.00")]
            } else {
                Vec::new()
            };
            Ok(ValidationResult::from_violations(violations, 0.1, Utc::now()))
        }

        async fn check_circuit_breakers(&self) -> Result<Option<CircuitBreakerEvent>, PolicyError> {
            Ok(None)
        }

        fn policy(&self) -> &Policy {
            &self.policy
        }

        fn metrics(&self) -> RiskMetrics {
            RiskMetrics::empty(Utc::now())
        }
    }

    struct Harness {
        exchange: Arc<StubExchange>,
        validator: Arc<StubValidator>,
        kill_switch: Arc<KillSwitch>,
        executor: Executor<StubExchange, StubValidator>,
    }

    fn harness(exchange: StubExchange, validator: StubValidator, price: Decimal) -> Harness {
        let exchange = Arc::new(exchange);
        let validator = Arc::new(validator);
        let kill_switch = Arc::new(KillSwitch::new());
        let executor = Executor::new(
            exchange.clone(),
            validator.clone(),
            kill_switch.clone(),
            Arc::new(PriceFailover::new(Arc::new(FixedPrice(price)))),
            Arc::new(SlippageGuard::default()),
        );
        Harness {
            exchange,
            validator,
            kill_switch,
            executor,
        }
    }

    fn buy(quote: Decimal, expected_price: Option<Decimal>) -> ExecutionRequest {
        ExecutionRequest::new(ActionRequest::new(
            "BTCUSDT",
            ActionParams::Buy(BuyParams {
                quote_usdt: quote,
                expected_price,
                interval_minutes: None,
            }),
        ))
    }

    fn sell(percent: Option<Decimal>) -> ExecutionRequest {
        ExecutionRequest::new(ActionRequest::new(
            "BTCUSDT",
            ActionParams::Sell(SellParams {
                percent,
                expected_price: None,
            }),
        ))
    }

    #[tokio::test]
    async fn buy_sizes_quantity_from_quote_and_price() {
        let h = harness(
            StubExchange::default().with_balance("USDT", dec!(1000)),
            StubValidator::approving(),
            dec!(50000),
        );

        let result = h.executor.execute(buy(dec!(100), None)).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.quantity, Some(dec!(0.002)));
        assert_eq!(result.actual_amount, Some(dec!(100)));
        assert_eq!(result.actual_price, Some(dec!(50000)));
        let orders = h.exchange.orders.lock();
        assert_eq!(orders[0].1, OrderSide::Buy);
    }

    #[tokio::test]
    async fn kill_switch_blocks_before_any_other_gate() {
        let h = harness(
            StubExchange::default().with_balance("USDT", dec!(1000)),
            StubValidator::approving(),
            dec!(50000),
        );
        h.kill_switch.activate("manual stop");

        let result = h.executor.execute(buy(dec!(10), None)).await;

        assert!(!result.success);
        assert_eq!(result.error.as_ref().map(ExecutionError::code), Some(ErrorCode::KillSwitchActive));
        assert_eq!(h.validator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.exchange.order_calls(), 0);
    }

    #[tokio::test]
    async fn policy_rejection_places_no_order() {
        let h = harness(
            StubExchange::default().with_balance("USDT", dec!(1000)),
            StubValidator::rejecting(),
            dec!(50000),
        );

        let err = h.executor.execute(buy(dec!(150), None)).await.into_result().unwrap_err();

        assert!(matches!(err, ExecutionError::PolicyViolation { ref violations } if violations.len() == 1));
        assert_eq!(h.exchange.order_calls(), 0);
    }

    #[tokio::test]
    async fn slippage_beyond_threshold_places_no_order() {
        let h = harness(
            StubExchange::default().with_balance("USDT", dec!(1000)),
            StubValidator::approving(),
            dec!(102),
        );

        let result = h.executor.execute(buy(dec!(50), Some(dec!(100)))).await;

        assert_eq!(result.error.as_ref().map(ExecutionError::code), Some(ErrorCode::SlippageExceeded));
        assert_eq!(h.exchange.order_calls(), 0);
    }

    #[tokio::test]
    async fn slippage_within_threshold_is_reported() {
        let h = harness(
            StubExchange::default().with_balance("USDT", dec!(1000)),
            StubValidator::approving(),
            dec!(100.5),
        );

        let result = h.executor.execute(buy(dec!(50), Some(dec!(100)))).await;

        assert!(result.success);
        assert_eq!(result.slippage, Some(dec!(0.5)));
    }

    #[tokio::test]
    async fn buy_without_enough_quote_fails() {
        let h = harness(
            StubExchange::default().with_balance("USDT", dec!(20)),
            StubValidator::approving(),
            dec!(50000),
        );

        let err = h.executor.execute(buy(dec!(50), None)).await.into_result().unwrap_err();

        assert_eq!(
            err,
            ExecutionError::InsufficientFunds {
                asset: "USDT".into(),
                required: dec!(50),
                available: dec!(20),
            }
        );
        assert_eq!(h.exchange.order_calls(), 0);
    }

    #[tokio::test]
    async fn sell_uses_base_asset_balance_and_percent() {
        let h = harness(
            StubExchange::default().with_balance("BTC", dec!(0.5)),
            StubValidator::approving(),
            dec!(60000),
        );

        let result = h.executor.execute(sell(Some(dec!(25)))).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.quantity, Some(dec!(0.125)));
        assert_eq!(result.actual_amount, Some(dec!(7500)));
        assert_eq!(h.exchange.orders.lock()[0].1, OrderSide::Sell);
    }

    #[tokio::test]
    async fn sell_without_position_fails() {
        let h = harness(StubExchange::default(), StubValidator::approving(), dec!(60000));

        let result = h.executor.execute(sell(None)).await;

        assert_eq!(result.error.as_ref().map(ExecutionError::code), Some(ErrorCode::InsufficientFunds));
        assert_eq!(h.exchange.order_calls(), 0);
    }

    #[tokio::test]
    async fn grid_and_strategy_actions_are_not_executed_directly() {
        let h = harness(
            StubExchange::default().with_balance("USDT", dec!(1000)),
            StubValidator::approving(),
            dec!(50000),
        );

        let grid = ExecutionRequest::new(ActionRequest::new(
            "BTCUSDT",
            ActionParams::Grid(GridParams {
                levels: 5,
                order_size_quote: dec!(20),
                lower_price: None,
                upper_price: None,
            }),
        ));
        let pause = ExecutionRequest::new(ActionRequest::new(
            "BTCUSDT",
            ActionParams::PauseStrategy(PauseParams::default()),
        ));

        assert_eq!(
            h.executor.execute(grid).await.error,
            Some(ExecutionError::GridRequiresStrategy)
        );
        assert_eq!(
            h.executor.execute(pause).await.error.as_ref().map(ExecutionError::code),
            Some(ErrorCode::UnsupportedAction)
        );
        assert_eq!(h.exchange.order_calls(), 0);
    }
}
