//! Policy Rules Service
//!
//! Stateless checks of one action against a policy and fresh metrics.
//! Circuit breakers are not evaluated here; they run first and
//! short-circuit in the policy engine.

use rust_decimal::Decimal;

use super::metrics::RiskMetrics;
use super::profile::Policy;
use super::violation::{Violation, ViolationKind};
use crate::domain::decision::{ActionParams, ActionRequest};

/// Checks an action against a [`Policy`].
pub struct PolicyRules<'a> {
    policy: &'a Policy,
}

impl<'a> PolicyRules<'a> {
    /// Create the rules for `policy`.
    #[must_use]
    pub const fn new(policy: &'a Policy) -> Self {
        Self { policy }
    }

    /// Per-kind checks followed by global checks.
    #[must_use]
    pub fn check(&self, action: &ActionRequest, metrics: &RiskMetrics) -> Vec<Violation> {
        let mut violations = self.check_action_kind(action, metrics);
        violations.extend(self.check_global(metrics));
        violations
    }

    fn check_action_kind(&self, action: &ActionRequest, metrics: &RiskMetrics) -> Vec<Violation> {
        match action.params() {
            ActionParams::Buy(params) | ActionParams::PeriodicBuy(params) => {
                self.check_buy(params.quote_usdt, metrics)
            }
            ActionParams::Grid(grid) => self.check_grid(grid.total_capital()),
            ActionParams::Sell(_)
            | ActionParams::AutoSell(_)
            | ActionParams::Rebalance(_)
            | ActionParams::PauseStrategy(_) => Vec::new(),
        }
    }

    fn check_buy(&self, amount: Decimal, metrics: &RiskMetrics) -> Vec<Violation> {
        let mut violations = Vec::new();

        let max_order = self.policy.max_order_usdt();
        if amount > max_order {
            violations.push(
                Violation::critical(
                    ViolationKind::OrderSize,
                    format!("Order size {amount:.2} exceeds limit {max_order:.2}"),
                )
                .with_limit("max_order_usdt", max_order)
                .with_attempted(amount),
            );
        }

        let max_exposure = self.policy.max_total_exposure();
        let attempted = metrics
            .total_exposure
            .checked_add(amount)
            .unwrap_or(Decimal::MAX);
        if attempted > max_exposure {
            violations.push(
                Violation::critical(
                    ViolationKind::TotalExposure,
                    format!("Total exposure {attempted:.2} would exceed limit {max_exposure:.2}"),
                )
                .with_limit("max_total_exposure", max_exposure)
                .with_attempted(attempted),
            );
        }

        violations
    }

    fn check_grid(&self, capital: Option<Decimal>) -> Vec<Violation> {
        let max_position = self.policy.max_position_usdt();
        let Some(capital) = capital else {
            return vec![
                Violation::critical(
                    ViolationKind::PositionSize,
                    format!("Grid capital overflows, position limit is {max_position:.2}"),
                )
                .with_limit("max_position_usdt", max_position)
                .with_attempted(Decimal::MAX),
            ];
        };
        if capital > max_position {
            return vec![
                Violation::warning(
                    ViolationKind::PositionSize,
                    format!("Grid capital {capital:.2} exceeds position limit {max_position:.2}"),
                )
                .with_limit("max_position_usdt", max_position)
                .with_attempted(capital),
            ];
        }
        Vec::new()
    }

    fn check_global(&self, metrics: &RiskMetrics) -> Vec<Violation> {
        let mut violations = Vec::new();

        let max_trades = self.policy.max_daily_trades();
        if metrics.daily_trade_count >= max_trades {
            violations.push(
                Violation::warning(
                    ViolationKind::TradeFrequency,
                    format!(
                        "Daily trade count {} reached limit {max_trades}",
                        metrics.daily_trade_count
                    ),
                )
                .with_limit("max_daily_trades", Decimal::from(max_trades))
                .with_attempted(Decimal::from(metrics.daily_trade_count.saturating_add(1))),
            );
        }

        let max_loss = self.policy.max_daily_loss_usdt();
        if metrics.daily_loss >= max_loss {
            violations.push(
                Violation::critical(
                    ViolationKind::DailyLoss,
                    format!(
                        "Daily loss {:.2} reached limit {max_loss:.2}",
                        metrics.daily_loss
                    ),
                )
                .with_limit("max_daily_loss_usdt", max_loss)
                .with_attempted(metrics.daily_loss),
            );
        }

        violations
    }
}
