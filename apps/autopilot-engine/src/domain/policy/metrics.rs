//! Risk metrics and the composite risk score.
//!
//! Metrics are always derived from balances and trade history at the start
//! of a validation pass; they are never treated as authoritative state.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::domain::portfolio::{Balance, TradeRecord};

/// Window used for daily loss and daily trade count.
#[must_use]
pub fn trailing_window() -> Duration {
    Duration::hours(24)
}

const EXPOSURE_WEIGHT: f64 = 0.4;
const DRAWDOWN_WEIGHT: f64 = 0.3;
const DAILY_LOSS_WEIGHT: f64 = 0.3;

/// Point-in-time risk metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Capital invested across all balances.
    pub total_exposure: Decimal,
    /// Net realized loss over the trailing 24 hours (non-negative).
    pub daily_loss: Decimal,
    /// Trades executed over the trailing 24 hours.
    pub daily_trade_count: u32,
    /// Unrealized drawdown in percent of exposure (non-negative).
    pub current_drawdown: Decimal,
    /// Market volatility in percent.
    pub volatility: Decimal,
    /// When these metrics were derived.
    pub last_updated: DateTime<Utc>,
}

impl RiskMetrics {
    /// Metrics of an empty portfolio.
    #[must_use]
    pub const fn empty(now: DateTime<Utc>) -> Self {
        Self {
            total_exposure: Decimal::ZERO,
            daily_loss: Decimal::ZERO,
            daily_trade_count: 0,
            current_drawdown: Decimal::ZERO,
            volatility: Decimal::ZERO,
            last_updated: now,
        }
    }

    /// Derive metrics from balances and trade history.
    ///
    /// Trades older than the trailing window are ignored even if storage
    /// returned them.
    #[must_use]
    pub fn derive(
        balances: &[Balance],
        trades: &[TradeRecord],
        volatility: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        let total_exposure = saturating_sum(balances.iter().map(|b| b.total_invested));
        let unrealized = saturating_sum(balances.iter().map(|b| b.unrealized_pnl));

        let current_drawdown = if total_exposure > Decimal::ZERO {
            unrealized
                .checked_div(total_exposure)
                .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
                .map_or_else(
                    || if unrealized < Decimal::ZERO { Decimal::MAX } else { Decimal::ZERO },
                    |pct| (-pct).max(Decimal::ZERO),
                )
        } else {
            Decimal::ZERO
        };

        let since = now - trailing_window();
        let recent: Vec<&TradeRecord> = trades.iter().filter(|t| t.executed_at >= since).collect();
        let realized = saturating_sum(recent.iter().map(|t| t.realized_pnl));

        Self {
            total_exposure,
            daily_loss: (-realized).max(Decimal::ZERO),
            daily_trade_count: u32::try_from(recent.len()).unwrap_or(u32::MAX),
            current_drawdown,
            volatility: volatility.max(Decimal::ZERO),
            last_updated: now,
        }
    }

    /// One-line summary for logs and circuit breaker details.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "exposure={:.2} daily_loss={:.2} daily_trades={} drawdown={:.2}% volatility={:.2}%",
            self.total_exposure,
            self.daily_loss,
            self.daily_trade_count,
            self.current_drawdown,
            self.volatility
        )
    }
}

/// Sum that clamps at the decimal range instead of overflowing.
pub(crate) fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Composite risk score in `[0, 1]`.
///
/// `0.4 * exposure/max_exposure + 0.3 * drawdown/100 + 0.3 * daily_loss/max_daily_loss`,
/// clamped. Informational only; it never blocks an action.
#[must_use]
pub fn risk_score(
    exposure: Decimal,
    max_exposure: Decimal,
    drawdown: Decimal,
    daily_loss: Decimal,
    max_daily_loss: Decimal,
) -> f64 {
    let score = EXPOSURE_WEIGHT * ratio(exposure, max_exposure)
        + DRAWDOWN_WEIGHT * ratio(drawdown, Decimal::ONE_HUNDRED)
        + DAILY_LOSS_WEIGHT * ratio(daily_loss, max_daily_loss);

    if score.is_nan() {
        return 1.0;
    }
    score.clamp(0.0, 1.0)
}

fn ratio(value: Decimal, limit: Decimal) -> f64 {
    let value = value.to_f64().unwrap_or(0.0).max(0.0);
    let limit = limit.to_f64().unwrap_or(0.0);
    if limit > 0.0 {
        value / limit
    } else if value > 0.0 {
        // A zero limit with any usage is fully consumed.
        1.0
    } else {
        0.0
    }
}
