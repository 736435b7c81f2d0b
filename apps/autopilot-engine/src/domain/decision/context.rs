//! Context handed to the oracle with every decision request.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::mode::Mode;
use crate::domain::policy::Policy;
use crate::domain::policy::metrics::saturating_sum;
use crate::domain::shared::Symbol;

/// Valuation of one held asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetStatus {
    /// Trading pair.
    pub symbol: Symbol,
    /// Base quantity held.
    pub quantity: Decimal,
    /// Average entry price.
    pub avg_entry_price: Decimal,
    /// Live price.
    pub current_price: Decimal,
    /// Quote capital invested.
    pub invested_usdt: Decimal,
    /// Quantity valued at the live price.
    pub current_value: Decimal,
    /// Unrealized PnL.
    pub pnl: Decimal,
    /// Unrealized PnL in percent of invested capital.
    pub pnl_percent: Decimal,
}

impl AssetStatus {
    /// Value a holding at `current_price`.
    #[must_use]
    pub fn valued(
        symbol: Symbol,
        quantity: Decimal,
        avg_entry_price: Decimal,
        invested_usdt: Decimal,
        current_price: Decimal,
    ) -> Self {
        let current_value = quantity.saturating_mul(current_price);
        let pnl = current_value.saturating_sub(invested_usdt);
        Self {
            symbol,
            quantity,
            avg_entry_price,
            current_price,
            invested_usdt,
            current_value,
            pnl,
            pnl_percent: percent_of(pnl, invested_usdt),
        }
    }
}

/// Portfolio snapshot. Assets whose price could not be resolved are left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Valued assets.
    pub assets: Vec<AssetStatus>,
    /// Sum of current values.
    pub total_value_usdt: Decimal,
    /// Sum of invested capital.
    pub total_invested: Decimal,
    /// Sum of PnL.
    pub total_pnl: Decimal,
    /// Total PnL in percent of invested capital.
    pub total_pnl_percent: Decimal,
}

impl PortfolioSnapshot {
    /// Aggregate valued assets into a snapshot.
    #[must_use]
    pub fn from_assets(assets: Vec<AssetStatus>) -> Self {
        let total_value_usdt = saturating_sum(assets.iter().map(|a| a.current_value));
        let total_invested = saturating_sum(assets.iter().map(|a| a.invested_usdt));
        let total_pnl = saturating_sum(assets.iter().map(|a| a.pnl));
        Self {
            total_pnl_percent: percent_of(total_pnl, total_invested),
            assets,
            total_value_usdt,
            total_invested,
            total_pnl,
        }
    }
}

/// Broad market mood.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// Risk-on.
    Bullish,
    /// No clear direction.
    #[default]
    Neutral,
    /// Risk-off.
    Bearish,
}

/// Market conditions around the reference asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConditions {
    /// Asset the market is read from.
    pub reference_symbol: Symbol,
    /// Live price of the reference asset, when known.
    pub reference_price: Option<Decimal>,
    /// 24h change of the reference asset, in percent.
    pub change_24h_percent: Decimal,
    /// Overall sentiment.
    pub sentiment: Sentiment,
    /// Volatility, in percent.
    pub volatility: Decimal,
}

impl MarketConditions {
    /// Neutral conditions used when market data is unavailable.
    #[must_use]
    pub const fn unavailable(reference_symbol: Symbol) -> Self {
        Self {
            reference_symbol,
            reference_price: None,
            change_24h_percent: Decimal::ZERO,
            sentiment: Sentiment::Neutral,
            volatility: Decimal::ZERO,
        }
    }
}

/// A scored news item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSignal {
    /// Headline.
    pub headline: String,
    /// Classified sentiment.
    pub sentiment: Sentiment,
    /// Sentiment score in `[-1, 1]`.
    pub sentiment_score: f64,
    /// Topics mentioned.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Symbols mentioned.
    #[serde(default)]
    pub symbols: Vec<Symbol>,
    /// Publication time.
    pub published_at: chrono::DateTime<chrono::Utc>,
}

/// Limits the oracle must size its proposals within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Per-order cap.
    pub max_order_usdt: Decimal,
    /// Per-position cap.
    pub max_position_usdt: Decimal,
    /// Total exposure cap.
    pub max_total_exposure: Decimal,
    /// Trailing-24h loss cap.
    pub max_daily_loss: Decimal,
}

impl RiskLimits {
    /// Policy limits scaled for `mode` (halved in pilot).
    #[must_use]
    pub fn for_mode(policy: &Policy, mode: Mode) -> Self {
        let scale = mode.limit_scale();
        Self {
            max_order_usdt: policy.max_order_usdt() * scale,
            max_position_usdt: policy.max_position_usdt() * scale,
            max_total_exposure: policy.max_total_exposure() * scale,
            max_daily_loss: policy.max_daily_loss_usdt() * scale,
        }
    }
}

/// Everything the oracle sees for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// Portfolio snapshot.
    pub current_portfolio: PortfolioSnapshot,
    /// Market conditions.
    pub market_conditions: MarketConditions,
    /// Recent news.
    pub recent_news: Vec<NewsSignal>,
    /// Mode-scaled risk limits.
    pub risk_limits: RiskLimits,
    /// Current mode.
    pub mode: Mode,
    /// Assets enabled for trading.
    #[serde(default)]
    pub tradable_symbols: Vec<Symbol>,
}

fn percent_of(value: Decimal, base: Decimal) -> Decimal {
    if base > Decimal::ZERO {
        value
            .checked_div(base)
            .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(if value < Decimal::ZERO { Decimal::MIN } else { Decimal::MAX })
    } else {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::PolicyLimits;
    use rust_decimal_macros::dec;

    #[test]
    fn extreme_valuation_saturates() {
        let asset = AssetStatus::valued(
            Symbol::new("BTCUSDT"),
            Decimal::MAX,
            dec!(1),
            dec!(1),
            dec!(2),
        );
        assert_eq!(asset.current_value, Decimal::MAX);
        assert_eq!(asset.pnl_percent, Decimal::MAX);

        let snapshot = PortfolioSnapshot::from_assets(vec![asset.clone(), asset]);
        assert_eq!(snapshot.total_value_usdt, Decimal::MAX);
    }

    #[test]
        fn asset_is_valued_at_live_price() {
        let asset = AssetStatus::valued(
            Symbol::new("BTCUSDT"),
            dec!(0.02),
            dec!(50000),
            dec!(1000),
            dec!(55000),
        );
        assert_eq!(asset.current_value, dec!(1100));
        assert_eq!(asset.pnl, dec!(100));
        assert_eq!(asset.pnl_percent, dec!(10));
    }

    #[test]
    fn snapshot_totals() {
        let snapshot = PortfolioSnapshot::from_assets(vec![
            AssetStatus::valued(Symbol::new("BTCUSDT"), dec!(1), dec!(100), dec!(100), dec!(120)),
            AssetStatus::valued(Symbol::new("ETHUSDT"), dec!(2), dec!(50), dec!(100), dec!(40)),
        ]);
        assert_eq!(snapshot.total_value_usdt, dec!(200));
        assert_eq!(snapshot.total_invested, dec!(200));
        assert_eq!(snapshot.total_pnl, Decimal::ZERO);
        assert_eq!(snapshot.total_pnl_percent, Decimal::ZERO);
    }

    #[test]
    fn pilot_limits_are_half_of_full() {
        let policy = Policy::new("balanced", PolicyLimits::balanced()).unwrap();
        let full = RiskLimits::for_mode(&policy, Mode::Full);
        let pilot = RiskLimits::for_mode(&policy, Mode::Pilot);

        assert_eq!(full.max_order_usdt, dec!(100));
        assert_eq!(pilot.max_order_usdt, dec!(50));
        assert_eq!(pilot.max_total_exposure, dec!(1500));
        assert_eq!(pilot.max_daily_loss, dec!(50));
    }
}
