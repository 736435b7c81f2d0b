//! Proposed actions.
//!
//! The oracle describes an action as `{type, symbol, parameters}` with an
//! open parameter object. That object is decoded exactly once, here, into a
//! typed [`ActionParams`] variant; validators and executors only ever see
//! the typed form.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::shared::Symbol;

/// Largest quote amount or price an action may carry.
pub const MAX_ACTION_AMOUNT: Decimal = rust_decimal_macros::dec!(1000000000000000);

/// Kind of a proposed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// One-off market buy.
    Buy,
    /// Configure a periodic buy.
    SetDca,
    /// Market sell of a share of the position.
    Sell,
    /// Configure a grid.
    SetGrid,
    /// Configure automatic profit taking.
    SetAutosell,
    /// Rebalance towards target weights.
    Rebalance,
    /// Pause a running strategy.
    PauseStrategy,
}

impl ActionKind {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::SetDca => "set_dca",
            Self::Sell => "sell",
            Self::SetGrid => "set_grid",
            Self::SetAutosell => "set_autosell",
            Self::Rebalance => "rebalance",
            Self::PauseStrategy => "pause_strategy",
        }
    }

    /// Whether this kind spends quote currency.
    #[must_use]
    pub const fn is_buy(self) -> bool {
        matches!(self, Self::Buy | Self::SetDca)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a buy or periodic buy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyParams {
    /// Quote amount to spend per order.
    #[serde(alias = "quoteAmount")]
    pub quote_usdt: Decimal,
    /// Price the oracle committed to; enables the slippage check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_price: Option<Decimal>,
    /// Interval between periodic buys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_minutes: Option<u32>,
}

/// Parameters of a sell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellParams {
    /// Share of the position to sell, in percent. Defaults to 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<Decimal>,
    /// Price the oracle committed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_price: Option<Decimal>,
}

impl SellParams {
    /// Percent to sell, defaulting to the whole position.
    #[must_use]
    pub fn effective_percent(&self) -> Decimal {
        self.percent.unwrap_or(Decimal::ONE_HUNDRED)
    }
}

/// Parameters of a grid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridParams {
    /// Number of grid levels.
    pub levels: u32,
    /// Quote amount per level.
    pub order_size_quote: Decimal,
    /// Lower price bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_price: Option<Decimal>,
    /// Upper price bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_price: Option<Decimal>,
}

impl GridParams {
    /// Capital the grid ties up across all levels, `None` on overflow.
    #[must_use]
    pub fn total_capital(&self) -> Option<Decimal> {
        Decimal::from(self.levels).checked_mul(self.order_size_quote)
    }
}

/// Parameters of automatic profit taking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSellParams {
    /// Gain, in percent, that triggers a sell.
    pub trigger_percent: Decimal,
    /// Share of the position sold on trigger, in percent.
    pub sell_percent: Decimal,
}

/// Parameters of a rebalance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceParams {
    /// Target weight per asset, in percent.
    #[serde(default)]
    pub target_weights: BTreeMap<String, Decimal>,
}

/// Parameters of a strategy pause.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseParams {
    /// Strategy to pause; all strategies on the symbol when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    /// Free-form reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Typed parameters, one variant per action kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionParams {
    /// `buy`
    Buy(BuyParams),
    /// `set_dca`
    PeriodicBuy(BuyParams),
    /// `sell`
    Sell(SellParams),
    /// `set_grid`
    Grid(GridParams),
    /// `set_autosell`
    AutoSell(AutoSellParams),
    /// `rebalance`
    Rebalance(RebalanceParams),
    /// `pause_strategy`
    PauseStrategy(PauseParams),
}

impl ActionParams {
    /// Kind these parameters belong to.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Buy(_) => ActionKind::Buy,
            Self::PeriodicBuy(_) => ActionKind::SetDca,
            Self::Sell(_) => ActionKind::Sell,
            Self::Grid(_) => ActionKind::SetGrid,
            Self::AutoSell(_) => ActionKind::SetAutosell,
            Self::Rebalance(_) => ActionKind::Rebalance,
            Self::PauseStrategy(_) => ActionKind::PauseStrategy,
        }
    }

    fn decode(kind: ActionKind, parameters: Value) -> Result<Self, ActionDecodeError> {
        // Parameter-less kinds may arrive with `null`.
        let parameters = match parameters {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other,
        };
        let invalid = |source: serde_json::Error| ActionDecodeError::InvalidParameters {
            kind,
            message: source.to_string(),
        };

        let params = match kind {
            ActionKind::Buy => Self::Buy(serde_json::from_value(parameters).map_err(invalid)?),
            ActionKind::SetDca => {
                Self::PeriodicBuy(serde_json::from_value(parameters).map_err(invalid)?)
            }
            ActionKind::Sell => Self::Sell(serde_json::from_value(parameters).map_err(invalid)?),
            ActionKind::SetGrid => Self::Grid(serde_json::from_value(parameters).map_err(invalid)?),
            ActionKind::SetAutosell => {
                Self::AutoSell(serde_json::from_value(parameters).map_err(invalid)?)
            }
            ActionKind::Rebalance => {
                Self::Rebalance(serde_json::from_value(parameters).map_err(invalid)?)
            }
            ActionKind::PauseStrategy => {
                Self::PauseStrategy(serde_json::from_value(parameters).map_err(invalid)?)
            }
        };
        params.check()?;
        Ok(params)
    }

    fn check(&self) -> Result<(), ActionDecodeError> {
        let kind = self.kind();
        let positive = |field: &'static str, value: Decimal| {
            if value > Decimal::ZERO && value <= MAX_ACTION_AMOUNT {
                Ok(())
            } else {
                Err(ActionDecodeError::OutOfRange {
                    kind,
                    field,
                    message: format!("must be in (0, {MAX_ACTION_AMOUNT}], got {value}"),
                })
            }
        };
        let percent = |field: &'static str, value: Decimal| {
            if value > Decimal::ZERO && value <= Decimal::ONE_HUNDRED {
                Ok(())
            } else {
                Err(ActionDecodeError::OutOfRange {
                    kind,
                    field,
                    message: format!("must be in (0, 100], got {value}"),
                })
            }
        };

        match self {
            Self::Buy(p) | Self::PeriodicBuy(p) => {
                positive("quote_usdt", p.quote_usdt)?;
                if let Some(price) = p.expected_price {
                    positive("expected_price", price)?;
                }
            }
            Self::Sell(p) => {
                if let Some(pct) = p.percent {
                    percent("percent", pct)?;
                }
            }
            Self::Grid(p) => {
                if p.levels == 0 {
                    return Err(ActionDecodeError::OutOfRange {
                        kind,
                        field: "levels",
                        message: "must be at least 1".to_string(),
                    });
                }
                positive("order_size_quote", p.order_size_quote)?;
            }
            Self::AutoSell(p) => {
                positive("trigger_percent", p.trigger_percent)?;
                percent("sell_percent", p.sell_percent)?;
            }
            Self::Rebalance(_) | Self::PauseStrategy(_) => {}
        }
        Ok(())
    }

    fn to_value(&self) -> Value {
        let value = match self {
            Self::Buy(p) | Self::PeriodicBuy(p) => serde_json::to_value(p),
            Self::Sell(p) => serde_json::to_value(p),
            Self::Grid(p) => serde_json::to_value(p),
            Self::AutoSell(p) => serde_json::to_value(p),
            Self::Rebalance(p) => serde_json::to_value(p),
            Self::PauseStrategy(p) => serde_json::to_value(p),
        };
        value.unwrap_or_default()
    }
}

/// Why an action could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionDecodeError {
    /// Action has no symbol.
    #[error("action '{kind}' has an empty symbol")]
    EmptySymbol {
        /// Action kind.
        kind: ActionKind,
    },

    /// Parameters do not match the kind's shape.
    #[error("invalid parameters for '{kind}': {message}")]
    InvalidParameters {
        /// Action kind.
        kind: ActionKind,
        /// Decoder message.
        message: String,
    },

    /// A parameter is outside its allowed range.
    #[error("parameter '{field}' of '{kind}' {message}")]
    OutOfRange {
        /// Action kind.
        kind: ActionKind,
        /// Offending field.
        field: &'static str,
        /// Constraint description.
        message: String,
    },
}

/// Wire shape of an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireAction {
    #[serde(rename = "type")]
    kind: ActionKind,
    symbol: Symbol,
    #[serde(default)]
    parameters: Value,
}

/// A proposed operation on one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireAction", into = "WireAction")]
pub struct ActionRequest {
    symbol: Symbol,
    params: ActionParams,
}

impl ActionRequest {
    /// Create an action from already-typed parameters.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, params: ActionParams) -> Self {
        Self {
            symbol: symbol.into(),
            params,
        }
    }

    /// Decode an action from its wire parts.
    pub fn decode(
        kind: ActionKind,
        symbol: impl Into<Symbol>,
        parameters: Value,
    ) -> Result<Self, ActionDecodeError> {
        let symbol = symbol.into();
        if symbol.is_empty() {
            return Err(ActionDecodeError::EmptySymbol { kind });
        }
        Ok(Self {
            symbol,
            params: ActionParams::decode(kind, parameters)?,
        })
    }

    /// Action kind.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.params.kind()
    }

    /// Target symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Typed parameters.
    #[must_use]
    pub const fn params(&self) -> &ActionParams {
        &self.params
    }

    /// Quote amount a buy would spend.
    #[must_use]
    pub const fn quote_amount(&self) -> Option<Decimal> {
        match &self.params {
            ActionParams::Buy(p) | ActionParams::PeriodicBuy(p) => Some(p.quote_usdt),
            _ => None,
        }
    }

    /// Committed price of a buy, when the oracle supplied one.
    #[must_use]
    pub const fn expected_buy_price(&self) -> Option<Decimal> {
        match &self.params {
            ActionParams::Buy(p) | ActionParams::PeriodicBuy(p) => p.expected_price,
            _ => None,
        }
    }
}

impl fmt::Display for ActionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.symbol)
    }
}

impl TryFrom<WireAction> for ActionRequest {
    type Error = ActionDecodeError;

    fn try_from(wire: WireAction) -> Result<Self, Self::Error> {
        Self::decode(wire.kind, wire.symbol, wire.parameters)
    }
}

impl From<ActionRequest> for WireAction {
    fn from(action: ActionRequest) -> Self {
        Self {
            kind: action.kind(),
            parameters: action.params.to_value(),
            symbol: action.symbol,
        }
    }
}
