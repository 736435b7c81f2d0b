//! Portfolio read models.
//!
//! Balances and trades as reported by storage. The core never writes these;
//! it only derives risk metrics and portfolio snapshots from them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{OrderSide, Symbol};

/// Holding of a single asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Trading pair the holding is tracked under.
    pub symbol: Symbol,
    /// Base asset quantity held.
    pub quantity: Decimal,
    /// Volume-weighted average entry price.
    pub avg_entry_price: Decimal,
    /// Quote capital currently invested.
    pub total_invested: Decimal,
    /// Profit realized from sells so far.
    pub realized_profit: Decimal,
    /// Mark-to-market PnL of the open quantity.
    pub unrealized_pnl: Decimal,
}

impl Balance {
    /// Create a balance with no realized or unrealized PnL.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, quantity: Decimal, avg_entry_price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            avg_entry_price,
            total_invested: quantity.saturating_mul(avg_entry_price),
            realized_profit: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
        }
    }

    /// Set the unrealized PnL.
    #[must_use]
    pub fn with_unrealized_pnl(mut self, pnl: Decimal) -> Self {
        self.unrealized_pnl = pnl;
        self
    }
}

/// An executed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Trading pair.
    pub symbol: Symbol,
    /// Buy or sell.
    pub side: OrderSide,
    /// Base quantity filled.
    pub quantity: Decimal,
    /// Fill price.
    pub price: Decimal,
    /// Realized PnL of the trade (zero for buys).
    #[serde(default)]
    pub realized_pnl: Decimal,
    /// Fill time.
    pub executed_at: DateTime<Utc>,
}

impl TradeRecord {
    /// Quote value of the trade.
    #[must_use]
    pub fn quote_amount(&self) -> Decimal {
        self.quantity * self.price
    }
}
