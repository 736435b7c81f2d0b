//! Exchange Port (Driven Port)
//!
//! Spot exchange used for prices, balances and market orders. Adapters are
//! expected to handle retry, rate limiting and idempotent submission
//! themselves; callers treat every call as already resilient.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::shared::{OrderId, OrderSide, Symbol};

/// Exchange errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// Connection error.
    #[error("Exchange connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// Order rejected by the exchange.
    #[error("Order rejected: {reason}")]
    OrderRejected {
        /// Rejection reason.
        reason: String,
    },

    /// Symbol not listed.
    #[error("Unknown symbol: {symbol}")]
    UnknownSymbol {
        /// The requested symbol.
        symbol: String,
    },

    /// Rate limited.
    #[error("Rate limited by exchange")]
    RateLimited,

    /// Unknown error.
    #[error("Exchange error: {message}")]
    Unknown {
        /// Error details.
        message: String,
    },
}

/// Port for exchange interactions.
#[async_trait]
pub trait ExchangePort: Send + Sync {
    /// Last traded price of `symbol`.
    async fn get_price(&self, symbol: &Symbol) -> Result<Decimal, ExchangeError>;

    /// Free balance of `asset` (e.g. `USDT`, `BTC`).
    async fn get_balance(&self, asset: &str) -> Result<Decimal, ExchangeError>;

    /// Place a market order for `quantity` of the base asset.
    async fn place_market_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderId, ExchangeError>;
}
