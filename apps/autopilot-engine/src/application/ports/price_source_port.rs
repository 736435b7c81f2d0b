//! Price Source Port (Driven Port)
//!
//! A single source of current prices. Several sources are chained by the
//! price failover.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use super::exchange_port::{ExchangeError, ExchangePort};
use crate::domain::shared::Symbol;

/// Price source errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceSourceError {
    /// Source has no price for the symbol.
    #[error("no price for {symbol}")]
    NotAvailable {
        /// The requested symbol.
        symbol: String,
    },

    /// Source returned a non-positive price.
    #[error("invalid price {price} for {symbol}")]
    InvalidPrice {
        /// The requested symbol.
        symbol: String,
        /// The price returned.
        price: Decimal,
    },

    /// Source failed.
    #[error("price source failed: {0}")]
    Source(String),
}

impl From<ExchangeError> for PriceSourceError {
    fn from(err: ExchangeError) -> Self {
        Self::Source(err.to_string())
    }
}

/// Port for price lookups.
#[async_trait]
pub trait PriceSourcePort: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &str;

    /// Current price of `symbol`.
    async fn get_price(&self, symbol: &Symbol) -> Result<Decimal, PriceSourceError>;
}

/// Exposes an exchange as a price source.
pub struct ExchangePriceSource<E: ExchangePort> {
    name: String,
    exchange: Arc<E>,
}

impl<E: ExchangePort> ExchangePriceSource<E> {
    /// Wrap `exchange` under `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, exchange: Arc<E>) -> Self {
        Self {
            name: name.into(),
            exchange,
        }
    }
}

#[async_trait]
impl<E: ExchangePort> PriceSourcePort for ExchangePriceSource<E> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_price(&self, symbol: &Symbol) -> Result<Decimal, PriceSourceError> {
        let price = self.exchange.get_price(symbol).await?;
        if price <= Decimal::ZERO {
            return Err(PriceSourceError::InvalidPrice {
                symbol: symbol.to_string(),
                price,
            });
        }
        Ok(price)
    }
}
