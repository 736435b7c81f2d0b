//! Market Data Port (Driven Port)
//!
//! Market conditions and news used as decision context, and the volatility
//! reading the volatility circuit breaker watches.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::decision::{MarketConditions, NewsSignal};

/// Market data errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketDataError {
    /// Provider unreachable.
    #[error("market data unavailable: {0}")]
    Unavailable(String),
}

/// Port for market data.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Current market conditions.
    async fn market_conditions(&self) -> Result<MarketConditions, MarketDataError>;

    /// News published at or after `since`.
    async fn recent_news(&self, since: DateTime<Utc>) -> Result<Vec<NewsSignal>, MarketDataError>;
}
