//! Fixed market data feed for testing and paper trading.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::application::ports::{MarketDataError, MarketDataPort};
use crate::domain::decision::{MarketConditions, NewsSignal};

/// Market data source that serves whatever it was last told.
#[derive(Debug)]
pub struct StaticMarketData {
    conditions: RwLock<MarketConditions>,
    news: RwLock<Vec<NewsSignal>>,
    unavailable: AtomicBool,
}

impl StaticMarketData {
    /// Serve `conditions` and no news.
    #[must_use]
    pub fn new(conditions: MarketConditions) -> Self {
        Self {
            conditions: RwLock::new(conditions),
            news: RwLock::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Serve `news` as well.
    #[must_use]
    pub fn with_news(self, news: Vec<NewsSignal>) -> Self {
        *self.news.write() = news;
        self
    }

    /// Replace the served conditions.
    pub fn set_conditions(&self, conditions: MarketConditions) {
        *self.conditions.write() = conditions;
    }

    /// Change only the volatility reading.
    pub fn set_volatility(&self, volatility: Decimal) {
        self.conditions.write().volatility = volatility;
    }

    /// Make every call fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), MarketDataError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MarketDataError::Unavailable("static feed disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataPort for StaticMarketData {
    async fn market_conditions(&self) -> Result<MarketConditions, MarketDataError> {
        self.check_available()?;
        Ok(self.conditions.read().clone())
    }

    async fn recent_news(&self, since: DateTime<Utc>) -> Result<Vec<NewsSignal>, MarketDataError> {
        self.check_available()?;
        Ok(self
            .news
            .read()
            .iter()
            .filter(|n| n.published_at >= since)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision::Sentiment;
    use crate::domain::shared::Symbol;
    use rust_decimal_macros::dec;

    fn headline(text: &str, hours_ago: i64) -> NewsSignal {
        NewsSignal {
            headline: text.to_string(),
            sentiment: Sentiment::Bullish,
            sentiment_score: 0.4,
            topics: vec![],
            symbols: vec![Symbol::new("BTCUSDT")],
            published_at: Utc::now() - chrono::Duration::hours(hours_ago),
        }
    }

    #[tokio::test]
    async fn news_outside_window_is_dropped() {
        let feed = StaticMarketData::new(MarketConditions::unavailable(Symbol::new("BTCUSDT")))
            .with_news(vec![headline("fresh", 0), headline("stale", 5)]);

        let news = feed
            .recent_news(Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(news.len(), 1);
        assert_eq!(news[0].headline, "fresh");
    }

    #[tokio::test]
    async fn volatility_can_be_changed_in_place() {
        let feed = StaticMarketData::new(MarketConditions::unavailable(Symbol::new("BTCUSDT")));
        feed.set_volatility(dec!(7.5));

        assert_eq!(feed.market_conditions().await.unwrap().volatility, dec!(7.5));
    }

    #[tokio::test]
    async fn unavailable_feed_errors() {
        let feed = StaticMarketData::new(MarketConditions::unavailable(Symbol::new("BTCUSDT")));
        feed.set_unavailable(true);

        assert!(feed.market_conditions().await.is_err());
    }
}
