//! Price failover.
//!
//! Resolves a current price by trying the primary source, then each fallback
//! in registration order, then a per-symbol cache of the last good price.
//! A cache entry older than the TTL is never served.
//!
//! Every successful live fetch refreshes the cache. Each source call is
//! bounded by its own timeout so a hung source costs at most that long
//! before the next one is tried.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::application::ports::{PriceSourceError, PriceSourcePort};
use crate::domain::shared::Symbol;
use crate::observability;

/// Default maximum age of a cached price.
pub const DEFAULT_PRICE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Default timeout of a single source call.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Price resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// Every source failed and nothing was cached.
    #[error("price unavailable for {symbol}: {sources_tried} sources failed, last error: {last_error}")]
    Unavailable {
        /// The requested symbol.
        symbol: String,
        /// Number of live sources tried.
        sources_tried: usize,
        /// Error of the last source tried.
        last_error: String,
    },

    /// Every source failed and the cached price is too old.
    #[error("price unavailable for {symbol}: cached price is {age_secs}s old (ttl {ttl_secs}s)")]
    StaleCache {
        /// The requested symbol.
        symbol: String,
        /// Age of the cached price.
        age_secs: u64,
        /// TTL in force.
        ttl_secs: u64,
    },
}

#[derive(Debug, Clone, Copy)]
struct CachedPrice {
    price: Decimal,
    fetched_at: Instant,
}

/// Ordered chain of price sources with a last-known-price cache.
pub struct PriceFailover {
    primary: Arc<dyn PriceSourcePort>,
    fallbacks: RwLock<Vec<Arc<dyn PriceSourcePort>>>,
    cache: RwLock<HashMap<Symbol, CachedPrice>>,
    cache_ttl: Duration,
    source_timeout: Duration,
}

impl std::fmt::Debug for PriceFailover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceFailover")
            .field("primary", &self.primary.name())
            .field("fallbacks", &self.fallbacks.read().len())
            .field("cached_symbols", &self.cache.read().len())
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

impl PriceFailover {
    /// Create a failover chain with only a primary source.
    #[must_use]
    pub fn new(primary: Arc<dyn PriceSourcePort>) -> Self {
        Self {
            primary,
            fallbacks: RwLock::new(Vec::new()),
            cache: RwLock::new(HashMap::new()),
            cache_ttl: DEFAULT_PRICE_CACHE_TTL,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }

    /// Set the cache TTL.
    #[must_use]
    pub const fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the per-source timeout.
    #[must_use]
    pub const fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Append a fallback source. Safe to call while lookups are running.
    pub fn add_fallback_source(&self, source: Arc<dyn PriceSourcePort>) {
        tracing::info!(source = source.name(), "Registered fallback price source");
        self.fallbacks.write().push(source);
    }

    /// Number of registered fallback sources.
    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.read().len()
    }

    /// Resolve the current price of `symbol`.
    pub async fn get_price(&self, symbol: &Symbol) -> Result<Decimal, PriceError> {
        let mut sources_tried = 0;
        let mut last_error = String::new();

        sources_tried += 1;
        match self.fetch(self.primary.as_ref(), symbol).await {
            Ok(price) => {
                observability::record_price_source("primary");
                self.store(symbol, price);
                return Ok(price);
            }
            Err(e) => {
                tracing::warn!(
                    source = self.primary.name(),
                    symbol = %symbol,
                    error = %e,
                    "Primary price source failed"
                );
                last_error = e.to_string();
            }
        }

        // Snapshot so no lock is held across an await.
        let fallbacks = self.fallbacks.read().clone();
        for (index, source) in fallbacks.iter().enumerate() {
            sources_tried += 1;
            match self.fetch(source.as_ref(), symbol).await {
                Ok(price) => {
                    tracing::warn!(
                        source = source.name(),
                        symbol = %symbol,
                        %price,
                        "Using fallback source #{}",
                        index + 1
                    );
                    observability::record_price_source("fallback");
                    self.store(symbol, price);
                    return Ok(price);
                }
                Err(e) => {
                    tracing::warn!(
                        source = source.name(),
                        symbol = %symbol,
                        error = %e,
                        "Fallback price source #{} failed",
                        index + 1
                    );
                    last_error = e.to_string();
                }
            }
        }

        self.from_cache(symbol, sources_tried, last_error)
    }

    /// Last cached price of `symbol` and its age, regardless of TTL.
    #[must_use]
    pub fn cached_price(&self, symbol: &Symbol) -> Option<(Decimal, Duration)> {
        self.cache
            .read()
            .get(symbol)
            .map(|entry| (entry.price, entry.fetched_at.elapsed()))
    }

    async fn fetch(&self, source: &dyn PriceSourcePort, symbol: &Symbol) -> Result<Decimal, PriceSourceError> {
        let price = tokio::time::timeout(self.source_timeout, source.get_price(symbol))
            .await
            .map_err(|_| {
                PriceSourceError::Source(format!(
                    "timed out after {}ms",
                    self.source_timeout.as_millis()
                ))
            })??;

        if price <= Decimal::ZERO {
            return Err(PriceSourceError::InvalidPrice {
                symbol: symbol.to_string(),
                price,
            });
        }
        Ok(price)
    }

    fn store(&self, symbol: &Symbol, price: Decimal) {
        self.cache.write().insert(
            symbol.clone(),
            CachedPrice {
                price,
                fetched_at: Instant::now(),
            },
        );
    }

    fn from_cache(&self, symbol: &Symbol, sources_tried: usize, last_error: String) -> Result<Decimal, PriceError> {
        let Some(entry) = self.cache.read().get(symbol).copied() else {
            observability::record_price_source("unavailable");
            tracing::error!(symbol = %symbol, sources_tried, "All price sources failed and no cached price");
            return Err(PriceError::Unavailable {
                symbol: symbol.to_string(),
                sources_tried,
                last_error,
            });
        };

        let age = entry.fetched_at.elapsed();
        if age >= self.cache_ttl {
            observability::record_price_source("unavailable");
            tracing::error!(
                symbol = %symbol,
                age_secs = age.as_secs(),
                "All price sources failed and cached price is stale"
            );
            return Err(PriceError::StaleCache {
                symbol: symbol.to_string(),
                age_secs: age.as_secs(),
                ttl_secs: self.cache_ttl.as_secs(),
            });
        }

        tracing::warn!(
            symbol = %symbol,
            price = %entry.price,
            age_secs = age.as_secs(),
            "Using cached price"
        );
        observability::record_price_source("cache");
        Ok(entry.price)
    }

    #[cfg(test)]
    pub(crate) fn seed_cache(&self, symbol: &Symbol, price: Decimal, age: Duration) {
        let fetched_at = Instant::now().checked_sub(age).unwrap_or_else(Instant::now);
        self.cache.write().insert(symbol.clone(), CachedPrice { price, fetched_at });
    }
}
