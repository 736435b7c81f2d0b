//! Execution layer configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Execution section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Maximum age, in seconds, of a cached price served when all sources fail.
    #[serde(default = "default_price_cache_ttl_secs")]
    pub price_cache_ttl_secs: u64,
    /// Deadline, in seconds, of a single price source call.
    #[serde(default = "default_price_source_timeout_secs")]
    pub price_source_timeout_secs: u64,
    /// Simulated exchange used by the binary.
    #[serde(default)]
    pub paper: PaperExchangeSettings,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            price_cache_ttl_secs: default_price_cache_ttl_secs(),
            price_source_timeout_secs: default_price_source_timeout_secs(),
            paper: PaperExchangeSettings::default(),
        }
    }
}

impl ExecutionSettings {
    /// Price cache TTL.
    #[must_use]
    pub const fn price_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.price_cache_ttl_secs)
    }

    /// Per-source price timeout.
    #[must_use]
    pub const fn price_source_timeout(&self) -> Duration {
        Duration::from_secs(self.price_source_timeout_secs)
    }
}

/// Paper exchange seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperExchangeSettings {
    /// Starting USDT balance.
    #[serde(default = "default_quote_balance")]
    pub quote_balance: Decimal,
    /// Starting prices by symbol.
    #[serde(default)]
    pub prices: BTreeMap<String, Decimal>,
}

impl Default for PaperExchangeSettings {
    fn default() -> Self {
        Self {
            quote_balance: default_quote_balance(),
            prices: BTreeMap::new(),
        }
    }
}

const fn default_price_cache_ttl_secs() -> u64 {
    5 * 60
}

const fn default_price_source_timeout_secs() -> u64 {
    10
}

fn default_quote_balance() -> Decimal {
    dec!(1000)
}
