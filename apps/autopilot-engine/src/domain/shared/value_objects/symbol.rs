//! Symbol value object for spot trading pairs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quote asset every traded pair is priced in.
pub const QUOTE_ASSET: &str = "USDT";

/// A spot trading pair such as `BTCUSDT`.
///
/// The symbol is normalized to uppercase on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_uppercase())
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The base asset of the pair (`BTCUSDT` -> `BTC`).
    ///
    /// Symbols without the quote suffix are returned unchanged.
    #[must_use]
    pub fn base_asset(&self) -> &str {
        match self.0.strip_suffix(QUOTE_ASSET) {
            Some(base) if !base.is_empty() => base,
            _ => &self.0,
        }
    }

    /// Whether the symbol is empty after normalization.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
