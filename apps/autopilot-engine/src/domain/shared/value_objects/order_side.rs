//! Order side value object.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a market order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    /// Spend quote asset to acquire base asset.
    Buy,
    /// Sell base asset for quote asset.
    Sell,
}

impl OrderSide {
    /// Wire representation used by exchanges.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
