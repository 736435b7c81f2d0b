//! Execution layer.
//!
//! Turns approved actions into market orders behind the kill switch, policy,
//! price and slippage gates.

mod error;
mod executor;
mod price_failover;
mod slippage_guard;
mod types;

pub use error::ExecutionError;
pub use executor::Executor;
pub use price_failover::{DEFAULT_PRICE_CACHE_TTL, DEFAULT_SOURCE_TIMEOUT, PriceError, PriceFailover};
pub use slippage_guard::{DEFAULT_SLIPPAGE_THRESHOLD, SlippageError, SlippageGuard};
pub use types::{ExecutionRequest, ExecutionResult};
