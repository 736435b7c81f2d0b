//! Shared Value Objects
//!
//! Immutable domain types used across bounded contexts.

mod identifiers;
mod order_side;
mod symbol;

pub use identifiers::{CircuitBreakerEventId, CycleId, DecisionId, OrderId, ViolationRecordId};
pub use order_side::OrderSide;
pub use symbol::{QUOTE_ASSET, Symbol};
