//! Shared Domain Types
//!
//! Value objects shared across bounded contexts.

pub mod value_objects;

pub use value_objects::{
    CircuitBreakerEventId, CycleId, DecisionId, OrderId, OrderSide, QUOTE_ASSET, Symbol,
    ViolationRecordId,
};
