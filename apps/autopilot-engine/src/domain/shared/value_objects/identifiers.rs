//! Strongly-typed identifiers for persisted records.
//!
//! These prevent mixing up IDs from different contexts.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a new unique identifier using UUID v4.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(OrderId, "Exchange-assigned identifier for a placed order.");
define_id!(DecisionId, "Unique identifier for an oracle decision.");
define_id!(CycleId, "Unique identifier for a decision cycle.");
define_id!(
    CircuitBreakerEventId,
    "Unique identifier for a circuit breaker event."
);
define_id!(ViolationRecordId, "Unique identifier for a persisted policy violation.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = DecisionId::generate();
        let b = DecisionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn id_serializes_transparently() {
        let id = OrderId::new("ord-42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ord-42\"");
        assert_eq!(id.to_string(), "ord-42");
    }
}
