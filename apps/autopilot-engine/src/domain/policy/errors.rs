//! Policy errors.

use thiserror::Error;

/// Errors raised while loading a policy or validating against it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// A limit in the profile is unusable.
    #[error("invalid policy field '{field}': {message}")]
    InvalidPolicy {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Requested profile does not exist.
    #[error("policy profile '{name}' not found")]
    ProfileNotFound {
        /// Requested profile name.
        name: String,
    },

    /// Risk metrics could not be derived.
    #[error("risk metrics unavailable: {0}")]
    MetricsUnavailable(String),
}
