//! Execution errors.
//!
//! Each gate fails with its own variant so callers can tell a blocked
//! action from a failed one. [`ExecutionError::code`] maps every variant to
//! a stable [`ErrorCode`] tag.

use rust_decimal::Decimal;
use thiserror::Error;

use super::price_failover::PriceError;
use super::slippage_guard::SlippageError;
use crate::application::ports::ExchangeError;
use crate::domain::decision::ActionKind;
use crate::domain::policy::{PolicyError, Violation};
use crate::error::ErrorCode;

/// Why an action was not executed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    /// Kill switch engaged.
    #[error("kill switch active: {reason}")]
    KillSwitchActive {
        /// Reason recorded at activation.
        reason: String,
    },

    /// Policy rejected the action.
    #[error("policy violation: {}", summarize(.violations))]
    PolicyViolation {
        /// Critical violations found.
        violations: Vec<Violation>,
    },

    /// Policy could not be evaluated.
    #[error("policy check failed: {0}")]
    Policy(#[from] PolicyError),

    /// No usable price.
    #[error(transparent)]
    PriceUnavailable(#[from] PriceError),

    /// Slippage check failed.
    #[error(transparent)]
    Slippage(#[from] SlippageError),

    /// Balance too small.
    #[error("insufficient {asset}: required {required}, available {available}")]
    InsufficientFunds {
        /// Asset that was short.
        asset: String,
        /// Amount needed.
        required: Decimal,
        /// Amount held.
        available: Decimal,
    },

    /// Grid placement belongs to the grid strategy component.
    #[error("grid actions require the grid strategy component")]
    GridRequiresStrategy,

    /// Kind is handled by a strategy component, not the executor.
    #[error("action '{kind}' is not executed directly")]
    UnsupportedAction {
        /// The action kind.
        kind: ActionKind,
    },

    /// Exchange call failed.
    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),
}

impl ExecutionError {
    /// Stable tag for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::KillSwitchActive { .. } => ErrorCode::KillSwitchActive,
            Self::PolicyViolation { .. } => ErrorCode::PolicyViolation,
            Self::Policy(_) => ErrorCode::StorageError,
            Self::PriceUnavailable(_) => ErrorCode::PriceUnavailable,
            Self::Slippage(SlippageError::Exceeded { .. }) => ErrorCode::SlippageExceeded,
            Self::Slippage(_) => ErrorCode::InvalidAction,
            Self::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            Self::GridRequiresStrategy => ErrorCode::GridRequiresStrategy,
            Self::UnsupportedAction { .. } => ErrorCode::UnsupportedAction,
            Self::Exchange(_) => ErrorCode::ExchangeError,
        }
    }

    /// Whether a safety gate stopped the action before any exchange call.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        matches!(
            self,
            Self::KillSwitchActive { .. }
                | Self::PolicyViolation { .. }
                | Self::PriceUnavailable(_)
                | Self::Slippage(_)
        )
    }
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
