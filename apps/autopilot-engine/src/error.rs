//! Error codes shared across the engine.
//!
//! Every component error exposes a [`ErrorCode`] so callers can branch on a
//! stable tag instead of message text. [`ApiError`] carries a code, a message
//! and key/value context to the control API.
//!
//! # HTTP Status Codes
//!
//! | Code | Status | Usage |
//! |------|--------|-------|
//! | `INVALID_ACTION`, `INVALID_MODE`, `INVALID_REQUEST` | 400 | Malformed input |
//! | `POLICY_VIOLATION`, `CIRCUIT_BREAKER_TRIGGERED`, `KILL_SWITCH_ACTIVE` | 412 | Safety gate closed |
//! | `SLIPPAGE_EXCEEDED`, `INSUFFICIENT_FUNDS` | 422 | Action not executable |
//! | `GRID_REQUIRES_STRATEGY`, `UNSUPPORTED_ACTION` | 501 | Owned by a strategy component |
//! | `ALREADY_RUNNING`, `CYCLE_IN_FLIGHT` | 409 | Conflicting request |
//! | `PRICE_UNAVAILABLE`, `ORACLE_UNAVAILABLE`, `EXCHANGE_ERROR`, `STORAGE_ERROR` | 503 | Dependency failed |
//! | `INTERNAL` | 500 | Unexpected failure |

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Safety gates
    /// Action broke a critical policy limit.
    PolicyViolation,
    /// A circuit breaker is pausing cycles.
    CircuitBreakerTriggered,
    /// Kill switch is engaged.
    KillSwitchActive,

    // Per-action failures
    /// Fill price drifted too far from the committed price.
    SlippageExceeded,
    /// No source could price the symbol.
    PriceUnavailable,
    /// Balance does not cover the order.
    InsufficientFunds,
    /// Grid configuration belongs to the grid strategy.
    GridRequiresStrategy,
    /// Action kind is not executed at this layer.
    UnsupportedAction,

    // Input errors
    /// Action could not be decoded.
    InvalidAction,
    /// Unknown mode string.
    InvalidMode,
    /// Malformed request.
    InvalidRequest,

    // Conflicts
    /// Orchestrator already started.
    AlreadyRunning,
    /// A decision cycle is already in flight.
    CycleInFlight,

    // Dependencies
    /// Oracle failed or returned an unusable decision.
    OracleUnavailable,
    /// Exchange call failed.
    ExchangeError,
    /// Storage call failed.
    StorageError,

    /// Unexpected failure.
    Internal,
}

impl ErrorCode {
    /// HTTP status used by the control API.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidAction | Self::InvalidMode | Self::InvalidRequest => {
                StatusCode::BAD_REQUEST
            }
            Self::PolicyViolation | Self::CircuitBreakerTriggered | Self::KillSwitchActive => {
                StatusCode::PRECONDITION_FAILED
            }
            Self::SlippageExceeded | Self::InsufficientFunds => StatusCode::UNPROCESSABLE_ENTITY,
            Self::GridRequiresStrategy | Self::UnsupportedAction => StatusCode::NOT_IMPLEMENTED,
            Self::AlreadyRunning | Self::CycleInFlight => StatusCode::CONFLICT,
            Self::PriceUnavailable
            | Self::OracleUnavailable
            | Self::ExchangeError
            | Self::StorageError => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Tag string.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::PolicyViolation => "POLICY_VIOLATION",
            Self::CircuitBreakerTriggered => "CIRCUIT_BREAKER_TRIGGERED",
            Self::KillSwitchActive => "KILL_SWITCH_ACTIVE",
            Self::SlippageExceeded => "SLIPPAGE_EXCEEDED",
            Self::PriceUnavailable => "PRICE_UNAVAILABLE",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::GridRequiresStrategy => "GRID_REQUIRES_STRATEGY",
            Self::UnsupportedAction => "UNSUPPORTED_ACTION",
            Self::InvalidAction => "INVALID_ACTION",
            Self::InvalidMode => "INVALID_MODE",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::AlreadyRunning => "ALREADY_RUNNING",
            Self::CycleInFlight => "CYCLE_IN_FLIGHT",
            Self::OracleUnavailable => "ORACLE_UNAVAILABLE",
            Self::ExchangeError => "EXCHANGE_ERROR",
            Self::StorageError => "STORAGE_ERROR",
            Self::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// An error with a code and context, rendered by the control API.
#[derive(Debug, Clone, Error)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    context: Vec<(String, String)>,
}

impl ApiError {
    /// Create a new error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    /// Add context to the error.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the context.
    #[must_use]
    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }

    /// Malformed request.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Unexpected failure.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    /// Convert to the response body.
    #[must_use]
    pub fn to_http_response(&self) -> HttpErrorResponse {
        HttpErrorResponse {
            code: self.code,
            message: self.message.clone(),
            details: self.context.iter().cloned().collect(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.reason(), self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.http_status(), Json(self.to_http_response())).into_response()
    }
}

/// Error body returned by the control API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpErrorResponse {
    /// Error tag.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Additional details.
    pub details: std::collections::BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_http_mapping() {
        assert_eq!(ErrorCode::InvalidMode.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::KillSwitchActive.http_status(),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(ErrorCode::CycleInFlight.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::PriceUnavailable.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn error_code_serializes_as_reason() {
        for code in [
            ErrorCode::GridRequiresStrategy,
            ErrorCode::CircuitBreakerTriggered,
            ErrorCode::Internal,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.reason()));
        }
    }

    #[test]
    fn api_error_carries_context() {
        let error = ApiError::new(ErrorCode::InvalidMode, "bad mode")
            .with_context("value", "turbo");
        let body = error.to_http_response();

        assert_eq!(body.code, ErrorCode::InvalidMode);
        assert_eq!(body.details.get("value").map(String::as_str), Some("turbo"));
        assert_eq!(error.to_string(), "[INVALID_MODE] bad mode");
    }
}
