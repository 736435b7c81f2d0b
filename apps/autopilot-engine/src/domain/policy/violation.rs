//! Policy violations and validation results.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::circuit_breaker::CircuitBreakerEvent;

/// Which rule a violation comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A circuit breaker tripped; nothing else was checked.
    CircuitBreaker,
    /// Single order larger than the order limit.
    OrderSize,
    /// Order would push total exposure past its ceiling.
    TotalExposure,
    /// Grid capital larger than the position limit.
    PositionSize,
    /// Daily trade ceiling reached.
    TradeFrequency,
    /// Daily realized loss limit reached.
    DailyLoss,
}

impl ViolationKind {
    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CircuitBreaker => "circuit_breaker",
            Self::OrderSize => "order_size",
            Self::TotalExposure => "total_exposure",
            Self::PositionSize => "position_size",
            Self::TradeFrequency => "trade_frequency",
            Self::DailyLoss => "daily_loss",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Violation severity. Only critical violations block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Recorded, does not block.
    Warning,
    /// Blocks the action.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A single broken limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Rule that produced the violation.
    pub kind: ViolationKind,
    /// Configuration name of the limit.
    pub limit_name: String,
    /// Configured limit value.
    pub limit_value: Decimal,
    /// Value the action would have reached.
    pub attempted_value: Decimal,
    /// Severity.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
}

impl Violation {
    /// Create a critical violation.
    #[must_use]
    pub fn critical(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Critical, message)
    }

    /// Create a warning.
    #[must_use]
    pub fn warning(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Warning, message)
    }

    fn new(kind: ViolationKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            limit_name: String::new(),
            limit_value: Decimal::ZERO,
            attempted_value: Decimal::ZERO,
            severity,
            message: message.into(),
        }
    }

    /// Attach the limit that was broken.
    #[must_use]
    pub fn with_limit(mut self, name: impl Into<String>, value: Decimal) -> Self {
        self.limit_name = name.into();
        self.limit_value = value;
        self
    }

    /// Attach the attempted value.
    #[must_use]
    pub fn with_attempted(mut self, value: Decimal) -> Self {
        self.attempted_value = value;
        self
    }

    /// Whether this violation blocks.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.kind, self.message)
    }
}

/// Outcome of validating one action. Built fresh on every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    /// False if any violation is critical.
    pub approved: bool,
    /// Composite risk score in `[0, 1]`.
    pub risk_score: f64,
    /// All violations found.
    pub violations: Vec<Violation>,
    /// When the validation ran.
    pub checked_at: DateTime<Utc>,
    /// Breaker that short-circuited validation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_breaker: Option<CircuitBreakerEvent>,
}

impl ValidationResult {
    /// Build a result; approval is derived from the violations.
    #[must_use]
    pub fn from_violations(violations: Vec<Violation>, risk_score: f64, checked_at: DateTime<Utc>) -> Self {
        let approved = !violations.iter().any(Violation::is_critical);
        Self {
            approved,
            risk_score,
            violations,
            checked_at,
            circuit_breaker: None,
        }
    }

    /// Rejection caused by a tripped circuit breaker.
    #[must_use]
    pub fn circuit_breaker(event: CircuitBreakerEvent, risk_score: f64) -> Self {
        let violation = Violation::critical(
            ViolationKind::CircuitBreaker,
            format!("Circuit breaker triggered: {}", event.reason),
        )
        .with_limit(event.kind.as_str(), event.threshold)
        .with_attempted(event.observed);

        Self {
            approved: false,
            risk_score,
            violations: vec![violation],
            checked_at: event.triggered_at,
            circuit_breaker: Some(event),
        }
    }

    /// Critical violations only.
    pub fn critical_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.is_critical())
    }

    /// Non-blocking violations only.
    pub fn warnings(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| !v.is_critical())
    }

    /// Messages of all violations, joined for logging.
    #[must_use]
    pub fn violation_summary(&self) -> String {
        self.violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn warnings_alone_are_approved() {
        let result = ValidationResult::from_violations(
            vec![Violation::warning(ViolationKind::TradeFrequency, "busy day")],
            0.2,
            Utc::now(),
        );
        assert!(result.approved);
        assert_eq!(result.warnings().count(), 1);
    }

    #[test]
    fn any_critical_rejects() {
        let result = ValidationResult::from_violations(
            vec![
                Violation::warning(ViolationKind::PositionSize, "big grid"),
                Violation::critical(ViolationKind::OrderSize, "too big")
                    .with_limit("max_order_usdt", dec!(100))
                    .with_attempted(dec!(150)),
            ],
            0.1,
            Utc::now(),
        );
        assert!(!result.approved);
        let critical: Vec<_> = result.critical_violations().collect();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].limit_value, dec!(100));
        assert_eq!(critical[0].attempted_value, dec!(150));
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
        assert_eq!(
            serde_json::to_string(&ViolationKind::TotalExposure).unwrap(),
            "\"total_exposure\""
        );
    }
}
