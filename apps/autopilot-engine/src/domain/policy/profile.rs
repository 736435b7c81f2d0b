//! Risk profile aggregate.
//!
//! A [`Policy`] is loaded once per process from a named profile and shared
//! read-only afterwards. Reloading means building a new instance.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::circuit_breaker::{BreakerAction, CircuitBreakerKind, CircuitBreakerRule};
use super::errors::PolicyError;

/// Limits of a single risk profile, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyLimits {
    /// Largest quote amount a single buy may spend.
    pub max_order_usdt: Decimal,
    /// Largest capital a single position (or grid) may tie up.
    pub max_position_usdt: Decimal,
    /// Ceiling on total invested capital across all assets.
    pub max_total_exposure: Decimal,
    /// Realized loss over the trailing 24 hours that blocks new orders.
    pub max_daily_loss_usdt: Decimal,
    /// Trade-rate cap; the daily ceiling is `trades_per_hour * 24`.
    pub trades_per_hour: u32,
    /// Maximum accepted slippage, in percent.
    pub slippage_threshold: Decimal,
    /// Circuit breaker rules evaluated before every validation.
    #[serde(default)]
    pub circuit_breakers: Vec<CircuitBreakerRule>,
}

impl PolicyLimits {
    /// Small orders, tight breakers.
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            max_order_usdt: dec!(50),
            max_position_usdt: dec!(500),
            max_total_exposure: dec!(1500),
            max_daily_loss_usdt: dec!(50),
            trades_per_hour: 2,
            slippage_threshold: dec!(0.5),
            circuit_breakers: vec![
                CircuitBreakerRule::new(CircuitBreakerKind::Drawdown, dec!(5), BreakerAction::Pause),
                CircuitBreakerRule::new(CircuitBreakerKind::DailyLoss, dec!(50), BreakerAction::Pause),
                CircuitBreakerRule::new(
                    CircuitBreakerKind::Volatility,
                    dec!(5),
                    BreakerAction::Conservative,
                ),
            ],
        }
    }

    /// Default profile.
    #[must_use]
    pub fn balanced() -> Self {
        Self {
            max_order_usdt: dec!(100),
            max_position_usdt: dec!(1000),
            max_total_exposure: dec!(3000),
            max_daily_loss_usdt: dec!(100),
            trades_per_hour: 4,
            slippage_threshold: dec!(1),
            circuit_breakers: vec![
                CircuitBreakerRule::new(CircuitBreakerKind::Drawdown, dec!(10), BreakerAction::Pause),
                CircuitBreakerRule::new(CircuitBreakerKind::DailyLoss, dec!(100), BreakerAction::Pause),
                CircuitBreakerRule::new(
                    CircuitBreakerKind::Volatility,
                    dec!(8),
                    BreakerAction::Conservative,
                ),
            ],
        }
    }

    /// Larger orders, wider breakers, kill switch on deep drawdown.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            max_order_usdt: dec!(250),
            max_position_usdt: dec!(2500),
            max_total_exposure: dec!(7500),
            max_daily_loss_usdt: dec!(250),
            trades_per_hour: 8,
            slippage_threshold: dec!(2),
            circuit_breakers: vec![
                CircuitBreakerRule::new(
                    CircuitBreakerKind::Drawdown,
                    dec!(20),
                    BreakerAction::KillSwitch,
                ),
                CircuitBreakerRule::new(CircuitBreakerKind::DailyLoss, dec!(250), BreakerAction::Pause),
                CircuitBreakerRule::new(CircuitBreakerKind::Volatility, dec!(12), BreakerAction::Pause),
            ],
        }
    }

    /// Built-in profile by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "conservative" => Some(Self::conservative()),
            "balanced" => Some(Self::balanced()),
            "aggressive" => Some(Self::aggressive()),
            _ => None,
        }
    }

    /// Check that every limit is usable.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let positive = [
            ("max_order_usdt", self.max_order_usdt),
            ("max_position_usdt", self.max_position_usdt),
            ("max_total_exposure", self.max_total_exposure),
            ("max_daily_loss_usdt", self.max_daily_loss_usdt),
        ];
        for (field, value) in positive {
            if value <= Decimal::ZERO {
                return Err(PolicyError::InvalidPolicy {
                    field: field.to_string(),
                    message: format!("must be positive, got {value}"),
                });
            }
        }

        if self.trades_per_hour == 0 {
            return Err(PolicyError::InvalidPolicy {
                field: "trades_per_hour".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.slippage_threshold <= Decimal::ZERO || self.slippage_threshold > Decimal::ONE_HUNDRED
        {
            return Err(PolicyError::InvalidPolicy {
                field: "slippage_threshold".to_string(),
                message: format!("must be in (0, 100], got {}", self.slippage_threshold),
            });
        }

        for (i, rule) in self.circuit_breakers.iter().enumerate() {
            if rule.threshold <= Decimal::ZERO {
                return Err(PolicyError::InvalidPolicy {
                    field: format!("circuit_breakers[{i}].threshold"),
                    message: format!("must be positive, got {}", rule.threshold),
                });
            }
        }

        Ok(())
    }
}

/// Risk profile in force for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Policy {
    profile_name: String,
    #[serde(flatten)]
    limits: PolicyLimits,
}

impl Policy {
    /// Create a policy from validated limits.
    pub fn new(profile_name: impl Into<String>, limits: PolicyLimits) -> Result<Self, PolicyError> {
        limits.validate()?;
        Ok(Self {
            profile_name: profile_name.into(),
            limits,
        })
    }

    /// Name of the profile this policy was loaded from.
    #[must_use]
    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    /// All configured limits.
    #[must_use]
    pub const fn limits(&self) -> &PolicyLimits {
        &self.limits
    }

    /// Maximum quote amount per order.
    #[must_use]
    pub const fn max_order_usdt(&self) -> Decimal {
        self.limits.max_order_usdt
    }

    /// Maximum capital per position.
    #[must_use]
    pub const fn max_position_usdt(&self) -> Decimal {
        self.limits.max_position_usdt
    }

    /// Maximum total exposure.
    #[must_use]
    pub const fn max_total_exposure(&self) -> Decimal {
        self.limits.max_total_exposure
    }

    /// Maximum trailing-24h realized loss.
    #[must_use]
    pub const fn max_daily_loss_usdt(&self) -> Decimal {
        self.limits.max_daily_loss_usdt
    }

    /// Daily trade ceiling derived from the hourly cap.
    #[must_use]
    pub const fn max_daily_trades(&self) -> u32 {
        self.limits.trades_per_hour.saturating_mul(24)
    }

    /// Initial slippage threshold, in percent.
    #[must_use]
    pub const fn slippage_threshold(&self) -> Decimal {
        self.limits.slippage_threshold
    }

    /// Configured circuit breaker rules.
    #[must_use]
    pub fn circuit_breakers(&self) -> &[CircuitBreakerRule] {
        &self.limits.circuit_breakers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("conservative" ; "conservative profile")]
    #[test_case("balanced" ; "balanced profile")]
    #[test_case("aggressive" ; "aggressive profile")]
    fn builtin_profiles_are_valid(name: &str) {
        let limits = PolicyLimits::builtin(name).unwrap();
        let policy = Policy::new(name, limits).unwrap();
        assert_eq!(policy.profile_name(), name);
        assert!(!policy.circuit_breakers().is_empty());
    }

    #[test]
    fn unknown_builtin_is_none() {
        assert!(PolicyLimits::builtin("yolo").is_none());
    }

    #[test]
    fn zero_order_limit_is_rejected() {
        let limits = PolicyLimits {
            max_order_usdt: Decimal::ZERO,
            ..PolicyLimits::balanced()
        };
        let err = Policy::new("broken", limits).unwrap_err();
        assert!(err.to_string().contains("max_order_usdt"));
    }

    #[test]
    fn slippage_threshold_above_hundred_is_rejected() {
        let limits = PolicyLimits {
            slippage_threshold: dec!(101),
            ..PolicyLimits::balanced()
        };
        assert!(Policy::new("broken", limits).is_err());
    }

    #[test]
    fn daily_trade_ceiling_is_hourly_cap_times_24() {
        let policy = Policy::new("balanced", PolicyLimits::balanced()).unwrap();
        assert_eq!(policy.max_daily_trades(), 96);
    }

    #[test]
    fn limits_deserialize_from_yaml() {
        let yaml = r"
max_order_usdt: 100
max_position_usdt: 1000
max_total_exposure: 3000
max_daily_loss_usdt: 100
trades_per_hour: 4
slippage_threshold: 1.5
circuit_breakers:
  - kind: drawdown
    threshold: 10
    action: pause
  - kind: volatility
    threshold: 8
";
        let limits: PolicyLimits = serde_yaml_bw::from_str(yaml).unwrap();
        assert_eq!(limits.max_order_usdt, dec!(100));
        assert_eq!(limits.slippage_threshold, dec!(1.5));
        assert_eq!(limits.circuit_breakers.len(), 2);
        assert_eq!(limits.circuit_breakers[1].action, BreakerAction::Pause);
    }
}
