//! Circuit breaker rules and events.
//!
//! Breakers are evaluated as a pure function of [`RiskMetrics`]. A tripped
//! breaker yields a [`CircuitBreakerEvent`] whose pause window blocks every
//! decision cycle until it elapses and a cycle observes the elapse.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::metrics::RiskMetrics;
use crate::domain::shared::CircuitBreakerEventId;

/// Risk metric a breaker watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitBreakerKind {
    /// Unrealized drawdown, in percent of exposure.
    Drawdown,
    /// Realized loss over the trailing 24 hours, in USDT.
    DailyLoss,
    /// Market volatility, in percent.
    Volatility,
}

impl CircuitBreakerKind {
    /// How long cycles stay paused after this kind trips.
    #[must_use]
    pub fn pause_duration(self) -> Duration {
        match self {
            Self::Drawdown => Duration::hours(1),
            Self::DailyLoss => Duration::hours(24),
            Self::Volatility => Duration::minutes(30),
        }
    }

    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Drawdown => "drawdown",
            Self::DailyLoss => "daily_loss",
            Self::Volatility => "volatility",
        }
    }

    fn observed(self, metrics: &RiskMetrics) -> Decimal {
        match self {
            Self::Drawdown => metrics.current_drawdown,
            Self::DailyLoss => metrics.daily_loss,
            Self::Volatility => metrics.volatility,
        }
    }

    fn describe(self, observed: Decimal, threshold: Decimal) -> String {
        match self {
            Self::Drawdown => format!("drawdown {observed:.2}% >= {threshold:.2}%"),
            Self::DailyLoss => format!("daily loss {observed:.2} USDT >= {threshold:.2} USDT"),
            Self::Volatility => format!("volatility {observed:.2}% >= {threshold:.2}%"),
        }
    }
}

impl fmt::Display for CircuitBreakerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens beyond the pause when a breaker trips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerAction {
    /// Pause decision cycles for the kind's window.
    #[default]
    Pause,
    /// Pause, and drop a `full` orchestrator to `pilot`.
    Conservative,
    /// Pause, and engage the kill switch (manual reset required).
    #[serde(alias = "killswitch")]
    KillSwitch,
}

impl fmt::Display for BreakerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pause => write!(f, "pause"),
            Self::Conservative => write!(f, "conservative"),
            Self::KillSwitch => write!(f, "kill_switch"),
        }
    }
}

/// A configured breaker: trips when the watched metric reaches `threshold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerRule {
    /// Metric watched.
    pub kind: CircuitBreakerKind,
    /// Inclusive trip threshold.
    pub threshold: Decimal,
    /// Follow-up action on trip.
    #[serde(default)]
    pub action: BreakerAction,
}

impl CircuitBreakerRule {
    /// Create a new rule.
    #[must_use]
    pub const fn new(kind: CircuitBreakerKind, threshold: Decimal, action: BreakerAction) -> Self {
        Self {
            kind,
            threshold,
            action,
        }
    }
}

/// A tripped breaker. Appended to history and updated once on resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerEvent {
    /// Event identifier.
    pub id: CircuitBreakerEventId,
    /// Metric that tripped.
    pub kind: CircuitBreakerKind,
    /// Follow-up action configured on the rule.
    pub action: BreakerAction,
    /// Observed metric value.
    pub observed: Decimal,
    /// Rule threshold.
    pub threshold: Decimal,
    /// Short human-readable reason.
    pub reason: String,
    /// Snapshot of the metrics at trip time.
    pub details: String,
    /// When the breaker tripped.
    pub triggered_at: DateTime<Utc>,
    /// Cycles are blocked until this instant.
    pub paused_until: DateTime<Utc>,
    /// Set when a cycle observes the elapsed window and resumes.
    pub resumed_at: Option<DateTime<Utc>>,
}

impl CircuitBreakerEvent {
    /// Whether the event still blocks cycles at `now`.
    #[must_use]
    pub fn is_blocking(&self, now: DateTime<Utc>) -> bool {
        self.resumed_at.is_none() && now < self.paused_until
    }

    /// Whether the pause window is over (resumption is permitted).
    #[must_use]
    pub fn window_elapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.paused_until
    }

    /// Mark the event resumed.
    pub fn resume(&mut self, now: DateTime<Utc>) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(now);
        }
    }
}

/// Evaluate `rules` against `metrics`, returning the first rule that trips.
///
/// Pure: nothing is persisted and no state changes. The comparison is
/// inclusive, so a metric exactly at its threshold trips.
#[must_use]
pub fn evaluate_circuit_breakers(
    rules: &[CircuitBreakerRule],
    metrics: &RiskMetrics,
    now: DateTime<Utc>,
) -> Option<CircuitBreakerEvent> {
    rules.iter().find_map(|rule| {
        let observed = rule.kind.observed(metrics);
        (observed >= rule.threshold).then(|| CircuitBreakerEvent {
            id: CircuitBreakerEventId::generate(),
            kind: rule.kind,
            action: rule.action,
            observed,
            threshold: rule.threshold,
            reason: rule.kind.describe(observed, rule.threshold),
            details: metrics.summary(),
            triggered_at: now,
            paused_until: now + rule.kind.pause_duration(),
            resumed_at: None,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    fn metrics_with(drawdown: Decimal, daily_loss: Decimal, volatility: Decimal) -> RiskMetrics {
        RiskMetrics {
            current_drawdown: drawdown,
            daily_loss,
            volatility,
            ..RiskMetrics::empty(Utc::now())
        }
    }

    fn drawdown_rule(threshold: Decimal) -> Vec<CircuitBreakerRule> {
        vec![CircuitBreakerRule::new(
            CircuitBreakerKind::Drawdown,
            threshold,
            BreakerAction::Pause,
        )]
    }

    #[test]
    fn drawdown_at_threshold_trips() {
        let now = Utc::now();
        let metrics = metrics_with(dec!(10), Decimal::ZERO, Decimal::ZERO);
        let event = evaluate_circuit_breakers(&drawdown_rule(dec!(10)), &metrics, now).unwrap();

        assert_eq!(event.kind, CircuitBreakerKind::Drawdown);
        assert_eq!(event.reason, "drawdown 10.00% >= 10.00%");
        assert_eq!(event.paused_until, now + Duration::hours(1));
        assert!(event.resumed_at.is_none());
    }

    #[test]
    fn drawdown_one_unit_below_threshold_does_not_trip() {
        let metrics = metrics_with(dec!(9), Decimal::ZERO, Decimal::ZERO);
        assert!(evaluate_circuit_breakers(&drawdown_rule(dec!(10)), &metrics, Utc::now()).is_none());
    }

    #[test_case(CircuitBreakerKind::Drawdown, Duration::hours(1) ; "drawdown pauses one hour")]
    #[test_case(CircuitBreakerKind::DailyLoss, Duration::hours(24) ; "daily loss pauses one day")]
    #[test_case(CircuitBreakerKind::Volatility, Duration::minutes(30) ; "volatility pauses thirty minutes")]
    fn pause_window_per_kind(kind: CircuitBreakerKind, expected: Duration) {
        let now = Utc::now();
        let rules = vec![CircuitBreakerRule::new(kind, dec!(1), BreakerAction::Pause)];
        let metrics = metrics_with(dec!(5), dec!(5), dec!(5));
        let event = evaluate_circuit_breakers(&rules, &metrics, now).unwrap();
        assert_eq!(event.paused_until - event.triggered_at, expected);
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = vec![
            CircuitBreakerRule::new(CircuitBreakerKind::Volatility, dec!(50), BreakerAction::Pause),
            CircuitBreakerRule::new(CircuitBreakerKind::DailyLoss, dec!(10), BreakerAction::KillSwitch),
            CircuitBreakerRule::new(CircuitBreakerKind::Drawdown, dec!(1), BreakerAction::Pause),
        ];
        let metrics = metrics_with(dec!(3), dec!(20), dec!(1));
        let event = evaluate_circuit_breakers(&rules, &metrics, Utc::now()).unwrap();
        assert_eq!(event.kind, CircuitBreakerKind::DailyLoss);
        assert_eq!(event.action, BreakerAction::KillSwitch);
    }

    #[test]
    fn event_blocks_until_window_elapses() {
        let now = Utc::now();
        let metrics = metrics_with(dec!(12), Decimal::ZERO, Decimal::ZERO);
        let mut event = evaluate_circuit_breakers(&drawdown_rule(dec!(10)), &metrics, now).unwrap();

        assert!(event.is_blocking(now + Duration::minutes(59)));
        assert!(!event.window_elapsed(now + Duration::minutes(59)));

        let later = now + Duration::hours(1);
        assert!(!event.is_blocking(later));
        assert!(event.window_elapsed(later));
        assert!(event.resumed_at.is_none());

        event.resume(later);
        assert_eq!(event.resumed_at, Some(later));
    }

    #[test]
    fn kill_switch_action_accepts_legacy_spelling() {
        let action: BreakerAction = serde_json::from_str("\"killswitch\"").unwrap();
        assert_eq!(action, BreakerAction::KillSwitch);
    }
}
