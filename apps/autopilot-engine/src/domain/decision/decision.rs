//! Oracle decisions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::action::ActionRequest;
use super::mode::Mode;
use crate::domain::shared::DecisionId;

/// Most actions a single decision may carry.
pub const MAX_ACTIONS_PER_DECISION: usize = 3;

/// Trading posture chosen by the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    /// Steady accumulation.
    Accumulate,
    /// Ride an established trend.
    TrendFollow,
    /// Trade a sideways range with grids.
    RangeGrid,
    /// Protect capital.
    Defense,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accumulate => write!(f, "ACCUMULATE"),
            Self::TrendFollow => write!(f, "TREND_FOLLOW"),
            Self::RangeGrid => write!(f, "RANGE_GRID"),
            Self::Defense => write!(f, "DEFENSE"),
        }
    }
}

/// Decision rejected at construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecisionError {
    /// Confidence outside `[0, 1]`.
    #[error("confidence {0} outside [0, 1]")]
    ConfidenceOutOfRange(f64),

    /// More actions than a decision may carry.
    #[error("decision carries {count} actions, at most {max} allowed", max = MAX_ACTIONS_PER_DECISION)]
    TooManyActions {
        /// Number of actions received.
        count: usize,
    },
}

/// A decision returned by the oracle. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiDecision {
    id: DecisionId,
    regime: Regime,
    confidence: f64,
    rationale: String,
    actions: Vec<ActionRequest>,
    mode: Mode,
    created_at: DateTime<Utc>,
}

impl AiDecision {
    /// Build a decision, enforcing the confidence range and action cap.
    pub fn new(
        regime: Regime,
        confidence: f64,
        rationale: impl Into<String>,
        actions: Vec<ActionRequest>,
        mode: Mode,
    ) -> Result<Self, DecisionError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(DecisionError::ConfidenceOutOfRange(confidence));
        }
        if actions.len() > MAX_ACTIONS_PER_DECISION {
            return Err(DecisionError::TooManyActions {
                count: actions.len(),
            });
        }
        Ok(Self {
            id: DecisionId::generate(),
            regime,
            confidence,
            rationale: rationale.into(),
            actions,
            mode,
            created_at: Utc::now(),
        })
    }

    /// Decision identifier.
    #[must_use]
    pub const fn id(&self) -> &DecisionId {
        &self.id
    }

    /// Regime.
    #[must_use]
    pub const fn regime(&self) -> Regime {
        self.regime
    }

    /// Confidence in `[0, 1]`.
    #[must_use]
    pub const fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Oracle's rationale.
    #[must_use]
    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    /// Proposed actions, at most three.
    #[must_use]
    pub fn actions(&self) -> &[ActionRequest] {
        &self.actions
    }

    /// Mode the decision was requested in.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// When the decision was received.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
