//! Orchestrator run mode.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operating posture of the orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Decide and log, never execute.
    #[default]
    Shadow,
    /// Execute with halved risk limits.
    Pilot,
    /// Execute at the configured limits.
    Full,
}

impl Mode {
    /// Whether approved actions are sent to the executor.
    #[must_use]
    pub const fn executes(self) -> bool {
        !matches!(self, Self::Shadow)
    }

    /// Factor applied to the risk limits handed to the oracle.
    #[must_use]
    pub fn limit_scale(self) -> Decimal {
        match self {
            Self::Pilot => dec!(0.5),
            Self::Shadow | Self::Full => Decimal::ONE,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shadow => "shadow",
            Self::Pilot => "pilot",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected mode string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid mode '{0}': expected one of shadow, pilot, full")]
pub struct ModeParseError(pub String);

impl FromStr for Mode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shadow" => Ok(Self::Shadow),
            "pilot" => Ok(Self::Pilot),
            "full" => Ok(Self::Full),
            _ => Err(ModeParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("shadow", Mode::Shadow ; "shadow")]
    #[test_case("PILOT", Mode::Pilot ; "uppercase pilot")]
    #[test_case(" full ", Mode::Full ; "padded full")]
    fn parses_valid_modes(raw: &str, expected: Mode) {
        assert_eq!(raw.parse::<Mode>().unwrap(), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("live" ; "unknown word")]
    #[test_case("shadowy" ; "prefix match")]
    fn rejects_invalid_modes(raw: &str) {
        let err = raw.parse::<Mode>().unwrap_err();
        assert_eq!(err.0, raw);
    }

    #[test]
    fn only_shadow_skips_execution() {
        assert!(!Mode::Shadow.executes());
        assert!(Mode::Pilot.executes());
        assert!(Mode::Full.executes());
    }

    #[test]
    fn pilot_halves_limits() {
        assert_eq!(Mode::Pilot.limit_scale(), dec!(0.5));
        assert_eq!(Mode::Full.limit_scale(), Decimal::ONE);
    }
}
