//! Slippage guard.
//!
//! Bounds how far the resolved price may drift from the price an action was
//! proposed at. Only actions that carry an expected price are checked. The
//! threshold can be tightened at runtime without a restart.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

/// Threshold used when none is configured, in percent.
pub const DEFAULT_SLIPPAGE_THRESHOLD: Decimal = dec!(1);

/// Slippage errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlippageError {
    /// Price drifted past the threshold.
    #[error("slippage {slippage:.4}% exceeds threshold {threshold}% (expected {expected}, actual {actual})")]
    Exceeded {
        /// Resolved price.
        actual: Decimal,
        /// Committed price.
        expected: Decimal,
        /// Observed slippage, in percent.
        slippage: Decimal,
        /// Threshold in force, in percent.
        threshold: Decimal,
    },

    /// Expected price is zero or negative.
    #[error("invalid expected price {expected}")]
    InvalidExpectedPrice {
        /// The expected price given.
        expected: Decimal,
    },

    /// Threshold outside `(0, 100]`.
    #[error("invalid slippage threshold {threshold}: must be in (0, 100]")]
    InvalidThreshold {
        /// The threshold given.
        threshold: Decimal,
    },
}

/// Guards single actions against excessive slippage.
#[derive(Debug)]
pub struct SlippageGuard {
    threshold: RwLock<Decimal>,
}

impl Default for SlippageGuard {
    fn default() -> Self {
        Self {
            threshold: RwLock::new(DEFAULT_SLIPPAGE_THRESHOLD),
        }
    }
}

impl SlippageGuard {
    /// Create a guard with `threshold` percent, falling back to the default
    /// when the value is out of range.
    #[must_use]
    pub fn new(threshold: Decimal) -> Self {
        let guard = Self::default();
        if let Err(e) = guard.set_threshold(threshold) {
            tracing::warn!(error = %e, default = %DEFAULT_SLIPPAGE_THRESHOLD, "Using default slippage threshold");
        }
        guard
    }

    /// Relative deviation of `actual` from `expected`, in percent.
    ///
    /// Returns zero when `expected` is not positive. Saturates at
    /// [`Decimal::MAX`] when the deviation is out of range.
    #[must_use]
    pub fn calculate_slippage(actual: Decimal, expected: Decimal) -> Decimal {
        if expected <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        actual
            .checked_sub(expected)
            .and_then(|diff| diff.abs().checked_div(expected))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::MAX)
    }

    /// Check `actual` against `expected`; returns the slippage when accepted.
    pub fn check_slippage(&self, actual: Decimal, expected: Decimal) -> Result<Decimal, SlippageError> {
        if expected <= Decimal::ZERO {
            return Err(SlippageError::InvalidExpectedPrice { expected });
        }

        let slippage = Self::calculate_slippage(actual, expected);
        let threshold = self.threshold();
        if slippage > threshold {
            return Err(SlippageError::Exceeded {
                actual,
                expected,
                slippage,
                threshold,
            });
        }
        Ok(slippage)
    }

    /// Replace the threshold.
    pub fn set_threshold(&self, threshold: Decimal) -> Result<(), SlippageError> {
        if threshold <= Decimal::ZERO || threshold > Decimal::ONE_HUNDRED {
            return Err(SlippageError::InvalidThreshold { threshold });
        }
        let previous = std::mem::replace(&mut *self.threshold.write(), threshold);
        tracing::info!(%previous, current = %threshold, "Slippage threshold updated");
        Ok(())
    }

    /// Threshold in force, in percent.
    #[must_use]
    pub fn threshold(&self) -> Decimal {
        *self.threshold.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn default_threshold_is_one_percent() {
        assert_eq!(SlippageGuard::default().threshold(), dec!(1));
    }

    #[test_case(dec!(101), dec!(100), dec!(1) ; "one percent above")]
    #[test_case(dec!(98), dec!(100), dec!(2) ; "two percent below")]
    #[test_case(dec!(100), dec!(100), dec!(0) ; "no drift")]
    #[test_case(dec!(100), dec!(0), dec!(0) ; "zero expected")]
    fn calculates_percentage(actual: Decimal, expected: Decimal, slippage: Decimal) {
        assert_eq!(SlippageGuard::calculate_slippage(actual, expected), slippage);
    }

    #[test]
    fn out_of_range_deviation_saturates_and_is_rejected() {
        let tiny = Decimal::new(1, 28);
        assert_eq!(SlippageGuard::calculate_slippage(dec!(50000), tiny), Decimal::MAX);

        let guard = SlippageGuard::default();
        assert!(matches!(
            guard.check_slippage(dec!(50000), tiny),
            Err(SlippageError::Exceeded { .. })
        ));
    }

    #[test]
    fn slippage_at_threshold_is_accepted() {
        let guard = SlippageGuard::new(dec!(1));
        assert_eq!(guard.check_slippage(dec!(101), dec!(100)).unwrap(), dec!(1));
    }

    #[test]
    fn slippage_above_threshold_is_rejected() {
        let guard = SlippageGuard::new(dec!(1));
        let err = guard.check_slippage(dec!(102), dec!(100)).unwrap_err();
        assert_eq!(
            err,
            SlippageError::Exceeded {
                actual: dec!(102),
                expected: dec!(100),
                slippage: dec!(2),
                threshold: dec!(1),
            }
        );
    }

    #[test]
    fn non_positive_expected_price_is_an_error() {
        let guard = SlippageGuard::default();
        assert!(matches!(
            guard.check_slippage(dec!(100), dec!(-1)),
            Err(SlippageError::InvalidExpectedPrice { .. })
        ));
    }

    #[test]
    fn threshold_can_be_tightened_at_runtime() {
        let guard = SlippageGuard::default();
        assert!(guard.check_slippage(dec!(100.8), dec!(100)).is_ok());

        guard.set_threshold(dec!(0.5)).unwrap();
        assert_eq!(guard.threshold(), dec!(0.5));
        assert!(guard.check_slippage(dec!(100.8), dec!(100)).is_err());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let guard = SlippageGuard::default();
        assert!(guard.set_threshold(Decimal::ZERO).is_err());
        assert!(guard.set_threshold(dec!(150)).is_err());
        assert_eq!(guard.threshold(), DEFAULT_SLIPPAGE_THRESHOLD);
    }

    #[test]
    fn new_with_invalid_threshold_uses_default() {
        assert_eq!(SlippageGuard::new(dec!(-3)).threshold(), DEFAULT_SLIPPAGE_THRESHOLD);
    }
}
