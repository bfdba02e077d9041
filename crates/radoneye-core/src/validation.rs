//! Plausibility check for decoded readings.
//!
//! RD200 detectors occasionally return garbage after a half-completed
//! exchange. Anything outside `0..=1000` Bq/m³ is treated as a failed
//! acquisition rather than stored.
//!
//! # Example
//!
//! ```
//! use radoneye_core::validation::validate;
//! use radoneye_types::DualReading;
//!
//! assert!(validate(DualReading::from_becquerel(1000.0)).is_ok());
//! assert!(validate(DualReading::from_becquerel(1000.01)).is_err());
//! ```

use radoneye_types::DualReading;

use crate::error::{Error, Result};

/// Lowest accepted Bq/m³ value (inclusive).
pub const MIN_PLAUSIBLE_BQ: f64 = 0.0;

/// Highest accepted Bq/m³ value (inclusive).
pub const MAX_PLAUSIBLE_BQ: f64 = 1000.0;

/// Accept a reading whose Bq/m³ value lies in `[0, 1000]`.
///
/// # Errors
///
/// Returns [`Error::OutOfRange`] for values outside the range, including NaN.
pub fn validate(reading: DualReading) -> Result<DualReading> {
    if (MIN_PLAUSIBLE_BQ..=MAX_PLAUSIBLE_BQ).contains(&reading.becquerel) {
        Ok(reading)
    } else {
        Err(Error::OutOfRange {
            value: reading.becquerel,
            min: MIN_PLAUSIBLE_BQ,
            max: MAX_PLAUSIBLE_BQ,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bq(value: f64) -> DualReading {
        DualReading {
            becquerel: value,
            picocurie: value / 37.0,
        }
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(validate(bq(0.0)).is_ok());
        assert!(validate(bq(1000.0)).is_ok());
    }

    #[test]
    fn test_rejects_just_outside() {
        assert!(matches!(
            validate(bq(1000.01)),
            Err(Error::OutOfRange { .. })
        ));
        assert!(matches!(validate(bq(-0.01)), Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn test_checks_decoded_value_not_rounded_value() {
        assert!(validate(DualReading::from_picocurie(-0.0001)).is_err());
        assert!(validate(DualReading::from_becquerel(1000.004)).is_err());
        assert!(validate(DualReading::from_becquerel(999.996)).is_ok());
    }

    #[test]
    fn test_rejects_non_finite() {
        assert!(validate(bq(f64::NAN)).is_err());
        assert!(validate(bq(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_returns_reading_unchanged() {
        let reading = bq(42.5);
        assert_eq!(validate(reading).unwrap(), reading);
    }
}
