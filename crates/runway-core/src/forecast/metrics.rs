//! Forecast accuracy metrics

use crate::error::{Error, Result};

/// Floor applied to |actual| so a zero actual does not divide by zero
pub const DEFAULT_MAPE_EPSILON: f64 = 1e-9;

/// Mean absolute percentage error, in percent
///
/// `mean(|actual - predicted| / max(|actual|, epsilon)) * 100`. At a zero
/// actual this is a large but finite number rather than a true percentage.
pub fn mape(actual: &[f64], predicted: &[f64], epsilon: f64) -> Result<f64> {
    if actual.len() != predicted.len() {
        return Err(Error::InvalidData(format!(
            "MAPE length mismatch: {} actuals vs {} predictions",
            actual.len(),
            predicted.len()
        )));
    }
    if actual.is_empty() {
        return Err(Error::InvalidData("MAPE of an empty series".into()));
    }

    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs() / a.abs().max(epsilon))
        .sum();

    Ok(total / actual.len() as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions_are_zero() {
        let actual = [100.0, 250.0, -40.0];
        assert_eq!(mape(&actual, &actual, DEFAULT_MAPE_EPSILON).unwrap(), 0.0);
    }

    #[test]
    fn test_known_value() {
        // 10% and 20% off -> 15%
        let m = mape(&[100.0, 200.0], &[110.0, 160.0], DEFAULT_MAPE_EPSILON).unwrap();
        assert!((m - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_actuals_use_magnitude() {
        let m = mape(&[-100.0], &[-90.0], DEFAULT_MAPE_EPSILON).unwrap();
        assert!((m - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_actual_uses_epsilon_floor() {
        let m = mape(&[0.0], &[1e-9], DEFAULT_MAPE_EPSILON).unwrap();
        assert!((m - 100.0).abs() < 1e-9);

        let m = mape(&[0.0], &[0.0], DEFAULT_MAPE_EPSILON).unwrap();
        assert_eq!(m, 0.0);
        assert!(mape(&[0.0], &[5.0], DEFAULT_MAPE_EPSILON).unwrap().is_finite());
    }

    #[test]
    fn test_never_negative() {
        let cases: [(&[f64], &[f64]); 3] = [
            (&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]),
            (&[-5.0, 5.0], &[5.0, -5.0]),
            (&[1e6], &[-1e6]),
        ];
        for (actual, predicted) in cases {
            assert!(mape(actual, predicted, DEFAULT_MAPE_EPSILON).unwrap() >= 0.0);
        }
    }

    #[test]
    fn test_length_mismatch_is_error() {
        assert!(mape(&[1.0, 2.0], &[1.0], DEFAULT_MAPE_EPSILON).is_err());
    }

    #[test]
    fn test_empty_is_error() {
        assert!(mape(&[], &[], DEFAULT_MAPE_EPSILON).is_err());
    }
}
