//! Auxiliary constants and helper functions.
//!
//! This module provides numerical constants and utility functions for
//! common operations used across the forecast model.

/// Assumed depth (in kilometers) of the bottom of the seismogenic zone.
///
/// Point-source finite widths are limited so that ruptures do not extend
/// below this depth.
pub const SEISMOGENIC_DEPTH: f64 = 14.0;

/// Numerical floor below which a magnitude-bin annual rate is treated as
/// zero. Bins with rates under this floor are silently dropped from
/// rupture lists.
pub const RATE_FLOOR: f64 = 1e-14;

/// Tolerance used when checking that weight arrays sum to 1.
pub const WEIGHT_TOLERANCE: f64 = 1e-4;

/// Check if two floating-point numbers are approximately equal within a given tolerance (epsilon).
///
/// # Arguments
///
/// * `a` - First floating-point value.
/// * `b` - Second floating-point value.
/// * `epsilon` - Maximum allowed difference between `a` and `b` for them to be considered equal.
///
/// # Returns
///
/// `true` if the absolute difference between `a` and `b` is less than `epsilon`, `false` otherwise.
///
/// # Examples
///
/// ```
/// use hazard_forecast_lib::auxilary::approx_equal;
/// assert!(approx_equal(1.00001, 1.00002, 0.0001));
/// ```
pub fn approx_equal(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_equal_true() {
        assert!(approx_equal(1.000001, 1.000002, 0.00001));
    }

    #[test]
    fn test_approx_equal_false() {
        assert!(!approx_equal(1.0, 1.1, 0.00001));
    }

    #[test]
    fn test_approx_equal_with_small_epsilon() {
        assert!(!approx_equal(3.14, 3.1400001, 1e-12));
        assert!(approx_equal(3.14, 3.14, 1e-12));
    }
}
