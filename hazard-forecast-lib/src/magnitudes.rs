//! Magnitude and moment conversions plus the range checks shared by
//! every builder in the model.
//!
//! All checks return the checked value on success so builders can
//! validate and assign in one expression.

use crate::auxilary::WEIGHT_TOLERANCE;
use crate::error::ValidationError;

/// Minimum supported moment magnitude.
pub const MIN_MAG: f64 = 4.0;

/// Maximum supported moment magnitude.
pub const MAX_MAG: f64 = 10.0;

/// Maximum supported depth in kilometers.
pub const MAX_DEPTH: f64 = 700.0;

/// Scalar seismic moment (in N·m) of an event of moment magnitude `m`:
/// `Mo = 10^(1.5·m + 9.05)`.
pub fn moment(m: f64) -> f64 {
    10_f64.powf(1.5 * m + 9.05)
}

/// Check that a moment magnitude lies in `[MIN_MAG, MAX_MAG]`.
pub fn check_magnitude(m: f64) -> Result<f64, ValidationError> {
    if !(MIN_MAG..=MAX_MAG).contains(&m) {
        return Err(ValidationError::MagnitudeRange(m));
    }
    Ok(m)
}

/// Check that a dip lies in `[0°, 90°]`.
pub fn check_dip(dip: f64) -> Result<f64, ValidationError> {
    if !(0.0..=90.0).contains(&dip) {
        return Err(ValidationError::DipRange(dip));
    }
    Ok(dip)
}

/// Check that a rake lies in `[-180°, 180°]`.
pub fn check_rake(rake: f64) -> Result<f64, ValidationError> {
    if !(-180.0..=180.0).contains(&rake) {
        return Err(ValidationError::RakeRange(rake));
    }
    Ok(rake)
}

/// Check that a depth lies in `[0, 700]` km.
pub fn check_depth(depth: f64) -> Result<f64, ValidationError> {
    if !(0.0..=MAX_DEPTH).contains(&depth) {
        return Err(ValidationError::DepthRange(depth));
    }
    Ok(depth)
}

/// Check that a weight lies in `[0, 1]`.
pub fn check_weight(weight: f64) -> Result<f64, ValidationError> {
    if !(0.0..=1.0).contains(&weight) {
        return Err(ValidationError::WeightRange(weight));
    }
    Ok(weight)
}

/// Check that a weight array sums to 1 within tolerance.
pub fn check_weight_sum(weights: &[f64]) -> Result<(), ValidationError> {
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(ValidationError::WeightSum(sum));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auxilary::approx_equal;

    #[test]
    fn test_moment() {
        // Mo(6.0) = 10^18.05
        assert!(approx_equal(moment(6.0), 10_f64.powf(18.05), 1e3));
    }

    #[test]
    fn test_magnitude_bounds() {
        assert!(check_magnitude(6.5).is_ok());
        assert!(check_magnitude(3.9).is_err());
        assert!(check_magnitude(10.1).is_err());
    }

    #[test]
    fn test_angle_bounds() {
        assert!(check_dip(90.0).is_ok());
        assert!(check_dip(90.1).is_err());
        assert!(check_dip(-0.1).is_err());
        assert!(check_rake(-180.0).is_ok());
        assert!(check_rake(180.1).is_err());
    }

    #[test]
    fn test_weight_sum() {
        assert!(check_weight_sum(&[0.2, 0.6, 0.2]).is_ok());
        assert!(check_weight_sum(&[0.2, 0.6, 0.3]).is_err());
    }
}
