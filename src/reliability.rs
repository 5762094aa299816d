//! Weibull survival curves describing the failure of installed modules over time.
//!
//! The cumulative distribution function is
//!
//! ```text
//! F(t) = 1 - exp(-(t / scale)^shape)
//! ```
//!
//! Curves are normally obtained by solving for the two parameters from a pair of reliability
//! keypoints (typically the ages at which 50% and 90% of modules have failed), but can also be
//! supplied directly.
use anyhow::{Result, bail, ensure};
use serde::{Deserialize, Serialize};

/// The canonical cumulative failure fraction for the `t50` keypoint
pub const T50_FRACTION: f64 = 0.5;

/// The canonical cumulative failure fraction for the `t90` keypoint
pub const T90_FRACTION: f64 = 0.9;

/// Residual tolerance for the keypoint solve
const SOLVER_TOLERANCE: f64 = 1e-12;

/// Maximum number of bisection steps for the keypoint solve
const SOLVER_MAX_ITERATIONS: u32 = 500;

/// Bracket for the shape parameter searched by the solver
const SHAPE_BRACKET: (f64, f64) = (1e-6, 1e3);

/// A point on a survival curve: by `age`, a `fraction` of modules have failed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// Module age in years
    pub age: f64,
    /// Cumulative fraction of modules failed by `age` (0-1)
    pub fraction: f64,
}

impl Keypoint {
    /// Create a new [`Keypoint`]
    pub fn new(age: f64, fraction: f64) -> Self {
        Self { age, fraction }
    }
}

/// The parameters of a two-parameter Weibull distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeibullParams {
    /// The shape parameter (sometimes called `k` or `alpha`)
    pub shape: f64,
    /// The scale parameter (sometimes called `lambda` or `beta`), in years
    pub scale: f64,
}

impl WeibullParams {
    /// Create parameters directly, checking that they describe a valid distribution
    pub fn new(shape: f64, scale: f64) -> Result<Self> {
        ensure!(
            shape.is_finite() && shape > 0.0,
            "Weibull shape must be a finite number greater than zero (got {shape})"
        );
        ensure!(
            scale.is_finite() && scale > 0.0,
            "Weibull scale must be a finite number greater than zero (got {scale})"
        );

        Ok(Self { shape, scale })
    }

    /// Solve for the parameters of the curve passing through the `t50` and `t90` points
    pub fn from_t50_t90(t50: f64, t90: f64) -> Result<Self> {
        Self::from_keypoints(
            Keypoint::new(t50, T50_FRACTION),
            Keypoint::new(t90, T90_FRACTION),
        )
    }

    /// Solve for the parameters of the curve passing through two keypoints.
    ///
    /// The keypoints must be given in order of strictly increasing age and strictly increasing
    /// cumulative fraction, with both fractions strictly between zero and one.
    ///
    /// The scale is eliminated using the first keypoint, leaving a one-dimensional problem in the
    /// shape parameter which is solved by bisection.
    pub fn from_keypoints(first: Keypoint, second: Keypoint) -> Result<Self> {
        ensure!(
            first.age.is_finite() && first.age > 0.0,
            "Reliability keypoint ages must be greater than zero (got {})",
            first.age
        );
        ensure!(
            second.age.is_finite() && second.age > first.age,
            "Reliability keypoint ages must be strictly increasing (got {} then {})",
            first.age,
            second.age
        );
        for point in [first, second] {
            ensure!(
                point.fraction > 0.0 && point.fraction < 1.0,
                "Reliability keypoint fractions must be between zero and one, exclusive (got {})",
                point.fraction
            );
        }
        ensure!(
            second.fraction > first.fraction,
            "Reliability keypoint fractions must be strictly increasing with age"
        );

        // h1 = -ln(1 - F1) = (t1 / scale)^shape, so F(t2) = 1 - exp(-h1 * (t2 / t1)^shape)
        let first_hazard = -(1.0 - first.fraction).ln();
        let age_ratio = second.age / first.age;
        let residual = |shape: f64| {
            1.0 - (-first_hazard * age_ratio.powf(shape)).exp() - second.fraction
        };

        let Some(shape) = bisection(residual, SHAPE_BRACKET.0, SHAPE_BRACKET.1) else {
            bail!(
                "Survival curve solve did not converge for keypoints ({}, {}) and ({}, {})",
                first.age,
                first.fraction,
                second.age,
                second.fraction
            );
        };

        Self::new(shape, first.age / first_hazard.powf(1.0 / shape))
    }

    /// The cumulative fraction of modules failed by `age`.
    ///
    /// Ages at or below zero give zero.
    pub fn cdf(&self, age: f64) -> f64 {
        if age <= 0.0 {
            return 0.0;
        }

        weibull_cdf(age, self.shape, self.scale)
    }

    /// The fraction of the original cohort failing between `age - 1` and `age`.
    ///
    /// This is a discrete density derived from the CDF.
    pub fn yearly_failure_fraction(&self, age: u32) -> f64 {
        if age == 0 {
            return 0.0;
        }

        let age = f64::from(age);
        (self.cdf(age) - self.cdf(age - 1.0)).max(0.0)
    }
}

fn weibull_cdf(age: f64, shape: f64, scale: f64) -> f64 {
    1.0 - (-(age / scale).powf(shape)).exp()
}

/// Find a root of a monotonically increasing function by bisection.
///
/// Returns `None` if the root is not bracketed by `[lo, hi]` or the tolerance is not met.
fn bisection<F>(f: F, mut lo: f64, mut hi: f64) -> Option<f64>
where
    F: Fn(f64) -> f64,
{
    let f_lo = f(lo);
    let f_hi = f(hi);
    if !(f_lo.is_finite() && f_hi.is_finite()) || f_lo > 0.0 || f_hi < 0.0 {
        return None;
    }

    for _ in 0..SOLVER_MAX_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        if f_mid.abs() < SOLVER_TOLERANCE || hi - lo < SOLVER_TOLERANCE * mid {
            return Some(mid);
        }

        if f_mid < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_from_t50_t90_round_trip() {
        let params = WeibullParams::from_t50_t90(25.0, 35.0).unwrap();
        assert_approx_eq!(f64, params.cdf(25.0), 0.5, epsilon = 1e-3);
        assert_approx_eq!(f64, params.cdf(35.0), 0.9, epsilon = 1e-3);
    }

    #[test]
    fn test_from_keypoints_matches_closed_form() {
        // ln(-ln(1 - F)) is linear in ln(t) with gradient equal to the shape
        let params = WeibullParams::from_t50_t90(25.0, 35.0).unwrap();
        let expected_shape = ((10f64).ln().ln() - (2f64).ln().ln()) / (35f64 / 25.0).ln();
        assert_approx_eq!(f64, params.shape, expected_shape, epsilon = 1e-8);
    }

    #[rstest]
    #[case(Keypoint::new(25.0, 0.5), Keypoint::new(35.0, 0.9))]
    #[case(Keypoint::new(10.0, 0.7), Keypoint::new(20.0, 0.9))] // first fraction above 1 - 1/e
    #[case(Keypoint::new(5.0, 0.95), Keypoint::new(6.0, 0.99))]
    #[case(Keypoint::new(20.0, 0.01), Keypoint::new(40.0, 0.05))]
    fn test_from_keypoints_closed_form(#[case] first: Keypoint, #[case] second: Keypoint) {
        let log_hazard = |fraction: f64| (-(1.0 - fraction).ln()).ln();
        let expected_shape = (log_hazard(second.fraction) - log_hazard(first.fraction))
            / (second.age / first.age).ln();

        let params = WeibullParams::from_keypoints(first, second).unwrap();
        assert_approx_eq!(f64, params.shape, expected_shape, epsilon = 1e-8);
        assert_approx_eq!(f64, params.cdf(first.age), first.fraction, epsilon = 1e-9);
        assert_approx_eq!(f64, params.cdf(second.age), second.fraction, epsilon = 1e-9);
    }

    #[rstest]
    #[case(Keypoint::new(25.0, 0.5), Keypoint::new(25.0, 0.9))] // same age
    #[case(Keypoint::new(35.0, 0.5), Keypoint::new(25.0, 0.9))] // wrong order
    #[case(Keypoint::new(0.0, 0.5), Keypoint::new(25.0, 0.9))] // zero age
    #[case(Keypoint::new(25.0, 0.9), Keypoint::new(35.0, 0.5))] // decreasing fraction
    #[case(Keypoint::new(25.0, 0.0), Keypoint::new(35.0, 0.5))] // zero fraction
    #[case(Keypoint::new(25.0, 0.5), Keypoint::new(35.0, 1.0))] // unit fraction
    fn test_from_keypoints_invalid(#[case] first: Keypoint, #[case] second: Keypoint) {
        assert!(WeibullParams::from_keypoints(first, second).is_err());
    }

    #[test]
    fn test_from_keypoints_not_converged() {
        // Ages so close together that the required shape lies outside the search bracket
        let result =
            WeibullParams::from_keypoints(Keypoint::new(30.0, 0.5), Keypoint::new(30.0001, 0.9));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .starts_with("Survival curve solve did not converge")
        );
    }

    #[rstest]
    #[case(0.0, 30.0)]
    #[case(-1.0, 30.0)]
    #[case(5.0, 0.0)]
    #[case(f64::NAN, 30.0)]
    #[case(5.0, f64::INFINITY)]
    fn test_new_invalid(#[case] shape: f64, #[case] scale: f64) {
        assert!(WeibullParams::new(shape, scale).is_err());
    }

    #[test]
    fn test_cdf_at_scale() {
        // By definition, F(scale) = 1 - 1/e for any shape
        let params = WeibullParams::new(5.3759, 30.0).unwrap();
        assert_approx_eq!(f64, params.cdf(30.0), 1.0 - (-1.0f64).exp());
        assert_eq!(params.cdf(0.0), 0.0);
        assert_eq!(params.cdf(-3.0), 0.0);
    }

    #[test]
    fn test_yearly_failure_fraction() {
        let params = WeibullParams::from_t50_t90(25.0, 35.0).unwrap();
        assert_eq!(params.yearly_failure_fraction(0), 0.0);

        // The yearly fractions telescope back to the CDF
        let total: f64 = (1..=40).map(|age| params.yearly_failure_fraction(age)).sum();
        assert_approx_eq!(f64, total, params.cdf(40.0), epsilon = 1e-12);
    }
}
