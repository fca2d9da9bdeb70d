//! Thin wrappers over `statrs` distributions used for intervals and p-values.

use statrs::distribution::{ChiSquared, ContinuousCDF as _, Normal};

use crate::SurvivalError;

fn standard_normal() -> Normal {
    Normal::standard()
}

/// Two-sided critical value `z` such that `P(|Z| <= z) = level`.
pub(crate) fn normal_critical_value(level: f64) -> Result<f64, SurvivalError> {
    if level.is_nan() || level <= 0.0 || level >= 1.0 {
        return Err(SurvivalError::invalid_input(format!(
            "confidence level must lie strictly between 0 and 1, got {level}"
        )));
    }
    Ok(standard_normal().inverse_cdf(1.0 - (1.0 - level) / 2.0))
}

/// Two-sided p-value of a standard normal test statistic.
pub(crate) fn normal_two_sided_p(z: f64) -> f64 {
    (2.0 * standard_normal().sf(z.abs())).min(1.0)
}

/// Upper tail `P(X > x)` of a chi-squared distribution.
#[expect(clippy::cast_precision_loss)]
pub(crate) fn chi_squared_sf(x: f64, degrees_of_freedom: usize) -> f64 {
    if x <= 0.0 || degrees_of_freedom == 0 {
        return 1.0;
    }
    match ChiSquared::new(degrees_of_freedom as f64) {
        Ok(dist) => dist.sf(x),
        Err(_) => f64::NAN,
    }
}
