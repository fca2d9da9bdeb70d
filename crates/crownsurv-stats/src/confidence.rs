//! Pointwise confidence bands for survival estimates.
//!
//! Bounds are computed on a transformed scale and mapped back, so that they
//! stay inside `[0, 1]`. The standard error fed into the transform is the
//! Greenwood standard error of the cumulative hazard `-ln S(t)`.

use serde::{Deserialize, Serialize};

use crate::{SurvivalError, distribution};

/// Scale on which confidence bounds are computed.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceType {
    /// `S ± z·se(S)`, clipped to `[0, 1]`.
    #[display("plain")]
    Plain,
    /// `S·exp(±z·σ)`, upper bound clipped to 1.
    #[default]
    #[display("log")]
    Log,
    /// Complementary log-log scale, `exp(-exp(ln(-ln S) ± z·σ/|ln S|))`.
    #[display("log-log")]
    LogLog,
}

/// Lower and upper confidence bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

/// Confidence level and transform used when estimating curves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceOptions {
    /// Coverage probability, strictly between 0 and 1.
    pub level: f64,
    pub transform: ConfidenceType,
}

impl Default for ConfidenceOptions {
    fn default() -> Self {
        Self {
            level: 0.95,
            transform: ConfidenceType::default(),
        }
    }
}

impl ConfidenceOptions {
    #[must_use]
    pub fn with_level(mut self, level: f64) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: ConfidenceType) -> Self {
        self.transform = transform;
        self
    }

    /// Two-sided normal critical value for [`level`](Self::level).
    ///
    /// Fails with [`SurvivalError::InvalidInput`] when the level is outside `(0, 1)`.
    pub fn critical_value(&self) -> Result<f64, SurvivalError> {
        distribution::normal_critical_value(self.level)
    }

    /// Confidence interval for a survival estimate.
    ///
    /// # Arguments
    ///
    /// * `z` - Critical value from [`critical_value`](Self::critical_value)
    /// * `survival` - Survival estimate `S(t)`
    /// * `sigma` - Standard error of `-ln S(t)`
    ///
    /// Returns `None` where the transform is undefined (`S = 0`, or `S = 1`
    /// on the log-log scale).
    #[must_use]
    pub fn interval(&self, z: f64, survival: f64, sigma: f64) -> Option<ConfidenceInterval> {
        if survival <= 0.0 || !sigma.is_finite() {
            return None;
        }
        match self.transform {
            ConfidenceType::Plain => {
                let half_width = z * survival * sigma;
                Some(ConfidenceInterval {
                    lower: (survival - half_width).max(0.0),
                    upper: (survival + half_width).min(1.0),
                })
            }
            ConfidenceType::Log => Some(ConfidenceInterval {
                lower: survival * (-z * sigma).exp(),
                upper: (survival * (z * sigma).exp()).min(1.0),
            }),
            ConfidenceType::LogLog => {
                if survival >= 1.0 {
                    return None;
                }
                let log_s = survival.ln();
                let center = (-log_s).ln();
                let spread = z * sigma / log_s.abs();
                Some(ConfidenceInterval {
                    lower: (-(center + spread).exp()).exp(),
                    upper: (-(center - spread).exp()).exp(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    const Z95: f64 = 1.959_963_984_540_054;

    #[test]
    fn test_log_interval() {
        let options = ConfidenceOptions::default();
        let ci = options.interval(Z95, 0.8, 0.05_f64.sqrt()).unwrap();
        assert_abs_diff_eq!(ci.lower, 0.516_125_760_342_172, epsilon = 1e-9);
        // 1.24 before clipping
        assert_abs_diff_eq!(ci.upper, 1.0);
    }

    #[test]
    fn test_log_log_interval() {
        let options = ConfidenceOptions::default().with_transform(ConfidenceType::LogLog);
        let ci = options.interval(Z95, 0.8, 0.05_f64.sqrt()).unwrap();
        assert_abs_diff_eq!(ci.lower, 0.203_809_263_267_639, epsilon = 1e-9);
        assert_abs_diff_eq!(ci.upper, 0.969_179_788_866_742, epsilon = 1e-9);
        assert!(options.interval(Z95, 1.0, 0.0).is_none());
    }

    #[test]
    fn test_plain_interval() {
        let options = ConfidenceOptions::default().with_transform(ConfidenceType::Plain);
        let ci = options.interval(Z95, 0.8, 0.05_f64.sqrt()).unwrap();
        assert_abs_diff_eq!(ci.lower, 0.449_390_983_769_367, epsilon = 1e-9);
        assert_abs_diff_eq!(ci.upper, 1.0);
    }

    #[test]
    fn test_zero_survival_has_no_interval() {
        for transform in [ConfidenceType::Plain, ConfidenceType::Log, ConfidenceType::LogLog] {
            let options = ConfidenceOptions::default().with_transform(transform);
            assert!(options.interval(Z95, 0.0, f64::INFINITY).is_none());
        }
    }

    #[test]
    fn test_bounds_stay_in_unit_interval() {
        for transform in [ConfidenceType::Plain, ConfidenceType::Log, ConfidenceType::LogLog] {
            let options = ConfidenceOptions::default().with_transform(transform);
            for &(s, sigma) in &[(0.99, 0.5), (0.01, 3.0), (0.5, 0.1), (0.3, 10.0)] {
                let ci = options.interval(Z95, s, sigma).unwrap();
                assert!((0.0..=1.0).contains(&ci.lower), "{transform}: {ci:?}");
                assert!((0.0..=1.0).contains(&ci.upper), "{transform}: {ci:?}");
                assert!(ci.lower <= s && s <= ci.upper, "{transform}: {ci:?}");
            }
        }
    }
}
