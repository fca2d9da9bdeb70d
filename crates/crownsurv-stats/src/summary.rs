//! Reshaping survival curves into tidy summary rows.
//!
//! Two kinds of query are supported:
//!
//! - **Fixed-time**: survival probability, confidence interval and risk-set
//!   counts at each requested time ([`summarize_at_times`])
//! - **Quantile**: median (or other quantile) survival time with its
//!   confidence interval ([`summarize_median`], [`summarize_quantile`])
//!
//! Rows are produced stratum by stratum in the order the curves are given,
//! and within a stratum in the order of the requested times.
//!
//! # Examples
//!
//! ```
//! use crownsurv_stats::{
//!     confidence::ConfidenceOptions,
//!     summary,
//!     survival::{KaplanMeierCurve, Observation},
//! };
//!
//! let data = [Observation::event(1.0), Observation::censored(2.0), Observation::event(3.0)];
//! let curve = KaplanMeierCurve::estimate(&data, &ConfidenceOptions::default()).unwrap();
//!
//! let rows = summary::summarize_at_times([("all", &curve)], &[0.5, 2.5]).unwrap();
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[0].survival, 1.0);
//! assert_eq!(rows[1].at_risk, 1);
//! assert_eq!(rows[1].events, 1);
//! assert_eq!(rows[1].censored, 1);
//! ```

use serde::Serialize;

use crate::{
    SurvivalError,
    confidence::ConfidenceInterval,
    survival::{KaplanMeierCurve, SurvivalQuantile},
};

/// Curve state at a fixed query time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurvivalSummaryRow<K> {
    pub stratum: K,
    /// Query time.
    pub time: f64,
    /// Subjects still under observation just before `time`.
    pub at_risk: usize,
    /// Events observed at or before `time`.
    pub events: usize,
    /// Censorings strictly before `time`.
    pub censored: usize,
    /// Step-function value at `time`.
    pub survival: f64,
    pub std_err: f64,
    /// `None` before the first event, or once survival has reached 0.
    pub ci: Option<ConfidenceInterval>,
}

/// Quantile survival time of one stratum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantileSummaryRow<K> {
    pub stratum: K,
    pub subjects: usize,
    pub events: usize,
    /// Survival probability the quantile refers to (0.5 for the median).
    pub probability: f64,
    pub estimate: SurvivalQuantile,
}

impl KaplanMeierCurve {
    /// Summarizes the curve at a single time.
    ///
    /// Before the first observed time the survival probability is 1.0 with
    /// no confidence interval. Past the last observed time the last estimate
    /// carries forward with nobody at risk.
    ///
    /// Fails with [`SurvivalError::InvalidInput`] for a negative or
    /// non-finite time.
    pub fn summary_at<K>(&self, stratum: K, time: f64) -> Result<SurvivalSummaryRow<K>, SurvivalError> {
        if !time.is_finite() || time < 0.0 {
            return Err(SurvivalError::invalid_input(format!(
                "query time must be finite and non-negative, got {time}"
            )));
        }

        // Points strictly before `time` left the risk set; points at `time`
        // contribute their events but remain at risk.
        let before = self.times.partition_point(|&t| t < time);
        let at_or_before = self.times.partition_point(|&t| t <= time);

        let at_risk = self.at_risk.get(before).copied().unwrap_or(0);
        let events = self.events[..at_or_before].iter().sum();
        let censored = self.censored[..before].iter().sum();

        let (survival, std_err, ci) = match self.index_at(time) {
            Some(i) => (self.survival_prob[i], self.std_err[i], self.ci[i]),
            None => (1.0, 0.0, None),
        };

        Ok(SurvivalSummaryRow {
            stratum,
            time,
            at_risk,
            events,
            censored,
            survival,
            std_err,
            ci,
        })
    }
}

/// Builds one row per (stratum, query time).
///
/// # Arguments
///
/// * `curves` - Stratum labels paired with their curves, in presentation order
/// * `times` - Query times, in presentation order
///
/// # Errors
///
/// [`SurvivalError::InvalidInput`] if any query time is negative or not finite.
pub fn summarize_at_times<'a, K, I>(
    curves: I,
    times: &[f64],
) -> Result<Vec<SurvivalSummaryRow<K>>, SurvivalError>
where
    K: Clone,
    I: IntoIterator<Item = (K, &'a KaplanMeierCurve)>,
{
    let mut rows = vec![];
    for (stratum, curve) in curves {
        for &time in times {
            rows.push(curve.summary_at(stratum.clone(), time)?);
        }
    }
    Ok(rows)
}

/// Builds one median-survival row per stratum.
pub fn summarize_median<'a, K, I>(curves: I) -> Vec<QuantileSummaryRow<K>>
where
    I: IntoIterator<Item = (K, &'a KaplanMeierCurve)>,
{
    curves
        .into_iter()
        .map(|(stratum, curve)| quantile_row(stratum, curve, 0.5))
        .collect()
}

/// Builds one row per stratum for the time at which survival falls to `probability`.
///
/// Fails with [`SurvivalError::InvalidInput`] unless `probability` lies in `(0, 1)`.
pub fn summarize_quantile<'a, K, I>(
    curves: I,
    probability: f64,
) -> Result<Vec<QuantileSummaryRow<K>>, SurvivalError>
where
    I: IntoIterator<Item = (K, &'a KaplanMeierCurve)>,
{
    if probability.is_nan() || probability <= 0.0 || probability >= 1.0 {
        return Err(SurvivalError::invalid_input(format!(
            "quantile probability must lie strictly between 0 and 1, got {probability}"
        )));
    }
    Ok(curves
        .into_iter()
        .map(|(stratum, curve)| quantile_row(stratum, curve, probability))
        .collect())
}

fn quantile_row<K>(stratum: K, curve: &KaplanMeierCurve, probability: f64) -> QuantileSummaryRow<K> {
    QuantileSummaryRow {
        stratum,
        subjects: curve.subjects(),
        events: curve.total_events(),
        probability,
        estimate: curve.quantile(probability),
    }
}
