//! Kaplan-Meier survival statistics, overall and per stratum.
//!
//! # Overview
//!
//! Restorations leave follow-up in two ways:
//!
//! - **Event**: the restoration failed (event observed)
//! - **Censored**: follow-up ended without failure (event not observed)
//!
//! A censored restoration is known to have survived at least until its last
//! visit. Dropping such records, or treating them as failures, biases the
//! survival estimate; the Kaplan-Meier estimator uses them for exactly as
//! long as they were observed.
//!
//! ```text
//! Event:     |----x     (failed at 2.1 years)
//! Censored:  |-------> (last seen at 4.0 years, still intact)
//! ```
//!
//! # Examples
//!
//! ## Overall survival
//!
//! ```
//! use crownsurv_analysis::{
//!     cohort::{Cohort, SubjectRecord},
//!     survival::SurvivalStatsMap,
//! };
//! use crownsurv_stats::confidence::ConfidenceOptions;
//!
//! let cohort = Cohort::new(vec![
//!     SubjectRecord::new("a", 1.0, 1),
//!     SubjectRecord::new("b", 2.0, 0),
//!     SubjectRecord::new("c", 3.0, 1),
//!     SubjectRecord::new("d", 3.0, 1),
//!     SubjectRecord::new("e", 5.0, 0),
//! ])
//! .unwrap();
//!
//! let stats = SurvivalStatsMap::overall(&cohort, &ConfidenceOptions::default()).unwrap();
//! let rows = stats.summarize_at(&[2.5]).unwrap();
//! assert_eq!(rows[0].stratum, "Overall");
//! assert_eq!(rows[0].at_risk, 3);
//! ```
//!
//! ## Group by covariate
//!
//! ```
//! # use crownsurv_analysis::{cohort::{Cohort, SubjectRecord}, survival::SurvivalStatsMap};
//! # use crownsurv_stats::confidence::ConfidenceOptions;
//! # let cohort = Cohort::new(vec![
//! #     SubjectRecord::new("a", 1.0, 1).with_covariate("rct", 1.0),
//! #     SubjectRecord::new("b", 2.0, 0).with_covariate("rct", 0.0),
//! # ]).unwrap();
//! let stats =
//!     SurvivalStatsMap::collect_by_covariate(&cohort, "rct", &ConfidenceOptions::default())
//!         .unwrap();
//! for row in stats.medians() {
//!     println!("rct={}: median {:?}", row.stratum, row.estimate.time());
//! }
//! ```

use std::{collections::BTreeMap, fmt::Display};

use crownsurv_stats::{
    SurvivalError,
    confidence::ConfidenceOptions,
    summary::{self, QuantileSummaryRow, SurvivalSummaryRow},
    survival::{KaplanMeierCurve, Observation, SurvivalQuantile},
};
use serde::Serialize;
use tracing::warn;

use crate::{
    AnalysisError,
    cohort::{Cohort, Level, SubjectRecord},
};

/// Stratum label used when the cohort is not split.
pub const OVERALL: &str = "Overall";

/// Survival statistics for a group of subjects
#[derive(Debug, Clone, Serialize)]
pub struct SurvivalStats {
    /// Total number of subjects
    pub subjects: usize,
    /// Number of observed events
    pub events: usize,
    /// Number of censored subjects
    pub censored: usize,
    /// Kaplan-Meier median survival time with its confidence interval
    pub median: SurvivalQuantile,
    /// Kaplan-Meier survival curve
    pub curve: KaplanMeierCurve,
}

impl SurvivalStats {
    /// Estimates the Kaplan-Meier curve of a group and its median.
    pub fn from_observations(
        observations: &[Observation],
        options: &ConfidenceOptions,
    ) -> Result<Self, SurvivalError> {
        let curve = KaplanMeierCurve::estimate(observations, options)?;
        Ok(Self {
            subjects: curve.subjects(),
            events: curve.total_events(),
            censored: curve.total_censored(),
            median: curve.median(),
            curve,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SurvivalStatsMap<K> {
    pub map: BTreeMap<K, SurvivalStats>,
}

impl<K> SurvivalStatsMap<K>
where
    K: Ord + Display,
{
    /// Collects observations grouped by a custom key and estimates one curve
    /// per group.
    ///
    /// Groups are ordered by key. A group without events is kept (its curve
    /// stays at 1) and logged as a warning.
    ///
    /// # Arguments
    ///
    /// * `cohort` - Validated subjects
    /// * `options` - Confidence level and transform for every curve
    /// * `group` - Closure that computes the stratum key of a subject
    ///
    /// # Examples
    ///
    /// ```
    /// use crownsurv_analysis::{cohort::{Cohort, SubjectRecord}, survival::SurvivalStatsMap};
    /// use crownsurv_stats::confidence::ConfidenceOptions;
    ///
    /// let cohort = Cohort::new(vec![
    ///     SubjectRecord::new("a", 1.0, 1),
    ///     SubjectRecord::new("b", 7.0, 0),
    /// ])
    /// .unwrap();
    ///
    /// // Group by follow-up beyond five years
    /// let stats = SurvivalStatsMap::collect_by_group(&cohort, &ConfidenceOptions::default(), |s| {
    ///     s.time > 5.0
    /// })
    /// .unwrap();
    /// assert_eq!(stats.map.len(), 2);
    /// ```
    pub fn collect_by_group<F>(
        cohort: &Cohort,
        options: &ConfidenceOptions,
        mut group: F,
    ) -> Result<Self, AnalysisError>
    where
        F: FnMut(&SubjectRecord) -> K,
    {
        let mut data_map: BTreeMap<K, Vec<Observation>> = BTreeMap::new();
        for (subject, observation) in cohort.iter() {
            data_map
                .entry(group(subject))
                .or_default()
                .push(observation);
        }

        let mut map = BTreeMap::new();
        for (key, observations) in data_map {
            let stats = SurvivalStats::from_observations(&observations, options)
                .map_err(AnalysisError::survival(format!("stratum '{key}'")))?;
            if stats.events == 0 {
                warn!(stratum = %key, subjects = stats.subjects, "stratum has no events");
            }
            map.insert(key, stats);
        }
        Ok(Self { map })
    }
}

impl<K> SurvivalStatsMap<K> {
    /// Curves in stratum order.
    pub fn curves(&self) -> impl Iterator<Item = (&K, &KaplanMeierCurve)> {
        self.map.iter().map(|(key, stats)| (key, &stats.curve))
    }

    /// Survival at fixed times, one row per (stratum, time).
    ///
    /// Rows are grouped by stratum, then follow the order of `times`.
    pub fn summarize_at(&self, times: &[f64]) -> Result<Vec<SurvivalSummaryRow<K>>, AnalysisError>
    where
        K: Clone,
    {
        summary::summarize_at_times(
            self.map.iter().map(|(key, stats)| (key.clone(), &stats.curve)),
            times,
        )
        .map_err(AnalysisError::survival("fixed-time survival summary"))
    }

    /// Median survival per stratum.
    #[must_use]
    pub fn medians(&self) -> Vec<QuantileSummaryRow<K>>
    where
        K: Clone,
    {
        summary::summarize_median(self.map.iter().map(|(key, stats)| (key.clone(), &stats.curve)))
    }

    /// Time at which survival falls to `probability`, per stratum.
    pub fn quantiles(&self, probability: f64) -> Result<Vec<QuantileSummaryRow<K>>, AnalysisError>
    where
        K: Clone,
    {
        summary::summarize_quantile(
            self.map.iter().map(|(key, stats)| (key.clone(), &stats.curve)),
            probability,
        )
        .map_err(AnalysisError::survival("quantile survival summary"))
    }
}

impl SurvivalStatsMap<String> {
    /// One curve for the whole cohort, under the [`OVERALL`] stratum.
    pub fn overall(cohort: &Cohort, options: &ConfidenceOptions) -> Result<Self, AnalysisError> {
        Self::collect_by_group(cohort, options, |_| OVERALL.to_owned())
    }
}

impl SurvivalStatsMap<Level> {
    /// Like [`SurvivalStatsMap::overall`], keyed by a [`Level`] so that it
    /// can stand in for a stratified map.
    pub fn overall_level(
        cohort: &Cohort,
        options: &ConfidenceOptions,
    ) -> Result<Self, AnalysisError> {
        Self::collect_by_group(cohort, options, |_| Level::from(OVERALL))
    }

    /// One curve per level of a covariate.
    ///
    /// Numeric codes order numerically, labels alphabetically after them.
    /// Every subject must have a value for the covariate.
    pub fn collect_by_covariate(
        cohort: &Cohort,
        covariate: &str,
        options: &ConfidenceOptions,
    ) -> Result<Self, AnalysisError> {
        let levels = cohort.level_covariate(covariate)?;
        let mut levels = levels.into_iter();
        Self::collect_by_group(cohort, options, |_| {
            levels.next().unwrap_or_else(|| Level::from(""))
        })
    }
}
