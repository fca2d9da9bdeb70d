//! Kaplan-Meier survival curves for right-censored time-to-event data.
//!
//! The Kaplan-Meier estimator is a non-parametric statistic used to estimate
//! the survival function from lifetime data. It accounts for censored data
//! (observations where the event of interest has not occurred by the end of
//! follow-up).
//!
//! ```text
//! Event:     |----x     (event observed at t)
//! Censored:  |------->  (event-free at t, outcome unknown afterwards)
//! ```
//!
//! At each distinct event time `t_i` with `n_i` subjects at risk and `d_i`
//! events, the estimate is multiplied by `1 - d_i/n_i`. Censored subjects
//! shrink later risk sets without producing a drop. Events sharing a time
//! with censorings are processed first, so subjects censored at `t_i` still
//! count in `n_i`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    SurvivalError,
    confidence::{ConfidenceInterval, ConfidenceOptions},
};

/// Tolerance used when deciding whether a curve sits exactly on a quantile.
const QUANTILE_TOLERANCE: f64 = 1.5e-8;

/// A single right-censored observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Duration from entry to the event or to the last follow-up.
    pub time: f64,
    /// `true` if the event was observed at `time`, `false` if censored.
    pub event: bool,
}

impl Observation {
    /// Creates an observation from a raw time and a 0/1 event indicator.
    ///
    /// Fails with [`SurvivalError::InvalidInput`] when `time` is negative or
    /// not finite, or when `event` is neither 0 nor 1.
    pub fn new(time: f64, event: u8) -> Result<Self, SurvivalError> {
        let event = match event {
            0 => false,
            1 => true,
            _ => {
                return Err(SurvivalError::invalid_input(format!(
                    "event indicator must be 0 or 1, got {event}"
                )));
            }
        };
        let observation = Self { time, event };
        observation.validate()?;
        Ok(observation)
    }

    /// An observed event at `time`.
    #[must_use]
    pub fn event(time: f64) -> Self {
        Self { time, event: true }
    }

    /// A censored observation at `time`.
    #[must_use]
    pub fn censored(time: f64) -> Self {
        Self { time, event: false }
    }

    pub(crate) fn validate(&self) -> Result<(), SurvivalError> {
        if !self.time.is_finite() || self.time < 0.0 {
            return Err(SurvivalError::invalid_input(format!(
                "time must be finite and non-negative, got {}",
                self.time
            )));
        }
        Ok(())
    }

    /// The same observation with the event indicator flipped.
    ///
    /// Used for the reverse Kaplan-Meier estimate of follow-up.
    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            time: self.time,
            event: !self.event,
        }
    }
}

/// One point of a survival curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub time: f64,
    pub at_risk: usize,
    pub events: usize,
    pub censored: usize,
    pub survival: f64,
    pub std_err: f64,
    pub ci: Option<ConfidenceInterval>,
}

/// Kaplan-Meier survival curve.
///
/// The curve stores parallel vectors, one entry per distinct observed time
/// (event or censoring), in ascending time order:
///
/// - Number of subjects at risk just before the time
/// - Number of events and censorings at the time
/// - Survival probability, its Greenwood standard error, and the pointwise
///   confidence interval
///
/// Survival is a right-continuous step function that starts at 1.0 before
/// the first time point and never increases.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KaplanMeierCurve {
    /// Distinct observed times.
    pub times: Vec<f64>,
    /// Subjects at risk just before each time.
    pub at_risk: Vec<usize>,
    /// Events at each time.
    pub events: Vec<usize>,
    /// Censorings at each time.
    pub censored: Vec<usize>,
    /// Survival probability at each time, in `[0, 1]`.
    pub survival_prob: Vec<f64>,
    /// Greenwood standard error of the survival probability.
    pub std_err: Vec<f64>,
    /// Pointwise confidence interval; `None` where the transform is undefined.
    pub ci: Vec<Option<ConfidenceInterval>>,
    /// Options the intervals were computed with.
    pub confidence: ConfidenceOptions,
}

/// A survival quantile (such as the median) with its confidence limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, derive_more::IsVariant)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SurvivalQuantile {
    /// The curve falls to or below the target probability.
    Reached {
        time: f64,
        /// Where the upper confidence bound crosses the target, if it does.
        lower: Option<f64>,
        /// Where the lower confidence bound crosses the target, if it does.
        upper: Option<f64>,
    },
    /// The curve never falls to the target probability.
    NotReached,
}

impl SurvivalQuantile {
    /// Estimated time, or `None` when not reached.
    #[must_use]
    pub fn time(&self) -> Option<f64> {
        match self {
            Self::Reached { time, .. } => Some(*time),
            Self::NotReached => None,
        }
    }
}

impl KaplanMeierCurve {
    /// Computes the Kaplan-Meier survival curve from survival data.
    ///
    /// # Arguments
    ///
    /// * `observations` - Right-censored observations in any order
    /// * `options` - Confidence level and transform for the pointwise bands
    ///
    /// # Errors
    ///
    /// [`SurvivalError::InvalidInput`] when there are no observations, when a
    /// time is negative or not finite, or when the confidence level is
    /// outside `(0, 1)`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use crownsurv_stats::{confidence::ConfidenceOptions, survival::{KaplanMeierCurve, Observation}};
    /// let data = [Observation::event(10.0), Observation::censored(20.0), Observation::event(30.0)];
    /// let curve = KaplanMeierCurve::estimate(&data, &ConfidenceOptions::default()).unwrap();
    /// assert_eq!(curve.times, vec![10.0, 20.0, 30.0]);
    /// assert_eq!(curve.at_risk, vec![3, 2, 1]);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    pub fn estimate(
        observations: &[Observation],
        options: &ConfidenceOptions,
    ) -> Result<Self, SurvivalError> {
        if observations.is_empty() {
            return Err(SurvivalError::invalid_input(
                "cannot estimate a survival curve without observations",
            ));
        }
        for observation in observations {
            observation.validate()?;
        }
        let z = options.critical_value()?;

        let mut data = observations.to_vec();
        data.sort_by(|a, b| a.time.total_cmp(&b.time));

        let mut curve = Self {
            times: vec![],
            at_risk: vec![],
            events: vec![],
            censored: vec![],
            survival_prob: vec![],
            std_err: vec![],
            ci: vec![],
            confidence: *options,
        };

        let total = data.len();
        let mut current_survival = 1.0;
        let mut greenwood_sum = 0.0;
        let mut any_event = false;

        let mut i = 0;
        while i < data.len() {
            let current_time = data[i].time;
            let at_risk = total - i;

            let mut event_count: usize = 0;
            let mut censored_count: usize = 0;
            let mut j = i;
            while j < data.len() && data[j].time == current_time {
                if data[j].event {
                    event_count += 1;
                } else {
                    censored_count += 1;
                }
                j += 1;
            }

            if event_count > 0 {
                any_event = true;
                let n = at_risk as f64;
                let d = event_count as f64;
                current_survival *= 1.0 - d / n;
                if event_count < at_risk {
                    greenwood_sum += d / (n * (n - d));
                } else {
                    greenwood_sum = f64::INFINITY;
                }
            }

            let (std_err, ci) = if current_survival > 0.0 {
                let sigma = greenwood_sum.sqrt();
                let ci = if any_event {
                    options.interval(z, current_survival, sigma)
                } else {
                    None
                };
                (current_survival * sigma, ci)
            } else {
                (0.0, None)
            };

            curve.times.push(current_time);
            curve.at_risk.push(at_risk);
            curve.events.push(event_count);
            curve.censored.push(censored_count);
            curve.survival_prob.push(current_survival);
            curve.std_err.push(std_err);
            curve.ci.push(ci);

            i = j;
        }

        let zero_time_events = curve.events_at_time_zero();
        if zero_time_events > 0 {
            warn!(
                zero_time_events,
                "events recorded at time 0; kept in the estimate"
            );
        }
        debug!(
            subjects = total,
            events = curve.total_events(),
            points = curve.len(),
            "estimated Kaplan-Meier curve"
        );

        Ok(curve)
    }

    /// Computes one curve per stratum.
    ///
    /// Curves are returned in the stratum key's order.
    ///
    /// # Errors
    ///
    /// [`SurvivalError::InvalidInput`] when no stratum has any observation, or
    /// for any invalid observation.
    pub fn estimate_strata<K, I>(
        data: I,
        options: &ConfidenceOptions,
    ) -> Result<BTreeMap<K, Self>, SurvivalError>
    where
        K: Ord,
        I: IntoIterator<Item = (K, Observation)>,
    {
        let mut data_map: BTreeMap<K, Vec<Observation>> = BTreeMap::new();
        for (key, observation) in data {
            data_map.entry(key).or_default().push(observation);
        }
        if data_map.is_empty() {
            return Err(SurvivalError::invalid_input(
                "stratified estimation needs at least one non-empty stratum",
            ));
        }
        data_map
            .into_iter()
            .map(|(key, observations)| Ok((key, Self::estimate(&observations, options)?)))
            .collect()
    }

    /// Reverse Kaplan-Meier curve, treating censorings as events.
    ///
    /// Its median is the usual estimate of median follow-up time.
    pub fn reverse(
        observations: &[Observation],
        options: &ConfidenceOptions,
    ) -> Result<Self, SurvivalError> {
        let reversed = observations
            .iter()
            .map(|o| o.reversed())
            .collect::<Vec<_>>();
        Self::estimate(&reversed, options)
    }

    /// Number of curve points (distinct observed times).
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Number of subjects the curve was estimated from.
    #[must_use]
    pub fn subjects(&self) -> usize {
        self.at_risk.first().copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_events(&self) -> usize {
        self.events.iter().sum()
    }

    #[must_use]
    pub fn total_censored(&self) -> usize {
        self.censored.iter().sum()
    }

    /// Events recorded at exactly time 0.
    #[must_use]
    pub fn events_at_time_zero(&self) -> usize {
        match self.times.first() {
            Some(&t) if t == 0.0 => self.events[0],
            _ => 0,
        }
    }

    #[must_use]
    pub fn point(&self, index: usize) -> Option<CurvePoint> {
        (index < self.len()).then(|| CurvePoint {
            time: self.times[index],
            at_risk: self.at_risk[index],
            events: self.events[index],
            censored: self.censored[index],
            survival: self.survival_prob[index],
            std_err: self.std_err[index],
            ci: self.ci[index],
        })
    }

    pub fn points(&self) -> impl Iterator<Item = CurvePoint> + '_ {
        (0..self.len()).filter_map(|i| self.point(i))
    }

    /// Index of the last point at or before `time`.
    pub(crate) fn index_at(&self, time: f64) -> Option<usize> {
        self.times.partition_point(|&t| t <= time).checked_sub(1)
    }

    /// Returns the survival probability at a specific time.
    ///
    /// This uses the step function: the probability stays constant between
    /// event times. Returns `1.0` before the first observed time.
    ///
    /// # Examples
    ///
    /// ```
    /// # use crownsurv_stats::{confidence::ConfidenceOptions, survival::{KaplanMeierCurve, Observation}};
    /// let data = [Observation::event(10.0), Observation::event(20.0)];
    /// let curve = KaplanMeierCurve::estimate(&data, &ConfidenceOptions::default()).unwrap();
    ///
    /// assert_eq!(curve.survival_at(5.0), 1.0);  // Before first event
    /// assert_eq!(curve.survival_at(15.0), 0.5); // After first event
    /// ```
    #[must_use]
    pub fn survival_at(&self, time: f64) -> f64 {
        self.index_at(time).map_or(1.0, |i| self.survival_prob[i])
    }

    /// Probability of having experienced the event by `time` (`1 - S(time)`).
    #[must_use]
    pub fn cumulative_incidence_at(&self, time: f64) -> f64 {
        1.0 - self.survival_at(time)
    }

    /// Returns the median survival time.
    ///
    /// See [`quantile`](Self::quantile).
    #[must_use]
    pub fn median(&self) -> SurvivalQuantile {
        self.quantile(0.5)
    }

    /// Returns the first time at which survival falls to or below `p`.
    ///
    /// When the curve sits exactly at `p` over an interval, the midpoint
    /// between the start of that interval and the next drop is returned.
    /// Confidence limits are found the same way on the confidence bounds:
    /// the lower limit from the upper bound, the upper limit from the lower
    /// bound. A curve that never reaches `p` yields
    /// [`SurvivalQuantile::NotReached`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use crownsurv_stats::{confidence::ConfidenceOptions, survival::{KaplanMeierCurve, Observation}};
    /// let data = [Observation::event(1.0), Observation::censored(2.0), Observation::censored(3.0)];
    /// let curve = KaplanMeierCurve::estimate(&data, &ConfidenceOptions::default()).unwrap();
    /// assert!(curve.median().is_not_reached());
    /// ```
    #[must_use]
    pub fn quantile(&self, p: f64) -> SurvivalQuantile {
        let Some(time) = first_crossing(&self.times, &self.survival_prob, p) else {
            return SurvivalQuantile::NotReached;
        };

        let upper_bound = self
            .ci
            .iter()
            .zip(&self.survival_prob)
            .map(|(ci, s)| ci.map_or(*s, |ci| ci.upper))
            .collect::<Vec<_>>();
        let lower_bound = self
            .ci
            .iter()
            .zip(&self.survival_prob)
            .map(|(ci, s)| ci.map_or(*s, |ci| ci.lower))
            .collect::<Vec<_>>();

        SurvivalQuantile::Reached {
            time,
            lower: first_crossing(&self.times, &upper_bound, p),
            upper: first_crossing(&self.times, &lower_bound, p),
        }
    }

    /// Restricted mean survival time: the area under the curve on `[0, tau]`.
    ///
    /// Fails with [`SurvivalError::InvalidInput`] when `tau` is negative or
    /// not finite.
    pub fn restricted_mean(&self, tau: f64) -> Result<f64, SurvivalError> {
        if !tau.is_finite() || tau < 0.0 {
            return Err(SurvivalError::invalid_input(format!(
                "restriction time must be finite and non-negative, got {tau}"
            )));
        }
        let mut area = 0.0;
        let mut previous_time = 0.0;
        let mut previous_survival = 1.0;
        for (&time, &survival) in self.times.iter().zip(&self.survival_prob) {
            if time >= tau {
                break;
            }
            area += previous_survival * (time - previous_time);
            previous_time = time;
            previous_survival = survival;
        }
        area += previous_survival * (tau - previous_time);
        Ok(area)
    }
}

/// First time at which `values` falls to or below `p`.
fn first_crossing(times: &[f64], values: &[f64], p: f64) -> Option<f64> {
    let i = values.iter().position(|&v| v <= p + QUANTILE_TOLERANCE)?;
    if (values[i] - p).abs() < QUANTILE_TOLERANCE {
        // Flat exactly at p: midpoint up to the next drop below it
        if let Some(j) = values[i + 1..]
            .iter()
            .position(|&v| v < p - QUANTILE_TOLERANCE)
        {
            return Some((times[i] + times[i + 1 + j]) / 2.0);
        }
    }
    Some(times[i])
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::confidence::ConfidenceType;

    fn toy() -> Vec<Observation> {
        vec![
            Observation::event(1.0),
            Observation::censored(2.0),
            Observation::event(3.0),
            Observation::event(3.0),
            Observation::censored(5.0),
        ]
    }

    fn estimate(data: &[Observation]) -> KaplanMeierCurve {
        KaplanMeierCurve::estimate(data, &ConfidenceOptions::default()).unwrap()
    }

    #[test]
    fn test_toy_curve() {
        let curve = estimate(&toy());
        assert_eq!(curve.times, vec![1.0, 2.0, 3.0, 5.0]);
        assert_eq!(curve.at_risk, vec![5, 4, 3, 1]);
        assert_eq!(curve.events, vec![1, 0, 2, 0]);
        assert_eq!(curve.censored, vec![0, 1, 0, 1]);
        assert_abs_diff_eq!(curve.survival_prob[0], 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.survival_prob[1], 0.8, epsilon = 1e-12);
        // 0.8 * (1 - 2/3)
        assert_abs_diff_eq!(curve.survival_prob[2], 0.8 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.survival_prob[3], 0.8 / 3.0, epsilon = 1e-12);

        // Greenwood: 0.8 * sqrt(1 / (5 * 4))
        assert_abs_diff_eq!(curve.std_err[0], 0.178_885_438_199_983, epsilon = 1e-12);
        let ci = curve.ci[0].unwrap();
        assert_abs_diff_eq!(ci.lower, 0.516_125_760_342_172, epsilon = 1e-9);
        assert_abs_diff_eq!(ci.upper, 1.0);
        assert_eq!(curve.ci[1], curve.ci[0]);

        // (0.8/3) * sqrt(1/20 + 2/3)
        assert_abs_diff_eq!(curve.std_err[2], 0.225_749_779_541_339, epsilon = 1e-12);
        let ci = curve.ci[2].unwrap();
        assert_abs_diff_eq!(ci.lower, 0.050_742_765_126_671, epsilon = 1e-9);
        assert_abs_diff_eq!(ci.upper, 1.0);
    }

    #[test]
    fn test_all_at_risk_fail() {
        let data = [Observation::event(1.0), Observation::event(2.0), Observation::event(2.0)];
        let curve = estimate(&data);
        assert_eq!(curve.survival_prob[1], 0.0);
        assert_eq!(curve.std_err[1], 0.0);
        assert!(curve.ci[1].is_none());
    }

    #[test]
    fn test_toy_median() {
        // The upper bound never leaves 1.0, so the lower limit is undefined
        let median = estimate(&toy()).median();
        assert_eq!(
            median,
            SurvivalQuantile::Reached {
                time: 3.0,
                lower: None,
                upper: Some(3.0),
            }
        );
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = KaplanMeierCurve::estimate(&[], &ConfidenceOptions::default()).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_invalid_observations() {
        assert!(Observation::new(-1.0, 1).unwrap_err().is_invalid_input());
        assert!(Observation::new(f64::NAN, 0).unwrap_err().is_invalid_input());
        assert!(Observation::new(1.0, 2).unwrap_err().is_invalid_input());
        assert_eq!(Observation::new(1.5, 1).unwrap(), Observation::event(1.5));
        assert_eq!(Observation::new(0.0, 0).unwrap(), Observation::censored(0.0));

        let data = [Observation::event(1.0), Observation::censored(-0.5)];
        let err = KaplanMeierCurve::estimate(&data, &ConfidenceOptions::default()).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_invalid_confidence_level() {
        let options = ConfidenceOptions::default().with_level(1.5);
        let err = KaplanMeierCurve::estimate(&toy(), &options).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_time_zero_events_are_kept() {
        let data = [
            Observation::event(0.0),
            Observation::event(0.0),
            Observation::censored(0.0),
            Observation::event(2.0),
            Observation::censored(4.0),
        ];
        let curve = estimate(&data);
        assert_eq!(curve.times[0], 0.0);
        assert_eq!(curve.events_at_time_zero(), 2);
        assert_abs_diff_eq!(curve.survival_prob[0], 0.6, epsilon = 1e-12);
        assert_eq!(curve.at_risk, vec![5, 2, 1]);
    }

    #[test]
    fn test_censoring_only_has_no_interval() {
        let data = [Observation::censored(1.0), Observation::censored(2.0)];
        let curve = estimate(&data);
        assert_eq!(curve.survival_prob, vec![1.0, 1.0]);
        assert!(curve.ci.iter().all(Option::is_none));
        assert!(curve.median().is_not_reached());
    }

    #[test]
    fn test_median_exactly_half_takes_midpoint() {
        // S = 0.5 on [2, 4), then drops to 0 at 4
        let data = [Observation::event(2.0), Observation::event(4.0)];
        let curve = estimate(&data);
        assert_abs_diff_eq!(curve.survival_at(2.0), 0.5, epsilon = 1e-12);
        assert_eq!(curve.median().time(), Some(3.0));
    }

    #[test]
    fn test_median_not_reached_even_if_lower_bound_crosses() {
        let mut data = vec![Observation::event(1.0), Observation::event(2.0)];
        data.extend((0..4).map(|i| Observation::censored(3.0 + f64::from(i))));
        let curve = estimate(&data);
        assert!(curve.survival_prob.iter().all(|&s| s > 0.5));
        assert!(curve.ci.iter().flatten().any(|ci| ci.lower <= 0.5));
        assert_eq!(curve.median(), SurvivalQuantile::NotReached);
        assert_eq!(curve.median().time(), None);
    }

    #[test]
    fn test_survival_at_step_function() {
        let curve = estimate(&toy());
        assert_eq!(curve.survival_at(0.5), 1.0);
        assert_abs_diff_eq!(curve.survival_at(1.0), 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.survival_at(2.9), 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.survival_at(3.0), 0.8 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.survival_at(100.0), 0.8 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.cumulative_incidence_at(2.0), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_restricted_mean() {
        let curve = estimate(&toy());
        // 1.0 on [0, 1), 0.8 on [1, 3), 0.8 / 3 afterwards
        assert_abs_diff_eq!(
            curve.restricted_mean(4.0).unwrap(),
            1.0 + 1.6 + 0.8 / 3.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(curve.restricted_mean(2.0).unwrap(), 1.8, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.restricted_mean(0.5).unwrap(), 0.5, epsilon = 1e-12);
        assert!(curve.restricted_mean(-1.0).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_reverse_curve() {
        let curve = KaplanMeierCurve::reverse(&toy(), &ConfidenceOptions::default()).unwrap();
        assert_eq!(curve.events, vec![0, 1, 0, 1]);
        assert_eq!(curve.censored, vec![1, 0, 2, 0]);
        // Follow-up "events" at 2 (n=4) and 5 (n=1)
        assert_abs_diff_eq!(curve.survival_at(2.0), 0.75, epsilon = 1e-12);
        assert_eq!(curve.survival_at(5.0), 0.0);
        assert_eq!(curve.median().time(), Some(5.0));
    }

    #[test]
    fn test_estimate_strata_in_key_order() {
        let data = vec![
            ("b", Observation::event(1.0)),
            ("a", Observation::event(2.0)),
            ("b", Observation::censored(3.0)),
            ("a", Observation::event(4.0)),
        ];
        let curves = KaplanMeierCurve::estimate_strata(data, &ConfidenceOptions::default()).unwrap();
        let keys = curves.keys().copied().collect::<Vec<_>>();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(curves["a"].subjects(), 2);
        assert_eq!(curves["b"].total_censored(), 1);

        let empty: Vec<(&str, Observation)> = vec![];
        let err = KaplanMeierCurve::estimate_strata(empty, &ConfidenceOptions::default())
            .unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_log_log_transform_is_used() {
        let options = ConfidenceOptions::default().with_transform(ConfidenceType::LogLog);
        let curve = KaplanMeierCurve::estimate(&toy(), &options).unwrap();
        let ci = curve.ci[0].unwrap();
        assert_abs_diff_eq!(ci.lower, 0.203_809_263_267_639, epsilon = 1e-9);
        assert_abs_diff_eq!(ci.upper, 0.969_179_788_866_742, epsilon = 1e-9);
    }
}
