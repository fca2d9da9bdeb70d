//! Log-rank comparison of survival distributions across strata.
//!
//! At each distinct event time of the pooled sample, the events observed in
//! each stratum are compared with the number expected if all strata shared
//! one survival distribution (hypergeometric expectation given the risk
//! sets). The accumulated differences `O - E` and their covariance give a
//! chi-squared statistic with `k - 1` degrees of freedom for `k` strata.
//!
//! With a Fleming-Harrington weight `ρ > 0`, each event time is weighted by
//! `S(t-)^ρ` where `S` is the pooled Kaplan-Meier estimate, emphasizing early
//! differences (`ρ = 1` is the Peto-Peto modification).

use ndarray::{Array1, Array2, Axis};
use serde::Serialize;
use tracing::debug;

use crate::{SurvivalError, distribution, linalg, survival::Observation};

/// Options for [`LogRankTest::compute`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LogRankOptions {
    /// Fleming-Harrington exponent; 0 gives the ordinary log-rank test.
    pub rho: f64,
}

impl LogRankOptions {
    #[must_use]
    pub fn with_rho(mut self, rho: f64) -> Self {
        self.rho = rho;
        self
    }
}

/// Observed and expected events of one stratum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRankGroup<K> {
    pub stratum: K,
    pub subjects: usize,
    pub observed: usize,
    /// Events expected under the null hypothesis of equal survival.
    pub expected: f64,
    /// Diagonal of the (weighted) covariance of `O - E`.
    pub variance: f64,
}

impl<K> LogRankGroup<K> {
    /// `(O - E)² / E`, the per-stratum contribution shown in log-rank tables.
    ///
    /// NaN for a stratum with no subject at risk at any event time.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn chi_squared_contribution(&self) -> f64 {
        let diff = self.observed as f64 - self.expected;
        diff * diff / self.expected
    }
}

/// Result of a log-rank test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRankTest<K> {
    pub groups: Vec<LogRankGroup<K>>,
    pub statistic: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
    pub rho: f64,
}

impl<K> LogRankTest<K> {
    /// Tests whether all strata share the same survival distribution.
    ///
    /// # Arguments
    ///
    /// * `strata` - Stratum labels paired with their observations; the
    ///   output keeps this order
    /// * `options` - Weighting of event times
    ///
    /// A stratum whose subjects all leave before the first pooled event
    /// stays in [`LogRankTest::groups`] with `O = E = 0` but does not count
    /// towards the degrees of freedom.
    ///
    /// # Errors
    ///
    /// - [`SurvivalError::InsufficientData`] for fewer than two strata, an
    ///   empty stratum, no events at all, fewer than two strata at risk at
    ///   any event time, or a degenerate covariance
    /// - [`SurvivalError::InvalidInput`] for invalid observations or a
    ///   negative or non-finite `rho`
    #[expect(clippy::cast_precision_loss)]
    pub fn compute<I>(strata: I, options: &LogRankOptions) -> Result<Self, SurvivalError>
    where
        I: IntoIterator<Item = (K, Vec<Observation>)>,
    {
        if !options.rho.is_finite() || options.rho < 0.0 {
            return Err(SurvivalError::invalid_input(format!(
                "rho must be finite and non-negative, got {}",
                options.rho
            )));
        }

        let (labels, strata): (Vec<K>, Vec<Vec<Observation>>) = strata.into_iter().unzip();
        let k = strata.len();
        if k < 2 {
            return Err(SurvivalError::insufficient_data(format!(
                "log-rank test needs at least two strata, got {k}"
            )));
        }
        if let Some(empty) = strata.iter().position(Vec::is_empty) {
            return Err(SurvivalError::insufficient_data(format!(
                "stratum #{} has no subjects",
                empty + 1
            )));
        }

        let mut pooled = vec![];
        for (g, observations) in strata.iter().enumerate() {
            for observation in observations {
                observation.validate()?;
                pooled.push((observation.time, observation.event, g));
            }
        }
        pooled.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut at_risk = strata.iter().map(Vec::len).collect::<Vec<_>>();
        let mut observed = vec![0_usize; k];
        let mut expected = vec![0.0; k];
        let mut score = Array1::<f64>::zeros(k);
        let mut covariance = Array2::<f64>::zeros((k, k));
        let mut pooled_survival: f64 = 1.0;

        let mut i = 0;
        while i < pooled.len() {
            let current_time = pooled[i].0;
            let mut events = vec![0_usize; k];
            let mut leaving = vec![0_usize; k];
            let mut j = i;
            while j < pooled.len() && pooled[j].0 == current_time {
                let (_, event, g) = pooled[j];
                if event {
                    events[g] += 1;
                }
                leaving[g] += 1;
                j += 1;
            }

            let d_total = events.iter().sum::<usize>();
            if d_total > 0 {
                let n_total = at_risk.iter().sum::<usize>() as f64;
                let d = d_total as f64;
                let weight = pooled_survival.powf(options.rho);
                let tie_factor = if n_total > 1.0 {
                    d * (n_total - d) / (n_total - 1.0)
                } else {
                    0.0
                };

                for g in 0..k {
                    let share = at_risk[g] as f64 / n_total;
                    let expected_here = d * share;
                    observed[g] += events[g];
                    expected[g] += expected_here;
                    score[g] += weight * (events[g] as f64 - expected_here);

                    for h in 0..k {
                        let other = at_risk[h] as f64 / n_total;
                        let indicator = if g == h { 1.0 } else { 0.0 };
                        covariance[[g, h]] +=
                            weight * weight * tie_factor * share * (indicator - other);
                    }
                }
                pooled_survival *= 1.0 - d / n_total;
            }

            for g in 0..k {
                at_risk[g] -= leaving[g];
            }
            i = j;
        }

        if observed.iter().all(|&o| o == 0) {
            return Err(SurvivalError::insufficient_data(
                "log-rank test needs at least one observed event",
            ));
        }

        // Strata never at risk at an event time have zero score and zero
        // covariance rows; they carry no information and are left out.
        let informative = (0..k)
            .filter(|&g| covariance[[g, g]] > 0.0)
            .collect::<Vec<_>>();
        if informative.len() < 2 {
            return Err(SurvivalError::insufficient_data(format!(
                "log-rank test needs at least two strata at risk at an event time, got {}",
                informative.len()
            )));
        }
        let degrees_of_freedom = informative.len() - 1;
        let reduced = &informative[..degrees_of_freedom];
        let reduced_score = score.select(Axis(0), reduced);
        let reduced_covariance = covariance
            .select(Axis(0), reduced)
            .select(Axis(1), reduced);
        let statistic = linalg::inverse_quadratic_form(&reduced_covariance, &reduced_score)
            .map_err(|singular| {
                SurvivalError::insufficient_data(format!(
                    "log-rank covariance is singular at stratum #{}",
                    singular.index + 1
                ))
            })?;
        let p_value = distribution::chi_squared_sf(statistic, degrees_of_freedom);
        debug!(
            strata = k,
            informative = informative.len(),
            statistic,
            p_value,
            "computed log-rank test"
        );

        let groups = labels
            .into_iter()
            .enumerate()
            .map(|(g, stratum)| LogRankGroup {
                stratum,
                subjects: strata[g].len(),
                observed: observed[g],
                expected: expected[g],
                variance: covariance[[g, g]],
            })
            .collect();

        Ok(Self {
            groups,
            statistic,
            degrees_of_freedom,
            p_value,
            rho: options.rho,
        })
    }

    /// Relabels the strata, keeping their order.
    #[must_use]
    pub fn map_strata<L, F>(self, mut f: F) -> LogRankTest<L>
    where
        F: FnMut(K) -> L,
    {
        let groups = self
            .groups
            .into_iter()
            .map(|group| LogRankGroup {
                stratum: f(group.stratum),
                subjects: group.subjects,
                observed: group.observed,
                expected: group.expected,
                variance: group.variance,
            })
            .collect();
        LogRankTest {
            groups,
            statistic: self.statistic,
            degrees_of_freedom: self.degrees_of_freedom,
            p_value: self.p_value,
            rho: self.rho,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn group_a() -> Vec<Observation> {
        vec![
            Observation::event(1.0),
            Observation::event(3.0),
            Observation::censored(5.0),
            Observation::event(6.0),
        ]
    }

    fn group_b() -> Vec<Observation> {
        vec![
            Observation::event(2.0),
            Observation::event(4.0),
            Observation::event(4.0),
            Observation::censored(7.0),
            Observation::event(8.0),
        ]
    }

    #[test]
    fn test_two_groups() {
        let test = LogRankTest::compute(
            vec![("A", group_a()), ("B", group_b())],
            &LogRankOptions::default(),
        )
        .unwrap();

        assert_eq!(test.degrees_of_freedom, 1);
        assert_eq!(test.groups[0].stratum, "A");
        assert_eq!(test.groups[0].observed, 3);
        assert_eq!(test.groups[1].observed, 4);
        assert_abs_diff_eq!(test.groups[0].expected, 2.248_015_873_015_873, epsilon = 1e-12);
        assert_abs_diff_eq!(test.groups[1].expected, 4.751_984_126_984_127, epsilon = 1e-12);
        assert_abs_diff_eq!(test.groups[0].variance, 1.303_964_317_208_365, epsilon = 1e-12);
        assert_abs_diff_eq!(test.statistic, 0.433_662_271_101_641, epsilon = 1e-10);
        assert_abs_diff_eq!(test.p_value, 0.510_197_377_514_978, epsilon = 1e-8);

        // Expected events add up to observed events
        let total_expected = test.groups.iter().map(|g| g.expected).sum::<f64>();
        assert_abs_diff_eq!(total_expected, 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_map_strata_keeps_order() {
        let test = LogRankTest::compute(
            vec![(2, group_a()), (1, group_b())],
            &LogRankOptions::default(),
        )
        .unwrap();
        let relabeled = test.clone().map_strata(|g| format!("group {g}"));
        assert_eq!(relabeled.groups[0].stratum, "group 2");
        assert_eq!(relabeled.groups[1].stratum, "group 1");
        assert_eq!(relabeled.groups[0].observed, test.groups[0].observed);
        assert_eq!(relabeled.statistic, test.statistic);
    }

    #[test]
    fn test_statistic_is_symmetric_in_group_order() {
        let ab = LogRankTest::compute(
            vec![("A", group_a()), ("B", group_b())],
            &LogRankOptions::default(),
        )
        .unwrap();
        let ba = LogRankTest::compute(
            vec![("B", group_b()), ("A", group_a())],
            &LogRankOptions::default(),
        )
        .unwrap();
        assert_abs_diff_eq!(ab.statistic, ba.statistic, epsilon = 1e-12);
    }

    #[test]
    fn test_peto_peto_weights() {
        let test = LogRankTest::compute(
            vec![("A", group_a()), ("B", group_b())],
            &LogRankOptions::default().with_rho(1.0),
        )
        .unwrap();
        assert_abs_diff_eq!(test.groups[0].variance, 0.782_167_352_537_723, epsilon = 1e-12);
        assert_abs_diff_eq!(test.statistic, 0.343_739_038_933_708, epsilon = 1e-10);
        assert_abs_diff_eq!(test.p_value, 0.557_678_888_043_836, epsilon = 1e-8);
    }

    #[test]
    fn test_three_groups() {
        let group_c = vec![
            Observation::censored(1.0),
            Observation::event(2.0),
            Observation::event(9.0),
        ];
        let test = LogRankTest::compute(
            vec![("A", group_a()), ("B", group_b()), ("C", group_c)],
            &LogRankOptions::default(),
        )
        .unwrap();
        assert_eq!(test.degrees_of_freedom, 2);
        assert_abs_diff_eq!(test.groups[2].expected, 2.810_714_285_714_286, epsilon = 1e-12);
        assert_abs_diff_eq!(test.statistic, 0.852_340_000_930_124, epsilon = 1e-10);
        // Two degrees of freedom: p = exp(-x/2)
        assert_abs_diff_eq!(test.p_value, 0.653_005_321_475_824, epsilon = 1e-8);
    }

    #[test]
    fn test_clearly_different_groups() {
        let early = (1..=20).map(|t| Observation::event(f64::from(t))).collect();
        let late = (1..=20)
            .map(|t| Observation::event(f64::from(t) + 20.0))
            .collect();
        let test =
            LogRankTest::compute(vec![(0, early), (1, late)], &LogRankOptions::default()).unwrap();
        assert!(test.p_value < 0.001);
    }

    #[test]
    fn test_stratum_without_risk_at_events_is_left_out() {
        let early = vec![Observation::censored(0.5)];
        for strata in [
            vec![("A", group_a()), ("B", group_b()), ("early", early.clone())],
            vec![("early", early.clone()), ("A", group_a()), ("B", group_b())],
        ] {
            let test = LogRankTest::compute(strata, &LogRankOptions::default()).unwrap();
            assert_eq!(test.groups.len(), 3);
            assert_eq!(test.degrees_of_freedom, 1);
            assert_abs_diff_eq!(test.statistic, 0.433_662_271_101_641, epsilon = 1e-10);
            assert_abs_diff_eq!(test.p_value, 0.510_197_377_514_978, epsilon = 1e-8);

            let early = test.groups.iter().find(|g| g.stratum == "early").unwrap();
            assert_eq!(early.observed, 0);
            assert_eq!(early.expected, 0.0);
            assert_eq!(early.variance, 0.0);
            assert!(early.chi_squared_contribution().is_nan());
        }

        // Only one stratum left at risk
        let err = LogRankTest::compute(
            vec![("A", group_a()), ("early", early)],
            &LogRankOptions::default(),
        )
        .unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_insufficient_strata() {
        let options = LogRankOptions::default();
        let err = LogRankTest::compute(vec![("A", group_a())], &options).unwrap_err();
        assert!(err.is_insufficient_data());

        let err = LogRankTest::compute(vec![("A", group_a()), ("B", vec![])], &options)
            .unwrap_err();
        assert!(err.is_insufficient_data());

        let err = LogRankTest::compute(
            vec![
                ("A", vec![Observation::censored(1.0)]),
                ("B", vec![Observation::censored(2.0)]),
            ],
            &options,
        )
        .unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_invalid_input() {
        let err = LogRankTest::compute(
            vec![("A", group_a()), ("B", vec![Observation::event(-1.0)])],
            &LogRankOptions::default(),
        )
        .unwrap_err();
        assert!(err.is_invalid_input());

        let err = LogRankTest::compute(
            vec![("A", group_a()), ("B", group_b())],
            &LogRankOptions::default().with_rho(-1.0),
        )
        .unwrap_err();
        assert!(err.is_invalid_input());
    }
}
