//! Descriptive summary of a cohort.
//!
//! Reports what a reader needs before looking at any survival estimate: how
//! many subjects and events, how long they were followed, whether events were
//! recorded at time 0, and how each covariate is distributed.
//!
//! Median follow-up is the reverse Kaplan-Meier median, i.e. the median of
//! the censoring distribution, which is not shortened by early events.

use std::collections::BTreeMap;

use crownsurv_stats::{
    confidence::ConfidenceOptions,
    descriptive::DescriptiveStats,
    survival::{KaplanMeierCurve, SurvivalQuantile},
};
use serde::Serialize;
use tracing::warn;

use crate::{
    AnalysisError,
    cohort::{Cohort, CovariateKind, CovariateValue},
};

/// Subjects and events at one level of a categorical covariate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelCount {
    pub level: String,
    pub subjects: usize,
    pub events: usize,
    /// Share of the subjects with a recorded value, in percent.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CovariateSummary {
    Numeric { stats: DescriptiveStats },
    Categorical { levels: Vec<LevelCount> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CovariateDescription {
    pub name: String,
    /// Subjects without a value.
    pub missing: usize,
    pub summary: CovariateSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortDescription {
    pub subjects: usize,
    pub events: usize,
    pub censored: usize,
    /// Events recorded at exactly time 0 (failure at placement).
    pub events_at_time_zero: usize,
    /// Distribution of observed times, events and censorings together.
    pub follow_up: DescriptiveStats,
    /// Reverse Kaplan-Meier median follow-up.
    pub median_follow_up: SurvivalQuantile,
    pub covariates: Vec<CovariateDescription>,
}

impl CohortDescription {
    /// Describes the cohort and every recorded covariate, in name order.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::TypeMismatch`] when a covariate mixes numbers and
    /// labels; [`AnalysisError::Survival`] when the confidence options are
    /// invalid.
    #[expect(clippy::cast_precision_loss)]
    pub fn new(cohort: &Cohort, options: &ConfidenceOptions) -> Result<Self, AnalysisError> {
        let observations = cohort.observations();
        let reverse = KaplanMeierCurve::reverse(observations, options)
            .map_err(AnalysisError::survival("median follow-up"))?;

        let events = observations.iter().filter(|o| o.event).count();
        let events_at_time_zero = observations
            .iter()
            .filter(|o| o.event && o.time <= 0.0)
            .count();
        if events_at_time_zero > 0 {
            warn!(events_at_time_zero, "cohort has events at time 0");
        }

        let follow_up = DescriptiveStats::new(observations.iter().map(|o| o.time))
            .ok_or(AnalysisError::EmptyCohort)?;

        let mut covariates = vec![];
        for name in cohort.covariate_names() {
            let kind = cohort.covariate_kind(name)?;
            let recorded = cohort
                .iter()
                .filter_map(|(subject, observation)| {
                    subject.covariates.get(name).map(|value| (value, observation))
                })
                .collect::<Vec<_>>();
            let missing = cohort.len() - recorded.len();

            let summary = match kind {
                CovariateKind::Numeric => {
                    let values = recorded.iter().filter_map(|(value, _)| match value {
                        CovariateValue::Number(number) => Some(*number),
                        CovariateValue::Label(_) => None,
                    });
                    let stats = DescriptiveStats::new(values).ok_or_else(|| {
                        AnalysisError::TypeMismatch {
                            covariate: name.to_owned(),
                            problem: "has no numeric values".to_owned(),
                        }
                    })?;
                    CovariateSummary::Numeric { stats }
                }
                CovariateKind::Categorical => {
                    let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
                    for (value, observation) in &recorded {
                        let entry = counts.entry(value.to_label()).or_default();
                        entry.0 += 1;
                        entry.1 += usize::from(observation.event);
                    }
                    let total = recorded.len() as f64;
                    let levels = counts
                        .into_iter()
                        .map(|(level, (subjects, events))| LevelCount {
                            level,
                            subjects,
                            events,
                            percent: 100.0 * subjects as f64 / total,
                        })
                        .collect();
                    CovariateSummary::Categorical { levels }
                }
            };

            covariates.push(CovariateDescription {
                name: name.to_owned(),
                missing,
                summary,
            });
        }

        Ok(Self {
            subjects: cohort.len(),
            events,
            censored: cohort.len() - events,
            events_at_time_zero,
            follow_up,
            median_follow_up: reverse.median(),
            covariates,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::cohort::SubjectRecord;

    fn cohort() -> Cohort {
        Cohort::new(vec![
            SubjectRecord::new("a", 0.0, 1)
                .with_covariate("material", "metal")
                .with_covariate("age", 40.0),
            SubjectRecord::new("b", 2.0, 0)
                .with_covariate("material", "glass")
                .with_covariate("age", 50.0),
            SubjectRecord::new("c", 3.0, 1).with_covariate("material", "metal"),
            SubjectRecord::new("d", 4.0, 0)
                .with_covariate("material", "metal")
                .with_covariate("age", 60.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_counts() {
        let description = CohortDescription::new(&cohort(), &ConfidenceOptions::default()).unwrap();
        assert_eq!(description.subjects, 4);
        assert_eq!((description.events, description.censored), (2, 2));
        assert_eq!(description.events_at_time_zero, 1);
        assert_eq!(description.follow_up.max, 4.0);
        assert_abs_diff_eq!(description.follow_up.median, 2.5);
    }

    #[test]
    fn test_median_follow_up() {
        // Reverse curve: censorings at 2 (n = 3) and 4 (n = 1) are its events
        let description = CohortDescription::new(&cohort(), &ConfidenceOptions::default()).unwrap();
        assert_eq!(description.median_follow_up.time(), Some(4.0));
    }

    #[test]
    fn test_covariates() {
        let description = CohortDescription::new(&cohort(), &ConfidenceOptions::default()).unwrap();
        let names = description
            .covariates
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["age", "material"]);

        let age = &description.covariates[0];
        assert_eq!(age.missing, 1);
        let CovariateSummary::Numeric { stats } = &age.summary else {
            panic!("age should be numeric");
        };
        assert_abs_diff_eq!(stats.mean, 50.0);

        let CovariateSummary::Categorical { levels } = &description.covariates[1].summary else {
            panic!("material should be categorical");
        };
        assert_eq!(levels[0].level, "glass");
        assert_eq!((levels[1].subjects, levels[1].events), (3, 2));
        assert_abs_diff_eq!(levels[1].percent, 75.0);
    }
}
