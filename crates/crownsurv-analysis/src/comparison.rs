//! Log-rank comparison of survival across the strata of a cohort.

use std::{collections::BTreeMap, fmt::Display};

use crownsurv_stats::{
    log_rank::{LogRankOptions, LogRankTest},
    survival::Observation,
};
use tracing::debug;

use crate::{
    AnalysisError,
    cohort::{Cohort, Level, SubjectRecord},
};

/// Tests whether the groups defined by `group` share one survival
/// distribution.
///
/// Strata appear in the result in key order.
pub fn log_rank_by_group<K, F>(
    cohort: &Cohort,
    options: &LogRankOptions,
    mut group: F,
) -> Result<LogRankTest<K>, AnalysisError>
where
    K: Ord + Display,
    F: FnMut(&SubjectRecord) -> K,
{
    let mut strata: BTreeMap<K, Vec<Observation>> = BTreeMap::new();
    for (subject, observation) in cohort.iter() {
        strata.entry(group(subject)).or_default().push(observation);
    }
    let labels = strata
        .keys()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    let test = LogRankTest::compute(strata, options)
        .map_err(AnalysisError::survival(format!("log-rank test across [{labels}]")))?;
    debug!(strata = %labels, p_value = test.p_value, "compared strata");
    Ok(test)
}

/// Tests whether survival differs between the levels of a covariate.
///
/// Strata are labelled by level; numeric codes order numerically, labels
/// alphabetically after them.
///
/// # Examples
///
/// ```
/// use crownsurv_analysis::{cohort::{Cohort, SubjectRecord}, comparison};
/// use crownsurv_stats::log_rank::LogRankOptions;
///
/// let cohort = Cohort::new(vec![
///     SubjectRecord::new("a", 1.0, 1).with_covariate("rct", 1.0),
///     SubjectRecord::new("b", 3.0, 1).with_covariate("rct", 1.0),
///     SubjectRecord::new("c", 2.0, 1).with_covariate("rct", 0.0),
///     SubjectRecord::new("d", 4.0, 0).with_covariate("rct", 0.0),
/// ])
/// .unwrap();
///
/// let test = comparison::log_rank_by_covariate(&cohort, "rct", &LogRankOptions::default()).unwrap();
/// assert_eq!(test.groups[0].stratum, "0");
/// assert_eq!(test.degrees_of_freedom, 1);
/// ```
pub fn log_rank_by_covariate(
    cohort: &Cohort,
    covariate: &str,
    options: &LogRankOptions,
) -> Result<LogRankTest<String>, AnalysisError> {
    let levels = cohort.level_covariate(covariate)?;
    let mut levels = levels.into_iter();
    let test = log_rank_by_group(cohort, options, |_| {
        levels.next().unwrap_or_else(|| Level::from(""))
    })?;
    Ok(test.map_strata(|level| level.to_string()))
}
