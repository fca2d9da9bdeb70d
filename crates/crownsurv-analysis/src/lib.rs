//! Cohort-level survival analysis for prepared subject records.
//!
//! This crate connects subject records (one row per restoration, with its
//! follow-up time, event indicator and covariates) to the estimators in
//! [`crownsurv_stats`].
//!
//! # Overview
//!
//! The analysis follows the usual order of a time-to-event report:
//!
//! 1. **Load the cohort** ([`cohort::Cohort`]): validate records once, up front
//! 2. **Describe it** ([`describe::CohortDescription`]): counts, follow-up,
//!    covariate distributions
//! 3. **Estimate survival** ([`survival::SurvivalStatsMap`]): Kaplan-Meier
//!    curves overall or per stratum, with fixed-time and median summaries
//! 4. **Compare strata** ([`comparison`]): log-rank test across the levels of a
//!    covariate
//! 5. **Model covariates** ([`regression::CoxSpec`]): Cox proportional-hazards
//!    regression on named covariates
//!
//! # Examples
//!
//! ```
//! use crownsurv_analysis::{
//!     cohort::{Cohort, Level, SubjectRecord},
//!     survival::SurvivalStatsMap,
//! };
//! use crownsurv_stats::confidence::ConfidenceOptions;
//!
//! let cohort = Cohort::new(vec![
//!     SubjectRecord::new("r1", 1.0, 1).with_covariate("material", "metal"),
//!     SubjectRecord::new("r2", 2.0, 0).with_covariate("material", "glass"),
//!     SubjectRecord::new("r3", 3.0, 1).with_covariate("material", "metal"),
//!     SubjectRecord::new("r4", 4.0, 1).with_covariate("material", "glass"),
//! ])
//! .unwrap();
//!
//! let stats =
//!     SurvivalStatsMap::collect_by_covariate(&cohort, "material", &ConfidenceOptions::default())
//!         .unwrap();
//! let strata = stats.map.keys().map(ToString::to_string).collect::<Vec<_>>();
//! assert_eq!(strata, vec!["glass", "metal"]);
//! // Metal sits at exactly 0.5 between t = 1 and t = 3
//! assert_eq!(stats.map[&Level::from("metal")].median.time(), Some(2.0));
//! ```

use crownsurv_stats::SurvivalError;

pub mod cohort;
pub mod comparison;
pub mod describe;
pub mod regression;
pub mod survival;

/// Failure of a cohort-level analysis.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::IsVariant)]
pub enum AnalysisError {
    #[display("cohort has no subjects")]
    EmptyCohort,
    #[display("subject id '{id}' appears more than once")]
    DuplicateSubject { id: String },
    #[display("subject '{id}' has no value for covariate '{covariate}'")]
    MissingCovariate { id: String, covariate: String },
    #[display("covariate '{covariate}' {problem}")]
    TypeMismatch { covariate: String, problem: String },
    #[display("subject '{id}' has non-finite value {value} for covariate '{covariate}'")]
    NonFiniteCovariate {
        id: String,
        covariate: String,
        value: f64,
    },
    /// A statistical computation failed; `context` names the subject,
    /// stratum or analysis involved.
    #[display("{context}: {source}")]
    Survival {
        context: String,
        source: SurvivalError,
    },
}

impl AnalysisError {
    pub(crate) fn survival(context: impl Into<String>) -> impl FnOnce(SurvivalError) -> Self {
        let context = context.into();
        move |source| Self::Survival { context, source }
    }

    /// The underlying statistical error, if any.
    #[must_use]
    pub fn survival_error(&self) -> Option<&SurvivalError> {
        match self {
            Self::Survival { source, .. } => Some(source),
            _ => None,
        }
    }
}
