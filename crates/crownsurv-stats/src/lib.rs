//! Statistical core for time-to-event analysis.
//!
//! This crate provides the numerical procedures used to analyze right-censored
//! survival data:
//!
//! - **Kaplan-Meier estimation**: Product-limit survival curves with Greenwood
//!   standard errors and transformed confidence bands
//! - **Curve summaries**: Fixed-time survival probabilities, median (and other
//!   quantile) survival times with confidence intervals
//! - **Group comparison**: Log-rank (Mantel-Cox) test with optional
//!   Fleming-Harrington weights
//! - **Regression**: Cox proportional-hazards model fitted by Newton-Raphson
//! - **Descriptive statistics**: Simple summaries for numeric covariates
//!
//! # Modules
//!
//! - [`survival`]: Kaplan-Meier survival curves for analyzing time-to-event data
//! - [`confidence`]: Confidence level and transform used for pointwise bands
//! - [`summary`]: Reshaping curves into per-time and per-stratum summary rows
//! - [`log_rank`]: Comparison of survival distributions across strata
//! - [`cox`]: Cox proportional-hazards regression
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//!
//! # Examples
//!
//! ## Estimating a survival curve
//!
//! ```
//! use crownsurv_stats::{
//!     confidence::ConfidenceOptions,
//!     survival::{KaplanMeierCurve, Observation},
//! };
//!
//! let data = [
//!     Observation::event(1.0),
//!     Observation::censored(2.0),
//!     Observation::event(3.0),
//!     Observation::event(3.0),
//!     Observation::censored(5.0),
//! ];
//! let curve = KaplanMeierCurve::estimate(&data, &ConfidenceOptions::default()).unwrap();
//! assert_eq!(curve.survival_at(1.5), 0.8);
//! assert_eq!(curve.median().time(), Some(3.0));
//! ```
//!
//! ## Comparing two groups
//!
//! ```
//! use crownsurv_stats::{
//!     log_rank::{LogRankOptions, LogRankTest},
//!     survival::Observation,
//! };
//!
//! let groups = vec![
//!     ("A", vec![Observation::event(1.0), Observation::event(3.0), Observation::censored(5.0)]),
//!     ("B", vec![Observation::event(2.0), Observation::event(4.0), Observation::censored(7.0)]),
//! ];
//! let test = LogRankTest::compute(groups, &LogRankOptions::default()).unwrap();
//! assert_eq!(test.degrees_of_freedom, 1);
//! assert!(test.p_value > 0.05);
//! ```

pub mod confidence;
pub mod cox;
pub mod descriptive;
mod distribution;
mod linalg;
pub mod log_rank;
pub mod summary;
pub mod survival;

/// Failure of a survival computation.
///
/// Every computation in this crate is a deterministic function of its input,
/// so none of these errors is transient: repeating the call with the same
/// input reproduces the same failure.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::IsVariant)]
pub enum SurvivalError {
    /// Malformed time, event indicator, option, or covariate value.
    #[display("invalid input: {message}")]
    InvalidInput { message: String },
    /// Too few strata, empty strata, or no events where a comparison needs them.
    #[display("insufficient data: {message}")]
    InsufficientData { message: String },
    /// An iterative fit failed to stabilize.
    #[display("{computation} did not converge after {iterations} iterations")]
    NonConvergence {
        computation: String,
        iterations: usize,
    },
    /// The covariate design is rank-deficient.
    #[display("collinear design: {message}")]
    Collinearity { message: String },
}

impl SurvivalError {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn insufficient_data(message: impl Into<String>) -> Self {
        Self::InsufficientData {
            message: message.into(),
        }
    }

    pub(crate) fn non_convergence(computation: impl Into<String>, iterations: usize) -> Self {
        Self::NonConvergence {
            computation: computation.into(),
            iterations,
        }
    }

    pub(crate) fn collinearity(message: impl Into<String>) -> Self {
        Self::Collinearity {
            message: message.into(),
        }
    }
}
