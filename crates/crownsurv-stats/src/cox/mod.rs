//! Cox proportional-hazards regression.
//!
//! The model relates covariates to the hazard through
//! `h(t | x) = h₀(t)·exp(x·β)` and leaves the baseline hazard `h₀`
//! unspecified. Coefficients maximize the partial likelihood by
//! Newton-Raphson with step halving; covariates are centered before fitting,
//! which changes neither the coefficients nor their standard errors but keeps
//! `exp(x·β)` well scaled.
//!
//! Tied event times are handled by Efron's approximation unless Breslow's is
//! requested. The method is recorded in the fit.
//!
//! # Examples
//!
//! ```
//! use crownsurv_stats::{
//!     cox::{CoxModel, Covariate, TieMethod},
//!     survival::Observation,
//! };
//!
//! let observations = [
//!     Observation::event(9.0),
//!     Observation::event(1.0),
//!     Observation::censored(1.0),
//!     Observation::event(6.0),
//!     Observation::event(6.0),
//!     Observation::censored(8.0),
//! ];
//! let covariates = [Covariate::numeric("x", vec![0.0, 1.0, 1.0, 1.0, 0.0, 0.0])];
//!
//! let fit = CoxModel::new().fit(&observations, &covariates).unwrap();
//! assert_eq!(fit.ties, TieMethod::Efron);
//! assert!((fit.terms[0].coefficient - 1.6769).abs() < 1e-4);
//! ```

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use self::{
    concordance::concordance_index,
    design::{Covariate, DesignColumn},
};
use self::{
    design::{Design, TermLayout},
    likelihood::{Evaluation, RiskSets},
};
use crate::{
    SurvivalError, confidence::ConfidenceInterval, distribution, linalg, survival::Observation,
};

mod concordance;
mod design;
mod likelihood;

/// Approximation of the partial likelihood for tied event times.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum TieMethod {
    #[display("breslow")]
    Breslow,
    #[default]
    #[display("efron")]
    Efron,
}

/// Fitting options for the Cox model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoxModel {
    ties: TieMethod,
    max_iterations: usize,
    tolerance: f64,
    conf_level: f64,
}

impl Default for CoxModel {
    fn default() -> Self {
        Self {
            ties: TieMethod::default(),
            max_iterations: 20,
            tolerance: 1e-9,
            conf_level: 0.95,
        }
    }
}

impl CoxModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ties(mut self, ties: TieMethod) -> Self {
        self.ties = ties;
        self
    }

    /// Newton-Raphson iterations (including halved steps) before giving up.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Relative change of the log partial likelihood that counts as converged.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Coverage of the hazard-ratio confidence intervals.
    #[must_use]
    pub fn with_conf_level(mut self, conf_level: f64) -> Self {
        self.conf_level = conf_level;
        self
    }

    /// Fits the model.
    ///
    /// # Arguments
    ///
    /// * `observations` - One observation per subject
    /// * `covariates` - Covariate columns, each with one value per subject
    ///
    /// # Errors
    ///
    /// - [`SurvivalError::InvalidInput`] for invalid observations or options,
    ///   or covariates of the wrong length
    /// - [`SurvivalError::InsufficientData`] when no event was observed
    /// - [`SurvivalError::Collinearity`] for a constant or linearly dependent
    ///   design column, or a singular information matrix
    /// - [`SurvivalError::NonConvergence`] when the iteration budget runs out
    pub fn fit(
        &self,
        observations: &[Observation],
        covariates: &[Covariate],
    ) -> Result<CoxFit, SurvivalError> {
        if observations.is_empty() {
            return Err(SurvivalError::invalid_input(
                "cannot fit a Cox model without observations",
            ));
        }
        if self.max_iterations == 0 || self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(SurvivalError::invalid_input(format!(
                "invalid iteration settings: max_iterations = {}, tolerance = {}",
                self.max_iterations, self.tolerance
            )));
        }
        for observation in observations {
            observation.validate()?;
        }
        let z_critical = distribution::normal_critical_value(self.conf_level)?;

        let events = observations.iter().filter(|o| o.event).count();
        if events == 0 {
            return Err(SurvivalError::insufficient_data(
                "Cox model needs at least one observed event",
            ));
        }

        let mut design = Design::build(covariates, observations.len())?;
        let means = design.center();
        design.check_rank()?;

        let sets = RiskSets::new(
            &design.matrix,
            observations.iter().map(|o| o.time).collect(),
            observations.iter().map(|o| o.event).collect(),
            self.ties,
        );

        let null = sets.evaluate(Array1::<f64>::zeros(design.columns.len()).view());
        let score_statistic = linalg::inverse_quadratic_form(&null.information, &null.score)
            .map_err(|singular| singular_information(&design, singular))?;

        let Maximum {
            beta,
            evaluation,
            iterations,
        } = self.maximize(&sets, null.clone())?;

        let covariance = linalg::invert_spd(&evaluation.information)
            .map_err(|singular| singular_information(&design, singular))?;
        let wald_statistic = beta.dot(&evaluation.information.dot(&beta));
        let likelihood_ratio_statistic = 2.0 * (evaluation.log_likelihood - null.log_likelihood);

        let terms = design
            .columns
            .iter()
            .enumerate()
            .map(|(j, column)| {
                let coefficient = beta[j];
                let std_err = covariance[[j, j]].sqrt();
                let z = coefficient / std_err;
                CoxTerm {
                    name: column.label(),
                    column: column.clone(),
                    mean: means[j],
                    coefficient,
                    std_err,
                    hazard_ratio: coefficient.exp(),
                    ci: ConfidenceInterval {
                        lower: (coefficient - z_critical * std_err).exp(),
                        upper: (coefficient + z_critical * std_err).exp(),
                    },
                    z,
                    p_value: distribution::normal_two_sided_p(z),
                }
            })
            .collect::<Vec<_>>();

        let risk_scores = design.matrix.dot(&beta).to_vec();
        let concordance = concordance_index(&risk_scores, observations);

        let df = design.columns.len();
        let fit = CoxFit {
            ties: self.ties,
            conf_level: self.conf_level,
            subjects: observations.len(),
            events,
            iterations,
            log_likelihood_null: null.log_likelihood,
            log_likelihood: evaluation.log_likelihood,
            likelihood_ratio: GlobalTest::new(likelihood_ratio_statistic, df),
            wald: GlobalTest::new(wald_statistic, df),
            score: GlobalTest::new(score_statistic, df),
            concordance,
            hazard_ratios: hazard_ratio_rows(&design.terms, &terms),
            terms,
        };
        debug!(
            subjects = fit.subjects,
            events = fit.events,
            iterations,
            log_likelihood = fit.log_likelihood,
            "fitted Cox model"
        );
        Ok(fit)
    }

    /// Newton-Raphson with step halving, starting from `β = 0`.
    ///
    /// Every likelihood evaluation counts against the iteration budget. A
    /// step that lowers the likelihood (or overflows) is halved towards the
    /// previous estimate; convergence is only declared after a full step.
    fn maximize(&self, sets: &RiskSets<'_>, start: Evaluation) -> Result<Maximum, SurvivalError> {
        let mut beta = Array1::<f64>::zeros(start.score.len());
        let mut current = start;
        let mut candidate = &beta + &newton_step(&current)?;
        let mut halving = false;

        for iteration in 1..=self.max_iterations {
            let next = sets.evaluate(candidate.view());
            let finite = next.log_likelihood.is_finite();

            if finite
                && !halving
                && relative_change(current.log_likelihood, next.log_likelihood) <= self.tolerance
            {
                return Ok(Maximum {
                    beta: candidate,
                    evaluation: next,
                    iterations: iteration,
                });
            }

            if !finite || next.log_likelihood < current.log_likelihood {
                debug!(iteration, "halving Newton-Raphson step");
                halving = true;
                candidate = (&beta + &candidate) / 2.0;
            } else {
                debug!(
                    iteration,
                    log_likelihood = next.log_likelihood,
                    "Newton-Raphson step"
                );
                halving = false;
                beta = candidate;
                current = next;
                candidate = &beta + &newton_step(&current)?;
            }
        }

        Err(SurvivalError::non_convergence(
            "Cox partial likelihood maximization",
            self.max_iterations,
        ))
    }
}

struct Maximum {
    beta: Array1<f64>,
    evaluation: Evaluation,
    iterations: usize,
}

fn newton_step(at: &Evaluation) -> Result<Array1<f64>, SurvivalError> {
    linalg::solve_spd(&at.information, &at.score).map_err(|singular| {
        SurvivalError::collinearity(format!(
            "information matrix is singular at column #{}",
            singular.index + 1
        ))
    })
}

fn singular_information(design: &Design, singular: linalg::Singular) -> SurvivalError {
    SurvivalError::collinearity(format!(
        "information matrix is singular at column `{}`",
        design.columns[singular.index].label()
    ))
}

fn relative_change(old: f64, new: f64) -> f64 {
    if new == 0.0 {
        (new - old).abs()
    } else {
        (1.0 - old / new).abs()
    }
}

/// Estimate for one design column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoxTerm {
    /// Display label, e.g. `age` or `material=composite`.
    pub name: String,
    pub column: DesignColumn,
    /// Column mean subtracted before fitting.
    pub mean: f64,
    pub coefficient: f64,
    pub std_err: f64,
    pub hazard_ratio: f64,
    /// Confidence interval of the hazard ratio.
    pub ci: ConfidenceInterval,
    /// Wald statistic `coefficient / std_err`.
    pub z: f64,
    pub p_value: f64,
}

/// One row of the hazard-ratio table.
///
/// Reference levels of categorical covariates get a row of their own with
/// `is_reference` set and no estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HazardRatioRow {
    pub covariate: String,
    pub level: Option<String>,
    pub is_reference: bool,
    pub hazard_ratio: Option<f64>,
    pub ci: Option<ConfidenceInterval>,
    pub p_value: Option<f64>,
}

/// A chi-squared test of all coefficients being zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlobalTest {
    pub statistic: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
}

impl GlobalTest {
    fn new(statistic: f64, degrees_of_freedom: usize) -> Self {
        Self {
            statistic,
            degrees_of_freedom,
            p_value: distribution::chi_squared_sf(statistic, degrees_of_freedom),
        }
    }
}

/// Result of [`CoxModel::fit`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoxFit {
    pub ties: TieMethod,
    pub conf_level: f64,
    pub subjects: usize,
    pub events: usize,
    pub iterations: usize,
    /// Log partial likelihood at `β = 0`.
    pub log_likelihood_null: f64,
    /// Log partial likelihood at the estimate.
    pub log_likelihood: f64,
    pub terms: Vec<CoxTerm>,
    pub hazard_ratios: Vec<HazardRatioRow>,
    pub likelihood_ratio: GlobalTest,
    pub wald: GlobalTest,
    pub score: GlobalTest,
    /// Harrell's C; `None` when no pair of subjects is comparable.
    pub concordance: Option<f64>,
}

impl CoxFit {
    /// Looks up a term by its display label.
    #[must_use]
    pub fn term(&self, name: &str) -> Option<&CoxTerm> {
        self.terms.iter().find(|term| term.name == name)
    }
}

fn hazard_ratio_rows(layout: &[(String, TermLayout)], terms: &[CoxTerm]) -> Vec<HazardRatioRow> {
    let estimate = |covariate: &str, level: Option<String>, term: &CoxTerm| HazardRatioRow {
        covariate: covariate.to_owned(),
        level,
        is_reference: false,
        hazard_ratio: Some(term.hazard_ratio),
        ci: Some(term.ci),
        p_value: Some(term.p_value),
    };

    let mut rows = vec![];
    for (covariate, term_layout) in layout {
        match term_layout {
            TermLayout::Numeric { column } => {
                rows.push(estimate(covariate, None, &terms[*column]));
            }
            TermLayout::Categorical { reference, levels } => {
                rows.push(HazardRatioRow {
                    covariate: covariate.clone(),
                    level: Some(reference.clone()),
                    is_reference: true,
                    hazard_ratio: None,
                    ci: None,
                    p_value: None,
                });
                for (level, column) in levels {
                    rows.push(estimate(covariate, Some(level.clone()), &terms[*column]));
                }
            }
        }
    }
    rows
}
