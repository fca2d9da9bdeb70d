//! Cox proportional-hazards regression on named cohort covariates.
//!
//! A [`CoxSpec`] lists the covariates to adjust for. Each covariate is
//! treated as numeric or categorical according to its recorded values,
//! unless the kind is fixed explicitly (numeric codes such as `0`/`1` may be
//! forced to categorical).
//!
//! # Examples
//!
//! ```
//! use crownsurv_analysis::{
//!     cohort::{Cohort, SubjectRecord},
//!     regression::CoxSpec,
//! };
//!
//! let records = [
//!     (9.0, 1, "metal"), (1.0, 1, "glass"), (1.0, 0, "glass"),
//!     (6.0, 1, "glass"), (6.0, 1, "metal"), (8.0, 0, "metal"),
//! ];
//! let cohort = Cohort::new(
//!     records
//!         .iter()
//!         .enumerate()
//!         .map(|(i, &(t, e, m))| SubjectRecord::new(i.to_string(), t, e).with_covariate("material", m))
//!         .collect(),
//! )
//! .unwrap();
//!
//! let fit = CoxSpec::new().with_categorical("material", Some("metal")).fit(&cohort).unwrap();
//! let row = &fit.hazard_ratios[1];
//! assert_eq!(row.level.as_deref(), Some("glass"));
//! assert!(row.hazard_ratio.unwrap() > 1.0);
//! ```

use crownsurv_stats::cox::{CoxFit, CoxModel, Covariate};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    AnalysisError,
    cohort::{Cohort, CovariateKind},
};

/// One covariate of the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSpec {
    pub name: String,
    /// Inferred from the recorded values when `None`.
    pub kind: Option<CovariateKind>,
    /// Reference level of a categorical covariate; the first level in
    /// sorted order when `None`.
    pub reference: Option<String>,
}

/// Covariates and fitting options of a Cox model.
#[derive(Debug, Clone, Default)]
pub struct CoxSpec {
    terms: Vec<TermSpec>,
    model: CoxModel,
}

impl CoxSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_model(mut self, model: CoxModel) -> Self {
        self.model = model;
        self
    }

    /// Adds a covariate whose kind is inferred from its values.
    #[must_use]
    pub fn with_covariate(mut self, name: impl Into<String>) -> Self {
        self.terms.push(TermSpec {
            name: name.into(),
            kind: None,
            reference: None,
        });
        self
    }

    #[must_use]
    pub fn with_numeric(mut self, name: impl Into<String>) -> Self {
        self.terms.push(TermSpec {
            name: name.into(),
            kind: Some(CovariateKind::Numeric),
            reference: None,
        });
        self
    }

    #[must_use]
    pub fn with_categorical(mut self, name: impl Into<String>, reference: Option<&str>) -> Self {
        self.terms.push(TermSpec {
            name: name.into(),
            kind: Some(CovariateKind::Categorical),
            reference: reference.map(ToOwned::to_owned),
        });
        self
    }

    #[must_use]
    pub fn terms(&self) -> &[TermSpec] {
        &self.terms
    }

    /// Fits the model to every subject of the cohort.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::MissingCovariate`] when a subject lacks a listed
    ///   covariate
    /// - [`AnalysisError::TypeMismatch`] when a covariate mixes numbers and
    ///   labels, or a numeric covariate has a label
    /// - [`AnalysisError::Survival`] wrapping the fit's own failure (unknown
    ///   reference level, collinearity, non-convergence, no events)
    pub fn fit(&self, cohort: &Cohort) -> Result<CoxFit, AnalysisError> {
        let covariates = self
            .terms
            .iter()
            .map(|term| build_covariate(cohort, term))
            .collect::<Result<Vec<_>, _>>()?;

        let names = self
            .terms
            .iter()
            .map(|term| term.name.as_str())
            .collect::<Vec<_>>()
            .join(" + ");
        info!(model = %names, subjects = cohort.len(), "fitting Cox model");

        self.model
            .fit(cohort.observations(), &covariates)
            .map_err(AnalysisError::survival(format!("Cox model ~ {names}")))
    }
}

fn build_covariate(cohort: &Cohort, term: &TermSpec) -> Result<Covariate, AnalysisError> {
    let kind = match term.kind {
        Some(kind) => kind,
        None => cohort.covariate_kind(&term.name)?,
    };
    let covariate = match kind {
        CovariateKind::Numeric => {
            Covariate::numeric(term.name.clone(), cohort.numeric_covariate(&term.name)?)
        }
        CovariateKind::Categorical => {
            let covariate =
                Covariate::categorical(term.name.clone(), cohort.label_covariate(&term.name)?);
            match &term.reference {
                Some(reference) => covariate.with_reference(reference.clone()),
                None => covariate,
            }
        }
    };
    Ok(covariate)
}
