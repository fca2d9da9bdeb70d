//! Expansion of named covariates into a numeric design matrix.

use std::collections::BTreeSet;

use ndarray::Array2;
use serde::Serialize;

use crate::{SurvivalError, linalg};

/// A covariate column supplied to [`CoxModel::fit`](super::CoxModel::fit).
#[derive(Debug, Clone, PartialEq)]
pub enum Covariate {
    /// Continuous or ordinal value entering the model linearly.
    Numeric { name: String, values: Vec<f64> },
    /// Categorical value, expanded into one indicator column per
    /// non-reference level.
    Categorical {
        name: String,
        labels: Vec<String>,
        /// Reference level; the first level in sorted order when `None`.
        reference: Option<String>,
    },
}

impl Covariate {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::Numeric {
            name: name.into(),
            values,
        }
    }

    pub fn categorical<S>(name: impl Into<String>, labels: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<String>,
    {
        Self::Categorical {
            name: name.into(),
            labels: labels.into_iter().map(Into::into).collect(),
            reference: None,
        }
    }

    /// Sets the reference level of a categorical covariate.
    ///
    /// Has no effect on numeric covariates.
    #[must_use]
    pub fn with_reference(mut self, level: impl Into<String>) -> Self {
        if let Self::Categorical { reference, .. } = &mut self {
            *reference = Some(level.into());
        }
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Numeric { name, .. } | Self::Categorical { name, .. } => name,
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Numeric { values, .. } => values.len(),
            Self::Categorical { labels, .. } => labels.len(),
        }
    }
}

/// One column of the expanded design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesignColumn {
    pub covariate: String,
    /// Indicated level for categorical columns.
    pub level: Option<String>,
    /// Reference level the indicator is contrasted with.
    pub reference: Option<String>,
}

impl DesignColumn {
    /// Display label such as `age` or `material=composite`.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.level {
            Some(level) => format!("{}={level}", self.covariate),
            None => self.covariate.clone(),
        }
    }
}

/// Levels of one covariate as they appear in the hazard-ratio table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TermLayout {
    Numeric { column: usize },
    Categorical {
        reference: String,
        /// Non-reference levels with their design column.
        levels: Vec<(String, usize)>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct Design {
    pub(crate) columns: Vec<DesignColumn>,
    pub(crate) terms: Vec<(String, TermLayout)>,
    /// Rows are subjects, columns follow [`Self::columns`].
    pub(crate) matrix: Array2<f64>,
}

impl Design {
    pub(crate) fn build(covariates: &[Covariate], subjects: usize) -> Result<Self, SurvivalError> {
        if covariates.is_empty() {
            return Err(SurvivalError::invalid_input(
                "Cox model needs at least one covariate",
            ));
        }

        let mut names = BTreeSet::new();
        let mut columns = vec![];
        let mut terms = vec![];
        let mut values = vec![];

        for covariate in covariates {
            let name = covariate.name();
            if !names.insert(name) {
                return Err(SurvivalError::invalid_input(format!(
                    "covariate `{name}` given more than once"
                )));
            }
            if covariate.len() != subjects {
                return Err(SurvivalError::invalid_input(format!(
                    "covariate `{name}` has {} values for {subjects} subjects",
                    covariate.len()
                )));
            }

            match covariate {
                Covariate::Numeric { values: column, .. } => {
                    if let Some(bad) = column.iter().find(|v| !v.is_finite()) {
                        return Err(SurvivalError::invalid_input(format!(
                            "covariate `{name}` has non-finite value {bad}"
                        )));
                    }
                    terms.push((name.to_owned(), TermLayout::Numeric {
                        column: columns.len(),
                    }));
                    columns.push(DesignColumn {
                        covariate: name.to_owned(),
                        level: None,
                        reference: None,
                    });
                    values.push(column.clone());
                }
                Covariate::Categorical {
                    labels, reference, ..
                } => {
                    let levels = labels.iter().map(String::as_str).collect::<BTreeSet<_>>();
                    let reference = match reference {
                        Some(reference) if levels.contains(reference.as_str()) => {
                            reference.as_str()
                        }
                        Some(reference) => {
                            return Err(SurvivalError::invalid_input(format!(
                                "reference level `{reference}` does not occur in covariate `{name}`"
                            )));
                        }
                        None => levels.first().copied().unwrap_or_default(),
                    };
                    if levels.len() < 2 {
                        return Err(SurvivalError::collinearity(format!(
                            "categorical covariate `{name}` has a single level"
                        )));
                    }

                    let mut indicated = vec![];
                    for level in levels.iter().filter(|level| **level != reference) {
                        indicated.push(((*level).to_owned(), columns.len()));
                        columns.push(DesignColumn {
                            covariate: name.to_owned(),
                            level: Some((*level).to_owned()),
                            reference: Some(reference.to_owned()),
                        });
                        values.push(
                            labels
                                .iter()
                                .map(|label| if label == level { 1.0 } else { 0.0 })
                                .collect(),
                        );
                    }
                    terms.push((name.to_owned(), TermLayout::Categorical {
                        reference: reference.to_owned(),
                        levels: indicated,
                    }));
                }
            }
        }

        let mut matrix = Array2::<f64>::zeros((subjects, columns.len()));
        for (j, column) in values.into_iter().enumerate() {
            for (i, value) in column.into_iter().enumerate() {
                matrix[[i, j]] = value;
            }
        }

        Ok(Self {
            columns,
            terms,
            matrix,
        })
    }

    /// Subtracts the column means in place and returns them.
    pub(crate) fn center(&mut self) -> Vec<f64> {
        let mut means = vec![];
        for mut column in self.matrix.columns_mut() {
            let mean = column.mean().unwrap_or(0.0);
            column.mapv_inplace(|v| v - mean);
            means.push(mean);
        }
        means
    }

    /// Rejects constant columns and linearly dependent column sets.
    ///
    /// Expects a centered matrix. Dependence is detected by a Cholesky
    /// factorization of the column correlation matrix.
    pub(crate) fn check_rank(&self) -> Result<(), SurvivalError> {
        let scales = self
            .matrix
            .columns()
            .into_iter()
            .map(|column| column.dot(&column).sqrt())
            .collect::<Vec<_>>();
        for (column, &scale) in self.columns.iter().zip(&scales) {
            if scale <= f64::EPSILON {
                return Err(SurvivalError::collinearity(format!(
                    "column `{}` is constant",
                    column.label()
                )));
            }
        }

        let p = self.columns.len();
        let cross = self.matrix.t().dot(&self.matrix);
        let correlation =
            Array2::from_shape_fn((p, p), |(a, b)| cross[[a, b]] / (scales[a] * scales[b]));
        linalg::cholesky(&correlation).map_err(|singular| {
            SurvivalError::collinearity(format!(
                "column `{}` is a linear combination of earlier columns",
                self.columns[singular.index].label()
            ))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_treatment_coding() {
        let design = Design::build(
            &[
                Covariate::numeric("age", vec![40.0, 50.0, 60.0]),
                Covariate::categorical("material", ["metal", "composite", "glass"]),
            ],
            3,
        )
        .unwrap();

        let labels = design.columns.iter().map(DesignColumn::label).collect::<Vec<_>>();
        assert_eq!(labels, vec!["age", "material=glass", "material=metal"]);
        assert_eq!(design.columns[1].reference.as_deref(), Some("composite"));
        assert_eq!(design.matrix.column(1).to_vec(), vec![0.0, 0.0, 1.0]);
        assert_eq!(design.matrix.column(2).to_vec(), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_explicit_reference() {
        let design = Design::build(
            &[Covariate::categorical("arm", ["b", "a", "c", "a"]).with_reference("c")],
            4,
        )
        .unwrap();
        let labels = design.columns.iter().map(DesignColumn::label).collect::<Vec<_>>();
        assert_eq!(labels, vec!["arm=a", "arm=b"]);

        let err = Design::build(
            &[Covariate::categorical("arm", ["a", "b"]).with_reference("z")],
            2,
        )
        .unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_invalid_covariates() {
        assert!(Design::build(&[], 2).unwrap_err().is_invalid_input());
        assert!(
            Design::build(&[Covariate::numeric("x", vec![1.0])], 2)
                .unwrap_err()
                .is_invalid_input()
        );
        assert!(
            Design::build(&[Covariate::numeric("x", vec![1.0, f64::NAN])], 2)
                .unwrap_err()
                .is_invalid_input()
        );
        assert!(
            Design::build(
                &[
                    Covariate::numeric("x", vec![1.0, 2.0]),
                    Covariate::numeric("x", vec![1.0, 2.0]),
                ],
                2
            )
            .unwrap_err()
            .is_invalid_input()
        );
        assert!(
            Design::build(&[Covariate::categorical("arm", ["a", "a"])], 2)
                .unwrap_err()
                .is_collinearity()
        );
    }

    #[test]
    fn test_rank_checks() {
        let mut design = Design::build(
            &[
                Covariate::numeric("x", vec![1.0, 2.0, 3.0, 5.0]),
                Covariate::numeric("y", vec![2.0, 4.0, 6.0, 10.0]),
            ],
            4,
        )
        .unwrap();
        design.center();
        let err = design.check_rank().unwrap_err();
        assert!(err.is_collinearity());
        assert!(err.to_string().contains("`y`"));

        let mut design =
            Design::build(&[Covariate::numeric("x", vec![3.0, 3.0, 3.0])], 3).unwrap();
        design.center();
        assert!(design.check_rank().unwrap_err().is_collinearity());

        let mut design = Design::build(
            &[
                Covariate::numeric("x", vec![1.0, 2.0, 3.0, 5.0]),
                Covariate::numeric("y", vec![0.0, 1.0, 0.0, 1.0]),
            ],
            4,
        )
        .unwrap();
        let means = design.center();
        assert_eq!(means, vec![2.75, 0.5]);
        design.check_rank().unwrap();
    }
}
