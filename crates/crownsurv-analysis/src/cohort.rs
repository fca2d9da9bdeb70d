//! Subject records and the validated cohort.
//!
//! # Serialization
//!
//! Cohorts are exchanged as JSON produced by the data-preparation step, with
//! covariates already recoded:
//!
//! ```json
//! {
//!   "subjects": [
//!     { "id": "r1", "time": 2.4, "event": 1,
//!       "covariates": { "material": "composite", "age": 61 } }
//!   ]
//! }
//! ```
//!
//! Numeric covariate values are written as JSON numbers and labels as strings.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet, HashSet},
};

use crownsurv_stats::survival::Observation;
use serde::{Deserialize, Serialize, Serializer};

use crate::AnalysisError;

/// Value of one covariate for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::Display, derive_more::From)]
#[serde(untagged)]
pub enum CovariateValue {
    Number(f64),
    Label(String),
}

impl From<&str> for CovariateValue {
    fn from(label: &str) -> Self {
        Self::Label(label.to_owned())
    }
}

impl CovariateValue {
    /// The value as a stratum or level label; numbers print without a
    /// trailing `.0`.
    #[must_use]
    pub fn to_label(&self) -> String {
        self.to_string()
    }
}

/// A covariate value used as a stratum key.
///
/// Numbers order numerically and before labels, so codes `9` and `10` keep
/// their natural order. Serializes as its label.
#[derive(Debug, Clone, derive_more::Display, derive_more::From)]
pub struct Level(CovariateValue);

impl From<&str> for Level {
    fn from(label: &str) -> Self {
        Self(label.into())
    }
}

impl From<f64> for Level {
    fn from(number: f64) -> Self {
        Self(CovariateValue::Number(number))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.0, &other.0) {
            (CovariateValue::Number(a), CovariateValue::Number(b)) => a.total_cmp(b),
            (CovariateValue::Number(_), CovariateValue::Label(_)) => Ordering::Less,
            (CovariateValue::Label(_), CovariateValue::Number(_)) => Ordering::Greater,
            (CovariateValue::Label(a), CovariateValue::Label(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Level {}

impl Serialize for Level {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// How a covariate's values should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum CovariateKind {
    #[display("numeric")]
    Numeric,
    #[display("categorical")]
    Categorical,
}

/// One subject (restoration) of the cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    /// Unique identifier.
    pub id: String,
    /// Follow-up time.
    pub time: f64,
    /// 1 if the event was observed, 0 if censored.
    pub event: u8,
    #[serde(default)]
    pub covariates: BTreeMap<String, CovariateValue>,
}

impl SubjectRecord {
    pub fn new(id: impl Into<String>, time: f64, event: u8) -> Self {
        Self {
            id: id.into(),
            time,
            event,
            covariates: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_covariate(
        mut self,
        name: impl Into<String>,
        value: impl Into<CovariateValue>,
    ) -> Self {
        self.covariates.insert(name.into(), value.into());
        self
    }
}

/// On-disk form of a cohort.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CohortFile {
    pub subjects: Vec<SubjectRecord>,
}

/// A validated, non-empty set of subjects with unique ids.
#[derive(Debug, Clone)]
pub struct Cohort {
    subjects: Vec<SubjectRecord>,
    observations: Vec<Observation>,
}

impl Cohort {
    /// Validates the records.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::EmptyCohort`] for no records
    /// - [`AnalysisError::DuplicateSubject`] for a repeated id
    /// - [`AnalysisError::Survival`] wrapping an invalid-input error that
    ///   names the subject with a negative or non-finite time, or an event
    ///   indicator other than 0 or 1
    /// - [`AnalysisError::NonFiniteCovariate`] for a NaN or infinite numeric
    ///   covariate value
    pub fn new(subjects: Vec<SubjectRecord>) -> Result<Self, AnalysisError> {
        if subjects.is_empty() {
            return Err(AnalysisError::EmptyCohort);
        }

        let mut ids = HashSet::new();
        let mut observations = vec![];
        for subject in &subjects {
            if !ids.insert(subject.id.as_str()) {
                return Err(AnalysisError::DuplicateSubject {
                    id: subject.id.clone(),
                });
            }
            let observation = Observation::new(subject.time, subject.event)
                .map_err(AnalysisError::survival(format!("subject '{}'", subject.id)))?;
            observations.push(observation);

            for (name, value) in &subject.covariates {
                if let CovariateValue::Number(number) = value
                    && !number.is_finite()
                {
                    return Err(AnalysisError::NonFiniteCovariate {
                        id: subject.id.clone(),
                        covariate: name.clone(),
                        value: *number,
                    });
                }
            }
        }

        Ok(Self {
            subjects,
            observations,
        })
    }

    #[must_use]
    pub fn subjects(&self) -> &[SubjectRecord] {
        &self.subjects
    }

    /// Observations in subject order.
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Subjects paired with their observations.
    pub fn iter(&self) -> impl Iterator<Item = (&SubjectRecord, Observation)> {
        self.subjects.iter().zip(self.observations.iter().copied())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Names of all covariates recorded for at least one subject.
    #[must_use]
    pub fn covariate_names(&self) -> BTreeSet<&str> {
        self.subjects
            .iter()
            .flat_map(|subject| subject.covariates.keys().map(String::as_str))
            .collect()
    }

    /// Values of a covariate for every subject.
    ///
    /// Fails with [`AnalysisError::MissingCovariate`] naming the first
    /// subject without a value.
    pub fn covariate_values(&self, name: &str) -> Result<Vec<&CovariateValue>, AnalysisError> {
        self.subjects
            .iter()
            .map(|subject| {
                subject
                    .covariates
                    .get(name)
                    .ok_or_else(|| AnalysisError::MissingCovariate {
                        id: subject.id.clone(),
                        covariate: name.to_owned(),
                    })
            })
            .collect()
    }

    /// Infers whether a covariate is numeric (all values numbers) or
    /// categorical (all values labels).
    ///
    /// Subjects without a value are ignored. A covariate mixing numbers and
    /// labels, or recorded for no subject, is a
    /// [`AnalysisError::TypeMismatch`].
    pub fn covariate_kind(&self, name: &str) -> Result<CovariateKind, AnalysisError> {
        let mut numbers = 0;
        let mut labels = 0;
        for value in self.subjects.iter().filter_map(|s| s.covariates.get(name)) {
            match value {
                CovariateValue::Number(_) => numbers += 1,
                CovariateValue::Label(_) => labels += 1,
            }
        }
        match (numbers, labels) {
            (0, 0) => Err(AnalysisError::TypeMismatch {
                covariate: name.to_owned(),
                problem: "is not recorded for any subject".to_owned(),
            }),
            (_, 0) => Ok(CovariateKind::Numeric),
            (0, _) => Ok(CovariateKind::Categorical),
            _ => Err(AnalysisError::TypeMismatch {
                covariate: name.to_owned(),
                problem: format!("mixes {numbers} numeric values with {labels} labels"),
            }),
        }
    }

    /// Numeric values of a covariate for every subject.
    ///
    /// Fails when a subject lacks the covariate or has a label instead of a
    /// number.
    pub fn numeric_covariate(&self, name: &str) -> Result<Vec<f64>, AnalysisError> {
        self.covariate_values(name)?
            .into_iter()
            .map(|value| match value {
                CovariateValue::Number(number) => Ok(*number),
                CovariateValue::Label(label) => Err(AnalysisError::TypeMismatch {
                    covariate: name.to_owned(),
                    problem: format!("is expected to be numeric but has label '{label}'"),
                }),
            })
            .collect()
    }

    /// Values of a covariate as stratum keys for every subject.
    ///
    /// Numeric codes stay numbers so that strata order numerically.
    pub fn level_covariate(&self, name: &str) -> Result<Vec<Level>, AnalysisError> {
        Ok(self
            .covariate_values(name)?
            .into_iter()
            .cloned()
            .map(Level::from)
            .collect())
    }

    /// Values of a covariate as level labels for every subject.
    ///
    /// Numeric codes are accepted and converted to labels.
    pub fn label_covariate(&self, name: &str) -> Result<Vec<String>, AnalysisError> {
        Ok(self
            .covariate_values(name)?
            .into_iter()
            .map(CovariateValue::to_label)
            .collect())
    }
}

impl TryFrom<CohortFile> for Cohort {
    type Error = AnalysisError;

    fn try_from(file: CohortFile) -> Result<Self, Self::Error> {
        Self::new(file.subjects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_cohort_file() {
        let json = r#"{
            "subjects": [
                {"id": "a", "time": 1.5, "event": 1, "covariates": {"material": "glass", "age": 61}},
                {"id": "b", "time": 3, "event": 0}
            ]
        }"#;
        let file: CohortFile = serde_json::from_str(json).unwrap();
        let cohort = Cohort::try_from(file).unwrap();

        assert_eq!(cohort.len(), 2);
        assert_eq!(cohort.observations()[0], Observation::event(1.5));
        assert_eq!(cohort.observations()[1], Observation::censored(3.0));
        let subject = &cohort.subjects()[0];
        assert_eq!(subject.covariates["material"], CovariateValue::from("glass"));
        assert_eq!(subject.covariates["age"], CovariateValue::Number(61.0));
        assert_eq!(
            cohort.covariate_names().into_iter().collect::<Vec<_>>(),
            vec!["age", "material"]
        );
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(Cohort::new(vec![]).unwrap_err(), AnalysisError::EmptyCohort);

        let err = Cohort::new(vec![SubjectRecord::new("a", 1.0, 1), SubjectRecord::new("a", 2.0, 0)])
            .unwrap_err();
        assert_eq!(err, AnalysisError::DuplicateSubject { id: "a".to_owned() });

        let err = Cohort::new(vec![SubjectRecord::new("x7", -1.0, 1)]).unwrap_err();
        assert!(err.to_string().contains("x7"));
        assert!(err.survival_error().unwrap().is_invalid_input());

        let err = Cohort::new(vec![SubjectRecord::new("x8", 1.0, 2)]).unwrap_err();
        assert!(err.to_string().contains("x8"));
        assert!(err.survival_error().unwrap().is_invalid_input());
    }

    #[test]
    fn test_non_finite_covariate_is_rejected() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = Cohort::new(vec![
                SubjectRecord::new("a", 1.0, 1).with_covariate("age", 50.0),
                SubjectRecord::new("b", 2.0, 0).with_covariate("age", value),
            ])
            .unwrap_err();
            assert!(err.is_non_finite_covariate());
            let message = err.to_string();
            assert!(message.contains("'b'"));
            assert!(message.contains("'age'"));
        }
    }

    #[test]
    fn test_levels_order_numbers_before_labels() {
        let mut levels = vec![
            Level::from("b"),
            Level::from(10.0),
            Level::from("a"),
            Level::from(9.0),
            Level::from(-1.0),
        ];
        levels.sort();
        let labels = levels.iter().map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(labels, vec!["-1", "9", "10", "a", "b"]);
        assert_eq!(Level::from(2.0), Level::from(2.0));
        assert_ne!(Level::from(2.0), Level::from("2"));
        assert_eq!(serde_json::to_value(Level::from(9.0)).unwrap(), "9");
    }

    #[test]
    fn test_covariate_access() {
        let cohort = Cohort::new(vec![
            SubjectRecord::new("a", 1.0, 1)
                .with_covariate("age", 50.0)
                .with_covariate("rct", 1.0)
                .with_covariate("mixed", "x"),
            SubjectRecord::new("b", 2.0, 0)
                .with_covariate("age", 60.0)
                .with_covariate("rct", 0.0)
                .with_covariate("mixed", 3.0),
        ])
        .unwrap();

        assert_eq!(cohort.numeric_covariate("age").unwrap(), vec![50.0, 60.0]);
        assert_eq!(cohort.label_covariate("rct").unwrap(), vec!["1", "0"]);
        assert_eq!(cohort.covariate_kind("age").unwrap(), CovariateKind::Numeric);
        assert!(cohort.covariate_kind("mixed").unwrap_err().is_type_mismatch());
        assert!(cohort.numeric_covariate("mixed").unwrap_err().is_type_mismatch());
        assert_eq!(
            cohort.numeric_covariate("height").unwrap_err(),
            AnalysisError::MissingCovariate {
                id: "a".to_owned(),
                covariate: "height".to_owned()
            }
        );
    }
}
