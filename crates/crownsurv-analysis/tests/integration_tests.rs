use approx::assert_abs_diff_eq;
use crownsurv_analysis::{
    cohort::{Cohort, CohortFile, CovariateValue},
    comparison,
    describe::{CohortDescription, CovariateSummary},
    regression::CoxSpec,
    survival::{OVERALL, SurvivalStatsMap},
};
use crownsurv_stats::{confidence::ConfidenceOptions, log_rank::LogRankOptions};

const COHORT_JSON: &str = r#"{
    "subjects": [
        {"id": "r1", "time": 1, "event": 1, "covariates": {"material": "metal", "age": 60}},
        {"id": "r2", "time": 2, "event": 0, "covariates": {"material": "glass", "age": 55}},
        {"id": "r3", "time": 3, "event": 1, "covariates": {"material": "metal", "age": 70}},
        {"id": "r4", "time": 3, "event": 1, "covariates": {"material": "glass", "age": 65}},
        {"id": "r5", "time": 5, "event": 0, "covariates": {"material": "glass", "age": 50}}
    ]
}"#;

fn load() -> Cohort {
    let file: CohortFile = serde_json::from_str(COHORT_JSON).unwrap();
    Cohort::try_from(file).unwrap()
}

#[test]
fn test_overall_curve_matches_product_limit() {
    let cohort = load();
    let stats = SurvivalStatsMap::overall(&cohort, &ConfidenceOptions::default()).unwrap();
    let curve = &stats.map[OVERALL].curve;

    assert_eq!(curve.times, vec![1.0, 2.0, 3.0, 5.0]);
    assert_eq!(curve.at_risk, vec![5, 4, 3, 1]);
    assert_abs_diff_eq!(curve.survival_at(1.0), 0.8, epsilon = 1e-12);
    assert_abs_diff_eq!(curve.survival_at(3.0), 0.8 / 3.0, epsilon = 1e-12);
    assert_eq!(stats.map[OVERALL].median.time(), Some(3.0));

    let rows = stats.summarize_at(&[0.5, 3.0]).unwrap();
    assert_eq!(rows[0].survival, 1.0);
    assert!(rows[0].ci.is_none());
    assert_eq!((rows[1].at_risk, rows[1].events, rows[1].censored), (3, 3, 1));
}

#[test]
fn test_stratified_workflow() {
    let cohort = load();
    let options = ConfidenceOptions::default();

    let stats = SurvivalStatsMap::collect_by_covariate(&cohort, "material", &options).unwrap();
    let rows = stats.summarize_at(&[1.0, 3.0]).unwrap();
    let order = rows
        .iter()
        .map(|row| (row.stratum.to_string(), row.time))
        .collect::<Vec<_>>();
    let expected = [("glass", 1.0), ("glass", 3.0), ("metal", 1.0), ("metal", 3.0)]
        .map(|(stratum, time)| (stratum.to_owned(), time));
    assert_eq!(order, expected);
    assert_abs_diff_eq!(rows[2].survival, 0.5, epsilon = 1e-12);

    let test =
        comparison::log_rank_by_covariate(&cohort, "material", &LogRankOptions::default()).unwrap();
    let metal = &test.groups[1];
    assert_eq!(metal.stratum, "metal");
    assert_eq!(metal.observed, 2);
    assert_abs_diff_eq!(metal.expected, 0.4 + 2.0 / 3.0, epsilon = 1e-12);
    assert!((0.0..=1.0).contains(&test.p_value));
}

#[test]
fn test_non_finite_covariate_names_subject() {
    let mut file: CohortFile = serde_json::from_str(COHORT_JSON).unwrap();
    file.subjects[3]
        .covariates
        .insert("age".to_owned(), CovariateValue::Number(f64::NAN));
    let err = Cohort::try_from(file).unwrap_err();
    assert!(err.is_non_finite_covariate());
    assert!(err.to_string().contains("'r4'"));
}

#[test]
fn test_description_and_cox() {
    let cohort = load();
    let description = CohortDescription::new(&cohort, &ConfidenceOptions::default()).unwrap();
    assert_eq!((description.events, description.censored), (3, 2));
    assert_eq!(description.events_at_time_zero, 0);
    assert!(matches!(
        description.covariates[1].summary,
        CovariateSummary::Categorical { .. }
    ));

    let fit = CoxSpec::new().with_numeric("age").fit(&cohort).unwrap();
    assert_eq!((fit.subjects, fit.events), (5, 3));
    assert_eq!(fit.terms.len(), 1);
    assert!(fit.terms[0].std_err > 0.0);
    assert!(fit.likelihood_ratio.statistic >= 0.0);

    let json = serde_json::to_value(&fit).unwrap();
    assert_eq!(json["ties"], "efron");
}
