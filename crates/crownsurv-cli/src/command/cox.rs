use std::path::PathBuf;

use clap::{Args, ValueEnum};
use crownsurv_analysis::regression::CoxSpec;
use crownsurv_stats::cox::{CoxFit, CoxModel, GlobalTest, TieMethod};

use crate::{
    command::OutputArg,
    table::{self, Column},
    util::{self, Output},
};

#[derive(Debug, Clone, Args)]
pub(crate) struct CoxArg {
    /// Path to the prepared cohort JSON file
    pub cohort: PathBuf,

    /// Covariates to adjust for, as `name` or `name=reference`; a reference
    /// level makes the covariate categorical
    #[arg(required = true, value_parser = parse_term)]
    pub terms: Vec<TermArg>,

    /// Covariates with numeric codes to treat as categorical (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub categorical: Vec<String>,

    /// Approximation for tied event times
    #[arg(long, value_enum, default_value_t = Ties::Efron)]
    pub ties: Ties,

    /// Newton-Raphson iteration budget
    #[arg(long, default_value_t = 20)]
    pub max_iterations: usize,

    /// Confidence level of hazard-ratio intervals
    #[arg(long, default_value_t = 0.95)]
    pub conf_level: f64,

    #[clap(flatten)]
    pub output: OutputArg,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TermArg {
    pub name: String,
    pub reference: Option<String>,
}

fn parse_term(s: &str) -> Result<TermArg, String> {
    let (name, reference) = match s.split_once('=') {
        Some((name, reference)) => (name, Some(reference)),
        None => (s, None),
    };
    if name.is_empty() || reference.is_some_and(str::is_empty) {
        return Err(format!("invalid term '{s}', expected `name` or `name=reference`"));
    }
    Ok(TermArg {
        name: name.to_owned(),
        reference: reference.map(ToOwned::to_owned),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Ties {
    Breslow,
    Efron,
}

impl From<Ties> for TieMethod {
    fn from(value: Ties) -> Self {
        match value {
            Ties::Breslow => TieMethod::Breslow,
            Ties::Efron => TieMethod::Efron,
        }
    }
}

impl CoxArg {
    fn spec(&self) -> CoxSpec {
        let model = CoxModel::new()
            .with_ties(self.ties.into())
            .with_max_iterations(self.max_iterations)
            .with_conf_level(self.conf_level);
        self.terms
            .iter()
            .fold(CoxSpec::new().with_model(model), |spec, term| {
                if term.reference.is_some() || self.categorical.contains(&term.name) {
                    spec.with_categorical(term.name.clone(), term.reference.as_deref())
                } else {
                    spec.with_covariate(term.name.clone())
                }
            })
    }
}

const COEFFICIENT_COLUMNS: [Column; 6] = [
    ("term", 24),
    ("coef", 9),
    ("se(coef)", 9),
    ("z", 8),
    ("p", 8),
    ("mean", 9),
];

const HAZARD_RATIO_COLUMNS: [Column; 6] = [
    ("covariate", 16),
    ("level", 16),
    ("HR", 9),
    ("lower", 9),
    ("upper", 9),
    ("p", 8),
];

pub(crate) fn run(arg: &CoxArg) -> anyhow::Result<()> {
    let cohort = util::read_cohort_file(&arg.cohort)?;
    let fit = arg.spec().fit(&cohort)?;

    if let Some(path) = &arg.output.output {
        return Output::save_json(&fit, path);
    }

    print_fit(&fit);
    Ok(())
}

fn print_fit(fit: &CoxFit) {
    println!(
        "Cox proportional-hazards model ({} ties): n = {}, events = {}, iterations = {}",
        fit.ties, fit.subjects, fit.events, fit.iterations
    );
    println!();
    table::print_header(&COEFFICIENT_COLUMNS);
    for term in &fit.terms {
        table::print_row(
            &COEFFICIENT_COLUMNS,
            &[
                term.name.clone(),
                table::number(term.coefficient, 4),
                table::number(term.std_err, 4),
                table::number(term.z, 3),
                table::p_value(term.p_value),
                table::number(term.mean, 3),
            ],
        );
    }

    println!();
    println!("Hazard ratios ({:.0}% CI)", fit.conf_level * 100.0);
    table::print_header(&HAZARD_RATIO_COLUMNS);
    for row in &fit.hazard_ratios {
        let (lower, upper) = table::bounds(row.ci, 3);
        let hazard_ratio = if row.is_reference {
            "ref".to_string()
        } else {
            table::optional(row.hazard_ratio, 3)
        };
        table::print_row(
            &HAZARD_RATIO_COLUMNS,
            &[
                row.covariate.clone(),
                row.level.clone().unwrap_or_default(),
                hazard_ratio,
                lower,
                upper,
                row.p_value.map_or(String::new(), table::p_value),
            ],
        );
    }

    println!();
    println!(
        "  Log partial likelihood: {:.4} (null {:.4})",
        fit.log_likelihood, fit.log_likelihood_null
    );
    print_global_test("Likelihood ratio test", &fit.likelihood_ratio);
    print_global_test("Wald test", &fit.wald);
    print_global_test("Score (log-rank) test", &fit.score);
    println!("  Concordance: {}", table::optional(fit.concordance, 3));
}

fn print_global_test(name: &str, test: &GlobalTest) {
    println!(
        "  {name:<22} = {:.3} on {} df, p = {}",
        test.statistic,
        test.degrees_of_freedom,
        table::p_value(test.p_value)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_term() {
        assert_eq!(
            parse_term("age").unwrap(),
            TermArg {
                name: "age".to_owned(),
                reference: None
            }
        );
        assert_eq!(
            parse_term("material=metal").unwrap().reference.as_deref(),
            Some("metal")
        );
        assert!(parse_term("=metal").is_err());
        assert!(parse_term("material=").is_err());
    }

    #[test]
    fn test_spec_from_args() {
        use clap::Parser as _;
        use crownsurv_analysis::cohort::CovariateKind;

        use crate::command::{CommandArgs, Mode};

        let args = CommandArgs::try_parse_from([
            "crownsurv",
            "cox",
            "cohort.json",
            "age",
            "rct",
            "material=metal",
            "--categorical",
            "rct",
            "--ties",
            "breslow",
        ])
        .unwrap();
        let Mode::Cox(arg) = args.mode else {
            panic!("expected cox");
        };
        let spec = arg.spec();
        let terms = spec
            .terms()
            .iter()
            .map(|term| (term.name.as_str(), term.kind, term.reference.as_deref()))
            .collect::<Vec<_>>();
        assert_eq!(
            terms,
            vec![
                ("age", None, None),
                ("rct", Some(CovariateKind::Categorical), None),
                ("material", Some(CovariateKind::Categorical), Some("metal")),
            ]
        );
    }
}
