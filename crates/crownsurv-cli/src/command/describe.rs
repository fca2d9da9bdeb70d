use std::path::PathBuf;

use clap::Args;
use crownsurv_analysis::describe::{CohortDescription, CovariateSummary};

use crate::{
    command::{ConfidenceArg, OutputArg},
    table::{self, Column},
    util::{self, Output},
};

#[derive(Debug, Clone, Args)]
pub(crate) struct DescribeArg {
    /// Path to the prepared cohort JSON file
    pub cohort: PathBuf,
    #[clap(flatten)]
    pub confidence: ConfidenceArg,
    #[clap(flatten)]
    pub output: OutputArg,
}

const NUMERIC_COLUMNS: [Column; 8] = [
    ("covariate", 16),
    ("n", 6),
    ("missing", 8),
    ("mean", 9),
    ("sd", 9),
    ("median", 9),
    ("min", 9),
    ("max", 9),
];

const LEVEL_COLUMNS: [Column; 5] = [
    ("covariate", 16),
    ("level", 16),
    ("n", 6),
    ("%", 7),
    ("events", 7),
];

#[expect(clippy::cast_precision_loss)]
pub(crate) fn run(arg: &DescribeArg) -> anyhow::Result<()> {
    let cohort = util::read_cohort_file(&arg.cohort)?;
    let description = CohortDescription::new(&cohort, &arg.confidence.options())?;

    if let Some(path) = &arg.output.output {
        return Output::save_json(&description, path);
    }

    let subjects = description.subjects as f64;
    println!("Cohort: {}", arg.cohort.display());
    println!(
        "  Subjects: {} total, {} events ({:.1}%), {} censored ({:.1}%)",
        description.subjects,
        description.events,
        100.0 * description.events as f64 / subjects,
        description.censored,
        100.0 * description.censored as f64 / subjects,
    );
    if description.events_at_time_zero > 0 {
        println!(
            "  Events at time 0: {} (kept in every estimate)",
            description.events_at_time_zero
        );
    }
    let follow_up = &description.follow_up;
    println!(
        "  Observed time: median {:.2} (IQR {:.2}-{:.2}), range {:.2}-{:.2}",
        follow_up.median, follow_up.q1, follow_up.q3, follow_up.min, follow_up.max
    );
    let [median, lower, upper] = table::quantile(&description.median_follow_up, 2);
    println!("  Median follow-up (reverse Kaplan-Meier): {median} [{lower}, {upper}]");

    let numeric = description
        .covariates
        .iter()
        .filter_map(|c| match &c.summary {
            CovariateSummary::Numeric { stats } => Some((c, stats)),
            CovariateSummary::Categorical { .. } => None,
        })
        .collect::<Vec<_>>();
    if !numeric.is_empty() {
        println!();
        table::print_header(&NUMERIC_COLUMNS);
        for (covariate, stats) in numeric {
            table::print_row(
                &NUMERIC_COLUMNS,
                &[
                    covariate.name.clone(),
                    stats.count.to_string(),
                    covariate.missing.to_string(),
                    table::number(stats.mean, 2),
                    table::number(stats.std_dev, 2),
                    table::number(stats.median, 2),
                    table::number(stats.min, 2),
                    table::number(stats.max, 2),
                ],
            );
        }
    }

    let categorical = description
        .covariates
        .iter()
        .filter_map(|c| match &c.summary {
            CovariateSummary::Categorical { levels } => Some((c, levels)),
            CovariateSummary::Numeric { .. } => None,
        })
        .collect::<Vec<_>>();
    if !categorical.is_empty() {
        println!();
        table::print_header(&LEVEL_COLUMNS);
        for (covariate, levels) in categorical {
            for level in levels {
                table::print_row(
                    &LEVEL_COLUMNS,
                    &[
                        covariate.name.clone(),
                        level.level.clone(),
                        level.subjects.to_string(),
                        format!("{:.1}", level.percent),
                        level.events.to_string(),
                    ],
                );
            }
            if covariate.missing > 0 {
                table::print_row(
                    &LEVEL_COLUMNS,
                    &[
                        covariate.name.clone(),
                        "(missing)".to_string(),
                        covariate.missing.to_string(),
                        String::new(),
                        String::new(),
                    ],
                );
            }
        }
    }
    Ok(())
}
