use clap::Args;

use crate::{
    command::{self, CohortArg, ConfidenceArg, OutputArg},
    table::{self, Column},
    util::{self, Output},
};

#[derive(Debug, Clone, Args)]
pub(crate) struct MedianArg {
    #[clap(flatten)]
    pub cohort: CohortArg,

    /// Survival probability to solve for instead of 0.5
    #[arg(long)]
    pub probability: Option<f64>,

    #[clap(flatten)]
    pub confidence: ConfidenceArg,
    #[clap(flatten)]
    pub output: OutputArg,
}

const COLUMNS: [Column; 6] = [
    ("stratum", 16),
    ("n", 8),
    ("events", 8),
    ("estimate", 12),
    ("lower", 9),
    ("upper", 9),
];

pub(crate) fn run(arg: &MedianArg) -> anyhow::Result<()> {
    let cohort = util::read_cohort_file(&arg.cohort.cohort)?;
    let options = arg.confidence.options();
    let stats = command::collect_stats(&cohort, arg.cohort.strata.as_deref(), &options)?;
    let rows = match arg.probability {
        Some(probability) => stats.quantiles(probability)?,
        None => stats.medians(),
    };

    if let Some(path) = &arg.output.output {
        return Output::save_json(&rows, path);
    }

    let probability = arg.probability.unwrap_or(0.5);
    println!(
        "Time to survival {probability} ({:.0}% CI, {} transform)",
        options.level * 100.0,
        options.transform
    );
    println!();
    table::print_header(&COLUMNS);
    for row in &rows {
        let [estimate, lower, upper] = table::quantile(&row.estimate, 2);
        table::print_row(
            &COLUMNS,
            &[
                row.stratum.to_string(),
                row.subjects.to_string(),
                row.events.to_string(),
                estimate,
                lower,
                upper,
            ],
        );
    }
    Ok(())
}
