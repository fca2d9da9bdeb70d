use clap::Args;

use crate::{
    command::{self, CohortArg, ConfidenceArg, OutputArg},
    table::{self, Column},
    util::{self, Output},
};

#[derive(Debug, Clone, Args)]
pub(crate) struct SurvivalAtArg {
    #[clap(flatten)]
    pub cohort: CohortArg,

    /// Query times (comma-separated)
    #[arg(long, required = true, value_delimiter = ',')]
    pub times: Vec<f64>,

    #[clap(flatten)]
    pub confidence: ConfidenceArg,
    #[clap(flatten)]
    pub output: OutputArg,
}

const COLUMNS: [Column; 9] = [
    ("stratum", 16),
    ("time", 8),
    ("n.risk", 8),
    ("n.event", 8),
    ("n.censor", 8),
    ("survival", 9),
    ("std.err", 9),
    ("lower", 9),
    ("upper", 9),
];

pub(crate) fn run(arg: &SurvivalAtArg) -> anyhow::Result<()> {
    let cohort = util::read_cohort_file(&arg.cohort.cohort)?;
    let options = arg.confidence.options();
    let stats = command::collect_stats(&cohort, arg.cohort.strata.as_deref(), &options)?;
    let rows = stats.summarize_at(&arg.times)?;

    if let Some(path) = &arg.output.output {
        return Output::save_json(&rows, path);
    }

    println!(
        "Survival at fixed times ({:.0}% CI, {} transform)",
        options.level * 100.0,
        options.transform
    );
    println!("  n.event and n.censor are cumulative up to the query time");
    println!();
    table::print_header(&COLUMNS);
    for row in &rows {
        let (lower, upper) = table::bounds(row.ci, 4);
        table::print_row(
            &COLUMNS,
            &[
                row.stratum.to_string(),
                table::number(row.time, 2),
                row.at_risk.to_string(),
                row.events.to_string(),
                row.censored.to_string(),
                table::number(row.survival, 4),
                table::number(row.std_err, 4),
                lower,
                upper,
            ],
        );
    }
    Ok(())
}
