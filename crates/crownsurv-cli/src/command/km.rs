use clap::Args;
use tracing::info;

use crate::{
    command::{self, CohortArg, ConfidenceArg, OutputArg},
    table::{self, Column},
    util::{self, Output},
};

#[derive(Debug, Clone, Args)]
pub(crate) struct KmArg {
    #[clap(flatten)]
    pub cohort: CohortArg,
    #[clap(flatten)]
    pub confidence: ConfidenceArg,
    #[clap(flatten)]
    pub output: OutputArg,
}

const COLUMNS: [Column; 8] = [
    ("time", 10),
    ("n.risk", 8),
    ("n.event", 8),
    ("n.censor", 8),
    ("survival", 9),
    ("std.err", 9),
    ("lower", 9),
    ("upper", 9),
];

pub(crate) fn run(arg: &KmArg) -> anyhow::Result<()> {
    let cohort = util::read_cohort_file(&arg.cohort.cohort)?;
    let options = arg.confidence.options();
    let stats = command::collect_stats(&cohort, arg.cohort.strata.as_deref(), &options)?;
    info!(strata = stats.map.len(), "estimated Kaplan-Meier curves");

    if let Some(path) = &arg.output.output {
        return Output::save_json(&stats, path);
    }

    println!(
        "Kaplan-Meier estimates ({:.0}% CI, {} transform)",
        options.level * 100.0,
        options.transform
    );
    for (stratum, stats) in &stats.map {
        println!();
        println!(
            "{stratum}: {} subjects, {} events, {} censored",
            stats.subjects, stats.events, stats.censored
        );
        table::print_header(&COLUMNS);
        for point in stats.curve.points() {
            let (lower, upper) = table::bounds(point.ci, 4);
            table::print_row(
                &COLUMNS,
                &[
                    table::number(point.time, 3),
                    point.at_risk.to_string(),
                    point.events.to_string(),
                    point.censored.to_string(),
                    table::number(point.survival, 4),
                    table::number(point.std_err, 4),
                    lower,
                    upper,
                ],
            );
        }
    }
    Ok(())
}
