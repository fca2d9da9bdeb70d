use std::path::PathBuf;

use clap::Args;
use crownsurv_analysis::comparison;
use crownsurv_stats::log_rank::LogRankOptions;

use crate::{
    command::OutputArg,
    table::{self, Column},
    util::{self, Output},
};

#[derive(Debug, Clone, Args)]
pub(crate) struct LogRankArg {
    /// Path to the prepared cohort JSON file
    pub cohort: PathBuf,

    /// Covariate whose levels are compared
    #[arg(long)]
    pub strata: String,

    /// Fleming-Harrington weight exponent; 0 is the classic log-rank test
    #[arg(long, default_value_t = 0.0)]
    pub rho: f64,

    #[clap(flatten)]
    pub output: OutputArg,
}

const COLUMNS: [Column; 6] = [
    ("stratum", 16),
    ("n", 8),
    ("observed", 9),
    ("expected", 9),
    ("(O-E)^2/E", 10),
    ("(O-E)^2/V", 10),
];

pub(crate) fn run(arg: &LogRankArg) -> anyhow::Result<()> {
    let cohort = util::read_cohort_file(&arg.cohort)?;
    let options = LogRankOptions::default().with_rho(arg.rho);
    let test = comparison::log_rank_by_covariate(&cohort, &arg.strata, &options)?;

    if let Some(path) = &arg.output.output {
        return Output::save_json(&test, path);
    }

    println!("Log-rank test by {} (rho = {})", arg.strata, test.rho);
    println!();
    table::print_header(&COLUMNS);
    for group in &test.groups {
        #[expect(clippy::cast_precision_loss)]
        let observed = group.observed as f64;
        let deviation = (observed - group.expected).powi(2);
        table::print_row(
            &COLUMNS,
            &[
                group.stratum.clone(),
                group.subjects.to_string(),
                group.observed.to_string(),
                table::number(group.expected, 2),
                table::number(group.chi_squared_contribution(), 3),
                table::number(deviation / group.variance, 3),
            ],
        );
    }
    println!();
    println!(
        "  Chisq = {:.3} on {} degrees of freedom, p = {}",
        test.statistic,
        test.degrees_of_freedom,
        table::p_value(test.p_value)
    );
    Ok(())
}
