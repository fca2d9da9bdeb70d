use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use crownsurv_analysis::{
    cohort::{Cohort, Level},
    survival::SurvivalStatsMap,
};
use crownsurv_stats::confidence::{ConfidenceOptions, ConfidenceType};
use tracing_subscriber::EnvFilter;

use self::{
    cox::CoxArg, describe::DescribeArg, km::KmArg, log_rank::LogRankArg, median::MedianArg,
    survival_at::SurvivalAtArg,
};

mod cox;
mod describe;
mod km;
mod log_rank;
mod median;
mod survival_at;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log estimator details (overridden by `RUST_LOG`)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Describe the cohort: counts, follow-up and covariates
    Describe(#[clap(flatten)] DescribeArg),
    /// Print Kaplan-Meier curves
    Km(#[clap(flatten)] KmArg),
    /// Survival probability at fixed times
    SurvivalAt(#[clap(flatten)] SurvivalAtArg),
    /// Median (or other quantile) survival time
    Median(#[clap(flatten)] MedianArg),
    /// Log-rank test across the levels of a covariate
    LogRank(#[clap(flatten)] LogRankArg),
    /// Cox proportional-hazards regression
    Cox(#[clap(flatten)] CoxArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_tracing(args.verbose);

    match &args.mode {
        Mode::Describe(arg) => describe::run(arg)?,
        Mode::Km(arg) => km::run(arg)?,
        Mode::SurvivalAt(arg) => survival_at::run(arg)?,
        Mode::Median(arg) => median::run(arg)?,
        Mode::LogRank(arg) => log_rank::run(arg)?,
        Mode::Cox(arg) => cox::run(arg)?,
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Input cohort and optional stratification.
#[derive(Debug, Clone, Args)]
pub(crate) struct CohortArg {
    /// Path to the prepared cohort JSON file
    pub cohort: PathBuf,

    /// Covariate whose levels define the strata
    #[arg(long)]
    pub strata: Option<String>,
}

/// Scale of pointwise confidence bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ConfType {
    Plain,
    Log,
    LogLog,
}

impl From<ConfType> for ConfidenceType {
    fn from(value: ConfType) -> Self {
        match value {
            ConfType::Plain => ConfidenceType::Plain,
            ConfType::Log => ConfidenceType::Log,
            ConfType::LogLog => ConfidenceType::LogLog,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub(crate) struct ConfidenceArg {
    /// Confidence level of intervals
    #[arg(long, default_value_t = 0.95)]
    pub conf_level: f64,

    /// Transform used for survival confidence intervals
    #[arg(long, value_enum, default_value_t = ConfType::Log)]
    pub conf_type: ConfType,
}

impl ConfidenceArg {
    pub fn options(&self) -> ConfidenceOptions {
        ConfidenceOptions::default()
            .with_level(self.conf_level)
            .with_transform(self.conf_type.into())
    }
}

#[derive(Debug, Clone, Args)]
pub(crate) struct OutputArg {
    /// Write results as JSON to this path (`-` for stdout) instead of a table
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Estimates one curve per stratum, or a single overall curve.
pub(crate) fn collect_stats(
    cohort: &Cohort,
    strata: Option<&str>,
    options: &ConfidenceOptions,
) -> anyhow::Result<SurvivalStatsMap<Level>> {
    let stats = match strata {
        Some(covariate) => SurvivalStatsMap::collect_by_covariate(cohort, covariate, options)?,
        None => SurvivalStatsMap::overall_level(cohort, options)?,
    };
    Ok(stats)
}
