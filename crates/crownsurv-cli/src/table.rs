//! Plain-text table formatting shared by the commands.

use crownsurv_stats::{confidence::ConfidenceInterval, survival::SurvivalQuantile};

pub(crate) const NA: &str = "NA";

/// Column name and width. The first column is left-aligned, the rest
/// right-aligned.
pub(crate) type Column = (&'static str, usize);

pub(crate) fn print_header(columns: &[Column]) {
    let names = columns.iter().map(|(name, _)| (*name).to_string()).collect::<Vec<_>>();
    print_row(columns, &names);
    let total_width = columns.iter().map(|(_, width)| width + 1).sum::<usize>() - 1;
    println!("  {}", "-".repeat(total_width));
}

pub(crate) fn print_row(columns: &[Column], cells: &[String]) {
    let line = columns
        .iter()
        .zip(cells)
        .enumerate()
        .map(|(i, (&(_, width), cell))| {
            if i == 0 {
                format!("{cell:<width$}")
            } else {
                format!("{cell:>width$}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    println!("  {line}");
}

pub(crate) fn number(value: f64, precision: usize) -> String {
    if value.is_finite() {
        format!("{value:.precision$}")
    } else {
        NA.to_string()
    }
}

pub(crate) fn optional(value: Option<f64>, precision: usize) -> String {
    value.map_or(NA.to_string(), |value| number(value, precision))
}

/// Lower and upper bound columns.
pub(crate) fn bounds(ci: Option<ConfidenceInterval>, precision: usize) -> (String, String) {
    (
        optional(ci.map(|ci| ci.lower), precision),
        optional(ci.map(|ci| ci.upper), precision),
    )
}

/// Estimate, lower and upper columns of a survival quantile.
pub(crate) fn quantile(estimate: &SurvivalQuantile, precision: usize) -> [String; 3] {
    match estimate {
        SurvivalQuantile::Reached { time, lower, upper } => [
            number(*time, precision),
            optional(*lower, precision),
            optional(*upper, precision),
        ],
        SurvivalQuantile::NotReached => ["not reached".to_string(), NA.to_string(), NA.to_string()],
    }
}

pub(crate) fn p_value(p: f64) -> String {
    if p < 0.001 {
        "<0.001".to_string()
    } else {
        format!("{p:.3}")
    }
}
