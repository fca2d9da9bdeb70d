use crate::survival::Observation;

/// Harrell's concordance index of risk scores against observed survival.
///
/// A pair is comparable when the subject with the shorter time had an event,
/// or when both share a time and only the first had an event. Among
/// comparable pairs, the pair is concordant when the earlier failure has the
/// higher risk score; equal scores count one half.
///
/// Returns `None` when there is no comparable pair, or when the slices have
/// different lengths.
///
/// # Examples
///
/// ```
/// # use crownsurv_stats::{cox::concordance_index, survival::Observation};
/// let observations = [Observation::event(1.0), Observation::event(2.0), Observation::censored(3.0)];
/// assert_eq!(concordance_index(&[3.0, 2.0, 1.0], &observations), Some(1.0));
/// assert_eq!(concordance_index(&[1.0, 2.0, 3.0], &observations), Some(0.0));
/// ```
#[must_use]
pub fn concordance_index(risk_scores: &[f64], observations: &[Observation]) -> Option<f64> {
    if risk_scores.len() != observations.len() {
        return None;
    }

    let mut concordant = 0.0;
    let mut comparable = 0.0;
    for (i, first) in observations.iter().enumerate() {
        if !first.event {
            continue;
        }
        for (j, second) in observations.iter().enumerate() {
            if i == j {
                continue;
            }
            if second.time > first.time || (!second.event && second.time == first.time) {
                comparable += 1.0;
                if risk_scores[i] > risk_scores[j] {
                    concordant += 1.0;
                } else if risk_scores[i] == risk_scores[j] {
                    concordant += 0.5;
                }
            }
        }
    }

    (comparable > 0.0).then(|| concordant / comparable)
}
