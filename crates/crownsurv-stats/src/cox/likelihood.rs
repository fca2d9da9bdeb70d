//! Cox log partial likelihood with its gradient and information matrix.

use ndarray::{Array1, Array2, ArrayView1};

use super::TieMethod;

/// Value, score vector and observed information at one coefficient vector.
#[derive(Debug, Clone)]
pub(crate) struct Evaluation {
    pub(crate) log_likelihood: f64,
    pub(crate) score: Array1<f64>,
    pub(crate) information: Array2<f64>,
}

/// Subjects sorted by descending time, prepared once per fit.
#[derive(Debug, Clone)]
pub(crate) struct RiskSets<'a> {
    x: &'a Array2<f64>,
    /// Subject indices, latest time first.
    order: Vec<usize>,
    times: Vec<f64>,
    events: Vec<bool>,
    ties: TieMethod,
}

impl<'a> RiskSets<'a> {
    pub(crate) fn new(x: &'a Array2<f64>, times: Vec<f64>, events: Vec<bool>, ties: TieMethod) -> Self {
        let mut order = (0..times.len()).collect::<Vec<_>>();
        order.sort_by(|&a, &b| times[b].total_cmp(&times[a]));
        Self {
            x,
            order,
            times,
            events,
            ties,
        }
    }

    /// Evaluates the partial likelihood at `beta`.
    ///
    /// Walks the subjects from the latest time backwards so that the risk
    /// set sums grow incrementally. All subjects tied at a time join the risk
    /// set before that time's events are scored.
    #[expect(clippy::cast_precision_loss)]
    pub(crate) fn evaluate(&self, beta: ArrayView1<'_, f64>) -> Evaluation {
        let p = beta.len();
        let mut log_likelihood = 0.0;
        let mut score = Array1::<f64>::zeros(p);
        let mut information = Array2::<f64>::zeros((p, p));

        // Risk set sums of w, w·x, w·x·xᵀ with w = exp(x·β)
        let mut s0 = 0.0;
        let mut s1 = Array1::<f64>::zeros(p);
        let mut s2 = Array2::<f64>::zeros((p, p));

        let mut i = 0;
        while i < self.order.len() {
            let current_time = self.times[self.order[i]];

            // Same sums restricted to the events at this time
            let mut d = 0_usize;
            let mut d0 = 0.0;
            let mut d1 = Array1::<f64>::zeros(p);
            let mut d2 = Array2::<f64>::zeros((p, p));

            let mut j = i;
            while j < self.order.len() && self.times[self.order[j]] == current_time {
                let subject = self.order[j];
                let x = self.x.row(subject);
                let eta = x.dot(&beta);
                let w = eta.exp();
                let wx = &x * w;
                let wxx = outer(&wx, &x);

                s0 += w;
                s1 += &wx;
                s2 += &wxx;
                if self.events[subject] {
                    d += 1;
                    d0 += w;
                    d1 += &wx;
                    d2 += &wxx;
                    log_likelihood += eta;
                    score += &x;
                }
                j += 1;
            }

            for l in 0..d {
                let fraction = match self.ties {
                    TieMethod::Breslow => 0.0,
                    TieMethod::Efron => l as f64 / d as f64,
                };
                let denominator = s0 - fraction * d0;
                let mean = (&s1 - &(&d1 * fraction)) / denominator;
                let second = (&s2 - &(&d2 * fraction)) / denominator;

                log_likelihood -= denominator.ln();
                score -= &mean;
                information += &(second - outer(&mean, &mean.view()));
            }

            i = j;
        }

        Evaluation {
            log_likelihood,
            score,
            information,
        }
    }
}

fn outer(a: &Array1<f64>, b: &ArrayView1<'_, f64>) -> Array2<f64> {
    Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i] * b[j])
}
