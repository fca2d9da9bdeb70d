//! Small dense symmetric positive-definite solvers.
//!
//! The systems solved here are information or covariance matrices with one
//! row per covariate (or stratum), so a straightforward Cholesky
//! factorization is sufficient.

use ndarray::{Array1, Array2};

/// Relative pivot tolerance below which a matrix is treated as singular.
const PIVOT_TOLERANCE: f64 = 1e-10;

/// The factorization broke down at the given row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Singular {
    pub(crate) index: usize,
}

/// Lower-triangular Cholesky factor `L` with `A = L·Lᵀ`.
pub(crate) fn cholesky(a: &Array2<f64>) -> Result<Array2<f64>, Singular> {
    let n = a.nrows();
    debug_assert_eq!(n, a.ncols(), "matrix must be square");

    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut diag = a[[j, j]];
        for k in 0..j {
            diag -= l[[j, k]] * l[[j, k]];
        }
        let scale = a[[j, j]].abs().max(f64::MIN_POSITIVE);
        if !diag.is_finite() || diag <= PIVOT_TOLERANCE * scale {
            return Err(Singular { index: j });
        }
        let pivot = diag.sqrt();
        l[[j, j]] = pivot;

        for i in j + 1..n {
            let mut value = a[[i, j]];
            for k in 0..j {
                value -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = value / pivot;
        }
    }
    Ok(l)
}

/// Solves `L·Lᵀ·x = b` given the Cholesky factor `L`.
pub(crate) fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    // Forward substitution
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut value = b[i];
        for k in 0..i {
            value -= l[[i, k]] * y[k];
        }
        y[i] = value / l[[i, i]];
    }

    // Back substitution
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut value = y[i];
        for k in i + 1..n {
            value -= l[[k, i]] * x[k];
        }
        x[i] = value / l[[i, i]];
    }
    x
}

pub(crate) fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, Singular> {
    let l = cholesky(a)?;
    Ok(cholesky_solve(&l, b))
}

pub(crate) fn invert_spd(a: &Array2<f64>) -> Result<Array2<f64>, Singular> {
    let n = a.nrows();
    let l = cholesky(a)?;
    let mut inverse = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut unit = Array1::<f64>::zeros(n);
        unit[j] = 1.0;
        inverse.column_mut(j).assign(&cholesky_solve(&l, &unit));
    }
    Ok(inverse)
}

/// Quadratic form `bᵀ·A⁻¹·b`.
pub(crate) fn inverse_quadratic_form(a: &Array2<f64>, b: &Array1<f64>) -> Result<f64, Singular> {
    let x = solve_spd(a, b)?;
    Ok(b.dot(&x))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn test_solve_spd() {
        let a = array![[4.0, 2.0, 0.6], [2.0, 5.0, 1.0], [0.6, 1.0, 3.0]];
        let expected = array![1.0, -2.0, 0.5];
        let b = a.dot(&expected);
        let x = solve_spd(&a, &b).unwrap();
        for (x, e) in x.iter().zip(&expected) {
            assert_abs_diff_eq!(*x, *e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_invert_spd() {
        let a = array![[2.0, 1.0], [1.0, 3.0]];
        let inverse = invert_spd(&a).unwrap();
        let identity = a.dot(&inverse);
        assert_abs_diff_eq!(identity[[0, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(identity[[0, 1]], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(identity[[1, 0]], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(identity[[1, 1]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_reports_index() {
        // Third row is the sum of the first two
        let a = array![[1.0, 0.0, 1.0], [0.0, 1.0, 1.0], [1.0, 1.0, 2.0]];
        assert_eq!(cholesky(&a).unwrap_err(), Singular { index: 2 });
    }

    #[test]
    fn test_quadratic_form() {
        let a = array![[2.0, 0.0], [0.0, 4.0]];
        let b = array![2.0, 4.0];
        assert_abs_diff_eq!(inverse_quadratic_form(&a, &b).unwrap(), 6.0, epsilon = 1e-12);
    }
}
