use anyhow::{anyhow, ensure, Result};
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use tracing::debug;

use super::report::RegressionMetrics;

/// Smallest acceptable ratio between the extreme diagonal entries of the
/// Cholesky factor before the normal equations are treated as singular.
const CHOLESKY_CONDITION_FLOOR: f64 = 1e-7;

/// Singular values below this fraction of the largest one are zeroed.
const SVD_RELATIVE_TOLERANCE: f64 = 1e-10;

pub(crate) fn solve_linear(design: &DMatrix<f64>, target: &DVector<f64>) -> Result<DVector<f64>> {
    let gram = design.transpose() * design;
    let rhs = design.transpose() * target;

    if let Some(chol) = gram.cholesky() {
        if well_conditioned(&chol) {
            return Ok(chol.solve(&rhs));
        }
    }

    // Full one-hot blocks are collinear with the intercept; take the
    // minimum-norm least-squares solution instead.
    debug!(
        rows = design.nrows(),
        cols = design.ncols(),
        "normal equations singular, solving with SVD"
    );
    solve_least_squares_svd(design, target)
}

pub(crate) fn solve_ridge(
    design: &DMatrix<f64>,
    target: &DVector<f64>,
    alpha: f64,
) -> Result<DVector<f64>> {
    ensure!(alpha >= 0.0, "ridge alpha must be non-negative");

    let cols = design.ncols();
    let mut gram = design.transpose() * design;
    for i in 1..cols {
        gram[(i, i)] += alpha;
    }

    let rhs = design.transpose() * target;

    match gram.cholesky() {
        Some(chol) if well_conditioned(&chol) => Ok(chol.solve(&rhs)),
        _ => Err(anyhow!(
            "ridge system is not positive-definite; try increasing alpha"
        )),
    }
}

fn solve_least_squares_svd(design: &DMatrix<f64>, target: &DVector<f64>) -> Result<DVector<f64>> {
    let svd = design.clone().svd(true, true);
    let largest = svd.singular_values.max();
    ensure!(
        largest.is_finite() && largest > 0.0,
        "design matrix has no usable signal"
    );

    svd.solve(target, largest * SVD_RELATIVE_TOLERANCE)
        .map_err(|err| anyhow!("least-squares solve failed: {}", err))
}

fn well_conditioned(chol: &Cholesky<f64, Dyn>) -> bool {
    let diagonal = chol.l_dirty().diagonal();
    let max = diagonal.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let min = diagonal.iter().fold(f64::INFINITY, |acc, v| acc.min(v.abs()));
    max > 0.0 && min.is_finite() && min / max > CHOLESKY_CONDITION_FLOOR
}

/// Hold-out diagnostics. Returns `None` when there is nothing to score.
pub(crate) fn compute_metrics(
    actual: &DVector<f64>,
    predicted: &DVector<f64>,
    feature_count: usize,
) -> Option<RegressionMetrics> {
    let n = actual.len();
    if n == 0 || predicted.len() != n {
        return None;
    }

    let residuals = actual - predicted;
    let ss_res = residuals.iter().map(|r| r * r).sum::<f64>();

    let mean_actual = actual.iter().sum::<f64>() / n as f64;
    let ss_tot = actual
        .iter()
        .map(|value| {
            let diff = value - mean_actual;
            diff * diff
        })
        .sum::<f64>();

    let mse = ss_res / n as f64;
    let rmse = mse.sqrt();
    let mae = residuals.iter().map(|r| r.abs()).sum::<f64>() / n as f64;

    // R^2 is undefined for a constant target.
    let r2 = (ss_tot.is_finite() && ss_tot > 0.0).then(|| 1.0 - (ss_res / ss_tot));

    let predictors = feature_count + 1; // intercept included
    let adj_r2 = match r2 {
        Some(r2) if n > predictors => {
            let numerator = (1.0 - r2) * (n as f64 - 1.0);
            let denominator = n as f64 - predictors as f64;
            Some(1.0 - numerator / denominator)
        }
        _ => None,
    };

    Some(RegressionMetrics {
        mse,
        rmse,
        mae,
        r2,
        adj_r2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_design_and_target() -> (DMatrix<f64>, DVector<f64>) {
        let design = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let target = DVector::from_vec(vec![1.0, 3.0, 5.0]);
        (design, target)
    }

    #[test]
    fn solve_linear_recovers_exact_coefficients() {
        let (design, target) = sample_design_and_target();
        let beta = solve_linear(&design, &target).expect("ols solution");

        assert_abs_diff_eq!(beta[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(beta[1], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn solve_linear_handles_collinear_indicator_columns() {
        // intercept, a, b with a + b == 1 on every row
        let design = DMatrix::from_row_slice(
            4,
            3,
            &[1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0],
        );
        let target = DVector::from_vec(vec![10.0, 4.0, 10.0, 4.0]);
        let beta = solve_linear(&design, &target).expect("least squares solution");

        let fitted = &design * &beta;
        for (got, want) in fitted.iter().zip(target.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-8);
        }
    }

    #[test]
    fn solve_ridge_shrinks_feature_weight() {
        let (design, target) = sample_design_and_target();
        let beta = solve_ridge(&design, &target, 1.0).expect("ridge solution");

        assert_abs_diff_eq!(beta[0], 5.0 / 3.0, epsilon = 1e-10);
        assert_abs_diff_eq!(beta[1], 4.0 / 3.0, epsilon = 1e-10);
    }

    #[test]
    fn compute_metrics_handles_perfect_fit() {
        let actual = DVector::from_vec(vec![1.0, 3.0, 5.0]);
        let predicted = actual.clone();
        let metrics = compute_metrics(&actual, &predicted, 1).expect("metrics");

        assert_eq!(metrics.r2, Some(1.0));
        assert_eq!(metrics.adj_r2, Some(1.0));
        assert_abs_diff_eq!(metrics.mse, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(metrics.mae, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn compute_metrics_reports_undefined_r2_for_constant_target() {
        let actual = DVector::from_vec(vec![2.0, 2.0, 2.0]);
        let predicted = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let metrics = compute_metrics(&actual, &predicted, 1).expect("metrics");

        assert_eq!(metrics.r2, None);
        assert_abs_diff_eq!(metrics.mse, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn compute_metrics_skips_empty_holdout() {
        let empty = DVector::<f64>::zeros(0);
        assert!(compute_metrics(&empty, &empty, 2).is_none());
    }
}
