//! Scaling, least-squares fitting and hold-out evaluation.

mod diagnostics;
mod model;
mod preprocess;
mod report;
mod scaler;
mod solve;

use anyhow::{anyhow, ensure, Result};
use nalgebra::DVector;

use crate::config::default_alpha;
use crate::ModelKind;

pub use diagnostics::ResidualSummary;
pub use model::LinearModel;
pub use preprocess::{holdout_split, HoldoutSplit};
pub use report::{RegressionMetrics, RowCounts, TrainingReport};
pub use scaler::{FeatureScaling, StandardScaler};

pub(crate) use preprocess::select;

/// Fit a linear model on already-scaled rows.
pub fn fit_linear_model(
    rows: &[Vec<f64>],
    targets: &[f64],
    width: usize,
    kind: ModelKind,
    alpha: Option<f64>,
) -> Result<LinearModel> {
    ensure!(!rows.is_empty(), "no training rows to fit");
    ensure!(
        rows.len() == targets.len(),
        "{} feature rows but {} targets",
        rows.len(),
        targets.len()
    );

    let design = preprocess::build_design_matrix(rows, width);
    let target = DVector::from_column_slice(targets);

    let alpha_used = if kind.requires_alpha() {
        Some(
            alpha
                .or_else(|| default_alpha(kind))
                .ok_or_else(|| anyhow!("alpha must be supplied for model '{}'.", kind))?,
        )
    } else {
        None
    };

    let beta = match (kind, alpha_used) {
        (ModelKind::Ridge, Some(alpha)) => solve::solve_ridge(&design, &target, alpha)?,
        _ => solve::solve_linear(&design, &target)?,
    };

    Ok(LinearModel::from_solution(kind, alpha_used, &beta))
}

/// Hold-out diagnostics for a fitted model.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub metrics: Option<RegressionMetrics>,
    pub residuals: Option<ResidualSummary>,
}

pub fn evaluate(model: &LinearModel, rows: &[Vec<f64>], targets: &[f64]) -> Result<Evaluation> {
    let mut predicted = Vec::with_capacity(rows.len());
    for row in rows {
        predicted.push(model.predict(row)?);
    }

    let actual = DVector::from_column_slice(targets);
    let predicted = DVector::from_vec(predicted);
    let metrics = solve::compute_metrics(&actual, &predicted, model.width());
    let residuals = if actual.len() == predicted.len() {
        diagnostics::summarize_residuals(&(&actual - &predicted))
    } else {
        None
    };

    Ok(Evaluation { metrics, residuals })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn fit_and_evaluate_linear_relationship() {
        let rows: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..6).map(|i| 3.0 * i as f64 + 2.0).collect();

        let model = fit_linear_model(&rows, &targets, 1, ModelKind::Linear, None).expect("fit");
        assert_abs_diff_eq!(model.intercept(), 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(model.coefficients()[0], 3.0, epsilon = 1e-9);

        let evaluation = evaluate(&model, &rows, &targets).expect("evaluate");
        let metrics = evaluation.metrics.expect("metrics");
        assert_abs_diff_eq!(metrics.mse, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(metrics.r2.expect("r2"), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn ridge_uses_default_alpha_when_missing() {
        let rows = vec![vec![0.0], vec![1.0], vec![2.0]];
        let targets = vec![1.0, 3.0, 5.0];
        let model = fit_linear_model(&rows, &targets, 1, ModelKind::Ridge, None).expect("fit");
        assert_eq!(model.alpha(), default_alpha(ModelKind::Ridge));
        assert!(model.coefficients()[0] < 2.0);
    }

    #[test]
    fn fit_rejects_mismatched_targets() {
        let err = fit_linear_model(&[vec![1.0]], &[1.0, 2.0], 1, ModelKind::Linear, None)
            .unwrap_err();
        assert!(err.to_string().contains("1 feature rows but 2 targets"));
    }
}
