use nalgebra::DVector;
use serde::Serialize;

/// Summary statistics for hold-out residuals.
#[derive(Debug, Clone, Serialize)]
pub struct ResidualSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub max_abs: f64,
}

pub(crate) fn summarize_residuals(residuals: &DVector<f64>) -> Option<ResidualSummary> {
    if residuals.is_empty() {
        return None;
    }

    let n = residuals.len() as f64;
    let mean = residuals.iter().sum::<f64>() / n;

    let mut variance_sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut max_abs = 0.0_f64;

    for value in residuals.iter().copied() {
        let diff = value - mean;
        variance_sum += diff * diff;
        min = min.min(value);
        max = max.max(value);
        max_abs = max_abs.max(value.abs());
    }

    Some(ResidualSummary {
        mean,
        std_dev: (variance_sum / n).sqrt(),
        min,
        max,
        max_abs,
    })
}
