use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::ShapeMismatch;
use crate::ModelKind;

/// A fitted linear model: `intercept + coefficients · x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    kind: ModelKind,
    alpha: Option<f64>,
    intercept: f64,
    coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn new(kind: ModelKind, alpha: Option<f64>, intercept: f64, coefficients: Vec<f64>) -> Self {
        Self {
            kind,
            alpha,
            intercept,
            coefficients,
        }
    }

    /// Build from a solver solution whose first entry is the intercept.
    pub(crate) fn from_solution(kind: ModelKind, alpha: Option<f64>, beta: &DVector<f64>) -> Self {
        let intercept = beta.get(0).copied().unwrap_or(0.0);
        let coefficients = beta.iter().skip(1).copied().collect();
        Self::new(kind, alpha, intercept, coefficients)
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn alpha(&self) -> Option<f64> {
        self.alpha
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Number of features the model expects.
    pub fn width(&self) -> usize {
        self.coefficients.len()
    }

    pub fn predict(&self, features: &[f64]) -> Result<f64, ShapeMismatch> {
        if features.len() != self.coefficients.len() {
            return Err(ShapeMismatch {
                expected: self.coefficients.len(),
                got: features.len(),
            });
        }

        Ok(self.intercept
            + features
                .iter()
                .zip(&self.coefficients)
                .map(|(x, w)| x * w)
                .sum::<f64>())
    }
}
