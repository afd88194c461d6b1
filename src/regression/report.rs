use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::diagnostics::ResidualSummary;
use super::scaler::FeatureScaling;
use crate::cleaning::DatasetLayout;
use crate::{ModelKind, SchemaKind};

#[derive(Debug, Clone, Serialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: Option<f64>,
    pub adj_r2: Option<f64>,
}

/// Row accounting for one training run.
#[derive(Debug, Clone, Serialize)]
pub struct RowCounts {
    pub read: usize,
    pub skipped: usize,
    pub dropped: usize,
    pub train: usize,
    pub test: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub(crate) run_id: String,
    pub(crate) model: ModelKind,
    pub(crate) schema: SchemaKind,
    pub(crate) layout: DatasetLayout,
    pub(crate) rows: RowCounts,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) alpha: Option<f64>,
    pub(crate) coefficients: Vec<(String, f64)>,
    pub(crate) metrics: Option<RegressionMetrics>,
    pub(crate) residuals: Option<ResidualSummary>,
    pub(crate) scaling: Vec<FeatureScaling>,
    pub(crate) notes: Vec<String>,
}

impl TrainingReport {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn metrics(&self) -> Option<&RegressionMetrics> {
        self.metrics.as_ref()
    }

    pub fn rows(&self) -> &RowCounts {
        &self.rows
    }

    pub fn coefficients(&self) -> &[(String, f64)] {
        &self.coefficients
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("Run: {}", self.run_id));
        lines.push(format!("Model: {}", self.model));
        lines.push(format!("Schema: {}", self.schema));
        lines.push(format!("Dataset layout: {}", self.layout));
        lines.push(format!(
            "Rows: {} read, {} skipped, {} dropped (valuation <= 0)",
            self.rows.read, self.rows.skipped, self.rows.dropped
        ));
        lines.push(format!(
            "Split: {} train / {} test",
            self.rows.train, self.rows.test
        ));
        lines.push(format!(
            "Generated at: {}",
            self.timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        ));
        lines.push(format!(
            "Alpha: {}",
            self.alpha
                .map(|a| format!("{:.6}", a))
                .unwrap_or_else(|| "n/a".to_string())
        ));

        lines.push(String::new());
        lines.push("Hold-out metrics:".to_string());
        match &self.metrics {
            Some(metrics) => {
                lines.push(format!("  MSE: {:.6}", metrics.mse));
                lines.push(format!("  RMSE: {:.6}", metrics.rmse));
                lines.push(format!("  MAE: {:.6}", metrics.mae));
                lines.push(format!(
                    "  R^2: {}",
                    metrics
                        .r2
                        .map(|r2| format!("{:.6}", r2))
                        .unwrap_or_else(|| "n/a".to_string())
                ));
                if let Some(adj) = metrics.adj_r2 {
                    lines.push(format!("  Adjusted R^2: {:.6}", adj));
                }
            }
            None => lines.push("  n/a (empty hold-out split)".to_string()),
        }

        if let Some(residuals) = &self.residuals {
            lines.push(format!(
                "  Residuals: mean={:.6} std={:.6} min={:.6} max={:.6}",
                residuals.mean, residuals.std_dev, residuals.min, residuals.max
            ));
        }

        lines.push(String::new());
        lines.push("Coefficients:".to_string());
        for (name, value) in &self.coefficients {
            lines.push(format!("  {:<28} {:>14.6}", name, value));
        }

        lines.push(String::new());
        lines.push("Normalization:".to_string());
        for stat in &self.scaling {
            lines.push(format!(
                "  {:<28} mean={:>12.6} std={:>12.6}",
                stat.feature, stat.mean, stat.std_dev
            ));
        }

        if !self.notes.is_empty() {
            lines.push(String::new());
            lines.push("Notes:".to_string());
            for note in &self.notes {
                lines.push(format!("  - {}", note));
            }
        }

        lines.join("\n")
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())
            .with_context(|| format!("failed to write report to {}", path.display()))
    }
}
