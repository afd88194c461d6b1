use std::path::PathBuf;

use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{ArtifactArgs, TrainArgs};
use crate::{ModelKind, SchemaKind};

pub const DEFAULT_DATASET: &str = "files/final_valuation_dataset.csv";
pub const DEFAULT_ARTIFACT_DIR: &str = "artifacts";
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
pub const DEFAULT_SPLIT_SEED: u64 = 42;
pub const DEFAULT_RIDGE_ALPHA: f64 = 1.0;

/// Training configuration compiled from CLI input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub dataset: PathBuf,
    pub artifacts: PathBuf,
    pub schema: SchemaKind,
    pub model: ModelKind,
    pub alpha: Option<f64>,
    pub test_fraction: f64,
    pub seed: u64,
    pub report: Option<PathBuf>,
    pub dry_run: bool,
}

impl TrainConfig {
    /// Defaults for everything except the two locations.
    pub fn new(dataset: impl Into<PathBuf>, artifacts: impl Into<PathBuf>) -> Self {
        Self {
            dataset: dataset.into(),
            artifacts: artifacts.into(),
            schema: SchemaKind::OneHot,
            model: ModelKind::Linear,
            alpha: None,
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SPLIT_SEED,
            report: None,
            dry_run: false,
        }
    }

    pub fn from_train_args(args: TrainArgs) -> Self {
        Self {
            dataset: args.dataset,
            artifacts: args.artifacts.artifacts,
            schema: args.schema,
            model: args.model,
            alpha: args.alpha,
            test_fraction: args.test_fraction.unwrap_or(DEFAULT_TEST_FRACTION),
            seed: args.seed.unwrap_or(DEFAULT_SPLIT_SEED),
            report: args.report,
            dry_run: args.dry_run,
        }
    }

    /// Fill in defaults (e.g. alpha) when the user omitted them.
    pub fn with_defaults(mut self) -> Self {
        if self.alpha.is_none() && self.model.requires_alpha() {
            self.alpha = default_alpha(self.model);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..1.0).contains(&self.test_fraction),
            "test fraction must be in [0, 1), got {}",
            self.test_fraction
        );

        if let Some(alpha) = self.alpha {
            ensure!(
                alpha.is_finite() && alpha >= 0.0,
                "alpha must be a non-negative number"
            );
        }

        if self.model.requires_alpha() && self.alpha.is_none() {
            bail!(
                "Model '{}' requires --alpha; a default could not be inferred",
                self.model
            );
        }

        if !self.dry_run && !self.dataset.exists() {
            bail!(
                "Dataset '{}' does not exist; use --dry-run to preview without the file",
                self.dataset.display()
            );
        }

        Ok(())
    }

    pub fn summary(&self) -> String {
        let alpha_text = match (self.model.requires_alpha(), self.alpha) {
            (true, Some(alpha)) => format!("alpha = {}", alpha),
            (true, None) => "alpha = <missing>".to_string(),
            _ => "alpha = n/a".to_string(),
        };

        format!(
            concat!(
                "Model: {}\n",
                "Schema: {}\n",
                "Dataset: {}\n",
                "Artifacts: {}\n",
                "Hold-out: {:.0}% (seed {})\n",
                "{}"
            ),
            self.model,
            self.schema,
            self.dataset.display(),
            self.artifacts.display(),
            self.test_fraction * 100.0,
            self.seed,
            alpha_text
        )
    }
}

/// Serving configuration: where the artifact triple lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    pub artifacts: PathBuf,
}

impl ServeConfig {
    pub fn from_artifact_args(args: ArtifactArgs) -> Self {
        Self {
            artifacts: args.artifacts,
        }
    }
}

pub fn default_alpha(model: ModelKind) -> Option<f64> {
    match model {
        ModelKind::Linear => None,
        ModelKind::Ridge => Some(DEFAULT_RIDGE_ALPHA),
    }
}
