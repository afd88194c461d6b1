use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{DEFAULT_ARTIFACT_DIR, DEFAULT_DATASET};
use crate::{ModelKind, SchemaKind};

/// Command-line interface definition for the valuation tool.
#[derive(Parser, Debug)]
#[command(
    name = "valuation",
    version,
    about = "Train and serve startup valuation regressions"
)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clean a dataset, fit the model and write the artifact triple.
    Train(TrainArgs),
    /// Predict the valuation for one JSON payload.
    Predict(PredictArgs),
    /// Report which artifacts are loaded and the resulting serving state.
    Health(ArtifactArgs),
    /// List the accepted industries, regions and exit statuses.
    Options(ArtifactArgs),
}

#[derive(Args, Debug)]
pub struct ArtifactArgs {
    /// Directory holding model.json, scaler.json and feature_columns.json.
    #[arg(
        long,
        value_name = "DIR",
        env = "VALUATION_ARTIFACTS",
        default_value = DEFAULT_ARTIFACT_DIR
    )]
    pub artifacts: PathBuf,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV dataset, either preprocessed (one-hot, M USD) or raw.
    #[arg(value_name = "DATASET", default_value = DEFAULT_DATASET)]
    pub dataset: PathBuf,

    #[command(flatten)]
    pub artifacts: ArtifactArgs,

    /// Feature schema to train against.
    #[arg(long, value_enum, default_value = "one-hot")]
    pub schema: SchemaKind,

    /// Regression variant to fit (linear, ridge).
    #[arg(long, value_enum, default_value = "linear")]
    pub model: ModelKind,

    /// Regularization strength for ridge.
    #[arg(long, value_name = "ALPHA")]
    pub alpha: Option<f64>,

    /// Fraction of rows held out for evaluation.
    #[arg(long, value_name = "FRACTION")]
    pub test_fraction: Option<f64>,

    /// Seed for the train / hold-out shuffle.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Also write the training report to this location.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Preview configuration without training.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    #[command(flatten)]
    pub artifacts: ArtifactArgs,

    /// JSON payload given inline.
    #[arg(long, value_name = "JSON", conflicts_with = "input")]
    pub payload: Option<String>,

    /// File containing the JSON payload; stdin is read when neither is given.
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,
}
