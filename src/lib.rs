mod cli;
pub mod config;

pub mod artifacts;
pub mod cleaning;
pub mod encoding;
pub mod error;
pub mod features;
pub mod predictor;
pub mod record;
pub mod regression;
pub mod request;
pub mod schema;
pub mod trainer;
pub mod vocabulary;

use std::fs;
use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use artifacts::ArtifactStore;
use cli::{ArtifactArgs, Cli, Commands, PredictArgs, TrainArgs};
use config::{ServeConfig, TrainConfig};
use error::{PredictError, RequestError};
use predictor::ServingContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Linear,
    Ridge,
}

impl ModelKind {
    pub fn label(self) -> &'static str {
        match self {
            ModelKind::Linear => "ordinary least squares",
            ModelKind::Ridge => "ridge regression",
        }
    }

    pub fn requires_alpha(self) -> bool {
        matches!(self, ModelKind::Ridge)
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Feature layout a model is trained against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    /// Numeric columns plus indicator columns per category value.
    OneHot,
    /// Legacy `revenue`, `team_size`, `industry_encoded` layout.
    Label,
}

impl std::fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaKind::OneHot => write!(f, "one-hot"),
            SchemaKind::Label => write!(f, "label"),
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Train(args) => handle_train(args),
        Commands::Predict(args) => handle_predict(args),
        Commands::Health(args) => handle_health(args),
        Commands::Options(args) => handle_options(args),
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let level = match log_level.to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries command output; logs go to stderr.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")
}

fn handle_train(args: TrainArgs) -> Result<()> {
    let config = TrainConfig::from_train_args(args).with_defaults();
    config.validate()?;

    println!("--> Configuration\n{}", config.summary());

    if config.dry_run {
        println!("\nDry run requested: skipping training.");
        return Ok(());
    }

    let report = trainer::run_training(&config)?;
    println!("\n--> Report\n{}", report.render());
    println!("\nArtifacts written to {}", config.artifacts.display());

    if let Some(path) = &config.report {
        report.persist(path)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<()> {
    let raw = match (&args.payload, &args.input) {
        (Some(payload), _) => payload.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("failed to read payload from {}", path.display()))?,
        (None, None) => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read payload from stdin")?;
            buffer
        }
    };

    let config = ServeConfig::from_artifact_args(args.artifacts);
    let context = ServingContext::load(&ArtifactStore::new(&config.artifacts));

    let response = serde_json::from_str::<serde_json::Value>(&raw)
        .map_err(|err| PredictError::from(RequestError::Malformed(err.to_string())))
        .and_then(|payload| context.predict(&payload));

    match response {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(err) if err.is_client_error() => bail!("invalid request: {}", err),
        Err(err) => bail!("prediction failed: {}", err),
    }
}

fn handle_health(args: ArtifactArgs) -> Result<()> {
    let config = ServeConfig::from_artifact_args(args);
    let context = ServingContext::load(&ArtifactStore::new(&config.artifacts));
    println!("{}", serde_json::to_string_pretty(&context.health())?);
    Ok(())
}

fn handle_options(args: ArtifactArgs) -> Result<()> {
    let config = ServeConfig::from_artifact_args(args);
    let context = ServingContext::load(&ArtifactStore::new(&config.artifacts));
    println!("{}", serde_json::to_string_pretty(&context.options())?);
    Ok(())
}
