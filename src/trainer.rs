//! Offline training: dataset in, artifact triple out.

use anyhow::{ensure, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::artifacts::{ArtifactStore, ArtifactTriple};
use crate::cleaning::{clean_dataset, CleanedDataset};
use crate::config::TrainConfig;
use crate::encoding::LabelEncoder;
use crate::features::{CategoryOutcome, FeatureVectorBuilder};
use crate::regression::{
    evaluate, fit_linear_model, holdout_split, select, RowCounts, StandardScaler, TrainingReport,
};
use crate::schema::FeatureSchema;
use crate::SchemaKind;

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub report: TrainingReport,
    pub artifacts: ArtifactTriple,
}

/// Clean, fit and persist. Hold-out scores are reported but never block the save.
pub fn run_training(config: &TrainConfig) -> Result<TrainingReport> {
    let outcome = train(config)?;
    ArtifactStore::new(&config.artifacts).save(&outcome.artifacts)?;
    Ok(outcome.report)
}

pub fn train(config: &TrainConfig) -> Result<TrainingOutcome> {
    let cleaned = clean_dataset(&config.dataset)?;
    train_on(&cleaned, config)
}

pub fn train_on(cleaned: &CleanedDataset, config: &TrainConfig) -> Result<TrainingOutcome> {
    ensure!(
        !cleaned.records.is_empty(),
        "dataset '{}' has no rows with a positive valuation",
        config.dataset.display()
    );

    let schema = match config.schema {
        SchemaKind::OneHot => FeatureSchema::one_hot(),
        SchemaKind::Label => FeatureSchema::label_encoded(LabelEncoder::fit(cleaned.industries())?),
    };

    let builder = FeatureVectorBuilder::new(&schema);
    let mut unknown_categories = 0usize;
    let mut rows = Vec::with_capacity(cleaned.records.len());
    let mut targets = Vec::with_capacity(cleaned.records.len());
    for record in &cleaned.records {
        let built = builder.build(&record.profile);
        if [&built.industry, &built.region, &built.exit_status]
            .iter()
            .any(|outcome| **outcome == CategoryOutcome::Unknown)
        {
            unknown_categories += 1;
        }
        rows.push(built.vector.into_values());
        targets.push(record.valuation);
    }

    let split = holdout_split(rows.len(), config.test_fraction, config.seed);
    let mut train_rows = select(&rows, &split.train);
    let train_targets = select(&targets, &split.train);
    let mut test_rows = select(&rows, &split.test);
    let test_targets = select(&targets, &split.test);

    let scaler = StandardScaler::fit(&train_rows, schema.columns())?;
    scaler.transform_rows(&mut train_rows)?;
    scaler.transform_rows(&mut test_rows)?;

    let model = fit_linear_model(
        &train_rows,
        &train_targets,
        schema.len(),
        config.model,
        config.alpha,
    )?;
    let evaluation = evaluate(&model, &test_rows, &test_targets)?;

    let mut notes = Vec::new();
    if unknown_categories > 0 {
        notes.push(format!(
            "{} rows carried a category outside the known vocabularies",
            unknown_categories
        ));
    }
    match &evaluation.metrics {
        Some(metrics) => info!(
            mse = metrics.mse,
            r2 = ?metrics.r2,
            test_rows = test_rows.len(),
            "hold-out evaluation"
        ),
        None => {
            warn!("hold-out split is empty; no metrics computed");
            notes.push("Hold-out split is empty; metrics unavailable.".to_string());
        }
    }
    if evaluation.metrics.as_ref().and_then(|m| m.r2).is_some_and(|r2| r2 < 0.0) {
        notes.push("Hold-out R^2 is negative; artifacts were saved regardless.".to_string());
    }

    let trained_at = Utc::now();
    let run_id = trained_at.format("%Y%m%dT%H%M%S%.3fZ").to_string();

    let mut coefficients = vec![("intercept".to_string(), model.intercept())];
    coefficients.extend(
        schema
            .columns()
            .iter()
            .cloned()
            .zip(model.coefficients().iter().copied()),
    );

    let report = TrainingReport {
        run_id: run_id.clone(),
        model: config.model,
        schema: config.schema,
        layout: cleaned.layout,
        rows: RowCounts {
            read: cleaned.rows_read,
            skipped: cleaned.rows_skipped,
            dropped: cleaned.rows_dropped,
            train: train_rows.len(),
            test: test_rows.len(),
        },
        timestamp: trained_at,
        alpha: model.alpha(),
        coefficients,
        metrics: evaluation.metrics,
        residuals: evaluation.residuals,
        scaling: scaler.stats().to_vec(),
        notes,
    };

    info!(
        run_id = %run_id,
        schema = %config.schema,
        features = schema.len(),
        train_rows = report.rows.train,
        "model fitted"
    );

    Ok(TrainingOutcome {
        report,
        artifacts: ArtifactTriple {
            run_id,
            trained_at,
            model,
            scaler,
            schema,
        },
    })
}
