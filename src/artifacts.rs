//! Persistence of the model / scaler / feature-schema triple.
//!
//! All three files are written together from one training run and stamped
//! with the same `run_id`. Loading is per-file so one bad artifact degrades
//! serving instead of aborting it, but a scaler or schema from a different
//! run than the model is rejected.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ArtifactError;
use crate::regression::{LinearModel, StandardScaler};
use crate::schema::FeatureSchema;

pub const FORMAT_VERSION: u32 = 2;

pub const MODEL_FILE: &str = "model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const SCHEMA_FILE: &str = "feature_columns.json";

/// Common header wrapped around every persisted artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub format_version: u32,
    pub run_id: String,
    pub trained_at: DateTime<Utc>,
    pub payload: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactTriple {
    pub run_id: String,
    pub trained_at: DateTime<Utc>,
    pub model: LinearModel,
    pub scaler: StandardScaler,
    pub schema: FeatureSchema,
}

impl ArtifactTriple {
    fn envelope<T: Clone>(&self, payload: &T) -> Envelope<T> {
        Envelope {
            format_version: FORMAT_VERSION,
            run_id: self.run_id.clone(),
            trained_at: self.trained_at,
            payload: payload.clone(),
        }
    }
}

/// Per-artifact load results.
#[derive(Debug)]
pub struct LoadedArtifacts {
    pub model: Result<Envelope<LinearModel>, ArtifactError>,
    pub scaler: Result<Envelope<StandardScaler>, ArtifactError>,
    pub schema: Result<Envelope<FeatureSchema>, ArtifactError>,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(SCALER_FILE)
    }

    pub fn schema_path(&self) -> PathBuf {
        self.dir.join(SCHEMA_FILE)
    }

    /// Write all three artifacts.
    ///
    /// Every file is serialised and staged next to its target first; targets
    /// are only replaced once all three staged files exist.
    pub fn save(&self, triple: &ArtifactTriple) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!(
                "failed to create artifact directory {}",
                self.dir.display()
            )
        })?;

        let staged = [
            stage(&self.model_path(), &triple.envelope(&triple.model))?,
            stage(&self.scaler_path(), &triple.envelope(&triple.scaler))?,
            stage(&self.schema_path(), &triple.envelope(&triple.schema))?,
        ];

        for (tmp, target) in &staged {
            fs::rename(tmp, target).with_context(|| {
                format!("failed to move {} into place", target.display())
            })?;
        }

        info!(
            dir = %self.dir.display(),
            run_id = %triple.run_id,
            "artifact triple written"
        );
        Ok(())
    }

    pub fn load(&self) -> LoadedArtifacts {
        let model = read_envelope::<LinearModel>(&self.model_path());
        let mut scaler = read_envelope::<StandardScaler>(&self.scaler_path());
        let mut schema = read_envelope::<FeatureSchema>(&self.schema_path());

        if let Ok(model) = &model {
            scaler = scaler.and_then(|s| same_run(s, &model.run_id, self.scaler_path()));
            schema = schema.and_then(|s| same_run(s, &model.run_id, self.schema_path()));
        }

        for (name, err) in [
            ("model", model.as_ref().err()),
            ("scaler", scaler.as_ref().err()),
            ("schema", schema.as_ref().err()),
        ] {
            if let Some(err) = err {
                warn!(artifact = name, error = %err, "artifact unavailable");
            }
        }

        LoadedArtifacts {
            model,
            scaler,
            schema,
        }
    }
}

fn stage<T: Serialize>(target: &Path, value: &T) -> Result<(PathBuf, PathBuf)> {
    let mut tmp = target.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let bytes = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialise {}", target.display()))?;
    fs::write(&tmp, bytes).with_context(|| format!("failed to write {}", tmp.display()))?;

    Ok((tmp, target.to_path_buf()))
}

fn read_envelope<T: DeserializeOwned>(path: &Path) -> Result<Envelope<T>, ArtifactError> {
    let bytes = fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ArtifactError::Missing {
            path: path.to_path_buf(),
        },
        _ => ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let envelope: Envelope<T> =
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    if envelope.format_version != FORMAT_VERSION {
        return Err(ArtifactError::Version {
            path: path.to_path_buf(),
            found: envelope.format_version,
            expected: FORMAT_VERSION,
        });
    }

    Ok(envelope)
}

fn same_run<T>(
    envelope: Envelope<T>,
    run_id: &str,
    path: PathBuf,
) -> Result<Envelope<T>, ArtifactError> {
    if envelope.run_id == run_id {
        Ok(envelope)
    } else {
        Err(ArtifactError::RunMismatch {
            path,
            found: envelope.run_id,
            expected: run_id.to_string(),
        })
    }
}
