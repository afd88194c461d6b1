//! Error types surfaced by the library.
//!
//! Orchestration code (training, CLI) reports through `anyhow`; these enums
//! cover the places where callers need to tell failures apart.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A caller-caused problem with a prediction payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl RequestError {
    /// Name of the offending field, when there is one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            RequestError::Malformed(_) => None,
            RequestError::MissingField(field) | RequestError::InvalidField { field, .. } => {
                Some(*field)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("internal prediction failure: {0}")]
    Internal(String),
}

impl PredictError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::Request(_))
    }
}

/// A vector whose width disagrees with a fitted transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("expected {expected} features, got {got}")]
pub struct ShapeMismatch {
    pub expected: usize,
    pub got: usize,
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact {} not found", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read artifact {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode artifact {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact {} has format version {found}, expected {expected}", path.display())]
    Version {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("artifact {} belongs to training run {found}, model is from run {expected}", path.display())]
    RunMismatch {
        path: PathBuf,
        found: String,
        expected: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_names_the_field() {
        let err = RequestError::MissingField("industry");
        assert_eq!(err.field(), Some("industry"));
        assert!(err.to_string().contains("'industry'"));
    }

    #[test]
    fn request_errors_are_client_errors() {
        let err: PredictError = RequestError::Malformed("not an object".into()).into();
        assert!(err.is_client_error());
        assert!(!PredictError::Internal("boom".into()).is_client_error());
    }

    #[test]
    fn shape_mismatch_reports_both_widths() {
        let err = ShapeMismatch {
            expected: 3,
            got: 5,
        };
        assert_eq!(err.to_string(), "expected 3 features, got 5");
    }
}
