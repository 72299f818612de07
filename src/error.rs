//! Error taxonomy for submissions and artifacts

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why the offline-trained artifacts cannot serve predictions.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ArtifactError {
    /// The artifact file does not exist.
    #[error("artifact not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The file exists but could not be parsed.
    #[error("artifact {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// The artifact parsed but does not fit this pipeline (names, widths).
    #[error("artifact {} is incompatible: {reason}", path.display())]
    Incompatible { path: PathBuf, reason: String },

    /// The threshold artifact holds a value outside [0, 1].
    #[error("threshold {0} is outside [0, 1]")]
    ThresholdOutOfRange(f64),

    /// Neither an inline threshold nor a threshold file was configured.
    #[error("no decision threshold configured")]
    ThresholdMissing,

    /// A loaded artifact failed while being called.
    #[error("{stage} failed: {reason}")]
    Runtime { stage: &'static str, reason: String },
}

impl ArtifactError {
    pub(crate) fn runtime(stage: &'static str, reason: impl ToString) -> Self {
        Self::Runtime {
            stage,
            reason: reason.to_string(),
        }
    }
}

/// Request-scoped failure of one submission.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PipelineError {
    /// A required feature was absent from the submission.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A feature was present but outside its domain.
    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// Artifacts are absent or the external transform/classifier failed.
    #[error("model unavailable: {0}")]
    ModelUnavailable(#[from] ArtifactError),

    /// The classifier returned an unexpected shape or value.
    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    /// Evaluation did not complete within the configured bound.
    #[error("evaluation exceeded {0:?}")]
    TimedOut(Duration),
}

impl PipelineError {
    /// Whether the presentation layer should show the degraded state.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            PipelineError::ModelUnavailable(_) | PipelineError::TimedOut(_)
        )
    }
}
