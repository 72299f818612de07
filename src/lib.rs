//! Term Deposit Predictor Library
//!
//! Scores bank customers for term deposit subscription with offline-trained
//! ONNX artifacts, and annotates each prediction with rule-based key factors
//! and a financial health tier.

pub mod config;
pub mod error;
pub mod explain;
pub mod feature_record;
pub mod financial_health;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod presenter;
pub mod types;

pub use config::AppConfig;
pub use error::{ArtifactError, PipelineError};
pub use explain::explain;
pub use feature_record::{FeatureAssembler, FeatureRecord, FEATURE_NAMES};
pub use models::{classify, Classifier, DecisionRule, InferenceEngine, Preprocessor};
pub use pipeline::{evaluate_with_timeout, ArtifactStatus, Artifacts, Pipeline, PredictionService};
pub use presenter::Presenter;
pub use types::{customer::CustomerRecord, prediction::PredictionReport};
